pub mod init;
pub mod resolve;
pub mod status;

use anyhow::{Context, Result};
use clap::Args;
use docmig::{DocmigConfig, RedisStore};

use crate::output::OutputManager;

/// A titled block of sample invocations shown after a command's `--help`.
#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

/// Sample invocations per subcommand name.
pub const COMMAND_EXAMPLES: &[(&str, &[ExampleGroup])] = &[
    ("init", init::EXAMPLES),
    ("status", status::EXAMPLES),
    ("resolve", resolve::EXAMPLES),
];

/// Connection flags shared by commands that talk to Redis.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Redis connection URL (overrides .docmig/config.toml)
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Key prefix of the store (overrides .docmig/config.toml)
    #[arg(long)]
    pub key_prefix: Option<String>,
}

impl ConnectionArgs {
    pub async fn connect(&self, output: &OutputManager) -> Result<RedisStore> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        let config = DocmigConfig::discover_from(&current_dir).context("Failed to load .docmig/config.toml")?;

        let redis_url = match &self.redis_url {
            Some(url) => url.clone(),
            None => config.redis_url().map_err(|_| {
                output.error("REDIS_URL environment variable not set");
                anyhow::anyhow!("REDIS_URL is required")
            })?,
        };
        let key_prefix = self.key_prefix.clone().unwrap_or(config.redis.key_prefix);

        output.progress("Connecting to Redis");
        let store = RedisStore::connect(&redis_url, key_prefix)
            .await
            .context("Failed to connect to Redis")?;
        output.clear_line();
        output.success("Connected to Redis");

        Ok(store)
    }
}
