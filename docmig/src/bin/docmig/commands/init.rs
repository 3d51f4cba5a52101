use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use docmig::config::{CONFIG_DIR, config_path, find_project_root};
use docmig::{DocmigConfig, Direction};

use super::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Initialize",
    commands: &[
        "docmig init                                  # Write .docmig/config.toml",
        "docmig init --profile prod --key-prefix app  # Preset profiles and prefix",
        "docmig init --force                          # Overwrite an existing config",
    ],
}];

#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,

    /// Redis URL to store in the config (defaults to ${REDIS_URL})
    #[arg(long)]
    pub redis_url: Option<String>,

    /// Key prefix for migration records
    #[arg(long)]
    pub key_prefix: Option<String>,

    /// Default profile; repeat for more than one
    #[arg(long = "profile")]
    pub profiles: Vec<String>,
}

impl InitArgs {
    fn to_config(&self) -> DocmigConfig {
        let mut config = DocmigConfig::default();
        config.migrations.direction = Direction::Up;
        config.migrations.profiles = self.profiles.clone();
        if let Some(url) = &self.redis_url {
            config.redis.url = url.clone();
        }
        if let Some(prefix) = &self.key_prefix {
            config.redis.key_prefix = prefix.clone();
        }
        config
    }
}

pub async fn handle_init(args: InitArgs, output: &OutputManager) -> Result<()> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    let project_root = find_project_root(&current_dir).unwrap_or(current_dir);

    output.heading("Initialize docmig");
    output.key_value("Project root", &project_root.display().to_string());

    match write_config(&project_root, &args.to_config(), args.force) {
        Ok(path) => {
            output.success(&format!("Wrote {}", path.display()));
            output.bullet("Derive MigrationInfo on your migrations to register them");
            output.bullet("Run them from your application with docmig::cli::execute");
            Ok(())
        }
        Err(err) => {
            output.error(&err.to_string());
            output.bullet("Use --force to overwrite it");
            Err(err)
        }
    }
}

/// Write `config` under `project_root`, refusing to overwrite unless `force`.
pub fn write_config(project_root: &Path, config: &DocmigConfig, force: bool) -> Result<PathBuf> {
    let path = config_path(project_root);
    if path.exists() && !force {
        anyhow::bail!("{} already exists", path.display());
    }

    std::fs::create_dir_all(project_root.join(CONFIG_DIR))
        .with_context(|| format!("Failed to create {CONFIG_DIR}"))?;
    let content = config.to_toml_string()?;
    std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}
