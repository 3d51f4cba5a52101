mod commands;
mod output;
mod theme;

use anyhow::Result;
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Color as ClapColor, RgbColor, Style},
    },
    error::ErrorKind,
};
use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};
use std::fmt::Write;
use std::io::{self, Write as IoWrite};

use commands::{
    COMMAND_EXAMPLES, ExampleGroup,
    init::{InitArgs, handle_init},
    resolve::{ResolveArgs, handle_resolve},
    status::{StatusArgs, handle_status},
};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{PALETTE, STEP_ICON};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("REDIS_URL", "Redis connection URL of the migrated store"),
    ("RUST_LOG", "Log filter, e.g. docmig=debug"),
];

#[derive(Parser)]
#[command(name = "docmig")]
#[command(version)]
#[command(
    about = "Operate versioned data migrations on a document store",
    long_about = r#"Operations tool for docmig migration records:

• Initialize a project's .docmig/config.toml
• Inspect which migrations are applied
• Repair marker records after manual intervention

Migrations themselves run from the application binary that defines them
(see docmig::cli).

Commands:
  init      Write .docmig/config.toml
  status    List applied migrations
  resolve   Mark a migration as applied or rolled back
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize docmig in the current project
    Init(InitArgs),

    /// List applied migrations
    Status(StatusArgs),

    /// Manually mark a migration as applied or rolled back
    Resolve(ResolveArgs),
}

impl Cli {
    fn parse_with_styles() -> Self {
        let command = build_cli_command().styles(help_styles());
        let matches = command.try_get_matches().unwrap_or_else(|err| exit_on_parse_error(err));
        Cli::from_arg_matches(&matches).unwrap_or_else(|err| exit_on_parse_error(err))
    }
}

fn exit_on_parse_error(err: clap::Error) -> ! {
    let to_stdout = matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion);
    let _ = if to_stdout { print_blank_line_stdout() } else { print_blank_line_stderr() };
    if let Err(print_err) = err.print()
        && print_err.kind() != io::ErrorKind::BrokenPipe
    {
        eprintln!("Failed to display help: {print_err}");
    }
    let _ = if to_stdout { print_blank_line_stdout() } else { print_blank_line_stderr() };
    std::process::exit(err.exit_code());
}

fn build_cli_command() -> Command {
    let use_color = ShouldColorize::from_env().should_colorize();
    let mut command = Cli::command().after_long_help(render_top_level_appendix(use_color));
    command = command.color(if use_color { ColorChoice::Auto } else { ColorChoice::Never });

    for (name, groups) in COMMAND_EXAMPLES {
        if let Some(subcommand) = command.find_subcommand_mut(name) {
            let updated = subcommand.clone().after_long_help(render_examples(groups, use_color));
            *subcommand = updated;
        }
    }
    command
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let mut buffer = String::new();
    let _ = writeln!(buffer, "{}", stylize("Examples:", PALETTE.progress, true, use_color));

    for (index, group) in groups.iter().enumerate() {
        let _ = writeln!(buffer, "  {}", stylize(group.title, PALETTE.heading, true, use_color));
        for command in group.commands {
            let arrow = stylize(STEP_ICON, PALETTE.command, false, use_color);
            let _ = writeln!(buffer, "    {arrow} {}", stylize(command, PALETTE.command, false, use_color));
        }
        if index + 1 < groups.len() {
            buffer.push('\n');
        }
    }

    buffer
}

fn render_top_level_appendix(use_color: bool) -> String {
    let mut buffer = String::new();

    let _ = writeln!(buffer, "{}", stylize("Environment Variables:", PALETTE.progress, true, use_color));
    for (key, description) in ENVIRONMENT_VARIABLES {
        let key_text = stylize(key, PALETTE.label, true, use_color);
        let _ = writeln!(buffer, "  {key_text}  {}", stylize(description, PALETTE.text, false, use_color));
    }

    buffer.push('\n');
    let tip = stylize(
        "Use 'docmig <command> --help' to view examples for each command.",
        PALETTE.command,
        false,
        use_color,
    );
    let _ = writeln!(buffer, "{} {tip}", stylize("Tip:", PALETTE.progress, true, use_color));

    buffer
}

fn print_blank_line_stdout() -> io::Result<()> {
    let mut stdout = io::stdout();
    IoWrite::write_all(&mut stdout, b"\n")?;
    IoWrite::flush(&mut stdout)
}

fn print_blank_line_stderr() -> io::Result<()> {
    let mut stderr = io::stderr();
    IoWrite::write_all(&mut stderr, b"\n")?;
    IoWrite::flush(&mut stderr)
}

fn stylize(text: &str, color: ThemeColor, bold: bool, use_color: bool) -> String {
    match (use_color, bold) {
        (false, _) => text.to_string(),
        (true, false) => text.color(color).to_string(),
        (true, true) => text.color(color).bold().to_string(),
    }
}

fn help_styles() -> Styles {
    Styles::styled()
        .usage(style_from_color(PALETTE.heading).bold())
        .header(style_from_color(PALETTE.progress).bold())
        .literal(style_from_color(PALETTE.command))
        .placeholder(style_from_color(PALETTE.placeholder))
        .valid(style_from_color(PALETTE.ok))
        .invalid(style_from_color(PALETTE.caution))
        .error(style_from_color(PALETTE.failure).bold())
}

fn style_from_color(color: ThemeColor) -> Style {
    let clap_color = match color {
        ThemeColor::Black => ClapColor::Ansi(AnsiColor::Black),
        ThemeColor::Red => ClapColor::Ansi(AnsiColor::Red),
        ThemeColor::Green => ClapColor::Ansi(AnsiColor::Green),
        ThemeColor::Yellow => ClapColor::Ansi(AnsiColor::Yellow),
        ThemeColor::Blue => ClapColor::Ansi(AnsiColor::Blue),
        ThemeColor::Magenta => ClapColor::Ansi(AnsiColor::Magenta),
        ThemeColor::Cyan => ClapColor::Ansi(AnsiColor::Cyan),
        ThemeColor::White => ClapColor::Ansi(AnsiColor::White),
        ThemeColor::BrightBlack => ClapColor::Ansi(AnsiColor::BrightBlack),
        ThemeColor::BrightRed => ClapColor::Ansi(AnsiColor::BrightRed),
        ThemeColor::BrightGreen => ClapColor::Ansi(AnsiColor::BrightGreen),
        ThemeColor::BrightYellow => ClapColor::Ansi(AnsiColor::BrightYellow),
        ThemeColor::BrightBlue => ClapColor::Ansi(AnsiColor::BrightBlue),
        ThemeColor::BrightMagenta => ClapColor::Ansi(AnsiColor::BrightMagenta),
        ThemeColor::BrightCyan => ClapColor::Ansi(AnsiColor::BrightCyan),
        ThemeColor::BrightWhite => ClapColor::Ansi(AnsiColor::BrightWhite),
        ThemeColor::TrueColor { r, g, b } => ClapColor::Rgb(RgbColor(r, g, b)),
    };
    Style::new().fg_color(Some(clap_color))
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse_with_styles();

    let _ = print_blank_line_stdout();

    match execute(cli).await {
        Ok(()) => {
            let _ = print_blank_line_stdout();
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            let _ = print_blank_line_stdout();
            std::process::exit(1);
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        no_color: cli.no_color,
    });

    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Init(args) => handle_init(args, &output).await,
        Commands::Status(args) => handle_status(args, &output).await,
        Commands::Resolve(args) => handle_resolve(args, &output).await,
    }
}
