pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use ticketry_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "ticketry",
    about = "Ticketry operator CLI",
    long_about = "Operate the Ticketry service-request store: migrations, seed data, reports, config inspection, and readiness checks.",
    after_help = "Examples:\n  ticketry migrate\n  ticketry seed\n  ticketry report --csv\n  ticketry doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic seed dataset and verify it against its contract")]
    Seed,
    #[command(about = "Summarise requests by status and category, or export them as CSV")]
    Report {
        #[arg(long, help = "Emit the full request export as CSV instead of the summary")]
        csv: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, upload directory, and database connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

fn init_logging() {
    use ticketry_core::config::LogFormat::*;
    use tracing::Level;

    let Ok(config) = AppConfig::load(LoadOptions::default()) else {
        return;
    };
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    let builder = tracing_subscriber::fmt().with_target(false).with_max_level(log_level);
    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Report { csv } => commands::report::run(csv),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
