pub mod bootstrap;
pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "repfuel",
    about = "Repfuel coaching backend CLI",
    long_about = "Talk to the Repfuel coach, apply migrations, validate runtime readiness, and inspect effective configuration.",
    after_help = "Examples:\n  repfuel chat --user alex_1 \"I ran 5k this morning\"\n  repfuel migrate\n  repfuel doctor --json\n  repfuel config"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Path to a repfuel.toml config file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Send a message to the coach, or start an interactive session")]
    Chat {
        #[arg(long, help = "User id the conversation belongs to")]
        user: String,
        #[arg(help = "Message to send; omit to read messages interactively")]
        message: Option<String>,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Validate config, model credentials, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { user, message } => commands::chat::run(cli.config, user, message),
        Command::Migrate => commands::migrate::run(cli.config),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(cli.config) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(cli.config, json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
