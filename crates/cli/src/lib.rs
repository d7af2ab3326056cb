pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "titledesk",
    about = "TitleDesk operator CLI",
    long_about = "Operate TitleDesk readiness checks, config inspection, remembered visitor roles, and offline closing audits.",
    after_help = "Examples:\n  titledesk doctor --json\n  titledesk config\n  titledesk role set seller\n  titledesk audit --contract contract.pdf --disclosure cd.pdf"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, analysis key readiness, and session store writability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Read or update the visitor role remembered across sessions")]
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
    #[command(about = "Run a closing audit against staged documents and export the report")]
    Audit {
        #[arg(
            long = "contract",
            value_name = "PATH",
            required = true,
            help = "Purchase contract file (repeat the flag for multi-page uploads)"
        )]
        contracts: Vec<PathBuf>,
        #[arg(long, value_name = "PATH", help = "Closing Disclosure file")]
        disclosure: Option<PathBuf>,
        #[arg(
            long,
            value_name = "DIR",
            help = "Directory for the exported report (defaults to the configured export dir)"
        )]
        export_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
enum RoleAction {
    #[command(about = "Print the remembered visitor role")]
    Get,
    #[command(about = "Remember a visitor role for future sessions")]
    Set {
        #[arg(value_name = "ROLE", help = "buyer, seller, agent, lender, or investor")]
        role: String,
    },
    #[command(about = "Forget the remembered role")]
    Clear,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Role { action } => match action {
            RoleAction::Get => commands::role::get(),
            RoleAction::Set { role } => commands::role::set(&role),
            RoleAction::Clear => commands::role::clear(),
        },
        Command::Audit { contracts, disclosure, export_dir } => {
            commands::audit::run(&contracts, disclosure.as_deref(), export_dir)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
