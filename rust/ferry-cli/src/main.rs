//! Ferry CLI: interact with host objects from the shell.

use clap::{Parser as ClapParser, Subcommand};
use ferry_cli::{logging, parse_arg, render, CliError, FerryConfig, Session};
use std::path::PathBuf;

fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}

#[derive(ClapParser)]
#[command(name = "ferry", version, about = "Call native host objects from the command line")]
struct Cli {
    /// Path to ferry.toml (default: search upward from the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a method and print its result, waiting for async methods
    Call {
        /// Host object name (fs, http, platform)
        object: String,
        /// Method name
        member: String,
        /// Arguments, parsed as JSON when possible and as strings otherwise
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Read a property
    Get {
        /// Host object name
        object: String,
        /// Property name
        property: String,
    },
    /// List the members of a host object
    Members {
        /// Host object name
        object: String,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = FerryConfig::load(cli.config.as_deref())?;
    logging::init(&config.logging.filter)?;
    let mut session = Session::new(&config)?;

    match cli.command {
        Commands::Call {
            object,
            member,
            args,
        } => {
            let args: Vec<_> = args.iter().map(|a| parse_arg(a)).collect();
            tracing::debug!(%object, %member, argc = args.len(), "call");
            let value = session.call(&object, &member, &args)?;
            println!("{}", render(&value));
        }
        Commands::Get { object, property } => {
            let value = session.get(&object, &property)?;
            println!("{}", render(&value));
        }
        Commands::Members { object } => {
            for name in session.members(&object)? {
                println!("{}", name);
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {}", red("error:"), e);
        std::process::exit(1);
    }
}
