//! oxide-query CLI
//!
//! Compiles JSON condition maps into MongoDB filter documents.

use std::io::Read;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_query::{mix_q, Cond};

/// Django-style filters for MongoDB.
#[derive(Parser)]
#[command(name = "oxide-query")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pretty-print JSON output.
    #[arg(long, env = "OXIDE_QUERY_PRETTY")]
    pretty: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON condition map into a filter document.
    Compile {
        /// Condition map as JSON; read from stdin when omitted or `-`.
        condition: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Compile { condition } => {
            let input = match condition.as_deref() {
                None | Some("-") => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("failed to read condition from stdin")?;
                    buf
                }
                Some(text) => text.to_string(),
            };

            let json: serde_json::Value =
                serde_json::from_str(&input).context("condition is not valid JSON")?;
            let cond = Cond::from_json(json)?;
            debug!(keys = cond.len(), "parsed condition map");

            let query = mix_q(cond)?;
            let out = query.to_json_value();
            if cli.pretty {
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{out}");
            }
        }
    }

    Ok(())
}
