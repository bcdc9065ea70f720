//! CLI for resend.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use resend_core::config::{self, ResendConfig};
use std::path::PathBuf;

use commands::{run_completions, run_config, run_get, GetArgs};

/// Top-level CLI for resend.
#[derive(Debug, Parser)]
#[command(name = "resend")]
#[command(about = "resend: HTTP client with transparent retries", long_about = None)]
pub struct Cli {
    /// Read configuration from PATH instead of ~/.config/resend/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// GET a URL, retrying transient failures; the body goes to stdout.
    Get {
        /// Absolute HTTP/HTTPS URL.
        url: String,

        /// Extra request header, e.g. -H 'Authorization: Bearer xyz'. Repeatable.
        #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
        headers: Vec<String>,

        /// Override the configured maximum number of retries.
        #[arg(long, value_name = "N")]
        max_retries: Option<u32>,

        /// Override the backoff schedule, comma-separated milliseconds (e.g. 250,500,1000).
        #[arg(long, value_delimiter = ',', value_name = "MS")]
        delay_ms: Option<Vec<u64>>,

        /// Send once; never retry.
        #[arg(long)]
        no_retry: bool,

        /// Print the status line and response headers before the body.
        #[arg(short, long)]
        include: bool,
    },

    /// Show the config file path and the effective configuration.
    Config,

    /// Print a shell completion script.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let (cfg, cfg_path) = load_config(cli.config)?;
        tracing::debug!("loaded config from {}: {:?}", cfg_path.display(), cfg);

        match cli.command {
            CliCommand::Get {
                url,
                headers,
                max_retries,
                delay_ms,
                no_retry,
                include,
            } => {
                let args = GetArgs {
                    url,
                    headers,
                    max_retries,
                    delay_ms,
                    no_retry,
                    include,
                };
                run_get(&cfg, args).await?
            }
            CliCommand::Config => run_config(&cfg, &cfg_path)?,
            CliCommand::Completions { shell } => run_completions(shell),
        }

        Ok(())
    }
}

fn load_config(explicit: Option<PathBuf>) -> Result<(ResendConfig, PathBuf)> {
    match explicit {
        Some(path) => Ok((config::load_from(&path)?, path)),
        None => Ok((config::load_or_init()?, config::config_path()?)),
    }
}

#[cfg(test)]
mod tests;
