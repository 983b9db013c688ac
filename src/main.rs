// SPDX-License-Identifier: Apache-2.0 OR MIT
use anyhow::Result;
use clap::Parser;
use log_relay::{supervisor, worker};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug, PartialEq)]
enum Command {
    /// Run the collector and spawn workers that log through it
    Collector {
        /// JSON5 configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 2)]
        workers: usize,
        /// Messages each worker emits
        #[arg(long, default_value_t = 10)]
        messages: usize,
    },
    /// Run a worker (intended to be called by the collector)
    Worker {
        /// Logger name the worker emits on
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 10)]
        messages: usize,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Collector {
            config,
            workers,
            messages,
        } => {
            supervisor::run(supervisor::SupervisorConfig {
                config_path: config,
                workers,
                messages,
            })
            .await?;
        }
        Command::Worker {
            name,
            messages,
            config,
        } => {
            worker::run(worker::WorkerConfig {
                name,
                messages,
                config_path: config,
            })?;
        }
    }

    Ok(())
}
