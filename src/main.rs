use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};

mod client;
mod config;
mod dashboard;
mod feed;
mod monitor;
mod render;
mod snapshot;
#[cfg(test)]
mod testutil;
mod ui;

use client::Backend;
use config::Config;

/// Meshwatch: terminal monitor for a simulated sensor mesh
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the simulation (interactive TUI)
    Watch {
        /// Path to an optional configuration file
        #[arg(short, long)]
        config: Option<String>,
        /// Backend URL (overrides the config file)
        #[arg(long)]
        api: Option<String>,
        /// Number of nodes to start the simulation with
        #[arg(short, long)]
        nodes: Option<u32>,
        /// Delay between snapshot ticks, in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,
    },
    /// Fetch one snapshot and print it as JSON
    Snapshot {
        /// Backend URL
        #[arg(long, default_value = config::DEFAULT_API)]
        api: String,
    },
    /// Upload a video for the detection pipeline and follow the stream
    Upload {
        /// Video file to upload
        file: PathBuf,
        /// Backend URL
        #[arg(long, default_value = config::DEFAULT_API)]
        api: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Watch {
        config: None,
        api: None,
        nodes: None,
        tick_ms: None,
    }) {
        Commands::Watch {
            config,
            api,
            nodes,
            tick_ms,
        } => {
            // The watch screen owns the terminal; no stdout subscriber here.
            // Loop failures surface on the status line instead.
            let mut cfg = match &config {
                Some(path) => Config::load(path)?,
                None => Config::default(),
            };
            if let Some(api) = api {
                cfg.api = api;
            }
            if let Some(nodes) = nodes {
                cfg.n_nodes = nodes;
            }
            if let Some(tick_ms) = tick_ms {
                cfg.tick_ms = tick_ms;
            }
            cfg.validate()?;

            ui::run(Backend::new(&cfg.api), cfg).await
        }
        Commands::Snapshot { api } => {
            tracing_subscriber::fmt::init();
            let snap = Backend::new(&api).step().await?;
            println!("{}", serde_json::to_string_pretty(&snap)?);
            Ok(())
        }
        Commands::Upload { file, api } => {
            tracing_subscriber::fmt::init();
            let backend = Backend::new(&api);
            match backend.upload_video(&file).await {
                Ok(()) => {
                    info!("upload accepted, processing started");
                    feed::follow(&backend).await
                }
                Err(err) => {
                    error!("upload failed: {err}");
                    Err(anyhow::anyhow!("upload failed"))
                }
            }
        }
    }
}
