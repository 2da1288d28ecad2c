use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::contract::RecordStore;
use crate::load_config::load_config;
use crate::notion::NotionClient;
use crate::store::{status_summary, InMemoryStore};
use crate::synchronise::Synchroniser;

/// CLI for notion-mirror: mirror workspace pages and databases as flat markdown.
#[derive(Parser)]
#[clap(
    name = "notion-mirror",
    version,
    about = "Mirror selected Notion pages and databases into a local store as flattened markdown"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one full synchronisation of the targets listed in the config file
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(config)?;
            config.trace_loaded();

            let store = InMemoryStore::new();
            for target in &config.targets {
                store
                    .upsert_target(target.clone())
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to seed sync target: {e}"))?;
            }

            let source = config.api_key.map(NotionClient::new);
            let synchroniser = Synchroniser::new(source, store);

            println!("Synchronise starting...");
            match synchroniser.run_full_sync().await {
                Ok(report) => {
                    println!("Synchronise complete.\nReport:");
                    println!("{report:#?}");
                    let summary = status_summary(synchroniser.store())
                        .await
                        .map_err(|e| anyhow::anyhow!("Failed to compute status summary: {e}"))?;
                    println!("Status:");
                    println!("{summary:#?}");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("[ERROR] Synchronisation failed: {e}");
                    Err(e.into())
                }
            }
        }
    }
}
