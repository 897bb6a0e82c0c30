use anyhow::Context;
use clap::{Parser, Subcommand};
use quiver::registry::{self, RegistryKind};
use quiver::{CollectionOptions, StoredCollection};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Inspect and maintain quiver collections
#[derive(Parser, Debug)]
#[command(name = "quiver")]
#[command(about = "Inspect and maintain quiver collections", long_about = None)]
struct Args {
    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print collection statistics as JSON
    Info {
        /// Collection directory
        path: PathBuf,
    },
    /// Print documents by primary key as JSON
    Fetch {
        path: PathBuf,
        /// Primary keys
        #[arg(required = true)]
        pks: Vec<String>,
    },
    /// Replay the log and write buffered records out
    Flush { path: PathBuf },
    /// Delete a collection directory
    Destroy { path: PathBuf },
    /// List registered metrics, builders, searchers and streamers
    Registry,
}

fn read_only() -> CollectionOptions {
    CollectionOptions {
        read_only: true,
        ..CollectionOptions::default()
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Info { path } => {
            let collection = StoredCollection::open(&path, read_only())
                .with_context(|| format!("opening {}", path.display()))?;
            let stats = collection.stats()?;
            let details: serde_json::Value = serde_json::from_str(&stats.json_details)?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        Command::Fetch { path, pks } => {
            let collection = StoredCollection::open(&path, read_only())
                .with_context(|| format!("opening {}", path.display()))?;
            let found = collection.fetch(&pks)?;
            for (_, doc) in &found {
                println!("{}", serde_json::to_string(&doc.to_json())?);
            }
            info!("Fetched {} of {} documents", found.len(), pks.len());
        }
        Command::Flush { path } => {
            let collection = StoredCollection::open(&path, CollectionOptions::default())
                .with_context(|| format!("opening {}", path.display()))?;
            collection.flush()?;
            info!("Flushed {:?} at generation {}", path, collection.generation());
        }
        Command::Destroy { path } => {
            let collection = StoredCollection::open(&path, CollectionOptions::default())
                .with_context(|| format!("opening {}", path.display()))?;
            collection.destroy()?;
        }
        Command::Registry => {
            for kind in RegistryKind::ALL {
                println!("{}: {}", kind.name(), registry::registered(kind).join(", "));
            }
        }
    }

    Ok(())
}
