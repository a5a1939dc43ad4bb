// NextTab CLI - headless access to the new-tab settings store

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use nexttab_core::{Config, StorageRegistry};

#[derive(Parser)]
#[command(name = "nexttab")]
#[command(about = "Export, import and inspect NextTab settings")]
#[command(version)]
struct Cli {
    /// JSON config file (defaults apply when omitted)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write all synced settings to a bundle file
    Export {
        /// Output file (defaults to nexttab-settings-<date>.json)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Import a bundle file; invalid sections are skipped with a warning
    Import {
        file: PathBuf,
    },

    /// Print the current settings as a bundle
    Show,

    /// Show the onboarding again on next launch
    ResetOnboarding,
}

#[tokio::main]
async fn main() -> ExitCode {
    nexttab_core::init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let registry = StorageRegistry::open(config).context("failed to open storage")?;
    registry.warm_up().await.context("failed to read stored settings")?;

    match cli.command {
        Commands::Export { out } => export(&registry, out).await,
        Commands::Import { file } => import(&registry, &file).await,
        Commands::Show => {
            let bundle = registry.transfer().export().await?;
            println!("{}", serde_json::to_string_pretty(&bundle)?);
            let onboarded = registry.onboarding().is_completed().await?;
            eprintln!("onboarding completed: {}", onboarded);
            Ok(())
        }
        Commands::ResetOnboarding => {
            registry.onboarding().reset().await?;
            println!("Onboarding will show on next launch");
            Ok(())
        }
    }
}

async fn export(registry: &StorageRegistry, out: Option<PathBuf>) -> Result<()> {
    let bundle = registry.transfer().export().await?;
    let path = out.unwrap_or_else(|| PathBuf::from(bundle.suggested_file_name()));
    let bytes = serde_json::to_vec_pretty(&bundle)?;

    std::fs::write(&path, bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Exported settings to {}", path.display());
    Ok(())
}

async fn import(registry: &StorageRegistry, file: &Path) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;

    let report = registry
        .transfer()
        .import_json(&bytes)
        .await
        .with_context(|| format!("{} was not imported", file.display()))?;

    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
    let sections: Vec<_> = report
        .imported_sections
        .iter()
        .map(ToString::to_string)
        .collect();
    if sections.is_empty() {
        println!("Nothing imported");
    } else {
        println!("Imported {}", sections.join(", "));
    }
    tracing::debug!(skipped_quick_links = report.skipped_quick_links, "Import done");
    Ok(())
}
