//! Filament Atlas CLI
//!
//! CLI commands:
//! - fetch: Ingest the remote catalog, optionally export it
//! - cluster: Cluster an exported catalog at a viewer distance
//! - levels: Show the LOD table

use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;

use filament_atlas::config::{Config, Secrets};
use filament_atlas::{lod, logging, Catalog, Category, Filter, IngestError, Ingestor};

#[derive(Parser)]
#[command(name = "filament_atlas")]
#[command(about = "Filament color catalog ingestion and RGB-space clustering")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to atlas.yaml config
    #[arg(short, long, default_value = "atlas.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and normalize the remote catalog
    Fetch {
        /// Write the entries as a JSON array
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Cluster an exported catalog
    Cluster {
        /// Exported catalog JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Viewer distance selecting the LOD level
        #[arg(short, long)]
        distance: f64,

        /// Only show these categories (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Case-insensitive search over product, name and hex
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Print the LOD table
    Levels,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let secrets = Secrets::load();
    logging::init_logging(&secrets.log_dir)?;
    tracing::info!("Filament Atlas starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let config = if cli.config.exists() {
        tracing::info!("Loading config from {:?}", cli.config);
        Config::load(&cli.config)?
    } else {
        tracing::warn!("Config file not found: {:?}, using defaults", cli.config);
        Config::default()
    };
    let config = config.with_secrets(&secrets);
    config.validate()?;

    match cli.command {
        Commands::Fetch { output } => fetch(&config, output).await?,
        Commands::Cluster {
            input,
            distance,
            categories,
            search,
        } => cluster(&config, &input, distance, &categories, search)?,
        Commands::Levels => levels(&config),
    }

    Ok(())
}

/// Run one ingestion and print a summary
async fn fetch(config: &Config, output: Option<PathBuf>) -> anyhow::Result<()> {
    let ingestor = Ingestor::from_config(config)?;
    let mut catalog = Catalog::new();

    let summary = match ingestor.run(&mut catalog).await {
        Ok(summary) => summary,
        Err(e) => {
            if let IngestError::TotalAcquisitionFailure(failures) = &e {
                for failure in failures {
                    filament_atlas::log_error!(failure.error, strategy = %failure.strategy);
                }
            }
            filament_atlas::log_error!(e);
            anyhow::bail!("{}", e);
        }
    };

    println!(
        "Loaded {} colors from {} records via {} at {}",
        summary.emitted,
        summary.records,
        summary.strategy.as_deref().unwrap_or("-"),
        summary.finished_at.format("%Y-%m-%d %H:%M:%S")
    );
    for (category, count) in catalog.counts_by_category() {
        println!("  {:<6} {}", category, count);
    }

    if let Some(path) = output {
        catalog.export(&path)?;
        println!("Wrote {:?}", path);
    }
    Ok(())
}

/// Cluster an exported catalog at the LOD level for `distance`
fn cluster(
    config: &Config,
    input: &PathBuf,
    distance: f64,
    categories: &[String],
    search: Option<String>,
) -> anyhow::Result<()> {
    let catalog = Catalog::import(input, &config.fallback_url)?;

    let categories = if categories.is_empty() {
        None
    } else {
        let parsed = categories
            .iter()
            .map(|name| {
                Category::from_name(name).ok_or_else(|| anyhow::anyhow!("Unknown category: {}", name))
            })
            .collect::<anyhow::Result<BTreeSet<_>>>()?;
        Some(parsed)
    };
    let filter = Filter { categories, search };
    let visible = catalog.visible_ids(&filter);

    let threshold = lod::threshold_for(&config.lod, distance);
    let clusters = filament_atlas::cluster(catalog.entries(), &visible, threshold);

    println!(
        "{} visible of {} entries, threshold {} -> {} clusters",
        visible.len(),
        catalog.len(),
        threshold,
        clusters.len()
    );
    for c in &clusters {
        let [x, y, z] = c.centroid();
        let label = c.representative();
        println!(
            "  {} x{:<4} centroid ({:.1}, {:.1}, {:.1})  {} {}",
            c.display_hex(),
            c.len(),
            x,
            y,
            z,
            label.product(),
            label.name()
        );
    }
    Ok(())
}

fn levels(config: &Config) {
    println!("LOD levels ({}):", config.lod.len());
    for level in &config.lod {
        println!("  distance >= {:<8} threshold {}", level.min_distance, level.threshold);
    }
}
