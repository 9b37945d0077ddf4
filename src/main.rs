use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use timbre_stream::{create_stream, index_directory, load_config, Catalog, StreamConfig};

/// Streaming triplet sampler for timbre metric-learning
#[derive(Parser)]
#[command(name = "timbre-stream")]
#[command(about = "Sample training batches from a directory of CQT feature archives")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a feature directory and print a catalog summary
    Index {
        /// Directory of .npz feature archives
        features: PathBuf,

        /// Filename field separator
        #[arg(long, default_value = "_")]
        sep: char,
    },
    /// Pull training batches and report tensor shapes
    Stream {
        /// Directory of .npz feature archives
        features: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of batches to pull
        #[arg(short, long, default_value_t = 4)]
        num_batches: usize,

        /// Filename field separator
        #[arg(long, default_value = "_")]
        sep: char,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

fn summarize(catalog: &Catalog) {
    let instruments: BTreeSet<&str> =
        catalog.iter().map(|(_, e)| e.instrument.as_str()).collect();
    let notes: BTreeSet<i32> = catalog.iter().map(|(_, e)| e.note_number).collect();

    println!("Indexed {} entries", catalog.len());
    println!("  {} instruments: {:?}", instruments.len(), instruments);
    if let (Some(lo), Some(hi)) = (notes.iter().next(), notes.iter().next_back()) {
        println!("  note numbers {}..={} ({} distinct)", lo, hi, notes.len());
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Index { features, sep } => {
            let catalog = index_directory(&features, None, sep)?;
            summarize(&catalog);
        }
        Commands::Stream {
            features,
            config,
            num_batches,
            sep,
        } => {
            let config = if let Some(config_path) = config {
                load_config(config_path)?
            } else {
                StreamConfig::default()
            };

            let catalog = index_directory(&features, None, sep)?;
            summarize(&catalog);

            let mut stream = create_stream(&catalog, &config)?;
            for n in 0..num_batches {
                let batch = stream.next_batch()?;
                for (name, tensor) in &batch.tensors {
                    println!("batch {}: {} {:?}", n, name, tensor.shape());
                }
            }
            println!("Pulled {} batches", num_batches);
        }
        Commands::ValidateConfig { config } => {
            let config = load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = StreamConfig::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}
