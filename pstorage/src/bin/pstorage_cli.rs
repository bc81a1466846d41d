use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use pstorage::PStorage;
use pstorage::config::StorageConfig;
use pstorage::models::{PageSpec, ProductRecord, SortColumn, SortDirection, SortSpec};

#[derive(Parser, Debug)]
#[command(
    name = "pstorage-cli",
    about = "Inspect and administer a pstorage product catalog."
)]
struct Cli {
    /// Base path of the pstorage instance (directory containing catalog.sqlite).
    #[arg(short, long, default_value = ".", value_hint = clap::ValueHint::DirPath)]
    base_path: PathBuf,

    /// Minimum log level to display.
    #[arg(long, default_value_t = LogLevelArg::Info, value_enum)]
    log_level: LogLevelArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the number of products in the catalog.
    Stats {
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Print one page of the sorted catalog.
    Dump {
        /// Sort column: product, price, timesChanged or requestTime.
        #[arg(long, default_value = "product")]
        column: SortColumn,

        /// Sort direction: ascending or descending.
        #[arg(long, default_value = "ascending")]
        order: SortDirection,

        /// Page number; negative values count from the end.
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        page: i64,

        /// Rows per page.
        #[arg(long, default_value_t = 50)]
        per_page: i64,

        /// Emit JSON array instead of a text table.
        #[arg(long)]
        json: bool,
    },
    /// Remove a product from the catalog.
    Delete {
        /// Exact product name.
        product: String,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(value: LogLevelArg) -> Self {
        match value {
            LogLevelArg::Error => LevelFilter::Error,
            LogLevelArg::Warn => LevelFilter::Warn,
            LogLevelArg::Info => LevelFilter::Info,
            LogLevelArg::Debug => LevelFilter::Debug,
            LogLevelArg::Trace => LevelFilter::Trace,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_level(cli.log_level.into())
        .try_init();

    let config = StorageConfig::new(&cli.base_path);
    let storage = PStorage::new(config)
        .await
        .with_context(|| format!("failed to open catalog under {}", cli.base_path.display()))?;

    match cli.command {
        Commands::Stats { json } => {
            let count = storage.store().count().await?;
            if json {
                println!("{}", serde_json::json!({ "product_count": count }));
            } else {
                println!("products: {count}");
            }
        }
        Commands::Dump {
            column,
            order,
            page,
            per_page,
            json,
        } => {
            let spec = PageSpec::new(SortSpec::new(column, order), page, per_page)?;
            let records = storage.query().list(&spec).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_table(&records);
            }
        }
        Commands::Delete { product } => {
            if storage.store().delete_one(&product).await? {
                log::info!("Deleted '{}'", product);
            } else {
                anyhow::bail!("product '{product}' not found");
            }
        }
    }

    Ok(())
}

fn print_table(records: &[ProductRecord]) {
    let width = records
        .iter()
        .map(|record| record.product.len())
        .max()
        .unwrap_or(0)
        .max("PRODUCT".len());

    println!(
        "{:<width$}  {:>12}  {:>8}  {}",
        "PRODUCT", "PRICE", "CHANGED", "REQUEST TIME"
    );
    for record in records {
        let requested = chrono::DateTime::from_timestamp(record.request_time, 0)
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| record.request_time.to_string());
        println!(
            "{:<width$}  {:>12.2}  {:>8}  {}",
            record.product, record.price, record.times_changed, requested
        );
    }
}
