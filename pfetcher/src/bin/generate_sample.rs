use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pfetcher::parser::{DELIMITER, EXPECTED_HEADER};
use rand::Rng;

#[derive(Parser, Debug)]
#[command(
    name = "generate-sample",
    about = "Generate a random PRODUCT NAME;PRICE price list for testing",
    after_help = "Example:\n  cargo run -p pfetcher --bin generate-sample -- sample_set_1.csv --rows 1000"
)]
struct Args {
    /// File to write.
    output: PathBuf,

    /// Number of data rows.
    #[arg(long, default_value_t = 1000)]
    rows: usize,

    /// Product names are drawn from test_product_1..=distinct, so repeats are likely.
    #[arg(long, default_value_t = 1000)]
    distinct: u32,
}

fn main() -> Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let args = Args::parse();
    anyhow::ensure!(args.distinct > 0, "--distinct must be at least 1");

    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_path(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    writer.write_record(EXPECTED_HEADER)?;
    let mut rng = rand::thread_rng();
    for _ in 0..args.rows {
        let product = format!("test_product_{}", rng.gen_range(1..=args.distinct));
        let price = f64::from(rng.gen_range(1..=1000u32)) / 100.0;
        writer.write_record([product, price.to_string()])?;
    }
    writer.flush()?;

    log::info!("Wrote {} rows to {}", args.rows, args.output.display());
    Ok(())
}
