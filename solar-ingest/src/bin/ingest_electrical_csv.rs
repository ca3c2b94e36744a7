use anyhow::{bail, Result};
use solar_ingest::{config::AppConfig, ingest_electrical_csv, observability};
use std::env;

/// Load an electrical-readings CSV into `electrical_data`.
///
/// Usage:
///   ingest_electrical_csv <system_id> <csv_path>
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!("usage: ingest_electrical_csv <system_id> <csv_path>");
    }
    let system_id: i64 = args[1]
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid system_id '{}': {e}", args[1]))?;
    let csv_path = &args[2];

    // INGESTION_CONFIG can point at a per-site config file.
    let cfg = AppConfig::load()?;
    let options = cfg.ingest.options()?;

    let total = ingest_electrical_csv(&cfg.storage.url, system_id, csv_path, &options).await?;
    println!("{total}");

    Ok(())
}
