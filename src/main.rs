use anyhow::{Context, Result};
use songplay_etl::config::PipelineConfig;
use songplay_etl::pipeline;
use songplay_etl::storage::ObjectStore;
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    info!("🚀 Starting Songplay Warehouse ETL");

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "src/configs/pipeline.toml".to_string());

    let config = PipelineConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load pipeline configuration from {}", config_path))?;

    info!(
        "Loaded pipeline configuration: {}@{}",
        config.store.endpoint, config.store.bucket_name
    );

    let store = ObjectStore::from_config(&config.store)
        .context("Failed to initialize object store")
        .with_context(|| {
            "Please ensure the object store is reachable and credential environment variables are set"
        })?;

    store.ensure_bucket().await?;

    let summary = pipeline::run(&store, &config).await?;

    info!("\n=== Warehouse Run Summary ({}) ===", summary.run_id);
    info!(
        "📥 Staged {} song records ({} dropped) and {} event records ({} dropped)",
        summary.song_read.parsed,
        summary.song_read.dropped,
        summary.event_read.parsed,
        summary.event_read.dropped
    );
    info!(
        "📊 Wrote {} songs, {} artists, {} users, {} time rows, {} songplays",
        summary.songs, summary.artists, summary.users, summary.time, summary.songplays
    );
    info!("🎉 Warehouse run completed successfully!");

    Ok(())
}
