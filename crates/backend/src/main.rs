use std::sync::Arc;

use contracts::enums::ProcessingStatus;

use backend::shared::config;
use backend::shared::data::db;
use backend::shared::logging;
use backend::shared::mws::ConnectionRegistry;
use backend::usecases::u501_feed_export::gateway::FeedsGateway;
use backend::usecases::u502_fulfillment_sync::gateway::FulfillmentGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = config::load_config()?;
    let db_path = config::get_database_path(&config)?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    db::initialize_database(Some(&db_path.to_string_lossy())).await?;

    let registry = Arc::new(ConnectionRegistry::http());
    let feeds = FeedsGateway::new(registry.clone());
    let fulfillment = FulfillmentGateway::new(registry, &config);

    // One sync cycle: advance feed submissions, pull reports for the
    // finished ones, then refresh in-flight fulfillment orders
    let changed = feeds.update_feed_submissions().await?;
    for submission in &changed {
        if submission.processing_status != ProcessingStatus::Done {
            continue;
        }
        if let Err(e) = feeds.process_submission_results(submission).await {
            tracing::error!(
                "Failed to fetch report for submission {}: {:#}",
                submission.submission_id,
                e
            );
        }
    }
    let refreshed = fulfillment.update_fulfillment_orders().await?;

    tracing::info!(
        "Sync cycle finished: {} submissions moved, {} fulfillment orders refreshed",
        changed.len(),
        refreshed
    );
    Ok(())
}
