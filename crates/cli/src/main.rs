use std::sync::Arc;

use anyhow::{bail, Context};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wfcat_catalog::{BuildRequest, Interruption, WorkflowCatalogBuilder};
use wfcat_db::{MemoryRecordStore, PgRecordStore, RecordStore};
use wfcat_events::{EventBus, EventLogger};

mod config;

use config::{CliConfig, StoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = CliConfig::from_env()?;
    let store = connect(&config.store).await?;

    let bus = Arc::new(EventBus::default());
    let logger = tokio::spawn(EventLogger::run(bus.subscribe()));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after the current page");
                cancel.cancel();
            }
        }
    });

    let builder = WorkflowCatalogBuilder::new(store)
        .with_classifier(config.classifier.clone())
        .with_concurrency(config.concurrency)?
        .with_event_bus(Arc::clone(&bus));
    let request = BuildRequest::default()
        .start(config.batch_start)
        .page_size(config.batch_size);

    let outcome = builder.build_all(&request, &cancel).await?;
    let report = wfcat_report::render(config.format, &outcome.catalog)?;

    match &config.output {
        Some(path) => {
            tokio::fs::write(path, report)
                .await
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                format = config.format.as_str(),
                "Report written"
            );
        }
        None => print!("{report}"),
    }

    // Closing the bus lets the logger drain and exit.
    drop(builder);
    drop(bus);
    let _ = logger.await;

    if let Some(interruption) = outcome.interruption {
        log_interruption(&interruption);
        bail!(
            "Catalog build stopped early; rerun with WFCAT_BATCH_START={} to continue",
            interruption.resume_from()
        );
    }
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wfcat=info,wfcat_catalog=info,wfcat_events=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect(config: &StoreConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    match config {
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let pool = wfcat_db::create_pool(database_url, *max_connections)
                .await
                .context("Failed to connect to database")?;
            tracing::info!(max_connections, "Database connection pool created");

            wfcat_db::health_check(&pool)
                .await
                .context("Database health check failed")?;
            tracing::info!("Database health check passed");

            Ok(Arc::new(PgRecordStore::new(pool)))
        }
        StoreConfig::Memory { fixture } => {
            let raw = tokio::fs::read_to_string(fixture)
                .await
                .with_context(|| format!("Failed to read fixture {}", fixture.display()))?;
            let value: serde_json::Value =
                serde_json::from_str(&raw).context("Fixture is not valid JSON")?;
            let store = MemoryRecordStore::from_fixture(value)?;
            tracing::info!(fixture = %fixture.display(), "Loaded in-memory record store");
            Ok(Arc::new(store))
        }
    }
}

fn log_interruption(interruption: &Interruption) {
    match interruption {
        Interruption::Cancelled { resume_from } => {
            tracing::warn!(resume_from, "Catalog build cancelled");
        }
        Interruption::StoreUnavailable { resume_from, error } => {
            tracing::error!(resume_from, error = %error, "Catalog build stopped by store failure");
        }
    }
}
