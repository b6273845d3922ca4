use std::sync::Arc;

use anyhow::{Context, Result};
use card_catalog_importer::{
    AdapterRegistry, CancellationToken, CardSource, Catalog, ImporterConfig, RunSettings,
};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting card catalog importer");

    let config = ImporterConfig::from_env()?;
    let settings = Arc::new(RunSettings::from_env()?);

    let catalog = Catalog::connect(&config.database_url).await?;
    let registry = AdapterRegistry::with_default_sources(&catalog, &config)?;
    let source = registry.get(&settings.source).with_context(|| {
        format!("known sources: {}", registry.keys().join(", "))
    })?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling import");
            ctrl_c.cancel();
        }
    });

    let Some(schedule) = settings.schedule.clone() else {
        return run_import(source.as_ref(), &settings, &cancel).await;
    };

    // Run once immediately, then on the schedule
    if let Err(e) = run_import(source.as_ref(), &settings, &cancel).await {
        error!("Error during initial import: {:#}", e);
    }

    let mut sched = JobScheduler::new().await?;

    let job_source = source.clone();
    let job_settings = settings.clone();
    let job_cancel = cancel.clone();
    sched
        .add(Job::new_async(schedule.as_str(), move |_uuid, _l| {
            let source = job_source.clone();
            let settings = job_settings.clone();
            let cancel = job_cancel.clone();
            Box::pin(async move {
                if cancel.is_cancelled() {
                    return;
                }
                if let Err(e) = run_import(source.as_ref(), &settings, &cancel).await {
                    error!("Error during scheduled import: {:#}", e);
                }
            })
        })?)
        .await?;

    info!("Scheduler started - importing {} on '{}'", source.key(), schedule);
    sched.start().await?;

    cancel.cancelled().await;
    info!("Shutting down scheduler");
    sched.shutdown().await?;
    Ok(())
}

async fn run_import(
    source: &dyn CardSource,
    settings: &RunSettings,
    cancel: &CancellationToken,
) -> Result<()> {
    let summary = match &settings.file {
        Some(path) => {
            let mut file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open import file {path}"))?;
            source
                .import_from_file(&mut file, &settings.options, cancel)
                .await?
        }
        None => source.import_from_remote(&settings.options, cancel).await?,
    };

    info!("Import summary: {}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
