use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use thiserror::Error;
use tokio::time::{sleep, Duration as TokioDuration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::db::{Catalog, Metadata};
use crate::metrics;
use crate::sync::downloader::{download_csv, DownloadError};
use crate::sync::importer::{full_import, rebuild_from_csv, ImportError};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),
}

fn duration_until_next_sync(target_hour: u8) -> TokioDuration {
    let now = Utc::now();
    let target_hour = u32::from(target_hour);

    let today_target = now
        .date_naive()
        .and_hms_opt(target_hour, 0, 0)
        .expect("valid time");
    let today_target = today_target.and_utc();

    let next_sync = if now.naive_utc() < today_target.naive_utc() {
        today_target
    } else {
        today_target + Duration::days(1)
    };

    let duration_secs = (next_sync - now).num_seconds().max(0) as u64;
    TokioDuration::from_secs(duration_secs)
}

fn update_metrics_from_catalog(meta: &Metadata) {
    #[allow(clippy::cast_possible_wrap)]
    metrics::set_record_count(meta.record_count as i64);
    if let Some(ts) = meta.last_sync {
        metrics::set_last_sync_timestamp(ts);
    }
}

pub async fn run_scheduler(catalog: Arc<Catalog>, config: Config, cancel_token: CancellationToken) {
    loop {
        let sleep_duration = duration_until_next_sync(config.sync_hour_utc);
        info!(
            "Next sync scheduled in {} hours {} minutes",
            sleep_duration.as_secs() / 3600,
            (sleep_duration.as_secs() % 3600) / 60
        );

        tokio::select! {
            () = sleep(sleep_duration) => {
                info!("Starting scheduled sync at {} UTC", config.sync_hour_utc);
                let start = Instant::now();
                if let Err(e) = perform_sync(&catalog, &config).await {
                    error!("Sync failed: {}", e);
                    metrics::inc_sync_failures();
                } else {
                    metrics::inc_sync_success();
                }
                metrics::record_sync_duration(start.elapsed().as_secs_f64());
            }
            () = cancel_token.cancelled() => {
                info!("Scheduler received shutdown signal");
                break;
            }
        }
    }
}

pub async fn perform_sync(catalog: &Arc<Catalog>, config: &Config) -> Result<(), SyncError> {
    info!("Starting scheduled sync");

    let result = download_csv(&config.csv_url).await?;

    let current_hash = catalog.metadata().csv_hash.clone();

    if catalog.is_empty() || current_hash.as_deref() != Some(result.hash.as_str()) {
        full_import(catalog, &result.content, &result.hash, config).await?;
    } else {
        info!("CSV unchanged, skipping import");
    }

    update_metrics_from_catalog(&catalog.metadata());

    Ok(())
}

pub async fn initial_sync(catalog: &Arc<Catalog>, config: &Config) -> Result<(), SyncError> {
    info!("Performing initial sync");

    if catalog.is_empty() {
        if config.csv_path().exists() {
            info!("Catalog empty but local CSV exists, rebuilding from CSV");
            rebuild_from_csv(catalog, config).await?;
        } else {
            info!("First run, downloading CSV");
            let result = download_csv(&config.csv_url).await?;
            full_import(catalog, &result.content, &result.hash, config).await?;
        }
    } else {
        info!("Catalog already populated, skipping initial sync");
    }

    update_metrics_from_catalog(&catalog.metadata());

    Ok(())
}
