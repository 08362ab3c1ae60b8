use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ipcatd::api::rest::{configure, AppState};
use ipcatd::config::Config;
use ipcatd::db::Catalog;
use ipcatd::metrics;
use ipcatd::sync::scheduler::{initial_sync, run_scheduler};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ipcatd=info".parse()?))
        .init();

    info!("ipcatd starting...");

    let config = Config::default();

    std::fs::create_dir_all(&config.data_dir)?;

    let catalog = Catalog::new();

    metrics::register_metrics();

    if let Err(e) = initial_sync(&catalog, &config).await {
        error!("Initial sync failed: {}", e);
    }

    let catalog_for_rest = Arc::clone(&catalog);
    let catalog_for_scheduler = Arc::clone(&catalog);
    let config_for_scheduler = config.clone();

    let shutdown_token = CancellationToken::new();
    let scheduler_token = shutdown_token.clone();

    let scheduler_handle = tokio::spawn(async move {
        run_scheduler(catalog_for_scheduler, config_for_scheduler, scheduler_token).await;
    });

    let rest_addr = format!("0.0.0.0:{}", config.rest_port);
    info!("REST server listening on {}", rest_addr);

    let rest_server = HttpServer::new(move || {
        let state = AppState {
            catalog: Arc::clone(&catalog_for_rest),
        };
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure)
    })
    .workers(num_cpus::get())
    .bind(&rest_addr)?
    .run();

    let rest_handle = rest_server.handle();
    let rest_token = shutdown_token.clone();

    let rest_shutdown_task = tokio::spawn(async move {
        rest_token.cancelled().await;
        info!("REST server shutting down");
        rest_handle.stop(true).await;
    });

    let rest_server_task = tokio::spawn(async move {
        if let Err(e) = rest_server.await {
            error!("REST server error: {}", e);
        }
        info!("REST server stopped");
    });

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, initiating graceful shutdown");

    shutdown_token.cancel();

    let shutdown_timeout = std::time::Duration::from_secs(10);
    let _ = tokio::time::timeout(shutdown_timeout, async {
        let _ = tokio::join!(scheduler_handle, rest_shutdown_task, rest_server_task);
    })
    .await;

    info!("Shutdown complete");
    Ok(())
}
