use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use fluxbox_server::{
    accounts::DuckDbAccountStore, payments::SimulatedPaymentGateway, state::AppState,
};

/// `fluxbox health`: liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$FLUXBOX_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("FLUXBOX_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }
    // Structured JSON logging. Level controlled via RUST_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fluxbox=info".parse()?),
        )
        .json()
        .init();

    let cfg = fluxbox_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/fluxbox.db", cfg.data_dir);
    let db = fluxbox_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;
    let accounts = Arc::new(DuckDbAccountStore::new(Arc::new(db)));

    let storage = fluxbox_storage::from_config(&cfg.storage).await?;
    // An unreachable bucket is reported, not fatal; /health stays degraded
    // until it answers.
    if let Err(e) = storage.store.health_check().await {
        tracing::warn!(
            error = %e,
            backend = storage.store.backend_name(),
            bucket = cfg.storage.bucket(),
            "Object store not reachable at startup"
        );
    }

    match &cfg.auth_mode {
        fluxbox_core::config::AuthMode::Jwt(_) => info!("Identity from HS256 bearer tokens"),
        fluxbox_core::config::AuthMode::TrustedHeader(header) => {
            info!(header = %header, "Identity from trusted proxy header")
        }
    }
    info!(
        strict_quota = cfg.strict_quota,
        upload_url_ttl_secs = cfg.upload_url_ttl_secs,
        "Admission configured"
    );

    let state = Arc::new(AppState::new(
        cfg.clone(),
        accounts,
        storage,
        Arc::new(SimulatedPaymentGateway),
    ));

    // Spawn background reservation purge.
    {
        let admission = Arc::clone(&state.admission);
        tokio::spawn(async move {
            admission.run_reservation_purge_loop().await;
        });
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = fluxbox_server::app::build_app(Arc::clone(&state));

    info!(port = cfg.port, "Fluxbox listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    info!("Fluxbox stopped");
    Ok(())
}
