use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use courseline_api::{
    app,
    config::{self, SETTLEMENT_CURRENCY},
    db,
    events::{process_events, EventSender},
    handlers::AppServices,
    services::{
        certificates::{LocalMediaStore, PassthroughRenderer},
        notifications::{NoopMailer, NotificationSender, WebhookMailer},
        pricing::{SharedRates, StaticRates},
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load_config().context("Failed to load configuration")?;
    config::init_tracing(&config.log_level, config.log_json);

    info!(
        environment = %config.environment,
        settlement_currency = SETTLEMENT_CURRENCY,
        "Starting courseline-api"
    );

    let db_pool = Arc::new(
        db::establish_connection_from_app_config(&config)
            .await
            .context("Failed to connect to database")?,
    );
    if config.auto_migrate {
        db::run_migrations(&db_pool)
            .await
            .context("Failed to run migrations")?;
        info!("Database migrations applied");
    }

    let (tx, rx) = mpsc::channel(1024);
    let event_sender = Arc::new(EventSender::new(tx));
    tokio::spawn(async move {
        process_events(rx).await;
    });

    let rates: SharedRates = Arc::new(StaticRates::new(config.rates.clone()));
    let notifier: Arc<dyn NotificationSender> = match &config.mailer_url {
        Some(url) => Arc::new(
            WebhookMailer::new(
                url.clone(),
                Duration::from_secs(config.external_timeout_secs),
            )
            .map_err(|e| anyhow::anyhow!("{}", e))?,
        ),
        None => Arc::new(NoopMailer),
    };

    let services = AppServices::new(
        db_pool.clone(),
        &config,
        rates,
        notifier,
        Arc::new(PassthroughRenderer),
        Arc::new(LocalMediaStore),
        Some(event_sender),
    );

    let state = AppState {
        db: db_pool,
        config: config.clone(),
        services,
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid host/port configuration")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
