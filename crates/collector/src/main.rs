//! `vitals-collector` -- Core Web Vitals collection daemon.
//!
//! Reads newline-delimited JSON observations from stdin, batches them and
//! posts them to the ingestion service.
//!
//! # Environment variables
//!
//! | Variable                | Required | Default    | Description                      |
//! |-------------------------|----------|------------|----------------------------------|
//! | `CWV_ENDPOINT`          | yes      | --         | Ingestion URL (`.../api/v1/cwv`) |
//! | `CWV_PAGE_ID`           | yes      | --         | Host page identifier             |
//! | `CWV_SITE_ID`           | yes      | --         | Host site identifier             |
//! | `CWV_MONITORING`        | no       | `true`     | Exit immediately when `false`    |
//! | `CWV_BATCH_SIZE`        | no       | `10`       | Samples per immediate delivery   |
//! | `CWV_FLUSH_INTERVAL_MS` | no       | `5000`     | Periodic flush interval          |
//! | `CWV_PAGE_URL`          | no       | empty      | URL stamped on every sample      |
//! | `CWV_VIEWPORT_WIDTH`    | no       | `1280`     | Drives the device type           |
//! | `CWV_VIEWPORT_HEIGHT`   | no       | `800`      |                                  |
//! | `CWV_NAVIGATION_TYPE`   | no       | `navigate` |                                  |
//!
//! Stdin EOF, Ctrl-C and SIGTERM unload the page (final flush, then exit).
//! SIGTSTP freezes it (flush, keep running).

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitals_collector::{
    configure, CollectorConfig, HttpTransport, LifecycleEvent, PageEnvironment, PageLifecycle,
    StdinSource,
};

/// How long queued beacons get to finish after unload.
const BEACON_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitals_collector=info".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    let config = match CollectorConfig::from_env() {
        Ok(Some(config)) => config,
        Ok(None) => {
            tracing::info!("CWV monitoring disabled for this page");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "Invalid collector configuration");
            std::process::exit(1);
        }
    };

    let transport = HttpTransport::new().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build HTTP client");
        std::process::exit(1);
    });

    let (lifecycle, lifecycle_rx) = PageLifecycle::channel();
    let source = StdinSource::new(lifecycle.clone());

    let Some(session) = configure(
        config,
        PageEnvironment::from_env(),
        source,
        Arc::new(transport.clone()),
    ) else {
        return;
    };

    tokio::spawn(forward_signals(lifecycle));

    session.run(lifecycle_rx).await;

    transport.drain(BEACON_DRAIN_TIMEOUT).await;
    tracing::info!("Collector shutdown complete");
}

/// Map process signals onto page lifecycle events.
async fn forward_signals(lifecycle: PageLifecycle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    #[cfg(unix)]
    let freeze = {
        let lifecycle = lifecycle.clone();
        async move {
            use tokio::signal::unix::{signal, SignalKind};
            let Ok(mut sigtstp) = signal(SignalKind::from_raw(libc::SIGTSTP)) else {
                tracing::warn!("Failed to install SIGTSTP handler; freeze flushes disabled");
                return std::future::pending::<()>().await;
            };
            while sigtstp.recv().await.is_some() {
                tracing::info!("Received SIGTSTP, flushing");
                if !lifecycle.notify(LifecycleEvent::Freeze).await {
                    break;
                }
            }
            std::future::pending::<()>().await
        }
    };

    #[cfg(not(unix))]
    let freeze = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), unloading"),
        () = terminate => tracing::info!("Received SIGTERM, unloading"),
        () = freeze => {}
    }

    lifecycle.notify(LifecycleEvent::Unload).await;
}
