use std::{process, sync::Arc};

use feedrelay::{
    application::{error::AppError, poller::Poller},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        store::FeedStore,
        telemetry,
        upstream::CmsClient,
    },
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    info!(target = "feedrelay", "service started");

    let store = Arc::new(FeedStore::new());
    let client = Arc::new(CmsClient::new(&settings.upstream).map_err(|err| {
        AppError::unexpected(format!("failed to build upstream client: {err}"))
    })?);
    let poller = Poller::new(client, store.clone(), settings.poller.interval);

    // One shared shutdown channel: fired by a termination signal or by a
    // fatal poller error, observed by both the poller loop and the server.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    let poller_task = {
        let tx = shutdown_tx.clone();
        let rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let result = poller.run(rx).await;
            if result.is_err() {
                let _ = tx.send(true);
            }
            result
        })
    };

    {
        let tx = shutdown_tx.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!(target = "feedrelay", "shutdown requested");
            let _ = tx.send(true);
        });
    }

    let router = http::build_router(HttpState { store });
    let listener = tokio::net::TcpListener::bind(settings.server.listen_addr)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;
    info!(
        target = "feedrelay::http",
        addr = %settings.server.listen_addr,
        "listening"
    );

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));

    // Bound graceful shutdown: give in-flight requests the configured grace
    // period after the shutdown signal, then stop waiting.
    let grace_rx = shutdown_rx.clone();
    let grace = settings.server.graceful_shutdown;
    let serve_result = tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        _ = async {
            wait_for_shutdown(grace_rx).await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "feedrelay::http",
                "graceful shutdown period elapsed, closing with requests in flight"
            );
            Ok(())
        }
    };

    let _ = shutdown_tx.send(true);
    let poller_outcome = poller_task
        .await
        .map_err(|err| AppError::unexpected(format!("poller task failed: {err}")))?;

    poller_outcome?;
    serve_result?;

    info!(target = "feedrelay", "service stopped");
    Ok(())
}

/// Resolve once shutdown has been requested, even when the request predates
/// this receiver observing the channel.
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    if *rx.borrow_and_update() {
        return;
    }
    let _ = rx.changed().await;
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                error!(
                    target = "feedrelay",
                    error = %err,
                    "failed to install SIGTERM handler"
                );
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
