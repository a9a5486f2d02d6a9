use std::{net::SocketAddr, process};

use freshline::{
    application::error::AppError,
    config::{self, Settings},
    context::build_application_context,
    domain::tags::{TAG_SET_VERSION, TagRegistry},
    infra::{error::InfraError, http, telemetry},
};
use tokio::sync::oneshot;
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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    match command {
        config::Command::Serve(_) => {
            telemetry::init(&settings.logging)?;
            run_serve(settings).await
        }
        config::Command::CheckConfig => {
            print_config(&settings);
            Ok(())
        }
    }
}

fn print_config(settings: &Settings) {
    println!("{settings:#?}");
    println!();
    println!(
        "tags (v{TAG_SET_VERSION}): {}",
        TagRegistry::new().allowed_list()
    );
    println!(
        "revalidate: {}",
        if settings.revalidate.secret.is_some() {
            "secret configured"
        } else {
            "no secret configured; every request will be rejected"
        }
    );
    println!(
        "edge: {}",
        if settings.edge.is_configured() {
            "configured"
        } else {
            "skipped (api_token or zone_id missing)"
        }
    );
    println!(
        "cdn: {}",
        if settings.cdn.is_configured() {
            "configured"
        } else {
            "skipped (endpoint or distribution_id missing)"
        }
    );
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;

    if settings.revalidate.secret.is_none() {
        warn!(
            target = "freshline::startup",
            "No revalidation secret configured; every request will be rejected"
        );
    }
    info!(
        target = "freshline::startup",
        addr = %settings.server.addr,
        edge = settings.edge.is_configured(),
        cdn = settings.cdn.is_configured(),
        local_caches = app.local_caches.len(),
        "Starting freshline"
    );

    let router = http::build_router(app.http_state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let shutdown = async move {
        shutdown_signal().await;
        let _ = signalled_tx.send(());
    };

    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown);
    let mut server = tokio::spawn(server.into_future());

    let joined = tokio::select! {
        joined = &mut server => joined,
        _ = signalled_rx => {
            info!(
                target = "freshline::startup",
                grace_seconds = settings.server.graceful_shutdown.as_secs(),
                "Shutdown requested; draining in-flight requests"
            );
            match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        target = "freshline::startup",
                        "Graceful shutdown timed out; aborting remaining requests"
                    );
                    server.abort();
                    return Ok(());
                }
            }
        }
    };

    joined
        .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
