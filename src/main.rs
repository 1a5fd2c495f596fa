use std::{process, sync::Arc};

use slack_invite::{
    application::{error::AppError, invitation::InvitationService},
    config::{self, Command, Settings},
    infra::{
        http::{self, HttpState},
        slack::SlackInviteClient,
        telemetry,
    },
    presentation::pages::Pages,
};
use tokio::{net::TcpListener, signal};
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
    telemetry::init(&settings.logging)?;

    match cli_args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_serve(settings).await,
        Command::Check => run_check(&settings),
    }
}

fn run_check(settings: &Settings) -> Result<(), AppError> {
    let pages = Pages::new(&settings.templates.directory);
    pages.compile_all()?;
    SlackInviteClient::new(&settings.slack)?;
    info!(
        templates = %settings.templates.directory.display(),
        endpoint = %settings.slack.api_url,
        "configuration is valid"
    );
    Ok(())
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let pages = Arc::new(Pages::new(&settings.templates.directory));
    if settings.templates.precompile {
        pages.compile_all()?;
        info!(
            templates = %settings.templates.directory.display(),
            "page templates compiled"
        );
    }

    let client = SlackInviteClient::new(&settings.slack)?;
    let invitations = InvitationService::new(Arc::new(client), settings.slack.expose_error_detail);

    let state = HttpState {
        invitations: Arc::new(invitations),
        pages,
        static_dir: Arc::new(settings.assets.directory.clone()),
    };
    let router = http::build_router(state);

    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::Infra(err.into()))?;
    info!(addr = %settings.server.addr, "listening");

    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    // Bound the drain phase: once the signal fires, in-flight requests get `grace` to finish.
    let drained = async {
        server
            .await
            .map_err(|err| AppError::unexpected(format!("server error: {err}")))
    };
    tokio::select! {
        result = drained => result,
        () = async {
            shutdown_signal().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(grace_seconds = grace.as_secs(), "graceful shutdown timed out");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
