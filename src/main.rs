use std::{process, sync::Arc};

use scrivo::{
    application::{error::AppError, repos::UsersWriteRepo, users::UserService},
    cache::{Cache, CacheConfig, Invalidator},
    config,
    infra::{
        cache::build_cache,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, Repositories, RouterState},
        telemetry,
    },
};
use tokio::signal;
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::GrantAdmin(args) => run_grant_admin(settings, &args.username).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache = build_cache(&CacheConfig::from(&settings.cache)).map_err(AppError::from)?;

    let api_state = ApiState::new(
        Repositories::shared(repositories),
        cache,
        settings.cache.ttls,
        &settings.auth,
    );

    serve_http(&settings, api_state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings).await?;
    info!(target = "scrivo::migrate", "database schema is up to date");
    Ok(())
}

async fn run_grant_admin(settings: config::Settings, username: &str) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    // Cached projections embed user views, so the role change purges them.
    let cache = match build_cache(&CacheConfig::from(&settings.cache)) {
        Ok(cache) => cache,
        Err(err) => {
            warn!(
                target = "scrivo::admin",
                error = %err,
                "cache unavailable; cached user views may stay stale until they expire"
            );
            Cache::disabled()
        }
    };

    let writer: Arc<dyn UsersWriteRepo> = repositories.clone();
    let users = UserService::new(repositories, writer, Invalidator::new(cache));
    let user = users
        .grant_admin(username)
        .await
        .map_err(|err| AppError::validation(format!("cannot grant admin to `{username}`: {err}")))?;

    info!(
        target = "scrivo::admin",
        user_id = user.id,
        username = %user.username,
        "admin role granted"
    );
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(settings: &config::Settings, api_state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(RouterState { api: api_state });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "scrivo::http",
        addr = %settings.server.addr,
        "listening"
    );

    let grace = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, then bound the drain with a hard deadline.
async fn shutdown_signal(grace: std::time::Duration) {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(
        target = "scrivo::http",
        grace_seconds = grace.as_secs(),
        "shutdown requested; draining connections"
    );
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(target = "scrivo::http", "graceful shutdown deadline reached");
        process::exit(0);
    });
}
