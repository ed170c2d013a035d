//! HTTP server initialization and runtime setup.
//!
//! Handles the database pool, migrations, service wiring and the Axum server lifecycle.

use crate::application::services::{
    MagicLinkAuthority, MagicLinkRenewalService, NotificationDispatcher, ShortLinkService,
};
use crate::config::Config;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::unit_of_work::UnitOfWorkPerformer;
use crate::infrastructure::jwt::JwtKeys;
use crate::infrastructure::persistence::PgUnitOfWorkPerformer;
use crate::routes::app_router;
use crate::state::AppState;
use crate::utils::code_generator::{RandomShortLinkIdGenerator, ShortLinkIdGenerator};
use crate::utils::uuid_generator::{RandomUuidGenerator, UuidGenerator};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Infrastructure the services are built on, swapped out in tests.
pub struct Dependencies {
    pub uow_performer: Arc<dyn UnitOfWorkPerformer>,
    pub clock: Arc<dyn Clock>,
    pub short_link_ids: Arc<dyn ShortLinkIdGenerator>,
    pub uuids: Arc<dyn UuidGenerator>,
}

impl Dependencies {
    /// System clock and random id generators over `uow_performer`.
    pub fn production(uow_performer: Arc<dyn UnitOfWorkPerformer>) -> Self {
        Self {
            uow_performer,
            clock: Arc::new(SystemClock),
            short_link_ids: Arc::new(RandomShortLinkIdGenerator),
            uuids: Arc::new(RandomUuidGenerator),
        }
    }
}

/// Wires every use case from `config` and `deps`.
pub fn build_state(config: &Config, deps: Dependencies) -> AppState {
    let Dependencies {
        uow_performer,
        clock,
        short_link_ids,
        uuids,
    } = deps;

    let authority = Arc::new(MagicLinkAuthority::new(
        JwtKeys::from_secret(config.magic_link_signing_secret.as_bytes()),
        config
            .magic_link_deprecated_secret
            .as_deref()
            .map(|secret| JwtKeys::from_secret(secret.as_bytes())),
        config.base_url.as_str(),
    ));

    let short_link_service = Arc::new(ShortLinkService::new(
        uow_performer.clone(),
        short_link_ids,
        clock.clone(),
        config.base_url.as_str(),
    ));

    let dispatcher = Arc::new(NotificationDispatcher::new(
        uow_performer.clone(),
        uuids,
        clock.clone(),
    ));

    let renewal_service = Arc::new(MagicLinkRenewalService::new(
        uow_performer.clone(),
        authority,
        short_link_service.clone(),
        dispatcher,
        clock,
        chrono::Duration::hours(config.magic_link_ttl_hours),
    ));

    AppState::new(uow_performer, short_link_service, renewal_service)
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Use cases over a Postgres unit of work
/// - Axum HTTP server, stopped on Ctrl-C
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;
    tracing::info!("Migrations applied");

    let uow_performer: Arc<dyn UnitOfWorkPerformer> =
        Arc::new(PgUnitOfWorkPerformer::new(Arc::new(pool)));
    let state = build_state(&config, Dependencies::production(uow_performer));

    let app = app_router(state, config.behind_proxy);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
