#![allow(dead_code)]

use async_trait::async_trait;
use axum::{Router, routing::get};
use axum_test::TestServer;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use convention_dispatch::AppError;
use convention_dispatch::api;
use convention_dispatch::api::handlers::health_handler;
use convention_dispatch::application::services::{IssueMagicLink, MagicLinkAuthority};
use convention_dispatch::config::Config;
use convention_dispatch::domain::clock::FixedClock;
use convention_dispatch::domain::entities::{
    Actor, Agency, Convention, InternshipKind, Role, Signatories,
};
use convention_dispatch::domain::unit_of_work::{UnitOfWork, UnitOfWorkPerformer};
use convention_dispatch::infrastructure::in_memory::InMemoryUnitOfWorkPerformer;
use convention_dispatch::infrastructure::jwt::JwtKeys;
use convention_dispatch::server::{Dependencies, build_state};
use convention_dispatch::state::AppState;
use convention_dispatch::utils::code_generator::DeterministicShortLinkIdGenerator;
use convention_dispatch::utils::uuid_generator::RandomUuidGenerator;

pub const BASE_URL: &str = "https://immersion.example.com";
pub const CURRENT_SECRET: &str = "current-secret";
pub const DEPRECATED_SECRET: &str = "deprecated-secret";

pub const CONVENTION_ID: Uuid = Uuid::from_u128(0xadd5c20e_6dd2_45af_affe_927358005251);
pub const AGENCY_ID: Uuid = Uuid::from_u128(0xbbbb_0000_0000_0000_0000_000000000001);

pub const BENEFICIARY_EMAIL: &str = "beneficiary@mail.com";
pub const VALIDATOR_EMAILS: [&str; 2] = ["validator1@mail.com", "validator2@mail.com"];

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0)
        .single()
        .unwrap()
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/unused".to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        log_level: "debug".to_string(),
        log_format: "text".to_string(),
        behind_proxy: false,
        base_url: BASE_URL.to_string(),
        magic_link_signing_secret: CURRENT_SECRET.to_string(),
        magic_link_deprecated_secret: Some(DEPRECATED_SECRET.to_string()),
        magic_link_ttl_hours: 24,
        db_max_connections: 1,
        db_connect_timeout: 1,
        db_idle_timeout: 1,
        db_max_lifetime: 1,
    }
}

fn actor(email: &str) -> Actor {
    Actor {
        email: email.to_string(),
        first_name: "Jean".to_string(),
        last_name: "Dupont".to_string(),
    }
}

pub fn convention() -> Convention {
    Convention {
        id: CONVENTION_ID,
        agency_id: AGENCY_ID,
        internship_kind: InternshipKind::Immersion,
        signatories: Signatories {
            beneficiary: actor(BENEFICIARY_EMAIL),
            establishment_representative: actor("establishment@mail.com"),
            beneficiary_representative: None,
            beneficiary_current_employer: None,
        },
    }
}

pub fn agency() -> Agency {
    Agency {
        id: AGENCY_ID,
        name: "Agence de Lyon".to_string(),
        counsellor_emails: vec!["counsellor@mail.com".to_string()],
        validator_emails: VALIDATOR_EMAILS.iter().map(|e| e.to_string()).collect(),
    }
}

/// In-memory store seeded with one convention and its agency.
pub fn seeded_performer() -> InMemoryUnitOfWorkPerformer {
    let performer = InMemoryUnitOfWorkPerformer::new();
    performer.add_agency(agency());
    performer.add_convention(convention());
    performer
}

/// State over `uow_performer` with a frozen clock and short link ids `link-1`, `link-2`, ...
pub fn create_test_state(uow_performer: Arc<dyn UnitOfWorkPerformer>) -> AppState {
    let ids = (1..=20).map(|i| format!("link-{i}"));

    build_state(
        &test_config(),
        Dependencies {
            uow_performer,
            clock: Arc::new(FixedClock(now())),
            short_link_ids: Arc::new(DeterministicShortLinkIdGenerator::new(ids)),
            uuids: Arc::new(RandomUuidGenerator),
        },
    )
}

/// Every route without the rate limiter, which needs a peer address.
pub fn test_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest(
            "/api",
            api::routes::short_link_routes().merge(api::routes::renewal_routes()),
        )
        .with_state(state)
}

pub fn test_server(uow_performer: Arc<dyn UnitOfWorkPerformer>) -> TestServer {
    TestServer::new(test_router(create_test_state(uow_performer))).unwrap()
}

/// A token for the seeded convention that expired a day ago.
pub fn expired_token(secret: &str, role: Role, email: &str) -> String {
    MagicLinkAuthority::new(JwtKeys::from_secret(secret.as_bytes()), None, BASE_URL)
        .issue(IssueMagicLink {
            subject_id: &CONVENTION_ID.to_string(),
            role,
            email,
            now: now() - Duration::days(2),
            ttl: Duration::days(1),
        })
        .unwrap()
}

/// A backend that refuses every transaction.
pub struct UnavailablePerformer;

#[async_trait]
impl UnitOfWorkPerformer for UnavailablePerformer {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        Err(AppError::internal("Database error", json!({})))
    }

    async fn health_check(&self) -> bool {
        false
    }
}
