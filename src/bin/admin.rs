//! CLI administration tool for convention-dispatch.
//!
//! Inspects the notification outbox, releases quarantined events and checks
//! short links without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Event counts per publication state
//! cargo run --bin admin -- outbox stats
//!
//! # Events that failed too many times
//! cargo run --bin admin -- outbox quarantined --limit 20
//!
//! # Put a quarantined event back in the publication queue
//! cargo run --bin admin -- outbox release 0b0d5c8e-6d3a-4a53-9a3e-2f1f0c6f2a10
//!
//! # Show where a short link points
//! cargo run --bin admin -- short-link resolve Zm9vYmFy
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string

use convention_dispatch::domain::entities::{DomainEvent, ShortLinkId};
use convention_dispatch::domain::unit_of_work::{UnitOfWorkPerformer, finish};
use convention_dispatch::infrastructure::persistence::PgUnitOfWorkPerformer;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// CLI tool for operating convention-dispatch.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and repair the notification outbox
    Outbox {
        #[command(subcommand)]
        action: OutboxAction,
    },

    /// Short link lookups
    ShortLink {
        #[command(subcommand)]
        action: ShortLinkAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum OutboxAction {
    /// Count events per publication state
    Stats,

    /// List quarantined events, oldest first
    Quarantined {
        /// Maximum number of events to show
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },

    /// Return a quarantined event to the publication queue
    Release {
        /// Event id
        event_id: Uuid,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ShortLinkAction {
    /// Print the long URL behind a short link id
    Resolve { short_link_id: String },
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    let performer = PgUnitOfWorkPerformer::new(Arc::new(pool));

    match cli.command {
        Commands::Outbox { action } => handle_outbox_action(action, &performer).await?,
        Commands::ShortLink { action } => handle_short_link_action(action, &performer).await?,
        Commands::Db { action } => handle_db_action(action, &performer).await?,
    }

    Ok(())
}

async fn handle_outbox_action(action: OutboxAction, performer: &PgUnitOfWorkPerformer) -> Result<()> {
    match action {
        OutboxAction::Stats => outbox_stats(performer).await,
        OutboxAction::Quarantined { limit } => list_quarantined(performer, limit).await,
        OutboxAction::Release { event_id, yes } => release_event(performer, event_id, yes).await,
    }
}

async fn outbox_stats(performer: &PgUnitOfWorkPerformer) -> Result<()> {
    println!("{}", "Outbox".bright_blue().bold());
    println!();

    let uow = performer.begin().await?;
    let outcome = uow.outbox().stats().await;
    let stats = finish(uow, outcome)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to count events: {}", e))?;

    println!(
        "  Never published: {}",
        stats.never_published.to_string().bright_white().bold()
    );
    println!(
        "  In process:      {}",
        stats.in_process.to_string().bright_white().bold()
    );
    println!(
        "  Published:       {}",
        stats.published.to_string().bright_green().bold()
    );
    println!(
        "  Quarantined:     {}",
        if stats.quarantined > 0 {
            stats.quarantined.to_string().red().bold()
        } else {
            stats.quarantined.to_string().bright_green().bold()
        }
    );
    println!();

    Ok(())
}

/// Lists quarantined events.
///
/// ```text
///   Id                                     Topic                       Occurred          Attempts
///   ────────────────────────────────────────────────────────────────────────────────────────────
///   0b0d5c8e-6d3a-4a53-9a3e-2f1f0c6f2a10   NotificationAdded           2025-01-15 10:30  3
///       last failure: smtp timeout
/// ```
async fn list_quarantined(performer: &PgUnitOfWorkPerformer, limit: i64) -> Result<()> {
    println!("{}", "Quarantined events".bright_blue().bold());
    println!();

    let uow = performer.begin().await?;
    let outcome = uow.outbox().get_quarantined(limit).await;
    let events = finish(uow, outcome)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list events: {}", e))?;

    if events.is_empty() {
        println!("{}", "  No quarantined events".green());
        return Ok(());
    }

    println!(
        "  {:<38} {:<27} {:<17} {}",
        "Id".bright_white().bold(),
        "Topic".bright_white().bold(),
        "Occurred".bright_white().bold(),
        "Attempts".bright_white().bold()
    );
    println!("  {}", "─".repeat(92).bright_black());

    for event in &events {
        print_event_line(event);
    }

    println!();
    println!(
        "  Total: {}",
        events.len().to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

fn print_event_line(event: &DomainEvent) {
    println!(
        "  {:<38} {:<27} {:<17} {}",
        event.id.to_string().cyan(),
        event.topic().as_str(),
        event
            .occurred_at
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .bright_black(),
        event.publications.len()
    );

    if let Some(reason) = event
        .publications
        .last()
        .and_then(|publication| publication.failure_reason.as_deref())
    {
        println!("      last failure: {}", reason.yellow());
    }
}

/// Releases a quarantined event after confirmation (default: No).
///
/// The event keeps its attempt history and goes back to `NeverPublished`.
async fn release_event(
    performer: &PgUnitOfWorkPerformer,
    event_id: Uuid,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "Release quarantined event".bright_blue().bold());
    println!();

    let uow = performer.begin().await?;
    let outcome = uow.outbox().get_by_id(event_id).await;
    let event = finish(uow, outcome)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
        .context("Event not found")?;

    if !event.was_quarantined {
        println!("{}", "  This event is not quarantined".yellow());
        return Ok(());
    }

    print_event_line(&event);
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Put this event back in the publication queue?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".red());
            return Ok(());
        }
    }

    let uow = performer.begin().await?;
    let outcome = async {
        let mut event = uow
            .outbox()
            .get_by_id(event_id)
            .await?
            .ok_or_else(|| {
                convention_dispatch::AppError::not_found(
                    "Event not found",
                    serde_json::json!({ "event_id": event_id }),
                )
            })?;
        event.release_from_quarantine()?;
        uow.outbox().update(&event).await
    }
    .await;
    finish(uow, outcome)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to release event: {}", e))?;

    println!();
    println!("{}", "Event released".green().bold());
    println!();

    Ok(())
}

async fn handle_short_link_action(
    action: ShortLinkAction,
    performer: &PgUnitOfWorkPerformer,
) -> Result<()> {
    match action {
        ShortLinkAction::Resolve { short_link_id } => {
            let uow = performer.begin().await?;
            let outcome = uow
                .short_links()
                .get_by_id(&ShortLinkId::new(short_link_id.as_str()))
                .await;
            let short_link = finish(uow, outcome)
                .await
                .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
                .context("Short link not found")?;

            println!("  Id:      {}", short_link.id.to_string().cyan());
            println!(
                "  Created: {}",
                short_link
                    .created_at
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
                    .bright_black()
            );
            println!("  URL:     {}", short_link.long_url.bright_white());
        }
    }

    Ok(())
}

async fn handle_db_action(action: DbAction, performer: &PgUnitOfWorkPerformer) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "Checking database connection...".bright_blue());

            if !performer.health_check().await {
                anyhow::bail!("Database connection failed");
            }

            println!("{}", "Database connection OK".green().bold());
        }
    }

    Ok(())
}
