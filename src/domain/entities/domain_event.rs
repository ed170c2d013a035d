//! Outbox domain events and their publication history.
//!
//! Events are appended to the outbox inside the same unit of work as the
//! state change that produced them, then picked up by an out-of-process
//! dispatcher. Delivery is at-least-once: each attempt is recorded in
//! [`DomainEvent::publications`], and an event that keeps failing is
//! quarantined instead of being retried forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use uuid::Uuid;

use crate::domain::entities::{InternshipKind, NotificationKind};
use crate::error::AppError;

/// Failed attempts after which an event is quarantined.
pub const MAX_PUBLICATION_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    NotificationAdded,
    MagicLinkRenewalRequested,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::NotificationAdded => "NotificationAdded",
            Topic::MagicLinkRenewalRequested => "MagicLinkRenewalRequested",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAddedPayload {
    pub id: Uuid,
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicLinkRenewalRequestedPayload {
    pub internship_kind: InternshipKind,
    pub emails: Vec<String>,
    pub magic_link: String,
    pub convention_status_link: String,
    pub convention_id: Uuid,
}

/// Event payload, keyed by topic.
///
/// The topic is the enum discriminant, so an event cannot carry a payload
/// belonging to another topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload")]
pub enum EventPayload {
    NotificationAdded(NotificationAddedPayload),
    MagicLinkRenewalRequested(MagicLinkRenewalRequestedPayload),
}

impl EventPayload {
    pub fn topic(&self) -> Topic {
        match self {
            EventPayload::NotificationAdded(_) => Topic::NotificationAdded,
            EventPayload::MagicLinkRenewalRequested(_) => Topic::MagicLinkRenewalRequested,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventStatus {
    NeverPublished,
    InProcess,
    Published,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::NeverPublished => "never-published",
            EventStatus::InProcess => "in-process",
            EventStatus::Published => "published",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "never-published" => Some(EventStatus::NeverPublished),
            "in-process" => Some(EventStatus::InProcess),
            "published" => Some(EventStatus::Published),
            _ => None,
        }
    }
}

/// One delivery attempt made by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPublication {
    pub attempted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEvent {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: EventPayload,
    pub status: EventStatus,
    pub publications: Vec<EventPublication>,
    pub was_quarantined: bool,
}

impl DomainEvent {
    /// Creates an event that has never been published.
    pub fn new(id: Uuid, occurred_at: DateTime<Utc>, payload: EventPayload) -> Self {
        Self {
            id,
            occurred_at,
            payload,
            status: EventStatus::NeverPublished,
            publications: Vec::new(),
            was_quarantined: false,
        }
    }

    pub fn topic(&self) -> Topic {
        self.payload.topic()
    }

    /// Marks the event as claimed by a dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the event is already published or quarantined.
    pub fn mark_in_process(&mut self) -> Result<(), AppError> {
        self.ensure_publishable()?;
        self.status = EventStatus::InProcess;
        Ok(())
    }

    /// Records a successful delivery. No further attempts are accepted afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the event is already published or quarantined.
    pub fn record_success(&mut self, attempted_at: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_publishable()?;
        self.publications.push(EventPublication {
            attempted_at,
            failure_reason: None,
        });
        self.status = EventStatus::Published;
        Ok(())
    }

    /// Records a failed delivery, quarantining the event once
    /// [`MAX_PUBLICATION_ATTEMPTS`] failures have accumulated.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the event is already published or quarantined.
    pub fn record_failure(
        &mut self,
        attempted_at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Result<(), AppError> {
        self.ensure_publishable()?;
        self.publications.push(EventPublication {
            attempted_at,
            failure_reason: Some(reason.into()),
        });
        self.status = EventStatus::NeverPublished;
        if self.failed_attempts() >= MAX_PUBLICATION_ATTEMPTS {
            self.was_quarantined = true;
        }
        Ok(())
    }

    /// Puts a quarantined event back in the publication queue.
    ///
    /// The attempt history is kept for audit.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the event is not quarantined or already published.
    pub fn release_from_quarantine(&mut self) -> Result<(), AppError> {
        if self.status == EventStatus::Published || !self.was_quarantined {
            return Err(AppError::conflict(
                "Event is not quarantined",
                json!({ "event_id": self.id, "status": self.status.as_str() }),
            ));
        }
        self.was_quarantined = false;
        self.status = EventStatus::NeverPublished;
        Ok(())
    }

    /// Number of failed attempts recorded since the last successful one.
    pub fn failed_attempts(&self) -> usize {
        self.publications
            .iter()
            .rev()
            .take_while(|publication| publication.failure_reason.is_some())
            .count()
    }

    fn ensure_publishable(&self) -> Result<(), AppError> {
        if self.status == EventStatus::Published {
            return Err(AppError::conflict(
                "Event already published",
                json!({ "event_id": self.id }),
            ));
        }
        if self.was_quarantined {
            return Err(AppError::conflict(
                "Event is quarantined",
                json!({ "event_id": self.id }),
            ));
        }
        Ok(())
    }
}
