//! Notification entities: fully rendered emails and SMS awaiting delivery.
//!
//! A notification is written once through
//! [`crate::application::services::NotificationDispatcher`] and never
//! modified afterwards. Template content is opaque to this crate: only the
//! recipient lists are inspected (for deduplication).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Email,
    Sms,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Email => "email",
            NotificationKind::Sms => "sms",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loose references to the business entities a notification relates to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowedIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convention_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub establishment_siret: Option<String>,
}

/// A rendered email: template kind, recipients and template parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatedEmail {
    pub kind: String,
    pub recipients: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    pub params: Value,
}

impl TemplatedEmail {
    /// Removes duplicate recipients and cc addresses, keeping first-seen order.
    pub fn deduplicated(self) -> Self {
        Self {
            recipients: dedupe_preserving_order(self.recipients),
            cc: dedupe_preserving_order(self.cc),
            ..self
        }
    }
}

/// A rendered SMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatedSms {
    pub kind: String,
    pub recipient_phone: String,
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailNotification {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub followed_ids: FollowedIds,
    pub templated_content: TemplatedEmail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsNotification {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub followed_ids: FollowedIds,
    pub templated_content: TemplatedSms,
}

/// A persisted notification, looked up by `(id, kind)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Notification {
    Email(EmailNotification),
    Sms(SmsNotification),
}

impl Notification {
    pub fn id(&self) -> Uuid {
        match self {
            Notification::Email(email) => email.id,
            Notification::Sms(sms) => sms.id,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Email(_) => NotificationKind::Email,
            Notification::Sms(_) => NotificationKind::Sms,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Notification::Email(email) => email.created_at,
            Notification::Sms(sms) => sms.created_at,
        }
    }

    pub fn followed_ids(&self) -> &FollowedIds {
        match self {
            Notification::Email(email) => &email.followed_ids,
            Notification::Sms(sms) => &sms.followed_ids,
        }
    }
}

/// A notification before it has been assigned an id and creation time.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationDraft {
    Email {
        followed_ids: FollowedIds,
        templated_content: TemplatedEmail,
    },
    Sms {
        followed_ids: FollowedIds,
        templated_content: TemplatedSms,
    },
}

impl NotificationDraft {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationDraft::Email { .. } => NotificationKind::Email,
            NotificationDraft::Sms { .. } => NotificationKind::Sms,
        }
    }

    /// Turns the draft into a notification, deduplicating recipient lists.
    pub fn into_notification(self, id: Uuid, created_at: DateTime<Utc>) -> Notification {
        match self {
            NotificationDraft::Email {
                followed_ids,
                templated_content,
            } => Notification::Email(EmailNotification {
                id,
                created_at,
                followed_ids,
                templated_content: templated_content.deduplicated(),
            }),
            NotificationDraft::Sms {
                followed_ids,
                templated_content,
            } => Notification::Sms(SmsNotification {
                id,
                created_at,
                followed_ids,
                templated_content,
            }),
        }
    }
}

/// Removes repeated entries while keeping the position of each first occurrence.
pub fn dedupe_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(values.len());
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
