//! In-memory unit of work.
//!
//! Writes issued through an [`InMemoryUnitOfWork`] are staged on the side and
//! only merged into the committed store on [`UnitOfWork::commit`]; reads see
//! the staged writes layered over committed state. Dropping or rolling back
//! the unit of work discards the staged writes.
//!
//! Used by the integration tests and by local runs without a database.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::domain::entities::{
    Agency, Convention, DomainEvent, EventStatus, Notification, NotificationKind, ShortLink,
    ShortLinkId,
};
use crate::domain::repositories::{
    AgencyRepository, ConventionRepository, NotificationRepository, OutboxRepository, OutboxStats,
    ShortLinkRepository,
};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkPerformer};
use crate::error::AppError;

#[derive(Debug, Clone, Default)]
struct InMemoryStore {
    short_links: HashMap<ShortLinkId, ShortLink>,
    notifications: Vec<Notification>,
    events: Vec<DomainEvent>,
    conventions: HashMap<Uuid, Convention>,
    agencies: HashMap<Uuid, Agency>,
}

fn upsert_event(events: &mut Vec<DomainEvent>, event: DomainEvent) {
    match events.iter_mut().find(|e| e.id == event.id) {
        Some(existing) => *existing = event,
        None => events.push(event),
    }
}

impl InMemoryStore {
    fn has_notification(&self, id: Uuid, kind: NotificationKind) -> bool {
        self.notifications
            .iter()
            .any(|n| n.id() == id && n.kind() == kind)
    }
}

fn lock(store: &Mutex<InMemoryStore>) -> MutexGuard<'_, InMemoryStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Committed state plus the writes staged by one unit of work.
///
/// Locks are always taken committed first, staged second.
#[derive(Clone)]
struct Layers {
    committed: Arc<Mutex<InMemoryStore>>,
    staged: Arc<Mutex<InMemoryStore>>,
}

impl Layers {
    /// Committed events with staged updates applied, oldest first.
    fn merged_events(&self) -> Vec<DomainEvent> {
        let mut events = lock(&self.committed).events.clone();
        for event in lock(&self.staged).events.iter().cloned() {
            upsert_event(&mut events, event);
        }
        events.sort_by_key(|e| e.occurred_at);
        events
    }
}

/// Opens in-memory units of work over a shared committed store.
#[derive(Clone, Default)]
pub struct InMemoryUnitOfWorkPerformer {
    committed: Arc<Mutex<InMemoryStore>>,
}

impl InMemoryUnitOfWorkPerformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_convention(&self, convention: Convention) {
        lock(&self.committed)
            .conventions
            .insert(convention.id, convention);
    }

    pub fn add_agency(&self, agency: Agency) {
        lock(&self.committed).agencies.insert(agency.id, agency);
    }

    pub fn add_short_link(&self, short_link: ShortLink) {
        lock(&self.committed)
            .short_links
            .insert(short_link.id.clone(), short_link);
    }

    pub fn add_event(&self, event: DomainEvent) {
        upsert_event(&mut lock(&self.committed).events, event);
    }

    /// Committed outbox events, in insertion order.
    pub fn events(&self) -> Vec<DomainEvent> {
        lock(&self.committed).events.clone()
    }

    /// Committed notifications, in insertion order.
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.committed).notifications.clone()
    }

    /// Committed short links keyed by id.
    pub fn short_links(&self) -> HashMap<ShortLinkId, ShortLink> {
        lock(&self.committed).short_links.clone()
    }
}

#[async_trait]
impl UnitOfWorkPerformer for InMemoryUnitOfWorkPerformer {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        Ok(Box::new(InMemoryUnitOfWork::new(self.committed.clone())))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

pub struct InMemoryUnitOfWork {
    layers: Layers,
    short_links: InMemoryShortLinkRepository,
    notifications: InMemoryNotificationRepository,
    outbox: InMemoryOutboxRepository,
    conventions: InMemoryConventionRepository,
    agencies: InMemoryAgencyRepository,
}

impl InMemoryUnitOfWork {
    fn new(committed: Arc<Mutex<InMemoryStore>>) -> Self {
        let layers = Layers {
            committed,
            staged: Arc::new(Mutex::new(InMemoryStore::default())),
        };

        Self {
            short_links: InMemoryShortLinkRepository {
                layers: layers.clone(),
            },
            notifications: InMemoryNotificationRepository {
                layers: layers.clone(),
            },
            outbox: InMemoryOutboxRepository {
                layers: layers.clone(),
            },
            conventions: InMemoryConventionRepository {
                layers: layers.clone(),
            },
            agencies: InMemoryAgencyRepository {
                layers: layers.clone(),
            },
            layers,
        }
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    fn short_links(&self) -> &dyn ShortLinkRepository {
        &self.short_links
    }

    fn notifications(&self) -> &dyn NotificationRepository {
        &self.notifications
    }

    fn outbox(&self) -> &dyn OutboxRepository {
        &self.outbox
    }

    fn conventions(&self) -> &dyn ConventionRepository {
        &self.conventions
    }

    fn agencies(&self) -> &dyn AgencyRepository {
        &self.agencies
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let mut committed = lock(&self.layers.committed);
        let staged = std::mem::take(&mut *lock(&self.layers.staged));

        // Another unit of work may have committed the same keys since `save`.
        if let Some(id) = staged
            .short_links
            .keys()
            .find(|id| committed.short_links.contains_key(*id))
        {
            return Err(AppError::conflict(
                "Short link id already taken",
                json!({ "short_link_id": id }),
            ));
        }
        if let Some(notification) = staged
            .notifications
            .iter()
            .find(|n| committed.has_notification(n.id(), n.kind()))
        {
            return Err(AppError::conflict(
                "Notification already exists",
                json!({
                    "notification_id": notification.id(),
                    "kind": notification.kind().as_str(),
                }),
            ));
        }

        committed.short_links.extend(staged.short_links);
        committed.notifications.extend(staged.notifications);
        for event in staged.events {
            upsert_event(&mut committed.events, event);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        *lock(&self.layers.staged) = InMemoryStore::default();
        Ok(())
    }
}

pub struct InMemoryShortLinkRepository {
    layers: Layers,
}

#[async_trait]
impl ShortLinkRepository for InMemoryShortLinkRepository {
    async fn save(&self, short_link: &ShortLink) -> Result<(), AppError> {
        let committed = lock(&self.layers.committed);
        let mut staged = lock(&self.layers.staged);

        if committed.short_links.contains_key(&short_link.id)
            || staged.short_links.contains_key(&short_link.id)
        {
            return Err(AppError::conflict(
                "Short link id already taken",
                json!({ "short_link_id": short_link.id }),
            ));
        }

        staged
            .short_links
            .insert(short_link.id.clone(), short_link.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &ShortLinkId) -> Result<Option<ShortLink>, AppError> {
        let committed = lock(&self.layers.committed);
        let staged = lock(&self.layers.staged);

        Ok(staged
            .short_links
            .get(id)
            .or_else(|| committed.short_links.get(id))
            .cloned())
    }
}

pub struct InMemoryNotificationRepository {
    layers: Layers,
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn save(&self, notification: &Notification) -> Result<(), AppError> {
        let committed = lock(&self.layers.committed);
        let mut staged = lock(&self.layers.staged);
        let (id, kind) = (notification.id(), notification.kind());

        if committed.has_notification(id, kind) || staged.has_notification(id, kind) {
            return Err(AppError::conflict(
                "Notification already exists",
                json!({ "notification_id": id, "kind": kind.as_str() }),
            ));
        }

        staged.notifications.push(notification.clone());
        Ok(())
    }

    async fn get_by_id_and_kind(
        &self,
        id: Uuid,
        kind: NotificationKind,
    ) -> Result<Option<Notification>, AppError> {
        let committed = lock(&self.layers.committed);
        let staged = lock(&self.layers.staged);

        Ok(staged
            .notifications
            .iter()
            .chain(committed.notifications.iter())
            .find(|n| n.id() == id && n.kind() == kind)
            .cloned())
    }
}

pub struct InMemoryOutboxRepository {
    layers: Layers,
}

#[async_trait]
impl OutboxRepository for InMemoryOutboxRepository {
    async fn save(&self, event: &DomainEvent) -> Result<(), AppError> {
        let committed = lock(&self.layers.committed);
        let mut staged = lock(&self.layers.staged);

        let exists = committed
            .events
            .iter()
            .chain(staged.events.iter())
            .any(|e| e.id == event.id);
        if exists {
            return Err(AppError::conflict(
                "Event already exists",
                json!({ "event_id": event.id }),
            ));
        }

        staged.events.push(event.clone());
        Ok(())
    }

    async fn update(&self, event: &DomainEvent) -> Result<(), AppError> {
        let committed = lock(&self.layers.committed);
        let mut staged = lock(&self.layers.staged);

        let exists = committed
            .events
            .iter()
            .chain(staged.events.iter())
            .any(|e| e.id == event.id);
        if !exists {
            return Err(AppError::not_found(
                "Event not found",
                json!({ "event_id": event.id }),
            ));
        }

        upsert_event(&mut staged.events, event.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<DomainEvent>, AppError> {
        Ok(self.layers.merged_events().into_iter().find(|e| e.id == id))
    }

    async fn get_events_to_publish(&self, limit: i64) -> Result<Vec<DomainEvent>, AppError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .layers
            .merged_events()
            .into_iter()
            .filter(|e| e.status == EventStatus::NeverPublished && !e.was_quarantined)
            .take(limit)
            .collect())
    }

    async fn get_quarantined(&self, limit: i64) -> Result<Vec<DomainEvent>, AppError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .layers
            .merged_events()
            .into_iter()
            .filter(|e| e.was_quarantined)
            .take(limit)
            .collect())
    }

    async fn stats(&self) -> Result<OutboxStats, AppError> {
        let mut stats = OutboxStats::default();
        for event in self.layers.merged_events() {
            if event.was_quarantined {
                stats.quarantined += 1;
                continue;
            }
            match event.status {
                EventStatus::NeverPublished => stats.never_published += 1,
                EventStatus::InProcess => stats.in_process += 1,
                EventStatus::Published => stats.published += 1,
            }
        }
        Ok(stats)
    }
}

pub struct InMemoryConventionRepository {
    layers: Layers,
}

#[async_trait]
impl ConventionRepository for InMemoryConventionRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Convention>, AppError> {
        Ok(lock(&self.layers.committed).conventions.get(&id).cloned())
    }
}

pub struct InMemoryAgencyRepository {
    layers: Layers,
}

#[async_trait]
impl AgencyRepository for InMemoryAgencyRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Agency>, AppError> {
        Ok(lock(&self.layers.committed).agencies.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        EventPayload, FollowedIds, NotificationAddedPayload, NotificationDraft, TemplatedEmail,
        TemplatedSms,
    };
    use chrono::{Duration, Utc};

    fn short_link(id: &str) -> ShortLink {
        ShortLink::new(
            ShortLinkId::new(id),
            format!("https://example.com/{id}"),
            Utc::now(),
        )
    }

    fn event_at(minutes_ago: i64) -> DomainEvent {
        DomainEvent::new(
            Uuid::new_v4(),
            Utc::now() - Duration::minutes(minutes_ago),
            EventPayload::NotificationAdded(NotificationAddedPayload {
                id: Uuid::new_v4(),
                kind: NotificationKind::Email,
            }),
        )
    }

    #[tokio::test]
    async fn test_writes_invisible_until_commit() {
        let performer = InMemoryUnitOfWorkPerformer::new();
        let uow = performer.begin().await.unwrap();

        uow.short_links().save(&short_link("abc")).await.unwrap();
        assert!(
            uow.short_links()
                .get_by_id(&ShortLinkId::new("abc"))
                .await
                .unwrap()
                .is_some()
        );
        assert!(performer.short_links().is_empty());

        uow.commit().await.unwrap();
        assert!(performer.short_links().contains_key(&ShortLinkId::new("abc")));
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let performer = InMemoryUnitOfWorkPerformer::new();
        let uow = performer.begin().await.unwrap();

        uow.short_links().save(&short_link("abc")).await.unwrap();
        uow.outbox().save(&event_at(0)).await.unwrap();
        uow.rollback().await.unwrap();

        assert!(performer.short_links().is_empty());
        assert!(performer.events().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_short_link_is_conflict() {
        let performer = InMemoryUnitOfWorkPerformer::new();
        performer.add_short_link(short_link("abc"));

        let uow = performer.begin().await.unwrap();
        let err = uow.short_links().save(&short_link("abc")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_commit_rejects_short_link_committed_meanwhile() {
        let performer = InMemoryUnitOfWorkPerformer::new();
        let first = performer.begin().await.unwrap();
        let second = performer.begin().await.unwrap();

        first.short_links().save(&short_link("abc")).await.unwrap();
        let mut other = short_link("abc");
        other.long_url = "https://example.com/other".to_string();
        second.short_links().save(&other).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
        let committed = performer.short_links();
        assert_eq!(committed.len(), 1);
        assert_eq!(
            committed[&ShortLinkId::new("abc")].long_url,
            "https://example.com/abc"
        );
    }

    #[tokio::test]
    async fn test_notifications_are_read_back_by_id_and_kind() {
        let performer = InMemoryUnitOfWorkPerformer::new();
        let id = Uuid::new_v4();
        let followed_ids = FollowedIds {
            convention_id: Some(Uuid::new_v4()),
            ..FollowedIds::default()
        };
        let email = NotificationDraft::Email {
            followed_ids: followed_ids.clone(),
            templated_content: TemplatedEmail {
                kind: "MAGIC_LINK_RENEWAL".to_string(),
                recipients: vec!["a@mail.com".to_string(), "a@mail.com".to_string()],
                cc: vec![],
                params: json!({ "magicLink": "https://example.com/api/to/abc" }),
            },
        }
        .into_notification(id, Utc::now());
        let sms = NotificationDraft::Sms {
            followed_ids,
            templated_content: TemplatedSms {
                kind: "RenewMagicLink".to_string(),
                recipient_phone: "33600000000".to_string(),
                params: json!({ "shortLink": "https://example.com/api/to/def" }),
            },
        }
        .into_notification(id, Utc::now());

        let uow = performer.begin().await.unwrap();
        uow.notifications().save(&email).await.unwrap();
        uow.notifications().save(&sms).await.unwrap();
        uow.commit().await.unwrap();

        let uow = performer.begin().await.unwrap();
        let repo = uow.notifications();
        let found_email = repo.get_by_id_and_kind(id, NotificationKind::Email).await.unwrap();
        let found_sms = repo.get_by_id_and_kind(id, NotificationKind::Sms).await.unwrap();

        assert_eq!(found_email, Some(email));
        assert_eq!(found_sms, Some(sms));
        let Some(Notification::Email(found)) = found_email else {
            panic!("expected an email notification");
        };
        assert_eq!(found.templated_content.recipients, ["a@mail.com"]);
        assert_eq!(
            repo.get_by_id_and_kind(Uuid::new_v4(), NotificationKind::Email)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_events_to_publish_skip_claimed_published_and_quarantined() {
        let performer = InMemoryUnitOfWorkPerformer::new();

        let oldest = event_at(30);
        let mut published = event_at(20);
        published.record_success(Utc::now()).unwrap();
        let mut quarantined = event_at(10);
        quarantined.was_quarantined = true;
        let mut claimed = event_at(5);
        claimed.mark_in_process().unwrap();
        let newest = event_at(0);

        for event in [&newest, &published, &claimed, &quarantined, &oldest] {
            performer.add_event(event.clone());
        }

        let uow = performer.begin().await.unwrap();
        let to_publish = uow.outbox().get_events_to_publish(10).await.unwrap();
        let ids: Vec<Uuid> = to_publish.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![oldest.id, newest.id]);

        let limited = uow.outbox().get_events_to_publish(1).await.unwrap();
        assert_eq!(limited.len(), 1);

        let stats = uow.outbox().stats().await.unwrap();
        assert_eq!(
            stats,
            OutboxStats {
                never_published: 2,
                in_process: 1,
                published: 1,
                quarantined: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_update_unknown_event_is_not_found() {
        let performer = InMemoryUnitOfWorkPerformer::new();
        let uow = performer.begin().await.unwrap();

        let err = uow.outbox().update(&event_at(0)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_is_applied_on_commit() {
        let performer = InMemoryUnitOfWorkPerformer::new();
        let mut event = event_at(0);
        performer.add_event(event.clone());

        let uow = performer.begin().await.unwrap();
        event.mark_in_process().unwrap();
        uow.outbox().update(&event).await.unwrap();
        assert_eq!(performer.events()[0].status, EventStatus::NeverPublished);

        uow.commit().await.unwrap();
        assert_eq!(performer.events()[0].status, EventStatus::InProcess);
        assert_eq!(performer.events().len(), 1);
    }
}
