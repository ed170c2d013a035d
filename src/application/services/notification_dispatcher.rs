//! Notification dispatch coordinator.
//!
//! The only code path that writes notifications. Each saved notification is
//! paired with exactly one `NotificationAdded` outbox event in the same unit of
//! work, so the outbox never references a notification that does not exist.

use std::sync::Arc;

use crate::domain::clock::Clock;
use crate::domain::entities::{
    DomainEvent, EventPayload, Notification, NotificationAddedPayload, NotificationDraft,
};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkPerformer, finish};
use crate::error::AppError;
use crate::utils::uuid_generator::UuidGenerator;

pub struct NotificationDispatcher {
    uow_performer: Arc<dyn UnitOfWorkPerformer>,
    uuid_generator: Arc<dyn UuidGenerator>,
    clock: Arc<dyn Clock>,
}

impl NotificationDispatcher {
    pub fn new(
        uow_performer: Arc<dyn UnitOfWorkPerformer>,
        uuid_generator: Arc<dyn UuidGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            uow_performer,
            uuid_generator,
            clock,
        }
    }

    /// Saves a notification and its `NotificationAdded` event inside `uow`.
    ///
    /// Recipient and cc lists are deduplicated, first occurrence wins. The
    /// event is only appended once the notification write succeeded.
    ///
    /// # Errors
    ///
    /// Returns the repository error of whichever write failed; the caller is
    /// expected to roll `uow` back.
    pub async fn save_and_enqueue(
        &self,
        uow: &dyn UnitOfWork,
        draft: NotificationDraft,
    ) -> Result<Notification, AppError> {
        let notification = draft.into_notification(self.uuid_generator.new_uuid(), self.clock.now());
        uow.notifications().save(&notification).await?;

        self.append_event(
            uow,
            EventPayload::NotificationAdded(NotificationAddedPayload {
                id: notification.id(),
                kind: notification.kind(),
            }),
        )
        .await?;

        tracing::info!(
            notification_id = %notification.id(),
            kind = %notification.kind(),
            "Notification saved"
        );
        Ok(notification)
    }

    /// Same as [`Self::save_and_enqueue`] in a unit of work of its own.
    ///
    /// # Errors
    ///
    /// Returns the write error (after rollback) or the commit error.
    pub async fn execute(&self, draft: NotificationDraft) -> Result<Notification, AppError> {
        let uow = self.uow_performer.begin().await?;
        let outcome = self.save_and_enqueue(uow.as_ref(), draft).await;
        finish(uow, outcome).await
    }

    /// Appends an event to the outbox inside `uow`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn append_event(
        &self,
        uow: &dyn UnitOfWork,
        payload: EventPayload,
    ) -> Result<DomainEvent, AppError> {
        let event = DomainEvent::new(self.uuid_generator.new_uuid(), self.clock.now(), payload);
        uow.outbox().save(&event).await?;

        tracing::debug!(event_id = %event.id, topic = %event.topic(), "Event appended to outbox");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{
        Ending, MockedPerformer, MockedUnitOfWork, ending_of,
    };
    use crate::domain::clock::FixedClock;
    use crate::domain::entities::{
        FollowedIds, NotificationKind, TemplatedEmail, TemplatedSms, Topic,
    };
    use crate::utils::uuid_generator::SequenceUuidGenerator;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    const NOTIFICATION_ID: Uuid = Uuid::from_u128(1);
    const EVENT_ID: Uuid = Uuid::from_u128(2);

    fn dispatcher(performer: MockedPerformer) -> NotificationDispatcher {
        NotificationDispatcher::new(
            Arc::new(performer),
            Arc::new(SequenceUuidGenerator::new([NOTIFICATION_ID, EVENT_ID])),
            Arc::new(FixedClock(Utc::now())),
        )
    }

    fn email_draft(recipients: &[&str], cc: &[&str]) -> NotificationDraft {
        NotificationDraft::Email {
            followed_ids: FollowedIds::default(),
            templated_content: TemplatedEmail {
                kind: "CONVENTION_REMINDER".to_string(),
                recipients: recipients.iter().map(|r| r.to_string()).collect(),
                cc: cc.iter().map(|c| c.to_string()).collect(),
                params: json!({}),
            },
        }
    }

    #[tokio::test]
    async fn test_save_and_enqueue_pairs_notification_with_event() {
        let mut uow = MockedUnitOfWork::new();
        uow.notifications
            .expect_save()
            .withf(|n| n.id() == NOTIFICATION_ID)
            .times(1)
            .returning(|_| Ok(()));
        uow.outbox
            .expect_save()
            .withf(|event| {
                event.id == EVENT_ID
                    && event.topic() == Topic::NotificationAdded
                    && event.payload
                        == EventPayload::NotificationAdded(NotificationAddedPayload {
                            id: NOTIFICATION_ID,
                            kind: NotificationKind::Email,
                        })
            })
            .times(1)
            .returning(|_| Ok(()));

        let notification = dispatcher(MockedPerformer::unused())
            .save_and_enqueue(&uow, email_draft(&["a@mail.com"], &[]))
            .await
            .unwrap();

        assert_eq!(notification.id(), NOTIFICATION_ID);
    }

    #[tokio::test]
    async fn test_save_and_enqueue_deduplicates_recipients() {
        let mut uow = MockedUnitOfWork::new();
        uow.notifications
            .expect_save()
            .withf(|n| match n {
                Notification::Email(email) => {
                    email.templated_content.recipients == ["a", "b"]
                        && email.templated_content.cc == ["c"]
                }
                Notification::Sms(_) => false,
            })
            .times(1)
            .returning(|_| Ok(()));
        uow.outbox.expect_save().times(1).returning(|_| Ok(()));

        dispatcher(MockedPerformer::unused())
            .save_and_enqueue(&uow, email_draft(&["a", "b", "a"], &["c", "c"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_notification_write_skips_event_and_rolls_back() {
        let mut uow = MockedUnitOfWork::new();
        uow.notifications
            .expect_save()
            .times(1)
            .returning(|_| Err(AppError::internal("Database error", json!({}))));
        uow.outbox.expect_save().times(0);
        let ending = uow.ending();

        let err = dispatcher(MockedPerformer::new(uow))
            .execute(email_draft(&["a@mail.com"], &[]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal { .. }));
        assert_eq!(ending_of(&ending), Some(Ending::RolledBack));
    }

    #[tokio::test]
    async fn test_execute_commits_on_success() {
        let mut uow = MockedUnitOfWork::new();
        uow.notifications.expect_save().times(1).returning(|_| Ok(()));
        uow.outbox.expect_save().times(1).returning(|_| Ok(()));
        let ending = uow.ending();

        let notification = dispatcher(MockedPerformer::new(uow))
            .execute(NotificationDraft::Sms {
                followed_ids: FollowedIds::default(),
                templated_content: TemplatedSms {
                    kind: "LAST_REMINDER".to_string(),
                    recipient_phone: "+33600000000".to_string(),
                    params: json!({}),
                },
            })
            .await
            .unwrap();

        assert_eq!(notification.kind(), NotificationKind::Sms);
        assert_eq!(ending_of(&ending), Some(Ending::Committed));
    }
}
