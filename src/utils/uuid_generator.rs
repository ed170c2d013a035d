//! Identifier generation for notifications and outbox events.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
pub trait UuidGenerator: Send + Sync {
    fn new_uuid(&self) -> Uuid;
}

/// Random (v4) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomUuidGenerator;

impl UuidGenerator for RandomUuidGenerator {
    fn new_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Hands out pre-seeded UUIDs in order, then falls back to random ones.
#[derive(Debug, Default)]
pub struct SequenceUuidGenerator {
    ids: Mutex<VecDeque<Uuid>>,
}

impl SequenceUuidGenerator {
    pub fn new(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            ids: Mutex::new(ids.into_iter().collect()),
        }
    }
}

impl UuidGenerator for SequenceUuidGenerator {
    fn new_uuid(&self) -> Uuid {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(Uuid::new_v4)
    }
}
