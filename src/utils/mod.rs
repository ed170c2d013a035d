//! Identifier generation helpers.
//!
//! - [`code_generator`] - Short link id generation
//! - [`uuid_generator`] - Notification and event id generation

pub mod code_generator;
pub mod uuid_generator;
