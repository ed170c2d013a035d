//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer.
//!
//! # Modules
//!
//! - [`persistence`] - PostgreSQL unit of work and repositories
//! - [`in_memory`] - In-memory unit of work for tests and local runs
//! - [`jwt`] - HS256 token signing and verification

pub mod in_memory;
pub mod jwt;
pub mod persistence;
