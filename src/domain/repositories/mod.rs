//! Repository trait definitions for the domain layer.
//!
//! Repository traits abstract data access following the Repository pattern and are
//! implemented by concrete stores in the infrastructure layer.
//!
//! # Architecture
//!
//! - Traits define the contract for data operations
//! - Implementations live in `crate::infrastructure::persistence`
//! - Mock implementations are auto-generated via `mockall` for testing
//!
//! # Testing
//!
//! See integration tests in `tests/repository_*.rs` for usage examples.

pub mod redirect_repository;

pub use redirect_repository::{BatchInsert, RedirectRepository};

#[cfg(test)]
pub use redirect_repository::MockRedirectRepository;
