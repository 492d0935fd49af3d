//! Redirect store implementations.
//!
//! # Repositories
//!
//! - [`PgRedirectRepository`] - PostgreSQL storage via SQLx
//! - [`MemoryRedirectRepository`] - In-process storage for development and tests

pub mod memory_redirect_repository;
pub mod pg_redirect_repository;

pub use memory_redirect_repository::MemoryRedirectRepository;
pub use pg_redirect_repository::PgRedirectRepository;
