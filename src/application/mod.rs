//! Application layer services implementing business logic.
//!
//! Services consume repository traits and the cache, and provide the operations the
//! HTTP handlers and the admin CLI share.
//!
//! # Available Services
//!
//! - [`services::redirect_service::RedirectService`] - Listing, ingestion, purge and
//!   single-entry maintenance of redirect entries

pub mod services;
