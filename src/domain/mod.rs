//! Domain layer containing the registry's entities and contracts.
//!
//! # Architecture
//!
//! - [`entities`] - Redirect entry and its create/update inputs
//! - [`listing`] - Typed filter, ordering and paging for listings
//! - [`repositories`] - Store contract implemented by the infrastructure layer
//! - [`clock`] - Time source used for ingestion timestamps
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository traits define contracts implemented by infrastructure layer
//! - Business logic is encapsulated in services (see [`crate::application::services`])

pub mod clock;
pub mod entities;
pub mod listing;
pub mod repositories;
