//! Business logic services for the application layer.

pub mod redirect_service;

pub use redirect_service::{
    CreateRedirect, IngestReport, LISTING_CACHE_NAMESPACE, LISTING_GENERATION_KEY, RedirectPage,
    RedirectService,
};
