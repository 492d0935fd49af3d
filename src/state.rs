//! Shared application state injected into every handler.

use std::sync::Arc;

use crate::application::services::RedirectService;
use crate::domain::repositories::RedirectRepository;
use crate::infrastructure::cache::CacheService;

/// Registry service bound to whichever store the process was started with.
pub type DynRedirectService = RedirectService<dyn RedirectRepository>;

#[derive(Clone)]
pub struct AppState {
    pub redirect_service: Arc<DynRedirectService>,
    pub cache: Arc<dyn CacheService>,
}

impl AppState {
    pub fn new(redirect_service: Arc<DynRedirectService>, cache: Arc<dyn CacheService>) -> Self {
        Self {
            redirect_service,
            cache,
        }
    }
}
