use std::sync::Arc;

use crate::session::SessionRegistry;
use crate::store::MeetingStore;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub store: Arc<dyn MeetingStore>,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>, store: Arc<dyn MeetingStore>) -> Self {
        Self { registry, store }
    }
}
