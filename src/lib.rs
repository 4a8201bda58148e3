pub mod api;
pub mod apify;
pub mod config;
pub mod error;
pub mod events;
pub mod runner;

use std::sync::Arc;
use events::EventsFetchService;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub events: Arc<EventsFetchService>,
}
