use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{jobs::JobStore, themes::ThemeStore};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jobs: Arc<JobStore>,
    pub themes: Arc<ThemeStore>,
}

impl AppState {
    pub fn new(config: AppConfig, jobs: Arc<JobStore>, themes: Arc<ThemeStore>) -> Self {
        Self {
            config: Arc::new(config),
            jobs,
            themes,
        }
    }
}
