use std::sync::Arc;

use crate::config::AppConfig;
use crate::notifier::Notifier;
use crate::store::Store;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn Notifier>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
        }
    }
}
