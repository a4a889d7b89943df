//! Application state shared by all handlers.

use std::sync::Arc;

use podstore_core::Config;

use crate::services::gateway::StorageGateway;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<StorageGateway>,
    pub config: Config,
}

impl AppState {
    pub fn new(gateway: StorageGateway, config: Config) -> Self {
        Self {
            gateway: Arc::new(gateway),
            config,
        }
    }
}
