use std::sync::Arc;

use crate::service::ReadingService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReadingService>,
}

impl AppState {
    pub fn new(service: ReadingService) -> Self {
        AppState {
            service: Arc::new(service),
        }
    }
}
