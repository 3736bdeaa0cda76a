pub mod config;
pub mod hub;

use std::sync::Arc;

use config::Config;
use hub::fanout::ViewerFanout;
use hub::registry::StreamerRegistry;

/// Shared hub state handed to every connection handler.
///
/// Built once in `main` (or per test), never a process-wide singleton, so
/// each test can run against a fresh registry and fanout.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub streamers: Arc<StreamerRegistry>,
    pub viewers: Arc<ViewerFanout>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            streamers: Arc::new(StreamerRegistry::new()),
            viewers: Arc::new(ViewerFanout::new()),
        }
    }
}
