// Application state module
// Everything a request handler needs, assembled once at startup

use super::types::Config;
use crate::handler::assets::{RootKind, StaticRoot};
use crate::layers::LayerRegistry;

/// Application state
///
/// Immutable after construction; shared between connections as `Arc<AppState>`.
pub struct AppState {
    pub config: Config,
    pub frontend: StaticRoot,
    pub backend_static: StaticRoot,
    pub layers: LayerRegistry,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            frontend: StaticRoot::new(&config.assets.frontend_dir, RootKind::Frontend),
            backend_static: StaticRoot::new(&config.assets.static_dir, RootKind::BackendStatic),
            layers: LayerRegistry::from_config(&config.geoserver),
            config: config.clone(),
        }
    }
}
