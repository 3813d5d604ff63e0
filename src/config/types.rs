// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

use crate::layers::{self, Layer};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub assets: AssetsConfig,
    #[serde(default)]
    pub geoserver: GeoServerConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    pub show_headers: bool,
    /// Access log format (combined, common or json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
    /// `max-age` sent with static assets, in seconds
    pub cache_max_age: u32,
}

/// Static asset roots
///
/// Relative paths are resolved against the working directory at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    /// Frontend pages, styles and scripts
    pub frontend_dir: String,
    /// Backend-local files served under `/static/`
    pub static_dir: String,
}

/// External GeoServer endpoint and layer names
#[derive(Debug, Deserialize, Clone)]
pub struct GeoServerConfig {
    #[serde(default = "default_geoserver_url")]
    pub url: String,
    #[serde(default)]
    pub layers: LayerIdentifiers,
}

#[allow(clippy::missing_const_for_fn)]
fn default_geoserver_url() -> String {
    layers::GEO_SERVER_URL.to_string()
}

impl Default for GeoServerConfig {
    fn default() -> Self {
        Self {
            url: default_geoserver_url(),
            layers: LayerIdentifiers::default(),
        }
    }
}

/// GeoServer identifier per logical layer
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LayerIdentifiers {
    pub geology: String,
    pub minerals: String,
    pub roads: String,
    pub districts: String,
    pub towns_villages: String,
    pub regions: String,
    pub country: String,
}

impl LayerIdentifiers {
    pub fn identifier(&self, layer: Layer) -> &str {
        match layer {
            Layer::Geology => &self.geology,
            Layer::Minerals => &self.minerals,
            Layer::Roads => &self.roads,
            Layer::Districts => &self.districts,
            Layer::TownsVillages => &self.towns_villages,
            Layer::Regions => &self.regions,
            Layer::Country => &self.country,
        }
    }
}

impl Default for LayerIdentifiers {
    fn default() -> Self {
        Self {
            geology: layers::GEOLOGY_LAYER.to_string(),
            minerals: layers::MINERALS_LAYER.to_string(),
            roads: layers::ROADS_LAYER.to_string(),
            districts: layers::DISTRICTS_LAYER.to_string(),
            towns_villages: layers::TOWNS_VILLAGES_LAYER.to_string(),
            regions: layers::REGIONS_LAYER.to_string(),
            country: layers::COUNTRY_LAYER.to_string(),
        }
    }
}
