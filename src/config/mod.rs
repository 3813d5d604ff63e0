// Configuration module entry point
// Loads the immutable application configuration and shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

use crate::layers::Layer;

// Re-export public types
pub use state::AppState;
pub use types::{Config, GeoServerConfig, LayerIdentifiers};

/// Default config file name (extension is resolved by the `config` crate)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; `GEOPORTAL__SECTION__KEY` environment variables
    /// override it, and built-in defaults fill the rest.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("GEOPORTAL").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "geoportal")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("http.cache_max_age", 3600)?
            .set_default("assets.frontend_dir", "../frontend")?
            .set_default("assets.static_dir", "static")?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.geoserver.url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "geoserver.url must not be empty".to_string(),
            ));
        }
        if let Some(layer) = Layer::ALL
            .into_iter()
            .find(|l| self.geoserver.layers.identifier(*l).trim().is_empty())
        {
            return Err(config::ConfigError::Message(format!(
                "geoserver.layers.{} must not be empty",
                layer.key()
            )));
        }
        // The per-connection deadline is max(read, write); zero would close every connection
        let perf = &self.performance;
        if perf.read_timeout == 0 && perf.write_timeout == 0 {
            return Err(config::ConfigError::Message(
                "performance.read_timeout and performance.write_timeout cannot both be 0"
                    .to_string(),
            ));
        }
        if !matches!(self.logging.access_log_format.as_str(), "combined" | "common" | "json") {
            return Err(config::ConfigError::Message(format!(
                "Unknown access log format '{}'",
                self.logging.access_log_format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp config");
        file.write_all(contents.as_bytes()).expect("write temp config");
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist/geoportal").unwrap();
        assert_eq!(cfg.assets.frontend_dir, "../frontend");
        assert_eq!(cfg.assets.static_dir, "static");
        assert_eq!(cfg.geoserver.url, layers::GEO_SERVER_URL);
        assert_eq!(cfg.geoserver.layers, LayerIdentifiers::default());
        assert_eq!(cfg.http.cache_max_age, 3600);
        assert!(cfg.get_socket_addr().is_ok());
    }

    #[test]
    fn test_file_overrides() {
        let file = write_config(
            r#"
[server]
port = 9090

[assets]
frontend_dir = "/srv/portal/frontend"

[geoserver]
url = "http://gis.example.org/geoserver/mme/wms"

[geoserver.layers]
roads = "mme:roads_2024"
"#,
        );
        let path = file.path().to_str().unwrap();
        let cfg = Config::load_from(path).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.assets.frontend_dir, "/srv/portal/frontend");
        assert_eq!(cfg.assets.static_dir, "static");
        assert_eq!(cfg.geoserver.url, "http://gis.example.org/geoserver/mme/wms");
        assert_eq!(cfg.geoserver.layers.roads, "mme:roads_2024");
        assert_eq!(cfg.geoserver.layers.geology, layers::GEOLOGY_LAYER);
    }

    #[test]
    fn test_empty_layer_rejected() {
        let file = write_config("[geoserver.layers]\nminerals = \"\"\n");
        let err = Config::load_from(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("minerals"));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let file = write_config("[logging]\naccess_log_format = \"xml\"\n");
        assert!(Config::load_from(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_zero_connection_deadline_rejected() {
        let file = write_config("[performance]\nread_timeout = 0\nwrite_timeout = 0\n");
        let err = Config::load_from(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("read_timeout"));

        let file = write_config("[performance]\nread_timeout = 0\n");
        assert!(Config::load_from(file.path().to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_invalid_host() {
        let file = write_config("[server]\nhost = \"not a host\"\n");
        let cfg = Config::load_from(file.path().to_str().unwrap()).unwrap();
        assert!(cfg.get_socket_addr().is_err());
    }
}
