//! Layer registry module
//!
//! Names the GeoServer layers the portal frontend draws on, and the WMS
//! endpoint that serves them. GeoServer itself is an external process;
//! this module only hands out identifiers and composes query URLs.

pub mod wms;

use crate::config::GeoServerConfig;

pub const GEO_SERVER_URL: &str = "http://localhost:8080/geoserver/mme/wms";

pub const GEOLOGY_LAYER: &str = "mme:Geology_1M";
pub const MINERALS_LAYER: &str = "mme:Minerals";
pub const ROADS_LAYER: &str = "mme:Roads";
pub const DISTRICTS_LAYER: &str = "mme:Districts";
pub const TOWNS_VILLAGES_LAYER: &str = "mme:Towns_Villages";
pub const REGIONS_LAYER: &str = "mme:Regions";
pub const COUNTRY_LAYER: &str = "mme:Country";

/// Logical map layers published by the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Geology,
    Minerals,
    Roads,
    Districts,
    TownsVillages,
    Regions,
    Country,
}

impl Layer {
    /// Registry order, matching the sidebar order of the frontend
    pub const ALL: [Self; 7] = [
        Self::Geology,
        Self::Minerals,
        Self::Roads,
        Self::Districts,
        Self::TownsVillages,
        Self::Regions,
        Self::Country,
    ];

    /// Stable key used in URLs and by the frontend (`data-layer` attribute)
    pub const fn key(self) -> &'static str {
        match self {
            Self::Geology => "geology",
            Self::Minerals => "minerals",
            Self::Roads => "roads",
            Self::Districts => "districts",
            Self::TownsVillages => "towns_villages",
            Self::Regions => "regions",
            Self::Country => "country",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layer| layer.key() == key)
    }
}

/// A resolved registry entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEntry {
    pub name: &'static str,
    pub identifier: String,
}

/// Immutable mapping from logical layer to GeoServer identifier
///
/// Built once from configuration at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct LayerRegistry {
    wms_url: String,
    entries: Vec<LayerEntry>,
}

impl LayerRegistry {
    pub fn from_config(cfg: &GeoServerConfig) -> Self {
        let entries = Layer::ALL
            .into_iter()
            .map(|layer| LayerEntry {
                name: layer.key(),
                identifier: cfg.layers.identifier(layer).to_string(),
            })
            .collect();

        Self {
            wms_url: cfg.url.clone(),
            entries,
        }
    }

    /// WMS endpoint of the GeoServer workspace
    pub fn wms_url(&self) -> &str {
        &self.wms_url
    }

    /// WFS endpoint of the same workspace
    ///
    /// GeoServer exposes both services side by side, so a trailing `/wms`
    /// segment is swapped for `/wfs`. Other URLs are returned unchanged.
    pub fn wfs_url(&self) -> String {
        let trimmed = self.wms_url.trim_end_matches('/');
        trimmed.strip_suffix("/wms").map_or_else(
            || trimmed.to_string(),
            |base| format!("{base}/wfs"),
        )
    }

    pub fn get(&self, key: &str) -> Option<&LayerEntry> {
        let layer = Layer::from_key(key)?;
        self.entries.iter().find(|e| e.name == layer.key())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerEntry> {
        self.entries.iter()
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::from_config(&GeoServerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerIdentifiers;

    #[test]
    fn test_constants_non_empty() {
        let all = [
            GEO_SERVER_URL,
            GEOLOGY_LAYER,
            MINERALS_LAYER,
            ROADS_LAYER,
            DISTRICTS_LAYER,
            TOWNS_VILLAGES_LAYER,
            REGIONS_LAYER,
            COUNTRY_LAYER,
        ];
        assert!(all.iter().all(|v| !v.is_empty()));
    }

    #[test]
    fn test_default_registry_matches_constants() {
        let registry = LayerRegistry::default();
        let defaults = LayerIdentifiers::default();
        assert_eq!(registry.wms_url(), GEO_SERVER_URL);
        for layer in Layer::ALL {
            let entry = registry.get(layer.key()).unwrap();
            assert_eq!(entry.identifier, defaults.identifier(layer));
        }
        assert_eq!(registry.iter().count(), 7);
        assert_eq!(registry.get("geology").unwrap().identifier, GEOLOGY_LAYER);
        assert_eq!(registry.get("country").unwrap().identifier, COUNTRY_LAYER);
    }

    #[test]
    fn test_registry_reads_are_stable() {
        let registry = LayerRegistry::default();
        let first: Vec<_> = registry.iter().cloned().collect();
        let second: Vec<_> = registry.iter().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(registry.get("roads"), registry.get("roads"));
    }

    #[test]
    fn test_layer_keys() {
        assert_eq!(Layer::from_key("towns_villages"), Some(Layer::TownsVillages));
        assert_eq!(Layer::from_key("geology"), Some(Layer::Geology));
        assert_eq!(Layer::from_key("Geology"), None);
        assert_eq!(Layer::from_key("rivers"), None);
    }

    #[test]
    fn test_configured_identifiers() {
        let cfg = GeoServerConfig {
            url: "http://gis.internal/geoserver/mme/wms/".to_string(),
            layers: LayerIdentifiers {
                geology: "mme:geology_1m".to_string(),
                ..LayerIdentifiers::default()
            },
        };
        let registry = LayerRegistry::from_config(&cfg);
        assert_eq!(registry.get("geology").map(|e| e.identifier.as_str()), Some("mme:geology_1m"));
        assert_eq!(registry.get("minerals").map(|e| e.identifier.as_str()), Some(MINERALS_LAYER));
        assert!(registry.get("rivers").is_none());
    }

    #[test]
    fn test_wfs_url() {
        let registry = LayerRegistry::default();
        assert_eq!(registry.wfs_url(), "http://localhost:8080/geoserver/mme/wfs");

        let cfg = GeoServerConfig {
            url: "http://gis.internal/ows".to_string(),
            layers: LayerIdentifiers::default(),
        };
        assert_eq!(LayerRegistry::from_config(&cfg).wfs_url(), "http://gis.internal/ows");
    }
}
