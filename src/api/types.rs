// Layer API response types

use serde::Serialize;

use crate::layers::LayerEntry;

/// `GET /api/layers`
#[derive(Debug, Serialize)]
pub struct LayerCatalog<'a> {
    pub geoserver_url: &'a str,
    pub wfs_url: String,
    pub layers: Vec<LayerDetail<'a>>,
}

/// One layer with the portal links that proxy to GeoServer
#[derive(Debug, Serialize)]
pub struct LayerDetail<'a> {
    pub name: &'static str,
    pub identifier: &'a str,
    pub links: LayerLinks,
}

#[derive(Debug, Serialize)]
pub struct LayerLinks {
    pub map: String,
    pub info: String,
    pub download: String,
}

impl<'a> LayerDetail<'a> {
    pub fn from_entry(entry: &'a LayerEntry) -> Self {
        let base = format!("/api/layers/{}", entry.name);
        Self {
            name: entry.name,
            identifier: &entry.identifier,
            links: LayerLinks {
                map: format!("{base}/map"),
                info: format!("{base}/info"),
                download: format!("{base}/download"),
            },
        }
    }
}

/// Error body for every non-2xx API response
#[derive(Debug, Serialize)]
pub struct ApiErrorBody<'a> {
    pub error: &'a str,
    pub code: u16,
}
