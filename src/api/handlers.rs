// Layer API handlers module

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::collections::HashMap;

use super::response::{bad_request, json_response, not_found};
use super::types::{LayerCatalog, LayerDetail};
use crate::config::AppState;
use crate::http;
use crate::layers::wms::{self, BBox, DownloadFormat, GetFeatureInfo, GetMap};
use crate::layers::LayerEntry;
use crate::logger;

const DEFAULT_TILE_SIZE: u32 = 256;
const MAX_IMAGE_SIZE: u32 = 4096;
const DEFAULT_FEATURE_COUNT: u32 = 10;

/// Parsed query string, last value wins
pub struct QueryParams(HashMap<String, String>);

impl QueryParams {
    pub fn parse(query: Option<&str>) -> Self {
        Self(
            url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
                .into_owned()
                .collect(),
        )
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Optional bounded dimension; `Err` carries the 400 message
    fn dimension(&self, key: &str, default: u32) -> Result<u32, String> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => match raw.parse::<u32>() {
                Ok(v) if (1..=MAX_IMAGE_SIZE).contains(&v) => Ok(v),
                _ => Err(format!("'{key}' must be an integer between 1 and {MAX_IMAGE_SIZE}")),
            },
        }
    }

    fn bbox(&self) -> Result<BBox, String> {
        let raw = self.get("bbox").ok_or("'bbox' is required")?;
        BBox::parse(raw).ok_or_else(|| format!("Invalid bbox '{raw}', expected minx,miny,maxx,maxy"))
    }
}

/// `GET /api/layers`
pub fn handle_catalog(state: &AppState, is_head: bool) -> Response<Full<Bytes>> {
    let catalog = LayerCatalog {
        geoserver_url: state.layers.wms_url(),
        wfs_url: state.layers.wfs_url(),
        layers: state.layers.iter().map(LayerDetail::from_entry).collect(),
    };
    json_response(StatusCode::OK, &catalog, is_head)
}

/// `GET /api/layers/<name>`
pub fn handle_layer(state: &AppState, name: &str, is_head: bool) -> Response<Full<Bytes>> {
    match lookup(state, name) {
        Ok(entry) => json_response(StatusCode::OK, &LayerDetail::from_entry(entry), is_head),
        Err(resp) => resp,
    }
}

/// `GET /api/layers/<name>/download?format=shp|gml|csv|geojson`
pub fn handle_download(state: &AppState, name: &str, params: &QueryParams) -> Response<Full<Bytes>> {
    let entry = match lookup(state, name) {
        Ok(e) => e,
        Err(resp) => return resp,
    };

    let format = match params.get("format") {
        None => DownloadFormat::default(),
        Some(key) => match DownloadFormat::from_key(key) {
            Some(f) => f,
            None => {
                return bad_request(&format!(
                    "Unsupported format '{key}', expected one of shp, gml, csv, geojson"
                ))
            }
        },
    };

    let bbox = match params.get("bbox") {
        None => None,
        Some(_) => match params.bbox() {
            Ok(b) => Some(b),
            Err(msg) => return bad_request(&msg),
        },
    };

    // GeoServer vendor option naming the saved file, e.g. minerals_data.zip
    let url = wms::get_feature_url(&state.layers.wfs_url(), &entry.identifier, format, bbox).map(
        |mut url| {
            url.query_pairs_mut().append_pair(
                "format_options",
                &format!("filename:{}_data.{}", entry.name, format.extension()),
            );
            url
        },
    );
    redirect_to(url)
}

/// `GET /api/layers/<name>/map?bbox=..&width=..&height=..`
pub fn handle_map(state: &AppState, name: &str, params: &QueryParams) -> Response<Full<Bytes>> {
    let entry = match lookup(state, name) {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    let request = match map_request(params) {
        Ok(r) => r,
        Err(msg) => return bad_request(&msg),
    };
    let layers = [entry.identifier.as_str()];
    let get_map = GetMap {
        layers: &layers,
        ..request
    };
    redirect_to(get_map.to_url(state.layers.wms_url()))
}

/// `GET /api/layers/<name>/info?bbox=..&width=..&height=..&x=..&y=..`
pub fn handle_info(state: &AppState, name: &str, params: &QueryParams) -> Response<Full<Bytes>> {
    let entry = match lookup(state, name) {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    let request = match map_request(params) {
        Ok(r) => r,
        Err(msg) => return bad_request(&msg),
    };

    let pixel = |key: &str, limit: u32| -> Result<u32, String> {
        let raw = params.get(key).ok_or_else(|| format!("'{key}' is required"))?;
        match raw.parse::<u32>() {
            Ok(v) if v < limit => Ok(v),
            _ => Err(format!("'{key}' must be a pixel offset below {limit}")),
        }
    };
    let (x, y) = match (pixel("x", request.width), pixel("y", request.height)) {
        (Ok(x), Ok(y)) => (x, y),
        (Err(msg), _) | (_, Err(msg)) => return bad_request(&msg),
    };
    let feature_count = match params.dimension("feature_count", DEFAULT_FEATURE_COUNT) {
        Ok(v) => v,
        Err(msg) => return bad_request(&msg),
    };

    let layers = [entry.identifier.as_str()];
    let info = GetFeatureInfo {
        map: GetMap {
            layers: &layers,
            ..request
        },
        query_layers: &layers,
        x,
        y,
        feature_count,
    };
    redirect_to(info.to_url(state.layers.wms_url()))
}

fn lookup<'a>(state: &'a AppState, name: &str) -> Result<&'a LayerEntry, Response<Full<Bytes>>> {
    state
        .layers
        .get(name)
        .ok_or_else(|| not_found(&format!("Unknown layer '{name}'")))
}

/// Map geometry shared by `map` and `info`
fn map_request(params: &QueryParams) -> Result<GetMap<'static>, String> {
    Ok(GetMap {
        layers: &[],
        bbox: params.bbox()?,
        width: params.dimension("width", DEFAULT_TILE_SIZE)?,
        height: params.dimension("height", DEFAULT_TILE_SIZE)?,
    })
}

fn redirect_to(url: Result<url::Url, url::ParseError>) -> Response<Full<Bytes>> {
    match url {
        Ok(u) => http::build_redirect_response(u.as_str()),
        Err(e) => {
            logger::log_error(&format!("Invalid GeoServer URL in configuration: {e}"));
            super::response::error_response(StatusCode::BAD_GATEWAY, "GeoServer URL is misconfigured")
        }
    }
}
