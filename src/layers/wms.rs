//! OGC query URL builders
//!
//! Composes WMS `GetMap`/`GetFeatureInfo` and WFS `GetFeature` URLs against
//! the configured GeoServer endpoints. Nothing here performs a request.

use url::Url;

const WMS_VERSION: &str = "1.1.1";
const WFS_VERSION: &str = "1.0.0";
const DEFAULT_SRS: &str = "EPSG:4326";

/// Bounding box in the request SRS
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse `minx,miny,maxx,maxy`; rejects inverted or non-finite boxes
    pub fn parse(value: &str) -> Option<Self> {
        let coords: Vec<f64> = value
            .split(',')
            .map(|c| c.trim().parse::<f64>().ok())
            .collect::<Option<_>>()?;
        let [min_x, min_y, max_x, max_y] = coords.as_slice() else {
            return None;
        };
        let bbox = Self::new(*min_x, *min_y, *max_x, *max_y);
        let finite = coords.iter().all(|c| c.is_finite());
        (finite && bbox.min_x < bbox.max_x && bbox.min_y < bbox.max_y).then_some(bbox)
    }

    fn to_param(self) -> String {
        format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// WMS `GetMap` parameters
#[derive(Debug, Clone)]
pub struct GetMap<'a> {
    pub layers: &'a [&'a str],
    pub bbox: BBox,
    pub width: u32,
    pub height: u32,
}

impl GetMap<'_> {
    pub fn to_url(&self, wms_url: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(wms_url)?;
        url.query_pairs_mut()
            .append_pair("service", "WMS")
            .append_pair("version", WMS_VERSION)
            .append_pair("request", "GetMap")
            .append_pair("layers", &self.layers.join(","))
            .append_pair("styles", "")
            .append_pair("srs", DEFAULT_SRS)
            .append_pair("bbox", &self.bbox.to_param())
            .append_pair("width", &self.width.to_string())
            .append_pair("height", &self.height.to_string())
            .append_pair("format", "image/png")
            .append_pair("transparent", "true");
        Ok(url)
    }
}

/// WMS `GetFeatureInfo` parameters
///
/// `x`/`y` are pixel coordinates inside the map described by `map`.
#[derive(Debug, Clone)]
pub struct GetFeatureInfo<'a> {
    pub map: GetMap<'a>,
    pub query_layers: &'a [&'a str],
    pub x: u32,
    pub y: u32,
    pub feature_count: u32,
}

impl GetFeatureInfo<'_> {
    pub fn to_url(&self, wms_url: &str) -> Result<Url, url::ParseError> {
        let mut url = self.map.to_url(wms_url)?;
        // Same base parameters as GetMap, with the request kind swapped
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                if k == "request" {
                    (k.into_owned(), "GetFeatureInfo".to_string())
                } else {
                    (k.into_owned(), v.into_owned())
                }
            })
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("query_layers", &self.query_layers.join(","))
            .append_pair("info_format", "application/json")
            .append_pair("feature_count", &self.feature_count.to_string())
            .append_pair("x", &self.x.to_string())
            .append_pair("y", &self.y.to_string());
        Ok(url)
    }
}

/// Vector download formats offered by the frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadFormat {
    Shapefile,
    Gml,
    Csv,
    #[default]
    GeoJson,
}

impl DownloadFormat {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "shp" => Some(Self::Shapefile),
            "gml" => Some(Self::Gml),
            "csv" => Some(Self::Csv),
            "geojson" => Some(Self::GeoJson),
            _ => None,
        }
    }

    /// Value for the WFS `outputFormat` parameter
    pub const fn output_format(self) -> &'static str {
        match self {
            Self::Shapefile => "shape-zip",
            Self::Gml => "GML2",
            Self::Csv => "csv",
            Self::GeoJson => "application/json",
        }
    }

    /// File extension the browser should save the download under
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Shapefile => "zip",
            Self::Gml => "gml",
            Self::Csv => "csv",
            Self::GeoJson => "geojson",
        }
    }
}

/// WFS `GetFeature` URL for one layer
pub fn get_feature_url(
    wfs_url: &str,
    type_name: &str,
    format: DownloadFormat,
    bbox: Option<BBox>,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(wfs_url)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("service", "WFS")
            .append_pair("version", WFS_VERSION)
            .append_pair("request", "GetFeature")
            .append_pair("typeName", type_name)
            .append_pair("outputFormat", format.output_format());
        if let Some(bbox) = bbox {
            pairs.append_pair("bbox", &format!("{},{DEFAULT_SRS}", bbox.to_param()));
        }
    }
    Ok(url)
}
