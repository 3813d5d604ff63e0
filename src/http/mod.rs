//! HTTP protocol layer module
//!
//! Protocol helpers shared by the asset routes and the layer API:
//! content types, cache validation and response builders.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_304_response, build_404_response, build_405_response, build_413_response,
    build_asset_response, build_options_response, build_redirect_response,
};
