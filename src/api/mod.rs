// API module entry
// Read-only layer registry API mounted under /api on the portal port

mod handlers;
mod response;
mod types;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use crate::config::AppState;
use handlers::QueryParams;

/// Path prefix reserved for the API
pub const API_PREFIX: &str = "/api";

/// Whether `path` belongs to the API rather than the frontend tree
pub fn is_api_path(path: &str) -> bool {
    path == API_PREFIX
        || path
            .strip_prefix(API_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// API route handler
///
/// Dispatches on the decoded path segments below `/api`.
pub fn handle_api(
    path: &str,
    query: Option<&str>,
    is_head: bool,
    state: &AppState,
) -> Response<Full<Bytes>> {
    let rest = path.strip_prefix(API_PREFIX).unwrap_or(path);
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["layers"] => handlers::handle_catalog(state, is_head),
        ["layers", name] => handlers::handle_layer(state, name, is_head),
        ["layers", name, "download"] => {
            handlers::handle_download(state, name, &QueryParams::parse(query))
        }
        ["layers", name, "map"] => handlers::handle_map(state, name, &QueryParams::parse(query)),
        ["layers", name, "info"] => handlers::handle_info(state, name, &QueryParams::parse(query)),
        _ => response::not_found(&format!("No API endpoint at {path}")),
    }
}
