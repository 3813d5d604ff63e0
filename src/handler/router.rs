//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, path
//! decoding and dispatch to the asset roots or the layer API.

use crate::api;
use crate::config::AppState;
use crate::handler::static_files;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, SERVER};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response};
use percent_encoding::percent_decode_str;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

const INDEX_PAGE: &str = "index.html";
const ROCK_IDENTIFIER_PAGE: &str = "rock_identifier.html";
const STATIC_PREFIX: &str = "/static/";

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    /// Percent-decoded request path
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub cache_max_age: u32,
}

/// Main entry point for HTTP request handling
///
/// Only the request head is inspected, so any body type is accepted and
/// the body is dropped unread.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();

    let mut response = dispatch(&parts, &state).await;

    if let Ok(value) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, value);
    }

    if state.config.logging.access_log {
        log_access(&parts, &response, peer_addr, started, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn dispatch(req: &Parts, state: &AppState) -> Response<Full<Bytes>> {
    let method = &req.method;

    // 1. Check HTTP method
    if let Some(resp) = check_http_method(method, state.config.http.enable_cors) {
        return resp;
    }

    // 2. Check body size
    if let Some(resp) = check_body_size(req, state.config.http.max_body_size) {
        return resp;
    }

    // 3. Log headers if enabled
    logger::log_headers_count(req.headers.len(), state.config.logging.show_headers);

    // 4. Decode the path once; everything downstream sees the decoded form
    let Ok(path) = percent_decode_str(req.uri.path()).decode_utf8() else {
        logger::log_info(&format!("Rejected non UTF-8 path: {}", req.uri.path()));
        return http::build_404_response();
    };

    let ctx = RequestContext {
        path: &path,
        query: req.uri.query(),
        is_head: *method == Method::HEAD,
        if_none_match: req
            .headers
            .get("if-none-match")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string),
        cache_max_age: state.config.http.cache_max_age,
    };

    route_request(&ctx, state).await
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(req: &Parts, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers.get("content-length")?;
    let size = content_length.to_str().ok()?.trim().parse::<u64>().ok()?;
    if size > max_body_size {
        logger::log_error(&format!(
            "Request body too large: {size} bytes (max: {max_body_size})"
        ));
        return Some(http::build_413_response());
    }
    None
}

/// Route request, most specific pattern first
async fn route_request(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    // 1. Landing page
    if ctx.path == "/" {
        return static_files::serve_asset(ctx, &state.frontend, INDEX_PAGE).await;
    }

    // 2. Rock identifier page
    if ctx.path == "/rock_identifier" {
        return static_files::serve_asset(ctx, &state.frontend, ROCK_IDENTIFIER_PAGE).await;
    }

    // 3. Layer registry API
    if api::is_api_path(ctx.path) {
        return api::handle_api(ctx.path, ctx.query, ctx.is_head, state);
    }

    // 4. Backend static files
    if let Some(filename) = ctx.path.strip_prefix(STATIC_PREFIX) {
        return static_files::serve_asset(ctx, &state.backend_static, filename).await;
    }

    // 5. Everything else comes from the frontend tree
    let relative = ctx.path.strip_prefix('/').unwrap_or(ctx.path);
    static_files::serve_asset(ctx, &state.frontend, relative).await
}

fn log_access(
    req: &Parts,
    response: &Response<Full<Bytes>>,
    peer_addr: SocketAddr,
    started: Instant,
    format: &str,
) {
    let header = |name: &str| {
        req.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method.to_string(),
        req.uri.path().to_string(),
    );
    entry.query = req.uri.query().map(ToString::to_string);
    entry.http_version = version_label(req.version).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
        .unwrap_or(usize::MAX);
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, format);
}

const fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use std::fs;
    use std::path::Path;

    struct Fixture {
        _dir: tempfile::TempDir,
        state: Arc<AppState>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let backend = dir.path().join("backend");
        let frontend = dir.path().join("frontend");
        let static_dir = backend.join("static");

        fs::create_dir_all(frontend.join("css")).unwrap();
        fs::create_dir_all(frontend.join("js")).unwrap();
        fs::create_dir_all(frontend.join("img")).unwrap();
        fs::create_dir_all(static_dir.join("images")).unwrap();
        fs::write(frontend.join("index.html"), "<h1>Geoportal</h1>").unwrap();
        fs::write(frontend.join("rock_identifier.html"), "<h1>Rocks</h1>").unwrap();
        fs::write(frontend.join("css/style.css"), "body { margin: 0; }").unwrap();
        fs::write(frontend.join("js/main.js"), "let map;").unwrap();
        fs::write(frontend.join("my map.html"), "spaced").unwrap();
        fs::write(frontend.join("img/a.png"), "png").unwrap();
        fs::write(static_dir.join("images/quartz.png"), b"\x89PNGquartz").unwrap();
        fs::write(backend.join("config.py"), "SECRET = 1").unwrap();

        let mut cfg = Config::load_from("does-not-exist/geoportal").unwrap();
        cfg.logging.access_log = false;
        cfg.assets.frontend_dir = path_str(&frontend);
        cfg.assets.static_dir = path_str(&static_dir);

        Fixture {
            state: Arc::new(AppState::new(&cfg)),
            _dir: dir,
        }
    }

    fn path_str(path: &Path) -> String {
        path.to_str().unwrap().to_string()
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<()>) -> (u16, hyper::HeaderMap, Bytes) {
        let resp = handle_request(req, Arc::clone(state), peer()).await.unwrap();
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> (u16, hyper::HeaderMap, Bytes) {
        send(state, Request::get(uri).body(()).unwrap()).await
    }

    #[tokio::test]
    async fn test_index_and_rock_identifier() {
        let fx = fixture();
        let (status, headers, body) = get(&fx.state, "/").await;
        assert_eq!(status, 200);
        assert_eq!(&body[..], b"<h1>Geoportal</h1>");
        assert_eq!(headers["content-type"], "text/html; charset=utf-8");
        assert_eq!(headers["server"], "geoportal");

        let (status, _, body) = get(&fx.state, "/rock_identifier").await;
        assert_eq!(status, 200);
        assert_eq!(&body[..], b"<h1>Rocks</h1>");
    }

    #[tokio::test]
    async fn test_frontend_assets() {
        let fx = fixture();
        let (status, headers, body) = get(&fx.state, "/css/style.css").await;
        assert_eq!(status, 200);
        assert_eq!(&body[..], b"body { margin: 0; }");
        assert_eq!(headers["content-type"], "text/css; charset=utf-8");

        let (status, _, body) = get(&fx.state, "/js/main.js").await;
        assert_eq!(status, 200);
        assert_eq!(&body[..], b"let map;");

        let (status, _, body) = get(&fx.state, "/my%20map.html").await;
        assert_eq!(status, 200);
        assert_eq!(&body[..], b"spaced");
    }

    #[tokio::test]
    async fn test_missing_frontend_asset_is_404() {
        let fx = fixture();
        for uri in ["/missing.js", "/css", "/css/"] {
            let (status, _, body) = get(&fx.state, uri).await;
            assert_eq!(status, 404, "{uri}");
            assert_eq!(&body[..], b"Static file not found");
        }
    }

    #[tokio::test]
    async fn test_backend_static() {
        let fx = fixture();
        let (status, headers, body) = get(&fx.state, "/static/images/quartz.png").await;
        assert_eq!(status, 200);
        assert_eq!(&body[..], b"\x89PNGquartz");
        assert_eq!(headers["content-type"], "image/png");
        assert!(headers.contains_key("etag"));

        let (status, _, body) = get(&fx.state, "/static/images/missing.png").await;
        assert_eq!(status, 404);
        assert_eq!(&body[..], b"Static file not found");
    }

    #[tokio::test]
    async fn test_static_does_not_fall_back_to_frontend() {
        let fx = fixture();
        let (status, _, _) = get(&fx.state, "/static/index.html").await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_traversal_is_404() {
        let fx = fixture();
        for uri in [
            "/static/../../etc/passwd",
            "/static/../config.py",
            "/static/%2e%2e/config.py",
            "/static/images/%2E%2E/%2E%2E/config.py",
            "/../backend/config.py",
            "/%2e%2e/backend/config.py",
            "/static//etc/passwd",
        ] {
            let (status, _, body) = get(&fx.state, uri).await;
            assert_eq!(status, 404, "{uri}");
            assert_eq!(&body[..], b"Static file not found", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_parent_segments_that_stay_inside_root() {
        let fx = fixture();
        for uri in ["/img/../img/a.png", "/img/./a.png", "/css/../img/a.png"] {
            let (status, _, body) = get(&fx.state, uri).await;
            assert_eq!(status, 200, "{uri}");
            assert_eq!(&body[..], b"png", "{uri}");
        }

        let (status, _, body) = get(&fx.state, "/static/../config.py").await;
        assert_eq!(status, 404);
        assert_eq!(&body[..], b"Static file not found");
        let (status, _, _) = get(&fx.state, "/static/images/../../config.py").await;
        assert_eq!(status, 404);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_io_error_is_uniform_404() {
        let fx = fixture();
        let static_root = fx.state.backend_static.path().to_path_buf();
        std::os::unix::fs::symlink("loop", static_root.join("loop")).unwrap();
        std::os::unix::fs::symlink("loop", fx.state.frontend.path().join("loop")).unwrap();

        for uri in ["/static/loop", "/loop"] {
            let (status, _, body) = get(&fx.state, uri).await;
            assert_eq!(status, 404, "{uri}");
            assert_eq!(&body[..], b"Static file not found", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_path() {
        let fx = fixture();
        let (status, _, _) = get(&fx.state, "/%ff%fe.html").await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_conditional_get() {
        let fx = fixture();
        let (_, headers, _) = get(&fx.state, "/js/main.js").await;
        let etag = headers["etag"].to_str().unwrap().to_string();

        let req = Request::get("/js/main.js")
            .header("If-None-Match", &etag)
            .body(())
            .unwrap();
        let (status, headers, body) = send(&fx.state, req).await;
        assert_eq!(status, 304);
        assert_eq!(headers["etag"].to_str().unwrap(), etag);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_head_request() {
        let fx = fixture();
        let req = Request::head("/").body(()).unwrap();
        let (status, headers, body) = send(&fx.state, req).await;
        assert_eq!(status, 200);
        assert_eq!(headers["content-length"], "18");
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_method_handling() {
        let fx = fixture();
        let (status, headers, _) = send(&fx.state, Request::post("/").body(()).unwrap()).await;
        assert_eq!(status, 405);
        assert_eq!(headers["allow"], "GET, HEAD, OPTIONS");

        let (status, _, _) = send(&fx.state, Request::options("/").body(()).unwrap()).await;
        assert_eq!(status, 204);
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let fx = fixture();
        let req = Request::get("/")
            .header("Content-Length", "999999999")
            .body(())
            .unwrap();
        let (status, _, _) = send(&fx.state, req).await;
        assert_eq!(status, 413);
    }

    #[tokio::test]
    async fn test_api_routes_take_precedence_over_frontend() {
        let fx = fixture();
        let (status, headers, body) = get(&fx.state, "/api/layers").await;
        assert_eq!(status, 200);
        assert_eq!(headers["content-type"], "application/json");
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["layers"].as_array().unwrap().len(), 7);

        let (status, headers, _) = get(&fx.state, "/api/layers/country/download?format=csv").await;
        assert_eq!(status, 302);
        assert!(headers["location"].to_str().unwrap().contains("outputFormat=csv"));
    }

    #[tokio::test]
    async fn test_index_is_stable_across_requests() {
        let fx = fixture();
        let (_, _, first) = get(&fx.state, "/").await;
        get(&fx.state, "/static/images/quartz.png").await;
        get(&fx.state, "/nope").await;
        let (_, _, second) = get(&fx.state, "/").await;
        assert_eq!(first, second);
    }
}
