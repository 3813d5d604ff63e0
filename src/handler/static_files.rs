//! Static file serving module
//!
//! Turns resolver results into responses: conditional `ETag` handling on
//! success, a uniform logged 404 on any failure.

use crate::handler::assets::{AssetError, StaticRoot};
use crate::handler::router::RequestContext;
use crate::http::{self, cache};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

/// Serve `relative` from `root`
pub async fn serve_asset(
    ctx: &RequestContext<'_>,
    root: &StaticRoot,
    relative: &str,
) -> Response<Full<Bytes>> {
    match root.resolve(relative).await {
        Ok(asset) => {
            logger::log_debug(&format!("Serving {}", asset.path.display()));
            let etag = cache::generate_etag(&asset.content);
            let cache_control = cache::CachePolicy::for_max_age(ctx.cache_max_age).to_header_value();

            if cache::check_etag_match(ctx.if_none_match.as_deref(), &etag) {
                return http::build_304_response(&etag, &cache_control);
            }

            http::build_asset_response(
                asset.content,
                asset.content_type,
                &etag,
                &cache_control,
                ctx.is_head,
            )
        }
        Err(e) => {
            log_asset_error(root, &e);
            http::build_404_response()
        }
    }
}

fn log_asset_error(root: &StaticRoot, error: &AssetError) {
    let message = format!("Error serving {} file: {error}", root.kind());
    match error {
        // Missing files are routine, keep them out of the error log
        AssetError::NotFound(_) => logger::log_info(&message),
        AssetError::Traversal { .. } | AssetError::RootUnavailable { .. } => {
            logger::log_warning(&message);
        }
        AssetError::Io { .. } => logger::log_error(&message),
    }
}
