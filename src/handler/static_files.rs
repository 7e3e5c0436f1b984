//! Static file serving module
//!
//! Resolves the request path under the document root and builds the
//! response: file contents, directory index, listing, or an error status.

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::resolve::{self, ResolveError, Target};
use crate::handler::router::RequestContext;
use crate::http::{self, cache, FileMeta};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use tokio::fs;

/// Serve the path in `ctx` from the document root
pub async fn serve(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let target = match resolve::resolve(&state.root, ctx.path).await {
        Ok(t) => t,
        Err(e) => return error_response(ctx, state, &e),
    };

    if target.is_dir() {
        return serve_directory(ctx, state, target).await;
    }

    // `/file.html/` names a directory that does not exist
    if ctx.path.ends_with('/') {
        return http::build_404_response(state.server_name());
    }

    serve_file(ctx, state, &target).await
}

/// Serve a directory: redirect, index file, listing or 404
async fn serve_directory(
    ctx: &RequestContext<'_>,
    state: &AppState,
    dir: Target,
) -> Response<Full<Bytes>> {
    if !ctx.path.ends_with('/') {
        // `//host/..` would be read as a protocol-relative URL
        let path = ctx.path.trim_start_matches('/');
        let location = match ctx.query {
            Some(q) => format!("/{path}/?{q}"),
            None => format!("/{path}/"),
        };
        return http::build_301_response(&location, state.server_name());
    }

    for index_file in &state.config.files.index_files {
        match resolve::resolve_relative(&state.root, dir.relative.join(index_file)).await {
            Ok(index) if !index.is_dir() => return serve_file(ctx, state, &index).await,
            Ok(_) | Err(ResolveError::NotFound) => {}
            Err(e) => return error_response(ctx, state, &e),
        }
    }

    if !state.config.files.directory_listing {
        return http::build_404_response(state.server_name());
    }

    let display_path = resolve::decode_path(ctx.path).unwrap_or_else(|_| ctx.path.to_string());
    match listing::render(&dir.real, &display_path).await {
        Ok(html) => http::build_html_response(html, state.server_name(), ctx.is_head),
        Err(e) => error_response(ctx, state, &ResolveError::from_io(e)),
    }
}

/// Serve a regular file with its content type and validators
async fn serve_file(
    ctx: &RequestContext<'_>,
    state: &AppState,
    file: &Target,
) -> Response<Full<Bytes>> {
    let modified = file.metadata.modified().ok();
    let last_modified = modified.map(cache::format_http_date);

    if let (Some(mtime), Some(stamp)) = (modified, &last_modified) {
        if cache::not_modified_since(ctx.if_modified_since.as_deref(), mtime) {
            return http::build_304_response(stamp, state.server_name());
        }
    }

    let content = match fs::read(&file.real).await {
        Ok(c) => c,
        Err(e) => return error_response(ctx, state, &ResolveError::from_io(e)),
    };

    // Content type follows the requested name, not a symlink target
    let meta = FileMeta {
        content_type: state.mime.resolve(&file.relative),
        last_modified,
        server_name: state.server_name(),
    };

    http::build_file_response(Bytes::from(content), &meta, ctx.is_head)
}

/// Map a resolution failure to a response, logging what the operator needs
fn error_response(
    ctx: &RequestContext<'_>,
    state: &AppState,
    err: &ResolveError,
) -> Response<Full<Bytes>> {
    let server_name = state.server_name();
    match err {
        ResolveError::BadRequest(reason) => {
            logger::log_warning(&format!("Rejected path '{}': {reason}", ctx.path));
            http::build_400_response(server_name)
        }
        ResolveError::Forbidden => {
            logger::log_warning(&format!("Access denied: {}", ctx.path));
            http::build_403_response(server_name)
        }
        // File not found is common, no need to log at warning level
        ResolveError::NotFound => http::build_404_response(server_name),
        ResolveError::Io(e) => {
            logger::log_error(&format!("Failed to serve '{}': {e}", ctx.path));
            http::build_500_response(server_name)
        }
    }
}
