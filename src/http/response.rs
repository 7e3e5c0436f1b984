//! HTTP response building module
//!
//! Builders for each status code the server emits.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    ALLOW, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED, LOCATION, SERVER,
};
use hyper::Response;

/// Metadata written alongside a file body
pub struct FileMeta<'a> {
    pub content_type: &'a str,
    pub last_modified: Option<String>,
    pub server_name: &'a str,
}

/// Build 200 response for a file
///
/// `Content-Length` always reflects the file size, also for `HEAD`.
pub fn build_file_response(
    data: Bytes,
    meta: &FileMeta<'_>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    let mut builder = Response::builder()
        .status(200)
        .header(CONTENT_TYPE, meta.content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(SERVER, meta.server_name);
    if let Some(ref modified) = meta.last_modified {
        builder = builder.header(LAST_MODIFIED, modified);
    }

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error("200", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build HTML response (directory listings)
pub fn build_html_response(
    content: String,
    server_name: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(200)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .header(CONTENT_LENGTH, content_length)
        .header(SERVER, server_name)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 301 redirect response
pub fn build_301_response(location: &str, server_name: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(301)
        .header(LOCATION, location)
        .header(CONTENT_LENGTH, 0)
        .header(SERVER, server_name)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(last_modified: &str, server_name: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(304)
        .header(LAST_MODIFIED, last_modified)
        .header(SERVER, server_name)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 400 Bad Request response
pub fn build_400_response(server_name: &str) -> Response<Full<Bytes>> {
    build_text_response(400, "400 Bad Request", server_name)
}

/// Build 403 Forbidden response
pub fn build_403_response(server_name: &str) -> Response<Full<Bytes>> {
    build_text_response(403, "403 Forbidden", server_name)
}

/// Build 404 Not Found response
pub fn build_404_response(server_name: &str) -> Response<Full<Bytes>> {
    build_text_response(404, "404 Not Found", server_name)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(server_name: &str) -> Response<Full<Bytes>> {
    let body = "405 Method Not Allowed";
    Response::builder()
        .status(405)
        .header(CONTENT_TYPE, "text/plain")
        .header(CONTENT_LENGTH, body.len())
        .header(ALLOW, "GET, HEAD")
        .header(SERVER, server_name)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(Full::new(Bytes::from(body)))
        })
}

/// Build 500 Internal Server Error response
pub fn build_500_response(server_name: &str) -> Response<Full<Bytes>> {
    build_text_response(500, "500 Internal Server Error", server_name)
}

fn build_text_response(status: u16, body: &'static str, server_name: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain")
        .header(CONTENT_LENGTH, body.len())
        .header(SERVER, server_name)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error(&status.to_string(), &e);
            Response::new(Full::new(Bytes::from(body)))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
