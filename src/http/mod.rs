//! HTTP protocol layer module
//!
//! Content-type resolution, cache validators and response builders, kept
//! apart from request handling.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use mime::MimeTable;
pub use response::{
    build_301_response, build_304_response, build_400_response, build_403_response,
    build_404_response, build_405_response, build_500_response, build_file_response,
    build_html_response, FileMeta,
};
