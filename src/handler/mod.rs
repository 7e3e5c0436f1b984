//! Request handler module
//!
//! Maps request paths onto the document root and serves what it finds there.

pub mod listing;
pub mod resolve;
pub mod router;
pub mod static_files;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main entry point
pub use router::handle_request;
