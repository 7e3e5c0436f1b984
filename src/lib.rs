//! staticd — a minimal static-file HTTP server
//!
//! Serves files from a document root over HTTP/1.x with a content type taken
//! from the file extension.

pub mod cli;
pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
