//! Request path resolution
//!
//! Turns a request target into a location under the document root. Paths are
//! normalized lexically first, so `..` can never climb above the root; the
//! canonical result is then checked again to catch symlinks pointing outside.

use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Why a path could not be served
#[derive(Debug)]
pub enum ResolveError {
    /// Undecodable or illegal path
    BadRequest(&'static str),
    /// Outside the document root, or not readable
    Forbidden,
    NotFound,
    /// Any other I/O failure
    Io(io::Error),
}

impl ResolveError {
    /// Classify an I/O error from the filesystem
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Forbidden,
            // a path component is a regular file (`/index.html/x`)
            _ if err.raw_os_error() == Some(ENOTDIR) => Self::NotFound,
            _ => Self::Io(err),
        }
    }

    /// HTTP status code reported to the client
    pub const fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Io(_) => 500,
        }
    }
}

#[cfg(unix)]
const ENOTDIR: i32 = 20;
#[cfg(not(unix))]
const ENOTDIR: i32 = 267; // ERROR_DIRECTORY

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest(reason) => write!(f, "bad request path: {reason}"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not found"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// A resolved location inside the document root
#[derive(Debug)]
pub struct Target {
    /// Path relative to the root, after normalization
    pub relative: PathBuf,
    /// Canonical path on disk
    pub real: PathBuf,
    pub metadata: Metadata,
}

impl Target {
    pub fn is_dir(&self) -> bool {
        self.metadata.is_dir()
    }
}

/// Percent-decode a request path
///
/// # Examples
/// ```
/// use staticd::handler::resolve::decode_path;
///
/// assert_eq!(decode_path("/my%20file.txt").unwrap(), "/my file.txt");
/// assert!(decode_path("/%ff").is_err());
/// ```
pub fn decode_path(raw: &str) -> Result<String, ResolveError> {
    let decoded = urlencoding::decode(raw)
        .map_err(|_| ResolveError::BadRequest("path is not valid UTF-8"))?;
    if decoded.contains('\0') {
        return Err(ResolveError::BadRequest("path contains NUL"));
    }
    Ok(decoded.into_owned())
}

/// Normalize a decoded path into a relative path
///
/// Empty and `.` segments are dropped; `..` removes the previous segment and
/// is ignored at the top.
pub fn normalize(decoded: &str) -> Result<PathBuf, ResolveError> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => {
                if s.contains('\\') {
                    return Err(ResolveError::BadRequest("path contains backslash"));
                }
                // Reject anything the platform would not treat as a plain name
                let mut components = Path::new(s).components();
                if !matches!(
                    (components.next(), components.next()),
                    (Some(Component::Normal(_)), None)
                ) {
                    return Err(ResolveError::BadRequest("illegal path segment"));
                }
                segments.push(s);
            }
        }
    }
    Ok(segments.iter().collect())
}

/// Resolve a raw (percent-encoded) request path under `root`
///
/// `root` must already be canonical.
pub async fn resolve(root: &Path, raw_path: &str) -> Result<Target, ResolveError> {
    let decoded = decode_path(raw_path)?;
    let relative = normalize(&decoded)?;
    resolve_relative(root, relative).await
}

/// Resolve an already normalized relative path under `root`
pub async fn resolve_relative(root: &Path, relative: PathBuf) -> Result<Target, ResolveError> {
    let joined = root.join(&relative);
    let real = fs::canonicalize(&joined)
        .await
        .map_err(ResolveError::from_io)?;

    if !real.starts_with(root) {
        return Err(ResolveError::Forbidden);
    }

    let metadata = fs::metadata(&real).await.map_err(ResolveError::from_io)?;
    if !metadata.is_dir() && !metadata.is_file() {
        // sockets, fifos, devices
        return Err(ResolveError::Forbidden);
    }

    Ok(Target {
        relative,
        real,
        metadata,
    })
}
