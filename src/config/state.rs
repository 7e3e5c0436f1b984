// Application state module
// Read-only state shared by every connection

use std::io;
use std::path::PathBuf;

use super::types::Config;
use crate::http::MimeTable;

/// Application state
///
/// Built once before the listener starts and shared as `Arc<AppState>`.
/// Nothing in here changes afterwards, so no locking is needed.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub mime: MimeTable,
    /// Canonical document root, symlinks resolved
    pub root: PathBuf,
}

impl AppState {
    /// Create `AppState`, resolving the document root
    ///
    /// Fails if the root does not exist or is not a directory.
    pub fn new(config: Config) -> io::Result<Self> {
        let root = PathBuf::from(&config.files.root).canonicalize().map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Document root '{}' is not accessible: {e}", config.files.root),
            )
        })?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Document root '{}' is not a directory", root.display()),
            ));
        }

        let mime = MimeTable::with_overrides(&config.mime.types);

        Ok(Self { config, mime, root })
    }

    pub fn server_name(&self) -> &str {
        &self.config.http.server_name
    }
}
