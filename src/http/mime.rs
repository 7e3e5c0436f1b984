//! MIME type detection module
//!
//! Maps file extensions to `Content-Type` values through an immutable table
//! built once at startup.

use std::collections::HashMap;
use std::path::Path;

/// Fallback type, stored under the empty-string key
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Common web types. Entries in `PRESERVED_TYPES` override these.
const COMMON_TYPES: &[(&str, &str)] = &[
    // Text
    (".htm", "text/html"),
    (".txt", "text/plain; charset=utf-8"),
    (".md", "text/plain; charset=utf-8"),
    (".xml", "application/xml"),
    (".csv", "text/csv"),
    // JavaScript/WASM
    (".mjs", "text/javascript"),
    (".json", "application/json"),
    (".map", "application/json"),
    (".wasm", "application/wasm"),
    (".webmanifest", "application/manifest+json"),
    // Images
    (".jpeg", "image/jpeg"),
    (".gif", "image/gif"),
    (".ico", "image/x-icon"),
    (".webp", "image/webp"),
    (".avif", "image/avif"),
    // Video
    (".mp4", "video/mp4"),
    (".webm", "video/webm"),
    (".ogv", "video/ogg"),
    // Audio
    (".mp3", "audio/mpeg"),
    (".wav", "audio/wav"),
    (".ogg", "audio/ogg"),
    (".flac", "audio/flac"),
    // Fonts
    (".woff", "font/woff"),
    (".woff2", "font/woff2"),
    (".ttf", "font/ttf"),
    (".otf", "font/otf"),
    // Documents
    (".pdf", "application/pdf"),
    (".zip", "application/zip"),
    (".gz", "application/gzip"),
    (".tar", "application/x-tar"),
];

/// Entries served exactly as listed, including the oddities (`image/jpg`).
///
/// `.module.js` is mapped to `text/javascript`; the bare value `module` that
/// some deployments used is not a valid media type.
const PRESERVED_TYPES: &[(&str, &str)] = &[
    (".manifest", "text/cache-manifest"),
    (".html", "text/html"),
    (".png", "image/png"),
    (".jpg", "image/jpg"),
    (".svg", "image/svg+xml"),
    (".css", "text/css"),
    (".js", "text/javascript"),
    (".module.js", "text/javascript"),
    ("", DEFAULT_CONTENT_TYPE),
];

/// Extension to `Content-Type` table
///
/// Keys carry their leading dot (`.html`). The empty key is always present,
/// so [`MimeTable::resolve`] never fails.
#[derive(Debug, Clone)]
pub struct MimeTable {
    types: HashMap<String, String>,
}

impl MimeTable {
    /// Build the table from the built-in entries
    pub fn new() -> Self {
        let types = COMMON_TYPES
            .iter()
            .chain(PRESERVED_TYPES)
            .map(|(ext, mime)| ((*ext).to_string(), (*mime).to_string()))
            .collect();
        Self { types }
    }

    /// Build the table and apply operator overrides on top
    ///
    /// Keys may be given with or without the leading dot.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut table = Self::new();
        for (ext, mime) in overrides {
            table.insert(ext, mime);
        }
        table
    }

    /// Insert or replace one entry
    pub fn insert(&mut self, ext: &str, mime: &str) {
        self.types.insert(normalize_key(ext), mime.to_string());
    }

    /// Number of entries, fallback included
    pub(crate) fn len(&self) -> usize {
        self.types.len()
    }

    /// Look up the `Content-Type` for a path
    ///
    /// Only the final path segment is considered. Suffixes are tried longest
    /// first, each exactly and then lowercased.
    ///
    /// # Examples
    /// ```
    /// use staticd::http::mime::MimeTable;
    ///
    /// let table = MimeTable::new();
    /// assert_eq!(table.resolve("site/index.html"), "text/html");
    /// assert_eq!(table.resolve("app.module.js"), "text/javascript");
    /// assert_eq!(table.resolve("LICENSE"), "application/octet-stream");
    /// ```
    pub fn resolve(&self, path: impl AsRef<Path>) -> &str {
        let name = path
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        for suffix in extension_candidates(&name) {
            if let Some(mime) = self.types.get(suffix) {
                return mime;
            }
            if let Some(mime) = self.types.get(&suffix.to_ascii_lowercase()) {
                return mime;
            }
        }

        self.fallback()
    }

    fn fallback(&self) -> &str {
        self.types
            .get("")
            .map_or(DEFAULT_CONTENT_TYPE, String::as_str)
    }
}

impl Default for MimeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Suffixes of `name` starting at each `.`, longest first
///
/// A dot at position 0 does not start an extension (`.bashrc`).
fn extension_candidates(name: &str) -> impl Iterator<Item = &str> {
    name.match_indices('.')
        .filter(|(idx, _)| *idx > 0)
        .map(move |(idx, _)| &name[idx..])
}

fn normalize_key(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(".{trimmed}")
    }
}
