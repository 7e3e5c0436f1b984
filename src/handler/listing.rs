//! Directory listing page
//!
//! Rendered when a directory has no index file and listing is enabled.

use std::fmt::Write as _;
use std::io;
use std::path::Path;
use tokio::fs;

/// One row of the listing
#[derive(Debug, PartialEq, Eq)]
struct Entry {
    name: String,
    is_dir: bool,
    is_symlink: bool,
}

/// Render the listing for `dir`
///
/// `display_path` is the decoded request path shown in the title.
pub async fn render(dir: &Path, display_path: &str) -> io::Result<String> {
    let mut entries = Vec::new();
    let mut reader = fs::read_dir(dir).await?;
    while let Some(item) = reader.next_entry().await? {
        let name = item.file_name().to_string_lossy().into_owned();
        let is_symlink = item
            .file_type()
            .await
            .map(|t| t.is_symlink())
            .unwrap_or(false);
        // follows symlinks; a dangling link is listed as a file
        let is_dir = fs::metadata(item.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        entries.push(Entry {
            name,
            is_dir,
            is_symlink,
        });
    }
    entries.sort_by_key(|e| e.name.to_lowercase());

    Ok(render_entries(display_path, &entries))
}

fn render_entries(display_path: &str, entries: &[Entry]) -> String {
    let title = format!("Directory listing for {}", escape_html(display_path));

    let mut html = String::with_capacity(256 + entries.len() * 64);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{title}</title>");
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>{title}</h1>");
    html.push_str("<hr>\n<ul>\n");

    for entry in entries {
        let mut href = urlencoding::encode(&entry.name).into_owned();
        if entry.is_dir {
            href.push('/');
        }
        // symlinks show '@' even when they point at a directory
        let suffix = if entry.is_symlink {
            "@"
        } else if entry.is_dir {
            "/"
        } else {
            ""
        };
        let label = format!("{}{suffix}", escape_html(&entry.name));
        let _ = writeln!(html, "<li><a href=\"{href}\">{label}</a></li>");
    }

    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

/// Escape text for HTML content and attribute values
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
