//! HTTP cache validation module
//!
//! `Last-Modified` generation and `If-Modified-Since` handling.

use chrono::{DateTime, Utc};
use std::time::SystemTime;

/// IMF-fixdate layout used by `Last-Modified` and `Date`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an HTTP date
///
/// # Examples
/// ```
/// use staticd::http::cache::format_http_date;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let t = UNIX_EPOCH + Duration::from_secs(784_111_777);
/// assert_eq!(format_http_date(t), "Sun, 06 Nov 1994 08:49:37 GMT");
/// ```
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date (IMF-fixdate / RFC 2822 form)
///
/// Obsolete RFC 850 and asctime forms are not recognized; callers treat them
/// as absent.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Check whether the client's copy is still fresh
///
/// HTTP dates have one-second resolution, so the modification time is
/// truncated before comparing.
///
/// # Returns
/// Returns true if the response should be 304
pub fn not_modified_since(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    let Some(since) = if_modified_since.and_then(parse_http_date) else {
        return false;
    };
    let modified = DateTime::<Utc>::from(modified).timestamp();
    modified <= since.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_format_http_date() {
        assert_eq!(format_http_date(at(0)), "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(format_http_date(at(784_111_777)), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_parse_roundtrip() {
        let parsed = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(parsed.timestamp(), 784_111_777);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_http_date("yesterday").is_none());
        assert!(parse_http_date("").is_none());
    }

    #[test]
    fn test_not_modified_since() {
        let header = "Sun, 06 Nov 1994 08:49:37 GMT";
        assert!(not_modified_since(Some(header), at(784_111_777)));
        assert!(not_modified_since(Some(header), at(784_000_000)));
        // sub-second part is ignored
        assert!(not_modified_since(
            Some(header),
            at(784_111_777) + Duration::from_millis(500)
        ));
        assert!(!not_modified_since(Some(header), at(784_111_778)));
    }

    #[test]
    fn test_missing_or_invalid_header() {
        assert!(!not_modified_since(None, at(0)));
        assert!(!not_modified_since(Some("not a date"), at(0)));
    }
}
