//! Utility functions shared by the capture and formatting code
//!
//! Timestamps, client IP extraction, and the rendering rules every captured
//! body goes through before it lands in the log line.

use std::net::{IpAddr, SocketAddr};

use actix_web::http::header::HeaderMap;
use chrono::Utc;

use crate::config::Config;
use crate::content_type;

/// Logged in place of a body longer than the configured maximum
pub const DATA_TOO_LARGE: &str = "data too large";

/// Current UTC time with millisecond precision, e.g. `2024-01-15T10:30:00.123Z`
pub fn current_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Extract the client IP address, handling proxies
///
/// Candidates come from X-Real-IP, then every X-Forwarded-For entry in order.
/// The first public address wins; private, loopback and link-local hops are
/// skipped. Without a public candidate the first one is used, and without
/// any header the connection peer address.
pub fn extract_ip(headers: &HeaderMap, peer_addr: Option<SocketAddr>) -> String {
    let forwarded = header_str(headers, "x-forwarded-for")
        .into_iter()
        .flat_map(|v| v.split(','));

    let candidates: Vec<&str> = header_str(headers, "x-real-ip")
        .into_iter()
        .chain(forwarded)
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .collect();

    candidates
        .iter()
        .find(|ip| is_public_ip(ip))
        .or_else(|| candidates.first())
        .map(|ip| ip.to_string())
        .or_else(|| peer_addr.map(|addr| addr.ip().to_string()))
        .unwrap_or_default()
}

fn is_public_ip(candidate: &str) -> bool {
    match candidate.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            !(ip.is_private()
                || ip.is_loopback()
                || ip.is_link_local()
                || ip.is_unspecified()
                || ip.is_broadcast())
        }
        Ok(IpAddr::V6(ip)) => {
            let first = ip.segments()[0];
            let unique_local = (first & 0xfe00) == 0xfc00;
            let link_local = (first & 0xffc0) == 0xfe80;
            !(ip.is_loopback() || ip.is_unspecified() || unique_local || link_local)
        }
        Err(_) => false,
    }
}

/// Header value as a string, empty when absent or not visible ASCII
pub fn header_value(headers: &HeaderMap, name: &str) -> String {
    header_str(headers, name).unwrap_or_default().to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Render captured body bytes for the log line
///
/// `total_len` is the full body length, which may exceed `bytes.len()` when
/// the capture buffer stopped early.
pub fn render_body(bytes: &[u8], total_len: usize, content_type: &str, config: &Config) -> String {
    if !content_type::is_supported(content_type, &config.supported_content_types) {
        return String::new();
    }

    if total_len > config.max_body_size {
        return DATA_TOO_LARGE.to_string();
    }

    if bytes.is_empty() {
        return String::new();
    }

    if content_type::is_json(content_type) {
        if let Some(minified) = minify_json(bytes) {
            return minified;
        }
    }

    escape_newlines(&String::from_utf8_lossy(bytes))
}

/// Strip insignificant whitespace from a JSON document
///
/// Returns `None` when the input is not valid JSON. Strings, numbers and key
/// order are kept byte for byte.
pub fn minify_json(bytes: &[u8]) -> Option<String> {
    serde_json::from_slice::<serde::de::IgnoredAny>(bytes).ok()?;

    let mut out = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut escaped = false;

    for &b in bytes {
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b' ' | b'\t' | b'\n' | b'\r' => {}
            b'"' => {
                in_string = true;
                out.push(b);
            }
            _ => out.push(b),
        }
    }

    String::from_utf8(out).ok()
}

/// Escape line breaks so a body never splits the single-line log format
pub fn escape_newlines(body: &str) -> String {
    body.replace('\n', "\\n").replace('\r', "\\r")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    #[test]
    fn test_current_timestamp() {
        let ts = current_timestamp();

        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-01-15T10:30:00.123Z".len());
        chrono::DateTime::parse_from_rfc3339(&ts).expect("Invalid RFC3339 timestamp");
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let headers = headers(&[("x-real-ip", "192.168.1.100")]);
        let peer = "10.0.0.1:5000".parse().ok();
        assert_eq!(extract_ip(&headers, peer), "192.168.1.100");
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let headers = headers(&[("x-forwarded-for", "192.168.1.100, 10.0.0.1")]);
        let peer = "127.0.0.1:5000".parse().ok();
        assert_eq!(extract_ip(&headers, peer), "192.168.1.100");
    }

    #[test]
    fn test_extract_ip_skips_private_hops() {
        let v4 = headers(&[("x-forwarded-for", "10.0.0.5, 127.0.0.1, 198.51.100.7")]);
        assert_eq!(extract_ip(&v4, None), "198.51.100.7");

        let v6 = headers(&[
            ("x-real-ip", "192.168.0.2"),
            ("x-forwarded-for", "fd00::1, fe80::1, 2001:db8::1"),
        ]);
        assert_eq!(extract_ip(&v6, None), "2001:db8::1");
    }

    #[test]
    fn test_is_public_ip() {
        assert!(is_public_ip("8.8.8.8"));
        assert!(!is_public_ip("172.16.4.4"));
        assert!(!is_public_ip("169.254.1.1"));
        assert!(!is_public_ip("::1"));
        assert!(!is_public_ip("unknown"));
    }

    #[test]
    fn test_extract_ip_fallback_to_peer() {
        let peer = "203.0.113.1:443".parse().ok();
        assert_eq!(extract_ip(&HeaderMap::new(), peer), "203.0.113.1");
    }

    #[test]
    fn test_extract_ip_no_source() {
        assert_eq!(extract_ip(&HeaderMap::new(), None), "");
    }

    #[test]
    fn test_minify_json() {
        let body = b"{\n  \"user\": \"al ice\",\n  \"tags\": [1, 2.50, 1e3]\n}\n";
        assert_eq!(
            minify_json(body).as_deref(),
            Some(r#"{"user":"al ice","tags":[1,2.50,1e3]}"#)
        );
    }

    #[test]
    fn test_minify_json_keeps_escaped_quotes() {
        let body = br#"{ "q": "say \"hi\" ", "k" : 1 }"#;
        assert_eq!(
            minify_json(body).as_deref(),
            Some(r#"{"q":"say \"hi\" ","k":1}"#)
        );
    }

    #[test]
    fn test_minify_invalid_json() {
        assert_eq!(minify_json(b"{not json"), None);
    }

    #[test]
    fn test_render_body_rules() {
        let config = Config::capturing().max_body_size(32);

        assert_eq!(render_body(b"abc", 3, "image/png", &config), "");
        assert_eq!(render_body(b"abc", 3, "", &config), "");
        assert_eq!(
            render_body(b"line1\nline2\r\n", 13, "text/plain", &config),
            "line1\\nline2\\r\\n"
        );
        assert_eq!(
            render_body(b"{ \"a\": 1 }", 10, "application/json", &config),
            r#"{"a":1}"#
        );
        assert_eq!(
            render_body(b"{broken\n", 8, "application/json", &config),
            "{broken\\n"
        );
        assert_eq!(
            render_body(&[b'x'; 33], 33, "text/plain", &config),
            DATA_TOO_LARGE
        );
        assert_eq!(render_body(b"x", 64, "text/plain", &config), DATA_TOO_LARGE);
    }

    #[test]
    fn test_header_value() {
        let headers = headers(&[("user-agent", "curl/8.0")]);
        assert_eq!(header_value(&headers, "user-agent"), "curl/8.0");
        assert_eq!(header_value(&headers, "referer"), "");
    }
}
