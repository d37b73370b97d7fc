//! Content-type policy for body capture and masking

/// Checks if a content type is eligible for body capture
///
/// A content type is eligible when it contains any of the supported entries,
/// so `application/json` also matches `application/json; charset=utf-8`.
/// An empty content type is never eligible.
pub fn is_supported<S: AsRef<str>>(content_type: &str, supported: &[S]) -> bool {
    if content_type.is_empty() {
        return false;
    }
    let content_type = content_type.to_ascii_lowercase();
    supported.iter().any(|entry| {
        let entry = entry.as_ref();
        !entry.is_empty() && content_type.contains(&entry.to_ascii_lowercase())
    })
}

pub fn is_json(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains("application/json")
}

pub fn is_form(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains("application/x-www-form-urlencoded")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SUPPORTED_CONTENT_TYPES;

    #[test]
    fn test_supported_json_with_charset() {
        assert!(is_supported(
            "application/json; charset=utf-8",
            DEFAULT_SUPPORTED_CONTENT_TYPES
        ));
    }

    #[test]
    fn test_supported_form_and_text() {
        assert!(is_supported(
            "application/x-www-form-urlencoded",
            DEFAULT_SUPPORTED_CONTENT_TYPES
        ));
        assert!(is_supported("text/html", DEFAULT_SUPPORTED_CONTENT_TYPES));
        assert!(is_supported("Text/Plain", DEFAULT_SUPPORTED_CONTENT_TYPES));
    }

    #[test]
    fn test_skip_binary() {
        assert!(!is_supported("image/png", DEFAULT_SUPPORTED_CONTENT_TYPES));
        assert!(!is_supported(
            "application/octet-stream",
            DEFAULT_SUPPORTED_CONTENT_TYPES
        ));
        assert!(!is_supported(
            "multipart/form-data; boundary=x",
            DEFAULT_SUPPORTED_CONTENT_TYPES
        ));
    }

    #[test]
    fn test_skip_missing_content_type() {
        assert!(!is_supported("", DEFAULT_SUPPORTED_CONTENT_TYPES));
    }

    #[test]
    fn test_empty_entry_never_matches() {
        assert!(!is_supported("image/png", &["", "text/plain"]));
    }

    #[test]
    fn test_json_and_form_detection() {
        assert!(is_json("application/json;charset=UTF-8"));
        assert!(!is_json("application/xml"));
        assert!(is_form("application/x-www-form-urlencoded; charset=utf-8"));
        assert!(!is_form("multipart/form-data"));
    }
}
