//! Capture policy for the access log filter
//!
//! The policy is built once at startup, either from code or from the
//! `FULL_ACCESS_LOG_*` environment variables, and then shared read-only
//! with every request through an `Arc`. Invalid environment values are
//! reported through `tracing` and the default is kept.

use std::sync::Arc;

use crate::error::AccessLogError;

/// Default body size cutoff (10KB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 << 10;

/// Content types eligible for body capture unless overridden
pub const DEFAULT_SUPPORTED_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/x-www-form-urlencoded",
    "text/plain",
    "text/html",
];

pub const ENV_ENABLED: &str = "FULL_ACCESS_LOG_ENABLED";
pub const ENV_SUPPORTED_CONTENT_TYPES: &str = "FULL_ACCESS_LOG_SUPPORTED_CONTENT_TYPES";
pub const ENV_MAX_BODY_SIZE: &str = "FULL_ACCESS_LOG_MAX_BODY_SIZE";
pub const ENV_REQUEST_BODY_ENABLED: &str = "FULL_ACCESS_LOG_REQUEST_BODY_ENABLED";
pub const ENV_RESPONSE_BODY_ENABLED: &str = "FULL_ACCESS_LOG_RESPONSE_BODY_ENABLED";
pub const ENV_MASK_FAILURE: &str = "FULL_ACCESS_LOG_MASK_FAILURE";

/// What to log when a body has a masking directive but cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskFailure {
    /// Log the body as captured, unmasked
    #[default]
    Open,
    /// Replace the body with a fixed marker
    Closed,
}

impl std::str::FromStr for MaskFailure {
    type Err = AccessLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(MaskFailure::Open),
            "closed" => Ok(MaskFailure::Closed),
            _ => Err(AccessLogError::invalid_config(ENV_MASK_FAILURE, s)),
        }
    }
}

/// Capture policy shared by all requests
///
/// Loaded from environment variables by [`Config::from_env`]:
/// - `FULL_ACCESS_LOG_ENABLED`: master switch for body capture (default false)
/// - `FULL_ACCESS_LOG_SUPPORTED_CONTENT_TYPES`: comma-separated eligible content types
/// - `FULL_ACCESS_LOG_MAX_BODY_SIZE`: size cutoff in bytes (default 10240)
/// - `FULL_ACCESS_LOG_REQUEST_BODY_ENABLED`: request body sub-switch (default true)
/// - `FULL_ACCESS_LOG_RESPONSE_BODY_ENABLED`: response body sub-switch (default true)
/// - `FULL_ACCESS_LOG_MASK_FAILURE`: `open` or `closed` (default open)
#[derive(Debug, Clone)]
pub struct Config {
    /// Master switch for any body capture
    pub enabled: bool,

    /// Substrings a content type must contain to be captured
    pub supported_content_types: Vec<String>,

    /// Bodies longer than this are logged as "data too large"
    pub max_body_size: usize,

    /// Capture request bodies (only meaningful when `enabled`)
    pub request_body_enabled: bool,

    /// Capture response bodies (only meaningful when `enabled`)
    pub response_body_enabled: bool,

    /// Behavior for bodies that cannot be parsed for masking
    pub mask_failure: MaskFailure,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: false,
            supported_content_types: DEFAULT_SUPPORTED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            request_body_enabled: true,
            response_body_enabled: true,
            mask_failure: MaskFailure::Open,
        }
    }
}

impl Config {
    /// Default policy with body capture switched on
    ///
    /// [`Config::default`] leaves capture off, matching an unset
    /// `FULL_ACCESS_LOG_ENABLED`.
    pub fn capturing() -> Self {
        Self::default().enabled(true)
    }

    /// Load the policy from the process environment
    ///
    /// Never fails: every unparseable value is logged and replaced by its default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the policy from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_ENABLED) {
            config.enabled = parse_or_default(ENV_ENABLED, &value, parse_bool, config.enabled);
        }

        if let Some(value) = lookup(ENV_SUPPORTED_CONTENT_TYPES) {
            let types = split_list(&value);
            if types.is_empty() {
                tracing::warn!(
                    key = ENV_SUPPORTED_CONTENT_TYPES,
                    "no content types listed, keeping defaults"
                );
            } else {
                config.supported_content_types = types;
            }
        }

        if let Some(value) = lookup(ENV_MAX_BODY_SIZE) {
            config.max_body_size =
                parse_or_default(ENV_MAX_BODY_SIZE, &value, parse_size, config.max_body_size);
        }

        if let Some(value) = lookup(ENV_REQUEST_BODY_ENABLED) {
            config.request_body_enabled = parse_or_default(
                ENV_REQUEST_BODY_ENABLED,
                &value,
                parse_bool,
                config.request_body_enabled,
            );
        }

        if let Some(value) = lookup(ENV_RESPONSE_BODY_ENABLED) {
            config.response_body_enabled = parse_or_default(
                ENV_RESPONSE_BODY_ENABLED,
                &value,
                parse_bool,
                config.response_body_enabled,
            );
        }

        if let Some(value) = lookup(ENV_MASK_FAILURE) {
            config.mask_failure =
                parse_or_default(ENV_MASK_FAILURE, &value, |v| v.parse().ok(), config.mask_failure);
        }

        tracing::debug!(
            enabled = config.enabled,
            max_body_size = config.max_body_size,
            request_body = config.request_body_enabled,
            response_body = config.response_body_enabled,
            "access log policy loaded"
        );

        config
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replace the supported content types; an empty list keeps the current set
    pub fn supported_content_types(
        mut self,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let types: Vec<String> = types
            .into_iter()
            .map(Into::into)
            .filter(|t| !t.trim().is_empty())
            .collect();
        if !types.is_empty() {
            self.supported_content_types = types;
        }
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    pub fn request_body_enabled(mut self, enabled: bool) -> Self {
        self.request_body_enabled = enabled;
        self
    }

    pub fn response_body_enabled(mut self, enabled: bool) -> Self {
        self.response_body_enabled = enabled;
        self
    }

    pub fn mask_failure(mut self, policy: MaskFailure) -> Self {
        self.mask_failure = policy;
        self
    }

    /// Whether request bodies are captured at all
    pub fn captures_request_body(&self) -> bool {
        self.enabled && self.request_body_enabled
    }

    /// Whether response bodies are captured at all
    pub fn captures_response_body(&self) -> bool {
        self.enabled && self.response_body_enabled
    }

    /// Wrap config in Arc for sharing across workers
    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

fn parse_or_default<T, F>(key: &str, value: &str, parse: F, default: T) -> T
where
    F: Fn(&str) -> Option<T>,
{
    match parse(value) {
        Some(parsed) => parsed,
        None => {
            let err = AccessLogError::invalid_config(key, value);
            tracing::error!(error = %err, "keeping default");
            default
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accepts the same spellings as Go's `strconv.ParseBool`
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Non-negative integer with optional `0x`, `0o`, `0b` or leading-zero octal prefix
fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    let value = value.strip_prefix('+').unwrap_or(value).replace('_', "");
    let lower = value.to_ascii_lowercase();

    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest.to_string(), 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest.to_string(), 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest.to_string(), 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (lower[1..].to_string(), 8)
    } else {
        (lower, 10)
    };

    if digits.is_empty() {
        return None;
    }
    usize::from_str_radix(&digits, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert!(!config.enabled);
        assert_eq!(config.max_body_size, 10240);
        assert!(config.request_body_enabled);
        assert!(config.response_body_enabled);
        assert_eq!(config.mask_failure, MaskFailure::Open);
        assert_eq!(config.supported_content_types.len(), 5);
        assert!(config
            .supported_content_types
            .contains(&"application/x-www-form-urlencoded".to_string()));
    }

    #[test]
    fn test_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_ENABLED, "true"),
            (ENV_SUPPORTED_CONTENT_TYPES, "application/json, text/csv"),
            (ENV_MAX_BODY_SIZE, "2048"),
            (ENV_REQUEST_BODY_ENABLED, "0"),
            (ENV_RESPONSE_BODY_ENABLED, "T"),
            (ENV_MASK_FAILURE, "closed"),
        ]));

        assert!(config.enabled);
        assert_eq!(
            config.supported_content_types,
            vec!["application/json".to_string(), "text/csv".to_string()]
        );
        assert_eq!(config.max_body_size, 2048);
        assert!(!config.request_body_enabled);
        assert!(config.response_body_enabled);
        assert_eq!(config.mask_failure, MaskFailure::Closed);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_ENABLED, "yes please"),
            (ENV_MAX_BODY_SIZE, "-5"),
            (ENV_REQUEST_BODY_ENABLED, "nope"),
            (ENV_MASK_FAILURE, "sometimes"),
        ]));

        assert!(!config.enabled);
        assert_eq!(config.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert!(config.request_body_enabled);
        assert_eq!(config.mask_failure, MaskFailure::Open);
    }

    #[test]
    fn test_empty_content_types_keep_defaults() {
        let config = Config::from_lookup(lookup_from(&[(ENV_SUPPORTED_CONTENT_TYPES, " , ,")]));
        assert_eq!(config.supported_content_types.len(), 5);

        let config = Config::capturing().supported_content_types(Vec::<String>::new());
        assert_eq!(config.supported_content_types.len(), 5);
    }

    #[test]
    fn test_parse_size_prefixes() {
        assert_eq!(parse_size("10240"), Some(10240));
        assert_eq!(parse_size("0x2800"), Some(10240));
        assert_eq!(parse_size("0o17"), Some(15));
        assert_eq!(parse_size("017"), Some(15));
        assert_eq!(parse_size("0b101"), Some(5));
        assert_eq!(parse_size("0"), Some(0));
        assert_eq!(parse_size("10_240"), Some(10240));
        assert_eq!(parse_size("0x"), None);
        assert_eq!(parse_size("ten"), None);
    }

    #[test]
    fn test_parse_bool_spellings() {
        for v in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn test_capture_switches() {
        let config = Config::default().request_body_enabled(true);
        assert!(!config.captures_request_body());

        let config = Config::capturing().response_body_enabled(false);
        assert!(config.captures_request_body());
        assert!(!config.captures_response_body());
    }

    #[test]
    fn test_capturing_differs_from_default_only_in_switch() {
        let capturing = Config::capturing();
        let default = Config::default();

        assert!(capturing.enabled);
        assert!(!default.enabled);
        assert_eq!(capturing.max_body_size, default.max_body_size);
        assert_eq!(capturing.supported_content_types, default.supported_content_types);
        assert_eq!(capturing.mask_failure, default.mask_failure);
    }

    #[test]
    fn test_config_into_arc() {
        let arc_config = Config::capturing().max_body_size(16).into_arc();
        assert!(arc_config.enabled);
        assert_eq!(arc_config.max_body_size, 16);
    }
}
