//! Field and query parameter masking
//!
//! Masking directives are comma-separated lists of names. JSON bodies accept
//! dotted paths (`user.password`); form bodies and query strings match
//! parameter names exactly. Every matched value is replaced by [`MASK`].

use std::collections::HashSet;

use serde_json::Value;
use url::form_urlencoded;

use crate::content_type;
use crate::error::AccessLogError;

/// Replacement for every masked value
pub const MASK: &str = "***";

/// Logged in place of a body that had a masking directive but could not be parsed,
/// when the policy is [`MaskFailure::Closed`](crate::config::MaskFailure::Closed)
pub const MASKING_FAILED: &str = "masking failed";

/// Mask the listed fields of a JSON or form-encoded body
///
/// Best effort: a body that cannot be parsed is returned unchanged, and
/// content types other than JSON and form are never touched.
pub fn mask_fields(content_type: &str, body: &str, field_spec: &str) -> String {
    match try_mask_fields(content_type, body, field_spec) {
        Ok(masked) => masked,
        Err(err) => {
            tracing::debug!(error = %err, content_type, "body left unmasked");
            body.to_string()
        }
    }
}

/// Same as [`mask_fields`], but reports bodies that could not be parsed
pub fn try_mask_fields(
    content_type: &str,
    body: &str,
    field_spec: &str,
) -> Result<String, AccessLogError> {
    let fields = parse_spec(field_spec);
    if fields.is_empty() {
        return Ok(body.to_string());
    }

    if content_type::is_json(content_type) {
        mask_json(body, &fields)
    } else if content_type::is_form(content_type) {
        Ok(mask_pairs(body, &fields))
    } else {
        Ok(body.to_string())
    }
}

/// Mask the values of the listed query parameters in a request URI
///
/// Path, parameter order and the encoding of untouched parameters are kept.
pub fn mask_query_params(uri: &str, param_spec: &str) -> String {
    let params = parse_spec(param_spec);
    if params.is_empty() {
        return uri.to_string();
    }

    let Some((path, rest)) = uri.split_once('?') else {
        return uri.to_string();
    };
    let (query, fragment) = match rest.split_once('#') {
        Some((query, fragment)) => (query, Some(fragment)),
        None => (rest, None),
    };

    let mut masked = format!("{}?{}", path, mask_pairs(query, &params));
    if let Some(fragment) = fragment {
        masked.push('#');
        masked.push_str(fragment);
    }
    masked
}

fn parse_spec(spec: &str) -> Vec<&str> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn mask_json(body: &str, fields: &[&str]) -> Result<String, AccessLogError> {
    let mut value: Value = serde_json::from_str(body)?;
    for field in fields {
        let path: Vec<&str> = field.split('.').collect();
        mask_path(&mut value, &path);
    }
    Ok(serde_json::to_string(&value)?)
}

fn mask_path(value: &mut Value, path: &[&str]) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };

    match value {
        Value::Object(map) => {
            if let Some(child) = map.get_mut(*head) {
                if rest.is_empty() {
                    *child = Value::String(MASK.to_string());
                } else {
                    mask_path(child, rest);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                mask_path(item, path);
            }
        }
        _ => {}
    }
}

/// Mask `key=value` pairs separated by `&`, comparing decoded keys
fn mask_pairs(encoded: &str, names: &[&str]) -> String {
    let names: HashSet<&str> = names.iter().copied().collect();

    encoded
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if names.contains(decode_component(key).as_str()) => {
                format!("{}={}", key, MASK)
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn decode_component(raw: &str) -> String {
    form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}
