//! Request-scoped attributes read by the access log
//!
//! Filters running inside the access log store these values in the request
//! extensions. Masking directives are read only after the inner service
//! returns, so they may be set by the handler's own filters.
//!
//! ```rust
//! use actix_web::{dev::ServiceRequest, HttpMessage};
//! use accesslog_actix::attributes::{MaskedRequestFields, TraceId};
//!
//! fn tag(req: &ServiceRequest) {
//!     req.extensions_mut().insert(TraceId::from("4bf92f3577b34da6"));
//!     req.extensions_mut().insert(MaskedRequestFields::from("password,card.number"));
//! }
//! ```

use actix_web::dev::Extensions;
use serde::{Deserialize, Serialize};

trait StringAttribute {
    fn value(&self) -> &str;
}

macro_rules! string_attribute {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Default)]
        pub struct $name(pub String);

        impl StringAttribute for $name {
            fn value(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_attribute!(
    /// Namespace the request was made in
    Namespace
);
string_attribute!(
    /// Authenticated user id
    UserId
);
string_attribute!(
    /// OAuth client id
    ClientId
);
string_attribute!(
    /// Trace correlation id
    TraceId
);
string_attribute!(
    /// Comma-separated query parameter names whose values are masked in the logged path
    MaskedQueryParams
);
string_attribute!(
    /// Comma-separated request body fields (dotted paths for JSON) to mask
    MaskedRequestFields
);
string_attribute!(
    /// Comma-separated response body fields (dotted paths for JSON) to mask
    MaskedResponseFields
);

/// Claims of the request's access token, stored by the authentication filter
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub namespace: String,
    /// Subject (user id)
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub client_id: String,
}

/// Namespace, user id and client id logged for a request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    pub namespace: String,
    pub user_id: String,
    pub client_id: String,
}

impl Identity {
    /// Resolve the identity from request extensions
    ///
    /// Explicit attributes win; each empty one falls back to the token claims.
    pub fn from_extensions(ext: &Extensions) -> Self {
        let mut identity = Self {
            namespace: string_of::<Namespace>(ext),
            user_id: string_of::<UserId>(ext),
            client_id: string_of::<ClientId>(ext),
        };

        if let Some(claims) = ext.get::<TokenClaims>() {
            if identity.namespace.is_empty() {
                identity.namespace = claims.namespace.clone();
            }
            if identity.user_id.is_empty() {
                identity.user_id = claims.sub.clone();
            }
            if identity.client_id.is_empty() {
                identity.client_id = claims.client_id.clone();
            }
        }

        identity
    }
}

/// Trace id of the request, empty when absent
pub fn trace_id(ext: &Extensions) -> String {
    string_of::<TraceId>(ext)
}

fn string_of<T: StringAttribute + 'static>(ext: &Extensions) -> String {
    ext.get::<T>().map(|v| v.value().to_string()).unwrap_or_default()
}
