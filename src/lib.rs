//! # accesslog-actix
//!
//! Access log middleware for Actix-Web applications.
//!
//! Every HTTP transaction produces exactly one line in a fixed
//! `key=value` format, written to a pluggable [`LogSink`]. When body capture
//! is enabled, request and response bodies are included, with sensitive
//! fields masked per request.
//!
//! - **Non-intrusive**: the handler reads the same request body and the
//!   client receives the same response bytes as without the middleware
//! - **Fail-safe**: read, masking and sink errors degrade the log line,
//!   never the response
//! - **Bounded**: bodies over the size limit are logged as `data too large`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use actix_web::{web, App, HttpResponse, HttpServer};
//! use accesslog_actix::{AccessLog, Config, StdoutSink};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = Config::from_env().into_arc();
//!
//!     HttpServer::new(move || {
//!         App::new()
//!             .wrap(AccessLog::with_shared(config.clone(), std::sync::Arc::new(StdoutSink)))
//!             .service(web::resource("/").to(|| async {
//!                 HttpResponse::Ok().body("Hello!")
//!             }))
//!     })
//!     .bind("0.0.0.0:8080")?
//!     .run()
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! [`Config::from_env`] reads:
//!
//! - `FULL_ACCESS_LOG_ENABLED`: master switch for body capture (default `false`)
//! - `FULL_ACCESS_LOG_SUPPORTED_CONTENT_TYPES`: comma-separated eligible content types
//! - `FULL_ACCESS_LOG_MAX_BODY_SIZE`: size cutoff in bytes (default `10240`)
//! - `FULL_ACCESS_LOG_REQUEST_BODY_ENABLED` / `FULL_ACCESS_LOG_RESPONSE_BODY_ENABLED`
//! - `FULL_ACCESS_LOG_MASK_FAILURE`: `open` (default) or `closed`
//!
//! ## Request attributes
//!
//! Inner middleware and handlers pass per-request data through request
//! extensions, see [`attributes`]: namespace, user id, client id, trace id,
//! token claims, and the masking directives for query parameters, request
//! fields and response fields.
//!
//! ## Architecture
//!
//! - `middleware`: Actix-Web middleware orchestrating one transaction
//! - `request_body_capture` / `response_body_capture`: non-destructive body capture
//! - `masking`: JSON / form field masking and query parameter masking
//! - `logger`: the log record and its line format
//! - `sink`: line destinations
//! - `config`: capture policy
//! - `content_type`: content-type eligibility
//! - `attributes`: request-scoped inputs
//! - `error`: error types
//! - `utils`: timestamps, client IP, body rendering

pub mod attributes;
pub mod config;
pub mod content_type;
pub mod error;
pub mod logger;
pub mod masking;
pub mod middleware;
pub mod request_body_capture;
pub mod response_body_capture;
pub mod sink;
pub mod utils;

// Re-export main components for easy access
pub use config::{Config, MaskFailure};
pub use error::AccessLogError;
pub use logger::AccessLogRecord;
pub use masking::{mask_fields, mask_query_params};
pub use middleware::AccessLog;
pub use sink::{LogSink, MemorySink, StdoutSink, TracingSink, WriterSink};

/// Convenience prelude for importing common types
pub mod prelude {
    pub use crate::attributes::{
        ClientId, MaskedQueryParams, MaskedRequestFields, MaskedResponseFields, Namespace,
        TokenClaims, TraceId, UserId,
    };
    pub use crate::config::Config;
    pub use crate::error::AccessLogError;
    pub use crate::middleware::AccessLog;
    pub use crate::sink::{LogSink, StdoutSink};
}
