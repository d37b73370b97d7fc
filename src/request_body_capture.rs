//! Request body capture
//!
//! Reads the whole payload for logging and puts an identical payload back on
//! the request, so the handler still sees the unconsumed body.

use actix_web::{
    dev::{Payload, ServiceRequest},
    error::PayloadError,
    web::{Bytes, BytesMut},
    HttpMessage,
};
use futures::{stream, StreamExt};

use crate::config::Config;
use crate::content_type;
use crate::error::AccessLogError;
use crate::utils::render_body;

/// Captures the request body if its content type is eligible
///
/// Returns an empty string for empty or ineligible content types (the
/// payload is left untouched) and on read errors. Bodies over the size limit
/// come back as "data too large".
pub async fn capture_request_body(
    req: &mut ServiceRequest,
    content_type: &str,
    config: &Config,
) -> String {
    if !content_type::is_supported(content_type, &config.supported_content_types) {
        return String::new();
    }

    let (bytes, read_result) = read_and_restore(req).await;

    if let Err(e) = read_result {
        tracing::error!(error = %e, path = %req.path(), "request body capture skipped");
        return String::new();
    }

    render_body(&bytes, bytes.len(), content_type, config)
}

/// Drains the payload and puts an equivalent one back on the request
///
/// When the stream fails midway, the handler gets the bytes read so far
/// followed by the same error.
async fn read_and_restore(req: &mut ServiceRequest) -> (Bytes, Result<(), AccessLogError>) {
    let mut payload = req.take_payload();
    let mut buffer = BytesMut::new();
    let mut failure = None;

    while let Some(chunk) = payload.next().await {
        match chunk {
            Ok(chunk) => buffer.extend_from_slice(&chunk),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let bytes = buffer.freeze();

    match failure {
        None => {
            req.set_payload(Payload::from(bytes.clone()));
            (bytes, Ok(()))
        }
        Some(e) => {
            let err = AccessLogError::BodyRead(e.to_string());
            req.set_payload(replay_then_fail(bytes.clone(), e));
            (bytes, Err(err))
        }
    }
}

fn replay_then_fail(bytes: Bytes, error: PayloadError) -> Payload {
    let mut items = Vec::with_capacity(2);
    if !bytes.is_empty() {
        items.push(Ok(bytes));
    }
    items.push(Err(error));

    Payload::Stream {
        payload: Box::pin(stream::iter(items)),
    }
}
