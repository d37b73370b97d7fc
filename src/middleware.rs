//! Actix-Web middleware writing one access log line per request
//!
//! Per request: capture the request body (when enabled), call the inner
//! service, then wrap the response body in an [`InterceptedBody`]. Once the
//! response body has been streamed to the client, the record is assembled,
//! masked and written to the sink.

use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use actix_web::{
    body::MessageBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures::future::{ok, LocalBoxFuture, Ready};

use crate::attributes::{
    self, Identity, MaskedQueryParams, MaskedRequestFields, MaskedResponseFields,
};
use crate::config::{Config, MaskFailure};
use crate::content_type;
use crate::logger::{forward_log, AccessLogRecord, NO_BODY};
use crate::masking::{mask_query_params, try_mask_fields, MASKING_FAILED};
use crate::request_body_capture::capture_request_body;
use crate::response_body_capture::{CapturedResponse, InterceptedBody};
use crate::sink::{LogSink, StdoutSink};
use crate::utils::{current_timestamp, extract_ip, header_value, DATA_TOO_LARGE};

/// Access log middleware for Actix-Web
///
/// Add this middleware to your Actix app via `.wrap()`:
///
/// ```rust,no_run
/// use actix_web::{web, App, HttpResponse};
/// use accesslog_actix::{AccessLog, Config, StdoutSink};
///
/// let app = App::new()
///     .wrap(AccessLog::new(Config::capturing(), StdoutSink))
///     .route("/", web::get().to(|| async { HttpResponse::Ok().finish() }));
/// ```
pub struct AccessLog {
    config: Arc<Config>,
    sink: Arc<dyn LogSink>,
}

impl AccessLog {
    pub fn new(config: Config, sink: impl LogSink + 'static) -> Self {
        Self {
            config: Arc::new(config),
            sink: Arc::new(sink),
        }
    }

    /// Share one policy and sink between several app instances (one per worker)
    pub fn with_shared(config: Arc<Config>, sink: Arc<dyn LogSink>) -> Self {
        Self { config, sink }
    }

    /// Policy from `FULL_ACCESS_LOG_*` variables, lines to stdout
    pub fn from_env() -> Self {
        Self::new(Config::from_env(), StdoutSink)
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::from_env()
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessLog
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<InterceptedBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AccessLogService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AccessLogService {
            service: Rc::new(service),
            config: self.config.clone(),
            sink: self.sink.clone(),
        })
    }
}

/// The actual service that handles each request
pub struct AccessLogService<S> {
    service: Rc<S>,
    config: Arc<Config>,
    sink: Arc<dyn LogSink>,
}

impl<S, B> Service<ServiceRequest> for AccessLogService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<InterceptedBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let config = self.config.clone();
        let sink = self.sink.clone();

        Box::pin(async move {
            let start_time = Instant::now();
            let request = RequestInfo::from_request(&req);

            let request_body = if config.captures_request_body() {
                capture_request_body(&mut req, &request.content_type, &config).await
            } else {
                NO_BODY.to_string()
            };

            let res = service.call(req).await?;
            let duration_ms = start_time.elapsed().as_millis() as u64;

            let pending = PendingRecord::new(request, request_body, duration_ms, &res);

            let mirror_response = config.captures_response_body()
                && content_type::is_supported(
                    &pending.response_content_type,
                    &config.supported_content_types,
                );
            let max_capture = mirror_response.then_some(config.max_body_size);

            Ok(res.map_body(move |_, body| {
                InterceptedBody::new(body, max_capture, move |captured| {
                    let record = pending.complete(captured, &config);
                    forward_log(&record, sink.as_ref());
                })
            }))
        })
    }
}

/// Request fields read before the request is handed to the inner service
struct RequestInfo {
    method: String,
    uri: String,
    source_ip: String,
    user_agent: String,
    referer: String,
    content_type: String,
}

impl RequestInfo {
    fn from_request(req: &ServiceRequest) -> Self {
        let headers = req.headers();
        let uri = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());

        Self {
            method: req.method().to_string(),
            uri,
            source_ip: extract_ip(headers, req.peer_addr()),
            user_agent: header_value(headers, header::USER_AGENT.as_str()),
            referer: header_value(headers, header::REFERER.as_str()),
            content_type: header_value(headers, header::CONTENT_TYPE.as_str()),
        }
    }
}

/// Everything known once the inner service returned, waiting for the response body
struct PendingRecord {
    request: RequestInfo,
    request_body: String,
    duration_ms: u64,
    status: u16,
    response_content_type: String,
    identity: Identity,
    trace_id: String,
    operation: String,
    masked_query_params: Option<String>,
    masked_request_fields: Option<String>,
    masked_response_fields: Option<String>,
}

impl PendingRecord {
    fn new<B>(
        request: RequestInfo,
        request_body: String,
        duration_ms: u64,
        res: &ServiceResponse<B>,
    ) -> Self {
        let http_req = res.request();
        let ext = http_req.extensions();

        Self {
            request,
            request_body,
            duration_ms,
            status: res.status().as_u16(),
            response_content_type: header_value(res.headers(), header::CONTENT_TYPE.as_str()),
            identity: Identity::from_extensions(&ext),
            trace_id: attributes::trace_id(&ext),
            operation: http_req.match_name().unwrap_or_default().to_string(),
            masked_query_params: ext.get::<MaskedQueryParams>().map(|v| v.0.clone()),
            masked_request_fields: ext.get::<MaskedRequestFields>().map(|v| v.0.clone()),
            masked_response_fields: ext.get::<MaskedResponseFields>().map(|v| v.0.clone()),
        }
    }

    fn complete(self, captured: CapturedResponse, config: &Config) -> AccessLogRecord {
        let path = match &self.masked_query_params {
            Some(spec) => mask_query_params(&self.request.uri, spec),
            None => self.request.uri.clone(),
        };

        let request_body = if config.captures_request_body() {
            apply_masking(
                &self.request.content_type,
                self.request_body,
                self.masked_request_fields.as_deref(),
                config.mask_failure,
            )
        } else {
            self.request_body
        };

        let response_body = if config.captures_response_body() {
            apply_masking(
                &self.response_content_type,
                captured.body(&self.response_content_type, config),
                self.masked_response_fields.as_deref(),
                config.mask_failure,
            )
        } else {
            NO_BODY.to_string()
        };

        AccessLogRecord {
            time: current_timestamp(),
            method: self.request.method,
            path,
            status: self.status,
            duration_ms: self.duration_ms,
            length: captured.written as u64,
            source_ip: self.request.source_ip,
            user_agent: self.request.user_agent,
            referer: self.request.referer,
            trace_id: self.trace_id,
            namespace: self.identity.namespace,
            user_id: self.identity.user_id,
            client_id: self.identity.client_id,
            request_content_type: self.request.content_type,
            request_body,
            response_content_type: self.response_content_type,
            response_body,
            operation: self.operation,
        }
    }
}

/// Mask a captured body when a directive is present
///
/// Empty bodies and the size sentinel are left alone. Unparseable bodies
/// follow the configured [`MaskFailure`] policy.
fn apply_masking(
    content_type: &str,
    body: String,
    spec: Option<&str>,
    on_failure: MaskFailure,
) -> String {
    let Some(spec) = spec else {
        return body;
    };
    if body.is_empty() || body == DATA_TOO_LARGE {
        return body;
    }

    match try_mask_fields(content_type, &body, spec) {
        Ok(masked) => masked,
        Err(e) => match on_failure {
            MaskFailure::Open => {
                tracing::debug!(error = %e, content_type, "logging body unmasked");
                body
            }
            MaskFailure::Closed => {
                tracing::warn!(error = %e, content_type, "body suppressed, masking failed");
                MASKING_FAILED.to_string()
            }
        },
    }
}
