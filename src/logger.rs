//! Access log record and its single-line rendering
//!
//! One [`AccessLogRecord`] is built per HTTP transaction. Its `Display`
//! implementation is the wire format of the access log:
//!
//! ```text
//! time=2024-01-15T10:30:00.123Z log_type=access method=POST path="/login" status=200 duration=12 length=15 source_ip=10.0.0.1 user_agent="curl/8.0" referer="" trace_id=abc namespace=ns user_id=u1 client_id=c1 request_content_type="application/json" request_body=AB[{"user":"alice","password":"***"}]AB response_content_type="application/json" response_body=AB[{"ok":true}]AB operation="login"
//! ```

use std::fmt;

use crate::sink::LogSink;

/// Body value used when body capture is switched off
pub const NO_BODY: &str = "-";

/// Everything logged about one HTTP transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogRecord {
    /// UTC timestamp with millisecond precision
    pub time: String,
    pub method: String,
    /// Request URI (path and query) after query parameter masking
    pub path: String,
    pub status: u16,
    /// Time spent in the inner service, in milliseconds
    pub duration_ms: u64,
    /// Response body length in bytes
    pub length: u64,
    pub source_ip: String,
    pub user_agent: String,
    pub referer: String,
    pub trace_id: String,
    pub namespace: String,
    pub user_id: String,
    pub client_id: String,
    pub request_content_type: String,
    /// Captured request body, `-` when capture is off
    pub request_body: String,
    pub response_content_type: String,
    /// Captured response body, `-` when capture is off
    pub response_body: String,
    /// Name of the matched route, empty when nothing matched
    pub operation: String,
}

impl fmt::Display for AccessLogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time={} log_type=access method={} path=\"{}\" status={} duration={} length={} \
             source_ip={} user_agent=\"{}\" referer=\"{}\" trace_id={} namespace={} user_id={} \
             client_id={} request_content_type=\"{}\" request_body=AB[{}]AB \
             response_content_type=\"{}\" response_body=AB[{}]AB operation=\"{}\"",
            self.time,
            self.method,
            self.path,
            self.status,
            self.duration_ms,
            self.length,
            self.source_ip,
            self.user_agent,
            self.referer,
            self.trace_id,
            self.namespace,
            self.user_id,
            self.client_id,
            self.request_content_type,
            self.request_body,
            self.response_content_type,
            self.response_body,
            self.operation,
        )
    }
}

/// Render the record and hand it to the sink
///
/// Sink failures are reported through `tracing` and never reach the client.
pub fn forward_log(record: &AccessLogRecord, sink: &dyn LogSink) {
    if let Err(e) = sink.write_line(&record.to_string()) {
        tracing::warn!(error = %e, path = %record.path, "failed to write access log line");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessLogError;
    use crate::sink::MemorySink;

    fn create_test_record() -> AccessLogRecord {
        AccessLogRecord {
            time: "2024-01-15T10:30:00.123Z".to_string(),
            method: "POST".to_string(),
            path: "/v1/login?token=***".to_string(),
            status: 200,
            duration_ms: 42,
            length: 11,
            source_ip: "192.168.1.1".to_string(),
            user_agent: "curl/8.0".to_string(),
            referer: String::new(),
            trace_id: "trace-123".to_string(),
            namespace: "ns".to_string(),
            user_id: "u1".to_string(),
            client_id: "c1".to_string(),
            request_content_type: "application/json".to_string(),
            request_body: r#"{"user":"alice","password":"***"}"#.to_string(),
            response_content_type: "text/plain".to_string(),
            response_body: "hello world".to_string(),
            operation: "login".to_string(),
        }
    }

    #[test]
    fn test_record_display_format() {
        let line = create_test_record().to_string();
        assert_eq!(
            line,
            "time=2024-01-15T10:30:00.123Z log_type=access method=POST path=\"/v1/login?token=***\" \
             status=200 duration=42 length=11 source_ip=192.168.1.1 user_agent=\"curl/8.0\" \
             referer=\"\" trace_id=trace-123 namespace=ns user_id=u1 client_id=c1 \
             request_content_type=\"application/json\" \
             request_body=AB[{\"user\":\"alice\",\"password\":\"***\"}]AB \
             response_content_type=\"text/plain\" response_body=AB[hello world]AB \
             operation=\"login\""
        );
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_forward_log_writes_one_line() {
        let sink = MemorySink::new();
        forward_log(&create_test_record(), &sink);

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("time=2024-01-15T10:30:00.123Z log_type=access"));
    }

    struct FailingSink;

    impl LogSink for FailingSink {
        fn write_line(&self, _line: &str) -> Result<(), AccessLogError> {
            Err(AccessLogError::from_string("sink closed"))
        }
    }

    #[test]
    fn test_forward_log_with_failing_sink() {
        // Should not panic
        forward_log(&create_test_record(), &FailingSink);
    }
}
