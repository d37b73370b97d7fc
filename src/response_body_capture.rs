//! Response body capture
//!
//! [`InterceptedBody`] decorates the handler's response body. It is itself a
//! `MessageBody`, forwards every chunk to the client unchanged and in order,
//! and mirrors the bytes into a side buffer. Status and headers live in the
//! response head and are never touched.
//!
//! When the body stream ends, or the body is dropped before it ends (HEAD
//! responses, client disconnects), the captured bytes are handed to a
//! completion callback exactly once.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use actix_web::{
    body::{BodySize, MessageBody},
    web::{Bytes, BytesMut},
};
use pin_project_lite::pin_project;

use crate::config::Config;
use crate::utils::render_body;

/// Bytes seen by an [`InterceptedBody`] once the response is complete
#[derive(Debug, Clone, Default)]
pub struct CapturedResponse {
    /// Mirrored bytes, at most `max_body_size + 1` of them
    pub bytes: Bytes,
    /// Total number of bytes forwarded to the client
    pub written: usize,
}

impl CapturedResponse {
    /// Render the captured body under the capture policy
    ///
    /// Same rules as the request side: eligibility, size limit, JSON
    /// minification, newline escaping.
    pub fn body(&self, content_type: &str, config: &Config) -> String {
        render_body(&self.bytes, self.written, content_type, config)
    }
}

type OnFinish = Box<dyn FnOnce(CapturedResponse)>;

/// Per-response capture state
struct Interceptor {
    buffer: BytesMut,
    written: usize,
    /// Mirror at most this many bytes; `None` only counts
    capture_limit: Option<usize>,
    on_finish: OnFinish,
}

impl Interceptor {
    fn mirror(&mut self, chunk: &[u8]) {
        self.written += chunk.len();

        if let Some(limit) = self.capture_limit {
            let room = limit.saturating_sub(self.buffer.len());
            let take = chunk.len().min(room);
            self.buffer.extend_from_slice(&chunk[..take]);
        }
    }

    fn finish(self) {
        let captured = CapturedResponse {
            bytes: self.buffer.freeze(),
            written: self.written,
        };
        (self.on_finish)(captured);
    }
}

pin_project! {
    /// Forwarding body decorator that mirrors every chunk into a side buffer
    pub struct InterceptedBody<B> {
        #[pin]
        body: B,
        state: Option<Interceptor>,
    }

    impl<B> PinnedDrop for InterceptedBody<B> {
        fn drop(this: Pin<&mut Self>) {
            if let Some(state) = this.project().state.take() {
                state.finish();
            }
        }
    }
}

impl<B> InterceptedBody<B> {
    /// Wrap `body`, mirroring up to `max_capture` bytes when set
    ///
    /// Only the first `max_capture + 1` bytes are kept, which is enough to
    /// tell a body at the size limit from one over it. `on_finish` runs once
    /// with the captured bytes.
    pub fn new<F>(body: B, max_capture: Option<usize>, on_finish: F) -> Self
    where
        F: FnOnce(CapturedResponse) + 'static,
    {
        Self {
            body,
            state: Some(Interceptor {
                buffer: BytesMut::new(),
                written: 0,
                capture_limit: max_capture.map(|max| max.saturating_add(1)),
                on_finish: Box::new(on_finish),
            }),
        }
    }
}

impl<B> MessageBody for InterceptedBody<B>
where
    B: MessageBody,
{
    type Error = B::Error;

    fn size(&self) -> BodySize {
        self.body.size()
    }

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        let this = self.project();

        match ready!(this.body.poll_next(cx)) {
            Some(Ok(chunk)) => {
                if let Some(state) = this.state.as_mut() {
                    state.mirror(&chunk);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                if let Some(state) = this.state.take() {
                    state.finish();
                }
                Poll::Ready(Some(Err(e)))
            }
            None => {
                if let Some(state) = this.state.take() {
                    state.finish();
                }
                Poll::Ready(None)
            }
        }
    }
}
