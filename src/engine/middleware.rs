//! Constraint middleware wrapped around every route.
//!
//! # Responsibilities
//! - Reject requests whose declared length exceeds the body ceiling
//! - Bound the request body that reaches handlers
//! - Start the request clock and install the [`RequestContext`]
//! - Answer 503 when a handler does not produce a response before the deadline
//! - Keep the deadline running while the response body streams
//!
//! # Design Decisions
//! - The cancellation guard moves into the response body, so a client hang-up
//!   (hyper dropping the body) cancels any work the body stream is doing
//! - Only handlers with variable-length output opt into the response byte ceiling,
//!   via the [`BoundedOutput`] marker

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    BoxError,
};
use hyper::body::{Body as HttpBody, Frame, SizeHint};
use tokio::time::Sleep;

use crate::engine::context::{CancelGuard, RequestContext};
use crate::engine::error::EngineError;
use crate::engine::limits::BoundedBody;
use crate::engine::settings::Settings;

/// Response extension asking the middleware to apply the body ceiling to the output.
#[derive(Debug, Clone, Copy)]
pub struct BoundedOutput;

/// Mark a response as variable-length output subject to the body ceiling.
pub fn bounded_output(response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    response.extensions_mut().insert(BoundedOutput);
    response
}

/// Raised by [`ConstrainedBody`] when the deadline interrupts a streaming response.
#[derive(Debug, thiserror::Error)]
#[error("response truncated at the duration ceiling")]
pub struct StreamDeadline;

pub async fn enforce_constraints(
    State(settings): State<Arc<Settings>>,
    mut req: Request,
    next: Next,
) -> Response {
    let limit = settings.max_body_size;

    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if let Some(declared) = declared.filter(|len| *len > limit) {
        tracing::warn!(
            declared,
            limit,
            path = %req.uri().path(),
            "Rejecting oversized request body"
        );
        return EngineError::BodyTooLarge { limit }.into_response();
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (ctx, guard) = RequestContext::new(settings.clone(), peer);

    let deadline = ctx.deadline();
    let watch = ctx.clone();
    req.extensions_mut().insert(ctx);
    let req = req.map(|body| Body::new(BoundedBody::new(body, limit)));

    let mut response = tokio::select! {
        biased;
        response = next.run(req) => response,
        () = watch.cancelled() => {
            tracing::warn!(
                elapsed_ms = watch.elapsed().as_millis() as u64,
                "Handler did not respond before the deadline"
            );
            return EngineError::DeadlineExceeded.into_response();
        }
    };

    let bounded = response.extensions_mut().remove::<BoundedOutput>().is_some();
    response.map(|body| {
        let body = if bounded {
            Body::new(BoundedBody::new(body, limit))
        } else {
            body
        };
        Body::new(ConstrainedBody::new(body, deadline, guard))
    })
}

/// Response body that fails once the request deadline passes and owns the
/// request's cancellation guard.
pub struct ConstrainedBody {
    inner: Body,
    deadline: Pin<Box<Sleep>>,
    guard: CancelGuard,
    expired: bool,
}

impl ConstrainedBody {
    pub fn new(inner: Body, deadline: tokio::time::Instant, guard: CancelGuard) -> Self {
        Self {
            inner,
            deadline: Box::pin(tokio::time::sleep_until(deadline)),
            guard,
            expired: false,
        }
    }
}

impl HttpBody for ConstrainedBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.expired {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(frame) => Poll::Ready(frame.map(|f| f.map_err(Into::into))),
            Poll::Pending => {
                if this.deadline.as_mut().poll(cx).is_ready() {
                    this.expired = true;
                    this.guard.cancel();
                    tracing::warn!("Response stream truncated at the deadline");
                    return Poll::Ready(Some(Err(Box::new(StreamDeadline))));
                }
                Poll::Pending
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.expired || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::{
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use futures_util::stream;
    use std::time::Duration;
    use tower::ServiceExt;

    fn settings(max_duration: Duration, max_body_size: u64) -> Arc<Settings> {
        let mut config = ServerConfig::default();
        config.limits.max_duration = max_duration;
        config.limits.max_body_size = max_body_size;
        Arc::new(Settings::from_config(&config))
    }

    fn app(settings: Arc<Settings>) -> Router {
        Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    "late"
                }),
            )
            .route(
                "/echo",
                axum::routing::post(|body: Bytes| async move { bounded_output(body) }),
            )
            .route(
                "/trickle",
                get(|| async {
                    // Never ends on its own; only the deadline stops it.
                    let chunks = stream::unfold(0u32, |i| async move {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Some((Ok::<_, std::io::Error>(Bytes::from(format!("{i}"))), i + 1))
                    });
                    Body::from_stream(chunks)
                }),
            )
            .layer(middleware::from_fn_with_state(settings, enforce_constraints))
    }

    #[tokio::test]
    async fn declared_oversize_is_rejected_up_front() {
        let response = app(settings(Duration::from_secs(5), 4))
            .oneshot(
                Request::post("/echo")
                    .header(header::CONTENT_LENGTH, "5")
                    .body(Body::from("12345"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn slow_handler_gets_a_timeout_response() {
        let started = std::time::Instant::now();
        let response = app(settings(Duration::from_millis(200), 1024))
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn endless_stream_is_cut_at_the_deadline() {
        let started = std::time::Instant::now();
        let response = app(settings(Duration::from_millis(350), 1024))
            .oneshot(Request::get("/trickle").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let result = axum::body::to_bytes(response.into_body(), usize::MAX).await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn small_body_passes_through() {
        let response = app(settings(Duration::from_secs(5), 16))
            .oneshot(Request::post("/echo").body(Body::from("hello")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"hello");
    }
}
