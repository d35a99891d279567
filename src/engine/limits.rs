//! Body size ceiling.
//!
//! # Responsibilities
//! - Count bytes flowing through a request or response body
//! - Stop the body with a distinguished error once the ceiling is crossed
//!
//! # Design Decisions
//! - One wrapper for both directions; the caller decides where it sits
//! - A frame that would cross the ceiling is never delivered (no silent truncation)
//! - Trailers and other non-data frames pass through uncounted

use std::error::Error as StdError;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{body::Bytes, BoxError};
use hyper::body::{Body as HttpBody, Frame, SizeHint};
use thiserror::Error;

/// Raised when more than `limit` bytes pass through a [`BoundedBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("body exceeds the {limit} byte ceiling")]
pub struct BodyTooLarge {
    pub limit: u64,
}

/// Cumulative byte counter against a fixed ceiling.
#[derive(Debug, Clone, Copy)]
pub struct ByteBudget {
    limit: u64,
    used: u64,
}

impl ByteBudget {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Account for `len` more bytes. On failure the budget is left unchanged.
    pub fn consume(&mut self, len: usize) -> Result<(), BodyTooLarge> {
        let len = len as u64;
        if len > self.remaining() {
            return Err(BodyTooLarge { limit: self.limit });
        }
        self.used += len;
        Ok(())
    }
}

/// Body wrapper enforcing a [`ByteBudget`] over its whole lifetime.
pub struct BoundedBody<B> {
    inner: B,
    budget: ByteBudget,
    tripped: bool,
}

impl<B> BoundedBody<B> {
    pub fn new(inner: B, limit: u64) -> Self {
        Self {
            inner,
            budget: ByteBudget::new(limit),
            tripped: false,
        }
    }

    pub fn bytes_seen(&self) -> u64 {
        self.budget.used()
    }
}

impl<B> HttpBody for BoundedBody<B>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.tripped {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    if let Err(err) = this.budget.consume(data.len()) {
                        this.tripped = true;
                        tracing::warn!(
                            limit = err.limit,
                            seen = this.budget.used(),
                            frame = data.len(),
                            "Body ceiling exceeded"
                        );
                        return Poll::Ready(Some(Err(Box::new(err))));
                    }
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err.into()))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.tripped || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Walk an error's source chain looking for a [`BodyTooLarge`].
pub fn find_body_too_large(err: &(dyn StdError + 'static)) -> Option<BodyTooLarge> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(found) = err.downcast_ref::<BodyTooLarge>() {
            return Some(*found);
        }
        current = err.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use futures_util::stream;

    fn chunked(chunks: &[&'static str]) -> Body {
        let items: Vec<Result<Bytes, std::io::Error>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from_static(c.as_bytes())))
            .collect();
        Body::from_stream(stream::iter(items))
    }

    #[test]
    fn budget_accounts_cumulatively() {
        let mut budget = ByteBudget::new(10);
        assert!(budget.consume(4).is_ok());
        assert!(budget.consume(6).is_ok());
        assert_eq!(budget.remaining(), 0);
        assert_eq!(budget.consume(1), Err(BodyTooLarge { limit: 10 }));
        assert_eq!(budget.used(), 10);
    }

    #[tokio::test]
    async fn under_the_ceiling_passes_through() {
        let body = Body::new(BoundedBody::new(chunked(&["abc", "def"]), 6));
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"abcdef");
    }

    #[tokio::test]
    async fn crossing_the_ceiling_is_a_distinguished_error() {
        let body = Body::new(BoundedBody::new(chunked(&["abc", "def", "g"]), 6));
        let err = axum::body::to_bytes(body, usize::MAX).await.unwrap_err();
        assert_eq!(find_body_too_large(&err), Some(BodyTooLarge { limit: 6 }));
    }

    #[tokio::test]
    async fn no_partial_frame_after_trip() {
        let mut bounded = BoundedBody::new(chunked(&["abcd", "efgh", "ij"]), 6);

        let first = std::future::poll_fn(|cx| Pin::new(&mut bounded).poll_frame(cx)).await;
        assert!(first.unwrap().is_ok());

        let second = std::future::poll_fn(|cx| Pin::new(&mut bounded).poll_frame(cx)).await;
        assert!(second.unwrap().is_err());
        assert_eq!(bounded.bytes_seen(), 4);

        let third = std::future::poll_fn(|cx| Pin::new(&mut bounded).poll_frame(cx)).await;
        assert!(third.is_none());
    }

    #[test]
    fn transport_errors_are_not_mistaken_for_limits() {
        let err = std::io::Error::other("connection reset");
        assert_eq!(find_body_too_large(&err), None);
    }
}
