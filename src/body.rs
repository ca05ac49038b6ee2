//! HTTP body utilities for the zone source client.
//!
//! Minimal replacements for the http-body-util pieces we need:
//! - Empty: request body with no data
//! - Limited: caps how many bytes a response body may yield
//! - collect_limited: drains a body into one contiguous buffer

use bytes::{Buf, Bytes, BytesMut};
use hyper::body::{Body, Frame};
use std::future::poll_fn;
use std::pin::Pin;
use std::task::{Context, Poll};

/// An empty HTTP body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Empty<D> {
    _marker: std::marker::PhantomData<fn() -> D>,
}

impl<D> Empty<D> {
    pub fn new() -> Self {
        Empty {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<D: Buf + Send + 'static> Body for Empty<D> {
    type Data = D;
    type Error = std::convert::Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(None)
    }

    fn is_end_stream(&self) -> bool {
        true
    }

    fn size_hint(&self) -> hyper::body::SizeHint {
        hyper::body::SizeHint::with_exact(0)
    }
}

/// Extension trait for Body types.
pub trait BodyExt: Body {
    /// Limit the body to a maximum number of bytes.
    fn limited(self, limit: u64) -> Limited<Self>
    where
        Self: Sized,
    {
        Limited::new(self, limit)
    }
}

impl<T: Body> BodyExt for T {}

/// Error returned when body size limit is exceeded.
#[derive(Debug)]
pub struct LimitExceeded {
    pub limit: u64,
}

impl std::fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "body size limit exceeded: {} bytes", self.limit)
    }
}

impl std::error::Error for LimitExceeded {}

/// Body adapter that limits the number of bytes read.
pub struct Limited<B> {
    inner: B,
    remaining: u64,
    limit: u64,
}

impl<B> Limited<B> {
    pub fn new(inner: B, limit: u64) -> Self {
        Limited {
            inner,
            remaining: limit,
            limit,
        }
    }
}

impl<B: Unpin> Unpin for Limited<B> {}

impl<B> Body for Limited<B>
where
    B: Body + Unpin,
    B::Data: Buf,
{
    type Data = B::Data;
    type Error = LimitedError<B::Error>;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match Pin::new(&mut self.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    let len = data.remaining() as u64;
                    if len > self.remaining {
                        return Poll::Ready(Some(Err(LimitedError::LimitExceeded(
                            LimitExceeded { limit: self.limit },
                        ))));
                    }
                    self.remaining -= len;
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(LimitedError::Inner(e)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> hyper::body::SizeHint {
        let mut hint = self.inner.size_hint();
        if hint.lower() > self.remaining {
            hint.set_lower(self.remaining);
        }
        match hint.upper() {
            Some(upper) if upper <= self.remaining => {}
            _ => hint.set_upper(self.remaining),
        }
        hint
    }
}

/// Error type for Limited body - either limit exceeded or inner body error.
#[derive(Debug)]
pub enum LimitedError<E> {
    LimitExceeded(LimitExceeded),
    Inner(E),
}

impl<E: std::fmt::Display> std::fmt::Display for LimitedError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitedError::LimitExceeded(e) => write!(f, "{}", e),
            LimitedError::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for LimitedError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LimitedError::LimitExceeded(e) => Some(e),
            LimitedError::Inner(e) => Some(e),
        }
    }
}

/// Read every data frame of `body` into one buffer. Trailers are ignored.
pub async fn collect_limited<B>(mut body: B) -> Result<Bytes, B::Error>
where
    B: Body + Unpin,
{
    let mut collected = BytesMut::new();

    while let Some(frame) = poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await {
        if let Ok(mut data) = frame?.into_data() {
            while data.has_remaining() {
                let chunk = data.chunk();
                let len = chunk.len();
                collected.extend_from_slice(chunk);
                data.advance(len);
            }
        }
    }

    Ok(collected.freeze())
}
