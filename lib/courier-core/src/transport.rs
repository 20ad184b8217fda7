//! Transport boundary.

use std::future::Future;

use crate::{Request, Response, Result};

/// The socket-level collaborator the dispatcher hands requests to.
///
/// A transport consumes the fully assembled request (after the request
/// phase ran) and produces either a raw response or a transport error. It
/// owns everything below the pipeline: connections, pooling, TLS, wire
/// parsing. The dispatcher never inspects wire bytes.
///
/// Implementations must be cheap to clone and safe to share across
/// concurrent requests.
pub trait Transport: Send + Sync {
    /// Send one request and await its response.
    ///
    /// # Errors
    ///
    /// Returns an error for connection failures, TLS failures, and
    /// timeouts. An HTTP response with a non-2xx status is *not* an error.
    fn send(&self, request: Request) -> impl Future<Output = Result<Response>> + Send;
}
