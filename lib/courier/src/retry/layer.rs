//! The retry layer and its service.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use tower::{Layer, Service};
use tracing::debug;

use crate::{Error, Request, Response, Result};

use super::{Backoff, ConstantBackoff, Evaluator, ServerErrors};

/// Default number of retries beyond the first attempt (4 total attempts).
pub const DEFAULT_RETRIES: usize = 3;

/// Layer wrapping a service in a bounded retry loop.
///
/// Without configuration, retries transport errors and 5xx responses up to
/// [`DEFAULT_RETRIES`] times with a constant backoff. The first call to
/// [`RetryLayer::evaluator`] replaces the default policy; further calls
/// append to the evaluator chain, which runs in registration order and
/// short-circuits on the first flagged failure.
///
/// See the [module docs](super) for the stacking semantics of multiple
/// retry layers.
#[derive(Clone)]
pub struct RetryLayer {
    retries: usize,
    backoff: Arc<dyn Backoff>,
    evaluators: Vec<Arc<dyn Evaluator>>,
}

impl RetryLayer {
    /// Creates a layer with default retries, backoff, and evaluator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            backoff: Arc::new(ConstantBackoff::default()),
            evaluators: Vec::new(),
        }
    }

    /// Set the number of retries beyond the first attempt.
    #[must_use]
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Replace the backoff policy.
    #[must_use]
    pub fn backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Append an evaluator to the chain (replacing the default policy on
    /// the first call).
    #[must_use]
    pub fn evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluators.push(Arc::new(evaluator));
        self
    }
}

impl Default for RetryLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RetryLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryLayer")
            .field("retries", &self.retries)
            .field("evaluators", &self.evaluators.len())
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = Retry<S>;

    fn layer(&self, inner: S) -> Self::Service {
        let evaluators: Arc<[Arc<dyn Evaluator>]> = if self.evaluators.is_empty() {
            Arc::new([Arc::new(ServerErrors)])
        } else {
            Arc::from(self.evaluators.clone())
        };

        Retry {
            inner,
            retries: self.retries,
            backoff: Arc::clone(&self.backoff),
            evaluators,
        }
    }
}

/// Service decorating an attempt operation with the retry loop.
#[derive(Clone)]
pub struct Retry<S> {
    inner: S,
    retries: usize,
    backoff: Arc<dyn Backoff>,
    evaluators: Arc<[Arc<dyn Evaluator>]>,
}

impl<S> fmt::Debug for Retry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("retries", &self.retries)
            .field("evaluators", &self.evaluators.len())
            .finish_non_exhaustive()
    }
}

/// Run one evaluator pass over an attempt outcome. The first evaluator
/// that flags a failure wins; later ones are not consulted.
fn first_failure(
    evaluators: &[Arc<dyn Evaluator>],
    outcome: &Result<Response>,
    request: &Request,
) -> Option<Error> {
    let (error, response) = match outcome {
        Ok(response) => (None, Some(response)),
        Err(error) => (Some(error), None),
    };
    evaluators
        .iter()
        .find_map(|evaluator| evaluator.evaluate(error, response, request))
}

impl<S> Service<Request> for Retry<S>
where
    S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let max_attempts = self.retries + 1;
        let backoff = Arc::clone(&self.backoff);
        let evaluators = Arc::clone(&self.evaluators);

        Box::pin(async move {
            let mut attempt = 0;
            loop {
                attempt += 1;
                let outcome = inner.call(request.clone()).await;

                let Some(failure) = first_failure(&evaluators, &outcome, &request) else {
                    return outcome;
                };

                if attempt >= max_attempts {
                    debug!(attempt, failure = %failure, "retries exhausted, surfacing last attempt");
                    return outcome;
                }

                let delay = backoff.delay(attempt);
                debug!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    failure = %failure,
                    "attempt flagged for retry"
                );
                // The only suspension point besides the attempt itself.
                // Dropping the future (e.g. a caller-side timeout) cancels
                // the wait immediately.
                tokio::time::sleep(delay).await;
            }
        })
    }
}
