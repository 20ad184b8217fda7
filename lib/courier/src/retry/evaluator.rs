//! Attempt-outcome evaluators.

use crate::{Error, Request, Response};

/// Classifies one attempt's outcome as a retry-worthy failure or a success.
///
/// Exactly one of `error` / `response` is present per attempt. Returning
/// `Some(failure)` flags the attempt for retry and short-circuits the rest
/// of the evaluator chain for this pass. The failure value only drives the
/// retry decision and its logging; the caller always receives the attempt's
/// real outcome, never the evaluator's.
pub trait Evaluator: Send + Sync {
    /// Evaluate one attempt.
    fn evaluate(
        &self,
        error: Option<&Error>,
        response: Option<&Response>,
        request: &Request,
    ) -> Option<Error>;
}

impl<F> Evaluator for F
where
    F: Fn(Option<&Error>, Option<&Response>, &Request) -> Option<Error> + Send + Sync,
{
    fn evaluate(
        &self,
        error: Option<&Error>,
        response: Option<&Response>,
        request: &Request,
    ) -> Option<Error> {
        self(error, response, request)
    }
}

/// The default evaluator: transport-level errors and 5xx responses are
/// retry-worthy, everything else is success.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerErrors;

impl Evaluator for ServerErrors {
    fn evaluate(
        &self,
        error: Option<&Error>,
        response: Option<&Response>,
        _request: &Request,
    ) -> Option<Error> {
        if let Some(error) = error {
            return if error.is_timeout() {
                Some(Error::Timeout)
            } else {
                Some(Error::connection(error.to_string()))
            };
        }

        match response {
            Some(response) if response.is_server_error() => {
                Some(Error::http(response.status(), "server error"))
            }
            _ => None,
        }
    }
}
