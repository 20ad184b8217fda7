//! Retry behavior over a scripted in-process transport.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert2::check;
use bytes::Bytes;

use courier::prelude::*;
use courier::Transport;
use courier::retry::Evaluator;

/// Transport replaying a fixed script of outcomes, one per physical send.
#[derive(Clone)]
struct ScriptedTransport {
    outcomes: Arc<Mutex<VecDeque<Result<Response>>>>,
    sends: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    fn new(outcomes: impl IntoIterator<Item = Result<Response>>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into_iter().collect())),
            sends: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, _request: Request) -> Result<Response> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(Error::connection("script exhausted")))
    }
}

/// Evaluator flagging responses with one specific status, counting calls.
struct StatusFlagger {
    status: u16,
    evaluations: Arc<AtomicUsize>,
}

impl StatusFlagger {
    fn new(status: u16) -> (Self, Arc<AtomicUsize>) {
        let evaluations = Arc::new(AtomicUsize::new(0));
        (
            Self {
                status,
                evaluations: Arc::clone(&evaluations),
            },
            evaluations,
        )
    }
}

impl Evaluator for StatusFlagger {
    fn evaluate(
        &self,
        _error: Option<&Error>,
        response: Option<&Response>,
        _request: &Request,
    ) -> Option<Error> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        let status = response.map(Response::status)?;
        (status == self.status).then(|| Error::http(status, "flagged for retry"))
    }
}

fn status(code: u16) -> Result<Response> {
    Ok(Response::new(code, HashMap::new(), Bytes::new()))
}

fn request() -> Request {
    let url = url::Url::parse("http://fake.test/resource").expect("valid URL");
    Request::builder(Method::Get, url).build()
}

fn no_backoff() -> ConstantBackoff {
    ConstantBackoff::new(Duration::ZERO)
}

#[tokio::test]
async fn succeeds_once_a_retry_lands() {
    let transport = ScriptedTransport::new([status(503), status(503), status(200)]);
    let client = Client::builder()
        .transport(transport.clone())
        .retry(RetryLayer::new().backoff(no_backoff()))
        .build();

    let response = client.execute(request()).await.expect("response");

    check!(response.status() == 200);
    check!(transport.sends() == 3);
}

#[tokio::test]
async fn exhaustion_surfaces_the_last_response() {
    let transport = ScriptedTransport::new([status(503), status(503), status(503), status(503)]);
    let client = Client::builder()
        .transport(transport.clone())
        .retry(RetryLayer::new().retries(3).backoff(no_backoff()))
        .build();

    let response = client.execute(request()).await.expect("response");

    // The last attempt's outcome comes back verbatim, not an error.
    check!(response.status() == 503);
    check!(!response.ok());
    check!(transport.sends() == 4);
}

#[tokio::test]
async fn exhaustion_surfaces_the_last_error() {
    let transport = ScriptedTransport::new([
        Err(Error::connection("refused")),
        Err(Error::connection("refused")),
        Err(Error::connection("refused")),
        Err(Error::connection("reset")),
    ]);
    let client = Client::builder()
        .transport(transport.clone())
        .retry(RetryLayer::new().retries(3).backoff(no_backoff()))
        .build();

    let error = client.execute(request()).await.expect_err("error");

    check!(error.is_connection());
    check!(error.to_string().contains("reset"));
    check!(transport.sends() == 4);
}

#[tokio::test]
async fn evaluator_chain_stops_at_first_flag() {
    let (always, always_count) = StatusFlagger::new(200);
    let (never_consulted, never_count) = StatusFlagger::new(500);

    let transport = ScriptedTransport::new([status(200), status(200)]);
    let client = Client::builder()
        .transport(transport.clone())
        .retry(
            RetryLayer::new()
                .retries(1)
                .backoff(no_backoff())
                .evaluator(always)
                .evaluator(never_consulted),
        )
        .build();

    let response = client.execute(request()).await.expect("response");

    check!(response.status() == 200);
    check!(transport.sends() == 2);
    // The first evaluator flagged both attempts, so the second never ran.
    check!(always_count.load(Ordering::SeqCst) == 2);
    check!(never_count.load(Ordering::SeqCst) == 0);
}

#[tokio::test]
async fn stacked_retry_layers_multiply_attempts() {
    let (flags_420, count_420) = StatusFlagger::new(420);
    let (flags_418, count_418) = StatusFlagger::new(418);

    let transport = ScriptedTransport::new([status(418), status(420), status(200)]);
    // The 418 layer is added last, so it wraps the 420 layer and re-runs
    // that inner loop whenever it sees a 418.
    let client = Client::builder()
        .transport(transport.clone())
        .retry(RetryLayer::new().backoff(no_backoff()).evaluator(flags_420))
        .retry(RetryLayer::new().backoff(no_backoff()).evaluator(flags_418))
        .build();

    let response = client.execute(request()).await.expect("response");

    check!(response.status() == 200);
    check!(transport.sends() == 3);
    // Inner layer sees 418, 420, and 200; outer sees 418 and 200.
    check!(count_420.load(Ordering::SeqCst) == 3);
    check!(count_418.load(Ordering::SeqCst) == 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_future_cancels_the_backoff_wait() {
    let transport = ScriptedTransport::new([status(503), status(503)]);
    let client = Client::builder()
        .transport(transport.clone())
        .retry(RetryLayer::new().backoff(ConstantBackoff::new(Duration::from_secs(60))))
        .build();

    let outcome = tokio::time::timeout(Duration::from_secs(1), client.execute(request())).await;

    check!(outcome.is_err());
    // Only the first attempt went out before the backoff wait was dropped.
    check!(transport.sends() == 1);
}

#[tokio::test]
async fn retries_zero_disables_retrying() {
    let transport = ScriptedTransport::new([status(503), status(200)]);
    let client = Client::builder()
        .transport(transport.clone())
        .retry(RetryLayer::new().retries(0).backoff(no_backoff()))
        .build();

    let response = client.execute(request()).await.expect("response");

    check!(response.status() == 503);
    check!(transport.sends() == 1);
}

#[tokio::test]
async fn request_phase_plugins_rerun_on_every_attempt() {
    let runs = Arc::new(AtomicUsize::new(0));
    let plugin_runs = Arc::clone(&runs);

    let transport = ScriptedTransport::new([status(500), status(500), status(200)]);
    let client = Client::builder()
        .use_request(move |_ctx: &mut Context| {
            plugin_runs.fetch_add(1, Ordering::SeqCst);
            Flow::Next
        })
        .transport(transport.clone())
        .retry(RetryLayer::new().backoff(no_backoff()))
        .build();

    let response = client.execute(request()).await.expect("response");

    check!(response.status() == 200);
    check!(transport.sends() == 3);
    check!(runs.load(Ordering::SeqCst) == 3);
}
