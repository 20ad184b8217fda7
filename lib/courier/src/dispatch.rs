//! One physical attempt: request phase, transport send, terminal phase.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use tower_service::Service;
use tracing::{Instrument, Level, span, trace};

use courier_core::{Chain, Context, Phase};

use crate::{Error, Request, Response, Result, client::BoxedService};

/// The innermost service of the attempt stack.
///
/// Every call runs the full dispatch once over a fresh [`Context`]: the
/// request-phase chain, the transport, then the response- or error-phase
/// chain. Retry decorators wrapping this service re-enter it from the top,
/// so request-phase plugins run again on every physical attempt.
#[derive(Clone)]
pub(crate) struct Dispatch {
    chain: Arc<Chain>,
    transport: BoxedService,
}

impl Dispatch {
    pub(crate) fn new(chain: Arc<Chain>, transport: BoxedService) -> Self {
        Self { chain, transport }
    }

    async fn run(chain: Arc<Chain>, mut transport: BoxedService, request: Request) -> Result<Response> {
        let mut ctx = Context::new(request);

        run_phase(&chain, &mut ctx, Phase::Request);

        if ctx.error.is_none() {
            match transport.call(ctx.request.clone()).await {
                Ok(response) => {
                    ctx.response = Some(response);
                    run_phase(&chain, &mut ctx, Phase::Response);
                }
                Err(error) => ctx.error = Some(error),
            }
        }

        // The error phase sees failures from any earlier stage. Its plugins
        // may recover by taking the error and installing a response.
        if ctx.error.is_some() {
            run_phase(&chain, &mut ctx, Phase::Error);
        }

        // An empty response slot with no recorded error means a plugin took
        // the response and left nothing behind, which is a plugin bug.
        match ctx.error.take() {
            Some(error) => Err(error),
            None => ctx
                .response
                .take()
                .ok_or_else(|| Error::invalid_request("no response produced for request")),
        }
    }
}

fn run_phase(chain: &Chain, ctx: &mut Context, phase: Phase) {
    ctx.set_phase(phase.clone());
    let outcome = chain.run(&phase, ctx);
    trace!(phase = %phase, ?outcome, "phase chain finished");
}

impl Service<Request> for Dispatch {
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let method = request.method();
        let url = request.url().to_string();
        let span = span!(Level::DEBUG, "attempt", %method, %url);

        let chain = Arc::clone(&self.chain);
        let transport = self.transport.clone();
        Box::pin(Self::run(chain, transport, request).instrument(span))
    }
}
