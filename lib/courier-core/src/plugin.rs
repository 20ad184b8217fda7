//! Plugin trait and continuation verdicts.
//!
//! A plugin is one dispatch step: it receives the [`Context`] and answers
//! with a [`Flow`] telling the dispatcher what to do next. The verdict is a
//! return value rather than a callback, so every invocation decides exactly
//! once; "forgot to call next" is unrepresentable.

use crate::{Context, Error};

/// Continuation verdict returned by every plugin invocation.
#[derive(Debug)]
pub enum Flow {
    /// Pass control to the next matching entry in the current phase.
    Next,
    /// End the current phase's chain. Later entries in this phase do not
    /// run; the dispatch itself continues (a stopped request phase still
    /// reaches the transport).
    Stop,
    /// End the current phase's chain and record `error` on the context.
    Fail(Error),
}

impl Flow {
    /// Returns `true` for [`Flow::Next`].
    #[must_use]
    pub const fn is_next(&self) -> bool {
        matches!(self, Self::Next)
    }
}

/// A middleware step in the dispatch chain.
///
/// Plugins are registered once at client construction and shared across
/// every request the client sends, concurrently. They must therefore be
/// stateless with respect to any single request: all per-request state
/// belongs in the [`Context`] (typically its store).
///
/// Plugins registered in the request phase and wrapped by a retry layer run
/// again on every physical attempt; they must be safe to run repeatedly.
///
/// Panics inside a plugin are not caught; they propagate to the caller of
/// the client. Recoverable failures should be reported with [`Flow::Fail`],
/// which later stages (the error phase, retry evaluators) can observe in a
/// structured way.
pub trait Plugin: Send + Sync {
    /// Run this step against the context and decide how the chain proceeds.
    fn call(&self, ctx: &mut Context) -> Flow;
}

impl<F> Plugin for F
where
    F: Fn(&mut Context) -> Flow + Send + Sync,
{
    fn call(&self, ctx: &mut Context) -> Flow {
        self(ctx)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Method, Request};

    use super::*;

    #[test]
    fn closures_are_plugins() {
        let plugin = |ctx: &mut Context| {
            ctx.request.set_header("X-Step", "1");
            Flow::Next
        };

        let url = url::Url::parse("https://example.com/").expect("valid URL");
        let mut ctx = Context::new(Request::builder(Method::Get, url).build());

        assert!(Plugin::call(&plugin, &mut ctx).is_next());
        assert_eq!(ctx.request.header("X-Step"), Some("1"));
    }
}
