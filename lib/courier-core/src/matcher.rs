//! Pure predicates deciding whether a plugin group applies to a request.
//!
//! Matchers form a structural tree of leaf predicates and boolean
//! combinators. Evaluation never mutates the [`Context`] and is repeated at
//! every dispatch step that reaches a gated entry, so earlier plugins in the
//! same phase can change the outcome mid-run.

use std::fmt;
use std::sync::Arc;

use crate::{Context, Method};

/// A predicate tree over a [`Context`].
#[derive(Clone)]
pub enum Matcher {
    /// True iff the request method equals the given method.
    Method(Method),
    /// True iff the request URL host equals the given host (exact string
    /// comparison against `url.host_str()`).
    Host(String),
    /// Caller-supplied predicate. Must be pure: no side effects, no
    /// mutation, safe to evaluate any number of times.
    Custom(Arc<dyn Fn(&Context) -> bool + Send + Sync>),
    /// True iff all sub-matchers are true. Short-circuits left to right.
    /// An empty `All` is vacuously true.
    All(Vec<Matcher>),
    /// True iff any sub-matcher is true. Short-circuits left to right.
    /// An empty `Any` is vacuously false.
    Any(Vec<Matcher>),
    /// Inverts the inner matcher.
    Not(Box<Matcher>),
}

impl Matcher {
    /// Match requests with the given HTTP method.
    #[must_use]
    pub const fn method(method: Method) -> Self {
        Self::Method(method)
    }

    /// Match requests whose URL host equals `host`.
    #[must_use]
    pub fn host(host: impl Into<String>) -> Self {
        Self::Host(host.into())
    }

    /// Match with a caller-supplied predicate.
    pub fn custom(predicate: impl Fn(&Context) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(predicate))
    }

    /// All sub-matchers must match.
    #[must_use]
    pub fn all(matchers: impl IntoIterator<Item = Self>) -> Self {
        Self::All(matchers.into_iter().collect())
    }

    /// Any sub-matcher may match.
    #[must_use]
    pub fn any(matchers: impl IntoIterator<Item = Self>) -> Self {
        Self::Any(matchers.into_iter().collect())
    }

    /// Invert a matcher.
    #[must_use]
    pub fn not(matcher: Self) -> Self {
        Self::Not(Box::new(matcher))
    }

    /// Evaluate this tree against a context snapshot.
    #[must_use]
    pub fn matches(&self, ctx: &Context) -> bool {
        match self {
            Self::Method(method) => ctx.request.method() == *method,
            Self::Host(host) => ctx.request.host() == Some(host.as_str()),
            Self::Custom(predicate) => predicate(ctx),
            Self::All(matchers) => matchers.iter().all(|m| m.matches(ctx)),
            Self::Any(matchers) => matchers.iter().any(|m| m.matches(ctx)),
            Self::Not(matcher) => !matcher.matches(ctx),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(method) => f.debug_tuple("Method").field(method).finish(),
            Self::Host(host) => f.debug_tuple("Host").field(host).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::All(matchers) => f.debug_tuple("All").field(matchers).finish(),
            Self::Any(matchers) => f.debug_tuple("Any").field(matchers).finish(),
            Self::Not(matcher) => f.debug_tuple("Not").field(matcher).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use crate::Request;

    use super::*;

    fn context(method: Method, url: &str) -> Context {
        let url = url::Url::parse(url).expect("valid URL");
        Context::new(Request::builder(method, url).build())
    }

    #[test]
    fn leaf_matchers() {
        let ctx = context(Method::Get, "https://foo.example/path");

        check!(Matcher::method(Method::Get).matches(&ctx));
        check!(!Matcher::method(Method::Post).matches(&ctx));
        check!(Matcher::host("foo.example").matches(&ctx));
        check!(!Matcher::host("bar.example").matches(&ctx));
        check!(Matcher::custom(|ctx| ctx.request.url().path() == "/path").matches(&ctx));
    }

    #[test]
    fn combinators_follow_boolean_logic() {
        let ctx = context(Method::Get, "https://foo.example/");
        let yes = || Matcher::method(Method::Get);
        let no = || Matcher::host("bar.example");

        check!(Matcher::all([yes(), yes()]).matches(&ctx));
        check!(!Matcher::all([yes(), no()]).matches(&ctx));
        check!(Matcher::any([no(), yes()]).matches(&ctx));
        check!(!Matcher::any([no(), no()]).matches(&ctx));
        check!(Matcher::not(no()).matches(&ctx));
        check!(!Matcher::not(yes()).matches(&ctx));

        // Nested trees compose like the corresponding boolean expression.
        let tree = Matcher::any([Matcher::all([yes(), no()]), Matcher::not(no())]);
        check!(tree.matches(&ctx) == ((true && false) || !false));
    }

    #[test]
    fn vacuous_combinators() {
        let ctx = context(Method::Get, "https://foo.example/");
        check!(Matcher::all([]).matches(&ctx));
        check!(!Matcher::any([]).matches(&ctx));
    }

    #[test]
    fn short_circuit_left_to_right() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let ctx = context(Method::Get, "https://foo.example/");
        let calls = Arc::new(AtomicUsize::new(0));

        let counting = {
            let calls = Arc::clone(&calls);
            Matcher::custom(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            })
        };

        // First branch of Any already matches; the counting matcher must not run.
        check!(Matcher::any([Matcher::method(Method::Get), counting]).matches(&ctx));
        check!(calls.load(Ordering::SeqCst) == 0);
    }

    #[test]
    fn url_without_host_never_matches_host() {
        let ctx = context(Method::Get, "data:text/plain,hi");
        check!(!Matcher::host("foo.example").matches(&ctx));
    }
}
