//! Retry decorator around the attempt operation.
//!
//! [`RetryLayer`] wraps whatever it is layered over - the dispatch engine,
//! or another retry - in a bounded loop of physical attempts. After each
//! attempt the [`Evaluator`] chain classifies the outcome; the first
//! evaluator to flag a failure triggers a backoff wait and a fresh attempt.
//! When the attempt budget runs out, the last attempt's outcome is returned
//! verbatim: the retry subsystem never synthesizes errors of its own.
//!
//! # Stacking
//!
//! Layers added to the client builder wrap successively, so the retry added
//! *last* is the outermost decorator. An outer retry treats the inner
//! retry's entire loop as a single opaque attempt and only evaluates after
//! the inner loop has finished. Stacked retries therefore multiply: two
//! layers with 3 retries each can reach 16 physical sends. This matches
//! the observable behavior of stacked retry plugins and is kept on purpose;
//! prefer a single layer with several evaluators unless nested budgets are
//! exactly what you want.
//!
//! # Re-running plugins
//!
//! Every physical attempt re-enters the full plugin dispatch with a fresh
//! context. Request-phase plugins below a retry layer must be safe to run
//! once per attempt.

mod backoff;
mod evaluator;
mod layer;

pub use backoff::{Backoff, ConstantBackoff, DEFAULT_BACKOFF_DELAY, ExponentialBackoff};
pub use evaluator::{Evaluator, ServerErrors};
pub use layer::{DEFAULT_RETRIES, Retry, RetryLayer};
