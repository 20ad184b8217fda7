//! The phase-scoped plugin dispatcher.
//!
//! A [`Chain`] is an ordered list of entries, each scoped to a [`Phase`] and
//! optionally gated by a [`Matcher`]. Running a phase walks the entries in
//! registration order, re-evaluates each gate against the live context, and
//! advances or halts according to the plugin's [`Flow`] verdict.

use std::fmt;
use std::sync::Arc;

use crate::{Context, Flow, Matcher, Phase, Plugin};

/// One registered dispatch step.
#[derive(Clone)]
struct Entry {
    phase: Phase,
    matcher: Option<Matcher>,
    plugin: Arc<dyn Plugin>,
}

/// How a phase run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every matching entry ran and returned [`Flow::Next`].
    Completed,
    /// An entry returned [`Flow::Stop`]; later entries in the phase were
    /// skipped. Not a failure.
    Stopped,
    /// An entry returned [`Flow::Fail`]; the error is recorded on the
    /// context before the run returns.
    Failed,
}

/// Ordered, phase-scoped plugin registrations.
///
/// Chains are assembled at client construction time and frozen behind an
/// `Arc` afterwards; running a phase takes `&self`, so one chain serves any
/// number of concurrent requests.
#[derive(Clone, Default)]
pub struct Chain {
    entries: Vec<Entry>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin for a phase.
    pub fn use_in(&mut self, phase: Phase, plugin: impl Plugin + 'static) -> &mut Self {
        self.entries.push(Entry {
            phase,
            matcher: None,
            plugin: Arc::new(plugin),
        });
        self
    }

    /// Register a plugin for a phase, gated by a matcher.
    pub fn use_matched(
        &mut self,
        phase: Phase,
        matcher: Matcher,
        plugin: impl Plugin + 'static,
    ) -> &mut Self {
        self.entries.push(Entry {
            phase,
            matcher: Some(matcher),
            plugin: Arc::new(plugin),
        });
        self
    }

    /// Register a request-phase plugin.
    pub fn use_request(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        self.use_in(Phase::Request, plugin)
    }

    /// Register a response-phase plugin.
    pub fn use_response(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        self.use_in(Phase::Response, plugin)
    }

    /// Register an error-phase plugin.
    pub fn use_error(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        self.use_in(Phase::Error, plugin)
    }

    /// Flatten a matcher-gated group into this chain.
    ///
    /// Group entries keep their registration order; each entry's gate
    /// becomes the AND of the group matcher and its own matcher, if any.
    pub fn mount(&mut self, group: Group) -> &mut Self {
        self.entries.extend(group.into_entries());
        self
    }

    /// Number of registered entries across all phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entry is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run one phase of the chain against a context.
    ///
    /// Entries registered for other phases are skipped. Matchers are
    /// evaluated at the moment dispatch reaches their entry, never cached:
    /// a plugin that mutates the request can change whether a later gate in
    /// the same run matches.
    pub fn run(&self, phase: &Phase, ctx: &mut Context) -> ChainOutcome {
        for entry in &self.entries {
            if entry.phase != *phase {
                continue;
            }
            if let Some(matcher) = &entry.matcher
                && !matcher.matches(ctx)
            {
                continue;
            }
            match entry.plugin.call(ctx) {
                Flow::Next => {}
                Flow::Stop => return ChainOutcome::Stopped,
                Flow::Fail(error) => {
                    ctx.error = Some(error);
                    return ChainOutcome::Failed;
                }
            }
        }
        ChainOutcome::Completed
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// A sub-chain of plugins gated by one composed matcher.
///
/// `Group::if_all` is the conditional-composition sugar: it ANDs the given
/// matchers and attaches handlers behind the combined gate. Groups nest;
/// mounting a group inside another ANDs their matchers.
///
/// Registering a group whose matcher can never match is equivalent to not
/// registering it at all.
#[derive(Clone)]
pub struct Group {
    matcher: Matcher,
    entries: Vec<Entry>,
}

impl Group {
    /// Creates a group gated by `matcher`.
    #[must_use]
    pub fn when(matcher: Matcher) -> Self {
        Self {
            matcher,
            entries: Vec::new(),
        }
    }

    /// Creates a group gated by the AND of the given matchers.
    ///
    /// An empty list is vacuously true: the group always applies.
    #[must_use]
    pub fn if_all(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        Self::when(Matcher::all(matchers))
    }

    /// Attach a plugin for a phase.
    #[must_use]
    pub fn use_in(mut self, phase: Phase, plugin: impl Plugin + 'static) -> Self {
        self.entries.push(Entry {
            phase,
            matcher: None,
            plugin: Arc::new(plugin),
        });
        self
    }

    /// Attach a request-phase plugin.
    #[must_use]
    pub fn use_request(self, plugin: impl Plugin + 'static) -> Self {
        self.use_in(Phase::Request, plugin)
    }

    /// Attach a response-phase plugin.
    #[must_use]
    pub fn use_response(self, plugin: impl Plugin + 'static) -> Self {
        self.use_in(Phase::Response, plugin)
    }

    /// Attach an error-phase plugin.
    #[must_use]
    pub fn use_error(self, plugin: impl Plugin + 'static) -> Self {
        self.use_in(Phase::Error, plugin)
    }

    /// Nest another group; its matcher composes with this group's by AND.
    #[must_use]
    pub fn mount(mut self, inner: Self) -> Self {
        self.entries.extend(inner.into_entries());
        self
    }

    fn into_entries(self) -> Vec<Entry> {
        let gate = self.matcher;
        self.entries
            .into_iter()
            .map(|entry| {
                let matcher = match entry.matcher {
                    Some(own) => Matcher::all([gate.clone(), own]),
                    None => gate.clone(),
                };
                Entry {
                    phase: entry.phase,
                    matcher: Some(matcher),
                    plugin: entry.plugin,
                }
            })
            .collect()
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("matcher", &self.matcher)
            .field("entries", &self.entries.len())
            .finish()
    }
}
