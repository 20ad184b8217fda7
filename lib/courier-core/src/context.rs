//! Per-request mutable state threaded through the plugin chain.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use crate::{Error, Phase, Request, Response};

/// Type-erased, ordered key/value store for ad-hoc plugin state.
///
/// Keys live for one [`Context`] only; two concurrent requests never share
/// a store. Values are arbitrary `Any + Send + Sync` payloads retrieved by
/// key and concrete type.
#[derive(Default)]
pub struct Store {
    entries: BTreeMap<String, Box<dyn Any + Send + Sync>>,
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value under `key`.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    /// Value under `key`, if present and of type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Mutable value under `key`, if present and of type `T`.
    #[must_use]
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.entries
            .get_mut(key)
            .and_then(|v| v.downcast_mut::<T>())
    }

    /// Remove the value under `key`, returning it if it has type `T`.
    ///
    /// A remove with the wrong type is a no-op: the entry stays in place.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        match self.entries.remove(key)?.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(value) => {
                self.entries.insert(key.to_string(), value);
                None
            }
        }
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// The mutable unit of state for one request attempt.
///
/// A fresh `Context` is created per physical attempt and owned exclusively
/// by it; plugins receive `&mut Context` and operate only on the context
/// they are handed. The request, response, and error slots are public
/// because editing them is the whole point of a plugin.
pub struct Context {
    /// Outbound request description; mutable until the transport sends it.
    pub request: Request,
    /// Inbound response, present only after a successful transport send.
    ///
    /// A response-phase plugin may take or replace this. Taking it without
    /// recording an error leaves the dispatch with nothing to return; the
    /// dispatcher reports that as [`crate::Error::InvalidRequest`] rather
    /// than inventing a response.
    pub response: Option<Response>,
    /// Last recorded failure, set by the transport or by [`crate::Flow::Fail`].
    pub error: Option<Error>,
    phase: Phase,
    store: Store,
}

impl Context {
    /// Creates a context in the `request` phase with an empty store.
    #[must_use]
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: None,
            error: None,
            phase: Phase::Request,
            store: Store::new(),
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Move the context to another phase.
    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// The ad-hoc key/value store.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Mutable access to the store.
    #[must_use]
    pub const fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Clone the request/response state into an independent context.
    ///
    /// The branch starts with a fresh store and no recorded error, so a
    /// sub-dispatch can never leak state back into this context.
    #[must_use]
    pub fn branch(&self) -> Self {
        Self {
            request: self.request.clone(),
            response: self.response.clone(),
            error: None,
            phase: self.phase.clone(),
            store: Store::new(),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("phase", &self.phase)
            .field("request", &self.request)
            .field("response", &self.response)
            .field("error", &self.error)
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use crate::Method;

    use super::*;

    fn context() -> Context {
        let url = url::Url::parse("https://example.com/").expect("valid URL");
        Context::new(Request::builder(Method::Get, url).build())
    }

    #[test]
    fn store_typed_round_trip() {
        let mut store = Store::new();
        store.set("attempts", 2_usize);
        store.set("marker", "alpha".to_string());

        check!(store.get::<usize>("attempts") == Some(&2));
        check!(store.get::<String>("marker") == Some(&"alpha".to_string()));
        // Wrong type never aliases another entry.
        check!(store.get::<u32>("attempts").is_none());

        *store.get_mut::<usize>("attempts").expect("present") += 1;
        check!(store.remove::<usize>("attempts") == Some(3));
        check!(!store.contains("attempts"));
    }

    #[test]
    fn remove_with_wrong_type_keeps_the_entry() {
        let mut store = Store::new();
        store.set("attempts", 2_usize);

        check!(store.remove::<String>("attempts").is_none());
        check!(store.get::<usize>("attempts") == Some(&2));
        check!(store.remove::<usize>("attempts") == Some(2));
    }

    #[test]
    fn store_keys_are_ordered() {
        let mut store = Store::new();
        store.set("b", 1_u8);
        store.set("a", 2_u8);
        let keys = store.keys().collect::<Vec<_>>();
        check!(keys == vec!["a", "b"]);
    }

    #[test]
    fn context_starts_in_request_phase() {
        let ctx = context();
        check!(ctx.phase() == &Phase::Request);
        check!(ctx.response.is_none());
        check!(ctx.error.is_none());
        check!(ctx.store().is_empty());
    }

    #[test]
    fn branch_gets_a_fresh_store() {
        let mut ctx = context();
        ctx.store_mut().set("marker", 1_u8);
        ctx.error = Some(Error::Timeout);

        let branch = ctx.branch();
        check!(branch.store().is_empty());
        check!(branch.error.is_none());
        check!(branch.request.url().as_str() == ctx.request.url().as_str());
    }
}
