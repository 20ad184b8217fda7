//! Core types for the courier HTTP request pipeline.
//!
//! This crate provides the middleware dispatch engine and its vocabulary:
//! - [`Context`] - mutable per-attempt state (request, response, error, store)
//! - [`Flow`] - the continuation verdict a plugin returns (next/stop/fail)
//! - [`Plugin`] - one dispatch step
//! - [`Chain`] - the ordered, phase-scoped dispatcher
//! - [`Matcher`] and [`Group`] - conditional plugin composition
//! - [`Phase`] - request lifecycle stages
//! - [`Request`], [`Response`], [`Error`] - the data the pipeline moves
//! - [`Transport`] - the boundary to the socket-level HTTP client
//!
//! The `courier` crate builds a client, transport, and retry subsystem on
//! top of these types.

mod body;
mod chain;
mod context;
mod error;
mod matcher;
mod method;
mod phase;
mod plugin;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use body::{from_json, to_json};
pub use chain::{Chain, ChainOutcome, Group};
pub use context::{Context, Store};
pub use error::{Error, Result};
pub use matcher::Matcher;
pub use method::Method;
pub use phase::Phase;
pub use plugin::{Flow, Plugin};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use transport::Transport;
