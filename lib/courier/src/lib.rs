//! Plugin-driven HTTP client for Rust.
//!
//! Requests flow through a phase-based plugin chain (request, response,
//! error), a pluggable transport, and optional retry layers wrapping the
//! whole attempt.
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! let client = Client::builder()
//!     .use_request(|ctx: &mut Context| {
//!         ctx.request.set_header("user-agent", "courier/0.1");
//!         Flow::Next
//!     })
//!     .with_retry(3)
//!     .build();
//!
//! let url = url::Url::parse("https://api.example.com/users")?;
//! let response = client.execute(Request::builder(Method::Get, url).build()).await?;
//! let users: Vec<User> = response.json()?;
//! ```

mod client;
mod config;
mod connector;
mod dispatch;
pub mod prelude;
pub mod retry;
mod transport;

// Re-export client types
pub use client::{BoxedService, Client, ClientBuilder, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use transport::{HyperTransport, TransportService};

// Re-export tower for layer composition
pub use tower;

// Re-export core types
pub use courier_core::{
    Chain, ChainOutcome, Context, Error, Flow, Group, Matcher, Method, Phase, Plugin, Request,
    RequestBuilder, Response, Result, Store, Transport, from_json, to_json,
};

pub use url;
