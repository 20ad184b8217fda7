//! Prelude module for convenient imports.
//!
//! Re-exports the most commonly used types for easy glob importing:
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::retry::{ConstantBackoff, ExponentialBackoff, RetryLayer};
pub use crate::{
    Chain, Client, ClientConfig, Context, Error, Flow, Group, Matcher, Method, Phase, Plugin,
    Request, RequestBuilder, Response, Result, from_json, to_json,
};
pub use serde::{Deserialize, Serialize};
