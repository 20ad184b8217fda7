//! Convenience re-exports for building pipelines.

pub use crate::{
    Chain, ChainOutcome, Context, Error, Flow, Group, Matcher, Method, Phase, Plugin, Request,
    RequestBuilder, Response, Result, Store, Transport,
};
