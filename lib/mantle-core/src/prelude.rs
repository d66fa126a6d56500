//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use mantle_core::prelude::*;
//! ```

pub use crate::{
    Body, ChainFuture, ConfigKey, Configs, ContentEncoder, ContentType, DataDecoder, Error,
    Method, Middleware, MiddlewareChain, Next, Request, RequestBuilder, Response, Result,
    Transport, from_json, to_json,
};
