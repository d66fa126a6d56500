//! Core contracts for the mantle layered HTTP client.
//!
//! This crate provides the transport-agnostic pieces used by mantle:
//! - [`Configs`] and [`ConfigKey`] - Typed, branchable configuration store
//! - [`Middleware`], [`Next`] and [`MiddlewareChain`] - Ordered interceptors around a call
//! - [`MiddlewareStack`] - Persistent list of registered middleware
//! - [`Transport`] - Terminal network call of every chain
//! - [`Request`], [`Body`] and [`Response`] - What flows through the chain
//! - [`ContentEncoder`] and [`DataDecoder`] - Body coders
//! - [`Error`] and [`Result`] - Error handling

mod body;
mod coder;
mod config;
mod error;
pub mod middleware;
pub mod prelude;
mod request;
mod response;
pub mod transport;

pub use body::Body;
pub use coder::{
    ContentEncoder, ContentType, DataDecoder, FormEncoder, JsonDecoder, JsonEncoder, from_json,
    from_value, to_form, to_json, to_query_pairs, to_value,
};
pub use config::{ConfigKey, Configs};
pub use error::{Error, Result};
pub use middleware::{Middleware, MiddlewareChain, MiddlewareStack, Next};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use transport::{ChainFuture, Transport};

// Re-export http crate types for methods, status codes and headers
pub use http::{Method, StatusCode, header};
