//! Layered HTTP client for Rust.
//!
//! A [`Client`] is an immutable request template (base URL, default headers),
//! a typed [`Configs`] snapshot and an ordered stack of [`Middleware`] around a
//! [`Transport`]. Every builder method derives a new client, so a base client
//! can be specialized per API area without touching the original.
//!
//! # Example
//!
//! ```no_run
//! use mantle::prelude::*;
//! use mantle::middleware::Credentials;
//!
//! #[derive(Debug, Deserialize)]
//! pub struct Pet {
//!     id: u64,
//!     name: String,
//! }
//!
//! # async fn run() -> mantle::Result<()> {
//! let petstore = Client::hyper("https://petstore.example/v2")?
//!     .auth(Credentials::bearer("my-token"))
//!     .with_logging();
//!
//! let pet: Pet = petstore.fetch(Endpoint::get("pet/42")).await?;
//! petstore.send(Endpoint::delete("pet/42")).await?;
//! # let _ = pet;
//! # Ok(())
//! # }
//! ```
//!
//! See [`middleware`] for the bundled interceptors.

mod client;
#[cfg(feature = "middleware-compression")]
pub mod codec;
mod coders;
pub mod configs;
mod endpoint;
pub mod middleware;
pub mod prelude;
pub mod shape;
pub mod transport;

pub use client::Client;
pub use coders::UnwrapField;
pub use configs::ConfigsExt;
pub use endpoint::Endpoint;
pub use shape::{Decodable, Raw, ResponseShape, Text, Void};
pub use transport::{HyperTransport, HyperTransportBuilder, TransportConfig, TransportConfigBuilder};

// Re-export tower for transport layers
pub use tower;

// Re-export core types
pub use mantle_core::{
    Body, ChainFuture, ConfigKey, Configs, ContentEncoder, ContentType, DataDecoder, Error,
    FormEncoder, JsonDecoder, JsonEncoder, Method, Middleware, MiddlewareChain, MiddlewareStack,
    Next, Request, RequestBuilder, Response, Result, StatusCode, Transport, header,
};
