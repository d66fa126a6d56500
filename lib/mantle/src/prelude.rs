//! Prelude module for convenient imports.
//!
//! ```ignore
//! use mantle::prelude::*;
//! ```

pub use crate::{
    Body, Client, ConfigKey, Configs, ConfigsExt, Decodable, Endpoint, Error, Method, Middleware,
    Next, Raw, Request, Response, Result, StatusCode, Text, Transport, Void, header,
};
pub use serde::{Deserialize, Serialize};
