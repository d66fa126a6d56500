//! Response shapes: what a call turns the raw response into.
//!
//! The middleware chain always produces a raw [`Response`]. A
//! [`ResponseShape`] runs once the chain has returned and maps that response
//! to the value handed to the caller.
//!
//! | shape | status check | output |
//! |---|---|---|
//! | [`Decodable<T>`] | yes | `T`, through the configured [`DataDecoder`](mantle_core::DataDecoder) |
//! | [`Void`] | yes | `()` |
//! | [`Text`] | yes | `String` |
//! | [`Raw`] | no | [`Response`] |

use std::fmt;
use std::marker::PhantomData;

use http::StatusCode;
use mantle_core::{Configs, Error, Response, Result, from_value};
use serde::de::DeserializeOwned;

use crate::configs::ConfigsExt;

/// Maps the raw response of a call to the caller's value.
pub trait ResponseShape {
    /// Value produced by the call.
    type Output;

    /// Map the response, with the configuration of the client that made the call.
    fn decode(self, response: Response, configs: &Configs) -> Result<Self::Output>;
}

/// Fail with [`Error::Http`] when the status is outside [`ConfigsExt::valid_status`].
pub fn validate_status(response: Response, configs: &Configs) -> Result<Response> {
    let status = response.status();
    if configs.valid_status().contains(&status) {
        return Ok(response);
    }

    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("unexpected status");
    Err(Error::http_with_body(status, reason, response.into_body()))
}

/// Decode the body into `T` with the configured decoder.
pub struct Decodable<T> {
    _output: PhantomData<fn() -> T>,
}

impl<T> Decodable<T> {
    /// Create the shape.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _output: PhantomData,
        }
    }
}

impl<T> Default for Decodable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Decodable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decodable<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned> ResponseShape for Decodable<T> {
    type Output = T;

    fn decode(self, response: Response, configs: &Configs) -> Result<T> {
        let response = validate_status(response, configs)?;
        let value = configs.body_decoder().decode(response.body())?;
        from_value(value)
    }
}

/// Check the status and ignore the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Void;

impl ResponseShape for Void {
    type Output = ();

    fn decode(self, response: Response, configs: &Configs) -> Result<()> {
        validate_status(response, configs).map(drop)
    }
}

/// Check the status and read the body as UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl ResponseShape for Text {
    type Output = String;

    fn decode(self, response: Response, configs: &Configs) -> Result<String> {
        validate_status(response, configs)?.text()
    }
}

/// The response as-is, whatever its status.
#[derive(Debug, Clone, Copy, Default)]
pub struct Raw;

impl ResponseShape for Raw {
    type Output = Response;

    fn decode(self, response: Response, _configs: &Configs) -> Result<Response> {
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use bytes::Bytes;
    use http::HeaderMap;
    use serde::Deserialize;

    use super::*;
    use crate::configs::VALID_STATUS;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Pet {
        id: u64,
        name: String,
    }

    fn response(status: u16, body: &'static str) -> Response {
        let body = Bytes::from_static(body.as_bytes());
        Response::new(status, HeaderMap::new(), body)
    }

    #[test]
    fn decodable_reads_body() {
        let pet = Decodable::<Pet>::new()
            .decode(response(200, r#"{"id":1,"name":"Rex"}"#), &Configs::new())
            .expect("decoded");
        check!(pet.id == 1);
        check!(pet.name == "Rex");
    }

    #[test]
    fn decodable_reports_failing_path() {
        let pets = response(200, r#"[{"id":1,"name":"Rex"},{"id":"two","name":"Tom"}]"#);
        let err = Decodable::<Vec<Pet>>::new()
            .decode(pets, &Configs::new())
            .expect_err("invalid id");

        let_assert!(Error::Decode { path, .. } = err);
        check!(path.contains("id"));
    }

    #[test]
    fn invalid_status_keeps_body() {
        let err = Decodable::<Pet>::new()
            .decode(response(404, r#"{"error":"no such pet"}"#), &Configs::new())
            .expect_err("not found");

        insta::assert_snapshot!(err.to_string(), @"HTTP error 404: Not Found");
        let body = err.body().map(|body| body.to_vec());
        check!(body == Some(br#"{"error":"no such pet"}"#.to_vec()));
    }

    #[test]
    fn valid_status_is_configurable() {
        let configs = Configs::new().with(&VALID_STATUS, 200..500);
        check!(Void.decode(response(404, ""), &configs).is_ok());
        check!(Void.decode(response(500, ""), &configs).is_err());
    }

    #[test]
    fn text_and_raw() {
        let text = Text
            .decode(response(200, "pong"), &Configs::new())
            .expect("text");
        check!(text == "pong");

        let raw = Raw
            .decode(response(503, "down"), &Configs::new())
            .expect("raw");
        check!(raw.status() == 503);
    }

    #[test]
    fn unknown_status_reason() {
        let err = Void
            .decode(response(599, ""), &Configs::new())
            .expect_err("invalid");
        insta::assert_snapshot!(err.to_string(), @"HTTP error 599: unexpected status");
    }
}
