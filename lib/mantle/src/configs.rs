//! Typed accessors for the settings mantle itself reads from [`Configs`].
//!
//! Every accessor falls back to its default when the key was never set, so a
//! fresh [`Configs`] is always usable.
//!
//! | accessor | default |
//! |---|---|
//! | [`ConfigsExt::body_encoder`] | [`JsonEncoder`] |
//! | [`ConfigsExt::body_decoder`] | [`JsonDecoder`] |
//! | [`ConfigsExt::log_level`] | [`LogLevel::Info`] |
//! | [`ConfigsExt::logging_components`] | [`LoggingComponents::STANDARD`] |
//! | [`ConfigsExt::auth_enabled`] | `true` |
//! | [`ConfigsExt::valid_status`] | `200..300` |
//!
//! Applications add their own settings the same way: declare a `static`
//! [`ConfigKey`] and, if they like, an extension trait over [`Configs`].

use std::ops::Range;
use std::sync::Arc;

use mantle_core::{ConfigKey, Configs, ContentEncoder, DataDecoder, JsonDecoder, JsonEncoder};

use crate::middleware::{LogLevel, LoggingComponents};

/// Encoder for request bodies.
pub static BODY_ENCODER: ConfigKey<Arc<dyn ContentEncoder>> = ConfigKey::new("body_encoder");

/// Decoder for response bodies.
pub static BODY_DECODER: ConfigKey<Arc<dyn DataDecoder>> = ConfigKey::new("body_decoder");

/// Level of the logging middleware events.
pub static LOG_LEVEL: ConfigKey<LogLevel> = ConfigKey::new("log_level");

/// Parts of the exchange the logging middleware reports.
pub static LOGGING_COMPONENTS: ConfigKey<LoggingComponents> = ConfigKey::new("logging_components");

/// Whether auth middleware decorates requests.
pub static AUTH_ENABLED: ConfigKey<bool> = ConfigKey::new("auth_enabled");

/// Status codes accepted by validating response shapes.
pub static VALID_STATUS: ConfigKey<Range<u16>> = ConfigKey::new("valid_status");

/// Default accepted status range.
pub const DEFAULT_VALID_STATUS: Range<u16> = 200..300;

/// Typed, defaulted reads of mantle's own settings.
pub trait ConfigsExt {
    /// Request body encoder.
    fn body_encoder(&self) -> Arc<dyn ContentEncoder>;

    /// Response body decoder.
    fn body_decoder(&self) -> Arc<dyn DataDecoder>;

    /// Logging level.
    fn log_level(&self) -> LogLevel;

    /// Logged components.
    fn logging_components(&self) -> LoggingComponents;

    /// Auth toggle.
    fn auth_enabled(&self) -> bool;

    /// Accepted status codes.
    fn valid_status(&self) -> Range<u16>;
}

impl ConfigsExt for Configs {
    fn body_encoder(&self) -> Arc<dyn ContentEncoder> {
        self.get(&BODY_ENCODER)
            .cloned()
            .unwrap_or_else(|| Arc::new(JsonEncoder))
    }

    fn body_decoder(&self) -> Arc<dyn DataDecoder> {
        self.get(&BODY_DECODER)
            .cloned()
            .unwrap_or_else(|| Arc::new(JsonDecoder))
    }

    fn log_level(&self) -> LogLevel {
        self.get_or(&LOG_LEVEL, LogLevel::Info)
    }

    fn logging_components(&self) -> LoggingComponents {
        self.get_or(&LOGGING_COMPONENTS, LoggingComponents::STANDARD)
    }

    fn auth_enabled(&self) -> bool {
        self.get_or(&AUTH_ENABLED, true)
    }

    fn valid_status(&self) -> Range<u16> {
        self.get_or(&VALID_STATUS, DEFAULT_VALID_STATUS)
    }
}
