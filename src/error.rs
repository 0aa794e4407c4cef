// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `wled_bridge` library.
//!
//! Errors are split by the layer that produces them:
//!
//! - [`ApiError`] comes out of the API client adapter and only ever says
//!   "the device did not answer" or "the device answered nonsense".
//! - [`ValueError`] is raised by the command translator before any network
//!   call is made.
//! - [`ConfigError`] describes configuration input that could not be used.
//! - [`Error`] is what every public operation returns. Its `Display` output
//!   names the device and the failure kind so hosts can show it verbatim.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The device could not be reached (timeout or connection failure).
    #[error("{address} is unreachable: {reason}")]
    Unreachable {
        /// Address that was contacted.
        address: String,
        /// Transport-level description of the failure.
        reason: String,
    },

    /// The device answered with an unexpected payload.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The caller supplied a value the device cannot accept.
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] ValueError),

    /// The device is known to be offline; no request was attempted.
    #[error("device '{device}' is offline")]
    DeviceOffline {
        /// Name of the offline device.
        device: String,
    },

    /// No device with this name is registered.
    #[error("device '{0}' not found")]
    DeviceNotFound(String),

    /// A device with this name is already registered.
    #[error("device '{0}' already exists")]
    DuplicateDevice(String),

    /// Configuration input could not be used.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Returns the failure category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreachable { .. } => ErrorKind::Unreachable,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::DeviceOffline { .. } => ErrorKind::DeviceOffline,
            Self::DeviceNotFound(_) => ErrorKind::DeviceNotFound,
            Self::DuplicateDevice(_) => ErrorKind::DuplicateDevice,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Creates a device offline error.
    #[must_use]
    pub fn offline(device: impl Into<String>) -> Self {
        Self::DeviceOffline {
            device: device.into(),
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unreachable { address, reason } => Self::Unreachable { address, reason },
            ApiError::Protocol(e) => Self::Protocol(e),
        }
    }
}

/// Stable failure categories, suitable for host status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    /// Transport failure or timeout.
    Unreachable,
    /// Malformed or unexpected payload.
    Protocol,
    /// Out-of-catalog or out-of-range value.
    InvalidParameter,
    /// Device already known to be unreachable.
    DeviceOffline,
    /// Unknown device name.
    DeviceNotFound,
    /// Device name already taken.
    DuplicateDevice,
    /// Unusable configuration.
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unreachable => "unreachable",
            Self::Protocol => "protocol error",
            Self::InvalidParameter => "invalid parameter",
            Self::DeviceOffline => "device offline",
            Self::DeviceNotFound => "device not found",
            Self::DuplicateDevice => "duplicate device",
            Self::Config => "configuration error",
        };
        f.write_str(s)
    }
}

/// Errors returned by the API client adapter.
///
/// The adapter never retries; callers decide what an error means for them.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Timeout or connection failure.
    #[error("{address} is unreachable: {reason}")]
    Unreachable {
        /// Address that was contacted.
        address: String,
        /// Transport-level description of the failure.
        reason: String,
    },

    /// The device answered, but not with what was expected.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ApiError {
    /// Creates an unreachable error.
    #[must_use]
    pub fn unreachable(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for transport failures.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// Errors related to the content of device responses.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The device answered with a non-success HTTP status.
    #[error("HTTP {code}")]
    Status {
        /// The HTTP status code.
        code: u16,
    },

    /// The body was not the JSON document we expected.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The device acknowledged the request with `"success": false`.
    #[error("request rejected by device")]
    Rejected,

    /// A field the payload must carry was absent.
    #[error("missing field in response: {0}")]
    MissingField(&'static str),
}

/// Errors related to command parameter validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },

    /// The effect code is not in the device catalog.
    #[error("effect {0} is not in the catalog")]
    UnknownEffect(u16),

    /// The palette code is not in the device catalog.
    #[error("palette {0} is not in the catalog")]
    UnknownPalette(u16),

    /// The preset code is not in the device catalog.
    #[error("preset {0} is not in the catalog")]
    UnknownPreset(u16),

    /// The playlist code is not in the device catalog.
    #[error("playlist {0} is not in the catalog")]
    UnknownPlaylist(u16),

    /// A hex color string could not be parsed.
    #[error("invalid hex color: {0}")]
    InvalidHexColor(String),
}

/// Errors related to configuration input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A device entry could not be parsed.
    #[error("malformed device entry '{entry}': {reason}")]
    MalformedEntry {
        /// The offending entry as written.
        entry: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Document(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 0,
            max: 100,
            actual: 150,
        };
        assert_eq!(err.to_string(), "value 150 is out of range [0, 100]");
    }

    #[test]
    fn offline_error_names_device() {
        let err = Error::offline("kitchen");
        assert_eq!(err.to_string(), "device 'kitchen' is offline");
        assert_eq!(err.kind(), ErrorKind::DeviceOffline);
    }

    #[test]
    fn api_unreachable_converts_to_error() {
        let err: Error = ApiError::unreachable("10.0.0.2", "timed out").into();
        assert_eq!(err.kind(), ErrorKind::Unreachable);
        assert_eq!(err.to_string(), "10.0.0.2 is unreachable: timed out");
    }

    #[test]
    fn api_protocol_converts_to_error() {
        let err: Error = ApiError::Protocol(ProtocolError::Status { code: 500 }).into();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::Status { code: 500 })
        ));
    }

    #[test]
    fn invalid_parameter_from_value_error() {
        let err: Error = ValueError::UnknownEffect(999).into();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert_eq!(
            err.to_string(),
            "invalid parameter: effect 999 is not in the catalog"
        );
    }
}
