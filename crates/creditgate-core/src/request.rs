//! Caller-supplied idempotency keys.
//!
//! Every reservation is keyed by `(owner, request id)`. The request id is
//! chosen by the caller and validated here once, at the boundary, so the
//! storage layer can treat it as an opaque byte string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a request id, in bytes.
pub const MAX_REQUEST_ID_BYTES: usize = 128;

/// A caller-supplied idempotency key.
///
/// Non-empty, at most [`MAX_REQUEST_ID_BYTES`] bytes. The same
/// `(owner, request id)` pair identifies the same logical reservation across
/// retries: replaying `reserve` with it returns the original hold instead of
/// deducting again.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    /// Create a `RequestId`, validating length bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or longer than
    /// [`MAX_REQUEST_ID_BYTES`] bytes.
    pub fn new(value: impl Into<String>) -> Result<Self, RequestIdError> {
        let value = value.into();
        if value.is_empty() {
            return Err(RequestIdError::Empty);
        }
        if value.len() > MAX_REQUEST_ID_BYTES {
            return Err(RequestIdError::TooLong { length: value.len() });
        }
        Ok(Self(value))
    }

    /// Return the request id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the bytes of the request id.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for RequestId {
    type Err = RequestIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RequestId {
    type Error = RequestIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

/// Errors that can occur when validating a request id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestIdError {
    /// The request id is empty.
    #[error("request id must not be empty")]
    Empty,

    /// The request id exceeds the length bound.
    #[error("request id too long: {length} bytes (max {MAX_REQUEST_ID_BYTES})")]
    TooLong {
        /// Actual length in bytes.
        length: usize,
    },
}
