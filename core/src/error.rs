//! Error types for the request pipeline.
//!
//! # Design
//! Every failure surfaces as a single `ApiError` shaped like the wire error
//! object `{message, status?, code?, data?}`. Callers branch on `code` for
//! precondition failures and on `status` for HTTP failures. Network-level
//! failures keep `code == None` and expose the transport error through
//! `source()` instead of being re-coded.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::http::TransportError;

/// Machine-readable failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// `requiredAuth` was set but no bearer token was supplied.
    AuthTokenRequired,
    /// `requiredOtp` was set but no OTP token was supplied.
    OtpTokenRequired,
    /// The round trip completed with a non-2xx status.
    HttpError,
    /// A 2xx response body could not be decoded as the requested type.
    InvalidResponse,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::AuthTokenRequired => "AUTH_TOKEN_REQUIRED",
            ErrorCode::OtpTokenRequired => "OTP_TOKEN_REQUIRED",
            ErrorCode::HttpError => "HTTP_ERROR",
            ErrorCode::InvalidResponse => "INVALID_RESPONSE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed failure returned by every fallible pipeline operation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    status: Option<u16>,
    code: Option<ErrorCode>,
    data: Option<Value>,
    #[source]
    source: Option<TransportError>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
            data: None,
            source: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub(crate) fn auth_token_required() -> Self {
        Self::new("Required Token")
            .with_status(401)
            .with_code(ErrorCode::AuthTokenRequired)
    }

    pub(crate) fn otp_token_required() -> Self {
        Self::new("Required OTP Token")
            .with_status(401)
            .with_code(ErrorCode::OtpTokenRequired)
    }

    /// Non-2xx response. The message embeds the status and reason phrase.
    pub(crate) fn http(status: u16, status_text: &str) -> Self {
        Self::new(format!("HTTP {status}: {status_text}"))
            .with_status(status)
            .with_code(ErrorCode::HttpError)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// The transport failure behind a network-level error, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        self.source.as_ref()
    }

    /// True for validation failures raised before any network I/O.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self.code,
            Some(ErrorCode::AuthTokenRequired | ErrorCode::OtpTokenRequired)
        )
    }
}

/// Transport failures that were not retried, or that exhausted their retries,
/// propagate with their own message and no code.
impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        Self {
            message: err.to_string(),
            status: None,
            code: None,
            data: None,
            source: Some(err),
        }
    }
}

impl Serialize for ApiError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 1
            + usize::from(self.status.is_some())
            + usize::from(self.code.is_some())
            + usize::from(self.data.is_some());
        let mut state = serializer.serialize_struct("ApiError", len)?;
        state.serialize_field("message", &self.message)?;
        if let Some(status) = self.status {
            state.serialize_field("status", &status)?;
        }
        if let Some(code) = self.code {
            state.serialize_field("code", &code)?;
        }
        if let Some(data) = &self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}
