//! Authentication preconditions checked before any network I/O.

use crate::config::{Authentication, RequestOptions};
use crate::error::ApiError;

/// Fail if a required credential is missing. The bearer token is checked
/// first, then the OTP token; each requirement stands on its own.
pub fn validate_auth(options: &RequestOptions, authentication: &Authentication) -> Result<(), ApiError> {
    if options.requires_auth() && authentication.token().is_none() {
        return Err(ApiError::auth_token_required());
    }
    if options.requires_otp() && authentication.otp_token().is_none() {
        return Err(ApiError::otp_token_required());
    }
    Ok(())
}
