//! Pure helpers that turn query params, headers and bodies into wire values.

use serde_json::{Number, Value};

use crate::body::RequestBody;
use crate::config::{Authentication, RequestOptions};
use crate::http::Body;
use crate::types::{Headers, QueryParams};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";
pub const OTP_TOKEN: &str = "otp-token";

/// Build a `?`-prefixed query string in insertion order. `null` values are
/// dropped; no surviving params yields `""`.
pub fn format_query_params(params: &QueryParams) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in params {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Number(n) => number_text(n),
            other => other.to_string(),
        };
        serializer.append_pair(key, &text);
        any = true;
    }
    if any {
        format!("?{}", serializer.finish())
    } else {
        String::new()
    }
}

/// Whole floats print without a fraction (`1.0` as `1`, `-0.0` as `0`), the
/// way JavaScript stringifies numbers.
fn number_text(number: &Number) -> String {
    match number.as_f64() {
        Some(f) if number.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f + 0.0),
        _ => number.to_string(),
    }
}

/// Insert or replace a header. Names match case-insensitively and a replaced
/// header keeps its original position.
pub fn set_header(headers: &mut Headers, name: &str, value: impl Into<String>) {
    let existing = headers
        .keys()
        .position(|key| key.eq_ignore_ascii_case(name));
    match existing {
        Some(index) => {
            headers.shift_remove_index(index);
            headers.shift_insert(index, name.to_string(), value.into());
        }
        None => {
            headers.insert(name.to_string(), value.into());
        }
    }
}

/// Overlay `overrides` onto `base`; `overrides` wins on collisions.
pub fn merge_headers(base: &Headers, overrides: &Headers) -> Headers {
    let mut merged = base.clone();
    for (name, value) in overrides {
        set_header(&mut merged, name, value.clone());
    }
    merged
}

/// Final request headers: JSON content type, then caller headers, then the
/// credentials that are both present and required.
pub fn format_headers(
    headers: &Headers,
    authentication: &Authentication,
    options: &RequestOptions,
) -> Headers {
    let mut defaults = Headers::new();
    defaults.insert(CONTENT_TYPE.to_string(), "application/json".to_string());
    let mut formatted = merge_headers(&defaults, headers);

    if let (Some(token), true) = (authentication.token(), options.requires_auth()) {
        set_header(&mut formatted, AUTHORIZATION, format!("Bearer {token}"));
    }
    if let (Some(otp), true) = (authentication.otp_token(), options.requires_otp()) {
        set_header(&mut formatted, OTP_TOKEN, otp);
    }
    formatted
}

/// Falsy JSON values produce no body, multipart forms pass through and any
/// other value becomes its JSON text.
pub fn format_body(body: Option<&RequestBody>) -> Option<Body> {
    match body? {
        RequestBody::Multipart(form) => Some(Body::Multipart(form.clone())),
        RequestBody::Json(value) if is_falsy(value) => None,
        RequestBody::Json(value) => Some(Body::Json(value.to_string())),
    }
}

pub fn is_form_data(body: &RequestBody) -> bool {
    body.is_multipart()
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
