//! The request lifecycle: merge, validate, build, send (with retry), parse.
//!
//! # Design
//! Mirrors the build/parse split of a host-does-IO client. `build_request`
//! turns a `RequestContext` and a `RequestInput` into a wire-ready
//! `HttpRequest` without touching the network, `parse_response` turns an
//! `HttpResponse` into the typed envelope, and `process_request` runs the
//! round trip in between through a `Transport`. Every call builds its own
//! context, so concurrent calls share nothing mutable.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::adapter::{adapt_request, FetchConfig, RuntimeKind};
use crate::auth::validate_auth;
use crate::body::{FormData, RequestBody};
use crate::config::{Authentication, RequestOptions};
use crate::error::{ApiError, ErrorCode};
use crate::format::{format_body, format_headers, format_query_params, merge_headers, set_header};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestMode, Transport};
use crate::retry::{with_retry, AttemptFailure};
use crate::types::{ApiResponse, Headers, QueryParams, ResponseStatus};

const MIN_ATTEMPTS: u32 = 1;

/// Observer invoked before every retry with the retry number and its cause.
pub type RetryObserver = Arc<dyn Fn(u32, &AttemptFailure) + Send + Sync>;

/// Client-side half of a call: method, path and the facade's defaults.
#[derive(Clone)]
pub struct RequestContext {
    pub method: HttpMethod,
    pub path: String,
    pub base_url: String,
    pub default_headers: Headers,
    pub default_options: RequestOptions,
    pub default_authentication: Authentication,
    pub runtime: RuntimeKind,
    pub on_retry: Option<RetryObserver>,
}

impl RequestContext {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            base_url: String::new(),
            default_headers: Headers::new(),
            default_options: RequestOptions::default(),
            default_authentication: Authentication::default(),
            runtime: RuntimeKind::Server,
            on_retry: None,
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .field("default_options", &self.default_options)
            .field("runtime", &self.runtime)
            .field("on_retry", &self.on_retry.is_some())
            .finish_non_exhaustive()
    }
}

/// Call-side half of a call. Every field overrides the matching default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInput {
    pub headers: Headers,
    pub params: QueryParams,
    pub body: Option<RequestBody>,
    pub mode: Option<RequestMode>,
    pub options: RequestOptions,
    pub authentication: Authentication,
}

impl RequestInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        set_header(&mut self.headers, &name, value);
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, serde_json::Error> {
        Ok(self.body(RequestBody::json(value)?))
    }

    pub fn form(self, form: FormData) -> Self {
        self.body(form)
    }

    pub fn mode(mut self, mode: RequestMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = authentication;
        self
    }
}

/// A validated, wire-ready request plus the options it was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub request: HttpRequest,
    pub options: RequestOptions,
}

/// Merge, validate and format. No I/O; fails only on a missing credential.
pub fn build_request(context: &RequestContext, input: &RequestInput) -> Result<PreparedRequest, ApiError> {
    let options = context.default_options.merge(&input.options);
    let authentication = context.default_authentication.merge(&input.authentication);

    validate_auth(&options, &authentication)?;

    let url = format!("{}{}", context.url(), format_query_params(&input.params));
    let headers = format_headers(
        &merge_headers(&context.default_headers, &input.headers),
        &authentication,
        &options,
    );
    let body = if context.method.allows_body() {
        format_body(input.body.as_ref())
    } else {
        None
    };

    let request = adapt_request(
        url,
        FetchConfig {
            method: context.method,
            headers,
            body,
            mode: input.mode,
        },
        context.runtime,
    );
    Ok(PreparedRequest { request, options })
}

/// Turn the final response into the typed envelope, or an `HTTP_ERROR`.
pub fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> Result<ApiResponse<T>, ApiError> {
    if !response.is_success() {
        let mut err = ApiError::http(response.status, &response.status_text);
        if let Some(data) = error_payload(&response.body) {
            err = err.with_data(data);
        }
        return Err(err);
    }

    let text = if response.body.trim().is_empty() {
        "null"
    } else {
        response.body.as_str()
    };
    let decoded = serde_json::from_str(text).map_err(|e| {
        ApiError::new(format!("failed to decode response body: {e}"))
            .with_status(response.status)
            .with_code(ErrorCode::InvalidResponse)
    })?;

    Ok(ApiResponse {
        response: decoded,
        status: ResponseStatus::Ok,
        status_code: Some(response.status),
        headers: Some(collect_headers(response.headers)),
    })
}

/// Run one logical request: build it, send it (retrying when configured),
/// then parse the final response.
pub async fn process_request<T: DeserializeOwned>(
    transport: &dyn Transport,
    context: &RequestContext,
    input: &RequestInput,
) -> Result<ApiResponse<T>, ApiError> {
    let PreparedRequest { request, options } = build_request(context, input)?;
    let method = request.method;
    let url = request.url.clone();

    let attempt = {
        let url = url.clone();
        let mut number = 0u32;
        move || {
            number += 1;
            debug!(attempt = number, %method, %url, "sending HTTP request");
            transport.send(request.clone())
        }
    };

    let outcome = match &options.retry {
        Some(retry) => {
            let policy = retry.resolve();
            let observer = context.on_retry.clone();
            with_retry(attempt, &policy, MIN_ATTEMPTS, |number, failure| {
                warn!(retry = number, %method, %url, error = %failure, "retrying request");
                if let Some(observer) = &observer {
                    observer(number, failure);
                }
            })
            .await
        }
        None => {
            let mut attempt = attempt;
            attempt().await
        }
    };

    let response = outcome.map_err(|err| {
        debug!(%method, %url, error = %err, "HTTP request failed");
        ApiError::from(err)
    })?;
    debug!(%method, %url, status = response.status, "received HTTP response");
    parse_response(response)
}

/// Response headers as a plain mapping: lower-case names, repeated names
/// joined with `", "`.
fn collect_headers(pairs: Vec<(String, String)>) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in pairs {
        headers
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    headers
}

fn error_payload(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
}
