//! Runtime-specific shaping of the transport call.
//!
//! Browser fetch understands a `mode`; server-side clients reject or ignore
//! it, so the adapter drops it outside the browser.

use crate::http::{Body, HttpMethod, HttpRequest, RequestMode};
use crate::types::Headers;

/// Which kind of runtime the request is issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Browser,
    Server,
}

impl RuntimeKind {
    /// `Browser` only when compiled for the web target, where `window` exists.
    pub fn detect() -> Self {
        if cfg!(all(target_arch = "wasm32", target_os = "unknown")) {
            RuntimeKind::Browser
        } else {
            RuntimeKind::Server
        }
    }

    pub fn is_server(self) -> bool {
        self == RuntimeKind::Server
    }
}

/// Logical description of one call, before runtime adaptation.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub method: HttpMethod,
    pub headers: Headers,
    pub body: Option<Body>,
    pub mode: Option<RequestMode>,
}

pub fn adapt_request(url: String, config: FetchConfig, runtime: RuntimeKind) -> HttpRequest {
    let FetchConfig {
        method,
        headers,
        body,
        mode,
    } = config;
    HttpRequest {
        method,
        url,
        headers,
        body,
        mode: if runtime.is_server() { None } else { mode },
    }
}
