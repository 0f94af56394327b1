//! Asynchronous HTTP request pipeline with layered configuration.
//!
//! # Overview
//! A client facade ([`ApiClient`] for browser-like runtimes,
//! [`ApiServerClient`] for servers) turns each call into one request
//! lifecycle: client defaults are merged with call overrides, authentication
//! preconditions are checked before any I/O, the request is formatted and
//! adapted to the runtime, sent through a [`Transport`] with optional
//! bounded-backoff retries, and the response is decoded into an
//! [`ApiResponse`] or surfaced as an [`ApiError`].
//!
//! # Design
//! - The network sits behind the `Transport` trait. `ReqwestTransport` is the
//!   production implementation; `MockTransport` scripts outcomes for tests.
//! - `processor::build_request` and `processor::parse_response` are pure, so
//!   request building and response interpretation are testable without I/O.
//! - Every call builds its own `RequestContext`; facades only change
//!   configuration through `&mut self` setters between calls.
//! - No timeout or cancellation is enforced by the pipeline; a transport may
//!   apply its own.

pub mod adapter;
pub mod auth;
pub mod body;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod http;
pub mod processor;
pub mod retry;
pub mod server;
pub mod transport;
pub mod types;

pub use adapter::RuntimeKind;
pub use body::{FormData, FormField, RequestBody};
pub use client::ApiClient;
pub use config::{Authentication, ClientConfig, RequestOptions, RetryConfig, RetryPolicy};
pub use error::{ApiError, ErrorCode};
pub use http::{Body, HttpMethod, HttpRequest, HttpResponse, RequestMode, Transport, TransportError};
pub use processor::{process_request, RequestContext, RequestInput};
pub use retry::{with_retry, AttemptFailure};
pub use server::ApiServerClient;
pub use transport::{MockTransport, ReqwestTransport};
pub use types::{ApiResponse, Headers, QueryParams, ResponseStatus};
