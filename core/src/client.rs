//! Browser-oriented client facade.
//!
//! # Design
//! A facade owns a `ClientConfig` and a shared `Transport`. Verb methods
//! take `&self` and snapshot the configuration into a fresh
//! `RequestContext` per call; setters take `&mut self`, so configuration can
//! only change between calls, never under an in-flight request.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::adapter::RuntimeKind;
use crate::config::{Authentication, ClientConfig, RequestOptions};
use crate::error::ApiError;
use crate::format::merge_headers;
use crate::http::{HttpMethod, Transport};
use crate::processor::{process_request, RequestContext, RequestInput, RetryObserver};
use crate::types::{ApiResponse, Headers};

/// Configuration and transport shared by both facades.
#[derive(Clone)]
pub(crate) struct ClientCore {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    runtime: RuntimeKind,
    on_retry: Option<RetryObserver>,
}

impl ClientCore {
    pub(crate) fn new(config: ClientConfig, transport: Arc<dyn Transport>, runtime: RuntimeKind) -> Self {
        Self {
            config,
            transport,
            runtime,
            on_retry: None,
        }
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn set_on_retry(&mut self, observer: RetryObserver) {
        self.on_retry = Some(observer);
    }

    pub(crate) fn set_authentication(&mut self, authentication: Authentication) {
        self.config.authentication = authentication;
    }

    pub(crate) fn set_headers(&mut self, headers: &Headers) {
        self.config.headers = merge_headers(&self.config.headers, headers);
    }

    pub(crate) fn set_base_url(&mut self, base_url: String) {
        self.config.base_url = base_url;
    }

    pub(crate) fn set_options(&mut self, options: RequestOptions) {
        self.config.options = options;
    }

    fn context(&self, method: HttpMethod, url: &str) -> RequestContext {
        RequestContext {
            method,
            path: url.to_string(),
            base_url: self.config.base_url.clone(),
            default_headers: self.config.headers.clone(),
            default_options: self.config.options.clone(),
            default_authentication: self.config.authentication.clone(),
            runtime: self.runtime,
            on_retry: self.on_retry.clone(),
        }
    }

    pub(crate) async fn perform<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        url: &str,
        input: RequestInput,
    ) -> Result<ApiResponse<T>, ApiError> {
        let context = self.context(method, url);
        process_request(self.transport.as_ref(), &context, &input).await
    }
}

/// Constructors, setters and verb methods shared by both facades. The
/// facade must be a struct with a single `core: ClientCore` field; `$runtime`
/// is the `RuntimeKind` its calls are adapted for.
macro_rules! facade_methods {
    ($runtime:expr) => {
        pub fn new(
            config: $crate::config::ClientConfig,
            transport: impl $crate::http::Transport + 'static,
        ) -> Self {
            Self::with_shared_transport(config, ::std::sync::Arc::new(transport))
        }

        pub fn with_shared_transport(
            config: $crate::config::ClientConfig,
            transport: ::std::sync::Arc<dyn $crate::http::Transport>,
        ) -> Self {
            Self {
                core: $crate::client::ClientCore::new(config, transport, $runtime),
            }
        }

        /// Client over a default `ReqwestTransport`.
        pub fn with_reqwest(
            config: $crate::config::ClientConfig,
        ) -> Result<Self, $crate::http::TransportError> {
            Ok(Self::new(config, $crate::transport::ReqwestTransport::new()?))
        }

        /// Observer called before every retry, in addition to the `warn!` log.
        pub fn on_retry(
            mut self,
            observer: impl Fn(u32, &$crate::retry::AttemptFailure) + Send + Sync + 'static,
        ) -> Self {
            self.core.set_on_retry(::std::sync::Arc::new(observer));
            self
        }

        pub fn config(&self) -> &$crate::config::ClientConfig {
            self.core.config()
        }

        /// Replace the default authentication.
        pub fn set_authentication(&mut self, authentication: $crate::config::Authentication) {
            self.core.set_authentication(authentication);
        }

        /// Shallow-merge `headers` into the default headers.
        pub fn set_headers(&mut self, headers: $crate::types::Headers) {
            self.core.set_headers(&headers);
        }

        pub fn set_base_url(&mut self, base_url: impl Into<String>) {
            self.core.set_base_url(base_url.into());
        }

        /// Replace the default request options.
        pub fn set_options(&mut self, options: $crate::config::RequestOptions) {
            self.core.set_options(options);
        }

        pub async fn get<T: ::serde::de::DeserializeOwned>(
            &self,
            url: &str,
            input: $crate::processor::RequestInput,
        ) -> Result<$crate::types::ApiResponse<T>, $crate::error::ApiError> {
            self.core.perform($crate::http::HttpMethod::Get, url, input).await
        }

        pub async fn post<T: ::serde::de::DeserializeOwned>(
            &self,
            url: &str,
            input: $crate::processor::RequestInput,
        ) -> Result<$crate::types::ApiResponse<T>, $crate::error::ApiError> {
            self.core.perform($crate::http::HttpMethod::Post, url, input).await
        }

        pub async fn put<T: ::serde::de::DeserializeOwned>(
            &self,
            url: &str,
            input: $crate::processor::RequestInput,
        ) -> Result<$crate::types::ApiResponse<T>, $crate::error::ApiError> {
            self.core.perform($crate::http::HttpMethod::Put, url, input).await
        }

        pub async fn patch<T: ::serde::de::DeserializeOwned>(
            &self,
            url: &str,
            input: $crate::processor::RequestInput,
        ) -> Result<$crate::types::ApiResponse<T>, $crate::error::ApiError> {
            self.core.perform($crate::http::HttpMethod::Patch, url, input).await
        }

        pub async fn delete<T: ::serde::de::DeserializeOwned>(
            &self,
            url: &str,
            input: $crate::processor::RequestInput,
        ) -> Result<$crate::types::ApiResponse<T>, $crate::error::ApiError> {
            self.core.perform($crate::http::HttpMethod::Delete, url, input).await
        }

        pub async fn request<T: ::serde::de::DeserializeOwned>(
            &self,
            method: $crate::http::HttpMethod,
            url: &str,
            input: $crate::processor::RequestInput,
        ) -> Result<$crate::types::ApiResponse<T>, $crate::error::ApiError> {
            self.core.perform(method, url, input).await
        }
    };
}

pub(crate) use facade_methods;

/// Client facade for browser-like runtimes. The fetch `mode` of a call is
/// forwarded when running in a browser and dropped elsewhere.
#[derive(Clone)]
pub struct ApiClient {
    core: ClientCore,
}

impl ApiClient {
    facade_methods!(RuntimeKind::detect());
}
