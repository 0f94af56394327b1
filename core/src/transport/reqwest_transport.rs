use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Url};
use tracing::debug;

use crate::body::{FormData, FormField};
use crate::format::CONTENT_TYPE;
use crate::http::{Body, HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};

/// `Transport` backed by a shared `reqwest::Client`.
///
/// Pooling, TLS and the optional timeout are reqwest's; this type only maps
/// plain-data requests and responses onto it.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    pub fn new() -> Result<Self, TransportError> {
        Self::builder().build()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

#[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), async_trait(?Send))]
#[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), async_trait)]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = Url::parse(&request.url)
            .map_err(|e| TransportError::InvalidRequest(format!("{e}: {}", request.url)))?;
        let multipart = matches!(request.body, Some(Body::Multipart(_)));

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url);

        for (name, value) in &request.headers {
            // reqwest writes the multipart content type with its boundary.
            if multipart && name.eq_ignore_ascii_case(CONTENT_TYPE) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        #[cfg(target_arch = "wasm32")]
        {
            if request.mode == Some(crate::http::RequestMode::NoCors) {
                builder = builder.fetch_mode_no_cors();
            }
        }

        builder = match request.body {
            Some(Body::Json(text)) => builder.body(text),
            Some(Body::Multipart(form)) => builder.multipart(build_form(form)?),
            None => builder,
        };

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        debug!(status = status.as_u16(), bytes = body.len(), "reqwest round trip complete");

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn build_form(form: FormData) -> Result<Form, TransportError> {
    let mut multipart = Form::new();
    for field in form.fields() {
        match field {
            FormField::Text { name, value } => {
                multipart = multipart.text(name.clone(), value.clone());
            }
            FormField::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                let mut part = Part::bytes(bytes.clone()).file_name(file_name.clone());
                if let Some(content_type) = content_type {
                    part = part.mime_str(content_type).map_err(|e| {
                        TransportError::InvalidRequest(format!("invalid MIME type {content_type}: {e}"))
                    })?;
                }
                multipart = multipart.part(name.clone(), part);
            }
        }
    }
    Ok(multipart)
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }
    if err.is_builder() {
        return TransportError::InvalidRequest(err.to_string());
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        if err.is_connect() {
            return connect_error(&err);
        }
    }
    if err.is_body() || err.is_decode() {
        return TransportError::Body(err.to_string());
    }
    TransportError::Other(err.to_string())
}

#[cfg(not(target_arch = "wasm32"))]
fn connect_error(err: &reqwest::Error) -> TransportError {
    let lowered = format!("{err:?}").to_lowercase();
    if lowered.contains("dns") || lowered.contains("resolve") || lowered.contains("lookup") {
        let host = err
            .url()
            .and_then(|u| u.host_str())
            .unwrap_or("unknown")
            .to_string();
        return TransportError::Dns {
            host,
            message: err.to_string(),
        };
    }
    TransportError::Connect(err.to_string())
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug, Default)]
pub struct ReqwestTransportBuilder {
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ReqwestTransportBuilder {
    /// Transport-level timeout. The pipeline itself never enforces one.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, TransportError> {
        let mut builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        {
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }
        }
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(ReqwestTransport { client })
    }
}
