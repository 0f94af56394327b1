//! Server-oriented client facade.
//!
//! Same pipeline as [`ApiClient`](crate::client::ApiClient), but always
//! treats the runtime as a server: the fetch `mode` is never sent.

use crate::adapter::RuntimeKind;
use crate::client::{facade_methods, ClientCore};

/// HTTP client for server-side code.
///
/// ```no_run
/// use api_core::{ApiServerClient, Authentication, ClientConfig, RequestInput, RequestOptions, RetryConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::new("https://api.example.com")
///     .with_authentication(Authentication::bearer("secret"))
///     .with_options(RequestOptions::default().with_retry(RetryConfig {
///         max_retries: Some(3),
///         retry_delay: Some(1000),
///         ..RetryConfig::default()
///     }));
/// let client = ApiServerClient::with_reqwest(config)?;
/// let users = client.get::<serde_json::Value>("/users", RequestInput::new()).await?;
/// println!("{}", users.response);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiServerClient {
    core: ClientCore,
}

impl ApiServerClient {
    facade_methods!(RuntimeKind::Server);
}
