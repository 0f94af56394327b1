use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::http::{Body, HttpRequest, HttpResponse, Transport, TransportError};

/// In-memory transport that records every request and plays back scripted
/// outcomes in order.
///
/// In echo mode every request is answered with `200` and the request's JSON
/// body (or `null`) as the response body.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<State>,
    echo: bool,
}

#[derive(Debug, Default)]
struct State {
    outcomes: VecDeque<Result<HttpResponse, TransportError>>,
    requests: Vec<HttpRequest>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    pub fn push_response(&self, response: HttpResponse) {
        self.state().outcomes.push_back(Ok(response));
    }

    pub fn push_error(&self, error: TransportError) {
        self.state().outcomes.push_back(Err(error));
    }

    /// Number of round trips attempted so far.
    pub fn call_count(&self) -> usize {
        self.state().requests.len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state().requests.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), async_trait(?Send))]
#[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), async_trait)]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.state();
        let echoed = match &request.body {
            Some(Body::Json(text)) => text.clone(),
            _ => "null".to_string(),
        };
        state.requests.push(request);

        if self.echo {
            return Ok(HttpResponse::new(200)
                .with_header("content-type", "application/json")
                .with_body(echoed));
        }
        state.outcomes.pop_front().unwrap_or_else(|| {
            Err(TransportError::Other(
                "mock transport has no scripted outcome left".to_string(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::types::Headers;

    fn request(body: Option<Body>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            url: "http://mock/echo".to_string(),
            headers: Headers::new(),
            body,
            mode: None,
        }
    }

    #[tokio::test]
    async fn plays_back_outcomes_in_order_then_errors() {
        let transport = MockTransport::new();
        transport.push_response(HttpResponse::new(201));
        transport.push_error(TransportError::Timeout);

        assert_eq!(transport.send(request(None)).await.unwrap().status, 201);
        assert_eq!(transport.send(request(None)).await.unwrap_err(), TransportError::Timeout);
        assert!(matches!(
            transport.send(request(None)).await,
            Err(TransportError::Other(_))
        ));
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn echo_mode_returns_request_body() {
        let transport = MockTransport::echo();
        let response = transport
            .send(request(Some(Body::Json(r#"{"a":1}"#.to_string()))))
            .await
            .unwrap();
        assert_eq!(response.body, r#"{"a":1}"#);

        let response = transport.send(request(None)).await.unwrap();
        assert_eq!(response.body, "null");
    }
}
