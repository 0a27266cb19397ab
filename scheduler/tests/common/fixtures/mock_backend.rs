//! Mock HTTP backend for exercising the HTTP handler
//!
//! Wraps a wiremock server so tests can script responses and then
//! inspect what the handler actually sent.

use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

pub struct MockBackend {
    pub server: MockServer,
    pub base_url: String,
}

impl MockBackend {
    /// Start a new mock backend
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Answer `verb endpoint` with a fixed status and body
    pub async fn respond(&self, verb: &str, endpoint: &str, status: u16, body: &str) {
        Mock::given(method(verb))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Answer after a delay, for timeout tests
    pub async fn respond_slowly(&self, endpoint: &str, delay: std::time::Duration) {
        Mock::given(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}
