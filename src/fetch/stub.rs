use async_trait::async_trait;
use std::sync::Mutex;

use super::client::HttpClient;

/// Answers every request with a fixed status and body and remembers the last
/// URL it was asked for.
pub(crate) struct StubClient {
    status: u16,
    body: &'static str,
    last_url: Mutex<Option<reqwest::Url>>,
}

impl StubClient {
    pub(crate) fn new(status: u16, body: &'static str) -> Self {
        Self {
            status,
            body,
            last_url: Mutex::new(None),
        }
    }

    pub(crate) fn last_url(&self) -> Option<reqwest::Url> {
        self.last_url.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for StubClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        *self.last_url.lock().unwrap() = Some(req.url().clone());

        let response = http::Response::builder()
            .status(self.status)
            .body(self.body)
            .unwrap();
        Ok(reqwest::Response::from(response))
    }
}
