//! Scripted in-memory transport for unit tests

use crate::http::{HttpRequest, HttpResponse, Method, Transport};
use crate::{Error, Result};
use std::cell::RefCell;
use std::collections::VecDeque;

/// What the transport saw for one request
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub username: Option<String>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Answers requests with canned responses, in order
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<HttpResponse>>,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = HttpResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into_iter().collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.url.clone()).collect()
    }

    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest<'_>) -> Result<HttpResponse> {
        self.requests.borrow_mut().push(RecordedRequest {
            method: request.method,
            url: request.url.to_string(),
            headers: request.headers.clone(),
            form: request.form.clone(),
            username: request.credentials.map(|c| c.username().to_string()),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::http(request.url.as_str(), "no scripted response left"))
    }
}

pub fn json(status: u16, value: &serde_json::Value) -> HttpResponse {
    HttpResponse::new(status)
        .with_header("Content-Type", "application/json")
        .with_body(value.to_string())
}

pub fn console_chunk(text: &str, next_offset: u64) -> HttpResponse {
    HttpResponse::new(200)
        .with_header("Content-Length", text.len().to_string())
        .with_header("X-Text-Size", next_offset.to_string())
        .with_body(text)
}

pub fn console_empty(offset: u64) -> HttpResponse {
    HttpResponse::new(200)
        .with_header("Content-Length", "0")
        .with_header("X-Text-Size", offset.to_string())
}
