//! In-memory transport for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

/// Replays canned results in order and records every request it receives.
/// Once the script runs out every send fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::default(),
        })
    }

    pub fn push(&self, reply: Result<HttpResponse, TransportError>) {
        self.lock_replies().push_back(reply);
    }

    /// Every request sent so far.
    pub fn seen(&self) -> Vec<HttpRequest> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    pub fn sent(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or_default()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<HttpResponse, TransportError>>> {
        self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.clone());
        }
        self.lock_replies()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("script exhausted".to_string())))
    }
}

/// A response with `status` and `body`.
pub fn reply(status: u16, body: &str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status,
        headers: Vec::new(),
        body: body.to_string(),
    })
}

pub fn refused() -> Result<HttpResponse, TransportError> {
    Err(TransportError("connection refused".to_string()))
}
