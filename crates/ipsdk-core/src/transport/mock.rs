//! In-memory transport for unit tests
//!
//! Replays queued results in order and records every request it receives.
//! Once the queue is drained it answers `200 OK` with an empty JSON object.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{AsyncTransport, Transport, TransportRequest};
use crate::error::Result;
use crate::http::Response;

/// Shared view of the requests a [`MockTransport`] has seen
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestLog(Arc<Mutex<Vec<TransportRequest>>>);

impl RequestLog {
    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[derive(Default)]
pub(crate) struct MockTransport {
    queue: Mutex<VecDeque<Result<Response>>>,
    log: RequestLog,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, response: Response) -> Self {
        self.queue.lock().unwrap().push_back(Ok(response));
        self
    }

    pub(crate) fn fail(self, err: crate::Error) -> Self {
        self.queue.lock().unwrap().push_back(Err(err));
        self
    }

    pub(crate) fn log(&self) -> RequestLog {
        self.log.clone()
    }

    fn next(&self, request: &TransportRequest) -> Result<Response> {
        self.log.0.lock().unwrap().push(request.clone());
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Response::new(200, "{}")))
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &TransportRequest) -> Result<Response> {
        self.next(request)
    }
}

#[async_trait]
impl AsyncTransport for MockTransport {
    async fn execute(&self, request: &TransportRequest) -> Result<Response> {
        self.next(request)
    }
}
