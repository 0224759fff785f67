// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

#[derive(Clone, Debug)]
enum Reply {
    Json(u16, String),
    /// Answer with the request body, the way the API server returns a written object
    Echo(u16),
}

/// A request the mock has served
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Default)]
struct MockState {
    replies: HashMap<(String, String), VecDeque<Reply>>,
    requests: Vec<RecordedRequest>,
}

/// A mock HTTP service that returns predefined responses based on request paths.
///
/// Replies registered for the same method and path are served in order; the
/// last one keeps answering once the queue is drained. Unmatched requests get
/// a 404 Status.
#[derive(Clone, Default)]
pub struct MockService {
    state: Arc<Mutex<MockState>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, method: &str, path: &str, reply: Reply) -> Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.push("GET", path, Reply::Json(status, body.to_string()))
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.push("POST", path, Reply::Json(status, body.to_string()))
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.push("PUT", path, Reply::Json(status, body.to_string()))
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.push("DELETE", path, Reply::Json(status, body.to_string()))
    }

    /// Accept creates on a collection path and return the submitted object
    pub fn echo_post(self, path: &str) -> Self {
        self.push("POST", path, Reply::Echo(201))
    }

    /// Accept replaces on an object path and return the submitted object
    pub fn echo_put(self, path: &str) -> Self {
        self.push("PUT", path, Reply::Echo(200))
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// Requests served so far for the given method and path, oldest first
    pub fn requests(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    /// Every write (POST, PUT, PATCH, DELETE) served so far
    pub fn writes(&self) -> Vec<RecordedRequest> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.method != "GET")
            .cloned()
            .collect()
    }

    fn next_reply(&self, method: &str, path: &str) -> Option<Reply> {
        let mut state = self.state.lock().unwrap();
        let queue = state.replies.get_mut(&(method.to_string(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn record(&self, request: RecordedRequest) {
        self.state.lock().unwrap().requests.push(request);
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mock = self.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let method = parts.method.to_string();
            let path = parts.uri.path().to_string();
            let bytes: Bytes = body
                .collect()
                .await
                .map_err(|e| -> tower::BoxError { Box::new(e) })?
                .to_bytes();

            mock.record(RecordedRequest {
                method: method.clone(),
                path: path.clone(),
                body: serde_json::from_slice(&bytes).ok(),
            });

            let (status, payload) = match mock.next_reply(&method, &path) {
                Some(Reply::Json(status, body)) => (status, body.into_bytes()),
                Some(Reply::Echo(status)) => (status, bytes.to_vec()),
                None => (404, not_found_json("resource", &path).into_bytes()),
            };

            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(payload))
                .unwrap())
        })
    }
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str, resource_version: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid",
            "resourceVersion": resource_version
        }
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", &format!("{} \"{}\" not found", resource, name))
}

/// Create a 409 conflict response
pub fn conflict_json(name: &str) -> String {
    status_json(
        409,
        "Conflict",
        &format!(
            "Operation cannot be fulfilled on \"{}\": the object has been modified",
            name
        ),
    )
}

pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}
