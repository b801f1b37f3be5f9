//! Scripted transport for unit tests

use async_trait::async_trait;
use http::Method;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;

use crate::error::{ClientError, ClientResult};
use crate::transport::{ApiRequest, RawResponse, Transport};

enum Scripted {
    Ready(ClientResult<RawResponse>),
    Gated(oneshot::Receiver<ClientResult<RawResponse>>),
}

/// Replays queued responses per `(method, path)` and records every request.
///
/// A gated response suspends the caller until the test releases it, which
/// lets tests choose the completion order of overlapping requests.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.scripts
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        let body = serde_json::to_vec(&body).unwrap();
        self.push(method, path, Scripted::Ready(Ok(RawResponse::new(status, body))));
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: u16, body: &str) {
        self.push(
            method,
            path,
            Scripted::Ready(Ok(RawResponse::new(status, body.as_bytes().to_vec()))),
        );
    }

    pub fn fail(&self, method: Method, path: &str, error: ClientError) {
        self.push(method, path, Scripted::Ready(Err(error)));
    }

    /// Queue a response the test completes later through the returned sender
    pub fn gate(
        &self,
        method: Method,
        path: &str,
    ) -> oneshot::Sender<ClientResult<RawResponse>> {
        let (tx, rx) = oneshot::channel();
        self.push(method, path, Scripted::Gated(rx));
        tx
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

/// JSON response helper for gated sends
pub fn json_response(status: u16, body: serde_json::Value) -> ClientResult<RawResponse> {
    Ok(RawResponse::new(status, serde_json::to_vec(&body).unwrap()))
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<RawResponse> {
        let key = (request.method.clone(), request.path.clone());
        self.requests.lock().push(request);

        let scripted = self.scripts.lock().get_mut(&key).and_then(VecDeque::pop_front);
        match scripted {
            Some(Scripted::Ready(result)) => result,
            Some(Scripted::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(ClientError::Network("gate dropped".into()))),
            None => Err(ClientError::Network(format!(
                "no scripted response for {} {}",
                key.0, key.1
            ))),
        }
    }
}
