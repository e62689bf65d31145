//! In-memory transport for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{check_success, Payload, Transport};
use crate::error::Result;

#[derive(Debug, Default)]
struct FakeState {
    requests: Vec<(String, Payload)>,
    responses: VecDeque<Result<Value>>,
    landings: VecDeque<Result<String>>,
}

/// Records every request and answers from a queue of canned responses,
/// falling back to `{"success": true}`. Form posts land on queued paths,
/// falling back to the base page.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, body: Value) {
        self.state.lock().unwrap().responses.push_back(Ok(body));
    }

    pub(crate) fn fail(&self, err: crate::error::Error) {
        self.state.lock().unwrap().responses.push_back(Err(err));
    }

    pub(crate) fn land_on(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .landings
            .push_back(Ok(path.to_string()));
    }

    pub(crate) fn fail_form(&self, err: crate::error::Error) {
        self.state.lock().unwrap().landings.push_back(Err(err));
    }

    pub(crate) fn requests(&self) -> Vec<(String, Payload)> {
        self.state.lock().unwrap().requests.clone()
    }

    pub(crate) fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|(path, _)| path).collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn post(&self, path: &str, payload: Payload) -> Result<Value> {
        let next = {
            let mut state = self.state.lock().unwrap();
            state.requests.push((path.to_string(), payload));
            state.responses.pop_front()
        };
        check_success(next.unwrap_or_else(|| Ok(json!({"success": true})))?)
    }

    async fn post_form(&self, path: &str, payload: Payload) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.requests.push((path.to_string(), payload));
        state.landings.pop_front().unwrap_or_else(|| Ok(String::new()))
    }
}
