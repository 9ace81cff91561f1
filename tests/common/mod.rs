//! Scripted upstream shared by the integration tests.

#![allow(dead_code)]

use ai_notes_rust::{Upstream, UpstreamFailure};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Replays queued responses in order; once the queue is empty every call succeeds
/// with `{"op": <operation>, "echo": <payload>}`.
#[derive(Default)]
pub struct ScriptedUpstream {
    script: Mutex<VecDeque<Result<Value, UpstreamFailure>>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, Instant)>>,
    payloads: Mutex<Vec<Value>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, response: Result<Value, UpstreamFailure>) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    pub fn then_fail(self, failure: UpstreamFailure) -> Self {
        self.then(Err(failure))
    }

    pub fn then_ok(self, value: Value) -> Self {
        self.then(Ok(value))
    }

    /// Every call to `operation` sleeps for `delay` before answering.
    pub fn with_delay(mut self, operation: &str, delay: Duration) -> Self {
        self.delays.insert(operation.to_string(), delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn operations(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(op, _)| op.clone())
            .collect()
    }

    /// Payloads received, in call order.
    pub fn payloads(&self) -> Vec<Value> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn call(&self, operation: &str, payload: &Value) -> Result<Value, UpstreamFailure> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), Instant::now()));
        self.payloads.lock().unwrap().push(payload.clone());
        if let Some(delay) = self.delays.get(operation) {
            tokio::time::sleep(*delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(json!({ "op": operation, "echo": payload })))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
