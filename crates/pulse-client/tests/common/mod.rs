//! Scripted in-memory transport for connection tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pulse_client::{Connector, Transport, TransportError};
use pulse_types::TransportMode;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

/// One scripted item a transport yields. `None` is a clean close.
pub type Incoming = Option<Result<String, TransportError>>;

/// What the connector does on one connection attempt.
pub enum Step {
    Fail,
    Open(Vec<Incoming>),
}

/// Replays `Step`s in order; once exhausted every attempt fails.
#[derive(Default)]
pub struct ScriptedConnector {
    steps: Mutex<VecDeque<Step>>,
    attempts: Mutex<Vec<Instant>>,
}

impl ScriptedConnector {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::default()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Milliseconds between consecutive connection attempts.
    pub fn gaps_ms(&self) -> Vec<u128> {
        self.attempts
            .lock()
            .unwrap()
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).as_millis())
            .collect()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        _url: &str,
        _mode: TransportMode,
    ) -> Result<Box<dyn Transport>, TransportError> {
        self.attempts.lock().unwrap().push(Instant::now());
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Open(incoming)) => Ok(Box::new(MockTransport {
                incoming: incoming.into(),
            })),
            Some(Step::Fail) | None => Err(TransportError::Closed("connection refused".into())),
        }
    }
}

struct MockTransport {
    incoming: VecDeque<Incoming>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        match self.incoming.pop_front() {
            Some(item) => item,
            // Script delivered; stay open until the manager gives up on us.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub fn frame(value: serde_json::Value) -> Incoming {
    Some(Ok(value.to_string()))
}

/// Yields to the runtime until `done` holds, panicking if it never does.
pub async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
