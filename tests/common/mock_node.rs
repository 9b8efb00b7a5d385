//! Mock ConfigNode for testing.
//!
//! Records every call for assertions and can be scripted to fail an
//! operation a number of times (or always).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::Notify;
use wolfsync::client::ConfigNode;
use wolfsync::error::{Error, Result};
use wolfsync::model::{ConfigDocument, PatchConfigRequest, PostTeleporterRequest};

/// Operation kinds, used to script failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Authenticate,
    DeleteSession,
    GetConfig,
    PatchConfig,
    GetTeleporter,
    PostTeleporter,
    RunGravity,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Authenticate,
    DeleteSession,
    GetConfig,
    PatchConfig(PatchConfigRequest),
    GetTeleporter,
    PostTeleporter(Bytes, Option<PostTeleporterRequest>),
    RunGravity,
}

impl Call {
    fn op(&self) -> Op {
        match self {
            Call::Authenticate => Op::Authenticate,
            Call::DeleteSession => Op::DeleteSession,
            Call::GetConfig => Op::GetConfig,
            Call::PatchConfig(_) => Op::PatchConfig,
            Call::GetTeleporter => Op::GetTeleporter,
            Call::PostTeleporter(..) => Op::PostTeleporter,
            Call::RunGravity => Op::RunGravity,
        }
    }
}

/// Mock node that records all calls
pub struct MockNode {
    name: String,
    config: ConfigDocument,
    snapshot: Bytes,
    /// Remaining failures per operation
    failures: Mutex<HashMap<Op, usize>>,
    /// Operation that panics when called
    panic_on: Option<Op>,
    /// Woken (registered waiters only) when the operation is called
    notify_on: Option<(Op, Arc<Notify>)>,
    calls: Mutex<Vec<Call>>,
}

impl MockNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            config: ConfigDocument::default(),
            snapshot: Bytes::from_static(b"PK\x03\x04teleporter"),
            failures: Mutex::new(HashMap::new()),
            panic_on: None,
            notify_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Serve this config document; `value` is the inner `config` object
    pub fn with_config(mut self, value: Value) -> Self {
        match value {
            Value::Object(map) => self.config = ConfigDocument::new(map),
            _ => panic!("config must be an object"),
        }
        self
    }

    /// Fail `op` for its next `times` calls
    pub fn failing(self, op: Op, times: usize) -> Self {
        self.failures.lock().unwrap().insert(op, times);
        self
    }

    /// Fail `op` on every call
    pub fn always_failing(self, op: Op) -> Self {
        self.failing(op, usize::MAX)
    }

    pub fn panicking(mut self, op: Op) -> Self {
        self.panic_on = Some(op);
        self
    }

    /// Wake the waiters of `notify` whenever `op` is called
    pub fn notifying(mut self, op: Op, notify: Arc<Notify>) -> Self {
        self.notify_on = Some((op, notify));
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| c.op() == op).count()
    }

    pub fn patches(&self) -> Vec<PatchConfigRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::PatchConfig(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn teleporter_imports(&self) -> Vec<(Bytes, Option<PostTeleporterRequest>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::PostTeleporter(snapshot, request) => Some((snapshot, request)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> Result<()> {
        let op = call.op();
        self.calls.lock().unwrap().push(call);

        if let Some((_, notify)) = self.notify_on.as_ref().filter(|(on, _)| *on == op) {
            notify.notify_waiters();
        }

        if self.panic_on == Some(op) {
            panic!("{} panicked on {:?}", self.name, op);
        }

        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                Err(Error::Http {
                    node: self.name.clone(),
                    reason: format!("{:?} failed", op),
                })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ConfigNode for MockNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(&self) -> Result<()> {
        self.record(Call::Authenticate)
    }

    async fn delete_session(&self) -> Result<()> {
        self.record(Call::DeleteSession)
    }

    async fn get_config(&self) -> Result<ConfigDocument> {
        self.record(Call::GetConfig)?;
        Ok(self.config.clone())
    }

    async fn patch_config(&self, request: &PatchConfigRequest) -> Result<()> {
        self.record(Call::PatchConfig(request.clone()))
    }

    async fn get_teleporter(&self) -> Result<Bytes> {
        self.record(Call::GetTeleporter)?;
        Ok(self.snapshot.clone())
    }

    async fn post_teleporter(
        &self,
        snapshot: &Bytes,
        request: Option<&PostTeleporterRequest>,
    ) -> Result<()> {
        self.record(Call::PostTeleporter(snapshot.clone(), request.cloned()))
    }

    async fn run_gravity(&self) -> Result<()> {
        self.record(Call::RunGravity)
    }
}
