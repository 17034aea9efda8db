//! In-memory collaborators.
//!
//! These back tests and demos. They behave like the real services closely
//! enough to exercise version conflicts, poll failures and executions that
//! write logs while they run.

use crate::error::ServiceError;
use crate::logs::ExecutionLogEntry;
use crate::service::{
    DefinitionProvider, ExecutionOutcome, ExecutionRequest, ExecutionService, FlowStore, LogSource,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use wireflow_core::FlowId;
use wireflow_workflow::{DefinitionCatalog, PersistedFlow};

/// A fixed definition catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticDefinitions {
    catalog: DefinitionCatalog,
}

impl StaticDefinitions {
    #[must_use]
    pub fn new(catalog: DefinitionCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl DefinitionProvider for StaticDefinitions {
    async fn definitions(&self) -> Result<DefinitionCatalog, ServiceError> {
        Ok(self.catalog.clone())
    }
}

/// A flow store held in memory, with optimistic version checks.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFlowStore {
    flows: Arc<Mutex<HashMap<FlowId, PersistedFlow>>>,
    updates: Arc<Mutex<u64>>,
}

impl InMemoryFlowStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a flow as-is, bypassing version checks.
    pub async fn insert(&self, flow_id: FlowId, flow: PersistedFlow) {
        self.flows.lock().await.insert(flow_id, flow);
    }

    /// Returns the stored copy of a flow.
    pub async fn snapshot(&self, flow_id: &FlowId) -> Option<PersistedFlow> {
        self.flows.lock().await.get(flow_id).cloned()
    }

    /// Number of accepted updates.
    pub async fn update_count(&self) -> u64 {
        *self.updates.lock().await
    }
}

#[async_trait]
impl FlowStore for InMemoryFlowStore {
    async fn get(&self, flow_id: &FlowId) -> Result<PersistedFlow, ServiceError> {
        self.flows
            .lock()
            .await
            .get(flow_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("flow {flow_id}"),
            })
    }

    async fn update(&self, flow_id: &FlowId, mut flow: PersistedFlow) -> Result<(), ServiceError> {
        let mut flows = self.flows.lock().await;
        let stored = flows.get(flow_id).ok_or_else(|| ServiceError::NotFound {
            resource: format!("flow {flow_id}"),
        })?;

        if stored.version.is_some() && stored.version != flow.version {
            return Err(ServiceError::Conflict {
                expected: stored.version,
                found: flow.version,
            });
        }
        flow.version = stored.version.map(|v| v + 1);
        flows.insert(flow_id.clone(), flow);
        *self.updates.lock().await += 1;
        Ok(())
    }
}

/// A log feed that callers append to.
///
/// Failures can be queued to make the next polls fail.
#[derive(Debug, Clone, Default)]
pub struct RecordedLogSource {
    entries: Arc<Mutex<Vec<ExecutionLogEntry>>>,
    failures: Arc<Mutex<u32>>,
    polls: Arc<Mutex<u32>>,
}

impl RecordedLogSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, entry: ExecutionLogEntry) {
        self.entries.lock().await.push(entry);
    }

    /// Makes the next `count` polls fail with [`ServiceError::Unavailable`].
    pub async fn fail_next(&self, count: u32) {
        *self.failures.lock().await += count;
    }

    /// Number of polls served, failed ones included.
    pub async fn poll_count(&self) -> u32 {
        *self.polls.lock().await
    }
}

#[async_trait]
impl LogSource for RecordedLogSource {
    async fn get_logs(
        &self,
        _flow_id: &FlowId,
        limit: usize,
    ) -> Result<Vec<ExecutionLogEntry>, ServiceError> {
        *self.polls.lock().await += 1;
        {
            let mut failures = self.failures.lock().await;
            if *failures > 0 {
                *failures -= 1;
                return Err(ServiceError::Unavailable {
                    reason: "log service unreachable".to_string(),
                });
            }
        }

        let mut entries = self.entries.lock().await.clone();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }
}

/// An execution that writes scripted log entries over time, then returns a
/// fixed outcome.
#[derive(Debug, Clone)]
pub struct ScriptedExecution {
    outcome: Result<ExecutionOutcome, ServiceError>,
    emits: Vec<ExecutionLogEntry>,
    log: Option<RecordedLogSource>,
    step: Duration,
    requests: Arc<Mutex<Vec<(FlowId, ExecutionRequest)>>>,
}

impl ScriptedExecution {
    /// An execution that completes immediately with `outcome`.
    #[must_use]
    pub fn new(outcome: ExecutionOutcome) -> Self {
        Self {
            outcome: Ok(outcome),
            emits: Vec::new(),
            log: None,
            step: Duration::ZERO,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// An execution whose trigger fails.
    #[must_use]
    pub fn failing(error: ServiceError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::new(ExecutionOutcome::default())
        }
    }

    /// Writes `entries` to `log`, waiting `step` before each one and once
    /// more before completing.
    #[must_use]
    pub fn writing(mut self, log: RecordedLogSource, entries: Vec<ExecutionLogEntry>, step: Duration) -> Self {
        self.log = Some(log);
        self.emits = entries;
        self.step = step;
        self
    }

    /// Requests received so far.
    pub async fn requests(&self) -> Vec<(FlowId, ExecutionRequest)> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ExecutionService for ScriptedExecution {
    async fn execute(
        &self,
        flow_id: &FlowId,
        request: ExecutionRequest,
    ) -> Result<ExecutionOutcome, ServiceError> {
        self.requests.lock().await.push((flow_id.clone(), request));

        for entry in &self.emits {
            tokio::time::sleep(self.step).await;
            if let Some(log) = &self.log {
                log.push(entry.clone()).await;
            }
        }
        tokio::time::sleep(self.step).await;
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn store_round_trip() {
        let store = InMemoryFlowStore::new();
        let flow_id = FlowId::from("flow-1");
        store.insert(flow_id.clone(), PersistedFlow::new("Orders")).await;

        let flow = store.get(&flow_id).await.expect("get");
        assert_eq!(flow.name, "Orders");
        assert!(matches!(
            store.get(&FlowId::from("missing")).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn versioned_store_rejects_stale_updates() {
        let store = InMemoryFlowStore::new();
        let flow_id = FlowId::from("flow-1");
        let mut flow = PersistedFlow::new("Orders");
        flow.version = Some(1);
        store.insert(flow_id.clone(), flow.clone()).await;

        store.update(&flow_id, flow.clone()).await.expect("first update");
        assert_eq!(store.snapshot(&flow_id).await.and_then(|f| f.version), Some(2));

        let err = store.update(&flow_id, flow).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::Conflict {
                expected: Some(2),
                found: Some(1),
            }
        );
        assert_eq!(store.update_count().await, 1);
    }

    #[tokio::test]
    async fn unversioned_store_is_last_write_wins() {
        let store = InMemoryFlowStore::new();
        let flow_id = FlowId::from("flow-1");
        store.insert(flow_id.clone(), PersistedFlow::new("Orders")).await;

        store.update(&flow_id, PersistedFlow::new("A")).await.expect("update");
        store.update(&flow_id, PersistedFlow::new("B")).await.expect("update");
        assert_eq!(store.snapshot(&flow_id).await.map(|f| f.name), Some("B".to_string()));
    }

    #[tokio::test]
    async fn log_source_returns_newest_within_limit() {
        let source = RecordedLogSource::new();
        for second in 0..5 {
            let timestamp = Utc
                .with_ymd_and_hms(2024, 5, 1, 12, 0, second)
                .single()
                .expect("valid timestamp");
            source
                .push(ExecutionLogEntry::new(timestamp, "tick").with_id(format!("e{second}")))
                .await;
        }

        let logs = source.get_logs(&FlowId::from("f"), 2).await.expect("logs");
        let ids: Vec<_> = logs.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e4", "e3"]);
    }

    #[tokio::test]
    async fn log_source_failures_are_consumed() {
        let source = RecordedLogSource::new();
        source.fail_next(1).await;
        assert!(source.get_logs(&FlowId::from("f"), 10).await.is_err());
        assert!(source.get_logs(&FlowId::from("f"), 10).await.is_ok());
        assert_eq!(source.poll_count().await, 2);
    }
}
