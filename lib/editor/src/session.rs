//! Editor sessions.
//!
//! An [`EditorSession`] owns everything the editor knows about one open
//! flow: the graph, the definition catalog it was loaded with, the edit
//! tracker and the execution log stream. Sessions are independent, so
//! several flows can be open side by side.
//!
//! Graph mutations are synchronous and mark the session dirty even when
//! they change nothing. Saving is split into [`EditorSession::prepare_save`]
//! and [`EditorSession::complete_save`] so that callers can keep editing
//! while a save is in flight; [`EditorSession::save`] does both.

use crate::config::EditorConfig;
use crate::error::{EditorError, ServiceError};
use crate::logs::LogBuffer;
use crate::service::{
    DefinitionProvider, ExecutionOutcome, ExecutionRequest, ExecutionService, FlowStore, LogSource,
};
use crate::stream::ExecutionLogStream;
use serde_json::{Map, Value as JsonValue};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use wireflow_core::{EdgeId, FlowId, NodeId, Result};
use wireflow_workflow::transform;
use wireflow_workflow::{
    DefinitionCatalog, EditState, EditTracker, FlowGraph, GraphEdge, GraphNode, LoadWarning,
    NodeDefinition, PersistedFlow, Position, Revision, TransformError, Workflow,
};

/// A serialized snapshot of the graph, ready to send to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub flow_id: FlowId,
    pub flow: PersistedFlow,
    revision: Revision,
}

/// One open flow in the editor.
#[derive(Debug)]
pub struct EditorSession {
    workflow: Workflow,
    catalog: DefinitionCatalog,
    tracker: EditTracker,
    logs: ExecutionLogStream,
    config: EditorConfig,
    warnings: Vec<LoadWarning>,
}

impl EditorSession {
    /// Fetches definitions and the flow, and loads the flow into a clean session.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::FlowNotFound`] if the store has no such flow,
    /// and [`EditorError::Persistence`] if either collaborator fails.
    #[instrument(skip(store, definitions, config))]
    pub async fn open(
        flow_id: FlowId,
        store: &dyn FlowStore,
        definitions: &dyn DefinitionProvider,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        let catalog = definitions
            .definitions()
            .await
            .map_err(|e| EditorError::Persistence {
                reason: format!("failed to fetch node definitions: {e}"),
            })?;
        let flow = store
            .get(&flow_id)
            .await
            .map_err(|e| EditorError::from_load(&flow_id, &e))?;

        let session = Self::from_flow(flow_id, &flow, catalog, config);
        info!(
            flow_id = %session.workflow.id,
            nodes = session.graph().node_count(),
            edges = session.graph().edge_count(),
            "Opened flow"
        );
        Ok(session)
    }

    /// Builds a clean session from an already fetched flow.
    #[must_use]
    pub fn from_flow(
        flow_id: FlowId,
        flow: &PersistedFlow,
        catalog: DefinitionCatalog,
        config: EditorConfig,
    ) -> Self {
        let (workflow, warnings) = transform::load_with_warnings(flow_id, flow, &catalog);
        for warning in &warnings {
            debug!(flow_id = %workflow.id, %warning, "Repaired persisted data");
        }
        let mut tracker = EditTracker::new();
        tracker.mark_loaded();
        Self {
            workflow,
            catalog,
            tracker,
            logs: ExecutionLogStream::new(config.log.clone()),
            config,
            warnings,
        }
    }

    /// Replaces the graph with the store's current copy of the flow.
    ///
    /// # Errors
    ///
    /// Same as [`EditorSession::open`] for the flow fetch.
    #[instrument(skip(self, store), fields(flow_id = %self.workflow.id))]
    pub async fn reload(&mut self, store: &dyn FlowStore) -> Result<(), EditorError> {
        let flow_id = self.workflow.id.clone();
        let flow = store
            .get(&flow_id)
            .await
            .map_err(|e| EditorError::from_load(&flow_id, &e))?;
        let (workflow, warnings) = transform::load_with_warnings(flow_id, &flow, &self.catalog);
        self.workflow = workflow;
        self.warnings = warnings;
        self.tracker.mark_loaded();
        Ok(())
    }

    #[must_use]
    pub fn flow_id(&self) -> &FlowId {
        &self.workflow.id
    }

    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    #[must_use]
    pub fn graph(&self) -> &FlowGraph {
        &self.workflow.graph
    }

    #[must_use]
    pub fn catalog(&self) -> &DefinitionCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Repairs made to the persisted data by the last Load.
    #[must_use]
    pub fn load_warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn edit_state(&self) -> EditState {
        self.tracker.state()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty()
    }

    /// The execution log panel contents, newest first.
    #[must_use]
    pub fn logs(&self) -> &LogBuffer {
        self.logs.buffer()
    }

    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.logs.is_executing()
    }

    pub fn add_node(&mut self, definition: &NodeDefinition, position: Position) -> GraphNode {
        self.tracker.mark_dirty();
        self.workflow.graph.add_node(definition, position)
    }

    pub fn update_node_config(&mut self, node_id: &NodeId, partial: &Map<String, JsonValue>) {
        self.tracker.mark_dirty();
        self.workflow.graph.update_node_config(node_id, partial);
    }

    pub fn delete_node(&mut self, node_id: &NodeId) -> Option<GraphNode> {
        self.tracker.mark_dirty();
        self.workflow.graph.delete_node(node_id)
    }

    pub fn connect(
        &mut self,
        source: &NodeId,
        source_handle: &str,
        target: &NodeId,
        target_handle: &str,
    ) -> Option<GraphEdge> {
        self.tracker.mark_dirty();
        self.workflow
            .graph
            .connect(source, source_handle, target, target_handle)
    }

    pub fn delete_edge(&mut self, edge_id: &EdgeId) -> Option<GraphEdge> {
        self.tracker.mark_dirty();
        self.workflow.graph.delete_edge(edge_id)
    }

    pub fn move_node(&mut self, node_id: &NodeId, position: Position) {
        self.tracker.mark_dirty();
        self.workflow.graph.move_node(node_id, position);
    }

    pub fn rename_node(&mut self, node_id: &NodeId, label: impl Into<String>) {
        self.tracker.mark_dirty();
        self.workflow.graph.rename_node(node_id, label);
    }

    /// Changes the selection. Selection is not an edit.
    pub fn select_node(&mut self, node_id: Option<&NodeId>) {
        self.workflow.graph.select_node(node_id);
    }

    #[must_use]
    pub fn selected_node(&self) -> Option<&GraphNode> {
        self.workflow.graph.selected_node()
    }

    /// Serializes the graph as it is now.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::EmptyGraph`] if the graph has no nodes.
    pub fn prepare_save(&self) -> Result<SaveRequest, EditorError> {
        let flow = transform::save(&self.workflow, &self.catalog).map_err(|e| match e {
            TransformError::EmptyGraph => EditorError::EmptyGraph,
        })?;
        Ok(SaveRequest {
            flow_id: self.workflow.id.clone(),
            flow,
            revision: self.tracker.revision(),
        })
    }

    /// Applies the store's answer to a save.
    ///
    /// On success the session is clean unless it was edited after the
    /// request was prepared, and the local version advances to match the
    /// store. On failure the session stays dirty.
    ///
    /// # Errors
    ///
    /// Returns the store failure mapped onto [`EditorError`].
    pub fn complete_save(
        &mut self,
        request: &SaveRequest,
        result: std::result::Result<(), ServiceError>,
    ) -> Result<(), EditorError> {
        match result {
            Ok(()) => {
                if let Some(version) = request.flow.version {
                    self.workflow.metadata.version = Some(version + 1);
                }
                let clean = self.tracker.mark_saved(request.revision);
                info!(flow_id = %request.flow_id, clean, "Saved flow");
                Ok(())
            }
            Err(e) => {
                warn!(flow_id = %request.flow_id, error = %e, "Save failed");
                Err(EditorError::from_save(&request.flow_id, &e).into())
            }
        }
    }

    /// Serializes the graph and writes it to the store.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::EmptyGraph`] without contacting the store if
    /// the graph has no nodes, and the mapped store failure otherwise.
    #[instrument(skip(self, store), fields(flow_id = %self.workflow.id))]
    pub async fn save(&mut self, store: &dyn FlowStore) -> Result<(), EditorError> {
        let request = self.prepare_save()?;
        let result = store.update(&request.flow_id, request.flow.clone()).await;
        self.complete_save(&request, result)
    }

    /// Runs the flow and streams its logs into the session's log buffer.
    ///
    /// Polling starts before the trigger is sent. The trigger response is
    /// the completion signal: its logs are merged, one final poll is made
    /// and polling stops. If no response arrives within the configured
    /// `max_execution`, the execution is abandoned.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::AlreadyExecuting`] if an execution is running,
    /// [`EditorError::Execution`] if the trigger fails and
    /// [`EditorError::ExecutionTimedOut`] on timeout.
    #[instrument(skip(self, service, source, request), fields(flow_id = %self.workflow.id))]
    pub async fn execute(
        &mut self,
        service: &dyn ExecutionService,
        source: Arc<dyn LogSource>,
        request: ExecutionRequest,
    ) -> Result<ExecutionOutcome, EditorError> {
        if self.logs.is_executing() {
            return Err(EditorError::AlreadyExecuting.into());
        }

        let flow_id = self.workflow.id.clone();
        let max_execution = self.config.log.max_execution();
        let mut logs = ExecutionGuard(&mut self.logs);
        logs.start(flow_id.clone(), source);

        let execution = service.execute(&flow_id, request);
        let deadline = tokio::time::sleep(max_execution);
        tokio::pin!(execution, deadline);

        let response = loop {
            tokio::select! {
                response = &mut execution => break Some(response),
                () = &mut deadline => break None,
                Some(added) = logs.next_event() => {
                    debug!(added, "Merged log batch");
                }
            }
        };

        match response {
            Some(Ok(outcome)) => {
                logs.merge(outcome.logs.clone());
                logs.finish().await;
                info!(success = outcome.success, "Execution finished");
                Ok(outcome)
            }
            Some(Err(e)) => {
                logs.finish().await;
                warn!(error = %e, "Execution trigger failed");
                Err(EditorError::Execution {
                    reason: e.to_string(),
                }
                .into())
            }
            None => {
                logs.finish().await;
                warn!(after_secs = max_execution.as_secs(), "Execution timed out");
                Err(EditorError::ExecutionTimedOut {
                    after_secs: max_execution.as_secs(),
                }
                .into())
            }
        }
    }

    /// Abandons a running execution and stops log polling.
    ///
    /// The trigger call itself belongs to whoever is awaiting
    /// [`EditorSession::execute`]; this only returns the session to idle.
    pub fn stop_execution(&mut self) {
        if self.logs.is_executing() {
            info!(flow_id = %self.workflow.id, "Execution stopped");
            self.logs.stop();
        }
    }
}

/// Stops the log stream if `execute` is dropped before it finishes.
struct ExecutionGuard<'a>(&'a mut ExecutionLogStream);

impl Deref for ExecutionGuard<'_> {
    type Target = ExecutionLogStream;

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl DerefMut for ExecutionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        if self.0.is_executing() {
            warn!("Execution abandoned, stopping log polling");
            self.0.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogStreamConfig;
    use crate::logs::ExecutionLogEntry;
    use crate::memory::{
        InMemoryFlowStore, RecordedLogSource, ScriptedExecution, StaticDefinitions,
    };
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::time::Duration;
    use wireflow_workflow::{NodeCategory, PersistedNode};

    fn catalog() -> DefinitionCatalog {
        DefinitionCatalog::new(
            vec![
                NodeDefinition::new("http-in", NodeCategory::Input, "HTTP In", 0, 1),
                NodeDefinition::new("function", NodeCategory::Function, "Function", 1, 1)
                    .with_default("code", json!("return msg;")),
                NodeDefinition::new("debug", NodeCategory::Utility, "Debug", 1, 0),
            ],
            Vec::new(),
        )
    }

    fn sample_flow() -> PersistedFlow {
        PersistedFlow::new("Orders")
            .with_node(PersistedNode::new("in", "http-in").at(0.0, 0.0).with_wires([["fn"]]))
            .with_node(PersistedNode::new("fn", "function").at(200.0, 0.0).with_wires([["dbg"]]))
            .with_node(PersistedNode::new("dbg", "debug").at(400.0, 0.0))
    }

    async fn open_sample(store: &InMemoryFlowStore) -> EditorSession {
        let flow_id = FlowId::from("flow-1");
        store.insert(flow_id.clone(), sample_flow()).await;
        EditorSession::open(
            flow_id,
            store,
            &StaticDefinitions::new(catalog()),
            EditorConfig::default(),
        )
        .await
        .expect("open")
    }

    fn entry(id: &str, second: u32) -> ExecutionLogEntry {
        let timestamp = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, second)
            .single()
            .expect("valid timestamp");
        ExecutionLogEntry::new(timestamp, id).with_id(id)
    }

    #[tokio::test]
    async fn open_loads_clean() {
        let store = InMemoryFlowStore::new();
        let session = open_sample(&store).await;

        assert_eq!(session.edit_state(), EditState::Clean);
        assert_eq!(session.graph().node_count(), 3);
        assert_eq!(session.graph().edge_count(), 2);
        assert!(session.load_warnings().is_empty());
    }

    #[tokio::test]
    async fn open_missing_flow_is_not_found() {
        let store = InMemoryFlowStore::new();
        let err = EditorSession::open(
            FlowId::from("nope"),
            &store,
            &StaticDefinitions::new(catalog()),
            EditorConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.current_context(),
            EditorError::FlowNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn every_mutation_dirties() {
        let store = InMemoryFlowStore::new();
        let mut session = open_sample(&store).await;
        let ghost = NodeId::from("ghost");

        let mutations: Vec<Box<dyn Fn(&mut EditorSession)>> = vec![
            Box::new(|s: &mut EditorSession| {
                let def = s.catalog().get("debug").cloned().expect("def");
                s.add_node(&def, Position::default());
            }),
            Box::new(|s: &mut EditorSession| s.update_node_config(&NodeId::from("ghost"), &Map::new())),
            Box::new(|s: &mut EditorSession| {
                s.delete_node(&NodeId::from("ghost"));
            }),
            Box::new(|s: &mut EditorSession| {
                s.connect(&NodeId::from("in"), "in-o0", &NodeId::from("fn"), "fn-i0");
            }),
            Box::new(|s: &mut EditorSession| {
                s.delete_edge(&EdgeId::from("missing"));
            }),
        ];

        for mutate in &mutations {
            session.reload(&store).await.expect("reload");
            assert!(!session.is_dirty());
            mutate(&mut session);
            assert!(session.is_dirty());
        }

        session.reload(&store).await.expect("reload");
        session.select_node(Some(&ghost));
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn save_cleans_and_persists() {
        let store = InMemoryFlowStore::new();
        let mut session = open_sample(&store).await;
        session.rename_node(&NodeId::from("fn"), "Enrich");

        session.save(&store).await.expect("save");

        assert!(!session.is_dirty());
        let stored = store.snapshot(session.flow_id()).await.expect("stored");
        let names: Vec<_> = stored.nodes.iter().filter_map(|n| n.name.clone()).collect();
        assert_eq!(names, vec!["HTTP In", "Enrich", "Debug"]);
    }

    #[tokio::test]
    async fn empty_graph_save_never_reaches_store() {
        let store = InMemoryFlowStore::new();
        let mut session = open_sample(&store).await;
        for id in ["in", "fn", "dbg"] {
            session.delete_node(&NodeId::from(id));
        }

        let err = session.save(&store).await.unwrap_err();

        assert_eq!(err.current_context(), &EditorError::EmptyGraph);
        assert_eq!(store.update_count().await, 0);
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn edits_during_save_stay_dirty() {
        let store = InMemoryFlowStore::new();
        let mut session = open_sample(&store).await;
        session.move_node(&NodeId::from("dbg"), Position::new(500.0, 10.0));

        let request = session.prepare_save().expect("prepare");
        session.rename_node(&NodeId::from("dbg"), "Inspect");
        let result = store.update(&request.flow_id, request.flow.clone()).await;
        session.complete_save(&request, result).expect("complete");

        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn failed_save_stays_dirty() {
        let store = InMemoryFlowStore::new();
        let mut session = open_sample(&store).await;
        session.rename_node(&NodeId::from("fn"), "Enrich");

        let request = session.prepare_save().expect("prepare");
        let err = session
            .complete_save(
                &request,
                Err(ServiceError::Unavailable {
                    reason: "timeout".to_string(),
                }),
            )
            .unwrap_err();

        assert!(matches!(err.current_context(), EditorError::Persistence { .. }));
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn concurrent_sessions_conflict_on_versioned_store() {
        let store = InMemoryFlowStore::new();
        let flow_id = FlowId::from("flow-1");
        let mut flow = sample_flow();
        flow.version = Some(1);
        store.insert(flow_id.clone(), flow).await;

        let definitions = StaticDefinitions::new(catalog());
        let mut first = EditorSession::open(flow_id.clone(), &store, &definitions, EditorConfig::default())
            .await
            .expect("open");
        let mut second = EditorSession::open(flow_id, &store, &definitions, EditorConfig::default())
            .await
            .expect("open");

        first.rename_node(&NodeId::from("fn"), "First");
        first.save(&store).await.expect("first save");
        first.rename_node(&NodeId::from("fn"), "First again");
        first.save(&store).await.expect("version advanced locally");

        second.rename_node(&NodeId::from("fn"), "Second");
        let err = second.save(&store).await.unwrap_err();
        assert!(matches!(err.current_context(), EditorError::SaveConflict { .. }));
        assert!(second.is_dirty());
    }

    fn fast_config() -> EditorConfig {
        EditorConfig {
            log: LogStreamConfig {
                poll_interval_ms: 1000,
                max_execution_secs: 30,
                ..LogStreamConfig::default()
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn execute_streams_logs_until_completion() {
        let store = InMemoryFlowStore::new();
        let flow_id = FlowId::from("flow-1");
        store.insert(flow_id.clone(), sample_flow()).await;
        let mut session = EditorSession::open(
            flow_id.clone(),
            &store,
            &StaticDefinitions::new(catalog()),
            fast_config(),
        )
        .await
        .expect("open");

        let source = RecordedLogSource::new();
        let service = ScriptedExecution::new(ExecutionOutcome {
            success: true,
            logs: vec![entry("c", 3), entry("done", 9)],
        })
        .writing(
            source.clone(),
            vec![entry("a", 1), entry("b", 2), entry("c", 3)],
            Duration::from_millis(1500),
        );

        let outcome = session
            .execute(&service, Arc::new(source.clone()), ExecutionRequest::default())
            .await
            .expect("execute");

        assert!(outcome.success);
        assert!(!session.is_executing());
        let ids: Vec<_> = session.logs().entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["done", "c", "b", "a"]);
        assert!(source.poll_count().await >= 4);

        let requests = service.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, flow_id);
    }

    #[tokio::test(start_paused = true)]
    async fn execute_times_out_without_completion() {
        let store = InMemoryFlowStore::new();
        let mut session = open_sample(&store).await;
        let source = RecordedLogSource::new();
        let service = ScriptedExecution::new(ExecutionOutcome::default()).writing(
            source.clone(),
            Vec::new(),
            Duration::from_secs(600),
        );

        let err = session
            .execute(&service, Arc::new(source), ExecutionRequest::default())
            .await
            .unwrap_err();

        assert_eq!(
            err.current_context(),
            &EditorError::ExecutionTimedOut { after_secs: 120 }
        );
        assert!(!session.is_executing());
    }

    #[tokio::test(start_paused = true)]
    async fn execute_trigger_failure_goes_idle() {
        let store = InMemoryFlowStore::new();
        let mut session = open_sample(&store).await;
        let service = ScriptedExecution::failing(ServiceError::Rejected {
            reason: "flow disabled".to_string(),
        });

        let err = session
            .execute(&service, Arc::new(RecordedLogSource::new()), ExecutionRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err.current_context(), EditorError::Execution { .. }));
        assert!(!session.is_executing());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_execute_returns_to_idle() {
        let store = InMemoryFlowStore::new();
        let mut session = open_sample(&store).await;
        let source = RecordedLogSource::new();
        let slow = ScriptedExecution::new(ExecutionOutcome::default()).writing(
            source.clone(),
            Vec::new(),
            Duration::from_secs(10),
        );

        let cancelled = tokio::time::timeout(
            Duration::from_secs(1),
            session.execute(&slow, Arc::new(source.clone()), ExecutionRequest::default()),
        )
        .await;
        assert!(cancelled.is_err());
        assert!(!session.is_executing());

        let polls = source.poll_count().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.poll_count().await, polls);

        let quick = ScriptedExecution::new(ExecutionOutcome {
            success: true,
            logs: Vec::new(),
        });
        let outcome = session
            .execute(&quick, Arc::new(source), ExecutionRequest::default())
            .await
            .expect("execute after cancel");
        assert!(outcome.success);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_execution_is_idempotent_when_idle() {
        let store = InMemoryFlowStore::new();
        let mut session = open_sample(&store).await;
        session.stop_execution();
        assert!(!session.is_executing());
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn from_flow_reports_repairs() {
        let flow = PersistedFlow::new("Broken")
            .with_node(PersistedNode::new("a", "mystery").with_wires([["gone"]]));
        let session = EditorSession::from_flow(
            FlowId::from("f"),
            &flow,
            catalog(),
            EditorConfig::default(),
        );
        assert_eq!(session.load_warnings().len(), 3);
        assert_eq!(session.graph().edge_count(), 0);
    }
}
