//! Subcommand implementations.

use crate::store::{FileDefinitions, FileFlowStore};
use std::fmt;
use std::path::PathBuf;
use wireflow_core::{FlowId, Result};
use wireflow_editor::{DefinitionProvider, EditorConfig, EditorError, EditorSession, ServiceError};
use wireflow_workflow::NodeCategory;

/// Errors surfaced by CLI commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    InvalidFlowId { reason: String },
    Config { reason: String },
    Store(ServiceError),
    Editor(EditorError),
    Encode { reason: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFlowId { reason } => write!(f, "invalid flow id: {reason}"),
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::Editor(e) => write!(f, "{e}"),
            Self::Encode { reason } => write!(f, "failed to encode output: {reason}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Collaborators shared by all commands.
#[derive(Debug, Clone)]
pub struct Context {
    store: FileFlowStore,
    definitions: FileDefinitions,
}

impl Context {
    #[must_use]
    pub fn new(store: PathBuf, definitions: Option<PathBuf>) -> Self {
        Self {
            store: FileFlowStore::new(store),
            definitions: FileDefinitions::new(definitions),
        }
    }

    async fn open(&self, raw_id: &str) -> Result<EditorSession, CliError> {
        let flow_id: FlowId = raw_id.parse().map_err(|e: wireflow_core::ParseIdError| {
            CliError::InvalidFlowId {
                reason: e.to_string(),
            }
        })?;
        let config = EditorConfig::from_env().map_err(|e| CliError::Config {
            reason: e.to_string(),
        })?;
        let session = EditorSession::open(flow_id, &self.store, &self.definitions, config)
            .await
            .map_err(|e| CliError::Editor(e.current_context().clone()))?;
        Ok(session)
    }
}

/// Prints the ids of stored flows.
pub async fn list(context: &Context) -> Result<(), CliError> {
    let ids = context.store.list().await.map_err(CliError::Store)?;
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

/// Prints a flow as the editor sees it after Load.
pub async fn inspect(context: &Context, raw_id: &str, json: bool) -> Result<(), CliError> {
    let session = context.open(raw_id).await?;
    let graph = session.graph();

    if json {
        let rendered = serde_json::to_string_pretty(session.workflow()).map_err(|e| {
            CliError::Encode {
                reason: e.to_string(),
            }
        })?;
        println!("{rendered}");
        return Ok(());
    }

    let summary = session.workflow().summary();
    println!("{} ({}) [{}]", summary.name, summary.id, summary.status);
    println!(
        "{} nodes, {} edges, {} entry points{}",
        summary.node_count,
        summary.edge_count,
        summary.entry_points,
        if summary.has_cycle { ", cyclic" } else { "" }
    );

    println!("\nnodes:");
    for node in graph.nodes() {
        println!(
            "  {:<28} {:<16} {:<9} {:?} at ({}, {})",
            node.id.as_str(),
            node.node_type,
            node.category.as_str(),
            node.label,
            node.position.x,
            node.position.y
        );
    }

    println!("\nedges:");
    for edge in graph.edges() {
        println!("  {} -> {}", edge.source_handle, edge.target_handle);
    }

    let warnings = session.load_warnings();
    if !warnings.is_empty() {
        println!("\nrepairs:");
        for warning in warnings {
            println!("  {warning}");
        }
    }
    Ok(())
}

/// Round-trips a flow through Load and Save.
pub async fn normalize(
    context: &Context,
    raw_id: &str,
    dry_run: bool,
) -> Result<(), CliError> {
    let mut session = context.open(raw_id).await?;
    let repairs = session.load_warnings().len();

    if dry_run {
        let request = session
            .prepare_save()
            .map_err(|e| CliError::Editor(e.current_context().clone()))?;
        let rendered = request.flow.to_json_pretty().map_err(|e| CliError::Encode {
            reason: e.to_string(),
        })?;
        println!("{rendered}");
        return Ok(());
    }

    session
        .save(&context.store)
        .await
        .map_err(|e| CliError::Editor(e.current_context().clone()))?;
    tracing::info!(flow_id = %session.flow_id(), repairs, "Normalized flow");
    Ok(())
}

/// Prints the catalog grouped by category.
pub async fn definitions(context: &Context) -> Result<(), CliError> {
    let catalog = context
        .definitions
        .definitions()
        .await
        .map_err(CliError::Store)?;
    if catalog.is_empty() {
        println!("no definitions");
        return Ok(());
    }

    for category in NodeCategory::ALL {
        let mut entries = catalog.in_category(category).peekable();
        if entries.peek().is_none() {
            continue;
        }
        println!("{}:", category.as_str());
        for definition in entries {
            println!(
                "  {:<20} {:<24} in:{} out:{}",
                definition.node_type, definition.label, definition.inputs, definition.outputs
            );
        }
    }
    Ok(())
}
