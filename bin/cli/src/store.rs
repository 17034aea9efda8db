//! File-backed collaborators.
//!
//! Flows live in a directory as `{flow_id}.json`. Definitions come from a
//! single catalog document in the Definition Provider's JSON shape.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use wireflow_core::FlowId;
use wireflow_editor::{DefinitionProvider, FlowStore, ServiceError};
use wireflow_workflow::{DefinitionCatalog, PersistedFlow};

/// A flow store over a directory of JSON documents.
#[derive(Debug, Clone)]
pub struct FileFlowStore {
    root: PathBuf,
}

impl FileFlowStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the document path for a flow.
    ///
    /// # Errors
    ///
    /// Rejects ids that would escape the store directory.
    pub fn path_for(&self, flow_id: &FlowId) -> Result<PathBuf, ServiceError> {
        let raw = flow_id.as_str();
        if raw.is_empty() || raw.starts_with('.') || raw.contains(['/', '\\']) {
            return Err(ServiceError::Rejected {
                reason: format!("invalid flow id '{raw}'"),
            });
        }
        Ok(self.root.join(format!("{raw}.json")))
    }

    /// Lists the ids of all stored flows, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub async fn list(&self) -> Result<Vec<FlowId>, ServiceError> {
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| io_error(&self.root, &e))?;
        let mut ids = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| io_error(&self.root, &e))? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(FlowId::from(stem));
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn read(&self, path: &Path) -> Result<Option<PersistedFlow>, ServiceError> {
        match tokio::fs::read_to_string(path).await {
            Ok(json) => PersistedFlow::from_json(&json)
                .map(Some)
                .map_err(|e| ServiceError::Rejected {
                    reason: format!("{}: {e}", path.display()),
                }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, &e)),
        }
    }
}

fn io_error(path: &Path, error: &std::io::Error) -> ServiceError {
    ServiceError::Unavailable {
        reason: format!("{}: {error}", path.display()),
    }
}

#[async_trait]
impl FlowStore for FileFlowStore {
    async fn get(&self, flow_id: &FlowId) -> Result<PersistedFlow, ServiceError> {
        let path = self.path_for(flow_id)?;
        self.read(&path).await?.ok_or_else(|| ServiceError::NotFound {
            resource: format!("flow {flow_id}"),
        })
    }

    async fn update(&self, flow_id: &FlowId, mut flow: PersistedFlow) -> Result<(), ServiceError> {
        let path = self.path_for(flow_id)?;
        let stored = self.read(&path).await?.ok_or_else(|| ServiceError::NotFound {
            resource: format!("flow {flow_id}"),
        })?;

        if stored.version.is_some() && stored.version != flow.version {
            return Err(ServiceError::Conflict {
                expected: stored.version,
                found: flow.version,
            });
        }
        flow.version = stored.version.map(|v| v + 1);

        let json = flow.to_json_pretty().map_err(|e| ServiceError::Rejected {
            reason: e.to_string(),
        })?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, json)
            .await
            .map_err(|e| io_error(&staging, &e))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| io_error(&path, &e))?;
        debug!(flow_id = %flow_id, path = %path.display(), "Wrote flow");
        Ok(())
    }
}

/// Definitions read from a catalog file, or none.
#[derive(Debug, Clone, Default)]
pub struct FileDefinitions {
    path: Option<PathBuf>,
}

impl FileDefinitions {
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait]
impl DefinitionProvider for FileDefinitions {
    async fn definitions(&self) -> Result<DefinitionCatalog, ServiceError> {
        let Some(path) = &self.path else {
            return Ok(DefinitionCatalog::default());
        };
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| io_error(path, &e))?;
        DefinitionCatalog::from_json(&json).map_err(|e| ServiceError::Rejected {
            reason: format!("{}: {e}", path.display()),
        })
    }
}
