//! Editor runtime for wireflow.
//!
//! - **Session**: one open flow with its graph, edit tracking and save flow
//! - **Services**: traits for the definition provider, flow store, execution
//!   trigger and debug log feed, plus in-memory implementations
//! - **Log Stream**: cancellable polling of execution logs into a bounded,
//!   deduplicated buffer
//! - **Config**: environment-driven settings for the above

pub mod config;
pub mod error;
pub mod logs;
pub mod memory;
pub mod service;
pub mod session;
pub mod stream;

pub use config::{EditorConfig, LogStreamConfig};
pub use error::{EditorError, ServiceError};
pub use logs::{ExecutionLogEntry, LogBuffer, LogLevel};
pub use memory::{InMemoryFlowStore, RecordedLogSource, ScriptedExecution, StaticDefinitions};
pub use service::{
    DefinitionProvider, ExecutionOutcome, ExecutionRequest, ExecutionService, FlowStore, LogSource,
};
pub use session::{EditorSession, SaveRequest};
pub use stream::{ExecutionLogStream, StreamEvent, StreamState};
