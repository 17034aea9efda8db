//! Core domain types and utilities for wireflow.
//!
//! This crate provides the identifiers and error handling shared by the
//! workflow model and the editor session.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{EdgeId, FlowId, LogEntryId, NodeId, ParseIdError};
