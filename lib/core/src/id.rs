//! Strongly-typed ID types for editor entities.
//!
//! Identifiers arrive from external systems (persisted flows, backend log
//! feeds) as arbitrary strings, so every ID wraps a `String`. IDs minted
//! locally use a `{prefix}_{ULID}` form, which keeps them unique and
//! lexicographically ordered by creation time.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed, string-backed ID.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID from a freshly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Ulid::new()))
            }

            /// Wraps an externally supplied identifier without validation.
            #[must_use]
            pub fn from_raw(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the prefix used for locally generated IDs.
            #[must_use]
            pub const fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        id_type: stringify!($name),
                        reason: "identifier is empty".to_string(),
                    });
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a node within a flow.
    NodeId,
    "node"
);

define_id!(
    /// Unique identifier for a connection between two node ports.
    EdgeId,
    "edge"
);

define_id!(
    /// Unique identifier for a persisted flow.
    FlowId,
    "flow"
);

define_id!(
    /// Unique identifier for an execution log entry.
    LogEntryId,
    "log"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_generated_with_prefix() {
        let id = NodeId::new();
        assert!(id.as_str().starts_with("node_"));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = EdgeId::new();
        let b = EdgeId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_accepts_foreign_ids() {
        let id: FlowId = "7f9c2a1e-uuid-style".parse().expect("should parse");
        assert_eq!(id.as_str(), "7f9c2a1e-uuid-style");
    }

    #[test]
    fn parse_rejects_empty() {
        let result: Result<NodeId, _> = "   ".parse();
        let err = result.unwrap_err();
        assert_eq!(err.id_type, "NodeId");
    }

    #[test]
    fn ordering_is_bytewise() {
        let upper = NodeId::from("Zeta");
        let lower = NodeId::from("alpha");
        // Byte order, not locale order: uppercase sorts first.
        assert!(upper < lower);
    }

    #[test]
    fn id_hash_lookup_by_str() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(NodeId::from("a"));
        set.insert(NodeId::from("b"));
        set.insert(NodeId::from("a"));

        assert_eq!(set.len(), 2);
        assert!(set.contains("b"));
    }

    #[test]
    fn id_serde_is_transparent() {
        let id = LogEntryId::from("entry-1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"entry-1\"");
        let parsed: LogEntryId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, parsed);
    }
}
