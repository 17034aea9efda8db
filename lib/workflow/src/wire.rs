//! The persisted wire format.
//!
//! Each persisted node lists its outgoing connections as one array of
//! target node ids per output port. Which input port a wire lands on is
//! not recorded; see [`crate::port`] for how that is reconstructed.
//!
//! Decoding is lenient about incomplete data: missing coordinates and
//! missing or null `wires` are accepted and repaired during Load.

use crate::error::WireFormatError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use wireflow_core::NodeId;

/// Layer value written to every saved node.
pub const LAYER: &str = "main";

/// Field names owned by the wire format itself. Node config keys with
/// these names cannot be flattened onto a persisted node.
pub const RESERVED_FIELDS: [&str; 7] = ["id", "type", "name", "x", "y", "z", "wires"];

/// Lifecycle status of a persisted flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Active,
    #[default]
    Draft,
    Error,
    Disabled,
}

impl fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::Draft => "draft",
            Self::Error => "error",
            Self::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

/// A node as stored by the Flow Persistence Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_coordinate",
        deserialize_with = "deserialize_coordinate"
    )]
    pub x: Option<f64>,
    #[serde(
        default,
        serialize_with = "serialize_coordinate",
        deserialize_with = "deserialize_coordinate"
    )]
    pub y: Option<f64>,
    #[serde(default)]
    pub z: JsonValue,
    /// Target node ids, one array per output port.
    #[serde(default, deserialize_with = "deserialize_wires")]
    pub wires: Vec<Vec<NodeId>>,
    /// Flattened node config.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl PersistedNode {
    /// Creates a node with no position, wires or config.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            name: None,
            x: None,
            y: None,
            z: JsonValue::Null,
            wires: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Sets the canvas position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Sets the outgoing wires.
    #[must_use]
    pub fn with_wires<I, P, T>(mut self, wires: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        self.wires = wires
            .into_iter()
            .map(|port| port.into_iter().map(Into::into).collect())
            .collect();
        self
    }

    /// Returns the position if both coordinates are finite numbers.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }
}

/// A complete flow as stored by the Flow Persistence Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedFlow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: FlowStatus,
    #[serde(default)]
    pub nodes: Vec<PersistedNode>,
    /// Optimistic concurrency token. Stores that track versions reject
    /// updates carrying a stale value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl PersistedFlow {
    /// Creates an empty draft flow.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            status: FlowStatus::Draft,
            nodes: Vec::new(),
            version: None,
        }
    }

    /// Adds a node.
    #[must_use]
    pub fn with_node(mut self, node: PersistedNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Decodes a flow from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a valid persisted flow.
    pub fn from_json(json: &str) -> Result<Self, WireFormatError> {
        serde_json::from_str(json).map_err(|e| WireFormatError::Decode {
            reason: e.to_string(),
        })
    }

    /// Encodes the flow as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_json_pretty(&self) -> Result<String, WireFormatError> {
        serde_json::to_string_pretty(self).map_err(|e| WireFormatError::Encode {
            reason: e.to_string(),
        })
    }
}

/// Writes whole-number coordinates as integers.
fn serialize_coordinate<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        #[allow(clippy::cast_possible_truncation)]
        Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => serializer.serialize_i64(*v as i64),
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}

/// Treats anything but a JSON number as a missing coordinate.
fn deserialize_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = JsonValue::deserialize(deserializer)?;
    Ok(raw.as_f64())
}

/// Accepts `null` as no wires and skips non-string wire entries.
fn deserialize_wires<'de, D>(deserializer: D) -> Result<Vec<Vec<NodeId>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<JsonValue>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|port| match port {
            JsonValue::Array(targets) => targets
                .into_iter()
                .filter_map(|target| match target {
                    JsonValue::String(id) if !id.is_empty() => Some(NodeId::from(id)),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        })
        .collect())
}
