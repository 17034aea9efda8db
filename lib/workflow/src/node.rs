//! Graph nodes and their configuration.
//!
//! Node config is presented to the rest of the editor as a flat
//! `field name -> JSON value` map, because that is how property panels
//! write it and how the wire format stores it. Internally the common keys
//! get real types:
//! - execution settings (`retries`, `timeout`) on every node
//! - a category-specific section (HTTP, script, key/value)
//! - an `extra` map for everything else, so unknown definitions keep working

use crate::catalog::{NodeCategory, NodeDefinition};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use wireflow_core::NodeId;

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub const RETRIES_KEY: &str = "retries";
pub const TIMEOUT_KEY: &str = "timeout";

const MAX_RETRIES: u64 = 5;
const MIN_TIMEOUT_MS: u64 = 100;
const MAX_TIMEOUT_MS: u64 = 30_000;

/// Per-node execution settings shared by every category.
///
/// A setting the node never had stays `None` and is not written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Retry attempts after a failure, 0..=5.
    pub retries: Option<u8>,
    /// Timeout in milliseconds, 100..=30000.
    pub timeout_ms: Option<u32>,
}

impl ExecutionSettings {
    /// Settings a freshly placed node starts with.
    #[must_use]
    pub const fn baseline() -> Self {
        Self {
            retries: Some(0),
            timeout_ms: Some(5000),
        }
    }

    /// Applies an edited value to one of the settings, clamping into range.
    ///
    /// Returns false when the key is not a setting or the value is not a
    /// non-negative integer.
    fn apply(&mut self, key: &str, value: &JsonValue) -> bool {
        let Some(raw) = value.as_u64() else {
            return false;
        };
        match key {
            RETRIES_KEY => {
                self.retries = u8::try_from(raw.min(MAX_RETRIES)).ok();
                true
            }
            TIMEOUT_KEY => {
                self.timeout_ms = u32::try_from(raw.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS)).ok();
                true
            }
            _ => false,
        }
    }

    /// Accepts a stored value only if it is already in range.
    fn accept(&mut self, key: &str, value: &JsonValue) -> bool {
        let Some(raw) = value.as_u64() else {
            return false;
        };
        match key {
            RETRIES_KEY if raw <= MAX_RETRIES => {
                self.retries = u8::try_from(raw).ok();
                self.retries.is_some()
            }
            TIMEOUT_KEY if (MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&raw) => {
                self.timeout_ms = u32::try_from(raw).ok();
                self.timeout_ms.is_some()
            }
            _ => false,
        }
    }

    fn write_into(&self, map: &mut Map<String, JsonValue>) {
        if let Some(retries) = self.retries {
            map.insert(RETRIES_KEY.to_string(), JsonValue::from(retries));
        }
        if let Some(timeout) = self.timeout_ms {
            map.insert(TIMEOUT_KEY.to_string(), JsonValue::from(timeout));
        }
    }
}

/// HTTP verbs accepted by HTTP nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            _ => None,
        }
    }
}

/// Config for HTTP endpoint and response nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpNodeConfig {
    pub method: Option<HttpMethod>,
    pub path: Option<String>,
}

/// Config for scripted function nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScriptNodeConfig {
    pub code: Option<String>,
}

/// Config for key/value storage nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageNodeConfig {
    pub key: Option<String>,
    pub value: Option<String>,
}

/// Category-specific config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryConfig {
    /// Input and output nodes.
    Http(HttpNodeConfig),
    /// Function nodes.
    Script(ScriptNodeConfig),
    /// Storage nodes.
    Storage(StorageNodeConfig),
    /// Social and utility nodes have no typed fields.
    Generic,
}

impl CategoryConfig {
    /// Returns the empty section for a category.
    #[must_use]
    pub fn for_category(category: NodeCategory) -> Self {
        match category {
            NodeCategory::Input | NodeCategory::Output => Self::Http(HttpNodeConfig::default()),
            NodeCategory::Function => Self::Script(ScriptNodeConfig::default()),
            NodeCategory::Storage => Self::Storage(StorageNodeConfig::default()),
            NodeCategory::Social | NodeCategory::Utility => Self::Generic,
        }
    }

    /// Stores a value in its typed slot. Returns false if no slot fits.
    fn apply(&mut self, key: &str, value: &JsonValue) -> bool {
        match (self, key) {
            (Self::Http(http), "method") => {
                match value.as_str().and_then(HttpMethod::parse) {
                    Some(method) => {
                        http.method = Some(method);
                        true
                    }
                    None => false,
                }
            }
            (Self::Http(http), "path") => set_string(&mut http.path, value),
            (Self::Script(script), "code") => set_string(&mut script.code, value),
            (Self::Storage(storage), "key") => set_string(&mut storage.key, value),
            (Self::Storage(storage), "value") => set_string(&mut storage.value, value),
            _ => false,
        }
    }

    fn write_into(&self, map: &mut Map<String, JsonValue>) {
        let mut put = |key: &str, value: Option<JsonValue>| {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        };
        match self {
            Self::Http(http) => {
                put("method", http.method.map(|m| JsonValue::from(m.as_str())));
                put("path", http.path.clone().map(JsonValue::from));
            }
            Self::Script(script) => put("code", script.code.clone().map(JsonValue::from)),
            Self::Storage(storage) => {
                put("key", storage.key.clone().map(JsonValue::from));
                put("value", storage.value.clone().map(JsonValue::from));
            }
            Self::Generic => {}
        }
    }
}

fn set_string(slot: &mut Option<String>, value: &JsonValue) -> bool {
    match value.as_str() {
        Some(s) => {
            *slot = Some(s.to_string());
            true
        }
        None => false,
    }
}

/// Configuration of a graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Execution settings common to every node.
    pub settings: ExecutionSettings,
    /// Typed fields for the node's category.
    pub typed: CategoryConfig,
    /// Keys with no typed slot, kept verbatim.
    pub extra: Map<String, JsonValue>,
}

impl NodeConfig {
    /// Creates a config holding only the baseline execution settings.
    #[must_use]
    pub fn baseline(category: NodeCategory) -> Self {
        Self {
            settings: ExecutionSettings::baseline(),
            typed: CategoryConfig::for_category(category),
            extra: Map::new(),
        }
    }

    /// Builds a config for a category from a flat map of edited values.
    ///
    /// Starts from the baseline settings and clamps them.
    #[must_use]
    pub fn from_map(category: NodeCategory, map: &Map<String, JsonValue>) -> Self {
        let mut config = Self::baseline(category);
        config.merge(map);
        config
    }

    /// Rebuilds a config from stored values.
    ///
    /// Nothing is added and nothing is clamped: a setting outside its range
    /// is kept verbatim in `extra`, so the flat view equals `map`.
    #[must_use]
    pub fn from_stored(category: NodeCategory, map: &Map<String, JsonValue>) -> Self {
        let mut config = Self {
            settings: ExecutionSettings::default(),
            typed: CategoryConfig::for_category(category),
            extra: Map::new(),
        };
        for (key, value) in map {
            if !(config.settings.accept(key, value) || config.typed.apply(key, value)) {
                config.extra.insert(key.clone(), value.clone());
            }
        }
        config
    }

    /// Shallow-merges a flat map into this config.
    ///
    /// Each key replaces the previous value of that key only; keys absent
    /// from `partial` are untouched.
    pub fn merge(&mut self, partial: &Map<String, JsonValue>) {
        for (key, value) in partial {
            self.set(key, value.clone());
        }
    }

    /// Sets a single key.
    pub fn set(&mut self, key: &str, value: JsonValue) {
        if self.settings.apply(key, &value) || self.typed.apply(key, &value) {
            self.extra.remove(key);
        } else {
            self.extra.insert(key.to_string(), value);
        }
    }

    /// Returns the value of a single key from the flat view.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.to_map().remove(key)
    }

    /// Returns the flat `field name -> value` view of this config.
    #[must_use]
    pub fn to_map(&self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        self.settings.write_into(&mut map);
        self.typed.write_into(&mut map);
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

/// A node instance on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier, stable for the node's lifetime.
    pub id: NodeId,
    /// References a [`NodeDefinition`] by type.
    pub node_type: String,
    pub category: NodeCategory,
    pub label: String,
    pub position: Position,
    pub config: NodeConfig,
    /// Display hint copied from the definition. Not persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Display hint copied from the definition. Not persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl GraphNode {
    /// Instantiates a definition at a position with a fresh id.
    ///
    /// The config starts from the baseline execution settings overlaid
    /// with the definition's default config.
    #[must_use]
    pub fn from_definition(definition: &NodeDefinition, position: Position) -> Self {
        let mut config = NodeConfig::baseline(definition.category);
        config.merge(&definition.default_config);
        Self {
            id: NodeId::new(),
            node_type: definition.node_type.clone(),
            category: definition.category,
            label: definition.label.clone(),
            position,
            config,
            icon: non_empty(&definition.icon),
            color: non_empty(&definition.color),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn baseline_settings() {
        let config = NodeConfig::baseline(NodeCategory::Function);
        let flat = config.to_map();
        assert_eq!(flat.get("retries"), Some(&json!(0)));
        assert_eq!(flat.get("timeout"), Some(&json!(5000)));
    }

    #[test]
    fn typed_fields_by_category() {
        let config = NodeConfig::from_map(
            NodeCategory::Input,
            &map(json!({ "method": "POST", "path": "/hooks/orders" })),
        );
        assert_eq!(
            config.typed,
            CategoryConfig::Http(HttpNodeConfig {
                method: Some(HttpMethod::Post),
                path: Some("/hooks/orders".to_string()),
            })
        );
        assert!(config.extra.is_empty());
    }

    #[test]
    fn foreign_keys_land_in_extra() {
        // "code" has no slot on a storage node.
        let config = NodeConfig::from_map(
            NodeCategory::Storage,
            &map(json!({ "key": "user:1", "code": "return 1", "custom": [1, 2] })),
        );
        assert_eq!(config.extra.get("code"), Some(&json!("return 1")));
        assert_eq!(config.extra.get("custom"), Some(&json!([1, 2])));
        assert_eq!(config.get("key"), Some(json!("user:1")));
    }

    #[test]
    fn ill_typed_values_are_kept_verbatim() {
        let config = NodeConfig::from_map(
            NodeCategory::Input,
            &map(json!({ "method": "TRACE", "timeout": "soon" })),
        );
        assert_eq!(config.get("method"), Some(json!("TRACE")));
        assert_eq!(config.get("timeout"), Some(json!("soon")));
    }

    #[test]
    fn settings_are_clamped() {
        let config = NodeConfig::from_map(
            NodeCategory::Function,
            &map(json!({ "retries": 9, "timeout": 10 })),
        );
        assert_eq!(config.settings.retries, Some(5));
        assert_eq!(config.settings.timeout_ms, Some(100));
    }

    #[test]
    fn stored_values_are_neither_seeded_nor_clamped() {
        let bare = NodeConfig::from_stored(NodeCategory::Function, &Map::new());
        assert!(bare.to_map().is_empty());

        let stored = map(json!({ "retries": 9, "timeout": 60000, "code": "x()" }));
        let config = NodeConfig::from_stored(NodeCategory::Function, &stored);
        assert_eq!(config.settings, ExecutionSettings::default());
        assert_eq!(config.to_map(), stored);

        let in_range = NodeConfig::from_stored(NodeCategory::Function, &map(json!({ "retries": 3 })));
        assert_eq!(in_range.settings.retries, Some(3));
        assert!(in_range.extra.is_empty());
    }

    #[test]
    fn editing_a_stored_setting_clamps_it() {
        let mut config =
            NodeConfig::from_stored(NodeCategory::Function, &map(json!({ "retries": 9 })));
        config.set("retries", json!(8));
        assert!(config.extra.is_empty());
        assert_eq!(config.get("retries"), Some(json!(5)));
    }

    #[test]
    fn merge_is_shallow() {
        let mut config = NodeConfig::from_map(
            NodeCategory::Function,
            &map(json!({ "code": "a()", "headers": { "x": 1 } })),
        );
        config.merge(&map(json!({ "headers": { "y": 2 }, "retries": 2 })));

        let flat = config.to_map();
        assert_eq!(flat.get("code"), Some(&json!("a()")));
        assert_eq!(flat.get("headers"), Some(&json!({ "y": 2 })));
        assert_eq!(flat.get("retries"), Some(&json!(2)));
    }

    #[test]
    fn retyping_a_key_clears_extra() {
        let mut config = NodeConfig::from_map(
            NodeCategory::Function,
            &map(json!({ "code": 42 })),
        );
        assert_eq!(config.extra.get("code"), Some(&json!(42)));
        config.set("code", json!("return 42"));
        assert!(config.extra.is_empty());
        assert_eq!(config.get("code"), Some(json!("return 42")));
    }

    #[test]
    fn node_from_definition_seeds_config() {
        let definition = NodeDefinition::new("kv-put", NodeCategory::Storage, "KV Put", 1, 1)
            .with_default("key", json!("counter"))
            .with_default("timeout", json!(2000));

        let node = GraphNode::from_definition(&definition, Position::new(10.0, 20.0));

        assert!(node.id.as_str().starts_with("node_"));
        assert_eq!(node.label, "KV Put");
        assert_eq!(node.config.settings.retries, Some(0));
        assert_eq!(node.config.settings.timeout_ms, Some(2000));
        assert_eq!(node.config.get("key"), Some(json!("counter")));
        assert!(node.icon.is_none());
    }
}
