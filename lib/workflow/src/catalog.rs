//! Node definitions: the read-only templates nodes are created from.
//!
//! Definitions come from an external Definition Provider. The editor only
//! reads them, so a [`DefinitionCatalog`] is built once per session and
//! indexed by node type.

use crate::error::WireFormatError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Input and output port counts used when a node type has no definition.
pub const DEFAULT_PORTS: (usize, usize) = (1, 1);

/// The category of a node, used for palette grouping and config typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    /// Entry points such as HTTP endpoints and webhooks.
    Input,
    /// Terminal nodes such as HTTP responses.
    Output,
    /// Scripted or computed steps.
    #[default]
    Function,
    /// Key/value and database access.
    Storage,
    /// Messaging and social integrations.
    Social,
    /// Debugging, delays and routing helpers.
    Utility,
}

/// Keyword table for guessing a category from a type name.
///
/// Checked in order; the first matching keyword wins. `response` precedes
/// `http` so that `http-response` lands in output.
const CATEGORY_KEYWORDS: &[(&str, NodeCategory)] = &[
    ("response", NodeCategory::Output),
    ("http", NodeCategory::Input),
    ("webhook", NodeCategory::Input),
    ("inject", NodeCategory::Input),
    ("trigger", NodeCategory::Input),
    ("schedule", NodeCategory::Input),
    ("kv", NodeCategory::Storage),
    ("storage", NodeCategory::Storage),
    ("db", NodeCategory::Storage),
    ("cache", NodeCategory::Storage),
    ("email", NodeCategory::Social),
    ("slack", NodeCategory::Social),
    ("discord", NodeCategory::Social),
    ("telegram", NodeCategory::Social),
    ("twitter", NodeCategory::Social),
    ("debug", NodeCategory::Utility),
    ("delay", NodeCategory::Utility),
    ("log", NodeCategory::Utility),
    ("switch", NodeCategory::Utility),
];

impl NodeCategory {
    /// Every category, in palette order.
    pub const ALL: [Self; 6] = [
        Self::Input,
        Self::Output,
        Self::Function,
        Self::Storage,
        Self::Social,
        Self::Utility,
    ];

    /// Returns the lowercase wire name of this category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Function => "function",
            Self::Storage => "storage",
            Self::Social => "social",
            Self::Utility => "utility",
        }
    }

    /// Guesses a category from a node type name by keyword matching.
    ///
    /// Used only when a type has no definition. Falls back to `Function`.
    #[must_use]
    pub fn infer_from_type(node_type: &str) -> Self {
        let lowered = node_type.to_ascii_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map_or(Self::Function, |(_, category)| *category)
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| format!("unknown node category '{s}'"))
    }
}

/// The editor widget type of a configurable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Select,
    Boolean,
    Json,
    Code,
    Password,
}

/// A selectable value for `select` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Text shown to the user.
    pub label: String,
    /// Value stored in the node config.
    pub value: JsonValue,
}

/// Describes one configurable field of a node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Config key this field writes.
    pub name: String,
    /// Human-readable label.
    #[serde(default)]
    pub label: String,
    /// Widget type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field must be filled in.
    #[serde(default)]
    pub required: bool,
    /// Value used when the config has no entry for this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Choices for `select` fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    /// Editor height for `code` and `json` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
}

/// A node template supplied by the Definition Provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// Unique type identifier (e.g. `http-in`).
    #[serde(rename = "type")]
    pub node_type: String,
    pub category: NodeCategory,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of input ports.
    pub inputs: usize,
    /// Number of output ports.
    pub outputs: usize,
    /// Configurable fields, in display order.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Initial config for new nodes of this type.
    #[serde(default)]
    pub default_config: Map<String, JsonValue>,
}

impl NodeDefinition {
    /// Creates a definition with no fields and an empty default config.
    #[must_use]
    pub fn new(
        node_type: impl Into<String>,
        category: NodeCategory,
        label: impl Into<String>,
        inputs: usize,
        outputs: usize,
    ) -> Self {
        Self {
            node_type: node_type.into(),
            category,
            label: label.into(),
            icon: String::new(),
            color: String::new(),
            description: None,
            inputs,
            outputs,
            fields: Vec::new(),
            default_config: Map::new(),
        }
    }

    /// Adds a configurable field.
    #[must_use]
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a default config entry.
    #[must_use]
    pub fn with_default(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.default_config.insert(key.into(), value);
        self
    }

    /// Returns the descriptor for a field, if the type declares it.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Wire shape of the Definition Provider payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDocument {
    #[serde(default)]
    definitions: Vec<NodeDefinition>,
    #[serde(default)]
    categories: Vec<String>,
}

impl From<CatalogDocument> for DefinitionCatalog {
    fn from(doc: CatalogDocument) -> Self {
        Self::new(doc.definitions, doc.categories)
    }
}

/// The set of node definitions available to an editor session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "CatalogDocument")]
pub struct DefinitionCatalog {
    definitions: Vec<NodeDefinition>,
    categories: Vec<String>,
    /// Map from node type to position in `definitions`.
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl DefinitionCatalog {
    /// Builds a catalog. When a type is defined twice the first definition wins.
    #[must_use]
    pub fn new(definitions: Vec<NodeDefinition>, categories: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(definitions.len());
        for (position, definition) in definitions.iter().enumerate() {
            index
                .entry(definition.node_type.clone())
                .or_insert(position);
        }
        Self {
            definitions,
            categories,
            index,
        }
    }

    /// Parses a catalog from the provider's JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a valid catalog document.
    pub fn from_json(json: &str) -> Result<Self, WireFormatError> {
        serde_json::from_str(json).map_err(|e| WireFormatError::Decode {
            reason: e.to_string(),
        })
    }

    /// Returns the definition for a node type.
    #[must_use]
    pub fn get(&self, node_type: &str) -> Option<&NodeDefinition> {
        self.index
            .get(node_type)
            .and_then(|&position| self.definitions.get(position))
    }

    /// Returns `(inputs, outputs)` for a node type, or [`DEFAULT_PORTS`].
    #[must_use]
    pub fn ports_for(&self, node_type: &str) -> (usize, usize) {
        self.get(node_type)
            .map_or(DEFAULT_PORTS, |d| (d.inputs, d.outputs))
    }

    /// Returns the category for a node type, guessing from the name when undefined.
    #[must_use]
    pub fn category_for(&self, node_type: &str) -> NodeCategory {
        self.get(node_type).map_or_else(
            || NodeCategory::infer_from_type(node_type),
            |d| d.category,
        )
    }

    /// Returns all definitions in provider order.
    pub fn definitions(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.definitions.iter()
    }

    /// Returns the definitions of one category.
    pub fn in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeDefinition> {
        self.definitions
            .iter()
            .filter(move |d| d.category == category)
    }

    /// Returns the provider's category names.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Returns the number of distinct node types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the catalog has no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_catalog() -> DefinitionCatalog {
        DefinitionCatalog::new(
            vec![
                NodeDefinition::new("http-in", NodeCategory::Input, "HTTP In", 0, 1),
                NodeDefinition::new("switch", NodeCategory::Function, "Switch", 1, 3),
            ],
            vec!["input".to_string(), "function".to_string()],
        )
    }

    #[test]
    fn lookup_by_type() {
        let catalog = sample_catalog();
        assert_eq!(catalog.get("switch").map(|d| d.outputs), Some(3));
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn unknown_type_gets_default_ports() {
        let catalog = sample_catalog();
        assert_eq!(catalog.ports_for("missing"), DEFAULT_PORTS);
        assert_eq!(catalog.ports_for("http-in"), (0, 1));
    }

    #[test]
    fn defined_category_beats_heuristic() {
        // "switch" would infer Utility, but the definition says Function.
        let catalog = sample_catalog();
        assert_eq!(catalog.category_for("switch"), NodeCategory::Function);
    }

    #[test]
    fn heuristic_categories() {
        assert_eq!(NodeCategory::infer_from_type("http-in"), NodeCategory::Input);
        assert_eq!(
            NodeCategory::infer_from_type("http-response"),
            NodeCategory::Output
        );
        assert_eq!(NodeCategory::infer_from_type("kv-put"), NodeCategory::Storage);
        assert_eq!(NodeCategory::infer_from_type("SlackPost"), NodeCategory::Social);
        assert_eq!(NodeCategory::infer_from_type("javascript"), NodeCategory::Function);
    }

    #[test]
    fn first_definition_wins_on_duplicates() {
        let catalog = DefinitionCatalog::new(
            vec![
                NodeDefinition::new("dup", NodeCategory::Input, "First", 0, 1),
                NodeDefinition::new("dup", NodeCategory::Output, "Second", 1, 0),
            ],
            Vec::new(),
        );
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("dup").map(|d| d.label.as_str()), Some("First"));
    }

    #[test]
    fn catalog_from_provider_json() {
        let payload = json!({
            "definitions": [{
                "type": "kv-get",
                "category": "storage",
                "label": "KV Get",
                "icon": "Database",
                "color": "bg-amber-500",
                "inputs": 1,
                "outputs": 2,
                "fields": [
                    { "name": "key", "label": "Key", "type": "text", "required": true }
                ],
                "defaultConfig": { "key": "" }
            }],
            "categories": ["storage"]
        });

        let catalog = DefinitionCatalog::from_json(&payload.to_string()).expect("parse");
        let definition = catalog.get("kv-get").expect("indexed after deserialize");
        assert_eq!(definition.outputs, 2);
        assert_eq!(definition.field("key").map(|f| f.required), Some(true));
        assert_eq!(definition.default_config.get("key"), Some(&json!("")));
        assert_eq!(catalog.categories(), ["storage".to_string()]);
    }

    #[test]
    fn category_parse_roundtrip() {
        for category in NodeCategory::ALL {
            let parsed: NodeCategory = category.as_str().parse().expect("parse");
            assert_eq!(parsed, category);
        }
        assert!("bogus".parse::<NodeCategory>().is_err());
    }
}
