//! Dispatch envelope types.
//!
//! Workflow steps exchange opaque [`Item`]s. The dispatcher routes them by
//! action type and [`ExecutionShape`] without ever inspecting their contents;
//! handlers decode into integration-specific structures at the leaves.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// An opaque, serializable value flowing between workflow steps.
///
/// The dispatcher only routes and aggregates items; the JSON inside is owned
/// by the integrations on either end of the edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(pub Value);

impl Item {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for Item {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Execution shape
// ---------------------------------------------------------------------------

/// The input/output cardinality contract a handler implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionShape {
    /// One item in, one item out.
    Single,
    /// One item in, zero or more items out (filtering is valid).
    Multi,
    /// One item in, one item plus an output-edge index out (branching).
    Routable,
    /// The entire flattened batch in, the full per-edge payload matrix out.
    Bulk,
}

// ---------------------------------------------------------------------------
// Input / settings
// ---------------------------------------------------------------------------

/// Per-action execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSettings {
    /// Number of output edges this step writes to. Only Routable and Bulk
    /// shapes use more than one.
    #[serde(default = "default_output_edge_count")]
    pub output_edge_count: usize,
    /// When true, a failing item is skipped and recorded instead of aborting
    /// the whole action. Defaults to abort-on-first-error.
    #[serde(default)]
    pub continue_on_item_error: bool,
    /// Integration-specific parameters; opaque to the dispatcher.
    #[serde(default)]
    pub params: Value,
}

fn default_output_edge_count() -> usize {
    1
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            output_edge_count: 1,
            continue_on_item_error: false,
            params: Value::Null,
        }
    }
}

/// One workflow-step invocation as handed to the dispatcher.
///
/// `items_by_input_edge` preserves the caller's insertion order; the
/// flattening order across edges is whatever order the caller built the map
/// in, and is otherwise not meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationInput {
    /// Discriminator selecting the handler within the integration.
    pub action_type: String,
    /// Ordered item lists keyed by input-edge id.
    pub items_by_input_edge: IndexMap<String, Vec<Item>>,
    /// Execution settings for this step.
    #[serde(default)]
    pub settings: ActionSettings,
}

impl IntegrationInput {
    /// Convenience constructor for the common single-edge case.
    pub fn single_edge(action_type: impl Into<String>, items: Vec<Item>) -> Self {
        let mut edges = IndexMap::new();
        edges.insert("main".to_string(), items);
        Self {
            action_type: action_type.into(),
            items_by_input_edge: edges,
            settings: ActionSettings::default(),
        }
    }

    /// Total item count across all input edges.
    pub fn item_count(&self) -> usize {
        self.items_by_input_edge.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A per-item failure recorded when `continue_on_item_error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Index of the item in flattened input order.
    pub item_index: usize,
    /// Handler error message.
    pub message: String,
}

/// Result of one dispatched step invocation: one payload list per output edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationOutput {
    /// `items_by_output_edge[i]` is the ordered payload list for edge `i`.
    pub items_by_output_edge: Vec<Vec<Item>>,
    /// Items skipped under the continue-on-error policy. Empty under the
    /// default abort policy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_failures: Vec<ItemFailure>,
}

impl IntegrationOutput {
    /// Output with a single edge carrying `items`.
    pub fn single_edge(items: Vec<Item>) -> Self {
        Self {
            items_by_output_edge: vec![items],
            item_failures: Vec::new(),
        }
    }

    /// Output with `edge_count` empty edges.
    pub fn empty(edge_count: usize) -> Self {
        Self {
            items_by_output_edge: vec![Vec::new(); edge_count],
            item_failures: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_serde_transparent() {
        let item = Item::new(json!({"channel": "#ops", "text": "hi"}));
        let encoded = serde_json::to_string(&item).unwrap();
        // No wrapper object -- the item IS its JSON value.
        assert_eq!(encoded, r##"{"channel":"#ops","text":"hi"}"##);
        let decoded: Item = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, item);
    }

    #[test]
    fn test_execution_shape_serde() {
        for (shape, tag) in [
            (ExecutionShape::Single, "\"single\""),
            (ExecutionShape::Multi, "\"multi\""),
            (ExecutionShape::Routable, "\"routable\""),
            (ExecutionShape::Bulk, "\"bulk\""),
        ] {
            assert_eq!(serde_json::to_string(&shape).unwrap(), tag);
            let parsed: ExecutionShape = serde_json::from_str(tag).unwrap();
            assert_eq!(parsed, shape);
        }
    }

    #[test]
    fn test_settings_defaults() {
        let settings: ActionSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.output_edge_count, 1);
        assert!(!settings.continue_on_item_error);
        assert_eq!(settings.params, Value::Null);
    }

    #[test]
    fn test_input_edge_order_preserved() {
        let mut edges = IndexMap::new();
        edges.insert("b".to_string(), vec![Item::new(json!(1))]);
        edges.insert("a".to_string(), vec![Item::new(json!(2))]);
        let input = IntegrationInput {
            action_type: "send".to_string(),
            items_by_input_edge: edges,
            settings: ActionSettings::default(),
        };

        let keys: Vec<&str> = input
            .items_by_input_edge
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(input.item_count(), 2);
    }

    #[test]
    fn test_input_json_roundtrip() {
        let input = IntegrationInput::single_edge(
            "message.send",
            vec![Item::new(json!({"to": "alice"}))],
        );
        let encoded = serde_json::to_string(&input).unwrap();
        let decoded: IntegrationInput = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.action_type, "message.send");
        assert_eq!(decoded.item_count(), 1);
    }

    #[test]
    fn test_output_helpers() {
        let out = IntegrationOutput::empty(3);
        assert_eq!(out.items_by_output_edge.len(), 3);
        assert!(out.items_by_output_edge.iter().all(Vec::is_empty));

        let out = IntegrationOutput::single_edge(vec![Item::new(json!("x"))]);
        assert_eq!(out.items_by_output_edge.len(), 1);
        assert_eq!(out.items_by_output_edge[0].len(), 1);
    }

    #[test]
    fn test_output_failures_omitted_when_empty() {
        let out = IntegrationOutput::single_edge(Vec::new());
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("item_failures").is_none());
    }
}
