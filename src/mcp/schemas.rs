//! JSON schema builders for MCP tools.

use serde_json::{Map, Value};

/// Build the schema describing the `list-rules` tool input.
pub(crate) fn list_rules_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "contextFilter".into(),
        string_schema(
            "Optional context to scope the listing; context-less rules are always included",
        ),
    );
    finalize_object_schema(properties, &[])
}

/// Build the schema describing the `get-rule` tool input.
pub(crate) fn get_rule_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "ruleId".into(),
        string_schema("The unique identifier of the rule"),
    );
    finalize_object_schema(properties, &["ruleId"])
}

/// Schema representing an empty object (used for parameterless tools).
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    finalize_object_schema(Map::new(), &[])
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}
