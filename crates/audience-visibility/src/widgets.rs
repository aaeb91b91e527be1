//! Visibility filtering inside page content trees.
//!
//! Page content is a JSON array of widget nodes. A node may embed a
//! visibility rule under a configurable key; everything else about the node
//! is opaque to the engine. Retained nodes keep their values, key order and
//! numeric precision, but are re-serialized: exponents come back in
//! lowercase `e+N` form and string escapes are normalized. Nodes may hold nested widget arrays under the
//! configured child keys, which are filtered with the same decision function.

use serde_json::Value;

/// Keys that give a widget tree its shape.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeShape<'a> {
    pub visibility_key: &'a str,
    pub child_keys: &'a [String],
}

/// Parses page content into its top-level widget list.
pub(crate) fn parse_content(content_json: &str) -> Result<Vec<Value>, String> {
    match serde_json::from_str::<Value>(content_json) {
        Ok(Value::Array(nodes)) => Ok(nodes),
        Ok(other) => Err(format!("expected an array, found {}", kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

/// Drops every node (at any depth) whose embedded rule `allows` rejects.
///
/// `allows` receives the raw rule value and is only consulted for nodes that
/// carry a non-null rule. Retained nodes keep their relative order. Returns
/// the number of nodes removed.
///
/// Recursion depth is bounded by `serde_json`'s parser nesting limit.
pub(crate) fn retain_visible<F>(nodes: &mut Vec<Value>, shape: TreeShape<'_>, allows: &F) -> usize
where
    F: Fn(&Value) -> bool,
{
    let before = nodes.len();
    nodes.retain(|node| match node.get(shape.visibility_key) {
        None | Some(Value::Null) => true,
        Some(rule) => allows(rule),
    });
    let mut removed = before - nodes.len();

    for node in nodes.iter_mut() {
        let Value::Object(fields) = node else {
            continue;
        };
        for key in shape.child_keys {
            if let Some(Value::Array(children)) = fields.get_mut(key.as_str()) {
                removed += retain_visible(children, shape, allows);
            }
        }
    }

    removed
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
