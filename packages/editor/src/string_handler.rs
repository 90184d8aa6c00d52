//! Builtin string handlers

use crate::error::{EditorError, EditorResult};
use quire_model::{Node, Schema};

/// One textblock per line, in the schema's default textblock type
pub fn text_handler(raw: &str, schema: &Schema) -> EditorResult<Node> {
    let block = schema
        .default_textblock()
        .ok_or_else(|| EditorError::InvalidContent("schema has no plain textblock type".to_string()))?;

    let blocks = raw
        .lines()
        .map(|line| {
            let content = if line.is_empty() {
                Vec::new()
            } else {
                vec![Node::text(line)]
            };
            schema.node(block.name(), Default::default(), content)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Node::element(schema.top_node_type().name(), blocks))
}

/// Document JSON in the node interchange format
pub fn json_handler(raw: &str, _schema: &Schema) -> EditorResult<Node> {
    Ok(serde_json::from_str(raw)?)
}
