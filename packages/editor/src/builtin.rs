//! Builtin formatting extensions

use crate::commands::{textblock_at, toggle_mark};
use crate::extension::Extension;
use quire_model::{AttributeSpec, Attrs, EditorState, MarkSpec, NodeSpec, Transaction};
use serde_json::Value;

pub const MAX_HEADING_LEVEL: u64 = 6;

pub fn bold() -> Extension {
    Extension::new("bold")
        .with_mark(MarkSpec::new("bold"))
        .with_command("toggleBold", toggle_mark("bold"))
}

pub fn italic() -> Extension {
    Extension::new("italic")
        .with_mark(MarkSpec::new("italic"))
        .with_command("toggleItalic", toggle_mark("italic"))
}

pub fn heading() -> Extension {
    Extension::new("heading")
        .with_node(
            NodeSpec::new("heading")
                .with_content("inline*")
                .with_group("block")
                .with_attr("level", AttributeSpec::with_default(1)),
        )
        .with_command("setHeadingLevel", set_heading_level)
}

/// Look up a builtin by name
pub fn by_name(name: &str) -> Option<Extension> {
    match name {
        "bold" => Some(bold()),
        "italic" => Some(italic()),
        "heading" => Some(heading()),
        _ => None,
    }
}

/// Change the level of the heading around the cursor; `{"level": n}`
fn set_heading_level(state: &EditorState, args: &Value) -> Option<Transaction> {
    let level = args
        .get("level")
        .and_then(Value::as_u64)
        .filter(|l| (1..=MAX_HEADING_LEVEL).contains(l))?;

    let (pos, block) = textblock_at(state.schema(), state.doc(), state.selection().from())?;
    if block.kind != "heading" {
        return None;
    }

    let mut attrs = Attrs::new();
    attrs.insert("level".to_string(), Value::from(level));
    Some(state.tr().set_node_attrs(pos, attrs))
}
