//! Core commands and helpers for writing new ones
//!
//! A command inspects the current state and its JSON arguments and returns
//! the transaction it would dispatch, or `None` when it does not apply.

use quire_model::{Attrs, EditorState, Node, Schema, Selection, Transaction};
use serde_json::Value;

/// Insert text at the selection, replacing a non-empty selection.
///
/// A selection reaching outside textblocks (such as select-all) is first
/// narrowed to the textblock content it covers; covered blocks are joined.
/// Accepts a bare string or `{"text": "...", "pos": n}`.
pub fn insert_text(state: &EditorState, args: &Value) -> Option<Transaction> {
    let text = args.as_str().or_else(|| args.get("text").and_then(Value::as_str))?;
    if let Some(pos) = args.get("pos").and_then(Value::as_u64) {
        let pos = usize::try_from(pos).ok()?;
        return Some(state.tr().insert_text(pos, text));
    }

    let selection = state.selection();
    if selection.is_empty() {
        return Some(state.tr().insert_text(selection.from(), text));
    }
    let (from, to) = clip_to_textblocks(state.schema(), state.doc(), selection.from(), selection.to())?;
    let cursor = Selection::cursor(from + text.chars().count());
    Some(state.tr().delete(from, to).insert_text(from, text).set_selection(cursor))
}

pub fn select_all(state: &EditorState, _args: &Value) -> Option<Transaction> {
    Some(state.tr().set_selection(Selection::all(state.schema(), state.doc())))
}

/// Replace the document with the schema's empty document
pub fn clear_content(state: &EditorState, _args: &Value) -> Option<Transaction> {
    let doc = state.schema().empty_doc().ok()?;
    Some(state.tr().replace_doc(doc))
}

/// Toggle a mark over the selection; object arguments become mark attrs
pub fn toggle_mark(mark: impl Into<String>) -> impl Fn(&EditorState, &Value) -> Option<Transaction> {
    let mark = mark.into();
    move |state: &EditorState, args: &Value| {
        let selection = state.selection();
        if selection.is_empty() {
            return None;
        }
        let (from, to) = (selection.from(), selection.to());
        let schema = state.schema();

        if range_has_mark(schema, state.doc(), from, to, &mark) {
            Some(state.tr().remove_mark(from, to, mark.clone()))
        } else {
            let attrs = args_to_attrs(args);
            let mark = schema.mark(&mark, attrs).ok()?;
            Some(state.tr().add_mark(from, to, mark))
        }
    }
}

/// Object arguments as node or mark attributes
pub fn args_to_attrs(args: &Value) -> Attrs {
    args.as_object()
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

/// True when there is text in `from..to` and all of it carries `mark`
pub fn range_has_mark(schema: &Schema, doc: &Node, from: usize, to: usize, mark: &str) -> bool {
    let mut found = false;
    let mut all = true;
    visit_text(schema, doc, 0, &mut |start, node| {
        let end = start + node.text_len();
        if end > from && start < to {
            found = true;
            all &= node.has_mark(mark);
        }
    });
    found && all
}

/// Innermost textblock containing `pos`, with the position before it
pub fn textblock_at<'a>(schema: &Schema, doc: &'a Node, pos: usize) -> Option<(usize, &'a Node)> {
    let mut node = doc;
    let mut start = 0;
    'descend: loop {
        for child in &node.content {
            let size = schema.node_size(child);
            if !child.is_text() && !schema.is_leaf(child) && pos > start && pos < start + size {
                if schema.is_textblock(child) {
                    return Some((start, child));
                }
                node = child;
                start += 1;
                continue 'descend;
            }
            start += size;
        }
        return None;
    }
}

/// Narrow `from..to` to start and end inside the textblocks it touches
pub fn clip_to_textblocks(schema: &Schema, doc: &Node, from: usize, to: usize) -> Option<(usize, usize)> {
    let mut blocks = Vec::new();
    collect_textblocks(schema, doc, 0, &mut blocks);

    let start = blocks
        .iter()
        .find(|&&(_, end)| end >= from)
        .map(|&(start, _)| start.max(from))?;
    let end = blocks
        .iter()
        .rev()
        .find(|&&(start, _)| start <= to)
        .map(|&(_, end)| end.min(to))?;
    (start <= end).then_some((start, end))
}

/// Content start and end of every textblock, in document order
fn collect_textblocks(schema: &Schema, node: &Node, start: usize, out: &mut Vec<(usize, usize)>) {
    let mut pos = start;
    for child in &node.content {
        let size = schema.node_size(child);
        if schema.is_textblock(child) {
            out.push((pos + 1, pos + size - 1));
        } else if !child.is_text() && !schema.is_leaf(child) {
            collect_textblocks(schema, child, pos + 1, out);
        }
        pos += size;
    }
}

fn visit_text(schema: &Schema, node: &Node, start: usize, f: &mut dyn FnMut(usize, &Node)) {
    let mut pos = start;
    for child in &node.content {
        if child.is_text() {
            f(pos, child);
        } else if !schema.is_leaf(child) {
            visit_text(schema, child, pos + 1, f);
        }
        pos += schema.node_size(child);
    }
}
