//! # Steps
//!
//! Atomic document changes. A step never mutates its input: it returns a
//! new tree, or a [`StepError`] leaving the input untouched.
//!
//! ## Positions
//!
//! Positions count tokens between nodes. Inside a node with content,
//! position 0 sits before its first child; entering or leaving a non-leaf
//! node costs one token, a leaf costs one, and text costs one per char:
//!
//! ```text
//!   0   1 2 3   4
//!   <p> H i </p>      doc(paragraph("Hi")), content size 4
//! ```
//!
//! ## Normalization
//!
//! After every change, sibling lists are normalized: empty text nodes are
//! dropped and adjacent text nodes with identical marks are merged.

use crate::error::StepError;
use crate::node::{Attrs, Mark, Node};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};

/// A single document change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
    /// Insert text at a position inside a textblock
    InsertText {
        pos: usize,
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },

    /// Insert a node at a position
    InsertNode { pos: usize, node: Node },

    /// Delete the content between two positions. Both positions share a
    /// parent, or sit in sibling textblocks, which are then joined.
    Delete { from: usize, to: usize },

    /// Add a mark to all text in a range
    AddMark { from: usize, to: usize, mark: Mark },

    /// Remove a mark type from all text in a range
    RemoveMark {
        from: usize,
        to: usize,
        #[serde(rename = "markType")]
        mark_type: String,
    },

    /// Merge attributes into the node starting at a position
    SetNodeAttrs { pos: usize, attrs: Attrs },

    /// Replace the whole document
    ReplaceDoc { doc: Node },
}

/// Parent path and offset a position resolves to
#[derive(Debug, Clone, PartialEq)]
struct Located {
    /// Child indexes from the root down to the parent
    path: Vec<usize>,
    /// Offset inside the parent's content
    offset: usize,
}

impl Step {
    /// Apply the step, producing a new document
    pub fn apply(&self, schema: &Schema, doc: &Node) -> Result<Node, StepError> {
        match self {
            Step::InsertText { pos, text, marks } => {
                if text.is_empty() {
                    return Ok(doc.clone());
                }
                let located = locate(schema, doc, *pos)?;
                let parent = node_at(doc, &located.path);
                if !schema.is_textblock(parent) {
                    return Err(StepError::NotTextblock(*pos));
                }

                let mut marks = marks.clone();
                schema.sort_marks(&mut marks);
                let inserted = Node::text(text.clone()).with_marks(marks);

                update_at(doc, &located.path, |parent| {
                    let (mut before, after) = split_children(schema, &parent.content, located.offset);
                    before.push(inserted);
                    before.extend(after);
                    Ok(with_content(parent, before))
                })
            }

            Step::InsertNode { pos, node } => {
                let located = locate(schema, doc, *pos)?;
                update_at(doc, &located.path, |parent| {
                    let (mut before, after) = split_children(schema, &parent.content, located.offset);
                    before.push(node.clone());
                    before.extend(after);
                    Ok(with_content(parent, before))
                })
            }

            Step::Delete { from, to } => {
                let (from, to) = ordered(*from, *to);
                if from == to {
                    return Ok(doc.clone());
                }
                let start = locate(schema, doc, from)?;
                let end = locate(schema, doc, to)?;
                if start.path != end.path {
                    return join_textblocks(schema, doc, &start, &end)
                        .ok_or(StepError::CrossesNodes { from, to })?;
                }

                update_at(doc, &start.path, |parent| {
                    let (before, _) = split_children(schema, &parent.content, start.offset);
                    let (_, after) = split_children(schema, &parent.content, end.offset);
                    let mut content = before;
                    content.extend(after);
                    Ok(with_content(parent, content))
                })
            }

            Step::AddMark { from, to, mark } => {
                if schema.mark_type(&mark.kind).is_none() {
                    return Err(StepError::UnknownMark(mark.kind.clone()));
                }
                let (from, to) = ordered(*from, *to);
                check_range(schema, doc, to)?;
                Ok(map_text_range(schema, doc, 0, from, to, &|marks: &mut Vec<Mark>| {
                    marks.retain(|m| m.kind != mark.kind);
                    marks.push(mark.clone());
                    schema.sort_marks(marks);
                }))
            }

            Step::RemoveMark { from, to, mark_type } => {
                if schema.mark_type(mark_type).is_none() {
                    return Err(StepError::UnknownMark(mark_type.clone()));
                }
                let (from, to) = ordered(*from, *to);
                check_range(schema, doc, to)?;
                Ok(map_text_range(schema, doc, 0, from, to, &|marks: &mut Vec<Mark>| {
                    marks.retain(|m| m.kind != *mark_type);
                }))
            }

            Step::SetNodeAttrs { pos, attrs } => {
                let located = locate(schema, doc, *pos)?;
                let parent = node_at(doc, &located.path);
                let index = child_starting_at(schema, parent, located.offset)
                    .filter(|&i| !parent.content[i].is_text())
                    .ok_or(StepError::NoNodeAt(*pos))?;

                update_at(doc, &located.path, |parent| {
                    let mut content = parent.content.clone();
                    for (name, value) in attrs {
                        content[index].attrs.insert(name.clone(), value.clone());
                    }
                    Ok(with_content(parent, content))
                })
            }

            Step::ReplaceDoc { doc: replacement } => Ok(replacement.clone()),
        }
    }

    /// Map a position in the document before the step to the document after it
    pub fn map(&self, schema: &Schema, pos: usize) -> usize {
        match self {
            Step::InsertText { pos: at, text, .. } if pos >= *at => pos + text.chars().count(),
            Step::InsertNode { pos: at, node } if pos >= *at => pos + schema.node_size(node),
            Step::Delete { from, to } => {
                let (from, to) = ordered(*from, *to);
                if pos <= from {
                    pos
                } else if pos >= to {
                    pos - (to - from)
                } else {
                    from
                }
            }
            _ => pos,
        }
    }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn check_range(schema: &Schema, doc: &Node, pos: usize) -> Result<(), StepError> {
    let size = schema.content_size(doc);
    if pos > size {
        Err(StepError::OutOfRange { pos, size })
    } else {
        Ok(())
    }
}

/// Resolve a position to its innermost parent and the offset inside it
fn locate(schema: &Schema, doc: &Node, pos: usize) -> Result<Located, StepError> {
    check_range(schema, doc, pos)?;

    let mut path = Vec::new();
    let mut node = doc;
    let mut rel = pos;

    'descend: loop {
        let mut offset = 0;
        for (i, child) in node.content.iter().enumerate() {
            let end = offset + schema.node_size(child);
            if rel > offset && rel < end && !child.is_text() && !schema.is_leaf(child) {
                path.push(i);
                rel -= offset + 1;
                node = child;
                continue 'descend;
            }
            if rel < end {
                break;
            }
            offset = end;
        }
        return Ok(Located { path, offset: rel });
    }
}

/// Delete from `start` in one textblock to `end` in a later sibling
/// textblock, keeping the first block's type and attrs.
/// `None` when the positions are not in sibling textblocks.
fn join_textblocks(
    schema: &Schema,
    doc: &Node,
    start: &Located,
    end: &Located,
) -> Option<Result<Node, StepError>> {
    let (&first, parent_path) = start.path.split_last()?;
    let (&last, end_parent_path) = end.path.split_last()?;
    if parent_path != end_parent_path || first >= last {
        return None;
    }
    let parent = node_at(doc, parent_path);
    if !schema.is_textblock(&parent.content[first]) || !schema.is_textblock(&parent.content[last]) {
        return None;
    }

    Some(update_at(doc, parent_path, |parent| {
        let head_block = &parent.content[first];
        let (mut joined, _) = split_children(schema, &head_block.content, start.offset);
        let (_, tail) = split_children(schema, &parent.content[last].content, end.offset);
        joined.extend(tail);

        let mut content = parent.content[..first].to_vec();
        content.push(with_content(head_block, joined));
        content.extend_from_slice(&parent.content[last + 1..]);
        Ok(with_content(parent, content))
    }))
}

fn node_at<'a>(doc: &'a Node, path: &[usize]) -> &'a Node {
    path.iter().fold(doc, |node, &i| &node.content[i])
}

/// Rebuild the tree with the node at `path` replaced by `f(node)`
fn update_at<F>(node: &Node, path: &[usize], f: F) -> Result<Node, StepError>
where
    F: FnOnce(&Node) -> Result<Node, StepError>,
{
    match path.split_first() {
        None => f(node),
        Some((&index, rest)) => {
            let child = update_at(&node.content[index], rest, f)?;
            let mut content = node.content.clone();
            content[index] = child;
            Ok(with_content(node, content))
        }
    }
}

fn with_content(node: &Node, content: Vec<Node>) -> Node {
    Node {
        kind: node.kind.clone(),
        attrs: node.attrs.clone(),
        content: normalize(content),
        text: node.text.clone(),
        marks: node.marks.clone(),
    }
}

fn child_starting_at(schema: &Schema, parent: &Node, offset: usize) -> Option<usize> {
    let mut pos = 0;
    for (i, child) in parent.content.iter().enumerate() {
        if pos == offset {
            return Some(i);
        }
        pos += schema.node_size(child);
        if pos > offset {
            break;
        }
    }
    None
}

/// Split a sibling list at a content offset, cutting text nodes if needed
fn split_children(schema: &Schema, children: &[Node], offset: usize) -> (Vec<Node>, Vec<Node>) {
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut pos = 0;

    for child in children {
        let size = schema.node_size(child);
        if pos + size <= offset {
            before.push(child.clone());
        } else if pos >= offset {
            after.push(child.clone());
        } else {
            // Only text can straddle an offset at this depth
            let (left, right) = split_text(child, offset - pos);
            before.push(left);
            after.push(right);
        }
        pos += size;
    }

    (before, after)
}

fn split_text(node: &Node, at: usize) -> (Node, Node) {
    let text = node.text.as_deref().unwrap_or_default();
    let left: String = text.chars().take(at).collect();
    let right: String = text.chars().skip(at).collect();
    (
        Node::text(left).with_marks(node.marks.clone()),
        Node::text(right).with_marks(node.marks.clone()),
    )
}

/// Apply `f` to the marks of all text overlapping `[from, to)`.
/// `start` is the document position of `node`'s content start.
fn map_text_range(
    schema: &Schema,
    node: &Node,
    start: usize,
    from: usize,
    to: usize,
    f: &dyn Fn(&mut Vec<Mark>),
) -> Node {
    let mut content = Vec::with_capacity(node.content.len());
    let mut pos = start;

    for child in &node.content {
        let size = schema.node_size(child);
        let end = pos + size;

        if end <= from || pos >= to {
            content.push(child.clone());
        } else if child.is_text() {
            let cut_start = from.saturating_sub(pos);
            let cut_end = (to - pos).min(size);
            let (head, rest) = split_text(child, cut_start);
            let (mut middle, tail) = split_text(&rest, cut_end - cut_start);
            f(&mut middle.marks);
            content.extend([head, middle, tail]);
        } else if schema.is_leaf(child) {
            content.push(child.clone());
        } else {
            content.push(map_text_range(schema, child, pos + 1, from, to, f));
        }

        pos = end;
    }

    with_content(node, content)
}

/// Drop empty text and merge adjacent text nodes with equal marks
fn normalize(content: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(content.len());
    for node in content {
        if node.is_text() && node.text.as_deref().map(str::is_empty).unwrap_or(true) {
            continue;
        }
        if let Some(last) = out.last_mut() {
            if last.is_text() && node.is_text() && last.marks == node.marks {
                let merged = format!(
                    "{}{}",
                    last.text.as_deref().unwrap_or_default(),
                    node.text.as_deref().unwrap_or_default()
                );
                last.text = Some(merged);
                continue;
            }
        }
        out.push(node);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSpec, MarkSpec, NodeSpec};

    fn schema() -> Schema {
        Schema::compile(
            vec![
                NodeSpec::new("doc").with_content("block+"),
                NodeSpec::new("paragraph").with_content("inline*").with_group("block"),
                NodeSpec::new("heading")
                    .with_content("inline*")
                    .with_group("block")
                    .with_attr("level", AttributeSpec::with_default(1)),
                NodeSpec::new("text").with_group("inline"),
                NodeSpec::new("hard_break").with_group("inline").inline(),
            ],
            vec![MarkSpec::new("bold"), MarkSpec::new("italic")],
        )
        .unwrap()
    }

    fn doc(blocks: Vec<Node>) -> Node {
        Node::element("doc", blocks)
    }

    fn p(text: &str) -> Node {
        if text.is_empty() {
            Node::new("paragraph")
        } else {
            Node::element("paragraph", vec![Node::text(text)])
        }
    }

    #[test]
    fn test_locate_descends_into_blocks() {
        let schema = schema();
        let d = doc(vec![p("ab"), p("cd")]);

        assert_eq!(locate(&schema, &d, 0).unwrap(), Located { path: vec![], offset: 0 });
        assert_eq!(locate(&schema, &d, 1).unwrap(), Located { path: vec![0], offset: 0 });
        assert_eq!(locate(&schema, &d, 3).unwrap(), Located { path: vec![0], offset: 2 });
        assert_eq!(locate(&schema, &d, 4).unwrap(), Located { path: vec![], offset: 4 });
        assert_eq!(locate(&schema, &d, 6).unwrap(), Located { path: vec![1], offset: 1 });
        assert!(matches!(
            locate(&schema, &d, 9),
            Err(StepError::OutOfRange { pos: 9, size: 8 })
        ));
    }

    #[test]
    fn test_insert_text_into_empty_paragraph() {
        let schema = schema();
        let step = Step::InsertText {
            pos: 1,
            text: "Hi".into(),
            marks: vec![],
        };
        let result = step.apply(&schema, &doc(vec![p("")])).unwrap();
        assert_eq!(result, doc(vec![p("Hi")]));
    }

    #[test]
    fn test_insert_text_splits_and_merges() {
        let schema = schema();
        let step = Step::InsertText {
            pos: 2,
            text: "X".into(),
            marks: vec![],
        };
        let result = step.apply(&schema, &doc(vec![p("ab")])).unwrap();

        // Same marks on both sides merge back into one text node
        assert_eq!(result, doc(vec![p("aXb")]));
    }

    #[test]
    fn test_insert_text_outside_textblock_fails() {
        let schema = schema();
        let step = Step::InsertText {
            pos: 0,
            text: "X".into(),
            marks: vec![],
        };
        assert_eq!(step.apply(&schema, &doc(vec![p("ab")])), Err(StepError::NotTextblock(0)));
    }

    #[test]
    fn test_add_mark_splits_text() {
        let schema = schema();
        let step = Step::AddMark {
            from: 2,
            to: 3,
            mark: Mark::new("bold"),
        };
        let result = step.apply(&schema, &doc(vec![p("abc")])).unwrap();

        assert_eq!(
            result.content[0].content,
            vec![
                Node::text("a"),
                Node::text("b").with_marks(vec![Mark::new("bold")]),
                Node::text("c"),
            ]
        );
    }

    #[test]
    fn test_marks_keep_schema_order() {
        let schema = schema();
        let d = doc(vec![Node::element(
            "paragraph",
            vec![Node::text("a").with_marks(vec![Mark::new("italic")])],
        )]);
        let step = Step::AddMark {
            from: 1,
            to: 2,
            mark: Mark::new("bold"),
        };
        let result = step.apply(&schema, &d).unwrap();
        assert_eq!(
            result.content[0].content[0].marks,
            vec![Mark::new("bold"), Mark::new("italic")]
        );
    }

    #[test]
    fn test_remove_mark_merges_neighbours() {
        let schema = schema();
        let d = doc(vec![Node::element(
            "paragraph",
            vec![
                Node::text("a"),
                Node::text("b").with_marks(vec![Mark::new("bold")]),
                Node::text("c"),
            ],
        )]);
        let step = Step::RemoveMark {
            from: 0,
            to: 5,
            mark_type: "bold".into(),
        };
        assert_eq!(step.apply(&schema, &d).unwrap(), doc(vec![p("abc")]));
    }

    #[test]
    fn test_add_mark_across_blocks() {
        let schema = schema();
        let step = Step::AddMark {
            from: 2,
            to: 6,
            mark: Mark::new("bold"),
        };
        let result = step.apply(&schema, &doc(vec![p("ab"), p("cd")])).unwrap();

        assert_eq!(result.content[0].content[1], Node::text("b").with_marks(vec![Mark::new("bold")]));
        assert_eq!(result.content[1].content[0], Node::text("c").with_marks(vec![Mark::new("bold")]));
        assert_eq!(result.content[1].content[1], Node::text("d"));
    }

    #[test]
    fn test_unknown_mark_is_rejected() {
        let schema = schema();
        let step = Step::AddMark {
            from: 1,
            to: 2,
            mark: Mark::new("strike"),
        };
        assert_eq!(
            step.apply(&schema, &doc(vec![p("a")])),
            Err(StepError::UnknownMark("strike".into()))
        );
    }

    #[test]
    fn test_delete_within_textblock() {
        let schema = schema();
        let step = Step::Delete { from: 2, to: 4 };
        assert_eq!(step.apply(&schema, &doc(vec![p("abcd")])).unwrap(), doc(vec![p("ad")]));
    }

    #[test]
    fn test_delete_whole_block() {
        let schema = schema();
        let step = Step::Delete { from: 3, to: 6 };
        assert_eq!(
            step.apply(&schema, &doc(vec![p("a"), p("b"), p("c")])).unwrap(),
            doc(vec![p("a"), p("c")])
        );
    }

    #[test]
    fn test_delete_across_blocks_joins_them() {
        let schema = schema();
        let step = Step::Delete { from: 2, to: 10 };
        let d = doc(vec![p("ab"), p("cd"), p("ef")]);

        let result = step.apply(&schema, &d).unwrap();
        assert_eq!(result, doc(vec![p("af")]));
        assert_eq!(schema.content_size(&result), schema.content_size(&d) - 8);
        assert_eq!(step.map(&schema, 11), 3);
    }

    #[test]
    fn test_delete_join_keeps_first_block_type() {
        let schema = schema();
        let heading = Node::element("heading", vec![Node::text("Title")]).with_attr("level", 2);
        let step = Step::Delete { from: 3, to: 9 };

        let result = step.apply(&schema, &doc(vec![heading, p("body")])).unwrap();
        assert_eq!(result.content.len(), 1);
        assert_eq!(result.content[0].kind, "heading");
        assert_eq!(result.content[0].attrs.get("level"), Some(&serde_json::Value::from(2)));
        assert_eq!(result.content[0].text_content(), "Tiody");
    }

    #[test]
    fn test_delete_across_depths_fails() {
        let schema = schema();
        let step = Step::Delete { from: 0, to: 2 };
        assert_eq!(
            step.apply(&schema, &doc(vec![p("ab"), p("cd")])),
            Err(StepError::CrossesNodes { from: 0, to: 2 })
        );
    }

    #[test]
    fn test_insert_node_between_blocks() {
        let schema = schema();
        let step = Step::InsertNode {
            pos: 3,
            node: Node::element("heading", vec![Node::text("T")]).with_attr("level", 2),
        };
        let result = step.apply(&schema, &doc(vec![p("a"), p("b")])).unwrap();
        assert_eq!(result.content[1].kind, "heading");
        assert_eq!(result.content.len(), 3);
    }

    #[test]
    fn test_set_node_attrs() {
        let schema = schema();
        let d = doc(vec![p("a"), Node::element("heading", vec![Node::text("T")])]);
        let mut attrs = Attrs::new();
        attrs.insert("level".into(), 3.into());

        let result = Step::SetNodeAttrs { pos: 3, attrs: attrs.clone() }
            .apply(&schema, &d)
            .unwrap();
        assert_eq!(result.content[1].attrs, attrs);

        assert_eq!(
            Step::SetNodeAttrs { pos: 1, attrs }.apply(&schema, &d),
            Err(StepError::NoNodeAt(1))
        );
    }

    #[test]
    fn test_map_positions() {
        let schema = schema();
        let insert = Step::InsertText {
            pos: 2,
            text: "xyz".into(),
            marks: vec![],
        };
        assert_eq!(insert.map(&schema, 1), 1);
        assert_eq!(insert.map(&schema, 2), 5);

        let delete = Step::Delete { from: 2, to: 4 };
        assert_eq!(delete.map(&schema, 1), 1);
        assert_eq!(delete.map(&schema, 3), 2);
        assert_eq!(delete.map(&schema, 6), 4);
    }

    #[test]
    fn test_step_json_shape() {
        let step = Step::RemoveMark {
            from: 1,
            to: 2,
            mark_type: "bold".into(),
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "step": "removeMark", "from": 1, "to": 2, "markType": "bold" })
        );
    }
}
