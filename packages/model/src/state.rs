//! # Editor State
//!
//! [`EditorState`] is an immutable snapshot of document, selection and the
//! metadata of the transaction that produced it. States are never changed
//! in place: [`EditorState::apply`] returns a new value and leaves the old
//! one intact, so a rejected transaction is never partially visible.
//!
//! Every applied transaction bumps the version by one. Every state also
//! carries an id that no other state shares, including states created
//! independently at the same version. A [`Transaction`] remembers the id of
//! the state it was built against and is rejected as stale if applied to
//! any other state.

use crate::error::{SchemaError, TransformError};
use crate::node::{Attrs, Mark, Node};
use crate::schema::Schema;
use crate::transform::Step;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_STATE_ID: AtomicU64 = AtomicU64::new(1);

fn next_state_id() -> u64 {
    NEXT_STATE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Transaction or state metadata
pub type Meta = BTreeMap<String, Value>;

/// Meta key consulted by history implementations
pub const ADD_TO_HISTORY: &str = "addToHistory";

/// Text selection between two positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Self { anchor: pos, head: pos }
    }

    pub fn range(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Cursor at the first position inside the first textblock
    pub fn at_start(schema: &Schema, doc: &Node) -> Self {
        let mut pos = 0;
        let mut node = doc;
        while let Some(first) = node.content.first() {
            if first.is_text() || schema.is_leaf(first) {
                break;
            }
            pos += 1;
            node = first;
            if schema.is_textblock(node) {
                break;
            }
        }
        Self::cursor(pos)
    }

    /// Selection spanning the whole document
    pub fn all(schema: &Schema, doc: &Node) -> Self {
        Self::range(0, schema.content_size(doc))
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    fn map(self, schema: &Schema, step: &Step) -> Self {
        Self {
            anchor: step.map(schema, self.anchor),
            head: step.map(schema, self.head),
        }
    }

    fn clamp(self, max: usize) -> Self {
        Self {
            anchor: self.anchor.min(max),
            head: self.head.min(max),
        }
    }
}

/// Description of an intended change against one specific state
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    base_state: u64,
    base_version: u64,
    steps: Vec<Step>,
    selection: Option<Selection>,
    meta: Meta,
    trigger_change: bool,
}

impl Transaction {
    /// Start a transaction against the state identified by `base_state`
    pub fn new(base_state: u64, base_version: u64) -> Self {
        Self {
            base_state,
            base_version,
            steps: Vec::new(),
            selection: None,
            meta: Meta::new(),
            trigger_change: true,
        }
    }

    /// Id of the state this transaction was built against
    pub fn base_state(&self) -> u64 {
        self.base_state
    }

    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn get_meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    /// Whether the change callback should fire for this transaction
    pub fn triggers_change(&self) -> bool {
        self.trigger_change
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn insert_text(self, pos: usize, text: impl Into<String>) -> Self {
        self.insert_marked_text(pos, text, Vec::new())
    }

    pub fn insert_marked_text(self, pos: usize, text: impl Into<String>, marks: Vec<Mark>) -> Self {
        self.step(Step::InsertText {
            pos,
            text: text.into(),
            marks,
        })
    }

    pub fn insert_node(self, pos: usize, node: Node) -> Self {
        self.step(Step::InsertNode { pos, node })
    }

    pub fn delete(self, from: usize, to: usize) -> Self {
        self.step(Step::Delete { from, to })
    }

    pub fn add_mark(self, from: usize, to: usize, mark: Mark) -> Self {
        self.step(Step::AddMark { from, to, mark })
    }

    pub fn remove_mark(self, from: usize, to: usize, mark_type: impl Into<String>) -> Self {
        self.step(Step::RemoveMark {
            from,
            to,
            mark_type: mark_type.into(),
        })
    }

    pub fn set_node_attrs(self, pos: usize, attrs: Attrs) -> Self {
        self.step(Step::SetNodeAttrs { pos, attrs })
    }

    pub fn replace_doc(self, doc: Node) -> Self {
        self.step(Step::ReplaceDoc { doc })
    }

    pub fn set_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn set_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Commit without firing the change callback
    pub fn without_change_trigger(mut self) -> Self {
        self.trigger_change = false;
        self
    }

    pub fn add_to_history(self, add: bool) -> Self {
        self.set_meta(ADD_TO_HISTORY, add)
    }
}

/// Immutable snapshot of a document at one point in time
#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Arc<Schema>,
    doc: Arc<Node>,
    selection: Selection,
    id: u64,
    version: u64,
    meta: Arc<Meta>,
}

impl EditorState {
    /// Create a validated initial state (version 0)
    pub fn create(schema: Arc<Schema>, doc: Node, selection: Option<Selection>) -> Result<Self, SchemaError> {
        schema.check(&doc)?;
        let size = schema.content_size(&doc);
        let selection = selection
            .unwrap_or_else(|| Selection::at_start(&schema, &doc))
            .clamp(size);

        Ok(Self {
            schema,
            doc: Arc::new(doc),
            selection,
            id: next_state_id(),
            version: 0,
            meta: Arc::new(Meta::new()),
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Identity of this exact state; never shared with another state
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Metadata of the transaction that produced this state
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Start a transaction against this state
    pub fn tr(&self) -> Transaction {
        Transaction::new(self.id, self.version)
    }

    /// Apply a transaction, producing the next state
    pub fn apply(&self, tr: &Transaction) -> Result<EditorState, TransformError> {
        if tr.base_state() != self.id {
            return Err(TransformError::Stale {
                expected: tr.base_version(),
                found: self.version,
            });
        }

        let mut selection = self.selection;
        let mut next: Option<Node> = None;

        for (index, step) in tr.steps().iter().enumerate() {
            let source = next.as_ref().unwrap_or(self.doc.as_ref());
            let doc = step
                .apply(&self.schema, source)
                .map_err(|source| TransformError::Step { index, source })?;

            selection = match step {
                Step::ReplaceDoc { .. } => Selection::at_start(&self.schema, &doc),
                _ => selection.map(&self.schema, step),
            };
            next = Some(doc);
        }

        let doc = match next {
            Some(doc) => {
                self.schema.check(&doc)?;
                Arc::new(doc)
            }
            None => Arc::clone(&self.doc),
        };

        let size = self.schema.content_size(&doc);
        let selection = tr.selection().unwrap_or(selection).clamp(size);

        Ok(EditorState {
            schema: Arc::clone(&self.schema),
            doc,
            selection,
            id: next_state_id(),
            version: self.version + 1,
            meta: Arc::new(tr.meta().clone()),
        })
    }

    /// Whether both states share the same schema instance
    pub fn same_schema(&self, schema: &Arc<Schema>) -> bool {
        Arc::ptr_eq(&self.schema, schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepError;
    use crate::schema::{MarkSpec, NodeSpec};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::compile(
                vec![
                    NodeSpec::new("doc").with_content("block+"),
                    NodeSpec::new("paragraph").with_content("inline*").with_group("block"),
                    NodeSpec::new("text").with_group("inline"),
                ],
                vec![MarkSpec::new("bold")],
            )
            .unwrap(),
        )
    }

    fn empty_state() -> EditorState {
        let schema = schema();
        let doc = schema.empty_doc().unwrap();
        EditorState::create(schema, doc, None).unwrap()
    }

    #[test]
    fn test_initial_selection_inside_first_textblock() {
        let state = empty_state();
        assert_eq!(state.selection(), Selection::cursor(1));
        assert_eq!(state.version(), 0);
    }

    #[test]
    fn test_apply_returns_new_state() {
        let state = empty_state();
        let next = state.apply(&state.tr().insert_text(1, "Hi")).unwrap();

        assert_eq!(next.version(), 1);
        assert_eq!(next.doc().text_content(), "Hi");
        assert_eq!(next.selection(), Selection::cursor(3));
        // Original is untouched
        assert_eq!(state.doc().text_content(), "");
        assert_eq!(state.version(), 0);
    }

    #[test]
    fn test_stale_transaction_rejected() {
        let state = empty_state();
        let tr = state.tr().insert_text(1, "a");
        let next = state.apply(&tr).unwrap();

        assert_eq!(
            next.apply(&tr).unwrap_err(),
            TransformError::Stale { expected: 0, found: 1 }
        );
    }

    #[test]
    fn test_transaction_bound_to_its_own_state() {
        let first = empty_state();
        let second = empty_state();
        assert_eq!(first.version(), second.version());
        assert_ne!(first.id(), second.id());

        let tr = first.tr().insert_text(1, "a");
        assert_eq!(
            second.apply(&tr).unwrap_err(),
            TransformError::Stale { expected: 0, found: 0 }
        );
        assert!(first.apply(&tr).is_ok());
    }

    #[test]
    fn test_invalid_result_rejected_atomically() {
        let state = empty_state();
        // Text directly under doc violates `block+`
        let tr = state.tr().insert_text(1, "ok").insert_node(0, Node::text("loose"));

        assert!(matches!(state.apply(&tr), Err(TransformError::Invalid(_))));
        assert_eq!(state.doc().text_content(), "");
    }

    #[test]
    fn test_failing_step_reports_index() {
        let state = empty_state();
        let tr = state.tr().insert_text(1, "a").insert_text(40, "b");

        assert!(matches!(
            state.apply(&tr),
            Err(TransformError::Step {
                index: 1,
                source: StepError::OutOfRange { pos: 40, .. }
            })
        ));
    }

    #[test]
    fn test_replace_doc_resets_selection() {
        let state = empty_state();
        let state = state.apply(&state.tr().insert_text(1, "Hello")).unwrap();
        let replacement = Node::element(
            "doc",
            vec![Node::new("paragraph"), Node::element("paragraph", vec![Node::text("x")])],
        );
        let next = state.apply(&state.tr().replace_doc(replacement)).unwrap();

        assert_eq!(next.selection(), Selection::cursor(1));
    }

    #[test]
    fn test_explicit_selection_is_clamped() {
        let state = empty_state();
        let next = state.apply(&state.tr().set_selection(Selection::range(0, 99))).unwrap();
        assert_eq!(next.selection(), Selection::range(0, 2));
    }

    #[test]
    fn test_meta_carried_to_state() {
        let state = empty_state();
        let next = state
            .apply(&state.tr().set_meta("origin", "test").add_to_history(false))
            .unwrap();

        assert_eq!(next.meta().get("origin"), Some(&Value::from("test")));
        assert_eq!(next.meta().get(ADD_TO_HISTORY), Some(&Value::from(false)));
    }
}
