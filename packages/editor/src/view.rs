//! # View Adapter
//!
//! The contract between the editor and a rendering surface. The editor
//! pushes states into the adapter; the adapter polls attributes and
//! editability through [`ViewProps`] whenever it needs them.
//!
//! [`HeadlessView`] renders nothing and records every call into a shared
//! [`CallLog`], which makes call ordering observable in tests and tools.

use quire_model::EditorState;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Attributes for the editable element
pub type ViewAttributes = BTreeMap<String, String>;

/// Values the adapter reads on demand; never cached across updates
pub trait ViewProps {
    fn attributes(&self) -> ViewAttributes;
    fn editable(&self) -> bool;
}

/// Static configuration handed to the adapter at construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewConfig {
    /// Node types rendered by custom node views
    pub node_views: Vec<String>,
}

/// A rendering surface bound to one editor
pub trait ViewAdapter {
    type Handle;

    /// Build the surface for the initial state
    fn construct(&mut self, state: &EditorState, config: &ViewConfig, props: &dyn ViewProps) -> Self::Handle;

    /// Commit a new state; called before any change notification fires
    fn update_state(&mut self, state: &EditorState, props: &dyn ViewProps);

    fn destroy(&mut self);
}

/// Shared, append-only record of calls
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Number of entries starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// What [`HeadlessView::construct`] hands back
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessHandle {
    pub node_views: Vec<String>,
    pub attributes: ViewAttributes,
    pub editable: bool,
}

/// View adapter without a surface
#[derive(Debug, Default)]
pub struct HeadlessView {
    log: CallLog,
    rendered: Option<EditorState>,
    attributes: ViewAttributes,
    editable: bool,
    destroyed: bool,
}

impl HeadlessView {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// State most recently committed to the view
    pub fn rendered(&self) -> Option<&EditorState> {
        self.rendered.as_ref()
    }

    /// Attributes read at the last construct or update
    pub fn attributes(&self) -> &ViewAttributes {
        &self.attributes
    }

    pub fn editable(&self) -> bool {
        self.editable
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn poll(&mut self, props: &dyn ViewProps) {
        self.attributes = props.attributes();
        self.editable = props.editable();
    }
}

impl ViewAdapter for HeadlessView {
    type Handle = HeadlessHandle;

    fn construct(&mut self, state: &EditorState, config: &ViewConfig, props: &dyn ViewProps) -> HeadlessHandle {
        self.log.record(format!("view.construct:{}", state.version()));
        self.rendered = Some(state.clone());
        self.poll(props);
        HeadlessHandle {
            node_views: config.node_views.clone(),
            attributes: self.attributes.clone(),
            editable: self.editable,
        }
    }

    fn update_state(&mut self, state: &EditorState, props: &dyn ViewProps) {
        self.log.record(format!("view.update:{}", state.version()));
        self.rendered = Some(state.clone());
        self.poll(props);
    }

    fn destroy(&mut self) {
        self.log.record("view.destroy");
        self.rendered = None;
        self.destroyed = true;
    }
}
