//! # Extensions
//!
//! An [`Extension`] is a self-contained unit contributing schema types,
//! options, commands, string handlers, view attributes and lifecycle
//! hooks. Extensions never call each other; an extension may read the
//! resolved options of the extensions it declares in [`Extension::requires`].
//!
//! ## Hooks
//!
//! Hooks are an explicit table of optional callbacks ([`ExtensionHooks`]).
//! A missing hook is a no-op.
//!
//! ```text
//! on_create        manager constructed (registry order)
//! on_ready         manager.ready(), once (registry order)
//! on_state_update  every committed transition (registry order)
//! on_destroy       manager.destroy(), once (reverse registry order)
//! ```

use crate::error::{EditorError, EditorResult};
use crate::manager::HookContext;
use crate::pipeline::StateUpdate;
use quire_model::{EditorState, MarkSpec, Node, NodeSpec, Schema, Transaction};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

/// Extension options keyed by option name
pub type Options = BTreeMap<String, Value>;

/// Named editing action: builds a transaction, or `None` when not applicable
pub type Command = Rc<dyn Fn(&EditorState, &Value) -> Option<Transaction>>;

/// Parses raw string content into a document
pub type StringHandler = Rc<dyn Fn(&str, &Schema) -> EditorResult<Node>>;

pub type LifecycleHook = Rc<dyn Fn(&HookContext<'_>)>;

pub type StateUpdateHook = Rc<dyn Fn(&HookContext<'_>, &StateUpdate<'_>)>;

/// Ordering priority; higher priorities sort first and win name clashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    pub const LOWEST: Priority = Priority(0);
    pub const LOW: Priority = Priority(10);
    pub const DEFAULT: Priority = Priority(100);
    pub const MEDIUM: Priority = Priority(1_000);
    pub const HIGH: Priority = Priority(10_000);
    pub const HIGHEST: Priority = Priority(100_000);
    pub const CRITICAL: Priority = Priority(1_000_000);
}

impl Default for Priority {
    fn default() -> Self {
        Priority::DEFAULT
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Priority(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optional lifecycle callbacks
#[derive(Clone, Default)]
pub struct ExtensionHooks {
    pub on_create: Option<LifecycleHook>,
    pub on_ready: Option<LifecycleHook>,
    pub on_state_update: Option<StateUpdateHook>,
    pub on_destroy: Option<LifecycleHook>,
}

impl fmt::Debug for ExtensionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionHooks")
            .field("on_create", &self.on_create.is_some())
            .field("on_ready", &self.on_ready.is_some())
            .field("on_state_update", &self.on_state_update.is_some())
            .field("on_destroy", &self.on_destroy.is_some())
            .finish()
    }
}

/// A unit of editor behavior
#[derive(Clone)]
pub struct Extension {
    name: String,
    priority: Priority,
    baseline: bool,
    requires: Vec<String>,
    defaults: Options,
    overrides: Options,
    mutable: BTreeSet<String>,
    nodes: Vec<NodeSpec>,
    marks: Vec<MarkSpec>,
    commands: Vec<(String, Command)>,
    string_handlers: Vec<(String, StringHandler)>,
    attributes: BTreeMap<String, String>,
    node_views: Vec<String>,
    hooks: ExtensionHooks,
}

impl Extension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: Priority::DEFAULT,
            baseline: false,
            requires: Vec::new(),
            defaults: Options::new(),
            overrides: Options::new(),
            mutable: BTreeSet::new(),
            nodes: Vec::new(),
            marks: Vec::new(),
            commands: Vec::new(),
            string_handlers: Vec::new(),
            attributes: BTreeMap::new(),
            node_views: Vec::new(),
            hooks: ExtensionHooks::default(),
        }
    }

    pub fn with_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Mark as a baseline member that yields to user extensions
    /// carrying the same name or type names
    pub fn baseline(mut self) -> Self {
        self.baseline = true;
        self
    }

    /// Declare a dependency on another extension
    pub fn requires(mut self, name: impl Into<String>) -> Self {
        self.requires.push(name.into());
        self
    }

    /// Declare an option with its default value
    pub fn with_option(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.defaults.insert(name.into(), default.into());
        self
    }

    /// Declare an option that may be changed after construction
    pub fn with_mutable_option(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        let name = name.into();
        self.mutable.insert(name.clone());
        self.with_option(name, default)
    }

    /// Override declared option defaults
    pub fn configure(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    pub fn with_node(mut self, spec: NodeSpec) -> Self {
        self.nodes.push(spec);
        self
    }

    pub fn with_mark(mut self, spec: MarkSpec) -> Self {
        self.marks.push(spec);
        self
    }

    pub fn with_command<F>(mut self, name: impl Into<String>, command: F) -> Self
    where
        F: Fn(&EditorState, &Value) -> Option<Transaction> + 'static,
    {
        self.commands.push((name.into(), Rc::new(command)));
        self
    }

    pub fn with_string_handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str, &Schema) -> EditorResult<Node> + 'static,
    {
        self.string_handlers.push((name.into(), Rc::new(handler)));
        self
    }

    /// Attribute contributed to the editable element
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Declare that a node type is rendered by a custom node view
    pub fn with_node_view(mut self, node: impl Into<String>) -> Self {
        self.node_views.push(node.into());
        self
    }

    pub fn on_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookContext<'_>) + 'static,
    {
        self.hooks.on_create = Some(Rc::new(hook));
        self
    }

    pub fn on_ready<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookContext<'_>) + 'static,
    {
        self.hooks.on_ready = Some(Rc::new(hook));
        self
    }

    pub fn on_state_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookContext<'_>, &StateUpdate<'_>) + 'static,
    {
        self.hooks.on_state_update = Some(Rc::new(hook));
        self
    }

    pub fn on_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookContext<'_>) + 'static,
    {
        self.hooks.on_destroy = Some(Rc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub(crate) fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn is_baseline(&self) -> bool {
        self.baseline
    }

    pub fn dependencies(&self) -> &[String] {
        &self.requires
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.requires.iter().any(|r| r == name)
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    pub fn marks(&self) -> &[MarkSpec] {
        &self.marks
    }

    /// Names of every node and mark type this extension contributes
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .map(|n| n.name.as_str())
            .chain(self.marks.iter().map(|m| m.name.as_str()))
    }

    pub fn commands(&self) -> &[(String, Command)] {
        &self.commands
    }

    pub fn string_handlers(&self) -> &[(String, StringHandler)] {
        &self.string_handlers
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn node_views(&self) -> &[String] {
        &self.node_views
    }

    pub fn hooks(&self) -> &ExtensionHooks {
        &self.hooks
    }

    pub fn is_mutable_option(&self, name: &str) -> bool {
        self.mutable.contains(name)
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.defaults.contains_key(name)
    }

    /// Defaults merged with overrides; overriding an undeclared option fails
    pub fn resolved_options(&self) -> EditorResult<Options> {
        if let Some(unknown) = self.overrides.keys().find(|k| !self.defaults.contains_key(*k)) {
            return Err(EditorError::UnknownOption {
                extension: self.name.clone(),
                option: unknown.clone(),
            });
        }
        let mut options = self.defaults.clone();
        options.extend(self.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(options)
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("baseline", &self.baseline)
            .field("requires", &self.requires)
            .field("nodes", &self.nodes.iter().map(|n| &n.name).collect::<Vec<_>>())
            .field("marks", &self.marks.iter().map(|m| &m.name).collect::<Vec<_>>())
            .field("commands", &self.commands.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_contributions() {
        let ext = Extension::new("link")
            .with_priority(Priority::HIGH)
            .requires("bold")
            .with_mark(MarkSpec::new("link"))
            .with_node(NodeSpec::new("embed"))
            .with_attribute("spellcheck", "false");

        assert_eq!(ext.name(), "link");
        assert_eq!(ext.priority(), Priority::HIGH);
        assert!(ext.depends_on("bold"));
        assert_eq!(ext.type_names().collect::<Vec<_>>(), vec!["embed", "link"]);
        assert_eq!(ext.attributes().get("spellcheck").map(String::as_str), Some("false"));
    }

    #[test]
    fn test_resolved_options_apply_overrides() {
        let ext = Extension::new("history")
            .with_option("depth", 100)
            .with_mutable_option("enabled", true)
            .configure("depth", 20);

        let options = ext.resolved_options().unwrap();
        assert_eq!(options.get("depth"), Some(&Value::from(20)));
        assert_eq!(options.get("enabled"), Some(&Value::from(true)));
        assert!(ext.is_mutable_option("enabled"));
        assert!(!ext.is_mutable_option("depth"));
    }

    #[test]
    fn test_overriding_undeclared_option_fails() {
        let ext = Extension::new("history").configure("depht", 20);
        let err = ext.resolved_options().unwrap_err();
        assert!(matches!(
            err,
            EditorError::UnknownOption { ref extension, ref option } if extension == "history" && option == "depht"
        ));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::CRITICAL > Priority::DEFAULT);
        assert_eq!(Priority::default(), Priority::DEFAULT);
        assert_eq!(Priority::from(-5).to_string(), "-5");
    }
}
