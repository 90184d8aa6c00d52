//! # Manager
//!
//! Owns the ordered extensions, the merged schema, and the command and
//! string handler tables, and drives the extension lifecycle:
//!
//! ```text
//! constructed ──ready()──▶ ready ──destroy()──▶ destroyed
//!      └──────────────destroy()─────────────────────┘
//! ```
//!
//! `ready()` and `destroy()` fire their hooks once; repeated calls are
//! no-ops. After `destroy()` every other method fails with
//! [`EditorError::ManagerDestroyed`]; only [`EditorManager::phase`] and
//! [`EditorManager::is_destroyed`] keep answering.
//!
//! A manager is scoped to one editor session and shared by reference
//! (`Rc`); there is no global registry.

use crate::config::ManagerSettings;
use crate::error::{EditorError, EditorResult};
use crate::extension::{Command, Extension, Options, StringHandler};
use crate::pipeline::StateUpdate;
use crate::preset::{core_preset, ExtensionItem, CORE_PRESET};
use crate::registry::{self, OrderedExtensionSet};
use crate::schema_builder::{self, TypeOwners};
use quire_model::{EditorState, Node, Schema, Selection};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerPhase {
    Constructed,
    Ready,
    Destroyed,
}

/// Content accepted by [`EditorManager::create_state`]
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// The schema's empty document
    Empty,
    /// A structured document
    Doc(Node),
    /// Raw text parsed by a string handler (the default handler when `None`)
    Raw { source: String, handler: Option<String> },
}

impl Content {
    pub fn with_handler(source: impl Into<String>, handler: impl Into<String>) -> Self {
        Content::Raw {
            source: source.into(),
            handler: Some(handler.into()),
        }
    }
}

impl From<Node> for Content {
    fn from(node: Node) -> Self {
        Content::Doc(node)
    }
}

impl From<&str> for Content {
    fn from(source: &str) -> Self {
        Content::Raw {
            source: source.to_string(),
            handler: None,
        }
    }
}

impl From<String> for Content {
    fn from(source: String) -> Self {
        Content::Raw { source, handler: None }
    }
}

struct Registered<T> {
    owner: String,
    value: T,
}

/// Build a manager from extensions and presets; the core preset is
/// appended unless already present
pub fn create_editor_manager(
    mut items: Vec<ExtensionItem>,
    settings: ManagerSettings,
) -> EditorResult<Rc<EditorManager>> {
    if !items.iter().any(|item| item.is_preset(CORE_PRESET)) {
        items.push(core_preset().into());
    }
    let set = registry::build(items, &settings)?;
    EditorManager::new(set, settings)
}

pub struct EditorManager {
    extensions: Vec<Extension>,
    options: Vec<RefCell<Options>>,
    schema: Arc<Schema>,
    owners: TypeOwners,
    commands: BTreeMap<String, Registered<Command>>,
    string_handlers: BTreeMap<String, Registered<StringHandler>>,
    settings: ManagerSettings,
    phase: Cell<ManagerPhase>,
}

impl EditorManager {
    /// Build the schema and tables for an ordered set and run `on_create` hooks
    #[instrument(skip(set, settings), fields(extensions = set.len()))]
    pub fn new(set: OrderedExtensionSet, settings: ManagerSettings) -> EditorResult<Rc<Self>> {
        let (schema, owners) = schema_builder::build_with_owners(&set)?;
        let (extensions, options) = set.into_parts();

        let mut commands = BTreeMap::new();
        let mut string_handlers = BTreeMap::new();
        for extension in &extensions {
            for (name, command) in extension.commands() {
                register(&mut commands, "command", name, extension, Rc::clone(command));
            }
            for (name, handler) in extension.string_handlers() {
                register(&mut string_handlers, "string handler", name, extension, Rc::clone(handler));
            }
        }

        let manager = Rc::new(Self {
            extensions,
            options: options.into_iter().map(RefCell::new).collect(),
            schema: Arc::new(schema),
            owners,
            commands,
            string_handlers,
            settings,
            phase: Cell::new(ManagerPhase::Constructed),
        });

        for (index, extension) in manager.extensions.iter().enumerate() {
            if let Some(hook) = &extension.hooks().on_create {
                hook(&manager.context(index));
            }
        }

        info!(
            extensions = manager.extensions.len(),
            commands = manager.commands.len(),
            "Editor manager created"
        );
        Ok(manager)
    }

    pub fn phase(&self) -> ManagerPhase {
        self.phase.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase.get() == ManagerPhase::Destroyed
    }

    fn ensure_alive(&self) -> EditorResult<()> {
        if self.is_destroyed() {
            Err(EditorError::ManagerDestroyed)
        } else {
            Ok(())
        }
    }

    pub fn schema(&self) -> EditorResult<&Arc<Schema>> {
        self.ensure_alive()?;
        Ok(&self.schema)
    }

    /// Extensions in registry order
    pub fn extensions(&self) -> EditorResult<&[Extension]> {
        self.ensure_alive()?;
        Ok(&self.extensions)
    }

    pub fn type_owners(&self) -> EditorResult<&TypeOwners> {
        self.ensure_alive()?;
        Ok(&self.owners)
    }

    pub fn settings(&self) -> EditorResult<&ManagerSettings> {
        self.ensure_alive()?;
        Ok(&self.settings)
    }

    /// Create a validated initial state from content
    #[instrument(skip(self, content, selection))]
    pub fn create_state(&self, content: impl Into<Content>, selection: Option<Selection>) -> EditorResult<EditorState> {
        self.ensure_alive()?;
        let doc = self.resolve_content(content.into())?;
        Ok(EditorState::create(Arc::clone(&self.schema), doc, selection)?)
    }

    fn resolve_content(&self, content: Content) -> EditorResult<Node> {
        match content {
            Content::Empty => Ok(self.schema.empty_doc()?),
            Content::Doc(doc) => Ok(doc),
            Content::Raw { source, handler } => {
                let name = handler.or_else(|| self.settings.default_string_handler.clone());
                let handler = name.as_deref().map(|n| self.string_handler(n)).transpose()?;
                if source.is_empty() {
                    return Ok(self.schema.empty_doc()?);
                }
                let handler = handler.ok_or(EditorError::MissingStringHandler)?;
                debug!(handler = name.as_deref().unwrap_or_default(), len = source.len(), "Parsing string content");
                handler(&source, self.schema.as_ref())
            }
        }
    }

    /// Transition to ready, firing `on_ready` hooks once in registry order
    pub fn ready(&self) -> EditorResult<()> {
        match self.phase.get() {
            ManagerPhase::Destroyed => Err(EditorError::ManagerDestroyed),
            ManagerPhase::Ready => {
                debug!("Manager already ready");
                Ok(())
            }
            ManagerPhase::Constructed => {
                self.phase.set(ManagerPhase::Ready);
                for (index, extension) in self.extensions.iter().enumerate() {
                    if self.is_destroyed() {
                        debug!(extension = extension.name(), "Manager destroyed by a ready hook, skipping the rest");
                        break;
                    }
                    if let Some(hook) = &extension.hooks().on_ready {
                        hook(&self.context(index));
                    }
                }
                info!("Editor manager ready");
                Ok(())
            }
        }
    }

    /// Fan a committed transition out to every subscribed extension
    pub fn on_state_update(&self, update: &StateUpdate<'_>) -> EditorResult<()> {
        self.ensure_alive()?;
        for (index, extension) in self.extensions.iter().enumerate() {
            // A hook may tear the manager down
            if self.is_destroyed() {
                break;
            }
            if let Some(hook) = &extension.hooks().on_state_update {
                hook(&self.context(index), update);
            }
        }
        Ok(())
    }

    /// Tear down, firing `on_destroy` hooks once in reverse registry order
    pub fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }
        self.phase.set(ManagerPhase::Destroyed);
        for (index, extension) in self.extensions.iter().enumerate().rev() {
            if let Some(hook) = &extension.hooks().on_destroy {
                hook(&self.context(index));
            }
        }
        info!("Editor manager destroyed");
    }

    pub fn command(&self, name: &str) -> EditorResult<Command> {
        self.ensure_alive()?;
        self.commands
            .get(name)
            .map(|c| Rc::clone(&c.value))
            .ok_or_else(|| EditorError::CommandNotFound(name.to_string()))
    }

    pub fn command_names(&self) -> EditorResult<Vec<&str>> {
        self.ensure_alive()?;
        Ok(self.commands.keys().map(String::as_str).collect())
    }

    /// Extension that registered a command
    pub fn command_owner(&self, name: &str) -> EditorResult<Option<&str>> {
        self.ensure_alive()?;
        Ok(self.commands.get(name).map(|c| c.owner.as_str()))
    }

    pub fn string_handler(&self, name: &str) -> EditorResult<StringHandler> {
        self.ensure_alive()?;
        self.string_handlers
            .get(name)
            .map(|h| Rc::clone(&h.value))
            .ok_or_else(|| EditorError::StringHandlerNotFound(name.to_string()))
    }

    pub fn string_handler_names(&self) -> EditorResult<Vec<&str>> {
        self.ensure_alive()?;
        Ok(self.string_handlers.keys().map(String::as_str).collect())
    }

    /// Current options of an extension
    pub fn options(&self, extension: &str) -> EditorResult<Options> {
        self.ensure_alive()?;
        let index = self.index_of(extension)?;
        Ok(self.options[index].borrow().clone())
    }

    /// Change an option declared mutable
    pub fn set_option(&self, extension: &str, option: &str, value: impl Into<Value>) -> EditorResult<()> {
        self.ensure_alive()?;
        let index = self.index_of(extension)?;
        let ext = &self.extensions[index];
        if !ext.has_option(option) {
            return Err(EditorError::UnknownOption {
                extension: extension.to_string(),
                option: option.to_string(),
            });
        }
        if !ext.is_mutable_option(option) {
            return Err(EditorError::ImmutableOption {
                extension: extension.to_string(),
                option: option.to_string(),
            });
        }

        let value = value.into();
        debug!(extension, option, value = %value, "Updating extension option");
        self.options[index].borrow_mut().insert(option.to_string(), value);
        Ok(())
    }

    fn index_of(&self, extension: &str) -> EditorResult<usize> {
        self.extensions
            .iter()
            .position(|e| e.name() == extension)
            .ok_or_else(|| EditorError::UnknownExtension(extension.to_string()))
    }

    fn context(&self, index: usize) -> HookContext<'_> {
        HookContext { manager: self, index }
    }

    /// View attributes contributed by extensions, in registry order
    pub(crate) fn extension_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.extensions
            .iter()
            .flat_map(|e| e.attributes().iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Node types with custom views, in registry order
    pub(crate) fn node_views(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.extensions.iter().flat_map(|e| e.node_views()) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    pub(crate) fn current_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

fn register<T>(
    table: &mut BTreeMap<String, Registered<T>>,
    kind: &str,
    name: &str,
    extension: &Extension,
    value: T,
) {
    // Extensions arrive highest priority first, so the first entry wins
    if let Some(existing) = table.get(name) {
        warn!(
            kind,
            name,
            kept = existing.owner.as_str(),
            ignored = extension.name(),
            "Duplicate registration resolved by priority"
        );
        return;
    }
    table.insert(
        name.to_string(),
        Registered {
            owner: extension.name().to_string(),
            value,
        },
    );
}

impl fmt::Debug for EditorManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorManager")
            .field("extensions", &self.extensions.iter().map(Extension::name).collect::<Vec<_>>())
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("phase", &self.phase.get())
            .finish()
    }
}

/// What a hook sees: the manager and the extension it belongs to
pub struct HookContext<'a> {
    manager: &'a EditorManager,
    index: usize,
}

impl<'a> HookContext<'a> {
    pub fn manager(&self) -> &'a EditorManager {
        self.manager
    }

    pub fn extension(&self) -> &'a Extension {
        &self.manager.extensions[self.index]
    }

    pub fn name(&self) -> &'a str {
        self.extension().name()
    }

    pub fn schema(&self) -> &'a Arc<Schema> {
        &self.manager.schema
    }

    /// Own resolved options
    pub fn options(&self) -> Options {
        self.manager.options[self.index].borrow().clone()
    }

    pub fn option(&self, name: &str) -> Option<Value> {
        self.manager.options[self.index].borrow().get(name).cloned()
    }

    pub fn set_option(&self, name: &str, value: impl Into<Value>) -> EditorResult<()> {
        self.manager.set_option(self.name(), name, value)
    }

    /// Options of a declared dependency
    pub fn dependency_options(&self, dependency: &str) -> Option<Options> {
        if !self.extension().depends_on(dependency) {
            warn!(
                extension = self.name(),
                dependency, "Options requested for an undeclared dependency"
            );
            return None;
        }
        let index = self.manager.index_of(dependency).ok()?;
        Some(self.manager.options[index].borrow().clone())
    }
}
