//! # Editor Wrapper
//!
//! Binds one [`EditorManager`] to one [`ViewAdapter`] and exposes what the
//! embedding application sees: the current state, commands, content
//! replacement, focus and editability, and `destroy()`.
//!
//! ## Lifecycle
//!
//! ```text
//! EditorWrapper::new      initial state from props (on_error fallback)
//!        ↓
//! create_view             view.construct → initial on_change → handle
//!        ↓
//! manager.ready()         (EditorWrapper::mount does all three)
//!        ↓
//! dispatch / commands     see the pipeline module
//!        ↓
//! destroy                 view.destroy → manager.destroy if unshared
//! ```

use crate::error::{EditorError, EditorResult};
use crate::manager::{Content, EditorManager};
use crate::pipeline::{ChangeEvent, DispatchQueue};
use crate::view::{ViewAdapter, ViewAttributes, ViewConfig, ViewProps};
use quire_model::{EditorState, Selection};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Class added to every editor element
pub const EDITOR_CLASS: &str = "quire-editor";

pub type ChangeHandler = Rc<dyn Fn(&ChangeEvent<'_>)>;

pub type FocusHandler = Rc<dyn Fn(bool)>;

/// Produces replacement content when the initial content is invalid
pub type ErrorHandler = Rc<dyn Fn(&EditorError) -> Content>;

/// Wrapper configuration supplied by the embedding application
#[derive(Clone)]
pub struct WrapperProps {
    pub initial_content: Option<Content>,
    pub initial_selection: Option<Selection>,
    /// Handler for raw string content that names none
    pub string_handler: Option<String>,
    pub editable: bool,
    pub attributes: ViewAttributes,
    pub on_change: Option<ChangeHandler>,
    pub on_focus: Option<FocusHandler>,
    pub on_error: Option<ErrorHandler>,
}

impl Default for WrapperProps {
    fn default() -> Self {
        Self {
            initial_content: None,
            initial_selection: None,
            string_handler: None,
            editable: true,
            attributes: ViewAttributes::new(),
            on_change: None,
            on_focus: None,
            on_error: None,
        }
    }
}

impl WrapperProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content: impl Into<Content>) -> Self {
        self.initial_content = Some(content.into());
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.initial_selection = Some(selection);
        self
    }

    pub fn with_string_handler(mut self, name: impl Into<String>) -> Self {
        self.string_handler = Some(name.into());
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn on_change<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ChangeEvent<'_>) + 'static,
    {
        self.on_change = Some(Rc::new(handler));
        self
    }

    pub fn on_focus<F>(mut self, handler: F) -> Self
    where
        F: Fn(bool) + 'static,
    {
        self.on_focus = Some(Rc::new(handler));
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&EditorError) -> Content + 'static,
    {
        self.on_error = Some(Rc::new(handler));
        self
    }

    /// Apply the props' default handler to raw content that names none
    fn with_default_handler(&self, content: Content) -> Content {
        match content {
            Content::Raw { source, handler: None } => Content::Raw {
                source,
                handler: self.string_handler.clone(),
            },
            other => other,
        }
    }
}

impl fmt::Debug for WrapperProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperProps")
            .field("initial_content", &self.initial_content)
            .field("string_handler", &self.string_handler)
            .field("editable", &self.editable)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Props as the view adapter sees them, computed on every poll
pub(crate) struct LiveProps<'a> {
    manager: &'a EditorManager,
    props: &'a WrapperProps,
    editable: bool,
}

impl<'a> LiveProps<'a> {
    pub(crate) fn new(manager: &'a EditorManager, props: &'a WrapperProps, editable: bool) -> Self {
        Self {
            manager,
            props,
            editable,
        }
    }
}

impl ViewProps for LiveProps<'_> {
    fn attributes(&self) -> ViewAttributes {
        let mut attributes = ViewAttributes::new();
        attributes.insert("role".to_string(), "textbox".to_string());
        attributes.insert("aria-multiline".to_string(), "true".to_string());
        attributes.insert("contenteditable".to_string(), self.editable.to_string());
        attributes.insert("class".to_string(), EDITOR_CLASS.to_string());

        let props = self.props.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        for (name, value) in self.manager.extension_attributes().chain(props) {
            merge_attribute(&mut attributes, name, value);
        }
        attributes
    }

    fn editable(&self) -> bool {
        self.editable
    }
}

/// Later values win, except `class`, whose values accumulate
fn merge_attribute(attributes: &mut ViewAttributes, name: &str, value: &str) {
    if name == "class" {
        if let Some(existing) = attributes.get_mut(name) {
            if !existing.split_whitespace().any(|c| c == value) {
                existing.push(' ');
                existing.push_str(value);
            }
            return;
        }
    }
    attributes.insert(name.to_string(), value.to_string());
}

/// One manager bound to one rendering surface
pub struct EditorWrapper<V: ViewAdapter> {
    pub(crate) manager: Rc<EditorManager>,
    pub(crate) view: V,
    pub(crate) handle: Option<V::Handle>,
    pub(crate) state: EditorState,
    pub(crate) props: WrapperProps,
    pub(crate) editable: bool,
    pub(crate) focused: bool,
    pub(crate) queue: DispatchQueue,
    pub(crate) destroyed: bool,
}

impl<V: ViewAdapter> EditorWrapper<V> {
    /// Create the wrapper and its initial state; no view is bound yet
    pub fn new(manager: Rc<EditorManager>, view: V, props: WrapperProps) -> EditorResult<Self> {
        let state = initial_state(&manager, &props)?;
        Ok(Self {
            manager,
            view,
            handle: None,
            state,
            editable: props.editable,
            props,
            focused: false,
            queue: DispatchQueue::default(),
            destroyed: false,
        })
    }

    /// Create the wrapper, bind the view and mark the manager ready
    pub fn mount(manager: Rc<EditorManager>, view: V, props: WrapperProps) -> EditorResult<Self> {
        let mut wrapper = Self::new(manager, view, props)?;
        wrapper.create_view()?;
        wrapper.manager.ready()?;
        Ok(wrapper)
    }

    /// Bind the view to the initial state; allowed once.
    ///
    /// The first `on_change` (with `first_render` set) fires before this
    /// returns.
    pub fn create_view(&mut self) -> EditorResult<&V::Handle> {
        if self.destroyed {
            return Err(EditorError::ViewNotBound);
        }
        if self.handle.is_some() {
            return Err(EditorError::ViewAlreadyBound);
        }
        if self.manager.is_destroyed() {
            return Err(EditorError::ManagerDestroyed);
        }

        let config = ViewConfig {
            node_views: self.manager.node_views(),
        };
        let props = LiveProps::new(&self.manager, &self.props, self.editable);
        let handle = self.view.construct(&self.state, &config, &props);
        self.handle = Some(handle);
        debug!(version = self.state.version(), node_views = config.node_views.len(), "View constructed");

        if let Some(on_change) = &self.props.on_change {
            on_change(&ChangeEvent::new(&self.state, None, true, &self.queue));
        }
        self.drain_queue();

        self.handle.as_ref().ok_or(EditorError::ViewNotBound)
    }

    pub(crate) fn ensure_usable(&self) -> EditorResult<()> {
        if self.manager.is_destroyed() {
            return Err(EditorError::ManagerDestroyed);
        }
        if self.destroyed || self.handle.is_none() {
            return Err(EditorError::ViewNotBound);
        }
        Ok(())
    }

    /// The current state
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn manager(&self) -> &Rc<EditorManager> {
        &self.manager
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn handle(&self) -> Option<&V::Handle> {
        self.handle.as_ref()
    }

    /// Attributes for the editable element, recomputed on every call
    pub fn attributes(&self) -> ViewAttributes {
        LiveProps::new(&self.manager, &self.props, self.editable).attributes()
    }

    pub fn editable(&self) -> bool {
        self.editable
    }

    pub fn set_editable(&mut self, editable: bool) {
        debug!(editable, "Editable changed");
        self.editable = editable;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Record a focus change reported by the view
    pub fn handle_focus(&mut self, focused: bool) {
        if self.focused == focused {
            return;
        }
        self.focused = focused;
        if let Some(on_focus) = &self.props.on_focus {
            on_focus(focused);
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Command access bound to this editor
    pub fn commands(&mut self) -> Commands<'_, V> {
        Commands { wrapper: self }
    }

    /// Run a named command; `Ok(false)` when it does not apply
    pub fn run_command(&mut self, name: &str, args: &Value) -> EditorResult<bool> {
        self.ensure_usable()?;
        let command = self.manager.command(name)?;
        match command(&self.state, args) {
            Some(tr) => {
                debug!(command = name, "Running command");
                self.dispatch(tr)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the document with new content
    pub fn set_content(&mut self, content: impl Into<Content>, trigger_change: bool) -> EditorResult<()> {
        self.ensure_usable()?;
        let content = self.props.with_default_handler(content.into());
        let fresh = self.manager.create_state(content, None)?;

        let mut tr = self
            .state
            .tr()
            .replace_doc(fresh.doc().clone())
            .set_selection(fresh.selection());
        if !trigger_change {
            tr = tr.without_change_trigger();
        }
        self.dispatch(tr)
    }

    pub fn clear_content(&mut self) -> EditorResult<()> {
        self.set_content(Content::Empty, true)
    }

    /// Make a state created by the same manager the current one
    pub fn replace_state(&mut self, state: EditorState) -> EditorResult<()> {
        self.ensure_usable()?;
        if !state.same_schema(self.manager.current_schema()) {
            return Err(EditorError::SchemaMismatch);
        }
        self.commit_state(state, None, true)?;
        self.drain_queue();
        Ok(())
    }

    /// Detach the view and destroy the manager unless it is shared.
    /// Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.queue.clear();

        if self.handle.take().is_some() {
            self.view.destroy();
        }

        let refs = Rc::strong_count(&self.manager);
        if refs == 1 {
            self.manager.destroy();
        } else {
            debug!(refs, "Manager is shared, leaving it alive");
        }
        info!("Editor wrapper destroyed");
    }
}

fn initial_state(manager: &EditorManager, props: &WrapperProps) -> EditorResult<EditorState> {
    let content = props.with_default_handler(props.initial_content.clone().unwrap_or(Content::Empty));

    match manager.create_state(content, props.initial_selection) {
        Err(error) if error.is_content_error() => match &props.on_error {
            Some(on_error) => {
                warn!(error = %error, "Initial content rejected, using fallback content");
                let fallback = props.with_default_handler(on_error(&error));
                manager.create_state(fallback, None)
            }
            None => Err(error),
        },
        result => result,
    }
}

/// Named commands of one editor
pub struct Commands<'a, V: ViewAdapter> {
    wrapper: &'a mut EditorWrapper<V>,
}

impl<V: ViewAdapter> Commands<'_, V> {
    pub fn names(&self) -> EditorResult<Vec<String>> {
        Ok(self
            .wrapper
            .manager
            .command_names()?
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Whether the command applies to the current state, without running it
    pub fn can_run(&self, name: &str, args: &Value) -> EditorResult<bool> {
        let command = self.wrapper.manager.command(name)?;
        Ok(command(&self.wrapper.state, args).is_some())
    }

    pub fn run(&mut self, name: &str, args: &Value) -> EditorResult<bool> {
        self.wrapper.run_command(name, args)
    }
}
