//! # Quire Editor
//!
//! Extension composition and state pipeline for the quire rich-text editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ extensions + presets                        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ registry: expand, dedupe, order, validate   │
//! │ schema_builder: merge types → Schema        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ manager: create_state, lifecycle hooks      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ wrapper + pipeline: dispatch → view →       │
//! │   on_change → on_state_update               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ view adapter (external surface)             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **States are immutable**: every change yields a new state
//! 2. **View first**: the view commits a state before anyone is notified
//! 3. **No reentrancy**: callbacks queue transactions, they never nest
//! 4. **One manager per session**: shared by `Rc`, never global
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quire_editor::{builtin, create_editor_manager, CallLog, EditorWrapper, HeadlessView, ManagerSettings, WrapperProps};
//!
//! let manager = create_editor_manager(vec![builtin::bold().into()], ManagerSettings::default())?;
//! let mut editor = EditorWrapper::mount(manager, HeadlessView::new(CallLog::new()), WrapperProps::new())?;
//!
//! editor.run_command("insertText", &"Hello".into())?;
//! editor.run_command("selectAll", &serde_json::Value::Null)?;
//! editor.run_command("toggleBold", &serde_json::Value::Null)?;
//!
//! editor.destroy();
//! ```

pub mod builtin;
pub mod commands;
mod config;
mod error;
mod extension;
mod manager;
mod pipeline;
mod preset;
pub mod registry;
pub mod schema_builder;
pub mod string_handler;
mod view;
mod wrapper;

pub use config::{ManagerSettings, DEFAULT_CONFIG_NAME};
pub use error::{EditorError, EditorResult};
pub use extension::{
    Command, Extension, ExtensionHooks, LifecycleHook, Options, Priority, StateUpdateHook, StringHandler,
};
pub use manager::{create_editor_manager, Content, EditorManager, HookContext, ManagerPhase};
pub use pipeline::{ChangeEvent, DispatchQueue, StateUpdate};
pub use preset::{core_preset, ExtensionItem, Preset, CORE_PRESET};
pub use registry::OrderedExtensionSet;
pub use schema_builder::TypeOwners;
pub use view::{CallLog, HeadlessHandle, HeadlessView, ViewAdapter, ViewAttributes, ViewConfig, ViewProps};
pub use wrapper::{ChangeHandler, Commands, EditorWrapper, ErrorHandler, FocusHandler, WrapperProps, EDITOR_CLASS};

// Re-export the model for convenience
pub use quire_model as model;
