//! Presets: named, ordered bundles of extensions

use crate::commands;
use crate::extension::{Extension, Priority};
use crate::string_handler;
use quire_model::{NodeSpec, TEXT_NODE, TOP_NODE};

/// Name of the preset every manager carries
pub const CORE_PRESET: &str = "core";

#[derive(Debug, Clone)]
pub struct Preset {
    name: String,
    extensions: Vec<Extension>,
}

impl Preset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: Vec::new(),
        }
    }

    pub fn with(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub fn into_extensions(self) -> Vec<Extension> {
        self.extensions
    }
}

/// Entry in the list handed to the registry
#[derive(Debug, Clone)]
pub enum ExtensionItem {
    Extension(Extension),
    Preset(Preset),
}

impl ExtensionItem {
    pub fn is_preset(&self, name: &str) -> bool {
        matches!(self, ExtensionItem::Preset(p) if p.name() == name)
    }
}

impl From<Extension> for ExtensionItem {
    fn from(extension: Extension) -> Self {
        ExtensionItem::Extension(extension)
    }
}

impl From<Preset> for ExtensionItem {
    fn from(preset: Preset) -> Self {
        ExtensionItem::Preset(preset)
    }
}

/// Baseline schema (`doc`, `paragraph`, `text`), the `text` and `json`
/// string handlers, and the core commands
pub fn core_preset() -> Preset {
    Preset::new(CORE_PRESET)
        .with(
            Extension::new(TOP_NODE)
                .baseline()
                .with_priority(Priority::HIGHEST)
                .with_node(NodeSpec::new(TOP_NODE).with_content("block+")),
        )
        .with(
            Extension::new("paragraph")
                .baseline()
                .with_priority(Priority::MEDIUM)
                .with_node(
                    NodeSpec::new("paragraph")
                        .with_content("inline*")
                        .with_group("block"),
                ),
        )
        .with(
            Extension::new(TEXT_NODE)
                .baseline()
                .with_priority(Priority::MEDIUM)
                .with_node(NodeSpec::new(TEXT_NODE).with_group("inline")),
        )
        .with(
            Extension::new("commands")
                .baseline()
                .with_priority(Priority::LOW)
                .with_string_handler("text", string_handler::text_handler)
                .with_string_handler("json", string_handler::json_handler)
                .with_command("insertText", commands::insert_text)
                .with_command("selectAll", commands::select_all)
                .with_command("clearContent", commands::clear_content),
        )
}
