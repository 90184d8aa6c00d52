//! # Extension Registry
//!
//! Turns a list of extensions and presets into an [`OrderedExtensionSet`]:
//!
//! 1. Presets expand in place into their members (member priorities kept)
//! 2. Settings apply: excluded names are removed, priority overrides set
//! 3. Baseline members yield to user extensions sharing a name or type name
//! 4. Duplicate names collapse; the later instance takes the earlier slot
//! 5. Stable sort by priority, highest first
//! 6. Every declared dependency must be present
//! 7. Options resolve (defaults merged with overrides)
//!
//! The same input always produces the same order.

use crate::config::ManagerSettings;
use crate::error::{EditorError, EditorResult};
use crate::extension::{Extension, Options, Priority};
use crate::preset::ExtensionItem;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

/// Deduplicated, ordered and validated extensions with their resolved options
#[derive(Debug, Clone)]
pub struct OrderedExtensionSet {
    extensions: Vec<Extension>,
    options: Vec<Options>,
}

impl OrderedExtensionSet {
    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Resolved options, index-aligned with [`extensions`](Self::extensions)
    pub fn options(&self) -> &[Options] {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(Extension::name).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.extensions.iter().position(|e| e.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Extension> {
        self.position(name).map(|i| &self.extensions[i])
    }

    pub(crate) fn into_parts(self) -> (Vec<Extension>, Vec<Options>) {
        (self.extensions, self.options)
    }
}

/// Build the ordered extension set
#[instrument(skip(items, settings), fields(items = items.len()))]
pub fn build(items: Vec<ExtensionItem>, settings: &ManagerSettings) -> EditorResult<OrderedExtensionSet> {
    let mut expanded = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ExtensionItem::Extension(extension) => expanded.push(extension),
            ExtensionItem::Preset(preset) => {
                debug!(preset = preset.name(), members = preset.extensions().len(), "Expanding preset");
                expanded.extend(preset.into_extensions());
            }
        }
    }

    expanded.retain(|extension| {
        let excluded = settings.is_excluded(extension.name());
        if excluded {
            debug!(extension = extension.name(), "Extension excluded by settings");
        }
        !excluded
    });

    for extension in &mut expanded {
        if let Some(&priority) = settings.priority.get(extension.name()) {
            debug!(extension = extension.name(), from = %extension.priority(), to = priority, "Overriding priority");
            extension.set_priority(Priority(priority));
        }
    }

    let mut unique: Vec<Extension> = Vec::with_capacity(expanded.len());
    for extension in drop_shadowed_baseline(expanded) {
        match unique.iter().position(|e| e.name() == extension.name()) {
            Some(index) => {
                warn!(
                    extension = extension.name(),
                    "Extension registered more than once, the later instance replaces the earlier one"
                );
                unique[index] = extension;
            }
            None => unique.push(extension),
        }
    }

    // Vec::sort_by_key is stable, ties keep declaration order
    unique.sort_by_key(|e| Reverse(e.priority()));

    for extension in &unique {
        for dependency in extension.dependencies() {
            if !unique.iter().any(|e| e.name() == dependency) {
                return Err(EditorError::MissingDependency {
                    extension: extension.name().to_string(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    let options = unique
        .iter()
        .map(|extension| extension.resolved_options())
        .collect::<EditorResult<Vec<_>>>()?;

    info!(extensions = unique.len(), "Extension registry built");

    Ok(OrderedExtensionSet {
        extensions: unique,
        options,
    })
}

fn drop_shadowed_baseline(extensions: Vec<Extension>) -> Vec<Extension> {
    let user = extensions.iter().filter(|e| !e.is_baseline());
    let user_names: BTreeSet<String> = user.clone().map(|e| e.name().to_string()).collect();
    let user_types: BTreeSet<String> = user.flat_map(|e| e.type_names().map(str::to_string)).collect();

    extensions
        .into_iter()
        .filter(|extension| {
            if !extension.is_baseline() {
                return true;
            }
            let shadowed =
                user_names.contains(extension.name()) || extension.type_names().any(|t| user_types.contains(t));
            if shadowed {
                debug!(extension = extension.name(), "Baseline extension replaced by a user extension");
            }
            !shadowed
        })
        .collect()
}
