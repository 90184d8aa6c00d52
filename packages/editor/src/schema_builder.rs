//! # Schema Builder
//!
//! Collects every extension's node and mark contributions, in registry
//! order, into one compiled [`Schema`]. Two extensions contributing the
//! same type name is a hard failure; nothing is compiled in that case.

use crate::error::{EditorError, EditorResult};
use crate::registry::OrderedExtensionSet;
use quire_model::Schema;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Type name to the name of the extension that contributed it
pub type TypeOwners = BTreeMap<String, String>;

/// Build the schema for an ordered extension set
pub fn build(set: &OrderedExtensionSet) -> EditorResult<Schema> {
    build_with_owners(set).map(|(schema, _)| schema)
}

/// Build the schema and report which extension owns each type
#[instrument(skip(set), fields(extensions = set.len()))]
pub fn build_with_owners(set: &OrderedExtensionSet) -> EditorResult<(Schema, TypeOwners)> {
    let mut owners = TypeOwners::new();
    let mut nodes = Vec::new();
    let mut marks = Vec::new();

    for extension in set.extensions() {
        for name in extension.type_names() {
            if let Some(first) = owners.get(name) {
                return Err(EditorError::SchemaConflict {
                    name: name.to_string(),
                    first: first.clone(),
                    second: extension.name().to_string(),
                });
            }
            owners.insert(name.to_string(), extension.name().to_string());
        }
        nodes.extend(extension.nodes().iter().cloned());
        marks.extend(extension.marks().iter().cloned());
    }

    debug!(nodes = nodes.len(), marks = marks.len(), "Compiling schema");
    let schema = Schema::compile(nodes, marks)?;
    Ok((schema, owners))
}
