use super::EditorArgs;
use anyhow::Result;
use clap::Args;
use quire_editor::EditorManager;
use serde_json::{json, Value};
use std::path::Path;

#[derive(Args, Debug)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub editor: EditorArgs,
}

pub fn schema(args: SchemaArgs, cwd: &Path) -> Result<()> {
    let manager = args.editor.build_manager(cwd)?;
    let summary = schema_summary(&manager)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Extension order, node and mark types, and which extension owns each type
pub fn schema_summary(manager: &EditorManager) -> Result<Value> {
    let schema = manager.schema()?;
    let owners = manager.type_owners()?;
    let owner = |name: &str| owners.get(name).cloned();

    let extensions: Vec<Value> = manager
        .extensions()?
        .iter()
        .map(|ext| {
            json!({
                "name": ext.name(),
                "priority": ext.priority().0,
                "baseline": ext.is_baseline(),
            })
        })
        .collect();

    let nodes: Vec<Value> = schema
        .node_types()
        .map(|node| {
            json!({
                "name": node.name(),
                "content": node.spec.content,
                "groups": node.groups(),
                "owner": owner(node.name()),
            })
        })
        .collect();

    let marks: Vec<Value> = schema
        .mark_types()
        .map(|mark| json!({ "name": mark.name(), "owner": owner(mark.name()) }))
        .collect();

    Ok(json!({
        "extensions": extensions,
        "nodes": nodes,
        "marks": marks,
        "commands": manager.command_names()?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_editor::{builtin, create_editor_manager, ManagerSettings};

    #[test]
    fn test_summary_lists_owners() {
        let manager = create_editor_manager(vec![builtin::bold().into()], ManagerSettings::default()).unwrap();
        let summary = schema_summary(&manager).unwrap();

        let marks = summary["marks"].as_array().unwrap();
        assert_eq!(marks[0]["name"], "bold");
        assert_eq!(marks[0]["owner"], "bold");
        assert_eq!(summary["nodes"][0]["name"], "doc");
        assert_eq!(summary["extensions"][0]["name"], "doc");
        assert!(summary["commands"]
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c == "toggleBold"));
    }
}
