use super::EditorArgs;
use anyhow::{Context, Result};
use clap::Args;
use quire_editor::{Content, EditorManager};
use quire_model::Node;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Content file to parse
    pub input: PathBuf,

    /// String handler (text, json); guessed from the file extension if omitted
    #[arg(long)]
    pub handler: Option<String>,

    #[command(flatten)]
    pub editor: EditorArgs,
}

pub fn parse(args: ParseArgs, cwd: &Path) -> Result<()> {
    let manager = args.editor.build_manager(cwd)?;
    let doc = parse_file(&manager, &args.input, args.handler.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

/// Handler named on the command line, else one matching the file extension
pub fn handler_for(path: &Path, explicit: Option<&str>) -> Option<String> {
    if let Some(name) = explicit {
        return Some(name.to_string());
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Some("json".to_string()),
        Some("txt") => Some("text".to_string()),
        _ => None,
    }
}

/// Read a file and turn it into a validated document
pub fn parse_file(manager: &EditorManager, path: &Path, handler: Option<&str>) -> Result<Node> {
    let source = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content = match handler_for(path, handler) {
        Some(name) => Content::with_handler(source, name),
        None => Content::from(source),
    };
    let state = manager
        .create_state(content, None)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(state.doc().clone())
}
