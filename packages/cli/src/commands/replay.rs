use super::parse::handler_for;
use super::EditorArgs;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use quire_editor::{CallLog, Content, EditorManager, EditorWrapper, HeadlessView, WrapperProps};
use quire_model::Node;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::info;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Initial content file
    pub input: PathBuf,

    /// JSON list of `{"command": ..., "args": ...}` entries
    pub script: PathBuf,

    /// String handler for the initial content
    #[arg(long)]
    pub handler: Option<String>,

    #[command(flatten)]
    pub editor: EditorArgs,
}

/// One scripted command invocation
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptStep {
    pub command: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Serialize)]
pub struct ReplayOutcome {
    pub doc: Node,
    pub version: u64,
    /// `on_change` notifications after the first render
    pub notifications: usize,
    /// Commands that did not apply to the state they ran against
    pub skipped: Vec<String>,
}

pub fn replay(args: ReplayArgs, cwd: &Path) -> Result<()> {
    let manager = args.editor.build_manager(cwd)?;

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let content = match handler_for(&args.input, args.handler.as_deref()) {
        Some(name) => Content::with_handler(source, name),
        None => Content::from(source),
    };

    let script = fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read {}", args.script.display()))?;
    let steps: Vec<ScriptStep> = serde_json::from_str(&script).context("Script must be a JSON list of commands")?;

    let outcome = run_script(manager, content, &steps)?;
    for name in &outcome.skipped {
        eprintln!("  {} {} did not apply", "⚠️".yellow(), name);
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Mount a headless editor on `content` and run each step in order
pub fn run_script(manager: Rc<EditorManager>, content: Content, steps: &[ScriptStep]) -> Result<ReplayOutcome> {
    let log = CallLog::new();
    let changes = log.clone();
    let props = WrapperProps::new().with_content(content).on_change(move |event| {
        if !event.first_render {
            changes.record(format!("change:{}", event.state.version()));
        }
    });
    let mut editor = EditorWrapper::mount(manager, HeadlessView::new(log.clone()), props)?;

    let mut skipped = Vec::new();
    for (index, step) in steps.iter().enumerate() {
        let applied = editor
            .run_command(&step.command, &step.args)
            .with_context(|| format!("Step {} ({}) failed", index, step.command))?;
        if !applied {
            skipped.push(step.command.clone());
        }
    }

    let outcome = ReplayOutcome {
        doc: editor.state().doc().clone(),
        version: editor.state().version(),
        notifications: log.count("change:"),
        skipped,
    };
    editor.destroy();
    info!(steps = steps.len(), notifications = outcome.notifications, "Replay finished");
    Ok(outcome)
}
