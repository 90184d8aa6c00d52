use super::EditorArgs;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use quire_editor::EditorManager;
use quire_model::Node;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// JSON document files to validate
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub editor: EditorArgs,
}

pub fn check(args: CheckArgs, cwd: &Path) -> Result<()> {
    let manager = args.editor.build_manager(cwd)?;

    let mut failures = 0;
    for input in &args.inputs {
        match check_file(&manager, input) {
            Ok(()) => println!("  {} {}", "✓".green(), input.display()),
            Err(err) => {
                failures += 1;
                eprintln!("  {} {} - {}", "✗".red(), input.display(), format!("{err:#}").red());
            }
        }
    }

    println!();
    if failures == 0 {
        println!("{} {} documents valid", "✅".green(), args.inputs.len());
        Ok(())
    } else {
        Err(anyhow!("{} of {} documents invalid", failures, args.inputs.len()))
    }
}

pub fn check_file(manager: &EditorManager, path: &Path) -> Result<()> {
    let source = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let doc: Node = serde_json::from_str(&source).context("Not a JSON document")?;
    manager.schema()?.check(&doc)?;
    Ok(())
}
