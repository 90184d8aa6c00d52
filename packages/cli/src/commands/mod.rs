pub mod check;
pub mod parse;
pub mod replay;
pub mod schema;

pub use check::{check, CheckArgs};
pub use parse::{parse, ParseArgs};
pub use replay::{replay, ReplayArgs};
pub use schema::{schema, SchemaArgs};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use quire_editor::{builtin, create_editor_manager, EditorManager, ExtensionItem, ManagerSettings};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Options shared by every command that builds an editor
#[derive(Args, Debug, Clone, Default)]
pub struct EditorArgs {
    /// Settings file (defaults to quire.config.json in the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Builtin extensions to add, comma separated (bold, italic, heading)
    #[arg(short, long, value_delimiter = ',')]
    pub with: Vec<String>,
}

impl EditorArgs {
    pub fn settings(&self, cwd: &Path) -> Result<ManagerSettings> {
        let settings = match &self.config {
            Some(path) => ManagerSettings::load_file(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => ManagerSettings::load(cwd)?,
        };
        Ok(settings)
    }

    pub fn extensions(&self) -> Result<Vec<ExtensionItem>> {
        self.with
            .iter()
            .map(|name| {
                builtin::by_name(name.trim())
                    .map(ExtensionItem::from)
                    .ok_or_else(|| anyhow!("Unknown builtin extension: {}. Use: bold, italic, heading", name))
            })
            .collect()
    }

    pub fn build_manager(&self, cwd: &Path) -> Result<Rc<EditorManager>> {
        let manager = create_editor_manager(self.extensions()?, self.settings(cwd)?)?;
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_builtin_is_rejected() {
        let args = EditorArgs {
            config: None,
            with: vec!["bold".to_string(), "strike".to_string()],
        };
        let err = args.extensions().unwrap_err();
        assert!(err.to_string().contains("strike"));
    }

    #[test]
    fn test_settings_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, r#"{ "defaultStringHandler": "text" }"#).unwrap();

        let args = EditorArgs {
            config: Some(path),
            with: vec![],
        };
        let settings = args.settings(dir.path()).unwrap();
        assert_eq!(settings.default_string_handler.as_deref(), Some("text"));
    }
}
