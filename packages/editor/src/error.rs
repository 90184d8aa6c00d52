//! Error types for the editor

use quire_model::{SchemaError, TransformError};
use thiserror::Error;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Extension '{extension}' requires '{dependency}', which is not registered")]
    MissingDependency { extension: String, dependency: String },

    #[error("Type '{name}' is contributed by both '{first}' and '{second}'")]
    SchemaConflict {
        name: String,
        first: String,
        second: String,
    },

    #[error("No string handler named '{0}'")]
    StringHandlerNotFound(String),

    #[error("Manager has been destroyed")]
    ManagerDestroyed,

    #[error("A view is already bound to this editor")]
    ViewAlreadyBound,

    #[error("Transaction rejected: {0}")]
    TransactionRejected(#[from] TransformError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("String content needs a handler and no default handler is configured")]
    MissingStringHandler,

    #[error("Unknown command: {0}")]
    CommandNotFound(String),

    #[error("No view is bound to this editor")]
    ViewNotBound,

    #[error("State was created from a different schema")]
    SchemaMismatch,

    #[error("Option '{option}' of extension '{extension}' cannot be changed at runtime")]
    ImmutableOption { extension: String, option: String },

    #[error("Extension '{extension}' has no option '{option}'")]
    UnknownOption { extension: String, option: String },

    #[error("Unknown extension: {0}")]
    UnknownExtension(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditorError {
    /// Errors caused by the content itself rather than by editor misuse
    pub fn is_content_error(&self) -> bool {
        matches!(
            self,
            EditorError::Schema(_) | EditorError::InvalidContent(_) | EditorError::Json(_)
        )
    }
}
