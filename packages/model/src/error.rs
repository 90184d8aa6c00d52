//! Error types for the document model

use thiserror::Error;

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Failure to parse a node's content expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContentExprError {
    #[error("Unexpected token at {pos} in content expression '{expr}': found {found}")]
    UnexpectedToken {
        expr: String,
        pos: usize,
        found: String,
    },

    #[error("Unexpected end of content expression '{expr}'")]
    UnexpectedEnd { expr: String },

    #[error("Invalid repeat range {{{min},{max}}} in content expression '{expr}'")]
    InvalidRange { expr: String, min: usize, max: usize },
}

impl ContentExprError {
    pub fn unexpected_token(expr: &str, pos: usize, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            expr: expr.to_string(),
            pos,
            found: found.into(),
        }
    }

    pub fn unexpected_end(expr: &str) -> Self {
        Self::UnexpectedEnd {
            expr: expr.to_string(),
        }
    }
}

/// Schema compilation and document validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Type '{0}' is defined more than once")]
    DuplicateType(String),

    #[error("Schema has no top node type '{0}'")]
    MissingTopNode(String),

    #[error("Schema has no 'text' node type")]
    MissingTextNode,

    #[error("Invalid content expression for node '{node}': {source}")]
    InvalidContentExpr {
        node: String,
        #[source]
        source: ContentExprError,
    },

    #[error("Content expression of node '{node}' references unknown type or group '{name}'")]
    UnknownContentReference { node: String, name: String },

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Unknown mark type: {0}")]
    UnknownMarkType(String),

    #[error("Missing required attribute '{attr}' on '{node}'")]
    MissingAttribute { node: String, attr: String },

    #[error("Unsupported attribute '{attr}' on '{node}'")]
    UnknownAttribute { node: String, attr: String },

    #[error("Text nodes must not be empty")]
    EmptyTextNode,

    #[error("Node '{0}' carries text but is not a text node")]
    UnexpectedText(String),

    #[error("Leaf node '{0}' cannot have content")]
    LeafHasContent(String),

    #[error("Invalid content for node '{node}': [{found}]")]
    InvalidContent { node: String, found: String },

    #[error("Mark '{mark}' is not allowed inside '{parent}'")]
    MarkNotAllowed { mark: String, parent: String },

    #[error("Mark '{0}' appears more than once on the same node")]
    DuplicateMark(String),

    #[error("Cannot create default content for '{0}'")]
    CannotFill(String),
}

/// A single step could not be applied to a document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("Position {pos} is outside the document (content size {size})")]
    OutOfRange { pos: usize, size: usize },

    #[error("Position {0} does not point into a textblock")]
    NotTextblock(usize),

    #[error("Range {from}..{to} crosses node boundaries")]
    CrossesNodes { from: usize, to: usize },

    #[error("No node starts at position {0}")]
    NoNodeAt(usize),

    #[error("Unknown mark type: {0}")]
    UnknownMark(String),
}

/// A transaction was rejected; the originating state is untouched
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Transaction was built against another state (version {expected}); the current state is at version {found}")]
    Stale { expected: u64, found: u64 },

    #[error("Step {index} failed: {source}")]
    Step {
        index: usize,
        #[source]
        source: StepError,
    },

    #[error("Resulting document is invalid: {0}")]
    Invalid(#[from] SchemaError),
}
