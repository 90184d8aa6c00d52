//! # Quire Model
//!
//! Document model underneath the quire editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ content: "block+" → ContentExpr             │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ schema: NodeSpec/MarkSpec → Schema          │
//! │  - Validate node trees                      │
//! │  - Fill required content                    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ state: EditorState + Transaction            │
//! │  - Steps produce new trees                  │
//! │  - Rejected transactions change nothing     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quire_model::{EditorState, NodeSpec, Schema};
//! use std::sync::Arc;
//!
//! let schema = Arc::new(Schema::compile(
//!     vec![
//!         NodeSpec::new("doc").with_content("paragraph+"),
//!         NodeSpec::new("paragraph").with_content("text*"),
//!         NodeSpec::new("text"),
//!     ],
//!     vec![],
//! )?);
//!
//! let state = EditorState::create(schema.clone(), schema.empty_doc()?, None)?;
//! let next = state.apply(&state.tr().insert_text(1, "Hello"))?;
//! assert_eq!(next.doc().text_content(), "Hello");
//! ```

pub mod content;
pub mod error;
pub mod node;
pub mod schema;
pub mod state;
pub mod transform;

pub use content::ContentExpr;
pub use error::{ContentExprError, SchemaError, SchemaResult, StepError, TransformError};
pub use node::{Attrs, Mark, Node, TEXT_NODE, TOP_NODE};
pub use schema::{AttributeSpec, MarkSpec, MarkType, NodeSpec, NodeType, Schema};
pub use state::{EditorState, Meta, Selection, Transaction, ADD_TO_HISTORY};
pub use transform::Step;
