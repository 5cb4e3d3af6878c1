//! Marginalia
//!
//! Marker-delimited annotation blocks for reading-notes documents. A reader
//! application and a human editor can both create, update, and delete
//! individual annotation records embedded in free-form text without
//! corrupting surrounding content or losing annotation identity.
//!
//! The core is a pure function of the document text it is given: records are
//! re-derived on every call and the only durable state is the marker text
//! itself, which lives wherever the embedding application stores the
//! document.
//!
//! # Modules
//!
//! - `markers`: sentinel tokens and blockquote-prefix handling
//! - `scanner`: `parse`, the line-oriented block scanner
//! - `identity`: content-derived record ids
//! - `render`: pluggable block templates (minijinja by default)
//! - `editor`: insert/update/remove with whitespace-safe splicing
//! - `validate`: structural diagnostics for malformed blocks
//! - `session`: async storage boundary and per-document write chain
//!
//! # Quick start
//!
//! ```
//! use marginalia::{AnnotationEditor, InsertStrategy, RecordInput};
//!
//! let editor = AnnotationEditor::new();
//! let input = RecordInput::highlight("a memorable passage").with_page_label("12");
//! let doc = editor.insert("# Notes\n", &input, InsertStrategy::DocumentEnd)?;
//! assert_eq!(marginalia::parse(&doc).len(), 1);
//! # Ok::<(), marginalia::EditError>(())
//! ```

pub mod annotations;
pub mod config;
pub mod editor;
pub mod error;
pub mod identity;
pub mod markers;
pub mod render;
pub mod scanner;
pub mod session;
pub mod validate;

pub use annotations::{
    AnnotationKind, AnnotationRecord, ByteRange, Payload, RecordInput, RecordPatch,
};
pub use config::RenderConfig;
pub use editor::{AnnotationEditor, InsertStrategy};
pub use error::{EditError, RenderError, SessionError, StoreError};
pub use render::{BlockTemplate, JinjaTemplate, RenderContext, RenderMode, DEFAULT_TEMPLATE};
pub use scanner::parse;
pub use session::{DocumentSession, DocumentStore, MemoryStore};
pub use validate::{validate, Diagnostic, DiagnosticKind};
