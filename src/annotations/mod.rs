//! Annotation data model
//!
//! Records are ephemeral views over marker-delimited blocks: every parse
//! recomputes them from the supplied document text, and the only durable
//! state is the marker text itself.
//!
//! # Types
//!
//! - [`AnnotationRecord`] - one parsed block with exact byte range and raw slice
//! - [`Payload`] - typed inline payload plus a side-map of unrecognized keys
//! - [`AnnotationKind`] - highlight / note / bookmark / underline
//! - [`RecordInput`] / [`RecordPatch`] - insert and update inputs
//! - [`ByteRange`] - byte offsets into the owning document

mod types;

pub use types::{
    AnnotationKind, AnnotationRecord, ByteRange, Payload, RecordInput, RecordPatch,
};
