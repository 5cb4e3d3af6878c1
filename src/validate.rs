//! Structural validation
//!
//! Read-only companion to the scanner: reports every malformed or incomplete
//! annotation span with a byte range and a repair hint, without mutating the
//! document. Diagnostics are the sanctioned channel for surfacing broken
//! records to a human; the core never attempts automatic repair.

use serde::Serialize;
use std::collections::HashMap;

use crate::annotations::ByteRange;
use crate::scanner;

/// Kinds of structural defects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A BEGIN marker with no matching END
    MissingEndMarker,
    /// Inline payload is not valid JSON (or cannot be re-serialized)
    InvalidPayload,
    /// Quote sub-block absent or never closed
    MissingQuote,
    /// Comment sub-block absent or never closed
    MissingComment,
    /// Two blocks resolved to the same id; the later one shadows the earlier
    DuplicateId,
}

/// One structural defect
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub range: ByteRange,
    pub hint: String,
}

impl Diagnostic {
    pub(crate) fn new(kind: DiagnosticKind, range: ByteRange, hint: String) -> Self {
        Self { kind, range, hint }
    }
}

/// Scan `text` and report every structural defect, sorted by position
pub fn validate(text: &str) -> Vec<Diagnostic> {
    let outcome = scanner::scan(text);
    let mut diagnostics = outcome.defects;

    let mut seen: HashMap<&str, ByteRange> = HashMap::new();
    for record in &outcome.records {
        match seen.get(record.id.as_str()) {
            Some(first) => diagnostics.push(Diagnostic::new(
                DiagnosticKind::DuplicateId,
                record.range,
                format!(
                    "id '{}' already used by the block at {}..{}; pin a distinct explicit id in the payload",
                    record.id, first.start, first.end
                ),
            )),
            None => {
                seen.insert(record.id.as_str(), record.range);
            }
        }
    }

    diagnostics.sort_by_key(|d| d.range.start);
    diagnostics
}
