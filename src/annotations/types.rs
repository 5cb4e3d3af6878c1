//! Annotation record types
//!
//! A record is the parsed view of one marker-delimited block. Records are
//! ephemeral: every parse recomputes them from the document text, and the
//! only durable state is the marker text itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::RenderError;
use crate::identity;

/// A byte range into the owning document at parse time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    /// Start offset (inclusive)
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// The text slice this range covers
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// Types of annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// Text highlight
    #[default]
    Highlight,
    /// Text note with content
    Note,
    /// Bookmark (position marker)
    Bookmark,
    /// Underline
    Underline,
}

impl AnnotationKind {
    /// Lowercase name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "highlight",
            AnnotationKind::Note => "note",
            AnnotationKind::Bookmark => "bookmark",
            AnnotationKind::Underline => "underline",
        }
    }
}

/// The inline payload carried on a record's BEGIN marker line
///
/// Known fields are typed; anything else a producing application writes into
/// the payload lands in `extra` and is preserved verbatim through
/// parse/render round-trips. The `quote` and `comment` fields exist so that
/// hand-written payloads carrying them deserialize cleanly, but the
/// sub-blocks are the single source of truth: rendering always blanks them,
/// and blank fields are omitted from the inline JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Explicit stable id; empty means the id is derived from content
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Type of annotation
    #[serde(rename = "type", default)]
    pub kind: AnnotationKind,

    /// Highlight color (CSS color value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Locator into the source publication (e.g. an EPUB CFI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,

    /// Human-readable page label
    #[serde(rename = "pageLabel", default, skip_serializing_if = "Option::is_none")]
    pub page_label: Option<String>,

    /// Creation timestamp
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Last modification timestamp
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Free-form tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Quoted text; blanked inline, the quote sub-block owns it
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub quote: String,

    /// Comment text; blanked inline, the comment sub-block owns it
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,

    /// Unrecognized payload keys, preserved through round-trips
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload {
    /// Copy of the payload with `quote` and `comment` cleared
    ///
    /// This is the form embedded on the BEGIN line and the form the identity
    /// hash is computed over.
    pub fn blanked(&self) -> Payload {
        let mut p = self.clone();
        p.quote = String::new();
        p.comment = String::new();
        p
    }

    /// Canonical JSON encoding of the blanked payload
    ///
    /// serde_json's default map is ordered, so extension keys serialize in
    /// sorted order and the encoding is stable across re-parses.
    pub fn canonical_json(&self) -> Result<String, RenderError> {
        Ok(serde_json::to_string(&self.blanked())?)
    }

    /// Explicit id if pinned, trimmed
    pub fn explicit_id(&self) -> Option<&str> {
        let id = self.id.trim();
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }
}

/// One parsed marker-delimited annotation block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRecord {
    /// Stable id: explicit from the payload, or derived from content
    pub id: String,
    /// Optional free-text header line between BEGIN and the first sub-block
    pub header: Option<String>,
    /// Quoted source text from the quote sub-block
    pub quote: String,
    /// Reader commentary from the comment sub-block
    pub comment: String,
    /// Inline payload
    pub payload: Payload,
    /// Byte range of the block within the document at parse time
    pub range: ByteRange,
    /// Exact text slice at `range`
    pub raw: String,
    /// Blockquote/indent prefix of the BEGIN line, re-applied on rewrite
    #[serde(skip)]
    pub indent: String,
}

impl AnnotationRecord {
    /// The annotation type carried in the payload
    pub fn kind(&self) -> AnnotationKind {
        self.payload.kind
    }

    /// The publication locator if the payload carries one
    pub fn position(&self) -> Option<&str> {
        self.payload.position.as_deref()
    }

    /// The page label if the payload carries one
    pub fn page_label(&self) -> Option<&str> {
        self.payload.page_label.as_deref()
    }
}

/// Input for inserting a new annotation block
#[derive(Debug, Clone, Default)]
pub struct RecordInput {
    pub payload: Payload,
    pub quote: String,
    pub comment: String,
}

impl RecordInput {
    /// Create an input from pre-built parts
    pub fn new(payload: Payload, quote: &str, comment: &str) -> Self {
        Self {
            payload,
            quote: quote.to_string(),
            comment: comment.to_string(),
        }
    }

    /// Create a highlight with a pinned id and fresh timestamps
    ///
    /// Pinning an id up front keeps identity stable when the quote or
    /// comment text is edited later.
    pub fn highlight(quote: &str) -> Self {
        Self::stamped(AnnotationKind::Highlight, quote, "")
    }

    /// Create a note with a pinned id and fresh timestamps
    pub fn note(quote: &str, comment: &str) -> Self {
        Self::stamped(AnnotationKind::Note, quote, comment)
    }

    /// Create a bookmark at a publication locator
    pub fn bookmark(position: &str) -> Self {
        let mut input = Self::stamped(AnnotationKind::Bookmark, "", "");
        input.payload.position = Some(position.to_string());
        input
    }

    fn stamped(kind: AnnotationKind, quote: &str, comment: &str) -> Self {
        let now = Utc::now();
        Self {
            payload: Payload {
                id: Uuid::new_v4().to_string(),
                kind,
                created_at: Some(now),
                updated_at: Some(now),
                ..Payload::default()
            },
            quote: quote.to_string(),
            comment: comment.to_string(),
        }
    }

    /// Set the color
    pub fn with_color(mut self, color: &str) -> Self {
        self.payload.color = Some(color.to_string());
        self
    }

    /// Set the publication locator
    pub fn with_position(mut self, position: &str) -> Self {
        self.payload.position = Some(position.to_string());
        self
    }

    /// Set the page label
    pub fn with_page_label(mut self, label: &str) -> Self {
        self.payload.page_label = Some(label.to_string());
        self
    }

    /// Set the tags
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.payload.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// The id this input resolves to: explicit if pinned, derived otherwise
    pub fn resolved_id(&self) -> Result<String, RenderError> {
        match self.payload.explicit_id() {
            Some(id) => Ok(id.to_string()),
            None => identity::derive_id(&self.payload, &self.quote, &self.comment),
        }
    }
}

/// Field-level patch applied by `update`
///
/// Absent fields keep the record's current values. Timestamps are never
/// refreshed implicitly (a repeated update must produce identical text);
/// callers that want a modification time set `updated_at` explicitly.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub quote: Option<String>,
    pub comment: Option<String>,
    pub kind: Option<AnnotationKind>,
    pub color: Option<String>,
    pub position: Option<String>,
    pub page_label: Option<String>,
    pub tags: Option<Vec<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the comment text
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Replace the quote text
    pub fn with_quote(mut self, quote: &str) -> Self {
        self.quote = Some(quote.to_string());
        self
    }

    /// Replace the color
    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    /// Replace the tags
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = Some(tags.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Set the modification timestamp
    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    /// Apply the patch to a parsed record, producing the replacement parts
    pub fn apply(&self, record: &AnnotationRecord) -> (Payload, String, String) {
        let mut payload = record.payload.clone();
        if let Some(kind) = self.kind {
            payload.kind = kind;
        }
        if let Some(ref color) = self.color {
            payload.color = Some(color.clone());
        }
        if let Some(ref position) = self.position {
            payload.position = Some(position.clone());
        }
        if let Some(ref label) = self.page_label {
            payload.page_label = Some(label.clone());
        }
        if let Some(ref tags) = self.tags {
            payload.tags = tags.clone();
        }
        if let Some(at) = self.updated_at {
            payload.updated_at = Some(at);
        }
        let quote = self.quote.clone().unwrap_or_else(|| record.quote.clone());
        let comment = self
            .comment
            .clone()
            .unwrap_or_else(|| record.comment.clone());
        (payload, quote, comment)
    }
}
