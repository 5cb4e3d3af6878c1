//! Section scanner
//!
//! Walks the document text once, line by line, and produces every
//! well-formed annotation block together with structural defects for
//! everything else. Scanning is maximally permissive: a malformed block is
//! dropped from the result (and reported by [`validate`]), never fatal to
//! the rest of the document.
//!
//! The walk is an explicit state machine (outside a record, record preamble,
//! inside the quote sub-block, inside the comment sub-block, record tail),
//! so behavior on malformed input is enumerable rather than emergent.
//!
//! [`validate`]: crate::validate::validate

use std::collections::HashMap;

use crate::annotations::{AnnotationRecord, ByteRange, Payload};
use crate::identity;
use crate::markers::{self, token};
use crate::validate::{Diagnostic, DiagnosticKind};

/// Parse every well-formed annotation block in `text`
///
/// Returns a map keyed by record id. Two blocks resolving to the same id
/// overwrite each other (last wins); the collision is logged here and
/// reported as a diagnostic by [`validate`](crate::validate::validate).
pub fn parse(text: &str) -> HashMap<String, AnnotationRecord> {
    let outcome = scan(text);
    let mut map = HashMap::with_capacity(outcome.records.len());
    for record in outcome.records {
        let id = record.id.clone();
        if map.insert(id.clone(), record).is_some() {
            tracing::warn!("Duplicate annotation id '{}', keeping the later block", id);
        }
    }
    map
}

/// One scan pass: parsed records in document order, plus structural defects
#[derive(Debug, Default)]
pub(crate) struct ScanOutcome {
    pub records: Vec<AnnotationRecord>,
    pub defects: Vec<Diagnostic>,
}

/// Sub-block position within an open record
enum Section {
    /// Between sub-blocks (record preamble or tail)
    Between,
    Quote,
    Comment,
}

/// A record whose BEGIN marker has been seen but not yet its END
struct OpenRecord {
    begin: ByteRange,
    indent: String,
    payload_src: String,
    header: Option<String>,
    quote_lines: Vec<String>,
    comment_lines: Vec<String>,
    quote_opened: bool,
    quote_closed: bool,
    comment_opened: bool,
    comment_closed: bool,
    saw_section: bool,
    section: Section,
}

impl OpenRecord {
    fn new(begin: ByteRange, indent: &str, payload_src: &str) -> Self {
        Self {
            begin,
            indent: indent.to_string(),
            payload_src: payload_src.to_string(),
            header: None,
            quote_lines: Vec::new(),
            comment_lines: Vec::new(),
            quote_opened: false,
            quote_closed: false,
            comment_opened: false,
            comment_closed: false,
            saw_section: false,
            section: Section::Between,
        }
    }
}

pub(crate) struct Line<'a> {
    /// Line text without the trailing newline (or carriage return)
    pub content: &'a str,
    /// Byte offset of the line start
    pub start: usize,
    /// Byte offset just past the content (before the line break)
    pub content_end: usize,
}

pub(crate) fn lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |piece| {
        let start = offset;
        offset += piece.len();
        let content = piece.strip_suffix('\n').unwrap_or(piece);
        let content = content.strip_suffix('\r').unwrap_or(content);
        Line {
            content,
            start,
            content_end: start + content.len(),
        }
    })
}

pub(crate) fn scan(text: &str) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    let mut open: Option<OpenRecord> = None;

    for line in lines(text) {
        // A BEGIN marker always starts a fresh span, even mid-record: spans
        // never merge, and the abandoned record becomes a defect.
        if let Some(payload_src) = markers::begin_payload(line.content) {
            if let Some(prev) = open.take() {
                outcome.defects.push(missing_end(prev.begin));
            }
            let (indent, _) = markers::split_marker_prefix(line.content);
            open = Some(OpenRecord::new(
                ByteRange::new(line.start, line.content_end),
                indent,
                payload_src,
            ));
            continue;
        }

        if markers::line_is(line.content, token::END) {
            if let Some(rec) = open.take() {
                let span = ByteRange::new(rec.begin.start, line.content_end);
                finalize(rec, span, text, &mut outcome);
            }
            continue;
        }

        let Some(rec) = open.as_mut() else {
            continue;
        };

        match rec.section {
            Section::Between => {
                if markers::line_is(line.content, token::QUOTE_BEGIN) {
                    rec.section = Section::Quote;
                    rec.quote_opened = true;
                    rec.saw_section = true;
                } else if markers::line_is(line.content, token::NOTE_BEGIN) {
                    rec.section = Section::Comment;
                    rec.comment_opened = true;
                    rec.saw_section = true;
                } else if markers::line_is(line.content, token::QUOTE_END)
                    || markers::line_is(line.content, token::NOTE_END)
                {
                    // Stray close token, ignored
                } else if !rec.saw_section && rec.header.is_none() {
                    let stripped = markers::strip_quote_prefix(line.content);
                    if !stripped.trim().is_empty() {
                        rec.header = Some(stripped.trim_end().to_string());
                    }
                }
            }
            Section::Quote => {
                if markers::line_is(line.content, token::QUOTE_END) {
                    rec.section = Section::Between;
                    rec.quote_closed = true;
                } else {
                    rec.quote_lines
                        .push(markers::strip_quote_prefix(line.content).to_string());
                }
            }
            Section::Comment => {
                if markers::line_is(line.content, token::NOTE_END) {
                    rec.section = Section::Between;
                    rec.comment_closed = true;
                } else {
                    rec.comment_lines
                        .push(markers::strip_quote_prefix(line.content).to_string());
                }
            }
        }
    }

    if let Some(prev) = open.take() {
        outcome.defects.push(missing_end(prev.begin));
    }

    outcome
}

fn finalize(rec: OpenRecord, span: ByteRange, text: &str, outcome: &mut ScanOutcome) {
    if !rec.quote_opened || !rec.quote_closed {
        let hint = if rec.quote_opened {
            format!("quote sub-block opened but never closed; add '{}'", token::QUOTE_END)
        } else {
            format!("no quote sub-block; add a '{}' .. '{}' pair", token::QUOTE_BEGIN, token::QUOTE_END)
        };
        outcome.defects.push(Diagnostic::new(DiagnosticKind::MissingQuote, span, hint));
        return;
    }
    if !rec.comment_opened || !rec.comment_closed {
        let hint = if rec.comment_opened {
            format!("comment sub-block opened but never closed; add '{}'", token::NOTE_END)
        } else {
            format!("no comment sub-block; add a '{}' .. '{}' pair", token::NOTE_BEGIN, token::NOTE_END)
        };
        outcome.defects.push(Diagnostic::new(DiagnosticKind::MissingComment, span, hint));
        return;
    }

    let payload: Payload = if rec.payload_src.is_empty() {
        Payload::default()
    } else {
        match serde_json::from_str(&rec.payload_src) {
            Ok(p) => p,
            Err(e) => {
                outcome.defects.push(Diagnostic::new(
                    DiagnosticKind::InvalidPayload,
                    span,
                    format!(
                        "inline payload is not valid JSON ({}); quote all keys and string values and remove trailing commas",
                        e
                    ),
                ));
                return;
            }
        }
    };

    let quote = rec.quote_lines.join("\n");
    let comment = rec.comment_lines.join("\n");

    let id = match payload.explicit_id() {
        Some(id) => id.to_string(),
        None => match identity::derive_id(&payload, &quote, &comment) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!("Dropping block at {}..{}: {}", span.start, span.end, e);
                outcome.defects.push(Diagnostic::new(
                    DiagnosticKind::InvalidPayload,
                    span,
                    format!("payload could not be re-serialized for id derivation: {}", e),
                ));
                return;
            }
        },
    };

    outcome.records.push(AnnotationRecord {
        id,
        header: rec.header,
        quote,
        comment,
        payload,
        range: span,
        raw: span.slice(text).to_string(),
        indent: rec.indent,
    });
}

fn missing_end(begin: ByteRange) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::MissingEndMarker,
        begin,
        format!("block is never terminated; add a '{}' line", token::END),
    )
}
