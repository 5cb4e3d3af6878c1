//! Section editor
//!
//! Orchestrates insert, update, and remove against full document text. Every
//! operation follows the same shape: re-derive the record view from the
//! supplied text (ranges from an earlier parse are stale after any edit),
//! compute a minimal splice, and return the fully-formed new text. A failed
//! operation returns an error and the caller's text is untouched.

use crate::annotations::{ByteRange, RecordInput, RecordPatch};
use crate::config::RenderConfig;
use crate::error::EditError;
use crate::markers::{self, token};
use crate::render::{render_block, BlockTemplate, JinjaTemplate, RenderMode};
use crate::scanner;

/// Where a new block is placed in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertStrategy {
    /// Append after the last non-blank line
    #[default]
    DocumentEnd,
    /// Immediately after a leading front-matter block, else at the top
    AfterFrontMatter,
    /// Immediately before the blocks-end sentinel, else like [`DocumentEnd`]
    ///
    /// [`DocumentEnd`]: InsertStrategy::DocumentEnd
    WithinBlockSection,
}

/// Editor for marker-delimited annotation blocks
pub struct AnnotationEditor {
    template: Box<dyn BlockTemplate>,
    config: RenderConfig,
}

impl Default for AnnotationEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationEditor {
    /// Editor with the built-in template and default render config
    pub fn new() -> Self {
        Self {
            template: Box::new(JinjaTemplate::builtin()),
            config: RenderConfig::default(),
        }
    }

    /// Editor with a custom block template
    pub fn with_template(template: Box<dyn BlockTemplate>) -> Self {
        Self {
            template,
            config: RenderConfig::default(),
        }
    }

    /// Set the render config
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Insert a new annotation block
    ///
    /// The block is rendered before any text is assembled; a template
    /// failure aborts the operation with the document unchanged.
    pub fn insert(
        &self,
        text: &str,
        input: &RecordInput,
        strategy: InsertStrategy,
    ) -> Result<String, EditError> {
        let block = render_block(
            self.template.as_ref(),
            &input.payload,
            &input.quote,
            &input.comment,
            &self.config,
            RenderMode::Append,
        )?;
        Ok(match strategy {
            InsertStrategy::DocumentEnd => insert_at_end(text, &block),
            InsertStrategy::AfterFrontMatter => insert_after_front_matter(text, &block),
            InsertStrategy::WithinBlockSection => insert_before_sentinel(text, &block),
        })
    }

    /// Replace the block with the given id in place
    ///
    /// Splices the re-rendered block into the record's exact byte range,
    /// touching no surrounding whitespace. A record whose id was derived
    /// gets that id pinned into its payload here, so the annotation keeps
    /// its identity across the edit.
    pub fn update(&self, text: &str, id: &str, patch: &RecordPatch) -> Result<String, EditError> {
        let records = scanner::parse(text);
        let record = records
            .get(id)
            .ok_or_else(|| EditError::NotFound(id.to_string()))?;

        let (mut payload, quote, comment) = patch.apply(record);
        if payload.explicit_id().is_none() {
            payload.id = id.to_string();
        }

        let block = render_block(
            self.template.as_ref(),
            &payload,
            &quote,
            &comment,
            &self.config,
            RenderMode::InPlace,
        )?;
        let block = reindent(&block, &record.indent);

        tracing::debug!(
            "Replacing block '{}' at {}..{}",
            id,
            record.range.start,
            record.range.end
        );
        Ok(format!(
            "{}{}{}",
            &text[..record.range.start],
            block,
            &text[record.range.end..]
        ))
    }

    /// Delete the block with the given id
    pub fn remove(&self, text: &str, id: &str) -> Result<String, EditError> {
        let records = scanner::parse(text);
        let record = records
            .get(id)
            .ok_or_else(|| EditError::NotFound(id.to_string()))?;

        tracing::debug!(
            "Removing block '{}' at {}..{}",
            id,
            record.range.start,
            record.range.end
        );
        Ok(splice_out(text, record.range))
    }
}

const BLANK: &[char] = &[' ', '\t', '\n', '\r'];

fn insert_at_end(text: &str, block: &str) -> String {
    let trimmed = text.trim_end_matches(BLANK);
    if trimmed.is_empty() {
        block.to_string()
    } else {
        format!("{}\n\n{}", trimmed, block)
    }
}

fn insert_after_front_matter(text: &str, block: &str) -> String {
    match front_matter_end(text) {
        Some(end) => {
            let head = text[..end].trim_end_matches(BLANK);
            let tail = skip_blank_lines(&text[end..]);
            if tail.is_empty() {
                format!("{}\n\n{}", head, block)
            } else {
                format!("{}\n\n{}\n{}", head, block, tail)
            }
        }
        None => {
            let tail = skip_blank_lines(text);
            if tail.is_empty() {
                block.to_string()
            } else {
                format!("{}\n{}", block, tail)
            }
        }
    }
}

fn insert_before_sentinel(text: &str, block: &str) -> String {
    let Some(pos) = blocks_end_line_start(text) else {
        return insert_at_end(text, block);
    };
    // Everything from the sentinel line on is preserved verbatim
    let before = text[..pos].trim_end_matches(BLANK);
    let after = &text[pos..];
    if before.is_empty() {
        format!("{}\n{}", block, after)
    } else {
        format!("{}\n\n{}\n{}", before, block, after)
    }
}

/// Byte offset just past a leading `---` front-matter fence, if present
fn front_matter_end(text: &str) -> Option<usize> {
    let mut first = true;
    for line in scanner::lines(text) {
        let content = line.content.trim_end();
        if first {
            if content != "---" {
                return None;
            }
            first = false;
        } else if content == "---" {
            let rest = &text[line.content_end..];
            let newline = if rest.starts_with("\r\n") {
                2
            } else if rest.starts_with('\n') {
                1
            } else {
                0
            };
            return Some(line.content_end + newline);
        }
    }
    None
}

fn blocks_end_line_start(text: &str) -> Option<usize> {
    scanner::lines(text)
        .find(|line| markers::line_is(line.content, token::BLOCKS_END))
        .map(|line| line.start)
}

/// Drop leading whole blank lines, keeping the first content line intact
fn skip_blank_lines(text: &str) -> &str {
    let mut rest = text;
    loop {
        match rest.find('\n') {
            Some(nl) if rest[..nl].trim().is_empty() => rest = &rest[nl + 1..],
            Some(_) => return rest,
            None => return if rest.trim().is_empty() { "" } else { rest },
        }
    }
}

/// Re-apply a blockquote/indent prefix to every line of a rendered block
fn reindent(block: &str, indent: &str) -> String {
    if indent.is_empty() {
        return block.to_string();
    }
    block
        .lines()
        .map(|line| format!("{}{}", indent, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Delete a range plus the contiguous blank whitespace around it
///
/// Joins the remaining sides with a single space when two non-blank
/// characters would otherwise touch, or with exactly one blank line when a
/// line-break boundary existed.
fn splice_out(text: &str, range: ByteRange) -> String {
    let before = &text[..range.start];
    let after = &text[range.end..];

    let left = before.trim_end_matches(BLANK);
    let right = after.trim_start_matches(BLANK);
    let eaten_left = &before[left.len()..];
    let eaten_right = &after[..after.len() - right.len()];
    let had_line_break = eaten_left.contains('\n') || eaten_right.contains('\n');

    if left.is_empty() {
        return right.to_string();
    }
    if right.is_empty() {
        return format!("{}\n", left);
    }
    if had_line_break {
        format!("{}\n\n{}", left, right)
    } else {
        format!("{} {}", left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Payload;
    use crate::scanner::parse;

    fn editor() -> AnnotationEditor {
        AnnotationEditor::new()
    }

    fn input(id: &str, quote: &str, comment: &str) -> RecordInput {
        RecordInput::new(
            Payload {
                id: id.to_string(),
                ..Payload::default()
            },
            quote,
            comment,
        )
    }

    #[test]
    fn test_insert_into_empty_document() {
        let ed = editor();
        let record = input("a", "q", "c");
        let result = ed
            .insert("", &record, InsertStrategy::DocumentEnd)
            .unwrap();

        // The result is exactly the rendered block, no leading blank lines
        let block = render_block(
            ed.template.as_ref(),
            &record.payload,
            &record.quote,
            &record.comment,
            &ed.config,
            RenderMode::Append,
        )
        .unwrap();
        assert_eq!(result, block);
        assert!(result.starts_with("<!-- margin:begin"));
        assert_eq!(parse(&result).len(), 1);
    }

    #[test]
    fn test_insert_at_end_normalizes_trailing_blanks() {
        let result = editor()
            .insert(
                "prose\n\n\n\n",
                &input("a", "q", "c"),
                InsertStrategy::DocumentEnd,
            )
            .unwrap();

        assert!(result.starts_with("prose\n\n<!-- margin:begin"));
    }

    #[test]
    fn test_insert_after_front_matter() {
        let doc = "---\ntitle: notes\n---\n\nbody text\n";
        let result = editor()
            .insert(doc, &input("a", "q", "c"), InsertStrategy::AfterFrontMatter)
            .unwrap();

        assert!(result.starts_with("---\ntitle: notes\n---\n\n<!-- margin:begin"));
        assert!(result.contains("<!-- margin:end -->\n\nbody text\n"));
    }

    #[test]
    fn test_insert_after_front_matter_without_front_matter() {
        let result = editor()
            .insert(
                "body text\n",
                &input("a", "q", "c"),
                InsertStrategy::AfterFrontMatter,
            )
            .unwrap();

        assert!(result.starts_with("<!-- margin:begin"));
        assert!(result.contains("<!-- margin:end -->\n\nbody text\n"));
    }

    #[test]
    fn test_insert_within_block_section() {
        let doc = "intro\n\n<!-- margin:blocks-end -->\n\nepilogue, kept verbatim\n";
        let result = editor()
            .insert(doc, &input("a", "q", "c"), InsertStrategy::WithinBlockSection)
            .unwrap();

        assert!(result.starts_with("intro\n\n<!-- margin:begin"));
        assert!(result.contains("<!-- margin:end -->\n\n<!-- margin:blocks-end -->\n\nepilogue, kept verbatim\n"));
    }

    #[test]
    fn test_insert_falls_back_to_end_without_sentinel() {
        let result = editor()
            .insert(
                "just prose\n",
                &input("a", "q", "c"),
                InsertStrategy::WithinBlockSection,
            )
            .unwrap();

        assert!(result.starts_with("just prose\n\n<!-- margin:begin"));
    }

    #[test]
    fn test_update_leaves_neighbor_untouched() {
        let ed = editor();
        let doc = ed
            .insert("", &input("first", "q1", "c1"), InsertStrategy::DocumentEnd)
            .unwrap();
        let doc = ed
            .insert(&doc, &input("second", "q2", "c2"), InsertStrategy::DocumentEnd)
            .unwrap();

        let patch = RecordPatch::new().with_comment("revised");
        let updated = ed.update(&doc, "first", &patch).unwrap();

        let records = parse(&updated);
        assert_eq!(records.len(), 2);
        assert_eq!(records["first"].comment, "revised");
        assert_eq!(records["first"].quote, "q1");
        assert_eq!(records["second"].quote, "q2");
        assert_eq!(records["second"].comment, "c2");
    }

    #[test]
    fn test_update_is_idempotent() {
        let ed = editor();
        let doc = ed
            .insert("prose\n", &input("a", "q", "c"), InsertStrategy::DocumentEnd)
            .unwrap();

        let patch = RecordPatch::new().with_comment("revised").with_color("#00ff00");
        let once = ed.update(&doc, "a", &patch).unwrap();
        let twice = ed.update(&once, "a", &patch).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_update_pins_derived_id() {
        let ed = editor();
        let doc = ed
            .insert("", &input("", "stable quote", "c"), InsertStrategy::DocumentEnd)
            .unwrap();

        let records = parse(&doc);
        let derived = records.keys().next().unwrap().clone();
        assert_eq!(derived.len(), 8);

        let updated = ed
            .update(&doc, &derived, &RecordPatch::new().with_comment("edited"))
            .unwrap();

        // id survives the edit
        let records = parse(&updated);
        assert_eq!(records[&derived].comment, "edited");
    }

    #[test]
    fn test_update_preserves_surrounding_text() {
        let ed = editor();
        let doc = format!(
            "intro paragraph\n\n{}afterword\n",
            ed.insert("", &input("a", "q", "c"), InsertStrategy::DocumentEnd)
                .unwrap()
        );

        let updated = ed
            .update(&doc, "a", &RecordPatch::new().with_quote("new quote"))
            .unwrap();

        assert!(updated.starts_with("intro paragraph\n\n<!-- margin:begin"));
        assert!(updated.ends_with("<!-- margin:end -->\nafterword\n"));
    }

    #[test]
    fn test_update_unknown_id() {
        let err = editor()
            .update("no blocks here\n", "ghost", &RecordPatch::new())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_reapplies_blockquote_indent() {
        let ed = editor();
        let block = ed
            .insert("", &input("a", "q", "c"), InsertStrategy::DocumentEnd)
            .unwrap();
        let nested: String = block
            .lines()
            .map(|l| format!("> {}\n", l))
            .collect();

        let updated = ed
            .update(&nested, "a", &RecordPatch::new().with_comment("still nested"))
            .unwrap();

        assert!(updated.starts_with("> <!-- margin:begin"));
        let records = parse(&updated);
        assert_eq!(records["a"].comment, "still nested");
        assert_eq!(records["a"].indent, "> ");
    }

    #[test]
    fn test_remove_between_paragraphs_collapses_to_one_blank_line() {
        let ed = editor();
        let block = ed
            .insert("", &input("a", "q", "c"), InsertStrategy::DocumentEnd)
            .unwrap();
        let doc = format!("para one\n\n{}\n\npara two\n", block.trim_end());

        let result = ed.remove(&doc, "a").unwrap();
        assert_eq!(result, "para one\n\npara two\n");
    }

    #[test]
    fn test_insert_then_remove_restores_document() {
        let ed = editor();
        let doc = "alpha\n\nbeta\n";
        let inserted = ed
            .insert(doc, &input("a", "q", "c"), InsertStrategy::DocumentEnd)
            .unwrap();
        let restored = ed.remove(&inserted, "a").unwrap();

        assert_eq!(restored, doc);
    }

    #[test]
    fn test_remove_only_block_leaves_empty_document() {
        let ed = editor();
        let doc = ed
            .insert("", &input("a", "q", "c"), InsertStrategy::DocumentEnd)
            .unwrap();
        assert_eq!(ed.remove(&doc, "a").unwrap(), "");
    }

    #[test]
    fn test_remove_unknown_id() {
        let err = editor().remove("plain text\n", "ghost").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_splice_out_joins_words_with_a_space() {
        let text = "alpha REMOVED omega";
        let range = ByteRange::new(6, 13);
        assert_eq!(&text[6..13], "REMOVED");
        assert_eq!(splice_out(text, range), "alpha omega");
    }

    #[test]
    fn test_front_matter_end() {
        assert_eq!(front_matter_end("---\na: b\n---\nrest\n"), Some(13));
        assert_eq!(front_matter_end("no fence\n"), None);
        assert_eq!(front_matter_end("---\nunclosed\n"), None);
    }
}
