//! Template rendering for annotation blocks
//!
//! The inverse of the scanner: turns a record's fields plus a rendering
//! context into canonical marker-delimited text. Templating sits behind the
//! narrow [`BlockTemplate`] seam so the engine can be swapped without
//! touching scanner or editor logic; the default engine is minijinja with a
//! built-in template.

use minijinja::Environment;
use serde::Serialize;

use crate::annotations::{AnnotationKind, Payload};
use crate::config::RenderConfig;
use crate::error::RenderError;

/// How the trailing line break of a rendered block is shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Block is appended into a document: exactly one trailing line break
    Append,
    /// Block replaces an existing span: no trailing line break, so repeated
    /// in-place updates never accumulate blank lines
    InPlace,
}

/// Values available to a block template
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    /// Blanked payload, serialized for the BEGIN line
    pub payload: String,
    /// Annotation kind name (lowercase)
    pub kind: String,
    /// Human-readable display label
    pub label: String,
    /// Navigation link back into the reader, when a position is known
    pub link: Option<String>,
    /// Quote text split into lines
    pub quote_lines: Vec<String>,
    /// Comment text split into lines
    pub comment_lines: Vec<String>,
    /// Blockquote prefix for the first quote line
    pub lead_prefix: String,
    /// Blockquote prefix for remaining quote and comment lines
    pub prefix: String,
    /// Highlight color, if set
    pub color: Option<String>,
    /// Free-form tags
    pub tags: Vec<String>,
}

impl RenderContext {
    /// Assemble the context for one block
    pub fn build(
        payload: &Payload,
        quote: &str,
        comment: &str,
        config: &RenderConfig,
    ) -> Result<Self, RenderError> {
        let inline = serde_json::to_string(&payload.blanked())?;
        let link = payload.position.as_deref().map(|pos| {
            format!(
                "{}://open?position={}",
                config.link_scheme,
                urlencoding::encode(pos)
            )
        });
        Ok(Self {
            payload: inline,
            kind: payload.kind.as_str().to_string(),
            label: display_label(payload),
            link,
            quote_lines: split_lines(quote),
            comment_lines: split_lines(comment),
            lead_prefix: config.lead_quote_prefix.clone(),
            prefix: config.quote_prefix.clone(),
            color: payload.color.clone(),
            tags: payload.tags.clone(),
        })
    }
}

fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.lines().map(str::to_string).collect()
    }
}

/// Display label for a block header, e.g. `p. 12 · Highlight`
fn display_label(payload: &Payload) -> String {
    let kind = match payload.kind {
        AnnotationKind::Highlight => "Highlight",
        AnnotationKind::Note => "Note",
        AnnotationKind::Bookmark => "Bookmark",
        AnnotationKind::Underline => "Underline",
    };
    match payload.page_label.as_deref() {
        Some(page) => format!("p. {} · {}", page, kind),
        None => kind.to_string(),
    }
}

/// A pluggable block template
pub trait BlockTemplate: Send + Sync {
    /// Produce the full marker-delimited block text for a context
    ///
    /// Output is trimmed by the caller; trailing-newline shaping belongs to
    /// [`render_block`], not the template.
    fn render(&self, ctx: &RenderContext) -> Result<String, RenderError>;
}

/// The built-in block template
pub const DEFAULT_TEMPLATE: &str = "\
<!-- margin:begin {{ payload }} -->{% if label %}
> [!{{ kind }}] {{ label }}{% if link %} [source]({{ link }}){% endif %}{% endif %}
<!-- margin:quote -->{% for line in quote_lines %}
{{ lead_prefix if loop.first else prefix }}{{ line }}{% endfor %}
<!-- margin:/quote -->
<!-- margin:note -->{% for line in comment_lines %}
{{ prefix }}{{ line }}{% endfor %}
<!-- margin:/note -->
<!-- margin:end -->";

/// minijinja-backed [`BlockTemplate`]
pub struct JinjaTemplate {
    env: Environment<'static>,
}

impl JinjaTemplate {
    const TEMPLATE_NAME: &'static str = "block";

    /// Compile a user-supplied template; syntax errors surface here, before
    /// any document text is touched
    pub fn new(source: &str) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.add_template_owned(Self::TEMPLATE_NAME.to_string(), source.to_string())?;
        Ok(Self { env })
    }

    /// The built-in template
    pub fn builtin() -> Self {
        Self::new(DEFAULT_TEMPLATE).expect("built-in template compiles")
    }
}

impl Default for JinjaTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BlockTemplate for JinjaTemplate {
    fn render(&self, ctx: &RenderContext) -> Result<String, RenderError> {
        let template = self.env.get_template(Self::TEMPLATE_NAME)?;
        Ok(template.render(ctx)?)
    }
}

/// Render one annotation block
///
/// Fails before producing any output; a template error never yields a
/// partial block.
pub fn render_block(
    template: &dyn BlockTemplate,
    payload: &Payload,
    quote: &str,
    comment: &str,
    config: &RenderConfig,
    mode: RenderMode,
) -> Result<String, RenderError> {
    let ctx = RenderContext::build(payload, quote, comment, config)?;
    let out = template.render(&ctx)?;
    let trimmed = out.trim();
    Ok(match mode {
        RenderMode::Append => format!("{}\n", trimmed),
        RenderMode::InPlace => trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::parse;

    fn sample_payload() -> Payload {
        Payload {
            id: "r1".to_string(),
            kind: AnnotationKind::Highlight,
            page_label: Some("12".to_string()),
            position: Some("epubcfi(/6/4!/4/2:10)".to_string()),
            ..Payload::default()
        }
    }

    #[test]
    fn test_default_template_round_trips() {
        let template = JinjaTemplate::builtin();
        let payload = sample_payload();
        let block = render_block(
            &template,
            &payload,
            "first line\nsecond line",
            "a comment",
            &RenderConfig::default(),
            RenderMode::Append,
        )
        .unwrap();

        let records = parse(&block);
        assert_eq!(records.len(), 1);

        let rec = &records["r1"];
        assert_eq!(rec.quote, "first line\nsecond line");
        assert_eq!(rec.comment, "a comment");
        assert_eq!(rec.payload, payload);
        assert!(rec.header.is_some());
    }

    #[test]
    fn test_quote_prefixes() {
        let template = JinjaTemplate::builtin();
        let block = render_block(
            &template,
            &sample_payload(),
            "first\nsecond",
            "",
            &RenderConfig::default(),
            RenderMode::Append,
        )
        .unwrap();

        assert!(block.contains("\n> > first\n"));
        assert!(block.contains("\n> second\n"));
    }

    #[test]
    fn test_append_mode_has_exactly_one_trailing_newline() {
        let template = JinjaTemplate::builtin();
        let block = render_block(
            &template,
            &sample_payload(),
            "q",
            "c",
            &RenderConfig::default(),
            RenderMode::Append,
        )
        .unwrap();

        assert!(block.ends_with("<!-- margin:end -->\n"));
        assert!(!block.ends_with("\n\n"));
    }

    #[test]
    fn test_in_place_mode_has_no_trailing_newline() {
        let template = JinjaTemplate::builtin();
        let block = render_block(
            &template,
            &sample_payload(),
            "q",
            "c",
            &RenderConfig::default(),
            RenderMode::InPlace,
        )
        .unwrap();

        assert!(block.ends_with("<!-- margin:end -->"));
    }

    #[test]
    fn test_navigation_link_is_percent_encoded() {
        let ctx = RenderContext::build(
            &sample_payload(),
            "q",
            "c",
            &RenderConfig::default(),
        )
        .unwrap();

        let link = ctx.link.unwrap();
        assert!(link.starts_with("marginalia://open?position="));
        assert!(link.contains("epubcfi%28"));
        assert!(!link.contains('('));
    }

    #[test]
    fn test_template_syntax_error_surfaces_at_construction() {
        assert!(JinjaTemplate::new("{{ unclosed").is_err());
    }

    #[test]
    fn test_template_evaluation_error_is_render_error() {
        let template = JinjaTemplate::new("{{ no_such_filter(payload) }}").unwrap();
        let result = render_block(
            &template,
            &sample_payload(),
            "q",
            "c",
            &RenderConfig::default(),
            RenderMode::Append,
        );
        assert!(matches!(result, Err(RenderError::Template(_))));
    }

    #[test]
    fn test_custom_template_round_trips() {
        let source = "\
<!-- margin:begin {{ payload }} -->
<!-- margin:quote -->{% for line in quote_lines %}
{{ line }}{% endfor %}
<!-- margin:/quote -->
<!-- margin:note -->{% for line in comment_lines %}
{{ line }}{% endfor %}
<!-- margin:/note -->
<!-- margin:end -->";
        let template = JinjaTemplate::new(source).unwrap();
        let payload = Payload {
            id: "c1".to_string(),
            ..Payload::default()
        };
        let block = render_block(
            &template,
            &payload,
            "bare quote",
            "bare comment",
            &RenderConfig::default(),
            RenderMode::Append,
        )
        .unwrap();

        let records = parse(&block);
        assert_eq!(records["c1"].quote, "bare quote");
        assert_eq!(records["c1"].comment, "bare comment");
    }

    #[test]
    fn test_empty_comment_renders_empty_sub_block() {
        let template = JinjaTemplate::builtin();
        let block = render_block(
            &template,
            &sample_payload(),
            "q",
            "",
            &RenderConfig::default(),
            RenderMode::Append,
        )
        .unwrap();

        assert!(block.contains("<!-- margin:note -->\n<!-- margin:/note -->"));
    }
}
