//! Marker grammar for annotation blocks
//!
//! Annotation records are delimited by HTML-comment sentinels. Comments are
//! invisible in rendered markdown, line-anchored, and unlikely to collide
//! with prose, and they survive round-trips through external editors.
//!
//! Every inner line of a block may carry a blockquote/indent prefix (one or
//! more leading `>` markers or whitespace). The helpers here strip those
//! prefixes so the scanner can interpret tokens, and expose the raw prefix
//! of a line so the editor can re-apply nesting when it rewrites a block.

/// Sentinel tokens delimiting a record and its sub-sections
pub mod token {
    /// Opens a record; the inline JSON payload sits between this and [`CLOSE`]
    pub const BEGIN: &str = "<!-- margin:begin";
    /// Closes the BEGIN marker line
    pub const CLOSE: &str = "-->";
    /// Terminates a record
    pub const END: &str = "<!-- margin:end -->";
    /// Opens the quote sub-block
    pub const QUOTE_BEGIN: &str = "<!-- margin:quote -->";
    /// Closes the quote sub-block
    pub const QUOTE_END: &str = "<!-- margin:/quote -->";
    /// Opens the comment sub-block
    pub const NOTE_BEGIN: &str = "<!-- margin:note -->";
    /// Closes the comment sub-block
    pub const NOTE_END: &str = "<!-- margin:/note -->";
    /// End-of-section sentinel honored by the within-block insert strategy
    pub const BLOCKS_END: &str = "<!-- margin:blocks-end -->";
}

/// Split a line into its blockquote/indent prefix and the remainder
///
/// The prefix is the leading run of `>` markers, spaces, and tabs. Marker
/// tokens never begin with whitespace, so the remainder is what the scanner
/// matches sentinels against.
pub fn split_marker_prefix(line: &str) -> (&str, &str) {
    let rest = line.trim_start_matches(|c| c == '>' || c == ' ' || c == '\t');
    let prefix_len = line.len() - rest.len();
    (&line[..prefix_len], rest)
}

/// Strip the blockquote prefix from a content line
///
/// Consumes each `>` marker together with at most one following space (and
/// up to three spaces of indent before it, per markdown blockquote rules).
/// Indentation after the last marker is content and is preserved, so quoted
/// text keeps its own leading whitespace through a parse/render round-trip.
pub fn strip_quote_prefix(line: &str) -> &str {
    let mut rest = line;
    loop {
        let mut probe = rest;
        let mut indent = 0;
        while indent < 3 && probe.starts_with(' ') {
            probe = &probe[1..];
            indent += 1;
        }
        match probe.strip_prefix('>') {
            Some(after) => {
                rest = after.strip_prefix(' ').unwrap_or(after);
            }
            None => break,
        }
    }
    rest
}

/// True when the line (ignoring any blockquote prefix) is exactly `token`
pub fn line_is(line: &str, token: &str) -> bool {
    let (_, rest) = split_marker_prefix(line);
    rest.trim_end() == token
}

/// Extract the inline payload source from a BEGIN marker line
///
/// Returns `None` when the line is not a BEGIN marker. A BEGIN marker is
/// only recognized when its `-->` close token sits on the same line; a bare
/// `<!-- margin:begin` fragment is ordinary prose.
pub fn begin_payload(line: &str) -> Option<&str> {
    let (_, rest) = split_marker_prefix(line);
    let rest = rest.trim_end();
    let after = rest.strip_prefix(token::BEGIN)?;
    // Token boundary: "<!-- margin:beginx" is not a marker
    if !after.is_empty() && !after.starts_with(' ') && !after.starts_with('\t') {
        return None;
    }
    let inner = after.strip_suffix(token::CLOSE)?;
    Some(inner.trim())
}
