//! Locating the directive block in the head of a source file.

use crate::error::DirectiveError;
use anvil_config::OPT_IN_MARKER;
use anvil_source::SourceUnit;

/// A line of directive text with its 1-indexed position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-indexed line number within the source file.
    pub line: u32,
    /// The line's text, comment prefixes stripped where applicable.
    pub text: String,
}

/// A directive block extracted from the head of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveBlock {
    /// A `<% … %>` script block: statements evaluated in order.
    Script {
        /// The statement lines between the delimiters.
        lines: Vec<SourceLine>,
    },
    /// A marker comment: an optional inline JSON object plus
    /// `key = value` assignment lines in the following comment lines.
    Marker {
        /// JSON object text from the marker line, with its line number.
        json: Option<SourceLine>,
        /// Assignment lines from subsequent comments.
        assignments: Vec<SourceLine>,
    },
}

/// Locates the directive block in a unit's head, if any.
///
/// The script form wins when both are present: a file often carries the
/// opt-in marker on its first line *and* a script block below it. Returns
/// `Ok(None)` when the file has neither form, which is informational,
/// not an error.
pub fn extract(unit: &SourceUnit) -> Result<Option<DirectiveBlock>, DirectiveError> {
    if let Some(block) = extract_script(unit)? {
        return Ok(Some(block));
    }
    Ok(extract_marker(unit))
}

/// Scans the head of the file for a `<% … %>` block.
///
/// The head is the run of blank lines and comment-looking lines before
/// the first line of ordinary code; a block opener inside it may sit
/// within a `/* … */` wrapper. A `<%` with no closing `%>` is a syntax
/// error.
fn extract_script(unit: &SourceUnit) -> Result<Option<DirectiveBlock>, DirectiveError> {
    let mut lines = unit.content.lines().enumerate();

    // Find the opening delimiter without leaving the file head.
    let (open_idx, open_line, open_col) = loop {
        let Some((idx, line)) = lines.next() else {
            return Ok(None);
        };
        if let Some(col) = line.find("<%") {
            break (idx, line, col);
        }
        if !is_head_line(line) {
            return Ok(None);
        }
    };

    let mut collected = Vec::new();

    // Anything after `<%` on the opening line belongs to the block.
    let after_open = &open_line[open_col + 2..];
    if let Some(end) = after_open.find("%>") {
        push_statement(&mut collected, open_idx, &after_open[..end]);
        return Ok(Some(DirectiveBlock::Script { lines: collected }));
    }
    push_statement(&mut collected, open_idx, after_open);

    for (idx, line) in lines {
        if let Some(end) = line.find("%>") {
            push_statement(&mut collected, idx, &line[..end]);
            return Ok(Some(DirectiveBlock::Script { lines: collected }));
        }
        push_statement(&mut collected, idx, line);
    }

    Err(DirectiveError::syntax(
        &unit.path,
        (open_idx + 1) as u32,
        open_line,
        "unterminated directive block: missing '%>'",
    ))
}

/// Scans for the marker-comment form: a leading `//` comment containing
/// the marker word, optionally followed by a JSON object on the same
/// line and `key = value` comment lines below.
fn extract_marker(unit: &SourceUnit) -> Option<DirectiveBlock> {
    let mut lines = unit.content.lines().enumerate();

    // The marker must appear in the head, in a line comment.
    let (marker_idx, marker_rest) = loop {
        let (idx, line) = lines.next()?;
        let trimmed = line.trim_start();
        if let Some(body) = trimmed.strip_prefix("//") {
            if let Some(pos) = body.find(OPT_IN_MARKER) {
                break (idx, body[pos + OPT_IN_MARKER.len()..].trim().to_string());
            }
            continue;
        }
        if !is_head_line(line) {
            return None;
        }
    };

    let json = if marker_rest.starts_with('{') {
        Some(SourceLine {
            line: (marker_idx + 1) as u32,
            text: marker_rest,
        })
    } else {
        None
    };

    // Assignment lines: following `//` comments of the form `key = …`.
    let mut assignments = Vec::new();
    for (idx, line) in lines {
        let trimmed = line.trim_start();
        let Some(body) = trimmed.strip_prefix("//") else {
            break;
        };
        let body = body.trim();
        if !looks_like_assignment(body) {
            break;
        }
        assignments.push(SourceLine {
            line: (idx + 1) as u32,
            text: body.to_string(),
        });
    }

    Some(DirectiveBlock::Marker { json, assignments })
}

/// Returns `true` for lines allowed before the directive block: blanks
/// and comment furniture.
fn is_head_line(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with("//") || t.starts_with("/*") || t.starts_with('*')
}

/// `key = …` with an identifier on the left and no comparison operator.
fn looks_like_assignment(body: &str) -> bool {
    let Some(eq) = body.find('=') else {
        return false;
    };
    if body[eq..].starts_with("==") {
        return false;
    }
    let lhs = body[..eq].trim();
    !lhs.is_empty()
        && lhs
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn push_statement(collected: &mut Vec<SourceLine>, idx: usize, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        collected.push(SourceLine {
            line: (idx + 1) as u32,
            text: text.to_string(),
        });
    }
}

/// Produces the compilable rendition of a unit's content.
///
/// A script block is not source code: everything from `<%` through `%>`
/// is removed before the file reaches the compiler, with line breaks
/// preserved so compiler messages keep their original line numbers. The
/// marker-comment form is already legal code and passes through
/// untouched, as does content with no block at all.
pub fn strip_directives(content: &str) -> String {
    let mut lines = content.lines().enumerate();

    let (open_idx, open_line, open_col) = loop {
        let Some((idx, line)) = lines.next() else {
            return content.to_string();
        };
        if let Some(col) = line.find("<%") {
            break (idx, line, col);
        }
        if !is_head_line(line) {
            return content.to_string();
        }
    };

    let after_open = &open_line[open_col + 2..];

    // Locate the close delimiter: same line or a later one.
    let (close_idx, close_col) = if let Some(col) = after_open.find("%>") {
        (open_idx, open_col + 2 + col)
    } else {
        let mut found = None;
        for (idx, line) in lines {
            if let Some(col) = line.find("%>") {
                found = Some((idx, col));
                break;
            }
        }
        match found {
            Some(pos) => pos,
            // Unterminated; extraction reports this, leave content alone.
            None => return content.to_string(),
        }
    };

    let mut out = String::with_capacity(content.len());
    for (idx, line) in content.lines().enumerate() {
        if idx == open_idx && idx == close_idx {
            out.push_str(&line[..open_col]);
            out.push_str(&line[close_col + 2..]);
        } else if idx == open_idx {
            out.push_str(&line[..open_col]);
        } else if idx == close_idx {
            out.push_str(&line[close_col + 2..]);
        } else if idx > open_idx && idx < close_idx {
            // blanked directive line
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}
