//! Physical line classification.
//!
//! Each line of the description file is categorized on its own, from its
//! text and indentation alone. The structural parser then only has to match
//! on [`LineKind`] instead of re-inspecting raw text.

use std::borrow::Cow;
use std::fmt;

/// Indentation of a subsection header, and the minimum for a parameter.
const BLOCK_INDENT: usize = 4;

/// The syntactic category of one physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Empty, whitespace-only, or a `#` comment.
    Blank,
    /// Unindented line starting with a letter, e.g. `part`.
    SectionHeader(String),
    /// Four-space indented `kind "value"`, e.g. `memory "flash"`.
    SubsectionHeader { kind: String, value: String },
    /// `key = value;` or `key = "value";`.
    Param { key: String, value: String },
    /// A lone `;`.
    SectionEnd,
    /// Anything else, kept verbatim for diagnostics.
    Unrecognized(String),
}

/// A classified line together with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub line: usize,
    pub kind: LineKind,
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineKind::Blank => write!(f, "blank"),
            LineKind::SectionHeader(name) => write!(f, "section {name}"),
            LineKind::SubsectionHeader { kind, value } => {
                write!(f, "subsection {kind} \"{value}\"")
            }
            LineKind::Param { key, value } => write!(f, "param {key} = {value}"),
            LineKind::SectionEnd => write!(f, "end"),
            LineKind::Unrecognized(raw) => write!(f, "unrecognized {}", raw.trim()),
        }
    }
}

/// Expand tab characters to spaces, with tab stops every `width` columns.
///
/// Lines without tabs are returned unchanged without allocating.
pub fn expand_tabs(line: &str, width: usize) -> Cow<'_, str> {
    if !line.contains('\t') {
        return Cow::Borrowed(line);
    }
    let width = width.max(1);
    let mut out = String::with_capacity(line.len() + width);
    let mut column = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let pad = width - column % width;
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    Cow::Owned(out)
}

/// Classify a single line. Tabs must already be expanded.
pub fn classify_line(line: &str) -> LineKind {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return LineKind::Blank;
    }

    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent == 0 && line.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return LineKind::SectionHeader(trimmed.to_string());
    }

    let body = &line[indent..];
    if indent == BLOCK_INDENT {
        if let Some((kind, value)) = match_subsection(body) {
            return LineKind::SubsectionHeader {
                kind: kind.to_string(),
                value: value.to_string(),
            };
        }
    }
    if indent >= BLOCK_INDENT {
        if let Some((key, value)) = match_param(body) {
            return LineKind::Param {
                key: key.to_string(),
                value: value.to_string(),
            };
        }
    }

    if trimmed == ";" {
        return LineKind::SectionEnd;
    }
    LineKind::Unrecognized(line.to_string())
}

/// Expand tabs and classify every line of `source`, numbering from 1.
pub fn classify_source(source: &str, tab_width: usize) -> Vec<ClassifiedLine> {
    source
        .lines()
        .enumerate()
        .map(|(index, raw)| ClassifiedLine {
            line: index + 1,
            kind: classify_line(&expand_tabs(raw, tab_width)),
        })
        .collect()
}

/// Split off a leading identifier made of characters accepted by `is_ident`.
fn split_ident(text: &str, is_ident: impl Fn(char) -> bool) -> Option<(&str, &str)> {
    let len = text.find(|c: char| !is_ident(c)).unwrap_or(text.len());
    if len == 0 {
        return None;
    }
    Some(text.split_at(len))
}

/// `name "value"` with at least one space between, nothing after the quote.
fn match_subsection(body: &str) -> Option<(&str, &str)> {
    let (name, rest) = split_ident(body, |c| c.is_ascii_alphanumeric())?;
    let quoted = rest.trim_start();
    if quoted.len() == rest.len() {
        return None;
    }
    let inner = quoted.strip_prefix('"')?;
    let close = inner.find('"')?;
    if !inner[close + 1..].trim().is_empty() {
        return None;
    }
    Some((name, &inner[..close]))
}

/// `key = "value";` or `key = value;`, returning the trimmed value.
fn match_param(body: &str) -> Option<(&str, &str)> {
    let (key, rest) = split_ident(body, |c| c.is_ascii_alphanumeric() || c == '_')?;
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();

    if let Some(inner) = rest.strip_prefix('"') {
        if let Some(close) = inner.find('"') {
            if inner[close + 1..].trim() == ";" {
                return Some((key, inner[..close].trim()));
            }
        }
    }

    let semi = rest.find(';')?;
    if !rest[semi + 1..].trim().is_empty() {
        return None;
    }
    Some((key, rest[..semi].trim()))
}
