//! Structural parsing of classified lines into raw part records.
//!
//! The grammar nests exactly two levels deep: top-level sections (`part`,
//! `programmer`, ...) and named subsections inside them (`memory "flash"`).
//! Both levels are closed by an explicit `;` line. Only `part` sections and
//! their `memory` subsections are retained; everything else is walked for
//! structural correctness and then discarded.

use indexmap::IndexMap;

use crate::classify::{ClassifiedLine, LineKind};
use crate::diagnostic::Diagnostics;
use crate::error::{ConvertError, Result};

/// Section name that introduces a device record.
pub const PART_SECTION: &str = "part";

/// Subsection kind that introduces a memory block.
pub const MEMORY_SUBSECTION: &str = "memory";

/// Parameters of one section or memory block, in authored order.
///
/// A repeated key overwrites the earlier value and keeps its position.
pub type Params = IndexMap<String, String>;

/// One `part` section as written in the source, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPart {
    /// Line of the `part` header.
    pub start_line: usize,
    /// Top-level `key = value;` parameters.
    pub params: Params,
    /// Memory blocks keyed by name (`flash`, `eeprom`, ...).
    pub memory: IndexMap<String, Params>,
}

impl RawPart {
    fn new(start_line: usize) -> Self {
        Self {
            start_line,
            ..Self::default()
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn memory_block(&self, name: &str) -> Option<&Params> {
        self.memory.get(name)
    }
}

/// Nesting position of the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Outside,
    InSection {
        name: String,
        line: usize,
    },
    InSubsection {
        section: String,
        section_line: usize,
        kind: String,
        value: String,
        line: usize,
    },
}

/// Line-at-a-time state machine producing [`RawPart`] records.
///
/// Feed lines with [`StructuralParser::feed`] and collect the result with
/// [`StructuralParser::finish`], which fails if a section is still open.
#[derive(Debug)]
pub struct StructuralParser {
    state: State,
    active: Option<RawPart>,
    parts: Vec<RawPart>,
}

impl StructuralParser {
    pub fn new() -> Self {
        Self {
            state: State::Outside,
            active: None,
            parts: Vec::new(),
        }
    }

    /// Consume one classified line.
    ///
    /// A rejected line leaves the parser exactly as it was before the call.
    pub fn feed(&mut self, classified: ClassifiedLine, diags: &mut Diagnostics) -> Result<()> {
        let ClassifiedLine { line, kind } = classified;
        self.state = match (self.state.clone(), kind) {
            (state, LineKind::Blank) => state,

            (state, LineKind::Unrecognized(raw)) => {
                diags.info(line, format!("unrecognized line ignored: {}", raw.trim()));
                state
            }

            (State::Outside, LineKind::SectionHeader(name)) => {
                if name == PART_SECTION {
                    tracing::debug!(line, "part section opened");
                    self.active = Some(RawPart::new(line));
                }
                State::InSection { name, line }
            }

            (State::InSection { name, line: open }, LineKind::SubsectionHeader { kind, value }) => {
                if kind == MEMORY_SUBSECTION {
                    if value.is_empty() {
                        return Err(ConvertError::Grammar {
                            line,
                            detail: "memory block has an empty name".into(),
                        });
                    }
                    if let Some(part) = self.active.as_mut() {
                        part.memory.entry(value.clone()).or_default();
                    }
                }
                State::InSubsection {
                    section: name,
                    section_line: open,
                    kind,
                    value,
                    line,
                }
            }

            (State::InSection { name, line: open }, LineKind::Param { key, value }) => {
                if let Some(part) = self.active.as_mut() {
                    part.params.insert(key, value);
                }
                State::InSection { name, line: open }
            }

            (
                State::InSubsection {
                    section,
                    section_line,
                    kind,
                    value: block,
                    line: open,
                },
                LineKind::Param { key, value },
            ) => {
                if kind == MEMORY_SUBSECTION {
                    if let Some(part) = self.active.as_mut() {
                        part.memory.entry(block.clone()).or_default().insert(key, value);
                    }
                }
                State::InSubsection {
                    section,
                    section_line,
                    kind,
                    value: block,
                    line: open,
                }
            }

            (
                State::InSubsection {
                    section,
                    section_line,
                    ..
                },
                LineKind::SectionEnd,
            ) => State::InSection {
                name: section,
                line: section_line,
            },

            (State::InSection { .. }, LineKind::SectionEnd) => {
                if let Some(part) = self.active.take() {
                    tracing::debug!(line, start_line = part.start_line, "part section closed");
                    self.parts.push(part);
                }
                State::Outside
            }

            (state, kind) => {
                return Err(ConvertError::Grammar {
                    line,
                    detail: unexpected(&state, &kind),
                });
            }
        };
        Ok(())
    }

    /// Finish parsing, returning the parts in source order.
    pub fn finish(self) -> Result<Vec<RawPart>> {
        match self.state {
            State::Outside => Ok(self.parts),
            State::InSection { name, line } => Err(ConvertError::Grammar {
                line,
                detail: format!("section '{name}' is not terminated"),
            }),
            State::InSubsection {
                kind, value, line, ..
            } => Err(ConvertError::Grammar {
                line,
                detail: format!("subsection {kind} \"{value}\" is not terminated"),
            }),
        }
    }
}

impl Default for StructuralParser {
    fn default() -> Self {
        Self::new()
    }
}

fn unexpected(state: &State, kind: &LineKind) -> String {
    let what = match kind {
        LineKind::SectionHeader(name) => format!("section header '{name}'"),
        LineKind::SubsectionHeader { kind, value } => {
            format!("subsection header {kind} \"{value}\"")
        }
        LineKind::Param { key, .. } => format!("parameter '{key}'"),
        LineKind::SectionEnd => "section terminator".to_string(),
        LineKind::Blank | LineKind::Unrecognized(_) => "line".to_string(),
    };
    let context = match state {
        State::Outside => "outside of any section".to_string(),
        State::InSection { name, line } => {
            format!("inside section '{name}' opened at line {line}")
        }
        State::InSubsection {
            kind, value, line, ..
        } => format!("inside subsection {kind} \"{value}\" opened at line {line}"),
    };
    format!("unexpected {what} {context}")
}

/// Run the structural parser over a whole classified line stream.
pub fn parse_parts(
    lines: impl IntoIterator<Item = ClassifiedLine>,
    diags: &mut Diagnostics,
) -> Result<Vec<RawPart>> {
    let mut parser = StructuralParser::new();
    for line in lines {
        parser.feed(line, diags)?;
    }
    parser.finish()
}
