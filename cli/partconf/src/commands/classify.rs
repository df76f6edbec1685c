//! `partconf classify` — dump the classified line stream.

use std::path::Path;

use anyhow::{Context, Result};
use partconf_core::{classify_source, ClassifiedLine, LineKind};

pub fn run(input: &Path, tab_width: usize, all: bool) -> Result<()> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    for line in visible(classify_source(&source, tab_width), all) {
        println!("{:>6}  {}", line.line, line.kind);
    }
    Ok(())
}

fn visible(lines: Vec<ClassifiedLine>, all: bool) -> impl Iterator<Item = ClassifiedLine> {
    lines
        .into_iter()
        .filter(move |l| all || l.kind != LineKind::Blank)
}
