//! Splits completion text into document blocks.
//!
//! Text is split on blank lines into segments. A segment that opens with
//! `# ` is a section title, one that opens with `>` is a highlighted note,
//! `##` lines inside any other segment are subsection titles, and everything
//! else is body text. Anything unrecognised falls through to body text.

use serde::Serialize;

/// One renderable unit of the playbook body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Block {
    Section(String),
    Subsection(String),
    Paragraph(String),
    Note(String),
}

impl Block {
    pub fn text(&self) -> &str {
        match self {
            Self::Section(t) | Self::Subsection(t) | Self::Paragraph(t) | Self::Note(t) => t,
        }
    }
}

/// Parse completion text into blocks, preserving order.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    for segment in segments(text) {
        classify_segment(&segment, &mut blocks);
    }
    blocks
}

/// Non-empty runs of lines separated by blank lines.
fn segments(text: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn classify_segment(lines: &[&str], out: &mut Vec<Block>) {
    let Some(first) = lines.first().map(|l| l.trim_start()) else {
        return;
    };

    if is_section_heading(first) {
        let title = clean_inline(first.trim_start_matches('#').trim());
        // A bare `#` or `# **` has no title to show; the body is still kept
        if !title.is_empty() {
            out.push(Block::Section(title));
        }
        classify_body(&lines[1..], out);
    } else if first.starts_with('>') {
        let note = lines
            .iter()
            .map(|line| strip_quote(line))
            .collect::<Vec<_>>()
            .join("\n");
        let note = clean_inline(note.trim());
        if !note.is_empty() {
            out.push(Block::Note(note));
        }
    } else {
        classify_body(lines, out);
    }
}

/// Body lines: `##` lines become subsection titles, runs of other lines
/// become paragraphs.
fn classify_body(lines: &[&str], out: &mut Vec<Block>) {
    let mut paragraph: Vec<&str> = Vec::new();
    for line in lines {
        let trimmed = line.trim_start();
        if trimmed.starts_with("##") {
            flush_paragraph(&mut paragraph, out);
            let title = clean_inline(trimmed.trim_start_matches('#').trim());
            if !title.is_empty() {
                out.push(Block::Subsection(title));
            }
        } else {
            paragraph.push(*line);
        }
    }
    flush_paragraph(&mut paragraph, out);
}

fn flush_paragraph(paragraph: &mut Vec<&str>, out: &mut Vec<Block>) {
    if paragraph.is_empty() {
        return;
    }
    let text = clean_inline(&paragraph.join("\n"));
    if !text.trim().is_empty() {
        out.push(Block::Paragraph(text));
    }
    paragraph.clear();
}

fn is_section_heading(line: &str) -> bool {
    line == "#" || line.starts_with("# ")
}

fn strip_quote(line: &str) -> &str {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix('>') {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => trimmed,
    }
}

/// Drop inline emphasis markers the PDF cannot show.
fn clean_inline(text: &str) -> String {
    text.replace("**", "").replace("__", "")
}
