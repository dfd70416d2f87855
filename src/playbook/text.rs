//! Text helpers for the PDF layout: font-safe folding, width estimates,
//! line wrapping and the download filename.

use std::sync::LazyLock;

use regex::Regex;

/// Millimetres per PDF point.
pub const PT_TO_MM: f32 = 0.352_778;

/// Filename used when the product name yields nothing usable.
pub const FALLBACK_FILENAME: &str = "GTM_Playbook.pdf";

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("valid filename regex"));

/// Map text onto what the built-in PDF fonts can encode.
///
/// Typographic punctuation becomes its ASCII equivalent, tabs become spaces,
/// control characters are dropped and anything outside Latin-1 becomes `?`.
pub fn fold_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => out.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2022}' | '\u{25CF}' | '\u{25AA}' | '\u{2023}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{2192}' => out.push_str("->"),
            '\u{00A0}' | '\u{2002}'..='\u{200B}' => out.push(' '),
            '\t' => out.push_str("    "),
            '\n' => out.push('\n'),
            c if c.is_control() => {}
            c if (c as u32) < 0x100 => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Approximate Helvetica advance width of one character, in em.
fn char_em(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | '\'' | '|' | '.' | ',' | ':' | ';' | '!' => 0.28,
        ' ' | 'f' | 't' | 'I' | '(' | ')' | '[' | ']' | '/' | '-' => 0.33,
        'r' => 0.39,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.86,
        c if c.is_ascii_uppercase() => 0.68,
        c if c.is_ascii_digit() => 0.56,
        _ => 0.53,
    }
}

/// Estimated rendered width of `text` at `size_pt`, in millimetres.
pub fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    text.chars().map(char_em).sum::<f32>() * size_pt * PT_TO_MM
}

/// Greedy word wrap to `max_width_mm`. Explicit newlines are kept; words
/// longer than a line are split.
pub fn wrap_text(text: &str, size_pt: f32, max_width_mm: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width_mm(&candidate, size_pt) <= max_width_mm {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            // The word alone may still be too wide
            let mut piece = String::new();
            for c in word.chars() {
                piece.push(c);
                if text_width_mm(&piece, size_pt) > max_width_mm && piece.chars().count() > 1 {
                    piece.pop();
                    lines.push(std::mem::take(&mut piece));
                    piece.push(c);
                }
            }
            current = piece;
        }
        lines.push(current);
    }
    // Keep interior blank lines, drop trailing ones
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Download filename derived from the product name.
pub fn download_filename(product_name: Option<&str>) -> String {
    let stem = product_name
        .map(|name| {
            UNSAFE_FILENAME_CHARS
                .replace_all(name.trim(), "_")
                .trim_matches('_')
                .to_string()
        })
        .unwrap_or_default();
    if stem.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        format!("{stem}_{FALLBACK_FILENAME}")
    }
}
