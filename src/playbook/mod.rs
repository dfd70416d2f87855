//! Playbook document: turns completion text into a downloadable PDF.
//!
//! `parse` splits the text into blocks, `layout` positions them on pages and
//! `render` writes the PDF. [`assemble`] runs the three in order and falls
//! back to a plain-text document when the styled one cannot be written.

pub mod layout;
pub mod parse;
pub mod render;
pub mod text;

pub use layout::{Layout, Summary, layout_plain_text, layout_playbook};
pub use parse::{Block, parse_blocks};
pub use render::render_pdf;
pub use text::download_filename;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::RenderError;
use crate::wizard::AnswerRecord;

/// A finished playbook, ready for download.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    /// Completion text exactly as returned.
    pub raw_text: String,
    pub pdf: Vec<u8>,
    pub filename: String,
    pub page_count: usize,
    pub generated_at: DateTime<Utc>,
    /// Set when the styled layout failed and the plain fallback was used.
    pub degraded: bool,
}

/// Build the PDF for `raw_text` and the answers that produced it.
pub fn assemble(
    raw_text: &str,
    answers: &AnswerRecord,
    generated_at: DateTime<Utc>,
) -> Result<GeneratedDocument, RenderError> {
    assemble_with(raw_text, answers, generated_at, render_pdf)
}

fn assemble_with<R>(
    raw_text: &str,
    answers: &AnswerRecord,
    generated_at: DateTime<Utc>,
    render: R,
) -> Result<GeneratedDocument, RenderError>
where
    R: Fn(&Layout, &str) -> Result<Vec<u8>, RenderError>,
{
    let summary = Summary::from_answers(answers);
    let date = generated_at.date_naive();
    let title = format!(
        "{} - {}",
        layout::COVER_TITLE,
        summary.product_name.as_deref().unwrap_or("Untitled Product")
    );

    let blocks = parse_blocks(raw_text);
    let styled = layout_playbook(&blocks, &summary, date);

    let (pdf, page_count, degraded) = match render(&styled, &title) {
        Ok(pdf) => (pdf, styled.page_count(), false),
        Err(e) => {
            warn!(error = %e, "Styled playbook render failed, using plain text");
            let plain = layout_plain_text(raw_text, &summary, date);
            let pdf = render(&plain, &title)?;
            (pdf, plain.page_count(), true)
        }
    };

    Ok(GeneratedDocument {
        raw_text: raw_text.to_string(),
        pdf,
        filename: download_filename(answers.product_name.as_deref()),
        page_count,
        generated_at,
        degraded,
    })
}
