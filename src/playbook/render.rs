//! PDF serialization of a laid-out document.

use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect,
};

use super::layout::{DrawOp, FontStyle, Layout, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, Page, Rgb};
use crate::error::RenderError;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

fn backend(e: impl std::fmt::Display) -> RenderError {
    RenderError::Backend(e.to_string())
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(rgb.0, rgb.1, rgb.2, None))
}

/// Serialize `layout` as PDF bytes, one PDF page per layout page.
pub fn render_pdf(layout: &Layout, title: &str) -> Result<Vec<u8>, RenderError> {
    if layout.pages.is_empty() {
        return Err(RenderError::EmptyLayout);
    }

    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(backend)?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(backend)?,
        italic: doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(backend)?,
    };

    let mut layers = vec![doc.get_page(first_page).get_layer(first_layer)];
    for _ in 1..layout.pages.len() {
        let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        layers.push(doc.get_page(page).get_layer(layer));
    }

    for (page, layer) in layout.pages.iter().zip(&layers) {
        draw_page(layer, page, &fonts);
    }

    doc.save_to_bytes().map_err(backend)
}

fn draw_page(layer: &PdfLayerReference, page: &Page, fonts: &Fonts) {
    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                size,
                style,
                color: rgb,
                text,
            } => {
                layer.set_fill_color(color(*rgb));
                layer.use_text(text.as_str(), *size, Mm(*x), Mm(*y), fonts.get(*style));
            }
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                fill,
                stroke,
            } => {
                let mode = match (fill, stroke) {
                    (Some(_), Some(_)) => PaintMode::FillStroke,
                    (Some(_), None) => PaintMode::Fill,
                    (None, Some(_)) => PaintMode::Stroke,
                    (None, None) => continue,
                };
                if let Some(rgb) = fill {
                    layer.set_fill_color(color(*rgb));
                }
                if let Some((rgb, thickness)) = stroke {
                    layer.set_outline_color(color(*rgb));
                    layer.set_outline_thickness(*thickness);
                }
                let rect = Rect::new(Mm(*x), Mm(*y), Mm(x + width), Mm(y + height)).with_mode(mode);
                layer.add_rect(rect);
            }
            DrawOp::Line {
                from,
                to,
                color: rgb,
                thickness,
            } => {
                layer.set_outline_color(color(*rgb));
                layer.set_outline_thickness(*thickness);
                layer.add_line(Line {
                    points: vec![
                        (Point::new(Mm(from.0), Mm(from.1)), false),
                        (Point::new(Mm(to.0), Mm(to.1)), false),
                    ],
                    is_closed: false,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playbook::layout::{Summary, layout_playbook, layout_plain_text};
    use crate::wizard::AnswerRecord;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    #[test]
    fn renders_pdf_bytes() {
        let layout = layout_playbook(&[], &Summary::from_answers(&AnswerRecord::default()), date());
        let pdf = render_pdf(&layout, "Go-To-Market Playbook").unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn renders_plain_layout() {
        let layout = layout_plain_text(
            "# Heading\n\nbody",
            &Summary::from_answers(&AnswerRecord::default()),
            date(),
        );
        let pdf = render_pdf(&layout, "plain").unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_layout_is_an_error() {
        let err = render_pdf(&Layout { pages: Vec::new() }, "empty").unwrap_err();
        assert!(matches!(err, RenderError::EmptyLayout));
    }
}
