//! Page layout: turns parsed blocks into positioned drawing operations.
//!
//! Layout is kept separate from PDF serialization so it can be inspected
//! directly. All coordinates are millimetres from the bottom-left corner of
//! an A4 portrait page; text `y` is the baseline.

use chrono::NaiveDate;

use super::parse::Block;
use super::text::{PT_TO_MM, fold_text, text_width_mm, wrap_text};
use crate::wizard::{AnswerRecord, Field, PLACEHOLDER};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 20.0;
const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
const FOOTER_Y_MM: f32 = 10.0;
const MAX_COVER_PRODUCT_LINES: usize = 3;
/// Three rows of this many lines still fit the overview page.
const MAX_SUMMARY_VALUE_LINES: usize = 10;
const ELLIPSIS: &str = "...";

/// Title printed on the cover page.
pub const COVER_TITLE: &str = "Go-To-Market Playbook";
const UNTITLED_PRODUCT: &str = "Untitled Product";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

const NAVY: Rgb = Rgb(0.10, 0.23, 0.45);
const BLUE: Rgb = Rgb(0.16, 0.40, 0.62);
const ACCENT: Rgb = Rgb(0.20, 0.45, 0.80);
const INK: Rgb = Rgb(0.15, 0.15, 0.15);
const MUTED: Rgb = Rgb(0.45, 0.45, 0.45);
const NOTE_FILL: Rgb = Rgb(0.93, 0.96, 1.0);
const BOX_FILL: Rgb = Rgb(0.96, 0.97, 0.98);
const RULE: Rgb = Rgb(0.75, 0.80, 0.88);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

/// A single drawing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        style: FontStyle,
        color: Rgb,
        text: String,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: Option<(Rgb, f32)>,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb,
        thickness: f32,
    },
}

/// What a page is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Cover,
    Overview,
    Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub kind: PageKind,
    pub ops: Vec<DrawOp>,
}

impl Page {
    fn new(kind: PageKind) -> Self {
        Self {
            kind,
            ops: Vec::new(),
        }
    }

    /// Every text run on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Text runs drawn with the given size and style.
    pub fn texts_styled(&self, size: f32, style: FontStyle) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text {
                    text,
                    size: s,
                    style: st,
                    ..
                } if *s == size && *st == style => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// A laid-out document.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub pages: Vec<Page>,
}

impl Layout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Whether any page draws exactly this text run.
    pub fn contains_text(&self, needle: &str) -> bool {
        self.pages.iter().any(|p| p.texts().any(|t| t == needle))
    }
}

/// Sizes used for each block type, exposed so callers can find them.
pub mod sizes {
    pub const COVER_TITLE: f32 = 30.0;
    pub const COVER_PRODUCT: f32 = 22.0;
    pub const PAGE_HEADING: f32 = 20.0;
    pub const SECTION: f32 = 18.0;
    pub const SUBSECTION: f32 = 13.0;
    pub const BODY: f32 = 11.0;
    pub const NOTE: f32 = 11.0;
    pub const SMALL: f32 = 9.0;
}

/// The three answers shown in the overview summary box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub product_name: Option<String>,
    pub product_type: String,
    pub target_audience: String,
}

impl Summary {
    pub fn from_answers(answers: &AnswerRecord) -> Self {
        Self {
            product_name: answers.value(Field::ProductName),
            product_type: answers.value_or_placeholder(Field::ProductType),
            target_audience: answers.value_or_placeholder(Field::TargetAudience),
        }
    }

    fn rows(&self) -> [(&'static str, String); 3] {
        [
            (
                Field::ProductName.label(),
                self.product_name
                    .clone()
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
            ),
            (Field::ProductType.label(), self.product_type.clone()),
            (Field::TargetAudience.label(), self.target_audience.clone()),
        ]
    }
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.45
}

fn text_op(x: f32, y: f32, size: f32, style: FontStyle, color: Rgb, text: &str) -> DrawOp {
    DrawOp::Text {
        x,
        y,
        size,
        style,
        color,
        text: fold_text(text),
    }
}

/// Lay out the full playbook: cover, overview, then the body blocks.
pub fn layout_playbook(blocks: &[Block], summary: &Summary, generated_on: NaiveDate) -> Layout {
    let mut pages = vec![cover_page(summary, generated_on), overview_page(summary)];

    let mut body = BodyWriter::new();
    for block in blocks {
        match block {
            Block::Section(title) => body.section(title),
            Block::Subsection(title) => body.subsection(title),
            Block::Paragraph(text) => body.paragraph(text),
            Block::Note(text) => body.note(text),
        }
    }
    pages.extend(body.finish());

    Layout { pages }
}

/// Plain layout of the raw response: a title line and wrapped text, no
/// shapes and a single font. Used when the styled document cannot be built.
pub fn layout_plain_text(raw_text: &str, summary: &Summary, generated_on: NaiveDate) -> Layout {
    let mut body = BodyWriter::new();
    let heading = format!(
        "{COVER_TITLE}: {} ({})",
        summary.product_name.as_deref().unwrap_or(UNTITLED_PRODUCT),
        generated_on.format("%Y-%m-%d")
    );
    body.plain_lines(&heading);
    body.plain_lines("");
    body.plain_lines(raw_text);
    let mut pages = body.finish();
    if pages.is_empty() {
        pages.push(Page::new(PageKind::Body));
    }
    Layout { pages }
}

/// Wrap `text` and keep at most `max_lines`, ending a cut value with an
/// ellipsis that still fits the width.
fn wrap_capped(text: &str, size: f32, max_width: f32, max_lines: usize) -> Vec<String> {
    let mut lines = wrap_text(text, size, max_width);
    if lines.len() <= max_lines {
        return lines;
    }
    lines.truncate(max_lines);
    if let Some(last) = lines.last_mut() {
        let mut kept = last.trim_end().to_string();
        while !kept.is_empty() && text_width_mm(&format!("{kept}{ELLIPSIS}"), size) > max_width {
            kept.pop();
        }
        *last = format!("{}{ELLIPSIS}", kept.trim_end());
    }
    lines
}

fn centered(y: f32, size: f32, style: FontStyle, color: Rgb, text: &str) -> DrawOp {
    let folded = fold_text(text);
    let width = text_width_mm(&folded, size);
    let x = ((PAGE_WIDTH_MM - width) / 2.0).max(MARGIN_MM);
    DrawOp::Text {
        x,
        y,
        size,
        style,
        color,
        text: folded,
    }
}

fn cover_page(summary: &Summary, generated_on: NaiveDate) -> Page {
    let mut page = Page::new(PageKind::Cover);

    // Double border
    page.ops.push(DrawOp::Rect {
        x: 10.0,
        y: 10.0,
        width: PAGE_WIDTH_MM - 20.0,
        height: PAGE_HEIGHT_MM - 20.0,
        fill: None,
        stroke: Some((NAVY, 2.0)),
    });
    page.ops.push(DrawOp::Rect {
        x: 14.0,
        y: 14.0,
        width: PAGE_WIDTH_MM - 28.0,
        height: PAGE_HEIGHT_MM - 28.0,
        fill: None,
        stroke: Some((ACCENT, 0.5)),
    });

    let mut y = 200.0;
    page.ops.push(centered(
        y,
        sizes::COVER_TITLE,
        FontStyle::Bold,
        NAVY,
        COVER_TITLE,
    ));
    y -= 10.0;
    page.ops.push(DrawOp::Line {
        from: (55.0, y),
        to: (PAGE_WIDTH_MM - 55.0, y),
        color: ACCENT,
        thickness: 1.0,
    });

    y -= 16.0;
    let product = summary
        .product_name
        .as_deref()
        .unwrap_or(UNTITLED_PRODUCT);
    let product_lines = wrap_capped(
        product,
        sizes::COVER_PRODUCT,
        CONTENT_WIDTH_MM,
        MAX_COVER_PRODUCT_LINES,
    );
    for line in product_lines {
        page.ops.push(centered(y, sizes::COVER_PRODUCT, FontStyle::Bold, BLUE, &line));
        y -= line_height(sizes::COVER_PRODUCT);
    }

    y -= 8.0;
    let generated = format!("Generated on {}", generated_on.format("%B %-d, %Y"));
    page.ops.push(centered(y, 12.0, FontStyle::Regular, MUTED, &generated));

    page
}

fn overview_page(summary: &Summary) -> Page {
    let mut page = Page::new(PageKind::Overview);
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM - 8.0;

    page.ops.push(text_op(
        MARGIN_MM,
        y,
        sizes::PAGE_HEADING,
        FontStyle::Bold,
        NAVY,
        "Product Overview",
    ));
    y -= 5.0;
    page.ops.push(DrawOp::Line {
        from: (MARGIN_MM, y),
        to: (PAGE_WIDTH_MM - MARGIN_MM, y),
        color: RULE,
        thickness: 0.8,
    });
    y -= 8.0;

    // Summary box: label column + value column, rows grow with wrapped values
    let label_width = 55.0;
    let value_width = CONTENT_WIDTH_MM - label_width - 8.0;
    let padding = 4.0;
    let lh = line_height(sizes::BODY);

    let rows: Vec<(&str, Vec<String>)> = summary
        .rows()
        .into_iter()
        .map(|(label, value)| {
            let lines = wrap_capped(&value, sizes::BODY, value_width, MAX_SUMMARY_VALUE_LINES);
            (label, lines)
        })
        .collect();
    let row_heights: Vec<f32> = rows
        .iter()
        .map(|(_, lines)| lines.len().max(1) as f32 * lh + 2.0 * padding)
        .collect();
    let box_height: f32 = row_heights.iter().sum();
    let box_top = y;

    page.ops.push(DrawOp::Rect {
        x: MARGIN_MM,
        y: box_top - box_height,
        width: CONTENT_WIDTH_MM,
        height: box_height,
        fill: Some(BOX_FILL),
        stroke: Some((RULE, 0.6)),
    });

    let mut row_top = box_top;
    for (i, ((label, lines), height)) in rows.iter().zip(&row_heights).enumerate() {
        let baseline = row_top - padding - sizes::BODY * PT_TO_MM;
        page.ops.push(text_op(
            MARGIN_MM + padding,
            baseline,
            sizes::BODY,
            FontStyle::Bold,
            NAVY,
            label,
        ));
        for (n, line) in lines.iter().enumerate() {
            page.ops.push(text_op(
                MARGIN_MM + label_width,
                baseline - n as f32 * lh,
                sizes::BODY,
                FontStyle::Regular,
                INK,
                line,
            ));
        }
        row_top -= height;
        if i + 1 < rows.len() {
            page.ops.push(DrawOp::Line {
                from: (MARGIN_MM, row_top),
                to: (PAGE_WIDTH_MM - MARGIN_MM, row_top),
                color: RULE,
                thickness: 0.4,
            });
        }
    }

    page
}

/// Flows body blocks down the page, starting new pages as needed.
struct BodyWriter {
    pages: Vec<Page>,
    current: Option<Page>,
    y: f32,
}

impl BodyWriter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: None,
            y: 0.0,
        }
    }

    fn top() -> f32 {
        PAGE_HEIGHT_MM - MARGIN_MM
    }

    fn bottom() -> f32 {
        MARGIN_MM
    }

    fn page(&mut self) -> &mut Page {
        if self.current.is_none() {
            self.current = Some(Page::new(PageKind::Body));
            self.y = Self::top();
        }
        self.current.get_or_insert_with(|| Page::new(PageKind::Body))
    }

    fn new_page(&mut self) {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        self.current = Some(Page::new(PageKind::Body));
        self.y = Self::top();
    }

    /// Make sure `height` fits below the cursor, breaking the page if not.
    fn reserve(&mut self, height: f32) {
        self.page();
        let at_top = (self.y - Self::top()).abs() < f32::EPSILON;
        if self.y - height < Self::bottom() && !at_top {
            self.new_page();
        }
    }

    fn gap(&mut self, space: f32) {
        self.page();
        let at_top = (self.y - Self::top()).abs() < f32::EPSILON;
        if !at_top {
            self.y -= space;
        }
    }

    fn push(&mut self, op: DrawOp) {
        self.page().ops.push(op);
    }

    fn section(&mut self, title: &str) {
        let lines = wrap_text(title, sizes::SECTION, CONTENT_WIDTH_MM);
        let lh = line_height(sizes::SECTION);
        self.gap(8.0);
        // Keep the title with at least a few lines of what follows
        self.reserve(lines.len() as f32 * lh + 4.0 + 3.0 * line_height(sizes::BODY));
        for line in &lines {
            self.y -= sizes::SECTION * PT_TO_MM;
            let y = self.y;
            self.push(text_op(MARGIN_MM, y, sizes::SECTION, FontStyle::Bold, NAVY, line));
            self.y -= lh - sizes::SECTION * PT_TO_MM;
        }
        self.y -= 1.0;
        let y = self.y;
        self.push(DrawOp::Line {
            from: (MARGIN_MM, y),
            to: (PAGE_WIDTH_MM - MARGIN_MM, y),
            color: RULE,
            thickness: 0.8,
        });
        self.y -= 4.0;
    }

    fn subsection(&mut self, title: &str) {
        let lines = wrap_text(title, sizes::SUBSECTION, CONTENT_WIDTH_MM);
        let lh = line_height(sizes::SUBSECTION);
        self.gap(4.0);
        self.reserve(lines.len() as f32 * lh + 2.0 * line_height(sizes::BODY));
        for line in &lines {
            self.y -= sizes::SUBSECTION * PT_TO_MM;
            let y = self.y;
            self.push(text_op(
                MARGIN_MM,
                y,
                sizes::SUBSECTION,
                FontStyle::Bold,
                BLUE,
                line,
            ));
            self.y -= lh - sizes::SUBSECTION * PT_TO_MM;
        }
        self.y -= 1.5;
    }

    fn paragraph(&mut self, text: &str) {
        let lh = line_height(sizes::BODY);
        for line in wrap_text(text, sizes::BODY, CONTENT_WIDTH_MM) {
            self.reserve(lh);
            self.y -= sizes::BODY * PT_TO_MM;
            let y = self.y;
            if !line.is_empty() {
                self.push(text_op(MARGIN_MM, y, sizes::BODY, FontStyle::Regular, INK, &line));
            }
            self.y -= lh - sizes::BODY * PT_TO_MM;
        }
        self.y -= 3.0;
    }

    fn note(&mut self, text: &str) {
        let padding = 4.0;
        let bar = 1.5;
        let lh = line_height(sizes::NOTE);
        let inner_width = CONTENT_WIDTH_MM - 2.0 * padding - bar - 2.0;
        let lines = wrap_text(text, sizes::NOTE, inner_width);
        if lines.is_empty() {
            return;
        }

        self.gap(2.0);
        let mut remaining = lines.as_slice();
        while !remaining.is_empty() {
            // A note taller than the rest of the page is continued on the next
            self.reserve(lh + 2.0 * padding);
            let available = self.y - Self::bottom() - 2.0 * padding;
            let fit = ((available / lh).floor() as usize).clamp(1, remaining.len());
            let (chunk, rest) = remaining.split_at(fit);

            let height = chunk.len() as f32 * lh + 2.0 * padding;
            let top = self.y;
            self.push(DrawOp::Rect {
                x: MARGIN_MM,
                y: top - height,
                width: CONTENT_WIDTH_MM,
                height,
                fill: Some(NOTE_FILL),
                stroke: None,
            });
            self.push(DrawOp::Rect {
                x: MARGIN_MM,
                y: top - height,
                width: bar,
                height,
                fill: Some(ACCENT),
                stroke: None,
            });

            let mut baseline = top - padding - sizes::NOTE * PT_TO_MM;
            for line in chunk {
                self.push(text_op(
                    MARGIN_MM + bar + padding + 2.0,
                    baseline,
                    sizes::NOTE,
                    FontStyle::Italic,
                    NAVY,
                    line,
                ));
                baseline -= lh;
            }
            self.y = top - height;
            remaining = rest;
            if !remaining.is_empty() {
                self.new_page();
            }
        }
        self.y -= 4.0;
    }

    fn plain_lines(&mut self, text: &str) {
        let lh = line_height(sizes::BODY);
        let lines = wrap_text(text, sizes::BODY, CONTENT_WIDTH_MM);
        if lines.is_empty() {
            self.reserve(lh);
            self.y -= lh;
            return;
        }
        for line in lines {
            self.reserve(lh);
            self.y -= sizes::BODY * PT_TO_MM;
            let y = self.y;
            if !line.is_empty() {
                self.push(text_op(MARGIN_MM, y, sizes::BODY, FontStyle::Regular, INK, &line));
            }
            self.y -= lh - sizes::BODY * PT_TO_MM;
        }
    }

    /// Close the last page and number the body pages.
    fn finish(mut self) -> Vec<Page> {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        let total = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            let label = format!("Page {} of {}", i + 1, total);
            page.ops.push(centered(
                FOOTER_Y_MM,
                sizes::SMALL,
                FontStyle::Regular,
                MUTED,
                &label,
            ));
        }
        self.pages
    }
}
