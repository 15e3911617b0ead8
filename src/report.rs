/// PDF report rendering.
///
/// Reports are plain text laid out on A4 pages with the PDF built-in
/// Helvetica fonts: a bold title, then one line per input line, wrapped to
/// the page width, continuing onto new pages as needed.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::model::RenderError;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 11.0;
const LINE_HEIGHT_MM: f32 = 6.0;
/// Helvetica at 11pt fits roughly this many characters in 180mm.
const WRAP_COLUMNS: usize = 90;

pub const DEFAULT_TITLE: &str = "Water Quality Analysis Report";

/// Turns report text into document bytes.
pub trait ReportRenderer {
    fn render_report(&self, text: &str) -> Result<Vec<u8>, RenderError>;
}

pub struct PdfRenderer {
    pub title: String,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

fn pdf_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(e.to_string())
}

/// Builtin fonts only cover WinAnsi; anything outside Latin-1 is replaced.
fn printable(line: &str) -> String {
    line.chars()
        .map(|c| if (c as u32) < 0x100 && !c.is_control() { c } else { '?' })
        .collect()
}

/// Greedy word wrap. Words longer than `width` are split.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let word_len = word.chars().count();
        let needed = match current.chars().count() {
            0 => word_len,
            n => n + 1 + word_len,
        };
        if needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

struct PageCursor {
    layer: PdfLayerReference,
    y: f32,
}

impl PageCursor {
    fn new(doc: &PdfDocumentReference) -> Self {
        let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        Self {
            layer: doc.get_page(page).get_layer(layer),
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        }
    }

    fn write(&mut self, doc: &PdfDocumentReference, text: &str, size: f32, font: &IndirectFontRef) {
        if self.y < MARGIN_MM + LINE_HEIGHT_MM {
            *self = PageCursor::new(doc);
        }
        self.y -= LINE_HEIGHT_MM;
        self.layer.use_text(printable(text), size, Mm(MARGIN_MM), Mm(self.y), font);
    }
}

impl ReportRenderer for PdfRenderer {
    fn render_report(&self, text: &str) -> Result<Vec<u8>, RenderError> {
        let (doc, page, layer) =
            PdfDocument::new(self.title.as_str(), Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;

        {
            let mut cursor = PageCursor {
                layer: doc.get_page(page).get_layer(layer),
                y: PAGE_HEIGHT_MM - MARGIN_MM,
            };
            cursor.write(&doc, &self.title, TITLE_SIZE, &bold);
            cursor.y -= LINE_HEIGHT_MM;

            for line in text.lines() {
                for wrapped in wrap_line(line, WRAP_COLUMNS) {
                    cursor.write(&doc, &wrapped, BODY_SIZE, &regular);
                }
            }
        }

        doc.save_to_bytes().map_err(pdf_error)
    }
}

/// Renders `text` with the default title.
pub fn render_report(text: &str) -> Result<Vec<u8>, RenderError> {
    PdfRenderer::default().render_report(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
