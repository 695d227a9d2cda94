//! # PDF Backend
//!
//! [`PdfBackend`] implements [`DrawingBackend`] by emitting PDF content
//! stream operators page by page, then hands the streams to
//! [`writer::PdfWriter`] for file assembly.
//!
//! Layout coordinates are millimetres from the top-left corner. PDF user
//! space is points from the bottom-left, so every operator goes through
//! `x * k` and `(page_height - y) * k` with `k = 72 / 25.4`.

pub mod writer;

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as FmtWrite;

use crate::backend::{Cell, DrawingBackend, FontFlags, ImagePlacement, LineFeed, PageSetup, CELL_MARGIN};
use crate::error::FolioError;
use crate::font::{FontId, FontRegistry, StandardFont};
use crate::image_loader::{decode_image, LoadedImage};
use crate::style::{Align, Rgb};

use self::writer::{encode_winansi, PdfParts, PdfWriter, SCALE};

/// Default stroke width in millimetres.
const DEFAULT_LINE_WIDTH: f64 = 0.2;

#[derive(Debug, Clone)]
struct CurrentFont {
    id: FontId,
    /// Size in points.
    size: f64,
}

/// A PDF document being drawn.
pub struct PdfBackend {
    setup: PageSetup,
    registry: FontRegistry,
    pages: Vec<String>,
    x: f64,
    y: f64,
    font: CurrentFont,
    text_color: Rgb,
    fill_color: Rgb,
    draw_color: Rgb,
    line_width: f64,
    measuring: bool,
    /// Fonts referenced so far, in resource order.
    used_fonts: Vec<FontId>,
    custom_glyphs: BTreeMap<String, BTreeMap<u16, char>>,
    images: Vec<LoadedImage>,
    image_names: HashMap<String, usize>,
}

impl PdfBackend {
    pub fn new(setup: PageSetup) -> Self {
        Self {
            setup,
            registry: FontRegistry::new(),
            pages: Vec::new(),
            x: setup.margins.left,
            y: setup.margins.top,
            font: CurrentFont {
                id: FontId::Standard(StandardFont::Helvetica),
                size: 12.0,
            },
            text_color: Rgb::BLACK,
            fill_color: Rgb::WHITE,
            draw_color: Rgb::BLACK,
            line_width: DEFAULT_LINE_WIDTH,
            measuring: false,
            used_fonts: Vec::new(),
            custom_glyphs: BTreeMap::new(),
            images: Vec::new(),
            image_names: HashMap::new(),
        }
    }

    /// Number of pages started so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Font size in millimetres.
    fn font_size_mm(&self) -> f64 {
        self.font.size / SCALE
    }

    fn font_resource(&mut self) -> usize {
        match self.used_fonts.iter().position(|f| *f == self.font.id) {
            Some(i) => i,
            None => {
                self.used_fonts.push(self.font.id.clone());
                self.used_fonts.len() - 1
            }
        }
    }

    /// Encode `text` for a `Tj` operator in the current font.
    fn encode_text(&mut self, text: &str) -> String {
        match &self.font.id {
            FontId::Standard(_) => format!("({})", encode_winansi(text)),
            FontId::Custom(key) => {
                let Some(font) = self.registry.custom(key) else {
                    return format!("({})", encode_winansi(text));
                };
                let used = self.custom_glyphs.entry(key.clone()).or_default();
                let mut hex = String::from("<");
                for ch in text.chars() {
                    let gid = font.metrics.glyph_ids.get(&ch).copied().unwrap_or(0);
                    if gid != 0 {
                        used.insert(gid, ch);
                    }
                    let _ = write!(hex, "{:04X}", gid);
                }
                hex.push('>');
                hex
            }
        }
    }

    fn page(&mut self) -> &mut String {
        if self.pages.is_empty() {
            self.pages.push(String::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn pdf_y(&self, y: f64) -> f64 {
        (self.setup.height - y) * SCALE
    }

    fn draw_cell(&mut self, x: f64, y: f64, width: f64, cell: &Cell<'_>) {
        let k = SCALE;
        let mut ops = String::new();

        if cell.fill || cell.border.is_full() {
            let op = match (cell.fill, cell.border.is_full()) {
                (true, true) => "B",
                (true, false) => "f",
                _ => "S",
            };
            let (fr, fg, fb) = self.fill_color.to_unit();
            let (dr, dg, db) = self.draw_color.to_unit();
            let _ = write!(
                ops,
                "q {:.3} {:.3} {:.3} rg {:.3} {:.3} {:.3} RG {:.2} w \
                 {:.2} {:.2} {:.2} {:.2} re {} Q\n",
                fr,
                fg,
                fb,
                dr,
                dg,
                db,
                self.line_width * k,
                x * k,
                self.pdf_y(y),
                width * k,
                -cell.height * k,
                op
            );
        }

        if !cell.border.is_none() && !cell.border.is_full() {
            let (dr, dg, db) = self.draw_color.to_unit();
            let _ = write!(
                ops,
                "q {:.3} {:.3} {:.3} RG {:.2} w\n",
                dr,
                dg,
                db,
                self.line_width * k
            );
            let (left, right) = (x * k, (x + width) * k);
            let (top, bottom) = (self.pdf_y(y), self.pdf_y(y + cell.height));
            let b = cell.border;
            if b.left {
                let _ = write!(ops, "{:.2} {:.2} m {:.2} {:.2} l S\n", left, top, left, bottom);
            }
            if b.top {
                let _ = write!(ops, "{:.2} {:.2} m {:.2} {:.2} l S\n", left, top, right, top);
            }
            if b.right {
                let _ = write!(ops, "{:.2} {:.2} m {:.2} {:.2} l S\n", right, top, right, bottom);
            }
            if b.bottom {
                let _ = write!(ops, "{:.2} {:.2} m {:.2} {:.2} l S\n", left, bottom, right, bottom);
            }
            ops.push_str("Q\n");
        }

        if !cell.text.is_empty() {
            let text_width = self.text_width(cell.text);
            let dx = match cell.align {
                Align::Left => CELL_MARGIN,
                Align::Center => (width - text_width) / 2.0,
                Align::Right => width - CELL_MARGIN - text_width,
            };
            let baseline = y + 0.5 * cell.height + 0.3 * self.font_size_mm();
            let resource = self.font_resource();
            let encoded = self.encode_text(cell.text);
            let (r, g, b) = self.text_color.to_unit();
            let _ = write!(
                ops,
                "q {:.3} {:.3} {:.3} rg BT /F{} {:.2} Tf {:.2} {:.2} Td {} Tj ET Q\n",
                r,
                g,
                b,
                resource,
                self.font.size,
                (x + dx) * k,
                self.pdf_y(baseline),
                encoded
            );
        }

        if !ops.is_empty() {
            self.page().push_str(&ops);
        }
    }
}

impl DrawingBackend for PdfBackend {
    fn add_page(&mut self) {
        self.pages.push(String::new());
        self.x = self.setup.margins.left;
        self.y = self.setup.margins.top;
    }

    fn register_font(&mut self, family: &str, data: Vec<u8>) -> Result<(), FolioError> {
        self.registry.register(family, data)
    }

    fn set_font(&mut self, family: &str, flags: FontFlags, size: f64) {
        self.font = CurrentFont {
            id: self.registry.resolve(family, flags),
            size,
        };
    }

    fn set_text_color(&mut self, color: Rgb) {
        self.text_color = color;
    }

    fn set_fill_color(&mut self, color: Rgb) {
        self.fill_color = color;
    }

    fn set_draw_color(&mut self, color: Rgb) {
        self.draw_color = color;
    }

    fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
    }

    fn text_width(&self, text: &str) -> f64 {
        self.registry.measure(&self.font.id, text, self.font_size_mm())
    }

    fn cell(&mut self, cell: Cell<'_>) {
        if !self.measuring && self.y + cell.height > self.setup.break_trigger() {
            let x = self.x;
            self.add_page();
            self.x = x;
        }
        let width = if cell.width <= 0.0 {
            self.setup.width - self.setup.margins.right - self.x
        } else {
            cell.width
        };

        if !self.measuring {
            self.draw_cell(self.x, self.y, width, &cell);
        }

        match cell.feed {
            LineFeed::Right => self.x += width,
            LineFeed::NextLine => {
                self.x = self.setup.margins.left;
                self.y += cell.height;
            }
            LineFeed::Below => self.y += cell.height,
        }
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        if self.measuring {
            return;
        }
        let k = SCALE;
        let (r, g, b) = self.draw_color.to_unit();
        let ops = format!(
            "q {:.3} {:.3} {:.3} RG {:.2} w {:.2} {:.2} m {:.2} {:.2} l S Q\n",
            r,
            g,
            b,
            self.line_width * k,
            x1 * k,
            self.pdf_y(y1),
            x2 * k,
            self.pdf_y(y2)
        );
        self.page().push_str(&ops);
    }

    fn image(&mut self, image: ImagePlacement<'_>) -> Result<(), FolioError> {
        if self.measuring {
            return Ok(());
        }
        let index = match self.image_names.get(image.name) {
            Some(&i) => i,
            None => {
                let loaded = decode_image(image.kind, image.data)?;
                self.images.push(loaded);
                let i = self.images.len() - 1;
                self.image_names.insert(image.name.to_string(), i);
                i
            }
        };
        let height = if image.height > 0.0 {
            image.height
        } else {
            self.images[index].height_for_width(image.width)
        };
        let k = SCALE;
        let ops = format!(
            "q {:.4} 0 0 {:.4} {:.2} {:.2} cm /Im{} Do Q\n",
            image.width * k,
            height * k,
            image.x * k,
            self.pdf_y(image.y + height),
            index
        );
        self.page().push_str(&ops);
        Ok(())
    }

    fn cursor(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    fn set_cursor(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    fn set_x(&mut self, x: f64) {
        self.x = x;
    }

    fn line_break(&mut self, height: f64) {
        self.x = self.setup.margins.left;
        self.y += height;
    }

    fn page_setup(&self) -> PageSetup {
        self.setup
    }

    fn set_measuring(&mut self, measuring: bool) {
        self.measuring = measuring;
    }

    fn finish(mut self) -> Result<Vec<u8>, FolioError> {
        if self.pages.is_empty() {
            self.add_page();
        }
        log::debug!(
            "writing {} page(s), {} font(s), {} image(s)",
            self.pages.len(),
            self.used_fonts.len(),
            self.images.len()
        );
        PdfWriter::write(&PdfParts {
            page_size: (self.setup.width * SCALE, self.setup.height * SCALE),
            pages: &self.pages,
            fonts: &self.used_fonts,
            registry: &self.registry,
            custom_glyphs: &self.custom_glyphs,
            images: &self.images,
        })
    }
}
