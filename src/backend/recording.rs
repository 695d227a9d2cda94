//! A backend that records calls instead of drawing.
//!
//! Cursor movement, line feeds, automatic page breaks and measurement mode
//! behave like the PDF backend, so layout geometry can be asserted
//! directly. Text is measured at a fixed advance of half the font size
//! per character.

use crate::backend::{
    Border, Cell, DrawingBackend, FontFlags, ImageKind, ImagePlacement, LineFeed, PageSetup,
};
use crate::error::FolioError;
use crate::style::{Align, Rgb};

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AddPage,
    RegisterFont {
        family: String,
    },
    SetFont {
        family: String,
        flags: FontFlags,
        size: f64,
    },
    TextColor(Rgb),
    FillColor(Rgb),
    DrawColor(Rgb),
    LineWidth(f64),
    Cell {
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        text: String,
        border: Border,
        align: Align,
        fill: bool,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    Image {
        name: String,
        kind: ImageKind,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

/// Records every call made by layout.
#[derive(Debug)]
pub struct RecordingBackend {
    setup: PageSetup,
    calls: Vec<Call>,
    pages: usize,
    x: f64,
    y: f64,
    font_size: f64,
    measuring: bool,
}

impl RecordingBackend {
    pub fn new(setup: PageSetup) -> Self {
        Self {
            setup,
            calls: Vec::new(),
            pages: 0,
            x: setup.margins.left,
            y: setup.margins.top,
            font_size: 12.0,
            measuring: false,
        }
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Only the cells, in drawing order.
    pub fn cells(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Cell { .. }))
            .collect()
    }

    /// The text of every drawn cell.
    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Cell { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DrawingBackend for RecordingBackend {
    fn add_page(&mut self) {
        self.pages += 1;
        self.x = self.setup.margins.left;
        self.y = self.setup.margins.top;
        self.calls.push(Call::AddPage);
    }

    fn register_font(&mut self, family: &str, _data: Vec<u8>) -> Result<(), FolioError> {
        self.calls.push(Call::RegisterFont {
            family: family.to_string(),
        });
        Ok(())
    }

    fn set_font(&mut self, family: &str, flags: FontFlags, size: f64) {
        self.font_size = size;
        self.calls.push(Call::SetFont {
            family: family.to_string(),
            flags,
            size,
        });
    }

    fn set_text_color(&mut self, color: Rgb) {
        self.calls.push(Call::TextColor(color));
    }

    fn set_fill_color(&mut self, color: Rgb) {
        self.calls.push(Call::FillColor(color));
    }

    fn set_draw_color(&mut self, color: Rgb) {
        self.calls.push(Call::DrawColor(color));
    }

    fn set_line_width(&mut self, width: f64) {
        self.calls.push(Call::LineWidth(width));
    }

    fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.font_size * 0.5 * 25.4 / 72.0
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
            self.calls.push(Call::Cell {
                page: self.pages,
                x: self.x,
                y: self.y,
                width,
                height: cell.height,
                text: cell.text.to_string(),
                border: cell.border,
                align: cell.align,
                fill: cell.fill,
            });
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
        if !self.measuring {
            self.calls.push(Call::Line { x1, y1, x2, y2 });
        }
    }

    fn image(&mut self, image: ImagePlacement<'_>) -> Result<(), FolioError> {
        if !self.measuring {
            self.calls.push(Call::Image {
                name: image.name.to_string(),
                kind: image.kind,
                x: image.x,
                y: image.y,
                width: image.width,
                height: image.height,
            });
        }
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

    fn finish(self) -> Result<Vec<u8>, FolioError> {
        Ok(Vec::new())
    }
}
