//! # Drawing Backend
//!
//! The capability surface layout draws through. A backend owns the page
//! state for one build: the cursor, the current page, font and colors, and
//! the accumulated output. Layout only ever talks to `dyn`-free generics
//! over [`DrawingBackend`], so the same engine drives the PDF writer and
//! the recording backend used in tests.
//!
//! Coordinates are millimetres from the top-left corner of the page. Font
//! sizes are points.
//!
//! Cells follow the classic cell model: a box of fixed size with optional
//! border and fill, text placed inside with a 1 mm horizontal inset, and a
//! line-feed rule saying where the cursor goes afterwards. A cell whose
//! bottom would cross the page's bottom margin starts a new page first,
//! except in measurement mode.

pub mod recording;

use crate::error::FolioError;
use crate::model::{Orientation, PageFormat, PageMargins};
use crate::style::{Align, Rgb};

/// Horizontal inset of text inside a cell, in millimetres.
pub const CELL_MARGIN: f64 = 1.0;

/// Page geometry handed to a backend at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    /// Page width in millimetres, after orientation.
    pub width: f64,
    /// Page height in millimetres, after orientation.
    pub height: f64,
    pub margins: PageMargins,
}

impl PageSetup {
    pub fn new(format: PageFormat, orientation: Orientation, margins: PageMargins) -> Self {
        let (w, h) = format.dimensions();
        let (width, height) = match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        };
        Self {
            width,
            height,
            margins,
        }
    }

    /// Width between the left and right margins.
    pub fn available_width(&self) -> f64 {
        self.width - self.margins.left - self.margins.right
    }

    /// The y coordinate past which a cell triggers a page break.
    pub fn break_trigger(&self) -> f64 {
        self.height - self.margins.bottom
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::new(PageFormat::A4, Orientation::Portrait, PageMargins::default())
    }
}

/// Bold/italic selection for a font family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FontFlags {
    pub bold: bool,
    pub italic: bool,
}

impl FontFlags {
    pub const REGULAR: FontFlags = FontFlags {
        bold: false,
        italic: false,
    };
}

/// Which sides of a cell get a border line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Border {
    pub left: bool,
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
}

impl Border {
    pub const NONE: Border = Border {
        left: false,
        top: false,
        right: false,
        bottom: false,
    };
    pub const ALL: Border = Border {
        left: true,
        top: true,
        right: true,
        bottom: true,
    };

    /// Parse `"0"`, `"1"`, or any combination of `L`, `T`, `R`, `B`.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        if spec == "1" {
            return Border::ALL;
        }
        let upper = spec.to_ascii_uppercase();
        Border {
            left: upper.contains('L'),
            top: upper.contains('T'),
            right: upper.contains('R'),
            bottom: upper.contains('B'),
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Border::NONE
    }

    pub fn is_full(&self) -> bool {
        *self == Border::ALL
    }
}

/// Where the cursor goes after a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineFeed {
    /// Stay on the line: x advances by the cell width.
    #[default]
    Right,
    /// Start of the next line: x returns to the left margin, y advances.
    NextLine,
    /// Directly below: x unchanged, y advances.
    Below,
}

/// One cell to draw, or one block to wrap with [`DrawingBackend::multi_cell`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell<'a> {
    /// Width in millimetres. Zero extends to the right margin.
    pub width: f64,
    /// Height of the cell, or of each wrapped line.
    pub height: f64,
    pub text: &'a str,
    pub border: Border,
    pub feed: LineFeed,
    pub align: Align,
    pub fill: bool,
}

impl<'a> Cell<'a> {
    pub fn new(width: f64, height: f64, text: &'a str) -> Self {
        Self {
            width,
            height,
            text,
            border: Border::NONE,
            feed: LineFeed::Right,
            align: Align::Left,
            fill: false,
        }
    }

    pub fn border(mut self, border: Border) -> Self {
        self.border = border;
        self
    }

    pub fn feed(mut self, feed: LineFeed) -> Self {
        self.feed = feed;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }
}

/// Raster encodings accepted by [`DrawingBackend::image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

/// An image to place on the current page.
#[derive(Debug, Clone, Copy)]
pub struct ImagePlacement<'a> {
    /// Images with the same name are embedded once.
    pub name: &'a str,
    pub kind: ImageKind,
    pub data: &'a [u8],
    pub x: f64,
    pub y: f64,
    pub width: f64,
    /// Zero derives the height from the image's aspect ratio.
    pub height: f64,
}

/// The drawing operations layout needs.
pub trait DrawingBackend {
    fn add_page(&mut self);

    /// Register a TrueType font under `family`, regular style.
    fn register_font(&mut self, family: &str, data: Vec<u8>) -> Result<(), FolioError>;

    fn set_font(&mut self, family: &str, flags: FontFlags, size: f64);
    fn set_text_color(&mut self, color: Rgb);
    fn set_fill_color(&mut self, color: Rgb);
    fn set_draw_color(&mut self, color: Rgb);
    fn set_line_width(&mut self, width: f64);

    /// Width of `text` in millimetres in the current font.
    fn text_width(&self, text: &str) -> f64;

    fn cell(&mut self, cell: Cell<'_>);

    /// Draw `block.text` wrapped to `block.width`, one cell per line.
    ///
    /// Afterwards x is back at the left margin and y is below the last line.
    fn multi_cell(&mut self, block: Cell<'_>) {
        multi_cell_lines(self, block);
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64);
    fn image(&mut self, image: ImagePlacement<'_>) -> Result<(), FolioError>;

    fn cursor(&self) -> (f64, f64);
    fn set_cursor(&mut self, x: f64, y: f64);
    fn set_x(&mut self, x: f64);

    /// Move to the left margin and down by `height`.
    fn line_break(&mut self, height: f64);

    fn page_setup(&self) -> PageSetup;

    /// In measurement mode cells move the cursor but draw nothing and never
    /// break the page.
    fn set_measuring(&mut self, measuring: bool);

    fn finish(self) -> Result<Vec<u8>, FolioError>
    where
        Self: Sized;
}

/// Shared multi-cell behaviour: wrap, then emit one cell per line with the
/// frame split so that only the first line carries `T` and only the last
/// carries `B`.
pub fn multi_cell_lines<B: DrawingBackend + ?Sized>(backend: &mut B, block: Cell<'_>) {
    let setup = backend.page_setup();
    let (x, _) = backend.cursor();
    let width = if block.width <= 0.0 {
        setup.width - setup.margins.right - x
    } else {
        block.width
    };
    let usable = width - 2.0 * CELL_MARGIN;
    let lines = wrap_text(block.text, usable, |s| backend.text_width(s));

    let last = lines.len().saturating_sub(1);
    for (i, line) in lines.iter().enumerate() {
        let border = Border {
            left: block.border.left,
            right: block.border.right,
            top: block.border.top && i == 0,
            bottom: block.border.bottom && i == last,
        };
        backend.cell(Cell {
            width,
            text: line,
            border,
            feed: LineFeed::Below,
            ..block
        });
    }
    let (_, y) = backend.cursor();
    backend.set_cursor(setup.margins.left, y);
}

/// Break `text` into lines no wider than `max_width`.
///
/// Explicit newlines always break (one trailing newline is ignored). Lines
/// wrap at spaces; a word wider than the line is split between characters.
/// Every call returns at least one line.
pub fn wrap_text(text: &str, max_width: f64, measure: impl Fn(&str) -> f64) -> Vec<String> {
    let text = text.replace('\r', "");
    let text = text.strip_suffix('\n').unwrap_or(&text);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split(' ') {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if measure(&candidate) <= max_width || candidate.is_empty() {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            // `word` alone may still be too wide
            for ch in word.chars() {
                current.push(ch);
                if measure(&current) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                }
            }
        }
        lines.push(current);
    }

    lines
}
