//! # Layout Engine
//!
//! Walks the element list top to bottom and turns each element into
//! backend calls. The engine holds no geometry of its own: the cursor lives
//! in the backend, and every element starts wherever the previous one left
//! it.
//!
//! ## Flow
//!
//! 1. Register the descriptor's TrueType fonts, open the first page.
//! 2. For each element: move down by its top margin, draw it, move down by
//!    its bottom margin.
//! 3. Let the backend break pages on its own whenever a cell would cross
//!    the bottom margin.
//!
//! Tables and grids live in their own modules. Grids are the one place
//! where layout needs to know a height before drawing: each row of children
//! is laid out twice, once in the backend's measurement mode to find the
//! tallest child and once for real.
//!
//! Nothing here fails on odd input. Unknown element types, unreadable
//! images and missing fonts are recorded as diagnostics and skipped. Only
//! backend failures propagate.

mod grid;
mod table;

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;

use crate::backend::{Border, Cell, DrawingBackend, FontFlags, ImagePlacement, LineFeed, PageSetup};
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::FolioError;
use crate::font::StandardFont;
use crate::image_loader::parse_data_uri;
use crate::model::{
    Document, Element, ElementKind, Orientation, PageConfig, PageFormat, DEFAULT_MARGINS,
};
use crate::style::{Rgb, Style, DEFAULT_FONT_SIZE};
use crate::Rendered;

/// Default line height of a text element.
const TEXT_HEIGHT: f64 = 8.0;
/// Default gap of a space element.
const SPACE_HEIGHT: f64 = 5.0;
/// Default stroke of a line element.
const LINE_THICKNESS: f64 = 0.1;
/// Gap left under a line element.
const LINE_GAP: f64 = 2.0;
/// Default image width.
const IMAGE_WIDTH: f64 = 50.0;
/// Gap left under an image.
const IMAGE_GAP: f64 = 2.0;

static EMPTY_STYLE: Style = Style {
    font: None,
    size: None,
    bold: None,
    italic: None,
    color: None,
    bg_color: None,
    align: None,
    border: None,
    fill: None,
    width: None,
    height: None,
    margin: None,
    padding: None,
};

/// Resolve the page configuration, reporting anything that fell back.
pub fn page_setup(page: &PageConfig, diagnostics: &mut Diagnostics) -> PageSetup {
    let format = match page.page_format() {
        Some(format) => format,
        None => {
            diagnostics.warn(
                Stage::Page,
                format!("unknown page format '{}'; using A4", page.format),
            );
            PageFormat::A4
        }
    };
    let orientation = match page.page_orientation() {
        Some(orientation) => orientation,
        None => {
            diagnostics.warn(
                Stage::Page,
                format!("unknown orientation '{}'; using portrait", page.orientation),
            );
            Orientation::Portrait
        }
    };
    let margins = match page.page_margins() {
        Some(margins) => margins,
        None => {
            if !page.margins.is_empty() {
                diagnostics.warn(
                    Stage::Page,
                    format!(
                        "margins need four values [left, top, right, bottom], got {}; using defaults",
                        page.margins.len()
                    ),
                );
            }
            DEFAULT_MARGINS
        }
    };
    PageSetup::new(format, orientation, margins)
}

/// Lays out one document onto one backend. Consumed by [`build`](Self::build).
pub struct LayoutEngine<'d, B: DrawingBackend> {
    document: &'d Document,
    backend: B,
    diagnostics: Diagnostics,
    /// Lowercased families registered from font paths.
    registered_fonts: HashSet<String>,
    /// Lowercased families already reported as unavailable.
    reported_fonts: HashSet<String>,
    /// Image resource name per distinct data URI.
    image_names: HashMap<&'d str, String>,
    /// Set while a grid measures a row. Nested grids restore the outer state.
    measuring: bool,
}

impl<'d, B: DrawingBackend> LayoutEngine<'d, B> {
    pub fn new(document: &'d Document, backend: B) -> Self {
        Self {
            document,
            backend,
            diagnostics: Diagnostics::new(),
            registered_fonts: HashSet::new(),
            reported_fonts: HashSet::new(),
            image_names: HashMap::new(),
            measuring: false,
        }
    }

    /// Start from diagnostics gathered earlier in the pipeline.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Lay out the document and finish the backend.
    pub fn build(self) -> Result<Rendered, FolioError> {
        let (backend, diagnostics) = self.draw()?;
        let bytes = backend.finish()?;
        Ok(Rendered { bytes, diagnostics })
    }

    /// Lay out the document and hand back the backend unfinished.
    pub fn draw(mut self) -> Result<(B, Diagnostics), FolioError> {
        self.register_fonts()?;
        self.backend.add_page();
        self.apply_style(None);

        let document = self.document;
        log::debug!("laying out {} element(s)", document.elements.len());
        for element in &document.elements {
            self.render_element(element)?;
        }

        Ok((self.backend, self.diagnostics))
    }

    fn register_fonts(&mut self) -> Result<(), FolioError> {
        let document = self.document;
        for (family, path) in &document.fonts.paths {
            match std::fs::read(path) {
                Ok(data) => {
                    self.backend.register_font(family, data)?;
                    self.registered_fonts.insert(family.trim().to_ascii_lowercase());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    self.report(
                        Stage::Font,
                        format!("font '{}' not found at {}; skipped", family, path),
                    );
                }
                Err(source) => {
                    return Err(FolioError::Io {
                        path: path.clone(),
                        source,
                    })
                }
            }
        }
        Ok(())
    }

    fn default_family(&self) -> &'d str {
        self.document.fonts.default_family()
    }

    /// Select font and colors for an element or row.
    fn apply_style(&mut self, style: Option<&Style>) {
        let default_family = self.default_family();
        let Some(style) = style else {
            self.set_font(default_family, FontFlags::REGULAR, DEFAULT_FONT_SIZE);
            self.backend.set_text_color(Rgb::BLACK);
            return;
        };

        let flags = FontFlags {
            bold: style.is_bold(),
            italic: style.is_italic(),
        };
        let family = style.font_family().unwrap_or(default_family);
        self.set_font(family, flags, style.font_size());
        self.backend
            .set_text_color(style.text_color().unwrap_or(Rgb::BLACK));
        if let Some(fill) = style.fill_color() {
            self.backend.set_fill_color(fill);
        }
    }

    fn set_font(&mut self, family: &str, flags: FontFlags, size: f64) {
        let key = family.trim().to_ascii_lowercase();
        let known = self.registered_fonts.contains(&key)
            || StandardFont::for_family(family, FontFlags::REGULAR).is_some();
        if !known && !self.measuring && self.reported_fonts.insert(key) {
            self.report(
                Stage::Font,
                format!("font family '{}' is not available; using Helvetica", family),
            );
        }
        self.backend.set_font(family, flags, size);
    }

    /// Record a warning. Nothing is recorded while measuring, since the
    /// same elements are laid out again for real.
    fn report(&mut self, stage: Stage, message: impl Into<String>) {
        if !self.measuring {
            self.diagnostics.warn(stage, message);
        }
    }

    fn set_measuring(&mut self, measuring: bool) {
        self.measuring = measuring;
        self.backend.set_measuring(measuring);
    }

    fn available_width(&self) -> f64 {
        self.backend.page_setup().available_width()
    }

    /// Draw one element with its vertical margins.
    fn render_element(&mut self, element: &'d Element) -> Result<(), FolioError> {
        let style = element.style.as_ref().unwrap_or(&EMPTY_STYLE);
        let margin = style.margin();
        if margin.top > 0.0 {
            self.backend.line_break(margin.top);
        }

        match &element.kind {
            ElementKind::Text { content } => self.render_text(element, content),
            ElementKind::Table(table) => self.render_table(table, element.style.as_ref()),
            ElementKind::Grid { columns, children } => self.render_grid(*columns, children)?,
            ElementKind::Space => self.backend.line_break(style.height_or(SPACE_HEIGHT)),
            ElementKind::Line { length } => self.render_line(*length, style),
            ElementKind::Image { content } => self.render_image(content, style)?,
            ElementKind::Unknown(kind) => {
                self.report(
                    Stage::Layout,
                    format!("unknown element type '{}' skipped", kind),
                );
            }
        }

        if margin.bottom > 0.0 {
            self.backend.line_break(margin.bottom);
        }
        Ok(())
    }

    /// Text across the full content width, inset by margin and padding.
    fn render_text(&mut self, element: &Element, content: &str) {
        self.apply_style(element.style.as_ref());
        let style = element.style.as_ref().unwrap_or(&EMPTY_STYLE);

        let margin = style.margin();
        let padding = style.padding();
        let width = self.available_width() - margin.horizontal() - padding.horizontal();
        let offset = margin.left + padding.left;
        if offset > 0.0 {
            let (x, _) = self.backend.cursor();
            self.backend.set_x(x + offset);
        }

        let cell = Cell::new(width, style.height_or(TEXT_HEIGHT), content)
            .align(style.align())
            .fill(style.is_filled());
        if content.contains('\n') {
            let border = Border::parse(style.border().unwrap_or(""));
            self.backend.multi_cell(cell.border(border));
        } else {
            self.backend.cell(cell.feed(LineFeed::NextLine));
        }
    }

    fn render_line(&mut self, length: f64, style: &Style) {
        if let Some(color) = style.text_color() {
            self.backend.set_draw_color(color);
        }
        self.backend
            .set_line_width(style.height_or(LINE_THICKNESS));

        let (x, y) = self.backend.cursor();
        let end_x = if length > 0.0 {
            x + length
        } else {
            let setup = self.backend.page_setup();
            setup.width - setup.margins.right
        };
        self.backend.line(x, y, end_x, y);
        self.backend.line_break(LINE_GAP);
        self.backend.set_draw_color(Rgb::BLACK);
    }

    fn render_image(&mut self, content: &'d str, style: &Style) -> Result<(), FolioError> {
        let Some(uri) = parse_data_uri(content) else {
            self.report(
                Stage::Layout,
                "image content is not a base64 data:image URI; skipped",
            );
            return Ok(());
        };

        let next = self.image_names.len();
        let name = self
            .image_names
            .entry(content)
            .or_insert_with(|| format!("image_{}", next))
            .clone();

        let width = style.width_or(IMAGE_WIDTH);
        let height = style.height_or(0.0);
        let (x, y) = self.backend.cursor();
        self.backend.image(ImagePlacement {
            name: &name,
            kind: uri.kind,
            data: &uri.bytes,
            x,
            y,
            width,
            height,
        })?;

        let drawn = if height > 0.0 { height } else { width * 0.75 };
        self.backend.line_break(drawn + IMAGE_GAP);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Call, RecordingBackend};
    use crate::backend::ImageKind;
    use serde_json::json;

    pub(super) fn run(doc: serde_json::Value) -> (RecordingBackend, Diagnostics) {
        let document: Document = serde_json::from_value(doc).unwrap();
        let mut diagnostics = Diagnostics::new();
        let setup = page_setup(&document.page, &mut diagnostics);
        LayoutEngine::new(&document, RecordingBackend::new(setup))
            .with_diagnostics(diagnostics)
            .draw()
            .unwrap()
    }

    pub(super) fn cell_at(call: &Call) -> (f64, f64, f64, f64) {
        match call {
            Call::Cell {
                x,
                y,
                width,
                height,
                ..
            } => (*x, *y, *width, *height),
            other => panic!("expected a cell, got {:?}", other),
        }
    }

    #[test]
    fn single_line_text_spans_content_width() {
        let (rec, diagnostics) = run(json!({"elements": [{"type": "text", "content": "Hello"}]}));
        let cells = rec.cells();
        assert_eq!(cells.len(), 1);
        assert_eq!(cell_at(cells[0]), (15.0, 12.0, 180.0, 8.0));
        assert_eq!(rec.cursor(), (15.0, 20.0));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn margin_and_padding_inset_text() {
        let (rec, _) = run(json!({"elements": [{
            "type": "text",
            "content": "Inset",
            "style": {"margin": [5], "padding": [2, 3], "height": 6}
        }]}));
        let cells = rec.cells();
        assert_eq!(cell_at(cells[0]), (23.0, 17.0, 164.0, 6.0));
        // 12 + top 5 + cell 6 + bottom 5
        assert_eq!(rec.cursor().1, 28.0);
    }

    #[test]
    fn multi_line_text_wraps_with_border() {
        let (rec, _) = run(json!({"elements": [{
            "type": "text",
            "content": "first\nsecond",
            "style": {"border": "1"}
        }]}));
        assert_eq!(rec.texts(), vec!["first", "second"]);
        let borders: Vec<Border> = rec
            .cells()
            .iter()
            .map(|c| match c {
                Call::Cell { border, .. } => *border,
                _ => unreachable!(),
            })
            .collect();
        assert!(borders[0].top && !borders[0].bottom);
        assert!(!borders[1].top && borders[1].bottom);
        assert_eq!(rec.cursor(), (15.0, 28.0));
    }

    #[test]
    fn style_selects_font_and_colors() {
        let (rec, _) = run(json!({
            "fonts": {"default": "Times"},
            "elements": [{
                "type": "text",
                "content": "x",
                "style": {"bold": true, "size": 0, "color": "#f00", "bgColor": "#00ff00"}
            }]
        }));
        let calls = rec.calls();
        assert!(calls.contains(&Call::SetFont {
            family: "Times".to_string(),
            flags: FontFlags {
                bold: true,
                italic: false
            },
            size: 10.0,
        }));
        assert!(calls.contains(&Call::TextColor(Rgb::new(255, 0, 0))));
        assert!(calls.contains(&Call::FillColor(Rgb::new(0, 255, 0))));
    }

    #[test]
    fn space_advances_by_height() {
        let (rec, _) = run(json!({"elements": [
            {"type": "space"},
            {"type": "space", "style": {"height": 12}}
        ]}));
        assert_eq!(rec.cursor(), (15.0, 12.0 + 5.0 + 12.0));
    }

    #[test]
    fn line_runs_to_right_margin_and_restores_color() {
        let (rec, _) = run(json!({"elements": [
            {"type": "line", "style": {"color": "#336699", "height": 0.5}}
        ]}));
        let calls = rec.calls();
        assert!(calls.contains(&Call::LineWidth(0.5)));
        assert!(calls.contains(&Call::Line {
            x1: 15.0,
            y1: 12.0,
            x2: 195.0,
            y2: 12.0
        }));
        assert_eq!(calls.last(), Some(&Call::DrawColor(Rgb::BLACK)));
        assert_eq!(rec.cursor().1, 14.0);
    }

    #[test]
    fn line_with_length() {
        let (rec, _) = run(json!({"elements": [{"type": "line", "length": 40}]}));
        assert!(rec.calls().contains(&Call::Line {
            x1: 15.0,
            y1: 12.0,
            x2: 55.0,
            y2: 12.0
        }));
        assert!(rec.calls().contains(&Call::LineWidth(0.1)));
    }

    #[test]
    fn image_advances_by_estimated_height() {
        let (rec, diagnostics) = run(json!({"elements": [
            {"type": "image", "content": "data:image/jpeg;base64,AAAA"},
            {"type": "image", "content": "data:image/jpeg;base64,AAAA", "style": {"width": 20, "height": 10}}
        ]}));
        let images: Vec<&Call> = rec
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Image { .. }))
            .collect();
        assert_eq!(
            images[0],
            &Call::Image {
                name: "image_0".to_string(),
                kind: ImageKind::Jpeg,
                x: 15.0,
                y: 12.0,
                width: 50.0,
                height: 0.0
            }
        );
        // same data URI reuses the resource name
        assert!(matches!(images[1], Call::Image { name, y, .. } if name == "image_0" && *y == 51.5));
        assert_eq!(rec.cursor().1, 51.5 + 12.0);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn bad_image_content_is_skipped() {
        let (rec, diagnostics) = run(json!({"elements": [
            {"type": "image", "content": "https://example.com/logo.png"},
            {"type": "image", "content": "data:image/png;base64,%%%"}
        ]}));
        assert!(!rec.calls().iter().any(|c| matches!(c, Call::Image { .. })));
        assert_eq!(rec.cursor().1, 12.0);
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn unknown_element_is_reported_but_margins_apply() {
        let (rec, diagnostics) = run(json!({"elements": [
            {"type": "chart", "style": {"margin": [3, 0]}}
        ]}));
        assert_eq!(rec.cursor().1, 18.0);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.iter().next().unwrap().stage, Stage::Layout);
    }

    #[test]
    fn page_fallbacks_are_reported() {
        let mut diagnostics = Diagnostics::new();
        let page: PageConfig = serde_json::from_value(json!({
            "format": "B5",
            "orientation": "sideways",
            "margins": [10, 10]
        }))
        .unwrap();
        let setup = page_setup(&page, &mut diagnostics);
        assert_eq!(setup, PageSetup::default());
        assert_eq!(diagnostics.len(), 3);
    }

    #[test]
    fn landscape_letter() {
        let page: PageConfig = serde_json::from_value(json!({
            "format": "Letter",
            "orientation": "landscape",
            "margins": [10, 10, 10, 10]
        }))
        .unwrap();
        let setup = page_setup(&page, &mut Diagnostics::new());
        assert_eq!((setup.width, setup.height), (279.4, 215.9));
        assert_eq!(setup.margins.left, 10.0);
    }

    #[test]
    fn unavailable_font_family_reported_once() {
        let (_, diagnostics) = run(json!({
            "fonts": {"default": "DejaVu"},
            "elements": [
                {"type": "text", "content": "a"},
                {"type": "text", "content": "b"}
            ]
        }));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.iter().next().unwrap().stage, Stage::Font);
    }

    #[test]
    fn missing_font_file_is_a_warning() {
        let (rec, diagnostics) = run(json!({
            "fonts": {"paths": {"Brand": "/no/such/font.ttf"}},
            "elements": []
        }));
        assert!(!rec.calls().iter().any(|c| matches!(c, Call::RegisterFont { .. })));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn font_file_is_registered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brand.ttf");
        std::fs::write(&path, b"not really a font").unwrap();
        let (rec, diagnostics) = run(json!({
            "fonts": {"paths": {"Brand": path.to_str().unwrap()}},
            "elements": [{"type": "text", "content": "x", "style": {"font": "brand"}}]
        }));
        assert!(rec.calls().contains(&Call::RegisterFont {
            family: "Brand".to_string()
        }));
        // registered families are not reported as unavailable
        assert!(diagnostics.is_empty());
    }
}
