//! # Document Model
//!
//! The parsed form of a (resolved) descriptor: page setup, font setup, and
//! an ordered list of elements. Elements are a flat wire shape (`type`,
//! `content`, `columns`, `rows`, ...) turned into a tagged [`ElementKind`]
//! at parse time, so layout matches on variants instead of strings.
//!
//! Structural problems (an `elements` that is not a list, a `columns` entry
//! that is not an object) fail the parse. Field-level problems inside a
//! style or a row degrade to defaults.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::style::{Align, Style};

/// A complete document ready for layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default)]
    pub fonts: FontConfig,
    #[serde(default)]
    pub elements: Vec<Element>,
}

// ── Page ───────────────────────────────────────────────────────

/// Margins used when the descriptor does not give exactly four.
pub const DEFAULT_MARGINS: PageMargins = PageMargins {
    left: 15.0,
    top: 12.0,
    right: 15.0,
    bottom: 20.0,
};

/// Page configuration as written in the descriptor.
///
/// Values are kept raw so that layout can report unknown formats and
/// malformed margins before falling back.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageConfig {
    /// `A3`, `A4`, `A5`, `Letter` or `Legal`, any case. Empty means A4.
    #[serde(default)]
    pub format: String,
    /// `portrait` or `landscape`. Empty means portrait.
    #[serde(default)]
    pub orientation: String,
    /// `[left, top, right, bottom]` in millimetres.
    #[serde(default)]
    pub margins: Vec<f64>,
}

impl PageConfig {
    /// The named format, or `None` if it is not one we know.
    pub fn page_format(&self) -> Option<PageFormat> {
        if self.format.trim().is_empty() {
            return Some(PageFormat::A4);
        }
        PageFormat::parse(&self.format)
    }

    /// The orientation, or `None` if the value is not recognised.
    pub fn page_orientation(&self) -> Option<Orientation> {
        match self.orientation.trim().to_ascii_lowercase().as_str() {
            "" | "portrait" => Some(Orientation::Portrait),
            "landscape" => Some(Orientation::Landscape),
            _ => None,
        }
    }

    /// The four margins, or `None` when the array is not exactly four long.
    pub fn page_margins(&self) -> Option<PageMargins> {
        match *self.margins.as_slice() {
            [left, top, right, bottom] => Some(PageMargins {
                left,
                top,
                right,
                bottom,
            }),
            _ => None,
        }
    }
}

/// Standard page formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageFormat {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
}

impl PageFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "a3" => Some(PageFormat::A3),
            "a4" => Some(PageFormat::A4),
            "a5" => Some(PageFormat::A5),
            "letter" => Some(PageFormat::Letter),
            "legal" => Some(PageFormat::Legal),
            _ => None,
        }
    }

    /// Portrait (width, height) in millimetres.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageFormat::A3 => (297.0, 420.0),
            PageFormat::A4 => (210.0, 297.0),
            PageFormat::A5 => (148.0, 210.0),
            PageFormat::Letter => (215.9, 279.4),
            PageFormat::Legal => (215.9, 355.6),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Resolved page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMargins {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Default for PageMargins {
    fn default() -> Self {
        DEFAULT_MARGINS
    }
}

// ── Fonts ──────────────────────────────────────────────────────

/// Family used when the descriptor names none.
pub const DEFAULT_FONT_FAMILY: &str = "Arial";

/// Font configuration: the default family and any TrueType files to load.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FontConfig {
    #[serde(default)]
    pub default: String,
    /// Family name to `.ttf` path.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
}

impl FontConfig {
    pub fn default_family(&self) -> &str {
        if self.default.trim().is_empty() {
            DEFAULT_FONT_FAMILY
        } else {
            &self.default
        }
    }
}

// ── Elements ───────────────────────────────────────────────────

/// One visual element.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "ElementSpec")]
pub struct Element {
    pub kind: ElementKind,
    pub style: Option<Style>,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self { kind, style: None }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// The element's style, or an empty one.
    pub fn style_or_default(&self) -> Style {
        self.style.clone().unwrap_or_default()
    }
}

/// What an element draws.
#[derive(Debug, Clone)]
pub enum ElementKind {
    /// A line of text, or a wrapped block if the content has line breaks.
    Text { content: String },
    Table(Table),
    /// Children laid out `columns` to a row with synchronized row heights.
    Grid {
        columns: i64,
        children: Vec<Element>,
    },
    /// Vertical gap of the style's height.
    Space,
    /// Horizontal rule. `length` 0 runs to the right margin.
    Line { length: f64 },
    /// A `data:image/...;base64,` URI.
    Image { content: String },
    /// Any other `type`; skipped by layout.
    Unknown(String),
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<TableRow>,
    /// Set when `rows` was present but could not be read as a row list.
    pub rows_error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableColumn {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub width: f64,
    #[serde(default, deserialize_with = "crate::style::lenient")]
    pub align: Option<Align>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub style: Option<Style>,
}

/// The flat wire form of an element.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElementSpec {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    content: serde_json::Value,
    #[serde(default)]
    style: Option<Style>,
    #[serde(default)]
    children: Vec<Element>,
    #[serde(default)]
    columns: Vec<TableColumn>,
    #[serde(default)]
    rows: serde_json::Value,
    #[serde(default)]
    grid_columns: i64,
    #[serde(default)]
    length: f64,
}

impl From<ElementSpec> for Element {
    fn from(spec: ElementSpec) -> Self {
        let text = |content: serde_json::Value| match content {
            serde_json::Value::String(s) => s,
            _ => String::new(),
        };
        let kind = match spec.kind.as_str() {
            "text" => ElementKind::Text {
                content: text(spec.content),
            },
            "table" => {
                let (rows, rows_error) = match parse_rows(spec.rows) {
                    Ok(rows) => (rows, None),
                    Err(e) => (Vec::new(), Some(e)),
                };
                ElementKind::Table(Table {
                    columns: spec.columns,
                    rows,
                    rows_error,
                })
            }
            "grid" => ElementKind::Grid {
                columns: spec.grid_columns,
                children: spec.children,
            },
            "space" => ElementKind::Space,
            "line" => ElementKind::Line {
                length: spec.length.max(0.0),
            },
            "image" => ElementKind::Image {
                content: text(spec.content),
            },
            other => ElementKind::Unknown(other.to_string()),
        };
        Element {
            kind,
            style: spec.style,
        }
    }
}

/// Read table rows from either a JSON list or a string holding one.
///
/// A string is what a loop inside a quoted `rows` value expands to: row
/// objects joined by commas. It is wrapped in brackets unless it already
/// is a list.
pub fn parse_rows(raw: serde_json::Value) -> Result<Vec<TableRow>, String> {
    match raw {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(items) => Ok(items.iter().filter_map(parse_row).collect()),
        serde_json::Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(Vec::new());
            }
            let list = if text.starts_with('[') {
                text.to_string()
            } else {
                format!("[{}]", text)
            };
            match serde_json::from_str(&list) {
                Ok(serde_json::Value::Array(items)) => {
                    Ok(items.iter().filter_map(parse_row).collect())
                }
                Ok(_) => Err("rows string is not a list of row objects".to_string()),
                Err(e) => Err(format!("rows string is not valid JSON: {}", e)),
            }
        }
        _ => Err("rows must be a list or a string".to_string()),
    }
}

/// One row object. Non-object rows are skipped, non-string cells dropped.
fn parse_row(raw: &serde_json::Value) -> Option<TableRow> {
    let fields = raw.as_object()?;
    let cells = fields
        .get("cells")
        .and_then(|c| c.as_array())
        .map(|cells| {
            cells
                .iter()
                .filter_map(|c| c.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let style = fields
        .get("style")
        .filter(|s| s.is_object())
        .and_then(|s| serde_json::from_value(s.clone()).ok());
    Some(TableRow { cells, style })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element(value: serde_json::Value) -> Element {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_document_uses_defaults() {
        let doc: Document = serde_json::from_str("{}").unwrap();
        assert!(doc.elements.is_empty());
        assert_eq!(doc.page.page_format(), Some(PageFormat::A4));
        assert_eq!(doc.page.page_orientation(), Some(Orientation::Portrait));
        assert_eq!(doc.page.page_margins(), None);
        assert_eq!(doc.fonts.default_family(), "Arial");
    }

    #[test]
    fn page_config_parses() {
        let doc: Document = serde_json::from_value(json!({
            "page": {"format": "letter", "orientation": "landscape", "margins": [10, 20, 30, 40]},
            "fonts": {"default": "Times", "paths": {"Brand": "/fonts/brand.ttf"}}
        }))
        .unwrap();
        assert_eq!(doc.page.page_format(), Some(PageFormat::Letter));
        assert_eq!(doc.page.page_orientation(), Some(Orientation::Landscape));
        assert_eq!(
            doc.page.page_margins(),
            Some(PageMargins {
                left: 10.0,
                top: 20.0,
                right: 30.0,
                bottom: 40.0
            })
        );
        assert_eq!(doc.fonts.default_family(), "Times");
        assert_eq!(doc.fonts.paths["Brand"], "/fonts/brand.ttf");
    }

    #[test]
    fn unknown_format_is_reported_as_none() {
        let page = PageConfig {
            format: "B5".to_string(),
            ..Default::default()
        };
        assert_eq!(page.page_format(), None);
    }

    #[test]
    fn three_margins_are_rejected() {
        let page = PageConfig {
            margins: vec![1.0, 2.0, 3.0],
            ..Default::default()
        };
        assert_eq!(page.page_margins(), None);
    }

    #[test]
    fn text_element() {
        let el = element(json!({"type": "text", "content": "Hello", "style": {"bold": true}}));
        assert!(matches!(el.kind, ElementKind::Text { ref content } if content == "Hello"));
        assert!(el.style.unwrap().is_bold());
    }

    #[test]
    fn non_string_content_is_empty_text() {
        let el = element(json!({"type": "text", "content": 42}));
        assert!(matches!(el.kind, ElementKind::Text { ref content } if content.is_empty()));
    }

    #[test]
    fn unknown_type_is_kept_as_unknown() {
        let el = element(json!({"type": "chart"}));
        assert!(matches!(el.kind, ElementKind::Unknown(ref t) if t == "chart"));
    }

    #[test]
    fn grid_with_children() {
        let el = element(json!({
            "type": "grid",
            "gridColumns": 2,
            "children": [{"type": "text", "content": "a"}, {"type": "space"}]
        }));
        match el.kind {
            ElementKind::Grid { columns, children } => {
                assert_eq!(columns, 2);
                assert_eq!(children.len(), 2);
                assert!(matches!(children[1].kind, ElementKind::Space));
            }
            other => panic!("expected grid, got {:?}", other),
        }
    }

    #[test]
    fn table_rows_from_array() {
        let el = element(json!({
            "type": "table",
            "columns": [{"header": "A", "width": 40, "align": "right"}],
            "rows": [
                {"cells": ["1", 2, "3"], "style": {"bold": true}},
                "not a row",
                {"cells": ["x"]}
            ]
        }));
        let ElementKind::Table(table) = el.kind else {
            panic!("expected table");
        };
        assert_eq!(table.columns[0].align, Some(Align::Right));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].cells, vec!["1", "3"]);
        assert!(table.rows[0].style.as_ref().unwrap().is_bold());
        assert_eq!(table.rows[1].style, None);
        assert!(table.rows_error.is_none());
    }

    #[test]
    fn table_rows_from_expanded_string() {
        let rows = parse_rows(json!(r#"{"cells":["x"]},{"cells":["y"]}"#)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].cells, vec!["y"]);
    }

    #[test]
    fn table_rows_from_bracketed_string() {
        let rows = parse_rows(json!(r#"[{"cells":["x"]}]"#)).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn unparseable_rows_string_yields_error() {
        let el = element(json!({"type": "table", "rows": "{{#items}}"}));
        let ElementKind::Table(table) = el.kind else {
            panic!("expected table");
        };
        assert!(table.rows.is_empty());
        assert!(table.rows_error.is_some());
    }

    #[test]
    fn blank_rows_string_is_just_empty() {
        assert_eq!(parse_rows(json!("  ")).unwrap(), Vec::new());
    }

    #[test]
    fn negative_line_length_clamps_to_zero() {
        let el = element(json!({"type": "line", "length": -5}));
        assert!(matches!(el.kind, ElementKind::Line { length } if length == 0.0));
    }
}
