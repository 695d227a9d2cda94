//! # Style
//!
//! Per-element presentation: font selection, colors, alignment, cell
//! border/fill, explicit sizes, and raw margin/padding arrays.
//!
//! Every field is optional and deserialized leniently. A field with the
//! wrong JSON type (say `"size": "big"`) is treated as unset rather than
//! failing the whole descriptor, since styles are frequently produced by
//! template substitution.

pub mod spacing;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

pub use self::spacing::Spacing;

/// Font size used when a style does not give a positive one.
pub const DEFAULT_FONT_SIZE: f64 = 10.0;

/// The style attached to an element or a table row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    // ── Typography ─────────────────────────────────────────────
    /// Font family. Empty or missing means the document default.
    #[serde(default, deserialize_with = "lenient")]
    pub font: Option<String>,
    /// Font size in points.
    #[serde(default, deserialize_with = "lenient")]
    pub size: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub bold: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub italic: Option<bool>,

    // ── Color ──────────────────────────────────────────────────
    /// Text (and line) color as `#rgb` or `#rrggbb`.
    #[serde(default, deserialize_with = "lenient")]
    pub color: Option<String>,
    /// Fill color for cells drawn with `fill`.
    #[serde(default, deserialize_with = "lenient")]
    pub bg_color: Option<String>,

    // ── Cell ───────────────────────────────────────────────────
    /// Text alignment, or table placement for tables.
    #[serde(default, deserialize_with = "lenient")]
    pub align: Option<Align>,
    /// Border spec: `"0"`, `"1"`, or any of `L`, `T`, `R`, `B`.
    #[serde(default, deserialize_with = "lenient")]
    pub border: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub fill: Option<bool>,
    /// Explicit width in millimetres (images).
    #[serde(default, deserialize_with = "lenient")]
    pub width: Option<f64>,
    /// Explicit height in millimetres. Line height for text, gap height for
    /// spaces, stroke width for lines.
    #[serde(default, deserialize_with = "lenient")]
    pub height: Option<f64>,

    // ── Spacing ────────────────────────────────────────────────
    /// Raw margin array, resolved with [`Spacing::from_values`].
    #[serde(default, deserialize_with = "lenient")]
    pub margin: Option<Vec<f64>>,
    /// Raw padding array, resolved with [`Spacing::from_values`].
    #[serde(default, deserialize_with = "lenient")]
    pub padding: Option<Vec<f64>>,
}

impl Style {
    /// Positive font size or the default.
    pub fn font_size(&self) -> f64 {
        match self.size {
            Some(size) if size > 0.0 => size,
            _ => DEFAULT_FONT_SIZE,
        }
    }

    /// Explicit positive height, or `default`.
    pub fn height_or(&self, default: f64) -> f64 {
        match self.height {
            Some(h) if h > 0.0 => h,
            _ => default,
        }
    }

    /// Explicit positive width, or `default`.
    pub fn width_or(&self, default: f64) -> f64 {
        match self.width {
            Some(w) if w > 0.0 => w,
            _ => default,
        }
    }

    pub fn is_bold(&self) -> bool {
        self.bold.unwrap_or(false)
    }

    pub fn is_italic(&self) -> bool {
        self.italic.unwrap_or(false)
    }

    pub fn is_filled(&self) -> bool {
        self.fill.unwrap_or(false)
    }

    pub fn align(&self) -> Align {
        self.align.unwrap_or_default()
    }

    /// Border spec if one was given and non-empty.
    pub fn border(&self) -> Option<&str> {
        self.border.as_deref().filter(|b| !b.is_empty())
    }

    /// Family override if one was given and non-empty.
    pub fn font_family(&self) -> Option<&str> {
        self.font.as_deref().filter(|f| !f.is_empty())
    }

    pub fn text_color(&self) -> Option<Rgb> {
        non_empty_color(&self.color)
    }

    pub fn fill_color(&self) -> Option<Rgb> {
        non_empty_color(&self.bg_color)
    }

    pub fn margin(&self) -> Spacing {
        Spacing::from_values(self.margin.as_deref().unwrap_or_default())
    }

    pub fn padding(&self) -> Spacing {
        Spacing::from_values(self.padding.as_deref().unwrap_or_default())
    }
}

fn non_empty_color(value: &Option<String>) -> Option<Rgb> {
    value
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(Rgb::hex)
}

/// Horizontal alignment of text in a cell, or of a table on the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb`. Malformed digits read as zero.
    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0);
        match hex.len() {
            3 => {
                let short = |i: usize| hex.get(i..i + 1).map(channel).unwrap_or(0) * 17;
                Self::new(short(0), short(1), short(2))
            }
            6 => {
                let long = |i: usize| hex.get(i..i + 2).map(channel).unwrap_or(0);
                Self::new(long(0), long(2), long(4))
            }
            _ => Self::BLACK,
        }
    }

    /// Components scaled to 0.0-1.0 for PDF color operators.
    pub fn to_unit(self) -> (f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        )
    }
}

/// Deserialize any JSON value, keeping it only if it fits `T`.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).ok())
}
