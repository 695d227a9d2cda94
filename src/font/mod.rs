//! # Font Management
//!
//! Resolves a requested family plus bold/italic flags to a concrete face:
//! either one of the standard PDF fonts (no embedding, widths from built-in
//! tables) or a TrueType font registered from the descriptor's font paths.
//!
//! Family names are matched case-insensitively. `Arial` and `sans` are
//! aliases for Helvetica, `serif` for Times, `mono`/`monospace` for
//! Courier. Anything else that has not been registered falls back to
//! Helvetica.

pub mod metrics;

use std::collections::HashMap;

use crate::backend::FontFlags;
use crate::error::FolioError;

pub use metrics::StandardFontMetrics;

/// The standard faces folio can draw without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// The PDF base font name.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    pub fn metrics(&self) -> &'static StandardFontMetrics {
        match self {
            Self::Helvetica | Self::HelveticaOblique => &metrics::HELVETICA,
            Self::HelveticaBold | Self::HelveticaBoldOblique => &metrics::HELVETICA_BOLD,
            Self::TimesRoman => &metrics::TIMES_ROMAN,
            Self::TimesBold => &metrics::TIMES_BOLD,
            Self::TimesItalic => &metrics::TIMES_ITALIC,
            Self::TimesBoldItalic => &metrics::TIMES_BOLD_ITALIC,
            Self::Courier
            | Self::CourierBold
            | Self::CourierOblique
            | Self::CourierBoldOblique => &metrics::COURIER,
        }
    }

    /// Map a family name and flags to a standard face, if the family is one
    /// of the standard ones or an alias.
    pub fn for_family(family: &str, flags: FontFlags) -> Option<Self> {
        let face = match family.trim().to_ascii_lowercase().as_str() {
            "helvetica" | "arial" | "sans" | "sans-serif" => match (flags.bold, flags.italic) {
                (false, false) => Self::Helvetica,
                (true, false) => Self::HelveticaBold,
                (false, true) => Self::HelveticaOblique,
                (true, true) => Self::HelveticaBoldOblique,
            },
            "times" | "times-roman" | "times new roman" | "serif" => {
                match (flags.bold, flags.italic) {
                    (false, false) => Self::TimesRoman,
                    (true, false) => Self::TimesBold,
                    (false, true) => Self::TimesItalic,
                    (true, true) => Self::TimesBoldItalic,
                }
            }
            "courier" | "courier new" | "mono" | "monospace" => match (flags.bold, flags.italic) {
                (false, false) => Self::Courier,
                (true, false) => Self::CourierBold,
                (false, true) => Self::CourierOblique,
                (true, true) => Self::CourierBoldOblique,
            },
            _ => return None,
        };
        Some(face)
    }

    /// The Helvetica face matching `flags`.
    pub fn fallback(flags: FontFlags) -> Self {
        match (flags.bold, flags.italic) {
            (false, false) => Self::Helvetica,
            (true, false) => Self::HelveticaBold,
            (false, true) => Self::HelveticaOblique,
            (true, true) => Self::HelveticaBoldOblique,
        }
    }
}

/// Identifies one face for measuring and for PDF resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontId {
    Standard(StandardFont),
    /// A registered TrueType family, by lowercased name.
    Custom(String),
}

/// A TrueType font loaded from disk, with the metrics layout needs.
#[derive(Debug, Clone)]
pub struct CustomFont {
    /// Family name as registered.
    pub family: String,
    pub data: Vec<u8>,
    pub metrics: CustomFontMetrics,
}

/// Metrics parsed from a TrueType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    /// Maps characters to their glyph IDs in the font.
    pub glyph_ids: HashMap<char, u16>,
}

impl CustomFontMetrics {
    /// Parse metrics for every mapped character in the Basic Multilingual
    /// Plane.
    pub fn from_font_data(data: &[u8]) -> Result<Self, String> {
        let face = ttf_parser::Face::parse(data, 0).map_err(|e| e.to_string())?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        let mut default_advance = 0u16;

        for code in 32u32..=0xFFFF {
            let Some(ch) = char::from_u32(code) else {
                continue;
            };
            if let Some(glyph_id) = face.glyph_index(ch) {
                let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                advance_widths.insert(ch, advance);
                glyph_ids.insert(ch, glyph_id.0);
                if ch == ' ' {
                    default_advance = advance;
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Ok(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            glyph_ids,
        })
    }

    /// Advance of `ch` in 1/1000 em.
    pub fn advance(&self, ch: char) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        w as f64 * 1000.0 / self.units_per_em.max(1) as f64
    }
}

/// Standard faces plus any registered TrueType families.
#[derive(Debug, Default)]
pub struct FontRegistry {
    custom: HashMap<String, CustomFont>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a TrueType font. The font is parsed immediately so a bad
    /// file fails here rather than at output time.
    pub fn register(&mut self, family: &str, data: Vec<u8>) -> Result<(), FolioError> {
        let metrics = CustomFontMetrics::from_font_data(&data).map_err(|e| {
            FolioError::Font(format!("Failed to parse TrueType data for '{}': {}", family, e))
        })?;
        log::debug!(
            "registered font '{}' ({} glyphs mapped)",
            family,
            metrics.glyph_ids.len()
        );
        self.custom.insert(
            family.trim().to_ascii_lowercase(),
            CustomFont {
                family: family.to_string(),
                data,
                metrics,
            },
        );
        Ok(())
    }

    /// Whether `family` resolves without falling back.
    pub fn is_known(&self, family: &str) -> bool {
        self.custom.contains_key(&family.trim().to_ascii_lowercase())
            || StandardFont::for_family(family, FontFlags::REGULAR).is_some()
    }

    /// Pick the face for `family` and `flags`.
    ///
    /// Registered families come only in their regular style, so flags are
    /// ignored for them.
    pub fn resolve(&self, family: &str, flags: FontFlags) -> FontId {
        let key = family.trim().to_ascii_lowercase();
        if self.custom.contains_key(&key) {
            return FontId::Custom(key);
        }
        FontId::Standard(
            StandardFont::for_family(family, flags).unwrap_or_else(|| StandardFont::fallback(flags)),
        )
    }

    pub fn custom(&self, key: &str) -> Option<&CustomFont> {
        self.custom.get(key)
    }

    /// Advance of `ch` in 1/1000 em for a resolved face.
    pub fn advance(&self, id: &FontId, ch: char) -> f64 {
        match id {
            FontId::Standard(face) => face.metrics().advance(ch) as f64,
            FontId::Custom(key) => match self.custom.get(key) {
                Some(font) => font.metrics.advance(ch),
                None => metrics::HELVETICA.advance(ch) as f64,
            },
        }
    }

    /// Width of `text` in the unit of `font_size`.
    pub fn measure(&self, id: &FontId, text: &str, font_size: f64) -> f64 {
        text.chars().map(|ch| self.advance(id, ch)).sum::<f64>() * font_size / 1000.0
    }
}
