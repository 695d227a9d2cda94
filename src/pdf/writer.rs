//! PDF 1.7 file assembly.
//!
//! Takes the finished page content streams plus the fonts and images they
//! reference and writes the object table, cross-reference table and
//! trailer.
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, images, pages, streams
//! ...
//! xref                <- byte offset of each object
//! trailer             <- points at the catalog and info dictionary
//! %%EOF
//! ```
//!
//! Standard fonts are plain Type1 references with WinAnsiEncoding. Custom
//! TrueType fonts are embedded whole as CIDFontType2 with Identity-H
//! encoding: FontFile2, FontDescriptor, CIDFont, ToUnicode CMap and the
//! Type0 root, five objects per font.

use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::FolioError;
use crate::font::{CustomFont, FontId, FontRegistry};
use crate::image_loader::{ImagePixelData, LoadedImage};

/// Points per millimetre.
pub const SCALE: f64 = 72.0 / 25.4;

/// Everything the writer needs from a finished backend session.
pub struct PdfParts<'a> {
    /// Page width and height in points.
    pub page_size: (f64, f64),
    /// One content stream per page.
    pub pages: &'a [String],
    /// Fonts in resource order: `/F0`, `/F1`, ...
    pub fonts: &'a [FontId],
    pub registry: &'a FontRegistry,
    /// Glyphs used per custom font key, for widths and ToUnicode.
    pub custom_glyphs: &'a BTreeMap<String, BTreeMap<u16, char>>,
    /// Images in resource order: `/Im0`, `/Im1`, ...
    pub images: &'a [LoadedImage],
}

struct PdfObject {
    data: Vec<u8>,
}

/// Tracks allocated objects. Object 0 is the free-list head, 1 is the
/// catalog and 2 the page tree.
struct PdfBuilder {
    objects: Vec<PdfObject>,
}

impl PdfBuilder {
    fn new() -> Self {
        let objects = (0..3).map(|_| PdfObject { data: Vec::new() }).collect();
        Self { objects }
    }

    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    /// Add a FlateDecode stream object with extra dictionary entries.
    fn push_stream(&mut self, extra: &str, raw: &[u8]) -> usize {
        let compressed = compress_to_vec_zlib(raw, 6);
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< /Length {} /Filter /FlateDecode{} >>\nstream\n",
            compressed.len(),
            extra
        );
        data.extend_from_slice(&compressed);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }
}

pub struct PdfWriter;

impl PdfWriter {
    pub fn write(parts: &PdfParts<'_>) -> Result<Vec<u8>, FolioError> {
        let mut builder = PdfBuilder::new();

        let mut font_refs = Vec::with_capacity(parts.fonts.len());
        for id in parts.fonts {
            let obj = match id {
                FontId::Standard(face) => builder.push(
                    format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                         /Encoding /WinAnsiEncoding >>",
                        face.pdf_name()
                    )
                    .into_bytes(),
                ),
                FontId::Custom(key) => {
                    let font = parts.registry.custom(key).ok_or_else(|| {
                        FolioError::Font(format!("font '{}' used but not registered", key))
                    })?;
                    let empty = BTreeMap::new();
                    let glyphs = parts.custom_glyphs.get(key).unwrap_or(&empty);
                    Self::write_custom_font_objects(&mut builder, font, glyphs)?
                }
            };
            font_refs.push(obj);
        }

        let image_refs: Vec<usize> = parts
            .images
            .iter()
            .map(|image| Self::write_image_xobject(&mut builder, image))
            .collect();

        let resources = Self::resource_dict(&font_refs, &image_refs);
        let (width, height) = parts.page_size;
        let mut page_ids = Vec::with_capacity(parts.pages.len());
        for content in parts.pages {
            let content_id = builder.push_stream("", content.as_bytes());
            let page = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                width, height, content_id, resources
            );
            page_ids.push(builder.push(page.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_ids.len()
        )
        .into_bytes();

        let info_id = builder.push(
            format!(
                "<< /Producer (folio) /Creator (folio {}) >>",
                env!("CARGO_PKG_VERSION")
            )
            .into_bytes(),
        );

        Ok(Self::serialize(&builder, info_id))
    }

    fn resource_dict(font_refs: &[usize], image_refs: &[usize]) -> String {
        let fonts = font_refs
            .iter()
            .enumerate()
            .map(|(i, id)| format!("/F{} {} 0 R", i, id))
            .collect::<Vec<_>>()
            .join(" ");
        let mut resources = format!("/Font << {} >>", fonts);
        if !image_refs.is_empty() {
            let images = image_refs
                .iter()
                .enumerate()
                .map(|(i, id)| format!("/Im{} {} 0 R", i, id))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(resources, " /XObject << {} >>", images);
        }
        resources
    }

    /// Write one image as one or two XObjects and return the main one.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let mut obj: Vec<u8> = Vec::new();
                let _ = write!(
                    obj,
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace {} /BitsPerComponent 8 /Filter /DCTDecode \
                     /Length {} >>\nstream\n",
                    image.width_px,
                    image.height_px,
                    color_space.pdf_name(),
                    data.len()
                );
                obj.extend_from_slice(data);
                obj.extend_from_slice(b"\nendstream");
                builder.push(obj)
            }
            ImagePixelData::Decoded { rgb, alpha } => {
                let smask = alpha.as_ref().map(|alpha| {
                    let extra = format!(
                        " /Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /DeviceGray /BitsPerComponent 8",
                        image.width_px, image.height_px
                    );
                    builder.push_stream(&extra, alpha)
                });
                let smask_ref = smask
                    .map(|id| format!(" /SMask {} 0 R", id))
                    .unwrap_or_default();
                let extra = format!(
                    " /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceRGB /BitsPerComponent 8{}",
                    image.width_px, image.height_px, smask_ref
                );
                builder.push_stream(&extra, rgb)
            }
        }
    }

    /// Write the five CIDFont objects and return the Type0 root id.
    fn write_custom_font_objects(
        builder: &mut PdfBuilder,
        font: &CustomFont,
        glyphs: &BTreeMap<u16, char>,
    ) -> Result<usize, FolioError> {
        let face = ttf_parser::Face::parse(&font.data, 0).map_err(|e| {
            FolioError::Font(format!("Failed to parse TTF data for '{}': {}", font.family, e))
        })?;
        let units_per_em = face.units_per_em().max(1);
        let scale = 1000.0 / units_per_em as f64;
        let pdf_font_name = sanitize_font_name(&font.family);

        let fontfile2_id =
            builder.push_stream(&format!(" /Length1 {}", font.data.len()), &font.data);

        let bbox = face.global_bounding_box();
        let ascender = face.ascender();
        let cap_height = face.capital_height().unwrap_or(ascender) as f64 * scale;
        let descriptor = format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox [{} {} {} {}] /ItalicAngle 0 \
             /Ascent {} /Descent {} /CapHeight {} /StemV 80 \
             /FontFile2 {} 0 R >>",
            pdf_font_name,
            (bbox.x_min as f64 * scale) as i32,
            (bbox.y_min as f64 * scale) as i32,
            (bbox.x_max as f64 * scale) as i32,
            (bbox.y_max as f64 * scale) as i32,
            (ascender as f64 * scale) as i32,
            (face.descender() as f64 * scale) as i32,
            cap_height as i32,
            fontfile2_id,
        );
        let descriptor_id = builder.push(descriptor.into_bytes());

        let default_width = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .map(|adv| (adv as f64 * scale) as u32)
            .unwrap_or(1000);
        let cidfont = format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} /CIDToGIDMap /Identity >>",
            pdf_font_name,
            descriptor_id,
            default_width,
            build_w_array(glyphs, &face, scale),
        );
        let cidfont_id = builder.push(cidfont.into_bytes());

        let cmap = build_tounicode_cmap(glyphs, &pdf_font_name);
        let tounicode_id = builder.push_stream("", cmap.as_bytes());

        let type0 = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
            pdf_font_name, cidfont_id, tounicode_id,
        );
        Ok(builder.push(type0.into_bytes()))
    }

    fn serialize(builder: &PdfBuilder, info_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_id,
            xref_offset
        );

        output
    }
}

/// `/W` entries for the used glyphs: `[gid [width] gid [width] ...]`.
fn build_w_array(glyphs: &BTreeMap<u16, char>, face: &ttf_parser::Face, scale: f64) -> String {
    let mut result = String::from("[");
    for &gid in glyphs.keys() {
        let advance = face.glyph_hor_advance(ttf_parser::GlyphId(gid)).unwrap_or(0);
        let _ = write!(result, " {} [{}]", gid, (advance as f64 * scale) as u32);
    }
    result.push_str(" ]");
    result
}

/// ToUnicode CMap so text can be extracted and searched.
fn build_tounicode_cmap(glyphs: &BTreeMap<u16, char>, font_name: &str) -> String {
    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
    cmap.push_str("/CIDSystemInfo\n<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
    cmap.push_str("/CMapType 2 def\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let entries: Vec<(u16, char)> = glyphs.iter().map(|(&g, &c)| (g, c)).collect();
    // at most 100 entries per bfchar block
    for chunk in entries.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for &(gid, ch) in chunk {
            let mut units = [0u16; 2];
            let hex: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            let _ = writeln!(cmap, "<{:04X}> <{}>", gid, hex);
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

/// Strip characters that are not allowed in a PDF name.
pub fn sanitize_font_name(family: &str) -> String {
    let name: String = family
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if name.is_empty() {
        "CustomFont".to_string()
    } else {
        name
    }
}

/// Encode text as a WinAnsi PDF literal string body. Characters outside
/// the encoding become `?`.
pub fn encode_winansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        let b = unicode_to_winansi(ch).unwrap_or(b'?');
        match b {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out
}

/// Map a code point to its Windows-1252 byte.
pub fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}
