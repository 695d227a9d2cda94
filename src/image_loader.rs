//! # Image Loading and Decoding
//!
//! Parses `data:image/...;base64,` URIs and prepares raster bytes for PDF
//! embedding. JPEG passes through untouched (DCTDecode). PNG is decoded to
//! RGB with a separate alpha channel for the SMask.

use std::io::Cursor;

use crate::backend::ImageKind;
use crate::error::FolioError;

/// A decoded image ready for embedding.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

impl LoadedImage {
    /// Height for `width` that keeps the pixel aspect ratio.
    pub fn height_for_width(&self, width: f64) -> f64 {
        if self.width_px == 0 {
            return 0.0;
        }
        width * self.height_px as f64 / self.width_px as f64
    }
}

#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded pixels.
    Decoded {
        /// width * height * 3 bytes
        rgb: Vec<u8>,
        /// width * height bytes, `None` when fully opaque
        alpha: Option<Vec<u8>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

impl JpegColorSpace {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            JpegColorSpace::DeviceRGB => "/DeviceRGB",
            JpegColorSpace::DeviceGray => "/DeviceGray",
        }
    }
}

/// A data URI split into its declared kind and decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

/// Parse `data:image/<type>;base64,<payload>`.
///
/// The content must split on commas into exactly two parts. The kind is
/// JPEG when the header mentions `jpeg` or `jpg`, PNG otherwise. Returns
/// `None` for anything else, including bad base64.
pub fn parse_data_uri(content: &str) -> Option<DataUri> {
    if !content.starts_with("data:image/") {
        return None;
    }
    let mut parts = content.split(',');
    let (header, payload) = match (parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), None) => (header, payload),
        _ => return None,
    };
    let kind = if header.contains("jpeg") || header.contains("jpg") {
        ImageKind::Jpeg
    } else {
        ImageKind::Png
    };
    let bytes = base64_decode(payload).ok()?;
    Some(DataUri { kind, bytes })
}

fn base64_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(input)
}

/// Decode raster bytes of the declared kind.
pub fn decode_image(kind: ImageKind, data: &[u8]) -> Result<LoadedImage, FolioError> {
    match kind {
        ImageKind::Jpeg => decode_jpeg(data),
        ImageKind::Png => decode_png(data),
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

/// Read dimensions and color space without decoding pixels.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, FolioError> {
    if !is_jpeg(data) {
        return Err(FolioError::Image("data is not a JPEG image".to_string()));
    }
    let reader = image::io::Reader::with_format(Cursor::new(data), image::ImageFormat::Jpeg);
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| FolioError::Image(format!("Failed to read JPEG dimensions: {}", e)))?;

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: detect_jpeg_color_space(data),
        },
        width_px: width,
        height_px: height,
    })
}

/// Find the SOF segment and read its component count.
fn detect_jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2;
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            return if data[i + 9] == 1 {
                JpegColorSpace::DeviceGray
            } else {
                JpegColorSpace::DeviceRGB
            };
        }
        if i + 3 < data.len() {
            let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + seg_len;
        } else {
            break;
        }
    }
    JpegColorSpace::DeviceRGB
}

/// Decode to RGBA, then split into RGB and alpha.
fn decode_png(data: &[u8]) -> Result<LoadedImage, FolioError> {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .map_err(|e| FolioError::Image(format!("Failed to decode PNG: {}", e)))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixel_count = (width as usize) * (height as usize);
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;

    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        has_transparency |= pixel[3] != 255;
    }

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: has_transparency.then_some(alpha),
        },
        width_px: width,
        height_px: height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
        let mut img = image::RgbaImage::new(1, 1);
        img.put_pixel(0, 0, image::Rgba(rgba));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 1, 1, image::ColorType::Rgba8)
            .unwrap();
        buf
    }

    #[test]
    fn data_uri_png() {
        let b64 = base64::engine::general_purpose::STANDARD.encode(png_bytes([0, 255, 0, 255]));
        let uri = parse_data_uri(&format!("data:image/png;base64,{}", b64)).unwrap();
        assert_eq!(uri.kind, ImageKind::Png);
        assert!(uri.bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
    }

    #[test]
    fn data_uri_kind_from_header() {
        let uri = parse_data_uri("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(uri.kind, ImageKind::Jpeg);
        let uri = parse_data_uri("data:image/jpg;base64,AAAA").unwrap();
        assert_eq!(uri.kind, ImageKind::Jpeg);
        let uri = parse_data_uri("data:image/gif;base64,AAAA").unwrap();
        assert_eq!(uri.kind, ImageKind::Png);
    }

    #[test]
    fn data_uri_rejects_malformed() {
        assert!(parse_data_uri("http://example.com/a.png").is_none());
        assert!(parse_data_uri("data:image/png;base64").is_none());
        assert!(parse_data_uri("data:image/png;base64,AA,AA").is_none());
        assert!(parse_data_uri("data:image/png;base64,@@@").is_none());
    }

    #[test]
    fn opaque_png_has_no_alpha() {
        let loaded = decode_image(ImageKind::Png, &png_bytes([255, 0, 0, 255])).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (1, 1));
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert!(alpha.is_none());
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn translucent_png_keeps_alpha() {
        let loaded = decode_image(ImageKind::Png, &png_bytes([255, 0, 0, 128])).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Decoded { alpha, .. } => {
                assert_eq!(alpha.as_deref(), Some(&[128u8][..]));
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn jpeg_passes_through() {
        let img = image::RgbImage::from_fn(4, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 4, 2, image::ColorType::Rgb8)
            .unwrap();

        let loaded = decode_image(ImageKind::Jpeg, &buf).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (4, 2));
        assert_eq!(loaded.height_for_width(50.0), 25.0);
        match &loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert!(data.starts_with(&[0xFF, 0xD8]));
                assert_eq!(*color_space, JpegColorSpace::DeviceRGB);
            }
            _ => panic!("JPEG should stay as Jpeg variant"),
        }
    }

    #[test]
    fn garbage_is_an_image_error() {
        assert!(matches!(
            decode_image(ImageKind::Png, &[1, 2, 3, 4]),
            Err(FolioError::Image(_))
        ));
        assert!(matches!(
            decode_image(ImageKind::Jpeg, &[1, 2, 3, 4]),
            Err(FolioError::Image(_))
        ));
    }
}
