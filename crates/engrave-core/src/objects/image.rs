//! Raster image objects and their sources.

use crate::error::AssetError;
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::{Rect, Size};
use serde_json::{Map, Value};

/// Image format of embedded or fetched image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect format from a MIME type.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        None
    }
}

/// Where an image's pixels come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// A stable location: remote URL, `file://` URI or filesystem path.
    Reference(String),
    /// Bytes carried inside the document itself.
    Embedded {
        format: ImageFormat,
        data_base64: String,
    },
}

impl ImageSource {
    /// Embed raw image bytes. Returns `None` if the format is not recognised.
    pub fn embed(data: &[u8]) -> Option<Self> {
        let format = ImageFormat::from_magic_bytes(data)?;
        Some(ImageSource::Embedded {
            format,
            data_base64: STANDARD.encode(data),
        })
    }

    /// Interpret a document source reference. `data:` URIs of a known image
    /// type become embedded sources, everything else stays a reference.
    pub fn parse(reference: &str) -> Self {
        if let Some((mime, payload)) = split_data_uri(reference) {
            if let Some(format) = ImageFormat::from_mime_type(mime) {
                return ImageSource::Embedded {
                    format,
                    data_base64: payload.to_string(),
                };
            }
        }
        ImageSource::Reference(reference.to_string())
    }

    /// The stable string written into documents.
    pub fn to_reference(&self) -> String {
        match self {
            ImageSource::Reference(reference) => reference.clone(),
            ImageSource::Embedded {
                format,
                data_base64,
            } => format!("data:{};base64,{}", format.mime_type(), data_base64),
        }
    }

    /// Raw bytes of an embedded source.
    pub fn data(&self) -> Option<Vec<u8>> {
        match self {
            ImageSource::Reference(_) => None,
            ImageSource::Embedded { data_base64, .. } => STANDARD.decode(data_base64).ok(),
        }
    }
}

/// Split `data:<mime>;base64,<payload>` into its MIME type and payload.
fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, payload))
}

/// Decode the bytes of a base64 `data:` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, AssetError> {
    let (_, payload) = split_data_uri(uri)
        .ok_or_else(|| AssetError::Unsupported("data URI is not base64 encoded".to_string()))?;
    STANDARD
        .decode(payload.trim())
        .map_err(|e| AssetError::Decode(format!("invalid base64 payload: {}", e)))
}

/// A decoded image, as far as scene reconstruction cares about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageAsset {
    /// Natural width in pixels.
    pub width: u32,
    /// Natural height in pixels.
    pub height: u32,
    pub format: Option<ImageFormat>,
}

impl ImageAsset {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: None,
        }
    }

    /// Decode raw PNG, JPEG or WebP bytes.
    pub fn decode(data: &[u8]) -> Result<Self, AssetError> {
        let decoded =
            ::image::load_from_memory(data).map_err(|e| AssetError::Decode(e.to_string()))?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(AssetError::Decode("image has zero size".to_string()));
        }
        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            format: ImageFormat::from_magic_bytes(data),
        })
    }
}

/// A named filter effect applied to an image, with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFilter {
    pub name: String,
    pub params: Map<String, Value>,
}

impl ImageFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A raster image placed on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageObject {
    pub source: ImageSource,
    /// Pixel size of the asset as currently loaded.
    pub natural_width: u32,
    pub natural_height: u32,
    /// Pixel size recorded when the image was uploaded.
    pub original_width: u32,
    pub original_height: u32,
    pub filters: Vec<ImageFilter>,
}

impl ImageObject {
    /// Create an image from a freshly decoded asset; upload size and
    /// natural size start out equal.
    pub fn new(source: ImageSource, asset: ImageAsset) -> Self {
        Self {
            source,
            natural_width: asset.width,
            natural_height: asset.height,
            original_width: asset.width,
            original_height: asset.height,
            filters: Vec::new(),
        }
    }

    /// Untransformed extent: the natural pixel size.
    pub fn content_rect(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.natural_width as f64,
            self.natural_height as f64,
        )
    }

    /// Uniform scale at which this image covers `canvas`.
    pub fn cover_scale(&self, canvas: Size) -> f64 {
        cover_scale(canvas, self.natural_width, self.natural_height)
    }
}

/// Uniform scale that makes a `width` x `height` image fully cover `canvas`
/// while preserving its aspect ratio.
pub fn cover_scale(canvas: Size, width: u32, height: u32) -> f64 {
    if width == 0 || height == 0 || canvas.width <= 0.0 || canvas.height <= 0.0 {
        return 1.0;
    }
    let (width, height) = (width as f64, height as f64);
    let canvas_aspect = canvas.width / canvas.height;
    let image_aspect = width / height;
    if canvas_aspect < image_aspect {
        canvas.height / height
    } else {
        canvas.width / width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = ::image::DynamicImage::ImageRgba8(::image::RgbaImage::new(width, height));
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ::image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ImageFormat::from_extension("png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("gif"), None);
        assert_eq!(ImageFormat::from_mime_type("image/webp"), Some(ImageFormat::WebP));
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
    }

    #[test]
    fn test_decode_reports_natural_size() {
        let asset = ImageAsset::decode(&png_bytes(7, 3)).unwrap();
        assert_eq!((asset.width, asset.height), (7, 3));
        assert_eq!(asset.format, Some(ImageFormat::Png));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            ImageAsset::decode(b"definitely not an image"),
            Err(AssetError::Decode(_))
        ));
    }

    #[test]
    fn test_embedded_source_becomes_data_uri() {
        let bytes = png_bytes(2, 2);
        let source = ImageSource::embed(&bytes).unwrap();
        let reference = source.to_reference();
        assert!(reference.starts_with("data:image/png;base64,"));
        assert_eq!(ImageSource::parse(&reference), source);
        assert_eq!(decode_data_uri(&reference).unwrap(), bytes);
        assert_eq!(source.data().unwrap(), bytes);
    }

    #[test]
    fn test_plain_reference_is_kept() {
        let source = ImageSource::parse("https://cdn.example.com/a.png");
        assert_eq!(
            source,
            ImageSource::Reference("https://cdn.example.com/a.png".to_string())
        );
        assert!(source.data().is_none());
    }

    #[test]
    fn test_cover_scale_wide_image() {
        // Image is wider than the canvas: height drives the scale.
        let scale = cover_scale(Size::new(800.0, 600.0), 2000, 1000);
        assert!((scale - 0.6).abs() < 1e-9);
        assert!(2000.0 * scale >= 800.0);
    }

    #[test]
    fn test_cover_scale_tall_image() {
        let scale = cover_scale(Size::new(800.0, 600.0), 400, 1000);
        assert!((scale - 2.0).abs() < 1e-9);
        assert!(1000.0 * scale >= 600.0);
    }

    #[test]
    fn test_cover_scale_degenerate() {
        assert_eq!(cover_scale(Size::new(800.0, 600.0), 0, 10), 1.0);
    }
}
