use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use super::ProcessingError;

/// Formats a variant can be written in. Picked from the source file's
/// extension, never from the decoded content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
    Jpeg,
    Png,
    Gif,
}

impl EncodeFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(EncodeFormat::Jpeg),
            "png" => Some(EncodeFormat::Png),
            "gif" => Some(EncodeFormat::Gif),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ProcessingError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext)
            .ok_or_else(|| ProcessingError::UnsupportedEncodeTarget(ext.to_string()))
    }
}

/// Decode an in-memory file into a raster image. The container format is
/// sniffed from the bytes.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ProcessingError> {
    image::load_from_memory(bytes).map_err(|e| match e {
        image::ImageError::Unsupported(e) => ProcessingError::UnsupportedFormat(e.to_string()),
        image::ImageError::IoError(e) => ProcessingError::Io(e),
        other => ProcessingError::CorruptData(other.to_string()),
    })
}

pub fn encode(
    img: &DynamicImage,
    format: EncodeFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, ProcessingError> {
    let mut output = Vec::new();

    match format {
        EncodeFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut output, jpeg_quality.min(100));
            encoder
                .encode_image(&rgb)
                .map_err(|e| ProcessingError::EncodeFailed(format!("JPEG encoding failed: {}", e)))?;
        }
        EncodeFormat::Png => {
            img.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
                .map_err(|e| ProcessingError::EncodeFailed(format!("PNG encoding failed: {}", e)))?;
        }
        EncodeFormat::Gif => {
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut Cursor::new(&mut output), ImageFormat::Gif)
                .map_err(|e| ProcessingError::EncodeFailed(format!("GIF encoding failed: {}", e)))?;
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage, RgbaImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(8, 6, |x, y| {
            image::Rgb([(x * 30) as u8, (y * 40) as u8, 128])
        }))
    }

    #[test]
    fn format_follows_extension_case_insensitively() {
        assert_eq!(EncodeFormat::from_extension("JPG"), Some(EncodeFormat::Jpeg));
        assert_eq!(EncodeFormat::from_extension(".jpeg"), Some(EncodeFormat::Jpeg));
        assert_eq!(EncodeFormat::from_extension("png"), Some(EncodeFormat::Png));
        assert_eq!(EncodeFormat::from_extension("gif"), Some(EncodeFormat::Gif));
        assert_eq!(EncodeFormat::from_extension("bmp"), None);
    }

    #[test]
    fn unknown_extension_is_an_explicit_error() {
        let err = EncodeFormat::from_path(Path::new("/uploads/cat.bmp")).unwrap_err();
        assert!(matches!(err, ProcessingError::UnsupportedEncodeTarget(ext) if ext == "bmp"));

        let err = EncodeFormat::from_path(Path::new("/uploads/noext")).unwrap_err();
        assert!(matches!(err, ProcessingError::UnsupportedEncodeTarget(_)));
    }

    #[test]
    fn encodes_each_target_in_its_own_container() {
        let img = sample();

        let jpeg = encode(&img, EncodeFormat::Jpeg, 75).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);

        let png = encode(&img, EncodeFormat::Png, 75).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);

        let gif = encode(&img, EncodeFormat::Gif, 75).unwrap();
        assert_eq!(image::guess_format(&gif).unwrap(), ImageFormat::Gif);
    }

    #[test]
    fn jpeg_target_flattens_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 128])));
        let bytes = encode(&img, EncodeFormat::Jpeg, 90).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (4, 4));
    }

    #[test]
    fn decode_preserves_dimensions() {
        let png = encode(&sample(), EncodeFormat::Png, 75).unwrap();
        let decoded = decode(&png).unwrap();
        assert_eq!(decoded.dimensions(), (8, 6));
    }

    #[test]
    fn decode_rejects_unknown_bytes() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ProcessingError::UnsupportedFormat(_)));
    }

    #[test]
    fn decode_reports_truncated_files() {
        let png = encode(&sample(), EncodeFormat::Png, 75).unwrap();
        let err = decode(&png[..png.len() / 2]).unwrap_err();
        assert!(!matches!(err, ProcessingError::UnsupportedFormat(_)));
    }
}
