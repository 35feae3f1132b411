use std::fs;
use std::io::Cursor;
use std::path::Path;

use anyhow::Result;
use image::{DynamicImage, ImageFormat, RgbaImage};

use super::path::ensure_output_dir;
use crate::cli::CompressionLevel;
use crate::config::{AlphaMode, OutputFormat};
use crate::error::SpineshotError;

/// Encode a rendered frame into `format`.
///
/// Opaque output drops the alpha channel. PNG output is optionally
/// recompressed with oxipng. `path` is only used in error messages.
pub fn encode_frame(
    image: RgbaImage,
    format: OutputFormat,
    alpha: AlphaMode,
    compress: Option<CompressionLevel>,
    path: &Path,
) -> Result<Vec<u8>> {
    let image_format = match format {
        OutputFormat::Png => ImageFormat::Png,
        OutputFormat::WebP => ImageFormat::WebP,
    };

    let mut encoded = Cursor::new(Vec::new());
    let image = DynamicImage::ImageRgba8(image);
    let result = if alpha.keeps_alpha() {
        image.write_to(&mut encoded, image_format)
    } else {
        DynamicImage::ImageRgb8(image.into_rgb8()).write_to(&mut encoded, image_format)
    };
    result.map_err(|e| SpineshotError::ImageEncode {
        path: path.to_path_buf(),
        source: e,
    })?;

    match (format, compress) {
        (OutputFormat::Png, Some(level)) => {
            let opts = match level {
                CompressionLevel::Level(n) => oxipng::Options::from_preset(n),
                CompressionLevel::Max => oxipng::Options::max_compression(),
            };
            let compressed = oxipng::optimize_from_memory(&encoded.into_inner(), &opts)
                .map_err(|e| SpineshotError::PngCompress {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            Ok(compressed)
        }
        _ => Ok(encoded.into_inner()),
    }
}

/// Encode a frame and write it to `path`, creating its directory if needed.
pub fn save_frame(
    image: RgbaImage,
    path: &Path,
    format: OutputFormat,
    alpha: AlphaMode,
    compress: Option<CompressionLevel>,
) -> Result<()> {
    let data = encode_frame(image, format, alpha, compress, path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_output_dir(parent)?;
    }
    fs::write(path, data).map_err(|e| SpineshotError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::TempDir;
    use image::{ColorType, Rgba};

    fn checker() -> RgbaImage {
        RgbaImage::from_fn(6, 4, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 128])
            }
        })
    }

    fn decode(data: &[u8]) -> DynamicImage {
        image::load_from_memory(data).unwrap()
    }

    #[test]
    fn test_png_keeps_alpha() {
        let data = encode_frame(
            checker(),
            OutputFormat::Png,
            AlphaMode::Straight,
            None,
            Path::new("a.png"),
        )
        .unwrap();
        let image = decode(&data);
        assert_eq!(image.color(), ColorType::Rgba8);
        assert_eq!(image.to_rgba8(), checker());
    }

    #[test]
    fn test_opaque_png_is_rgb() {
        let data = encode_frame(
            checker(),
            OutputFormat::Png,
            AlphaMode::Opaque,
            None,
            Path::new("a.png"),
        )
        .unwrap();
        let image = decode(&data);
        assert_eq!(image.color(), ColorType::Rgb8);
        assert_eq!((image.width(), image.height()), (6, 4));
    }

    #[test]
    fn test_webp_output() {
        let data = encode_frame(
            checker(),
            OutputFormat::WebP,
            AlphaMode::Straight,
            None,
            Path::new("a.webp"),
        )
        .unwrap();
        assert_eq!(&data[..4], b"RIFF");
        assert_eq!(&data[8..12], b"WEBP");
        assert_eq!(decode(&data).to_rgba8(), checker());
    }

    #[test]
    fn test_compressed_png_decodes_to_same_pixels() {
        let data = encode_frame(
            checker(),
            OutputFormat::Png,
            AlphaMode::Straight,
            Some(CompressionLevel::Level(2)),
            Path::new("a.png"),
        )
        .unwrap();
        assert_eq!(decode(&data).to_rgba8(), checker());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let encode = || {
            encode_frame(
                checker(),
                OutputFormat::Png,
                AlphaMode::Opaque,
                None,
                Path::new("a.png"),
            )
            .unwrap()
        };
        assert_eq!(encode(), encode());
    }

    #[test]
    fn test_missing_parent_is_created() {
        let dir = TempDir::new("format_parent");
        let path = dir.path().join("shots").join("idle").join("a.png");
        save_frame(checker(), &path, OutputFormat::Png, AlphaMode::Straight, None).unwrap();
        assert_eq!(image::open(&path).unwrap().to_rgba8(), checker());
    }

    #[test]
    fn test_write_failure() {
        let dir = TempDir::new("format_write");
        dir.write("blocker", b"");
        let path = dir.path().join("blocker").join("a.png");
        let err = save_frame(checker(), &path, OutputFormat::Png, AlphaMode::Opaque, None)
            .unwrap_err();
        let kind = err.downcast_ref::<SpineshotError>().map(SpineshotError::kind);
        assert_eq!(kind, Some(ErrorKind::EncodeOrWrite));
    }
}
