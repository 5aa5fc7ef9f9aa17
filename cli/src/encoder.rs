// Image acquisition and JPEG encoding backed by the `image` crate.

use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use picker_kernel::gallery::{AcquiredImage, EncodeError, ImageEncoder, ImageSource};

/// Decode an image file as if it had been picked from `source`.
pub fn acquire(path: &Path, source: ImageSource) -> Result<AcquiredImage<DynamicImage>> {
    let image = image::open(path).with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(AcquiredImage {
        width: image.width(),
        height: image.height(),
        image,
        source,
    })
}

/// Resizes to the requested geometry and writes baseline JPEG.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegWriter;

impl ImageEncoder<DynamicImage> for JpegWriter {
    fn encode(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        quality: u8,
    ) -> Result<Vec<u8>, EncodeError> {
        let resized = image
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb8();

        let mut out = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
            encoder
                .encode_image(&resized)
                .map_err(|e| EncodeError(e.to_string()))?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    #[test]
    fn output_is_jpeg_at_requested_size() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 20, Rgba([200, 10, 10, 255])));

        let bytes = JpegWriter.encode(&source, 20, 10, 90).unwrap();

        assert_eq!(&bytes[..2], &[0xff, 0xd8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (20, 10));
    }

    #[test]
    fn acquire_reads_dimensions_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("photo.png");
        RgbaImage::from_pixel(8, 6, Rgba([0, 0, 0, 255])).save(&path).unwrap();

        let acquired = acquire(&path, ImageSource::Camera).unwrap();

        assert_eq!((acquired.width, acquired.height), (8, 6));
        assert_eq!(acquired.source, ImageSource::Camera);
    }
}
