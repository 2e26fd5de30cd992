//! CPU-side pixels for file-backed and procedural surfaces

use std::path::Path;

use image::{DynamicImage, GenericImageView};

use crate::backend::TextureFormat;

/// Decoded pixel data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

impl ImageData {
    /// Decode an image file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let img = image::open(path.as_ref()).map_err(|e| e.to_string())?;
        Ok(Self::from_image(img))
    }

    /// Decode an in-memory image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
        Ok(Self::from_image(img))
    }

    fn from_image(img: DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            format: TextureFormat::Rgba8UnormSrgb,
            data: img.to_rgba8().into_raw(),
        }
    }

    /// Single-colour image of any size
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            format: TextureFormat::Rgba8Unorm,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_png_from_memory() {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .unwrap();

        let data = ImageData::from_bytes(bytes.get_ref()).unwrap();
        assert_eq!((data.width, data.height), (3, 2));
        assert_eq!(data.data.len(), 3 * 2 * 4);
        assert_eq!(&data.data[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(ImageData::from_file("does/not/exist.png").is_err());
    }
}
