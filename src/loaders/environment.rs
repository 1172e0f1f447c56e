use std::path::Path;

use image::ImageReader;

use super::radiance::{RadianceGenerator, RadianceMap};
use crate::error::AssetError;

/// Decoded high dynamic range image, RGBA32F
#[derive(Debug, Clone)]
pub struct HdrImage {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<[f32; 4]>,
}

/// Decode an equirectangular `.exr` or `.hdr` file
pub fn decode_equirectangular(path: &Path) -> Result<HdrImage, AssetError> {
    let reader = ImageReader::open(path)
        .map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let image = reader
        .decode()
        .map_err(|e| AssetError::decode(path, e))?
        .into_rgba32f();

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(AssetError::EmptyImage {
            path: path.to_path_buf(),
        });
    }

    log::info!("Decoded environment map {:?} ({}x{})", path, width, height);

    Ok(HdrImage {
        width,
        height,
        texels: image.pixels().map(|p| p.0).collect(),
    })
}

/// Decode an environment map and convert it to a pre-filtered radiance map.
/// The conversion generator is released before returning.
pub fn load_environment(path: &Path) -> Result<RadianceMap, AssetError> {
    let image = decode_equirectangular(path)?;

    let mut generator = RadianceGenerator::new();
    let map = generator
        .from_equirectangular(image.width, image.height, image.texels)
        .map_err(|e| AssetError::decode(path, e))?;
    generator.dispose();

    log::debug!(
        "Radiance map for {:?}: {} levels, base {}x{}",
        path,
        map.mip_count(),
        map.base().width,
        map.base().height
    );

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_io_error() {
        let err = load_environment(Path::new("/nonexistent/login.exr")).unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
    }

    #[test]
    fn garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.hdr");
        std::fs::write(&path, b"definitely not radiance data").unwrap();

        let err = load_environment(&path).unwrap_err();
        assert!(matches!(err, AssetError::Decode { .. }));
    }

    #[test]
    fn decodes_radiance_hdr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sky.hdr");

        let (w, h) = (32u32, 16u32);
        let pixels: Vec<image::Rgb<f32>> = (0..w * h).map(|_| image::Rgb([0.5, 1.0, 2.0])).collect();
        let file = std::fs::File::create(&path).unwrap();
        image::codecs::hdr::HdrEncoder::new(file)
            .encode(&pixels, w as usize, h as usize)
            .unwrap();

        let map = load_environment(&path).unwrap();
        assert_eq!(map.base().width, w);
        assert_eq!(map.base().height, h);
        let texel = map.base().texels[0];
        assert!((texel[2] - 2.0).abs() < 0.05);
    }

    #[test]
    fn uppercase_exr_extension_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("login.EXR");

        let image = image::Rgb32FImage::from_pixel(16, 8, image::Rgb([0.25, 0.5, 4.0]));
        image::DynamicImage::ImageRgb32F(image)
            .save_with_format(&path, image::ImageFormat::OpenExr)
            .unwrap();

        let map = load_environment(&path).unwrap();
        assert_eq!(map.base().width, 16);
        assert_eq!(map.base().height, 8);
        assert!((map.base().texels[0][2] - 4.0).abs() < 1e-3);
    }
}
