use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::RgbaImage;

use islandtrace::{Canvas, PixelFormat};

/// reference image scaled to the canvas, as opaque ARGB8888 words
pub struct Reference {
    pub pixels: Vec<u32>,
    pub source_width: u32,
    pub source_height: u32,
}

/// load an image file, resize it to `canvas` and convert it to ARGB8888
pub fn load_reference(path: &Path, canvas: Canvas) -> Result<Reference> {
    profiling::scope!("load_reference");
    let img = image::open(path).with_context(|| format!("failed to open reference image {}", path.display()))?;
    let (source_width, source_height) = (img.width(), img.height());

    let rgba = if (source_width, source_height) == (canvas.width, canvas.height) {
        img.to_rgba8()
    } else {
        img.resize_exact(canvas.width, canvas.height, FilterType::Triangle).to_rgba8()
    };

    Ok(Reference { pixels: rgba_to_argb(rgba.as_raw()), source_width, source_height })
}

/// straight RGBA bytes to opaque ARGB words. translucent pixels are
/// flattened over black, the same background the renderer starts from.
pub fn rgba_to_argb(bytes: &[u8]) -> Vec<u32> {
    let fmt = PixelFormat::ARGB8888;
    bytes
        .chunks_exact(4)
        .map(|p| {
            let a = p[3] as u32;
            let flat = |c: u8| ((c as u32 * a + 127) / 255) as u8;
            fmt.compose([flat(p[0]), flat(p[1]), flat(p[2]), 255])
        })
        .collect()
}

/// ARGB words to an RGBA image buffer
pub fn argb_to_image(pixels: &[u32], canvas: Canvas) -> Result<RgbaImage> {
    anyhow::ensure!(
        pixels.len() == canvas.pixel_count(),
        "pixel buffer holds {} pixels, canvas needs {}",
        pixels.len(),
        canvas.pixel_count()
    );
    let fmt = PixelFormat::ARGB8888;
    let bytes: Vec<u8> = pixels.iter().flat_map(|&px| fmt.decompose(px)).collect();
    RgbaImage::from_raw(canvas.width, canvas.height, bytes)
        .context("pixel buffer does not match the canvas size")
}

pub fn save_png(pixels: &[u32], canvas: Canvas, path: &Path) -> Result<()> {
    argb_to_image(pixels, canvas)?
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}
