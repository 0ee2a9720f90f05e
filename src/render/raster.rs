//! PNG and WebP writers.
//!
//! Both draw the same RGBA image buffer and differ only in the codec.

use super::{label, Canvas, Renderer};
use crate::config::Color;
use crate::error::EncodeError;
use crate::writer::{WriterFormat, WriterOptions};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Rgba, RgbaImage};

/// Writes PNG images.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngRenderer;

/// Writes lossless WebP images.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebPRenderer;

impl Renderer for PngRenderer {
    fn format(&self) -> WriterFormat {
        WriterFormat::Png
    }

    fn render(&self, canvas: &Canvas<'_>, options: &WriterOptions) -> Result<Vec<u8>, EncodeError> {
        let compression = compression_for(options.int("compression_level").unwrap_or(-1))?;
        let img = draw(canvas)?;
        encode_png(&img, compression)
    }

    fn validate(&self, rendered: &[u8], canvas: &Canvas<'_>) -> Result<(), EncodeError> {
        verify(rendered, canvas)
    }
}

impl Renderer for WebPRenderer {
    fn format(&self) -> WriterFormat {
        WriterFormat::WebP
    }

    fn render(&self, canvas: &Canvas<'_>, options: &WriterOptions) -> Result<Vec<u8>, EncodeError> {
        let quality = options.int("quality").unwrap_or(80);
        if !(0..=100).contains(&quality) {
            return Err(format!("webp quality must be between 0 and 100, got {quality}").into());
        }
        let img = draw(canvas)?;

        // The bundled WebP codec is lossless, so `quality` only gates the range.
        let mut bytes = Vec::new();
        WebPEncoder::new_lossless(&mut bytes).write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgba8,
        )?;
        Ok(bytes)
    }

    fn validate(&self, rendered: &[u8], canvas: &Canvas<'_>) -> Result<(), EncodeError> {
        verify(rendered, canvas)
    }
}

/// Maps the zlib-style level (-1 = default, 0..=9) onto the codec presets.
fn compression_for(level: i64) -> Result<CompressionType, EncodeError> {
    match level {
        -1 | 4..=6 => Ok(CompressionType::Default),
        0..=3 => Ok(CompressionType::Fast),
        7..=9 => Ok(CompressionType::Best),
        _ => Err(format!("png compression_level must be between -1 and 9, got {level}").into()),
    }
}

pub(crate) fn encode_png(img: &RgbaImage, compression: CompressionType) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut bytes, compression, FilterType::Adaptive);
    encoder.write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)?;
    Ok(bytes)
}

fn pixel(color: Color) -> Rgba<u8> {
    Rgba(color.to_array())
}

/// Draws the symbol, logo and label into an RGBA buffer.
pub(crate) fn draw(canvas: &Canvas<'_>) -> Result<RgbaImage, EncodeError> {
    let layout = canvas.layout();
    let matrix = canvas.matrix();
    let outer = layout.outer_size();
    let dark = pixel(canvas.foreground());
    let light = pixel(canvas.background());

    let mut img: RgbaImage = ImageBuffer::from_pixel(canvas.width(), canvas.height(), light);
    for (x, y, px) in img.enumerate_pixels_mut() {
        if y >= outer {
            continue;
        }
        if let (Some(mx), Some(my)) = (layout.module_at(x), layout.module_at(y)) {
            if matrix.is_dark(mx, my) {
                *px = dark;
            }
        }
    }

    if let (Some(logo), Some((left, top))) = (canvas.logo(), canvas.logo_origin()) {
        if logo.punchout() {
            for y in top..(top + logo.image().height()).min(outer) {
                for x in left..(left + logo.image().width()).min(outer) {
                    img.put_pixel(x, y, light);
                }
            }
        }
        image::imageops::overlay(&mut img, logo.image(), i64::from(left), i64::from(top));
    }

    if let Some(spec) = canvas.label() {
        let strip = label::rasterize(canvas, spec)?;
        image::imageops::overlay(&mut img, &strip, 0, i64::from(outer));
    }

    Ok(img)
}

/// Reads a rendered raster back and compares every module centre with the matrix.
///
/// Modules hidden by the logo are skipped.
fn verify(rendered: &[u8], canvas: &Canvas<'_>) -> Result<(), EncodeError> {
    let img = image::load_from_memory(rendered)?.to_rgba8();
    let layout = canvas.layout();
    let matrix = canvas.matrix();
    let (fg, bg) = (canvas.foreground(), canvas.background());

    let mut mismatches = 0usize;
    for my in 0..matrix.size() {
        for mx in 0..matrix.size() {
            let cx = layout.module_offset(mx) + layout.block_size() / 2.0;
            let cy = layout.module_offset(my) + layout.block_size() / 2.0;
            if canvas.covered_by_logo(cx, cy) {
                continue;
            }
            let Some(sample) = img.get_pixel_checked(cx as u32, cy as u32) else {
                mismatches += 1;
                continue;
            };
            let looks_dark = distance(sample, fg) < distance(sample, bg);
            if looks_dark != matrix.is_dark(mx, my) {
                mismatches += 1;
            }
        }
    }

    if mismatches > 0 {
        return Err(format!(
            "built result does not match the encoded data: {mismatches} modules differ"
        )
        .into());
    }
    tracing::debug!(modules = matrix.size() * matrix.size(), "raster result validated");
    Ok(())
}

fn distance(sample: &Rgba<u8>, color: Color) -> u32 {
    sample
        .0
        .iter()
        .zip(color.to_array())
        .map(|(a, b)| u32::from(a.abs_diff(b)))
        .sum()
}
