use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat, Luma};
use tracing::debug;

use crate::consts::PREVIEW_EXTENSION;
use crate::error::Result;
use crate::filters::resample::{crop_edges, downscale_mean};
use crate::filters::stretch::{auto_stretch, normalize};
use crate::frame::PixelGrid;
use crate::pipeline::config::PreviewConfig;
use crate::stack::Stack;

/// Produce the display version of a stack: edge crop, auto-stretch,
/// block-mean downscale, then remap to [0.0, 1.0].
pub fn render_preview(data: &PixelGrid, config: &PreviewConfig) -> PixelGrid {
    let cropped = crop_edges(data, config.crop);
    let stretched = auto_stretch(&cropped, config.target_background, config.shadows_clip);
    let smaller = downscale_mean(&stretched, config.downscale);
    normalize(&smaller)
}

/// Save a [0.0, 1.0] grid as an 8-bit grayscale PNG.
pub fn save_png(data: &PixelGrid, path: &Path) -> Result<()> {
    let (h, w) = data.dim();

    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in data.indexed_iter() {
        let val = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        img.put_pixel(col as u32, row as u32, Luma([val]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Render the preview of `stack` to `<output_dir>/<key>.png` and return
/// its path. The file is replaced atomically.
pub fn write_preview(stack: &Stack, output_dir: &Path, config: &PreviewConfig) -> Result<PathBuf> {
    let path = output_dir.join(format!("{}.{}", stack.key.file_stem(), PREVIEW_EXTENSION));
    let staging = path.with_extension(format!("{PREVIEW_EXTENSION}.tmp"));

    save_png(&render_preview(stack.data(), config), &staging)?;
    fs::rename(&staging, &path)?;

    debug!(
        key = %stack.key,
        path = %path.display(),
        "Preview written"
    );
    Ok(path)
}
