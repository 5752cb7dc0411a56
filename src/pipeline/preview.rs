/// One-shot rendering of an annotated frame, as shown by a viewer.
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::GrayImage;

use super::resize::TargetSize;
use super::scale_bar::add_scale_bar;
use crate::data::volume::{load_volume, Volume, VoxelUnit};
use crate::error::{ConvertError, EncodeError};
use crate::log::reproducibility::ReproLog;

/// Preview canvas used when no size is given.
pub const DEFAULT_PREVIEW_SIZE: (u32, u32) = (500, 500);

#[derive(Debug, Clone)]
pub struct PreviewRequest {
    pub input: PathBuf,
    pub frame: usize,
    pub size: Option<TargetSize>,
    /// Replaces the pixel size read from the header
    pub pixel_size_nm: Option<f64>,
    pub voxel_unit: VoxelUnit,
    pub output: PathBuf,
}

/// Normalize frame `index`, burn in the scale bar at the volume's own
/// pixel size, then scale the result to `size` with Lanczos-3.
pub fn render_preview(
    volume: &Volume,
    index: usize,
    size: TargetSize,
) -> Result<GrayImage, ConvertError> {
    let frame = volume.frame(index).ok_or(ConvertError::FrameOutOfRange {
        index,
        count: volume.len(),
    })?;
    let annotated = add_scale_bar(&frame.to_gray8(), volume.pixel_size_nm())?;
    Ok(imageops::resize(
        &annotated,
        size.width(),
        size.height(),
        FilterType::Lanczos3,
    ))
}

pub fn save_png(image: &GrayImage, path: &Path) -> Result<(), ConvertError> {
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| ConvertError::write(path, EncodeError::from(e)))
}

/// Load, render and save the frame named by `request`.
pub fn write_preview(request: &PreviewRequest, log: &mut ReproLog) -> Result<PathBuf, ConvertError> {
    let mut volume = load_volume(&request.input, request.voxel_unit)?;
    if let Some(px) = request.pixel_size_nm {
        volume.set_pixel_size_nm(px);
    }
    let size = match request.size {
        Some(size) => size,
        None => TargetSize::new(DEFAULT_PREVIEW_SIZE.0, DEFAULT_PREVIEW_SIZE.1)?,
    };

    let image = render_preview(&volume, request.frame, size)?;
    save_png(&image, &request.output)?;

    log.add_entry(
        "Preview",
        &format!(
            "frame {} of {} at {} -> {}",
            request.frame,
            request.input.display(),
            size,
            request.output.display()
        ),
        "",
    );
    log::info!("Preview written to {}", request.output.display());
    Ok(request.output.clone())
}
