//! Loading source images and bringing them to the frame geometry.

use crate::encode::Image;
use image::{imageops::FilterType, DynamicImage, GenericImageView, RgbImage};
use snafu::{ensure, ResultExt, Snafu};
use std::path::Path;

#[derive(Debug, Snafu)]
pub enum SourceError {
    #[snafu(display("Failed to open source image"))]
    Open { source: image::ImageError },
    #[snafu(display(
        "A {width}x{height} crop at ({x}, {y}) doesn't fit the {image_width}x{image_height} image"
    ))]
    CropOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[snafu(display("Target geometry {width}x{height} is empty"))]
    EmptyGeometry { width: u32, height: u32 },
}

/// Target size of the encoded image.
///
/// Without a crop origin the whole source is resized to `width`x`height`, with one the
/// `width`x`height` window at that origin is cut out unscaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub crop_origin: Option<(u32, u32)>,
}

impl Geometry {
    pub const fn resize(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            crop_origin: None,
        }
    }

    pub const fn crop(width: u32, height: u32, x: u32, y: u32) -> Self {
        Self {
            width,
            height,
            crop_origin: Some((x, y)),
        }
    }
}

impl From<RgbImage> for Image {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels = image.pixels().map(|p| p.0).collect();
        Image {
            width,
            height,
            pixels,
        }
    }
}

impl Image {
    pub fn into_rgb_image(self) -> RgbImage {
        let (width, height) = (self.width, self.height);
        let raw = self.into_pixels().into_iter().flatten().collect();
        // The buffer holds exactly width * height pixels.
        RgbImage::from_raw(width, height, raw).unwrap_or_else(|| RgbImage::new(width, height))
    }
}

/// Brings `image` to `geometry`, by resizing or cropping.
pub fn prepare(image: &DynamicImage, geometry: &Geometry) -> Result<Image, SourceError> {
    let Geometry {
        width,
        height,
        crop_origin,
    } = *geometry;
    ensure!(
        width != 0 && height != 0,
        EmptyGeometrySnafu { width, height }
    );

    let (image_width, image_height) = image.dimensions();
    let rgb = match crop_origin {
        Some((x, y)) => {
            let fits = |origin: u32, extent: u32, limit: u32| {
                origin
                    .checked_add(extent)
                    .map(|end| end <= limit)
                    .unwrap_or(false)
            };
            ensure!(
                fits(x, width, image_width) && fits(y, height, image_height),
                CropOutOfBoundsSnafu {
                    x,
                    y,
                    width,
                    height,
                    image_width,
                    image_height
                }
            );

            log::debug!("Cropping {width}x{height} at ({x}, {y}) from {image_width}x{image_height}");
            image.crop_imm(x, y, width, height).into_rgb8()
        }
        None => {
            log::debug!("Resizing {image_width}x{image_height} to {width}x{height}");
            image
                .resize_exact(width, height, FilterType::CatmullRom)
                .into_rgb8()
        }
    };

    Ok(rgb.into())
}

/// Opens the image at `path` and brings it to `geometry`.
pub fn load(path: impl AsRef<Path>, geometry: &Geometry) -> Result<Image, SourceError> {
    let image = image::open(path).context(OpenSnafu)?;
    prepare(&image, geometry)
}
