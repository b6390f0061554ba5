use rayon::prelude::*;
use image::{DynamicImage, RgbImage};
use fast_image_resize::images::Image;
use fast_image_resize::{PixelType, ResizeAlg, ResizeOptions, Resizer};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub height: u32,
    pub width: u32,
    /// Value of the letterbox border on every channel.
    pub pad_value: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            height: 640,
            width: 640,
            pad_value: 114,
        }
    }
}

/// Where the original image ended up inside the letterboxed input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub orig_width: u32,
    pub orig_height: u32,
}

impl Letterbox {
    /// Map a point of the letterboxed input back to original pixel coordinates,
    /// clipped to the original image.
    pub fn restore(&self, x: f32, y: f32) -> (f32, f32) {
        let x = (x - self.x_offset as f32) / self.scale;
        let y = (y - self.y_offset as f32) / self.scale;
        (
            x.clamp(0.0, self.orig_width as f32),
            y.clamp(0.0, self.orig_height as f32),
        )
    }
}

#[derive(Debug)]
pub struct Processor {
    pub config: PreprocessConfig,
}

impl Processor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    fn resize(&self, image: &RgbImage, new_width: u32, new_height: u32) -> Result<RgbImage> {
        let src = DynamicImage::ImageRgb8(image.clone());
        let mut dst = Image::new(new_width, new_height, PixelType::U8x3);
        let options = ResizeOptions::new().resize_alg(ResizeAlg::Nearest);
        Resizer::new()
            .resize(&src, &mut dst, Some(&options))
            .map_err(|e| Error::Resize(e.to_string()))?;
        RgbImage::from_raw(new_width, new_height, dst.into_vec())
            .ok_or_else(|| Error::Resize("resized buffer has the wrong size".to_string()))
    }

    /// Letterbox one image: aspect-preserving resize, centred on a padded canvas.
    pub fn letterbox(&self, image: &RgbImage) -> Result<(RgbImage, Letterbox)> {
        let (orig_width, orig_height) = image.dimensions();
        if orig_width == 0 || orig_height == 0 {
            return Err(Error::Resize("image has no pixels".to_string()));
        }
        let scale = (self.config.width as f32 / orig_width as f32)
            .min(self.config.height as f32 / orig_height as f32);
        let new_width = ((orig_width as f32 * scale) as u32).clamp(1, self.config.width);
        let new_height = ((orig_height as f32 * scale) as u32).clamp(1, self.config.height);

        let resized = self.resize(image, new_width, new_height)?;

        let pad = self.config.pad_value;
        let mut padded = RgbImage::from_pixel(self.config.width, self.config.height, image::Rgb([pad, pad, pad]));
        let x_offset = (self.config.width - new_width) / 2;
        let y_offset = (self.config.height - new_height) / 2;
        image::imageops::overlay(&mut padded, &resized, x_offset as i64, y_offset as i64);

        Ok((
            padded,
            Letterbox {
                scale,
                x_offset,
                y_offset,
                orig_width,
                orig_height,
            },
        ))
    }

    /// Letterbox every image and stack them into an NCHW tensor scaled to [0, 1].
    pub fn preprocess(&self, xs: &[RgbImage]) -> Result<(ndarray::Array<f32, ndarray::IxDyn>, Vec<Letterbox>)> {
        let (height, width) = (self.config.height as usize, self.config.width as usize);
        let ys_vec = xs
            .par_iter()
            .map(|x| -> Result<(ndarray::Array3<f32>, Letterbox)> {
                let t = std::time::Instant::now();
                let (padded, letterbox) = self.letterbox(x)?;
                let mut img_arr = ndarray::Array3::<f32>::zeros((3, height, width));
                for (x, y, rgb) in padded.enumerate_pixels() {
                    let (x, y) = (x as usize, y as usize);
                    img_arr[[0, y, x]] = rgb[0] as f32 / 255.0;
                    img_arr[[1, y, x]] = rgb[1] as f32 / 255.0;
                    img_arr[[2, y, x]] = rgb[2] as f32 / 255.0;
                }
                log::debug!("[preprocessing]: {:?}", t.elapsed());
                Ok((img_arr, letterbox))
            })
            .collect::<Result<Vec<_>>>()?;

        let (img_arrs, letterboxes): (Vec<_>, Vec<_>) = ys_vec.into_iter().unzip();
        let views: Vec<_> = img_arrs.iter().map(|arr| arr.view()).collect();
        let ys = ndarray::stack(ndarray::Axis(0), &views)?.into_dyn();

        Ok((ys, letterboxes))
    }
}
