use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::RgbImage;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::catalog::ClassCatalog;
use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::palette::ColorAssignment;

pub const STROKE_WIDTH: u32 = 2;
pub const LABEL_SCALE: f32 = 24.0;
/// Gap between the bottom of a label and the top edge of its box.
pub const LABEL_MARGIN: i32 = 5;

const SYSTEM_FONTS: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub fn load_font(path: &Path) -> Result<FontArc> {
    let data = std::fs::read(path)?;
    FontArc::try_from_vec(data)
        .map_err(|e| Error::Config(format!("invalid font {}: {}", path.display(), e)))
}

/// First common TrueType font present on this machine.
pub fn find_system_font() -> Option<PathBuf> {
    SYSTEM_FONTS.iter().map(PathBuf::from).find(|p| p.is_file())
}

/// Draws detection boxes and class labels onto a copy of an image.
pub struct Annotator {
    font: Option<FontArc>,
    scale: PxScale,
    stroke_width: u32,
}

impl Annotator {
    pub fn new(font: Option<FontArc>) -> Self {
        if font.is_none() {
            log::warn!("No font available, class labels will not be drawn");
        }
        Self {
            font,
            scale: PxScale::from(LABEL_SCALE),
            stroke_width: STROKE_WIDTH,
        }
    }

    /// Use `path` if given, otherwise the first system font found.
    pub fn from_font_path(path: Option<&Path>) -> Result<Self> {
        let font = match path {
            Some(path) => Some(load_font(path)?),
            None => match find_system_font() {
                Some(path) => {
                    log::debug!("Using system font {}", path.display());
                    Some(load_font(&path)?)
                }
                None => None,
            },
        };
        Ok(Self::new(font))
    }

    pub fn font(&self) -> Option<&FontArc> {
        self.font.as_ref()
    }

    /// Render `detections` in the given order. The input image is left untouched.
    pub fn annotate(
        &self,
        image: &RgbImage,
        detections: &[Detection],
        colors: &ColorAssignment,
        catalog: &ClassCatalog,
    ) -> Result<RgbImage> {
        let mut canvas = image.clone();

        for det in detections {
            let name = catalog.name(det.class_index).ok_or_else(|| Error::CatalogMismatch {
                index: det.class_index,
                len: catalog.len(),
                dataset: catalog.dataset().to_string(),
            })?;
            let color = colors.color_or_fallback(det.class_index).to_image_rgb();

            // Corners are clamped just past the canvas so off-canvas rings stay off it.
            let pad = self.stroke_width as i32;
            let (canvas_w, canvas_h) = (canvas.width() as i32, canvas.height() as i32);
            let ((x0, y0), (x1, y1)) = det.pixel_corners();
            let (x0, x1) = (x0.clamp(-pad, canvas_w - 1 + pad), x1.clamp(-pad, canvas_w - 1 + pad));
            let (y0, y1) = (y0.clamp(-pad, canvas_h - 1 + pad), y1.clamp(-pad, canvas_h - 1 + pad));
            let (left, right) = (x0.min(x1), x0.max(x1));
            let (top, bottom) = (y0.min(y1), y0.max(y1));

            // Inner rings shrink by one pixel per step of stroke width.
            for k in 0..self.stroke_width as i32 {
                let width = right - left + 1 - 2 * k;
                let height = bottom - top + 1 - 2 * k;
                if width <= 0 || height <= 0 {
                    break;
                }
                let rect = Rect::at(left + k, top + k).of_size(width as u32, height as u32);
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }

            if let Some(font) = &self.font {
                let (_, text_h) = text_size(self.scale, font, name);
                let text_y = top.saturating_sub(LABEL_MARGIN).saturating_sub(text_h as i32).max(0);
                draw_text_mut(&mut canvas, color, left, text_y, self.scale, font, name);
            }
        }

        Ok(canvas)
    }
}
