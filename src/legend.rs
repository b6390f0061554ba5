use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::catalog::ClassCatalog;
use crate::error::{Error, Result};
use crate::palette::{self, ColorAssignment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendRow {
    pub class_index: usize,
    pub label: String,
    pub color: palette::Rgb,
}

impl LegendRow {
    pub fn style(&self) -> String {
        self.color.css()
    }
}

/// One row per class index, in the order given.
pub fn build_legend(
    class_indices: &[usize],
    colors: &ColorAssignment,
    catalog: &ClassCatalog,
) -> Result<Vec<LegendRow>> {
    class_indices
        .iter()
        .map(|&index| {
            let label = catalog.name(index).ok_or_else(|| Error::CatalogMismatch {
                index,
                len: catalog.len(),
                dataset: catalog.dataset().to_string(),
            })?;
            Ok(LegendRow {
                class_index: index,
                label: label.to_string(),
                color: colors.color_or_fallback(index),
            })
        })
        .collect()
}

/// Plain-text table: label column and the CSS swatch of each row.
pub fn format_legend(rows: &[LegendRow]) -> String {
    let width = rows
        .iter()
        .map(|r| r.label.chars().count())
        .chain(std::iter::once("label".len()))
        .max()
        .unwrap_or(0);

    let mut out = format!("{:<width$}  {}\n", "label", "color", width = width);
    for row in rows {
        out.push_str(&format!(
            "{:<width$}  {} ({})\n",
            row.label,
            row.color,
            row.style(),
            width = width
        ));
    }
    out
}

const ROW_HEIGHT: u32 = 28;
const SWATCH_SIZE: u32 = 20;
const PADDING: u32 = 8;
const LEGEND_WIDTH: u32 = 280;

/// Legend as an image: a swatch and the class label per row.
pub fn render_legend(rows: &[LegendRow], font: Option<&FontArc>) -> RgbImage {
    let height = PADDING * 2 + ROW_HEIGHT * rows.len().max(1) as u32;
    let mut canvas = RgbImage::from_pixel(LEGEND_WIDTH, height, Rgb([255, 255, 255]));
    let scale = PxScale::from(18.0);

    for (i, row) in rows.iter().enumerate() {
        let y = (PADDING + i as u32 * ROW_HEIGHT) as i32;
        let swatch = Rect::at(PADDING as i32, y).of_size(SWATCH_SIZE, SWATCH_SIZE);
        draw_filled_rect_mut(&mut canvas, swatch, row.color.to_image_rgb());
        draw_hollow_rect_mut(&mut canvas, swatch, Rgb([0, 0, 0]));

        if let Some(font) = font {
            let x = (PADDING * 2 + SWATCH_SIZE) as i32;
            draw_text_mut(&mut canvas, Rgb([0, 0, 0]), x, y, scale, font, &row.label);
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{filter_detections, Detection};
    use crate::palette::ColorAllocator;
    use std::collections::HashSet;

    fn catalog() -> ClassCatalog {
        ClassCatalog::new("animals", ["Bird", "Cat", "Dog", "Monkey", "Squirrel"])
    }

    #[test]
    fn test_rows_follow_input_order() {
        let colors = ColorAllocator::default().allocate([0, 1, 2, 3, 4]);
        let rows = build_legend(&[3, 0], &colors, &catalog()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "Monkey");
        assert_eq!(rows[0].color, colors.get(3).unwrap());
        assert_eq!(rows[1].label, "Bird");
    }

    #[test]
    fn test_legend_matches_filtered_detections() {
        let requested = vec![2, 4, 1];
        let colors = ColorAllocator::default().allocate(requested.iter().copied());
        let detections = vec![
            Detection::new(0.0, 0.0, 5.0, 5.0, 0.9, 4),
            Detection::new(0.0, 0.0, 5.0, 5.0, 0.9, 0),
            Detection::new(0.0, 0.0, 5.0, 5.0, 0.9, 4),
            Detection::new(0.0, 0.0, 5.0, 5.0, 0.9, 2),
        ];
        let allowed: HashSet<usize> = requested.iter().copied().collect();
        let filtered = filter_detections(&detections, &allowed);

        let mut seen = Vec::new();
        for d in &filtered {
            if !seen.contains(&d.class_index) {
                seen.push(d.class_index);
            }
        }
        let rows = build_legend(&seen, &colors, &catalog()).unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(Some(row.color), colors.get(row.class_index));
        }
    }

    #[test]
    fn test_out_of_range_index() {
        let colors = ColorAllocator::default().allocate([9]);
        assert!(build_legend(&[9], &colors, &catalog()).is_err());
    }

    #[test]
    fn test_format_legend() {
        let colors = ColorAllocator::default().allocate([1]);
        let rows = build_legend(&[1], &colors, &catalog()).unwrap();
        let text = format_legend(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("label"));
        assert!(lines[1].starts_with("Cat"));
        assert!(lines[1].contains("background-color: rgb(31,119,180)"));
    }

    #[test]
    fn test_render_legend_swatches() {
        let colors = ColorAllocator::default().allocate([0, 1]);
        let rows = build_legend(&[0, 1], &colors, &catalog()).unwrap();
        let image = render_legend(&rows, None);
        assert_eq!(image.height(), PADDING * 2 + ROW_HEIGHT * 2);
        let inside = |i: u32| *image.get_pixel(PADDING + SWATCH_SIZE / 2, PADDING + i * ROW_HEIGHT + SWATCH_SIZE / 2);
        assert_eq!(inside(0), colors.get(0).unwrap().to_image_rgb());
        assert_eq!(inside(1), colors.get(1).unwrap().to_image_rgb());
    }

    #[test]
    fn test_render_empty_legend() {
        let image = render_legend(&[], None);
        assert_eq!(image.height(), PADDING * 2 + ROW_HEIGHT);
    }
}
