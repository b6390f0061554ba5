use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use ab_glyph::FontArc;

use crate::catalog::ClassCatalog;
use crate::error::Result;
use crate::legend::{format_legend, render_legend};
use crate::session::{ImageOutcome, Report};
use crate::sources::Upload;

pub const LEGEND_FILE: &str = "legend.png";

/// Write every rendered image as `<stem>_annotated.png` plus `legend.png`.
/// Returns the written paths, legend last.
pub fn save_report(report: &Report, output_dir: &Path, font: Option<&FontArc>) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let mut used = HashSet::new();
    let mut written = Vec::new();

    for rendered in report.rendered() {
        let stem = Upload::new(rendered.name.as_str(), Vec::new()).stem();
        let mut file_name = format!("{}_annotated.png", stem);
        let mut n = 1;
        while !used.insert(file_name.clone()) {
            file_name = format!("{}_{}_annotated.png", stem, n);
            n += 1;
        }
        let path = output_dir.join(file_name);
        rendered.image.save(&path)?;
        written.push(path);
    }

    let legend_path = output_dir.join(LEGEND_FILE);
    render_legend(&report.legend, font).save(&legend_path)?;
    written.push(legend_path);
    Ok(written)
}

/// Human-readable summary: per-image detections, failures and the legend table.
pub fn print_report<W: Write>(report: &Report, catalog: &ClassCatalog, out: &mut W) -> std::io::Result<()> {
    for outcome in &report.outcomes {
        match outcome {
            ImageOutcome::Rendered(rendered) => {
                let cached = if rendered.cached { " (cached)" } else { "" };
                writeln!(out, "{}: {} detections{}", rendered.name, rendered.detections.len(), cached)?;
                for det in &rendered.detections {
                    let ((x0, y0), (x1, y1)) = det.pixel_corners();
                    writeln!(
                        out,
                        "  Class: {}, Confidence: {:.2}%, Box: ({}, {}) - ({}, {})",
                        catalog.name(det.class_index).unwrap_or("?"),
                        det.confidence * 100.0,
                        x0,
                        y0,
                        x1,
                        y1
                    )?;
                }
            }
            ImageOutcome::Failed { message, .. } => writeln!(out, "{}", message)?,
        }
    }
    writeln!(out)?;
    write!(out, "{}", format_legend(&report.legend))?;
    Ok(())
}
