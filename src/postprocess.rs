use std::cmp::Reverse;
use std::collections::HashMap;

use ndarray::{Array, Axis, Ix3, IxDyn};
use ordered_float::OrderedFloat;

use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::preprocess::Letterbox;

#[derive(Debug, Clone)]
pub struct PostprocessConfig {
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 1000,
        }
    }
}

/// Index of the best class score and the score itself.
pub fn argmax_and_max(scores: &[f32]) -> (usize, f32) {
    scores
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(max_idx, max_val), (i, &val)| {
            if val > max_val { (i, val) } else { (max_idx, max_val) }
        })
}

/// Decode one image of a YOLOv5 output of shape `(batch, boxes, 5 + classes)`.
///
/// Each row is `cx, cy, w, h, objectness, class scores...`; the confidence of a
/// row is objectness times its best class score. Boxes stay in input-tensor
/// coordinates.
pub fn decode_predictions(
    output: &Array<f32, IxDyn>,
    batch_index: usize,
    conf_threshold: f32,
) -> Result<Vec<Detection>> {
    let output = output.view().into_dimensionality::<Ix3>()?;
    let (batch, _, row_len) = output.dim();
    if batch_index >= batch {
        return Err(Error::ModelOutput(format!(
            "batch index {} out of range for output with batch size {}",
            batch_index, batch
        )));
    }
    if row_len < 6 {
        return Err(Error::ModelOutput(format!(
            "expected rows of at least 6 values, got {}",
            row_len
        )));
    }

    let rows = output.index_axis(Axis(0), batch_index);
    let mut detections = Vec::new();
    for row in rows.axis_iter(Axis(0)) {
        let objectness = row[4];
        if objectness < conf_threshold {
            continue;
        }
        let scores: Vec<f32> = row.iter().skip(5).copied().collect();
        let (class_index, class_score) = argmax_and_max(&scores);
        let confidence = objectness * class_score;
        if confidence < conf_threshold {
            continue;
        }
        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        detections.push(Detection::new(
            cx - w / 2.0,
            cy - h / 2.0,
            cx + w / 2.0,
            cy + h / 2.0,
            confidence,
            class_index,
        ));
    }
    Ok(detections)
}

/// Intersection over union of two corner-format boxes.
pub fn compute_iou(b1: &Detection, b2: &Detection) -> f32 {
    let inter_x1 = b1.xmin.max(b2.xmin);
    let inter_y1 = b1.ymin.max(b2.ymin);
    let inter_x2 = b1.xmax.min(b2.xmax);
    let inter_y2 = b1.ymax.min(b2.ymax);

    let inter_area = ((inter_x2 - inter_x1).max(0.0)) * ((inter_y2 - inter_y1).max(0.0));
    let area1 = b1.width().max(0.0) * b1.height().max(0.0);
    let area2 = b2.width().max(0.0) * b2.height().max(0.0);
    let union_area = area1 + area2 - inter_area;
    if union_area <= 0.0 { 0.0 } else { inter_area / union_area }
}

/// Class-aware NMS. The survivors come back sorted by confidence, highest first.
pub fn non_maximum_suppression(detections: Vec<Detection>, iou_threshold: f32, max_detections: usize) -> Vec<Detection> {
    let mut by_class: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, det) in detections.iter().enumerate() {
        by_class.entry(det.class_index).or_default().push(i);
    }

    let mut keep_indices: Vec<usize> = Vec::new();

    for indices in by_class.values_mut() {
        indices.sort_by_key(|&i| Reverse(OrderedFloat(detections[i].confidence)));

        let mut suppressed = vec![false; indices.len()];
        for i in 0..indices.len() {
            if suppressed[i] {
                continue;
            }
            let idx_i = indices[i];
            keep_indices.push(idx_i);
            for j in (i + 1)..indices.len() {
                if suppressed[j] {
                    continue;
                }
                let idx_j = indices[j];
                if compute_iou(&detections[idx_i], &detections[idx_j]) > iou_threshold {
                    suppressed[j] = true;
                }
            }
        }
    }

    // Ties keep their original order.
    keep_indices.sort_by_key(|&i| (Reverse(OrderedFloat(detections[i].confidence)), i));
    keep_indices.truncate(max_detections);
    keep_indices.iter().map(|&i| detections[i]).collect()
}

/// Move boxes from input-tensor coordinates back onto the original image.
pub fn restore_boxes(detections: &mut [Detection], letterbox: &Letterbox) {
    for det in detections.iter_mut() {
        let (xmin, ymin) = letterbox.restore(det.xmin, det.ymin);
        let (xmax, ymax) = letterbox.restore(det.xmax, det.ymax);
        det.xmin = xmin;
        det.ymin = ymin;
        det.xmax = xmax;
        det.ymax = ymax;
    }
}

/// Full YOLOv5 postprocessing for one image of the batch.
pub fn postprocess(
    output: &Array<f32, IxDyn>,
    batch_index: usize,
    letterbox: &Letterbox,
    config: &PostprocessConfig,
) -> Result<Vec<Detection>> {
    let candidates = decode_predictions(output, batch_index, config.conf_threshold)?;
    let mut detections = non_maximum_suppression(candidates, config.iou_threshold, config.max_detections);
    restore_boxes(&mut detections, letterbox);
    Ok(detections)
}
