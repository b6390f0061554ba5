use std::collections::HashSet;

/// One predicted object: an axis-aligned box in pixel coordinates of the
/// original image, a confidence score and a class index into the catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    pub confidence: f32,
    pub class_index: usize,
}

impl Detection {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32, confidence: f32, class_index: usize) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            confidence,
            class_index,
        }
    }

    /// Corner points truncated toward zero, `((xmin, ymin), (xmax, ymax))`.
    pub fn pixel_corners(&self) -> ((i32, i32), (i32, i32)) {
        (
            (self.xmin as i32, self.ymin as i32),
            (self.xmax as i32, self.ymax as i32),
        )
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }
}

/// Keep the detections whose class is in `allowed`, in their original order.
pub fn filter_detections(detections: &[Detection], allowed: &HashSet<usize>) -> Vec<Detection> {
    detections
        .iter()
        .filter(|d| allowed.contains(&d.class_index))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_single_class() {
        let detections = vec![
            Detection::new(0.0, 0.0, 10.0, 10.0, 0.9, 1),
            Detection::new(5.0, 5.0, 15.0, 15.0, 0.8, 2),
        ];
        let allowed = HashSet::from([1]);
        assert_eq!(
            filter_detections(&detections, &allowed),
            vec![Detection::new(0.0, 0.0, 10.0, 10.0, 0.9, 1)]
        );
    }

    #[test]
    fn test_filter_preserves_order() {
        let detections = vec![
            Detection::new(0.0, 0.0, 1.0, 1.0, 0.5, 3),
            Detection::new(1.0, 1.0, 2.0, 2.0, 0.6, 0),
            Detection::new(2.0, 2.0, 3.0, 3.0, 0.7, 3),
            Detection::new(3.0, 3.0, 4.0, 4.0, 0.8, 4),
        ];
        let allowed = HashSet::from([3, 4]);
        let filtered = filter_detections(&detections, &allowed);
        let classes: Vec<usize> = filtered.iter().map(|d| d.class_index).collect();
        assert_eq!(classes, vec![3, 3, 4]);
        assert_eq!(filtered[0], detections[0]);
        assert_eq!(filtered[1], detections[2]);
    }

    #[test]
    fn test_empty_allowed_set() {
        let detections = vec![Detection::new(0.0, 0.0, 10.0, 10.0, 0.9, 0)];
        assert!(filter_detections(&detections, &HashSet::new()).is_empty());
    }

    #[test]
    fn test_pixel_corners_truncate() {
        let d = Detection::new(10.9, 3.2, 20.99, 7.5, 0.4, 0);
        assert_eq!(d.pixel_corners(), ((10, 3), (20, 7)));
    }
}
