use image::RgbImage;
use ndarray::CowArray;
use ort::session::Session;

use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::postprocess::{postprocess, PostprocessConfig};
use crate::preprocess::{PreprocessConfig, Processor};

/// Anything that turns an image into detections in original pixel coordinates.
pub trait Detector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>>;
}

/// YOLOv5 exported to ONNX, run through ONNX Runtime.
pub struct OnnxDetector {
    session: Session,
    processor: Processor,
    postprocess: PostprocessConfig,
}

impl OnnxDetector {
    pub fn new(session: Session, preprocess: PreprocessConfig, postprocess: PostprocessConfig) -> Self {
        Self {
            session,
            processor: Processor::new(preprocess),
            postprocess,
        }
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        let t = std::time::Instant::now();
        let (xs, letterboxes) = self.processor.preprocess(std::slice::from_ref(image))?;
        let xs = CowArray::from(xs);
        let input_data = ort::inputs![xs.view()]?;
        log::debug!("[preprocessing - *]: {:?}", t.elapsed());

        let t = std::time::Instant::now();
        let ys = self.session.run(input_data)?;
        log::debug!("[model]: {:?}", t.elapsed());

        let (_name, output) = ys
            .iter()
            .next()
            .ok_or_else(|| Error::ModelOutput("model produced no outputs".to_string()))?;
        let output = output.try_extract_tensor::<f32>()?.into_owned();

        let detections = postprocess(&output, 0, &letterboxes[0], &self.postprocess)?;
        log::debug!("{} detections after NMS", detections.len());
        Ok(detections)
    }
}
