pub mod annotate;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod interactive;
pub mod legend;
pub mod model;
pub mod output;
pub mod palette;
pub mod postprocess;
pub mod preprocess;
pub mod session;
pub mod sources;

pub use crate::annotate::Annotator;
pub use crate::cache::{ModelCache, ResultCache};
pub use crate::catalog::{ClassCatalog, ClassSelection, Dataset};
pub use crate::cli::Args;
pub use crate::config::Settings;
pub use crate::detection::{filter_detections, Detection};
pub use crate::detector::{Detector, OnnxDetector};
pub use crate::error::{Error, Result};
pub use crate::legend::{build_legend, LegendRow};
pub use crate::model::{ModelType, OnnxModel};
pub use crate::palette::{ColorAllocator, ColorAssignment, Rgb};
pub use crate::preprocess::{PreprocessConfig, Processor};
pub use crate::postprocess::{non_maximum_suppression, PostprocessConfig};
pub use crate::session::{onnx_detector_factory, ImageOutcome, PredictionMode, Report, Session};
pub use crate::sources::Upload;
