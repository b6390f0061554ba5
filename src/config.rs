//! Settings file support.
//!
//! Everything has a default, so a settings file only needs the keys it changes.
//! Command-line flags are applied on top of the loaded values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_RESULT_ENTRIES;
use crate::catalog::{ClassSelection, Dataset};
use crate::error::{Error, Result};
use crate::model::{ModelType, DEFAULT_MODEL_URL};
use crate::postprocess::PostprocessConfig;
use crate::preprocess::PreprocessConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// `yolov5`, `animals` or the name of custom weights
    pub dataset: String,
    /// YOLOv5 size variant for the pretrained weights
    pub model_type: String,
    /// Named classes to show when `all_classes` is off
    pub classes: Vec<String>,
    pub all_classes: bool,
    /// Where weights and custom label files live
    pub models_dir: Option<PathBuf>,
    pub model_url: String,
    pub force_reload: bool,
    pub cuda: bool,
    pub font: Option<PathBuf>,
    pub input_size: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub result_cache_entries: usize,
    pub output_dir: PathBuf,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset: "yolov5".to_string(),
            model_type: "s".to_string(),
            classes: Vec::new(),
            all_classes: true,
            models_dir: None,
            model_url: DEFAULT_MODEL_URL.to_string(),
            force_reload: false,
            cuda: false,
            font: None,
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 1000,
            result_cache_entries: DEFAULT_RESULT_ENTRIES,
            output_dir: PathBuf::from("output"),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let settings: Settings =
            toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.dataset()?;
        self.model_type()?;
        if !(0.0..=1.0).contains(&self.conf_threshold) {
            return Err(Error::Config(format!(
                "conf_threshold must be within 0..=1, got {}",
                self.conf_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(Error::Config(format!(
                "iou_threshold must be within 0..=1, got {}",
                self.iou_threshold
            )));
        }
        if self.input_size == 0 || self.input_size % 32 != 0 {
            return Err(Error::Config(format!(
                "input_size must be a positive multiple of 32, got {}",
                self.input_size
            )));
        }
        if self.max_detections == 0 {
            return Err(Error::Config("max_detections must be at least 1".to_string()));
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(Error::Config(format!("unknown log level '{}'", self.log_level)));
        }
        Ok(())
    }

    pub fn dataset(&self) -> Result<Dataset> {
        self.dataset.parse()
    }

    pub fn model_type(&self) -> Result<ModelType> {
        self.model_type.parse()
    }

    pub fn selection(&self) -> ClassSelection {
        if self.all_classes {
            ClassSelection::All
        } else {
            ClassSelection::Named(self.classes.clone())
        }
    }

    /// Configured models directory, else the user cache directory, else `./models`.
    pub fn models_dir(&self) -> PathBuf {
        match &self.models_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .map(|mut p| {
                    p.push("yolo-annotate");
                    p.push("models");
                    p
                })
                .unwrap_or_else(|| PathBuf::from("./models")),
        }
    }

    pub fn preprocess_config(&self) -> PreprocessConfig {
        PreprocessConfig {
            height: self.input_size,
            width: self.input_size,
            ..PreprocessConfig::default()
        }
    }

    pub fn postprocess_config(&self) -> PostprocessConfig {
        PostprocessConfig {
            conf_threshold: self.conf_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        }
    }
}
