use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;

use crate::catalog::Dataset;
use crate::error::{Error, Result};

/// Base URL the pretrained `yolov5<type>.onnx` weights are fetched from.
pub const DEFAULT_MODEL_URL: &str = "https://github.com/ultralytics/yolov5/releases/download/v7.0";

const MIN_MODEL_BYTES: usize = 1024;

/// YOLOv5 size variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ModelType {
    N,
    #[default]
    S,
    M,
    L,
    X,
}

impl ModelType {
    pub fn suffix(&self) -> &'static str {
        match self {
            ModelType::N => "n",
            ModelType::S => "s",
            ModelType::M => "m",
            ModelType::L => "l",
            ModelType::X => "x",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for ModelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "n" => Ok(ModelType::N),
            "s" => Ok(ModelType::S),
            "m" => Ok(ModelType::M),
            "l" => Ok(ModelType::L),
            "x" => Ok(ModelType::X),
            other => Err(Error::Config(format!("unknown model type '{}', expected one of n, s, m, l, x", other))),
        }
    }
}

/// File name of the weights for a dataset.
pub fn model_file_name(model_type: ModelType, dataset: &Dataset) -> String {
    if dataset.is_pretrained() {
        format!("yolov5{}.onnx", model_type)
    } else {
        format!("{}.onnx", dataset.name())
    }
}

/// Finds weights on disk, downloading the pretrained ones when needed.
#[derive(Debug, Clone)]
pub struct ModelLocator {
    pub models_dir: PathBuf,
    pub base_url: String,
    pub force_reload: bool,
}

impl ModelLocator {
    pub fn new(models_dir: impl Into<PathBuf>, base_url: impl Into<String>, force_reload: bool) -> Self {
        Self {
            models_dir: models_dir.into(),
            base_url: base_url.into(),
            force_reload,
        }
    }

    pub fn locate(&self, model_type: ModelType, dataset: &Dataset) -> Result<PathBuf> {
        let path = self.models_dir.join(model_file_name(model_type, dataset));

        if !dataset.is_pretrained() {
            if !path.is_file() {
                return Err(Error::Config(format!(
                    "no weights for dataset {} at {}",
                    dataset.name(),
                    path.display()
                )));
            }
            return Ok(path);
        }

        if path.is_file() && !self.force_reload {
            log::debug!("Using cached weights {}", path.display());
            return Ok(path);
        }

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), model_file_name(model_type, dataset));
        download(&url, &path)?;
        Ok(path)
    }
}

/// Fetch `url` into `dest`, writing a temporary file first and renaming it.
pub fn download(url: &str, dest: &Path) -> Result<()> {
    let fail = |reason: String| Error::Download {
        url: url.to_string(),
        reason,
    };
    if !url.starts_with("https://") {
        return Err(fail("only https URLs are allowed".to_string()));
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    log::info!("Downloading {} to {}", url, dest.display());
    let response = ureq::get(url).call().map_err(|e| fail(e.to_string()))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| fail(e.to_string()))?;
    if bytes.len() < MIN_MODEL_BYTES {
        return Err(fail(format!("downloaded file is only {} bytes", bytes.len())));
    }

    let temp_path = dest.with_extension("onnx.tmp");
    fs::write(&temp_path, &bytes)?;
    if let Err(e) = fs::rename(&temp_path, dest) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    log::info!("Saved {} bytes to {}", bytes.len(), dest.display());
    Ok(())
}

pub struct OnnxModel {
    provider: [ort::execution_providers::ExecutionProviderDispatch; 1],
}

impl OnnxModel {
    pub fn new(cuda: bool) -> Self {
        let provider = if cuda {
            [CUDAExecutionProvider::default().build().error_on_failure()]
        } else {
            [CPUExecutionProvider::default().build()]
        };
        Self { provider }
    }

    pub fn load_model(&self, model_path: &Path) -> Result<Session> {
        let session = SessionBuilder::new()?
            .with_execution_providers(self.provider.clone())?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;
        log::info!("Loaded model {}", model_path.display());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_parse() {
        assert_eq!("s".parse::<ModelType>().unwrap(), ModelType::S);
        assert_eq!(" X ".parse::<ModelType>().unwrap(), ModelType::X);
        assert!("q".parse::<ModelType>().is_err());
        assert_eq!(ModelType::default().to_string(), "s");
    }

    #[test]
    fn test_model_file_name() {
        assert_eq!(model_file_name(ModelType::M, &Dataset::Yolov5), "yolov5m.onnx");
        assert_eq!(model_file_name(ModelType::M, &Dataset::Animals), "animals.onnx");
        assert_eq!(
            model_file_name(ModelType::S, &Dataset::Custom("fruits".to_string())),
            "fruits.onnx"
        );
    }

    #[test]
    fn test_locate_existing_pretrained_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yolov5s.onnx");
        fs::write(&path, b"weights").unwrap();
        let locator = ModelLocator::new(dir.path(), "https://invalid.example", false);
        assert_eq!(locator.locate(ModelType::S, &Dataset::Yolov5).unwrap(), path);
    }

    #[test]
    fn test_locate_missing_custom() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ModelLocator::new(dir.path(), DEFAULT_MODEL_URL, false);
        assert!(matches!(
            locator.locate(ModelType::S, &Dataset::Animals),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_download_rejects_plain_http() {
        let dir = tempfile::tempdir().unwrap();
        let result = download("http://example.com/model.onnx", &dir.path().join("m.onnx"));
        assert!(matches!(result, Err(Error::Download { .. })));
    }
}
