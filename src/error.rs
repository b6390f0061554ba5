use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Resize error: {0}")]
    Resize(String),

    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown class '{name}' for dataset {dataset}")]
    UnknownClass { name: String, dataset: String },

    #[error("Detector returned class index {index} but catalog {dataset} only has {len} classes")]
    CatalogMismatch {
        index: usize,
        len: usize,
        dataset: String,
    },

    #[error("Model output error: {0}")]
    ModelOutput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
