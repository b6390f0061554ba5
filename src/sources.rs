use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::Result;

pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// An uploaded image: display name and raw encoded bytes.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self::new(path.to_string_lossy(), bytes))
    }

    /// Decode to 8-bit RGB, whatever the stored color type.
    pub fn decode(&self) -> Result<RgbImage> {
        Ok(image::load_from_memory(&self.bytes)?.to_rgb8())
    }

    /// File stem used to name outputs derived from this upload.
    pub fn stem(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string())
    }
}

pub fn get_all_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Supported extension and a non-empty file.
pub fn is_valid_image(path: &Path) -> bool {
    let ext_valid = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    };

    let size_valid = match fs::metadata(path) {
        Ok(metadata) => metadata.len() != 0,
        Err(_) => false,
    };

    ext_valid && size_valid
}

/// Expand directories into their image files; plain files are kept as given.
pub fn collect_sources(paths: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for path in paths {
        if path.is_dir() {
            let images: Vec<PathBuf> = get_all_files(path)?
                .into_iter()
                .filter(|p| is_valid_image(p))
                .collect();
            if images.is_empty() {
                log::warn!("No images found in {}", path.display());
            }
            sources.extend(images);
        } else {
            sources.push(path.clone());
        }
    }
    Ok(sources)
}
