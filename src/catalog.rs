use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::detection::Detection;
use crate::error::{Error, Result};

/// COCO class names used by the pretrained YOLOv5 weights (80 classes).
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

pub const ANIMAL_CLASSES: [&str; 5] = ["Bird", "Cat", "Dog", "Monkey", "Squirrel"];

/// Which weights and class list a session works with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// Pretrained COCO weights.
    #[default]
    Yolov5,
    Animals,
    /// Custom trained weights, `<name>.onnx` with labels in `<name>.txt`.
    Custom(String),
}

impl Dataset {
    pub fn name(&self) -> &str {
        match self {
            Dataset::Yolov5 => "yolov5",
            Dataset::Animals => "animals",
            Dataset::Custom(name) => name,
        }
    }

    pub fn is_pretrained(&self) -> bool {
        matches!(self, Dataset::Yolov5)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name().to_uppercase())
    }
}

impl FromStr for Dataset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        if name.is_empty() {
            return Err(Error::Config("dataset name is empty".to_string()));
        }
        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(Error::Config(format!("invalid dataset name '{}'", name)));
        }
        Ok(match name.to_lowercase().as_str() {
            "yolov5" | "coco" => Dataset::Yolov5,
            "animals" => Dataset::Animals,
            _ => Dataset::Custom(name.to_string()),
        })
    }
}

/// Which classes the user wants to see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClassSelection {
    #[default]
    All,
    Named(Vec<String>),
}

/// Ordered class names; the position of a name is its class index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCatalog {
    dataset: String,
    names: Vec<String>,
}

impl ClassCatalog {
    pub fn new<S: Into<String>>(dataset: &str, names: impl IntoIterator<Item = S>) -> Self {
        Self {
            dataset: dataset.to_string(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Built-in catalog for `dataset`, or the label file `<labels_dir>/<name>.txt`
    /// for custom datasets.
    pub fn for_dataset(dataset: &Dataset, labels_dir: &Path) -> Result<Self> {
        match dataset {
            Dataset::Yolov5 => Ok(Self::new(dataset.name(), COCO_CLASSES)),
            Dataset::Animals => Ok(Self::new(dataset.name(), ANIMAL_CLASSES)),
            Dataset::Custom(name) => {
                let path = labels_dir.join(format!("{}.txt", name));
                Ok(Self::new(name, load_labels(&path)?))
            }
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, class_index: usize) -> Option<&str> {
        self.names.get(class_index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Class indices requested by `selection`, in selection order.
    ///
    /// An empty named selection selects nothing.
    pub fn resolve(&self, selection: &ClassSelection) -> Result<Vec<usize>> {
        match selection {
            ClassSelection::All => Ok((0..self.len()).collect()),
            ClassSelection::Named(names) => names
                .iter()
                .map(|name| {
                    self.index_of(name).ok_or_else(|| Error::UnknownClass {
                        name: name.clone(),
                        dataset: self.dataset.clone(),
                    })
                })
                .collect(),
        }
    }

    /// Every detection must reference a class of this catalog.
    pub fn check(&self, detections: &[Detection]) -> Result<()> {
        match detections.iter().find(|d| d.class_index >= self.len()) {
            Some(d) => Err(Error::CatalogMismatch {
                index: d.class_index,
                len: self.len(),
                dataset: self.dataset.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Read one class name per line; blank lines are skipped.
pub fn load_labels(file_path: &Path) -> Result<Vec<String>> {
    let file = File::open(file_path)?;
    let reader = BufReader::new(file);

    let mut names = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let name = line.trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    if names.is_empty() {
        return Err(Error::Config(format!("label file {} is empty", file_path.display())));
    }
    Ok(names)
}
