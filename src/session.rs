use std::collections::HashSet;

use image::RgbImage;

use crate::annotate::Annotator;
use crate::cache::{content_key, ModelCache, ResultCache};
use crate::catalog::{ClassCatalog, ClassSelection, Dataset};
use crate::config::Settings;
use crate::detection::{filter_detections, Detection};
use crate::detector::{Detector, OnnxDetector};
use crate::error::{Error, Result};
use crate::legend::{build_legend, LegendRow};
use crate::model::{ModelLocator, ModelType, OnnxModel};
use crate::palette::{ColorAllocator, ColorAssignment};
use crate::sources::Upload;

/// Builds a detector for a model type and dataset.
pub type DetectorFactory = Box<dyn FnMut(ModelType, &Dataset) -> Result<Box<dyn Detector>>>;

/// Factory that locates (and if needed downloads) ONNX weights and opens them
/// with ONNX Runtime.
pub fn onnx_detector_factory(settings: &Settings) -> DetectorFactory {
    let locator = ModelLocator::new(settings.models_dir(), settings.model_url.clone(), settings.force_reload);
    let onnx = OnnxModel::new(settings.cuda);
    let preprocess = settings.preprocess_config();
    let postprocess = settings.postprocess_config();

    Box::new(move |model_type, dataset| {
        let path = locator.locate(model_type, dataset)?;
        let session = onnx.load_model(&path)?;
        let detector: Box<dyn Detector> =
            Box::new(OnnxDetector::new(session, preprocess.clone(), postprocess.clone()));
        Ok(detector)
    })
}

/// Single mode takes exactly one image, multiple mode any number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PredictionMode {
    Single,
    Multiple,
}

impl PredictionMode {
    pub fn check(&self, count: usize) -> Result<()> {
        match self {
            PredictionMode::Single if count != 1 => Err(Error::Config(format!(
                "single image mode takes exactly one image, got {}",
                count
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug)]
pub struct RenderedImage {
    pub name: String,
    pub image: RgbImage,
    /// Detections that passed the class filter, in drawing order.
    pub detections: Vec<Detection>,
    pub cached: bool,
}

#[derive(Debug)]
pub enum ImageOutcome {
    Rendered(RenderedImage),
    /// The upload could not be decoded; nothing was drawn.
    Failed { name: String, message: String },
}

#[derive(Debug)]
pub struct Report {
    pub outcomes: Vec<ImageOutcome>,
    pub legend: Vec<LegendRow>,
}

impl Report {
    pub fn rendered(&self) -> impl Iterator<Item = &RenderedImage> {
        self.outcomes.iter().filter_map(|o| match o {
            ImageOutcome::Rendered(r) => Some(r),
            ImageOutcome::Failed { .. } => None,
        })
    }
}

/// Holds everything one user works with: the selected weights, class list and
/// colors, plus the model and result caches.
pub struct Session {
    dataset: Dataset,
    model_type: ModelType,
    labels_dir: std::path::PathBuf,
    catalog: ClassCatalog,
    selection: ClassSelection,
    requested: Vec<usize>,
    allocator: ColorAllocator,
    colors: ColorAssignment,
    annotator: Annotator,
    models: ModelCache<Box<dyn Detector>>,
    results: ResultCache,
    factory: DetectorFactory,
    /// Every class seen in the last run before filtering, in first-seen order.
    last_detected: Option<Vec<usize>>,
}

impl Session {
    pub fn new(settings: &Settings, annotator: Annotator, factory: DetectorFactory) -> Result<Self> {
        settings.validate()?;
        let dataset = settings.dataset()?;
        let labels_dir = settings.models_dir();
        let catalog = ClassCatalog::for_dataset(&dataset, &labels_dir)?;
        let selection = settings.selection();
        let requested = catalog.resolve(&selection)?;
        let allocator = ColorAllocator::default();
        let colors = allocator.allocate(requested.iter().copied());

        log::info!("Session for {} with {} of {} classes", dataset, requested.len(), catalog.len());
        Ok(Self {
            dataset,
            model_type: settings.model_type()?,
            labels_dir,
            catalog,
            selection,
            requested,
            allocator,
            colors,
            annotator,
            models: ModelCache::new(),
            results: ResultCache::new(settings.result_cache_entries),
            factory,
            last_detected: None,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    pub fn selection(&self) -> &ClassSelection {
        &self.selection
    }

    pub fn requested(&self) -> &[usize] {
        &self.requested
    }

    pub fn colors(&self) -> &ColorAssignment {
        &self.colors
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    pub fn cached_results(&self) -> usize {
        self.results.len()
    }

    pub fn model_loaded(&self) -> bool {
        self.models.is_loaded()
    }

    /// Drop the loaded model and every cached result.
    pub fn invalidate(&mut self) {
        self.models.invalidate();
        self.results.clear();
    }

    /// Switch weights and class list. The class selection goes back to all classes.
    pub fn set_dataset(&mut self, dataset: Dataset) -> Result<()> {
        if dataset == self.dataset {
            return Ok(());
        }
        let catalog = ClassCatalog::for_dataset(&dataset, &self.labels_dir)?;
        log::info!("Dataset changed from {} to {}", self.dataset, dataset);
        self.dataset = dataset;
        self.catalog = catalog;
        self.last_detected = None;
        self.invalidate();
        self.set_selection(ClassSelection::All)
    }

    pub fn set_model_type(&mut self, model_type: ModelType) {
        if model_type != self.model_type {
            log::info!("Model type changed from {} to {}", self.model_type, model_type);
            self.model_type = model_type;
            self.invalidate();
        }
    }

    /// Choose which classes are drawn; colors are reassigned in selection order.
    pub fn set_selection(&mut self, selection: ClassSelection) -> Result<()> {
        let requested = self.catalog.resolve(&selection)?;
        self.colors = self.allocator.allocate(requested.iter().copied());
        self.requested = requested;
        self.selection = selection;
        Ok(())
    }

    fn detect(&mut self, upload: &Upload, image: &RgbImage) -> Result<(Vec<Detection>, bool)> {
        let key = content_key(&upload.bytes);
        if let Some(cached) = self.results.get(&key) {
            log::debug!("Result cache hit for {}", upload.name);
            return Ok((cached.to_vec(), true));
        }

        let model_key = (self.model_type, self.dataset.clone());
        let factory = &mut self.factory;
        let detector = self.models.get_or_load(model_key, || {
            log::info!("Loading model for {}", upload.name);
            factory(self.model_type, &self.dataset)
        })?;
        let detections = detector.detect(image)?;

        if let Err(e) = self.catalog.check(&detections) {
            log::error!("{}", e);
            return Err(e);
        }
        self.results.insert(key, detections.clone());
        Ok((detections, false))
    }

    /// Run every upload through detection, filtering and annotation.
    ///
    /// Uploads that fail to decode are reported and skipped. A detection whose
    /// class is outside the catalog aborts the whole run.
    pub fn process(&mut self, uploads: &[Upload]) -> Result<Report> {
        let allowed: HashSet<usize> = self.requested.iter().copied().collect();
        let mut detected: Option<Vec<usize>> = None;
        let mut outcomes = Vec::with_capacity(uploads.len());

        for upload in uploads {
            let image = match upload.decode() {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("Could not decode {}: {}", upload.name, e);
                    outcomes.push(ImageOutcome::Failed {
                        name: upload.name.clone(),
                        message: format!("Could not read {} as an image: {}", upload.name, e),
                    });
                    continue;
                }
            };

            let (raw, cached) = self.detect(upload, &image)?;
            let filtered = filter_detections(&raw, &allowed);
            let rendered = self.annotator.annotate(&image, &filtered, &self.colors, &self.catalog)?;

            let seen = detected.get_or_insert_with(Vec::new);
            for det in &raw {
                if !seen.contains(&det.class_index) {
                    seen.push(det.class_index);
                }
            }
            log::info!(
                "{}: {} detections, {} after class filter",
                upload.name,
                raw.len(),
                filtered.len()
            );

            outcomes.push(ImageOutcome::Rendered(RenderedImage {
                name: upload.name.clone(),
                image: rendered,
                detections: filtered,
                cached,
            }));
        }

        self.last_detected = detected;
        Ok(Report {
            outcomes,
            legend: self.legend()?,
        })
    }

    /// Legend for the last run: detected classes that are currently selected,
    /// or the requested classes when no image has been processed.
    pub fn legend(&self) -> Result<Vec<LegendRow>> {
        let indices: Vec<usize> = match &self.last_detected {
            Some(detected) => detected
                .iter()
                .copied()
                .filter(|index| self.requested.contains(index))
                .collect(),
            None => self.requested.clone(),
        };
        build_legend(&indices, &self.colors, &self.catalog)
    }
}
