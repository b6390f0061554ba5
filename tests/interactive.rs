use std::io::Cursor;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use yolo_annotate::error::Error;
use yolo_annotate::interactive;
use yolo_annotate::output::{save_report, LEGEND_FILE};
use yolo_annotate::session::DetectorFactory;
use yolo_annotate::{Annotator, Dataset, Detection, Detector, ModelType, PredictionMode, Session, Settings, Upload};

struct Fixed(Vec<Detection>);

impl Detector for Fixed {
    fn detect(&self, _image: &RgbImage) -> yolo_annotate::Result<Vec<Detection>> {
        Ok(self.0.clone())
    }
}

fn factory(detections: Vec<Detection>) -> DetectorFactory {
    Box::new(move |_: ModelType, _: &Dataset| {
        let detector: Box<dyn Detector> = Box::new(Fixed(detections.clone()));
        Ok(detector)
    })
}

fn session(dir: &TempDir, detections: Vec<Detection>) -> Session {
    let settings = Settings {
        dataset: "animals".to_string(),
        models_dir: Some(dir.path().to_path_buf()),
        ..Settings::default()
    };
    Session::new(&settings, Annotator::new(None), factory(detections)).unwrap()
}

fn write_image(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    RgbImage::from_pixel(40, 30, Rgb([90, 90, 90])).save(&path).unwrap();
    path
}

#[test]
fn scripted_session_writes_images_and_legend() {
    let dir = TempDir::new().unwrap();
    let image = write_image(&dir, "garden.png");
    let out_dir = dir.path().join("out");
    let mut session = session(
        &dir,
        vec![
            Detection::new(1.0, 1.0, 10.0, 10.0, 0.9, 1),
            Detection::new(15.0, 5.0, 30.0, 25.0, 0.8, 2),
        ],
    );

    let script = format!("classes Dog\nbogus\nimage {}\nlegend\nquit\nmodel x\n", image.display());
    let mut out = Vec::new();
    interactive::run(&mut session, Cursor::new(script), &out_dir, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("1 classes selected"));
    assert!(text.contains("error: unknown command 'bogus'"));
    assert!(text.contains("garden.png: 1 detections"));
    assert!(text.contains("Class: Dog"));
    assert!(!text.contains("Class: Cat"));
    // Nothing after quit runs.
    assert_eq!(session.model_type(), ModelType::S);

    assert!(out_dir.join("garden_annotated.png").exists());
    assert!(out_dir.join(LEGEND_FILE).exists());
}

#[test]
fn catalog_mismatch_ends_the_session() {
    let dir = TempDir::new().unwrap();
    let image = write_image(&dir, "odd.png");
    let mut session = session(&dir, vec![Detection::new(1.0, 1.0, 5.0, 5.0, 0.9, 40)]);

    let script = format!("image {}\nhelp\n", image.display());
    let mut out = Vec::new();
    let result = interactive::run(&mut session, Cursor::new(script), &dir.path().join("out"), &mut out);
    assert!(matches!(result, Err(Error::CatalogMismatch { index: 40, .. })));
}

#[test]
fn duplicate_names_get_distinct_files() {
    let dir = TempDir::new().unwrap();
    let mut session = session(&dir, vec![]);
    let bytes = std::fs::read(write_image(&dir, "same.png")).unwrap();

    let report = session
        .process(&[
            Upload::new("a/same.png", bytes.clone()),
            Upload::new("b/same.png", bytes),
        ])
        .unwrap();
    let out_dir = dir.path().join("saved");
    let written = save_report(&report, &out_dir, None).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["same_annotated.png", "same_1_annotated.png", LEGEND_FILE]);
}

#[test]
fn single_mode_takes_one_image() {
    assert!(PredictionMode::Single.check(1).is_ok());
    assert!(PredictionMode::Single.check(2).is_err());
    assert!(PredictionMode::Single.check(0).is_err());
    assert!(PredictionMode::Multiple.check(3).is_ok());
}
