use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::session::PredictionMode;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Run YOLOv5 over images and draw color-coded boxes", long_about = None)]
pub struct Args {
    /// TOML settings file; flags override its values
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// error, warn, info, debug or trace (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Annotate one or more images and write the results
    Detect(DetectArgs),
    /// Read commands from stdin, keeping the model loaded between them
    Interactive(SessionArgs),
    /// List the classes of a dataset
    Classes {
        #[arg(long)]
        dataset: Option<String>,

        #[arg(long)]
        models_dir: Option<PathBuf>,
    },
}

#[derive(clap::Args, Clone, Debug)]
pub struct DetectArgs {
    /// image files or directories
    #[arg(long, required = true, num_args = 1..)]
    pub source: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = PredictionMode::Multiple)]
    pub mode: PredictionMode,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct SessionArgs {
    /// yolov5, animals, or the name of custom weights
    #[arg(long)]
    pub dataset: Option<String>,

    /// YOLOv5 size variant: n, s, m, l or x
    #[arg(long)]
    pub model_type: Option<String>,

    /// only draw these classes (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub classes: Vec<String>,

    /// draw every class, even when --classes is given
    #[arg(long)]
    pub all_classes: bool,

    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    #[arg(long)]
    pub model_url: Option<String>,

    /// download the pretrained weights even when they are cached
    #[arg(long)]
    pub force_reload: bool,

    #[arg(long)]
    pub cuda: bool,

    /// TrueType font for labels
    #[arg(long)]
    pub font: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl SessionArgs {
    /// Overlay the flags that were given on top of `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dataset) = &self.dataset {
            settings.dataset = dataset.clone();
        }
        if let Some(model_type) = &self.model_type {
            settings.model_type = model_type.clone();
        }
        if !self.classes.is_empty() {
            settings.classes = self.classes.clone();
            settings.all_classes = false;
        }
        if self.all_classes {
            settings.all_classes = true;
        }
        if let Some(dir) = &self.models_dir {
            settings.models_dir = Some(dir.clone());
        }
        if let Some(url) = &self.model_url {
            settings.model_url = url.clone();
        }
        settings.force_reload |= self.force_reload;
        settings.cuda |= self.cuda;
        if let Some(font) = &self.font {
            settings.font = Some(font.clone());
        }
        if let Some(output) = &self.output {
            settings.output_dir = output.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ClassSelection;

    #[test]
    fn test_parse_detect() {
        let args = Args::parse_from([
            "yolo-annotate",
            "detect",
            "--source",
            "a.jpg",
            "b.jpg",
            "--dataset",
            "animals",
            "--classes",
            "Cat,Dog",
        ]);
        let Command::Detect(detect) = args.command else {
            panic!("expected detect");
        };
        assert_eq!(detect.source.len(), 2);
        assert_eq!(detect.mode, PredictionMode::Multiple);

        let mut settings = Settings::default();
        detect.session.apply(&mut settings);
        assert_eq!(settings.dataset, "animals");
        assert_eq!(
            settings.selection(),
            ClassSelection::Named(vec!["Cat".to_string(), "Dog".to_string()])
        );
    }

    #[test]
    fn test_all_classes_overrides_named() {
        let args = Args::parse_from(["yolo-annotate", "interactive", "--classes", "cat", "--all-classes"]);
        let Command::Interactive(session) = args.command else {
            panic!("expected interactive");
        };
        let mut settings = Settings::default();
        session.apply(&mut settings);
        assert_eq!(settings.selection(), ClassSelection::All);
    }

    #[test]
    fn test_flags_keep_file_values() {
        let mut settings = Settings {
            model_type: "m".to_string(),
            ..Settings::default()
        };
        SessionArgs::default().apply(&mut settings);
        assert_eq!(settings.model_type, "m");
        assert!(settings.all_classes);
    }

    #[test]
    fn test_source_required() {
        assert!(Args::try_parse_from(["yolo-annotate", "detect"]).is_err());
    }
}
