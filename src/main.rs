use std::io;

use anyhow::{Context, Result};
use clap::Parser;

use yolo_annotate::cli::{Command, DetectArgs, SessionArgs};
use yolo_annotate::output::{print_report, save_report};
use yolo_annotate::sources::{collect_sources, Upload};
use yolo_annotate::{interactive, onnx_detector_factory, Annotator, Args, ClassCatalog, Session, Settings};

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path).with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(level) = &args.log_level {
        settings.log_level = level.clone();
    }
    Ok(settings)
}

fn open_session(settings: &Settings) -> Result<Session> {
    let annotator = Annotator::from_font_path(settings.font.as_deref()).context("loading label font")?;
    let session = Session::new(settings, annotator, onnx_detector_factory(settings))?;
    Ok(session)
}

fn detect(mut settings: Settings, args: &DetectArgs) -> Result<()> {
    args.session.apply(&mut settings);
    settings.validate()?;

    let sources = collect_sources(&args.source).context("listing sources")?;
    args.mode.check(sources.len())?;
    let uploads = sources
        .iter()
        .map(|path| Upload::from_path(path).with_context(|| format!("reading {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    let mut session = open_session(&settings)?;
    let report = session.process(&uploads)?;

    let stdout = io::stdout();
    print_report(&report, session.catalog(), &mut stdout.lock())?;
    let written = save_report(&report, &settings.output_dir, session.annotator().font())
        .with_context(|| format!("writing results to {}", settings.output_dir.display()))?;
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn run_interactive(mut settings: Settings, args: &SessionArgs) -> Result<()> {
    args.apply(&mut settings);
    settings.validate()?;

    let mut session = open_session(&settings)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    interactive::run(&mut session, stdin.lock(), &settings.output_dir, &mut stdout.lock())?;
    Ok(())
}

fn list_classes(mut settings: Settings, dataset: Option<String>, models_dir: Option<std::path::PathBuf>) -> Result<()> {
    if let Some(dataset) = dataset {
        settings.dataset = dataset;
    }
    if models_dir.is_some() {
        settings.models_dir = models_dir;
    }
    let dataset = settings.dataset()?;
    let catalog = ClassCatalog::for_dataset(&dataset, &settings.models_dir())?;
    println!("{} ({} classes)", dataset, catalog.len());
    for (index, name) in catalog.names().iter().enumerate() {
        println!("{:>4}  {}", index, name);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = load_settings(&args)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log_level.as_str())).init();

    match args.command {
        Command::Detect(ref detect_args) => detect(settings, detect_args),
        Command::Interactive(ref session_args) => run_interactive(settings, session_args),
        Command::Classes { dataset, models_dir } => list_classes(settings, dataset, models_dir),
    }
}
