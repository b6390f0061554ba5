//! Line-oriented session driver.
//!
//! Reads one command per line and keeps the same [`Session`] (and so the same
//! model and result caches) alive between commands.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::catalog::{ClassSelection, Dataset};
use crate::error::{Error, Result};
use crate::legend::format_legend;
use crate::model::ModelType;
use crate::output::{print_report, save_report};
use crate::session::Session;
use crate::sources::{collect_sources, Upload};

pub const HELP: &str = "\
commands:
  dataset <name>        switch weights and class list (yolov5, animals, or custom)
  model <n|s|m|l|x>     switch the YOLOv5 size variant
  classes <a,b,...>     only draw these classes
  all                   draw every class
  image <path>...       detect on images or directories
  legend                show the current legend
  help                  show this text
  quit                  leave";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Dataset(Dataset),
    Model(ModelType),
    Classes(Vec<String>),
    All,
    Images(Vec<PathBuf>),
    Legend,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let command = match word.to_lowercase().as_str() {
            "dataset" => Command::Dataset(rest.parse()?),
            "model" => Command::Model(rest.parse()?),
            "classes" => Command::Classes(
                rest.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            "all" => Command::All,
            "image" | "images" => {
                if rest.is_empty() {
                    return Err(Error::Config("image needs at least one path".to_string()));
                }
                Command::Images(rest.split_whitespace().map(PathBuf::from).collect())
            }
            "legend" => Command::Legend,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(Error::Config(format!("unknown command '{}', try 'help'", other))),
        };
        Ok(Some(command))
    }
}

/// Apply one command. Returns `false` when the session should end.
pub fn execute<W: Write>(session: &mut Session, command: Command, output_dir: &Path, out: &mut W) -> Result<bool> {
    match command {
        Command::Dataset(dataset) => {
            session.set_dataset(dataset)?;
            writeln!(out, "dataset {} ({} classes)", session.dataset(), session.catalog().len())?;
        }
        Command::Model(model_type) => {
            session.set_model_type(model_type);
            writeln!(out, "model yolov5{}", model_type)?;
        }
        Command::Classes(names) => {
            session.set_selection(ClassSelection::Named(names))?;
            writeln!(out, "{} classes selected", session.requested().len())?;
        }
        Command::All => {
            session.set_selection(ClassSelection::All)?;
            writeln!(out, "all {} classes selected", session.requested().len())?;
        }
        Command::Images(paths) => {
            let mut uploads = Vec::new();
            for path in collect_sources(&paths)? {
                match Upload::from_path(&path) {
                    Ok(upload) => uploads.push(upload),
                    Err(e) => writeln!(out, "Could not read {}: {}", path.display(), e)?,
                }
            }
            let report = session.process(&uploads)?;
            print_report(&report, session.catalog(), out)?;
            let written = save_report(&report, output_dir, session.annotator().font())?;
            for path in written {
                writeln!(out, "wrote {}", path.display())?;
            }
        }
        Command::Legend => write!(out, "{}", format_legend(&session.legend()?))?,
        Command::Help => writeln!(out, "{}", HELP)?,
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

/// Run commands from `input` until it ends or `quit` is read. Command errors
/// are printed and the session continues.
pub fn run<R: BufRead, W: Write>(session: &mut Session, input: R, output_dir: &Path, out: &mut W) -> Result<()> {
    writeln!(out, "{}", HELP)?;
    for line in input.lines() {
        let line = line?;
        let result = Command::parse(&line).and_then(|command| match command {
            Some(command) => execute(session, command, output_dir, out),
            None => Ok(true),
        });
        match result {
            Ok(true) => {}
            Ok(false) => break,
            Err(e @ Error::CatalogMismatch { .. }) => return Err(e),
            Err(e) => {
                log::warn!("{}", e);
                writeln!(out, "error: {}", e)?;
            }
        }
        out.flush()?;
    }
    Ok(())
}
