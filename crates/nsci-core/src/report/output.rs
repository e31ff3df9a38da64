use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::RunError;
use crate::report::model::RunReport;
use crate::report::render;

/// Serialization used by an [`OutputSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Compact JSON, one document per line.
    #[default]
    Json,
    /// Indented JSON.
    Pretty,
    /// Short human-readable summary.
    Text,
}

/// Destination for run reports: stdout or a named file.
pub struct OutputSink {
    writer: Box<dyn Write + Send>,
    format: OutputFormat,
}

impl OutputSink {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::from_writer(io::stdout(), format)
    }

    /// Create (or truncate) `path` and write there.
    pub fn create(path: &Path, format: OutputFormat) -> Result<Self, RunError> {
        let file = File::create(path).map_err(|source| RunError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_writer(BufWriter::new(file), format))
    }

    /// File when `path` is set, stdout otherwise.
    pub fn open(path: Option<&Path>, format: OutputFormat) -> Result<Self, RunError> {
        match path {
            Some(path) => Self::create(path, format),
            None => Ok(Self::stdout(format)),
        }
    }

    pub fn from_writer(writer: impl Write + Send + 'static, format: OutputFormat) -> Self {
        Self {
            writer: Box::new(writer),
            format,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn write_report(&mut self, report: &RunReport) -> Result<(), RunError> {
        match self.format {
            OutputFormat::Text => {
                let text = render::render_text(report);
                self.writer
                    .write_all(text.as_bytes())
                    .map_err(RunError::Output)?;
                self.writer.flush().map_err(RunError::Output)
            }
            OutputFormat::Json | OutputFormat::Pretty => self.write(report),
        }
    }

    /// Write any serializable payload as JSON in this sink's JSON style.
    /// `Text` sinks fall back to indented JSON.
    pub fn write<T: Serialize>(&mut self, payload: &T) -> Result<(), RunError> {
        match self.format {
            OutputFormat::Json => serde_json::to_writer(&mut self.writer, payload)?,
            OutputFormat::Pretty | OutputFormat::Text => {
                serde_json::to_writer_pretty(&mut self.writer, payload)?
            }
        }
        self.writer.write_all(b"\n").map_err(RunError::Output)?;
        self.writer.flush().map_err(RunError::Output)
    }

    pub fn close(mut self) -> Result<(), RunError> {
        self.writer.flush().map_err(RunError::Output)
    }
}
