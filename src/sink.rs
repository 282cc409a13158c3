use crate::report::Report;

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

/// Where the report goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Clone, Default)]
pub struct ReportFormat {
    pub pretty: bool,
    pub delimiter: Option<String>,
}

impl Sink {
    pub fn emit(&self, report: &Report, format: &ReportFormat) -> Result<()> {
        debug!(sink = ?self, "emit report");
        match self {
            Sink::Stdout => {
                let stdout = io::stdout();
                let mut stdout_lock = stdout.lock();
                write_report(&mut stdout_lock, report, format)?;
                stdout_lock.flush()?;
            }
            Sink::File(path) => {
                let file = fs::File::create(path)
                    .with_context(|| format!("failed to create stats file: {}", path.display()))?;
                let mut out = io::BufWriter::new(file);
                write_report(&mut out, report, format)?;
                out.flush()
                    .with_context(|| format!("failed to write stats file: {}", path.display()))?;
            }
        }
        Ok(())
    }
}

pub fn write_report(out: &mut impl Write, report: &Report, format: &ReportFormat) -> Result<()> {
    let delimiter = format.delimiter.as_deref().unwrap_or("");
    out.write_all(delimiter.as_bytes())?;
    if format.pretty {
        serde_json::to_writer_pretty(&mut *out, report)?;
    } else {
        serde_json::to_writer(&mut *out, report)?;
    }
    out.write_all(delimiter.as_bytes())?;
    writeln!(out)?;
    Ok(())
}
