use crate::{Report, SupervisorConfig};

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::Result;

/// Builder over [`SupervisorConfig`] for library callers.
pub struct Command {
    pub config: SupervisorConfig,
}

impl Command {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            config: SupervisorConfig::new(program),
        }
    }

    pub async fn run(&self) -> Result<Report> {
        crate::run(&self.config).await
    }

    pub fn arg(&mut self, a: impl Into<OsString>) -> &mut Self {
        self.config.command.push(a.into());
        self
    }

    pub fn args<I, A>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.config.command.extend(args.into_iter().map(Into::into));
        self
    }

    /// Processor-time limit.
    pub fn timeout_ms(&mut self, ms: u64) -> &mut Self {
        self.config.timeout = Some(ms);
        self
    }

    pub fn wall_timeout_ms(&mut self, ms: u64) -> &mut Self {
        self.config.wall_timeout = Some(ms);
        self
    }

    pub fn stats(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.config.stats = Some(path.into());
        self
    }

    pub fn delimiter(&mut self, delimiter: impl Into<String>) -> &mut Self {
        self.config.delimiter = Some(delimiter.into());
        self
    }
}
