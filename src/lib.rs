#![deny(clippy::all)]

#[cfg(not(target_os = "linux"))]
compile_error!("proctime supports Linux only");

mod child;
mod cmd;
mod exit;
mod pipe;
mod proc;
mod report;
mod run;
mod signal;
mod sink;
mod usage;
mod utils;

pub use crate::cmd::Command;
pub use crate::exit::{describe_signal, ExitKind, ExitOutcome};
pub use crate::report::Report;
pub use crate::run::run;
pub use crate::sink::{ReportFormat, Sink};
pub use crate::usage::ResourceUsage;

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Longest accepted delimiter, exclusive.
pub const MAX_DELIMITER_LEN: usize = 20;

/// Run a program and report how it ended and how much processor time it used.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "proctime", version)]
pub struct SupervisorConfig {
    /// Program to run (looked up in PATH when it has no slash), then its arguments
    #[arg(value_name = "command", required = true, trailing_var_arg = true)]
    pub command: Vec<OsString>,

    /// Processor-time limit (user + sys), 0 for none
    #[arg(short = 't', long, value_name = "milliseconds", env = "PROCTIME_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Wall-clock backstop for children that block instead of running, 0 for none
    #[arg(short = 'w', long, value_name = "milliseconds", env = "PROCTIME_WALL_TIMEOUT")]
    pub wall_timeout: Option<u64>,

    /// File to write the report to, stdout if unset
    #[arg(short = 's', long, value_name = "path", env = "PROCTIME_STATS")]
    pub stats: Option<PathBuf>,

    /// String written right before and after the report
    #[arg(short = 'd', long, value_name = "string", env = "PROCTIME_DELIMITER")]
    pub delimiter: Option<String>,

    /// Pretty-print the report
    #[arg(short = 'p', long)]
    pub pretty: bool,

    /// Log everything to stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl SupervisorConfig {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            command: vec![program.into()],
            ..Default::default()
        }
    }

    pub fn program(&self) -> Option<&OsStr> {
        self.command.first().map(OsString::as_os_str)
    }

    pub fn args(&self) -> &[OsString] {
        self.command.get(1..).unwrap_or(&[])
    }

    /// Processor-time limit, `None` when unbounded.
    pub fn processor_limit(&self) -> Option<Duration> {
        non_zero_millis(self.timeout)
    }

    /// Wall-clock deadline, `None` when unbounded.
    pub fn deadline(&self) -> Option<Duration> {
        non_zero_millis(self.wall_timeout)
    }

    pub fn sink(&self) -> Sink {
        match self.stats {
            Some(ref path) => Sink::File(path.clone()),
            None => Sink::Stdout,
        }
    }

    pub fn report_format(&self) -> ReportFormat {
        ReportFormat {
            pretty: self.pretty,
            delimiter: self.delimiter.clone(),
        }
    }
}

fn non_zero_millis(ms: Option<u64>) -> Option<Duration> {
    ms.filter(|&ms| ms > 0).map(Duration::from_millis)
}
