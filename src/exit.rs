use crate::proc::RawStatus;

use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt;
use std::time::Duration;

use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};

pub const RETURN_DESC: &str = "exit code";
pub const TIMEOUT_DESC: &str = "child runtime limit (ms)";
pub const QUIT_DESC: &str = "child error before exec";

/// How a supervised child ended. Exactly one case per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The program returned on its own, whatever made it do so.
    Returned { code: i32 },
    /// Killed by a signal it did not handle.
    Signaled { signal: i32 },
    /// Killed by the supervisor after exceeding a limit.
    TimedOut { limit_ms: u64 },
    /// The program image never started.
    FailedBeforeExec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitKind {
    Return,
    Signal,
    Timeout,
    Quit,
}

impl ExitOutcome {
    pub fn kind(&self) -> ExitKind {
        match self {
            ExitOutcome::Returned { .. } => ExitKind::Return,
            ExitOutcome::Signaled { .. } => ExitKind::Signal,
            ExitOutcome::TimedOut { .. } => ExitKind::Timeout,
            ExitOutcome::FailedBeforeExec => ExitKind::Quit,
        }
    }

    pub fn repr(&self) -> Option<i64> {
        match *self {
            ExitOutcome::Returned { code } => Some(code.into()),
            ExitOutcome::Signaled { signal } => Some(signal.into()),
            ExitOutcome::TimedOut { limit_ms } => i64::try_from(limit_ms).ok(),
            ExitOutcome::FailedBeforeExec => None,
        }
    }

    pub fn description(&self) -> Cow<'static, str> {
        match *self {
            ExitOutcome::Returned { .. } => RETURN_DESC.into(),
            ExitOutcome::Signaled { signal } => describe_signal(signal).into(),
            ExitOutcome::TimedOut { .. } => TIMEOUT_DESC.into(),
            ExitOutcome::FailedBeforeExec => QUIT_DESC.into(),
        }
    }

    /// Inverse of `kind` + `repr`.
    pub fn from_parts(kind: ExitKind, repr: Option<i64>) -> Result<Self, String> {
        let outcome = match (kind, repr) {
            (ExitKind::Return, Some(code)) => ExitOutcome::Returned {
                code: i32::try_from(code).map_err(|e| e.to_string())?,
            },
            (ExitKind::Signal, Some(signal)) => ExitOutcome::Signaled {
                signal: i32::try_from(signal).map_err(|e| e.to_string())?,
            },
            (ExitKind::Timeout, Some(limit_ms)) => ExitOutcome::TimedOut {
                limit_ms: u64::try_from(limit_ms).map_err(|e| e.to_string())?,
            },
            (ExitKind::Quit, None) => ExitOutcome::FailedBeforeExec,
            (kind, repr) => {
                return Err(format!("inconsistent exit: type = {:?}, repr = {:?}", kind, repr))
            }
        };
        Ok(outcome)
    }

    pub fn has_executed(&self) -> bool {
        !matches!(self, ExitOutcome::FailedBeforeExec)
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr() {
            Some(repr) => write!(f, "{:?} {} ({})", self.kind(), repr, self.description()),
            None => write!(f, "{:?} ({})", self.kind(), self.description()),
        }
    }
}

/// What the supervisor observed when the child went away.
#[derive(Debug, Clone, Copy)]
pub enum Ending {
    /// Reaped without interference.
    Finished(RawStatus),
    /// The deadline elapsed and the supervisor killed the child.
    Forced { limit: Duration },
    /// `execve` (or the setup before it) failed in the child.
    ExecFailed,
}

/// `cpu_limit` is the processor-time limit armed in the child, if any.
/// A child ending on `SIGPROF` under that limit has run out of time.
pub fn classify(ending: Ending, cpu_limit: Option<Duration>) -> ExitOutcome {
    match ending {
        Ending::Forced { limit } => ExitOutcome::TimedOut {
            limit_ms: limit.as_millis() as u64,
        },
        Ending::ExecFailed => ExitOutcome::FailedBeforeExec,
        Ending::Finished(RawStatus::Exited(code)) => ExitOutcome::Returned { code },
        Ending::Finished(RawStatus::Signaled(signal)) => match cpu_limit {
            Some(limit) if signal == libc::SIGPROF => ExitOutcome::TimedOut {
                limit_ms: limit.as_millis() as u64,
            },
            _ => ExitOutcome::Signaled { signal },
        },
    }
}

/// strsignal-style text plus the symbolic name, e.g. `Killed (SIGKILL)`.
pub fn describe_signal(signum: i32) -> String {
    let signal = match Signal::try_from(signum) {
        Ok(signal) => signal,
        Err(_) => return describe_unnamed(signum),
    };
    match signal_text(signal) {
        Some(text) => format!("{} ({})", text, signal.as_str()),
        None => signal.as_str().to_owned(),
    }
}

fn describe_unnamed(signum: i32) -> String {
    #[cfg(target_os = "linux")]
    {
        if (34..=64).contains(&signum) {
            return format!("Real-time signal {}", signum - 34);
        }
    }
    format!("Unknown signal {}", signum)
}

fn signal_text(signal: Signal) -> Option<&'static str> {
    let text = match signal {
        Signal::SIGHUP => "Hangup",
        Signal::SIGINT => "Interrupt",
        Signal::SIGQUIT => "Quit",
        Signal::SIGILL => "Illegal instruction",
        Signal::SIGTRAP => "Trace/breakpoint trap",
        Signal::SIGABRT => "Aborted",
        Signal::SIGBUS => "Bus error",
        Signal::SIGFPE => "Floating point exception",
        Signal::SIGKILL => "Killed",
        Signal::SIGUSR1 => "User defined signal 1",
        Signal::SIGSEGV => "Segmentation fault",
        Signal::SIGUSR2 => "User defined signal 2",
        Signal::SIGPIPE => "Broken pipe",
        Signal::SIGALRM => "Alarm clock",
        Signal::SIGTERM => "Terminated",
        Signal::SIGCHLD => "Child exited",
        Signal::SIGCONT => "Continued",
        Signal::SIGSTOP => "Stopped (signal)",
        Signal::SIGTSTP => "Stopped",
        Signal::SIGTTIN => "Stopped (tty input)",
        Signal::SIGTTOU => "Stopped (tty output)",
        Signal::SIGURG => "Urgent I/O condition",
        Signal::SIGXCPU => "CPU time limit exceeded",
        Signal::SIGXFSZ => "File size limit exceeded",
        Signal::SIGVTALRM => "Virtual timer expired",
        Signal::SIGPROF => "Profiling timer expired",
        Signal::SIGWINCH => "Window changed",
        Signal::SIGIO => "I/O possible",
        Signal::SIGSYS => "Bad system call",
        _ => return None,
    };
    Some(text)
}
