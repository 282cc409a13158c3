use std::future;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::time;
use tracing::trace;

/// Deadline for one child, measured from its start on the monotonic clock.
///
/// The guard holds the only path that sends the forced kill, and `fire`
/// consumes the guard, so at most one kill is ever sent.
pub struct TimeoutGuard {
    pgid: Pid,
    limit: Option<Duration>,
    deadline: Option<time::Instant>,
}

impl TimeoutGuard {
    pub fn arm(pgid: Pid, started: Instant, limit: Option<Duration>) -> Self {
        let deadline = limit.map(|limit| time::Instant::from_std(started + limit));
        trace!(?pgid, ?limit, "timeout armed");
        Self {
            pgid,
            limit,
            deadline,
        }
    }

    /// Completes when the deadline passes. Never completes when unbounded.
    pub async fn elapsed(&self) {
        match self.deadline {
            Some(deadline) => time::sleep_until(deadline).await,
            None => future::pending().await,
        }
    }

    /// Kills the whole process group. The caller must not have reaped the
    /// group leader yet.
    pub fn fire(self) -> nix::Result<Duration> {
        kill_child(self.pgid)?;
        Ok(self.limit.unwrap_or_default())
    }

    pub fn disarm(self) {
        trace!(pgid = ?self.pgid, "timeout disarmed");
    }
}

/// Sends one SIGKILL: to the child's group, or to the child alone if the
/// group was never formed (nothing has been delivered in that case).
pub fn kill_child(pid: Pid) -> nix::Result<()> {
    kill_group(pid, Signal::SIGKILL).or_else(|_| send_signal(pid, Signal::SIGKILL))
}

pub fn kill_group(pgid: Pid, signal: Signal) -> nix::Result<()> {
    let result = signal::killpg(pgid, signal);
    trace!(
        "killpg pgid = {}, signal = {}, result = {:?}",
        pgid,
        signal,
        result
    );
    result
}

pub fn send_signal(pid: Pid, signal: Signal) -> nix::Result<()> {
    let result = signal::kill(pid, signal);
    trace!(
        "kill pid = {}, signal = {}, result = {:?}",
        pid,
        signal,
        result
    );
    result
}
