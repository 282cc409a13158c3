use crate::child::ChildPlan;
use crate::exit::{classify, Ending};
use crate::pipe;
use crate::proc;
use crate::report::Report;
use crate::signal::{self, TimeoutGuard};
use crate::usage::ResourceUsage;
use crate::{SupervisorConfig, MAX_DELIMITER_LEN};

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use nix::unistd::{self, Pid};
use scopeguard::{guard, ScopeGuard};
use tokio::task;
use tracing::{debug, trace, warn};

/// Runs the configured command once and reports how it ended.
///
/// Errors are reserved for failures of the supervisor itself. Anything the
/// child does, including failing to start, ends up in the report.
#[tracing::instrument(level = "trace", err, skip(config), fields(program = ?config.program()))]
pub async fn run(config: &SupervisorConfig) -> Result<Report> {
    trace!(?config);

    validate(config)?;

    let (pipe_tx, pipe_rx) = pipe::create().context("failed to create pipe")?;

    let (t0, child_pid) = {
        let plan = ChildPlan::prepare(config)?;

        let t0 = Instant::now();

        match unsafe { proc::fork() }.context("failed to fork")? {
            None => {
                drop(pipe_rx);
                plan.exec(&pipe_tx)
            }
            Some(child_pid) => (t0, child_pid),
        }
    };

    drop(pipe_tx);

    // Until the report is assembled, any early return takes the child down.
    let mut child = guard(
        ChildState {
            pid: child_pid,
            killed: false,
        },
        abort_child,
    );

    // Also done in the child; whichever runs first wins.
    let _ = unistd::setpgid(child_pid, child_pid);

    let exec_errno = task::spawn_blocking(move || pipe_rx.read_errno())
        .await
        .context("pipe reader task failed")?
        .context("failed to read child result")?;

    if let Some(errno) = exec_errno {
        let err = std::io::Error::from_raw_os_error(errno);
        debug!(pid = ?child_pid, %err, elapsed = ?t0.elapsed(), "child failed before exec");
        proc::reap(child_pid).context("failed to reap child")?;
        ScopeGuard::into_inner(child);
        return Ok(assemble(child_pid, Ending::ExecFailed, None, config));
    }

    let ending = supervise(child_pid, t0, config, &mut child.killed).await?;
    let (status, ru) = proc::reap(child_pid).context("failed to wait4")?;
    let pid = ScopeGuard::into_inner(child).pid;

    let ending = match ending {
        Some(limit) => Ending::Forced { limit },
        None => Ending::Finished(status),
    };

    trace!(?status, ?ending, real_duration = ?t0.elapsed());

    let usage = ResourceUsage::from_rusage(&ru);
    Ok(assemble(pid, ending, Some(usage), config))
}

#[derive(Debug)]
struct ChildState {
    pid: Pid,
    /// The forced kill has been sent.
    killed: bool,
}

fn abort_child(state: ChildState) {
    warn!(?state, "supervision aborted, cleaning up child");
    if !state.killed {
        let _ = signal::kill_child(state.pid);
    }
    let _ = proc::reap(state.pid);
}

fn validate(config: &SupervisorConfig) -> Result<()> {
    match config.program() {
        Some(program) if !program.is_empty() => {}
        _ => anyhow::bail!("program must not be empty"),
    }

    if let Some(ref delimiter) = config.delimiter {
        if delimiter.len() >= MAX_DELIMITER_LEN {
            anyhow::bail!(
                "delimiter must be shorter than {} bytes: delimiter = {:?}",
                MAX_DELIMITER_LEN,
                delimiter
            );
        }
    }

    Ok(())
}

/// Races the child's termination against the deadline. Returns the limit
/// if the deadline won and the child was killed.
///
/// The child is observed with `WNOWAIT` and stays unreaped until this
/// returns, so the forced kill can only ever reach the child's own group.
async fn supervise(
    child_pid: Pid,
    t0: Instant,
    config: &SupervisorConfig,
    killed: &mut bool,
) -> Result<Option<Duration>> {
    let timeout = TimeoutGuard::arm(child_pid, t0, config.deadline());

    let mut waiter = task::spawn_blocking(move || proc::wait_exit(child_pid));

    // A termination observed first beats a deadline that elapsed meanwhile.
    let finished = tokio::select! {
        biased;
        ret = &mut waiter => Some(ret),
        _ = timeout.elapsed() => None,
    };

    match finished {
        Some(ret) => {
            timeout.disarm();
            ret.context("waiter task failed")?
                .context("failed to wait for child")?;
            Ok(None)
        }
        None => {
            let limit = timeout.fire().context("failed to kill child")?;
            *killed = true;
            debug!(?child_pid, ?limit, "deadline elapsed, child killed");
            waiter
                .await
                .context("waiter task failed")?
                .context("failed to wait for child")?;
            Ok(Some(limit))
        }
    }
}

fn assemble(
    pid: Pid,
    ending: Ending,
    usage: Option<ResourceUsage>,
    config: &SupervisorConfig,
) -> Report {
    let exit = classify(ending, config.processor_limit());
    let report = Report::assemble(pid.as_raw(), exit, usage.unwrap_or_default());
    debug!(%exit, total_ms = report.total_ms(), max_rss_kb = report.max_rss_kb());
    report
}
