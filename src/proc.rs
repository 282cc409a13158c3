use crate::utils::{libc_call, libc_call_restart};

use std::{io, mem};

use nix::unistd::Pid;

/// How the kernel says a reaped child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawStatus {
    Exited(i32),
    Signaled(i32),
}

impl RawStatus {
    pub fn from_wait_status(status: libc::c_int) -> Self {
        if libc::WIFSIGNALED(status) {
            RawStatus::Signaled(libc::WTERMSIG(status))
        } else if libc::WIFSTOPPED(status) {
            // Not requested with WUNTRACED; folded into the signal case.
            RawStatus::Signaled(libc::WSTOPSIG(status))
        } else {
            RawStatus::Exited(libc::WEXITSTATUS(status))
        }
    }
}

/// # Safety
/// Only async-signal-safe work may happen in the child branch.
pub unsafe fn fork() -> io::Result<Option<Pid>> {
    let ret = libc_call(|| libc::fork())?;
    if ret == 0 {
        Ok(None)
    } else {
        Ok(Some(Pid::from_raw(ret as _)))
    }
}

/// Blocks until the child has terminated, without reaping it.
/// The zombie keeps the pid (and the process group id) reserved.
pub fn wait_exit(child_pid: Pid) -> io::Result<()> {
    let pid = child_pid.as_raw() as libc::id_t;
    let mut info: libc::siginfo_t = unsafe { mem::zeroed() };

    loop {
        libc_call_restart(|| unsafe {
            libc::waitid(
                libc::P_PID,
                pid,
                &mut info,
                libc::WEXITED | libc::WNOWAIT,
            )
        })?;
        if unsafe { info.si_pid() } > 0 {
            return Ok(());
        }
    }
}

/// Reaps the child and collects its resource usage.
pub fn reap(child_pid: Pid) -> io::Result<(RawStatus, libc::rusage)> {
    let mut status: libc::c_int = 0;
    let mut ru: libc::rusage = unsafe { mem::zeroed() };

    libc_call_restart(|| unsafe { libc::wait4(child_pid.as_raw(), &mut status, 0, &mut ru) })?;

    Ok((RawStatus::from_wait_status(status), ru))
}
