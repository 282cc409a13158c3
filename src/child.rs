use crate::pipe::PipeTx;
use crate::SupervisorConfig;

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::time::Duration;
use std::{io, ptr};

use anyhow::{Context, Result};

/// Everything the forked child needs, allocated before `fork`.
/// After `fork` the child only makes async-signal-safe calls.
pub struct ChildPlan {
    _cstrings: Vec<CString>,
    argv: Vec<*const libc::c_char>,
    cpu_limit: Option<libc::itimerval>,
}

impl ChildPlan {
    pub fn prepare(config: &SupervisorConfig) -> Result<Self> {
        let mut cstrings = Vec::new();
        let mut argv = Vec::new();

        if config.command.is_empty() {
            anyhow::bail!("no program given");
        }

        for a in &config.command {
            let c = CString::new(a.as_bytes())
                .with_context(|| format!("invalid argument: {:?}", a))?;
            argv.push(c.as_ptr());
            cstrings.push(c);
        }
        argv.push(ptr::null());

        Ok(Self {
            _cstrings: cstrings,
            argv,
            cpu_limit: config.processor_limit().map(prof_interval),
        })
    }

    /// Runs in the forked child. Never returns: either the program image
    /// replaces this process, or the errno is sent to the parent and the
    /// child exits.
    pub fn exec(&self, pipe_tx: &PipeTx) -> ! {
        let errno = match self.prepare_and_exec() {
            Err(err) => err.raw_os_error().unwrap_or(libc::EINVAL),
            Ok(never) => match never {},
        };
        pipe_tx.write_errno(errno);
        unsafe { libc::_exit(127) }
    }

    fn prepare_and_exec(&self) -> io::Result<std::convert::Infallible> {
        // Own process group, so a forced kill reaches any descendants too.
        if unsafe { libc::setpgid(0, 0) } < 0 {
            return Err(io::Error::last_os_error());
        }

        // Interval timers survive `execve`.
        if let Some(ref interval) = self.cpu_limit {
            let ret = unsafe { libc::setitimer(libc::ITIMER_PROF, interval, ptr::null_mut()) };
            if ret < 0 {
                return Err(io::Error::last_os_error());
            }
        }

        unsafe { libc::execvp(self.argv[0], self.argv.as_ptr()) };
        Err(io::Error::last_os_error())
    }
}

fn prof_interval(limit: Duration) -> libc::itimerval {
    libc::itimerval {
        it_interval: libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        },
        it_value: libc::timeval {
            tv_sec: limit.as_secs() as libc::time_t,
            tv_usec: limit.subsec_micros() as libc::suseconds_t,
        },
    }
}
