use crate::utils::{libc_call, libc_call_restart};

use std::io;
use std::os::unix::io::RawFd;

pub struct PipeTx(RawFd);
pub struct PipeRx(RawFd);

impl Drop for PipeTx {
    fn drop(&mut self) {
        let _ = unsafe { libc::close(self.0) };
    }
}

impl Drop for PipeRx {
    fn drop(&mut self) {
        let _ = unsafe { libc::close(self.0) };
    }
}

/// Both ends are close-on-exec: a successful `execve` in the child closes
/// the write end, which the parent observes as EOF.
pub fn create() -> io::Result<(PipeTx, PipeRx)> {
    let mut fds = [0, 0];
    libc_call(|| unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) })?;
    let rx = PipeRx(fds[0]);
    let tx = PipeTx(fds[1]);
    Ok((tx, rx))
}

impl PipeTx {
    /// Async-signal-safe: called in the forked child.
    pub fn write_errno(&self, errno: i32) {
        let bytes = errno.to_ne_bytes();
        let _ = unsafe { libc::write(self.0, bytes.as_ptr().cast(), bytes.len()) };
    }
}

impl PipeRx {
    /// Returns `None` if the write end was closed without a message.
    pub fn read_errno(self) -> io::Result<Option<i32>> {
        let mut bytes = [0_u8; 4];
        let mut filled = 0;
        while filled < bytes.len() {
            let rest = &mut bytes[filled..];
            let n = libc_call_restart(|| unsafe {
                libc::read(self.0, rest.as_mut_ptr().cast(), rest.len()) as i32
            })?;
            if n == 0 {
                break;
            }
            filled += n as usize;
        }
        match filled {
            0 => Ok(None),
            4 => Ok(Some(i32::from_ne_bytes(bytes))),
            _ => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated errno from child",
            )),
        }
    }
}
