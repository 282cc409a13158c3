use std::io;

pub fn libc_call(f: impl FnOnce() -> i32) -> io::Result<u32> {
    let ret = f();
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret as u32)
}

/// Retries a libc call while it fails with `EINTR`.
pub fn libc_call_restart(mut f: impl FnMut() -> i32) -> io::Result<u32> {
    loop {
        match libc_call(&mut f) {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            ret => return ret,
        }
    }
}
