use serde::{Deserialize, Serialize};

/// Processor time the child spent scheduled, and its peak resident memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub user_ms: f64,
    pub sys_ms: f64,
    pub max_rss_kb: u64,
}

impl ResourceUsage {
    /// `ru` must come from `wait4` on the child itself, which covers the child
    /// and the descendants it reaped, but never the supervisor.
    pub fn from_rusage(ru: &libc::rusage) -> Self {
        Self {
            user_ms: timeval_to_ms(&ru.ru_utime),
            sys_ms: timeval_to_ms(&ru.ru_stime),
            max_rss_kb: maxrss_to_kb(ru.ru_maxrss),
        }
    }

    pub fn total_ms(&self) -> f64 {
        self.user_ms + self.sys_ms
    }
}

fn timeval_to_ms(tv: &libc::timeval) -> f64 {
    tv.tv_sec as f64 * 1000.0 + tv.tv_usec as f64 / 1000.0
}

/// Linux reports `ru_maxrss` in KiB.
fn maxrss_to_kb(maxrss: libc::c_long) -> u64 {
    maxrss.max(0) as u64
}
