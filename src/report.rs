use crate::exit::{ExitKind, ExitOutcome};
use crate::usage::ResourceUsage;

use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

/// The result of one supervised run. Built once, after the child is reaped.
///
/// `total_ms` is processor time (`user_ms + sys_ms`), not wall time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ReportRepr", try_from = "ReportRepr")]
pub struct Report {
    pid: i32,
    exit: ExitOutcome,
    usage: ResourceUsage,
}

impl Report {
    /// Usage is dropped for a child that never started executing.
    pub fn assemble(pid: i32, exit: ExitOutcome, usage: ResourceUsage) -> Self {
        let usage = if exit.has_executed() {
            usage
        } else {
            ResourceUsage::default()
        };
        Self { pid, exit, usage }
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn exit(&self) -> ExitOutcome {
        self.exit
    }

    pub fn max_rss_kb(&self) -> u64 {
        self.usage.max_rss_kb
    }

    pub fn total_ms(&self) -> f64 {
        self.usage.total_ms()
    }

    pub fn user_ms(&self) -> f64 {
        self.usage.user_ms
    }

    pub fn sys_ms(&self) -> f64 {
        self.usage.sys_ms
    }
}

/// Wire shape. Every field is always present, `repr` as `null` when absent.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReportRepr {
    pid: i32,
    maxrss_kb: u64,
    exit: ExitRepr,
    times_ms: TimesRepr,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExitRepr {
    #[serde(rename = "type")]
    kind: ExitKind,
    repr: Option<i64>,
    desc: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimesRepr {
    total: f64,
    user: f64,
    sys: f64,
}

impl From<Report> for ReportRepr {
    fn from(report: Report) -> Self {
        let exit = report.exit;
        Self {
            pid: report.pid,
            maxrss_kb: report.max_rss_kb(),
            exit: ExitRepr {
                kind: exit.kind(),
                repr: exit.repr(),
                desc: exit.description().into_owned(),
            },
            times_ms: TimesRepr {
                total: report.total_ms(),
                user: report.user_ms(),
                sys: report.sys_ms(),
            },
        }
    }
}

impl TryFrom<ReportRepr> for Report {
    type Error = String;

    fn try_from(repr: ReportRepr) -> Result<Self, Self::Error> {
        let exit = ExitOutcome::from_parts(repr.exit.kind, repr.exit.repr)?;

        let desc = exit.description();
        if repr.exit.desc != desc {
            return Err(format!(
                "exit.desc = {:?} does not match {:?}",
                repr.exit.desc, desc
            ));
        }

        let times = &repr.times_ms;
        if times.user < 0.0 || times.sys < 0.0 {
            return Err(format!("negative processor time: {:?}", times));
        }
        if (times.total - (times.user + times.sys)).abs() > 1e-3 {
            return Err(format!("times_ms.total != user + sys: {:?}", times));
        }

        let usage = ResourceUsage {
            user_ms: times.user,
            sys_ms: times.sys,
            max_rss_kb: repr.maxrss_kb,
        };
        if !exit.has_executed() && usage != ResourceUsage::default() {
            return Err("resource usage reported for a child that never ran".into());
        }

        Ok(Report {
            pid: repr.pid,
            exit,
            usage,
        })
    }
}
