use proctime::{Command, ExitKind, ExitOutcome, Report};

use std::time::{Duration, Instant};

const SH: &str = "/bin/sh";
const BUSY_LOOP: &str = "while :; do :; done";

fn sh(script: &str) -> Command {
    let mut cmd = Command::new(SH);
    cmd.arg("-c").arg(script);
    cmd
}

fn assert_times_consistent(report: &Report) {
    let sum = report.user_ms() + report.sys_ms();
    assert!((report.total_ms() - sum).abs() < 1e-6, "{:?}", report);
}

mod test_return {
    use super::*;

    #[tokio::test]
    async fn test_quick_return() {
        let report = Command::new("true").run().await.unwrap();
        assert_eq!(report.exit(), ExitOutcome::Returned { code: 0 });
        assert_eq!(report.exit().kind(), ExitKind::Return);
        assert!(report.total_ms() < 500.0);
        assert!(report.max_rss_kb() > 0);
        assert!(report.pid() > 0);
        assert_times_consistent(&report);
    }

    #[tokio::test]
    async fn test_nonzero_code() {
        let report = sh("exit 3").run().await.unwrap();
        assert_eq!(report.exit(), ExitOutcome::Returned { code: 3 });
        assert_eq!(report.exit().repr(), Some(3));
    }

    #[tokio::test]
    async fn test_caught_interrupt_is_a_return() {
        let report = sh("trap 'exit 1' INT; kill -INT $$; sleep 5")
            .run()
            .await
            .unwrap();
        assert_eq!(report.exit(), ExitOutcome::Returned { code: 1 });
    }

    #[tokio::test]
    async fn test_sleep_is_not_processor_time() {
        let t0 = Instant::now();
        let report = Command::new("sleep").arg("1").run().await.unwrap();
        assert!(t0.elapsed() >= Duration::from_millis(1000));
        assert_eq!(report.exit(), ExitOutcome::Returned { code: 0 });
        assert!(report.total_ms() < 500.0, "{:?}", report);
    }

    #[tokio::test]
    async fn test_zero_timeout_is_unbounded() {
        let report = Command::new("true").timeout_ms(0).run().await.unwrap();
        assert_eq!(report.exit(), ExitOutcome::Returned { code: 0 });
    }
}

mod test_signal {
    use super::*;

    #[tokio::test]
    async fn test_self_kill() {
        let report = sh("kill -9 $$").run().await.unwrap();
        assert_eq!(
            report.exit(),
            ExitOutcome::Signaled {
                signal: libc::SIGKILL
            }
        );
        assert_eq!(report.exit().repr(), Some(9));
        assert!(report
            .exit()
            .description()
            .to_lowercase()
            .contains("kill"));
        assert!(report.total_ms() < 500.0);
        assert!(report.max_rss_kb() > 0);
    }

    #[tokio::test]
    async fn test_self_term() {
        let report = sh("kill -TERM $$").run().await.unwrap();
        assert_eq!(
            report.exit(),
            ExitOutcome::Signaled {
                signal: libc::SIGTERM
            }
        );
    }

    #[tokio::test]
    async fn test_prof_signal_without_timeout() {
        let report = sh("kill -PROF $$").run().await.unwrap();
        assert_eq!(report.exit().kind(), ExitKind::Signal);
    }
}

mod test_timeout {
    use super::*;

    #[tokio::test]
    async fn test_busy_loop_timeout() {
        let report = sh(BUSY_LOOP).timeout_ms(1500).run().await.unwrap();
        assert_eq!(report.exit(), ExitOutcome::TimedOut { limit_ms: 1500 });
        assert_eq!(report.exit().description(), "child runtime limit (ms)");
        assert!(report.total_ms() >= 1500.0, "{:?}", report);
        assert_times_consistent(&report);
    }

    #[tokio::test]
    async fn test_timeout_is_processor_time() {
        let t0 = Instant::now();
        let report = sh("sleep 2; exit 4").timeout_ms(1000).run().await.unwrap();
        assert!(t0.elapsed() >= Duration::from_millis(2000));
        assert_eq!(report.exit(), ExitOutcome::Returned { code: 4 });
    }

    #[tokio::test]
    async fn test_wall_backstop_busy() {
        let t0 = Instant::now();
        let report = sh(BUSY_LOOP).wall_timeout_ms(1500).run().await.unwrap();
        let real = t0.elapsed();
        assert_eq!(report.exit(), ExitOutcome::TimedOut { limit_ms: 1500 });
        assert_eq!(report.exit().repr(), Some(1500));
        assert!(real >= Duration::from_millis(1500));
        assert!(real < Duration::from_millis(4000));
        // killed on wall time: never more processor time than wall time
        assert!(report.total_ms() <= real.as_secs_f64() * 1000.0, "{:?}", report);
    }

    #[tokio::test]
    async fn test_first_limit_wins() {
        let report = sh(BUSY_LOOP)
            .timeout_ms(700)
            .wall_timeout_ms(10_000)
            .run()
            .await
            .unwrap();
        assert_eq!(report.exit(), ExitOutcome::TimedOut { limit_ms: 700 });
        assert!(report.total_ms() >= 700.0, "{:?}", report);
    }

    #[tokio::test]
    async fn test_wall_deadline_sleeping() {
        let t0 = Instant::now();
        let report = Command::new("sleep")
            .arg("10")
            .wall_timeout_ms(1000)
            .run()
            .await
            .unwrap();
        let real = t0.elapsed();
        assert_eq!(report.exit(), ExitOutcome::TimedOut { limit_ms: 1000 });
        assert!(real >= Duration::from_millis(1000));
        assert!(real < Duration::from_millis(5000));
        assert!(report.total_ms() < 500.0);
    }

    #[tokio::test]
    async fn test_kill_reaches_process_group() {
        let t0 = Instant::now();
        let report = sh("sleep 30 & sleep 30 & wait")
            .wall_timeout_ms(500)
            .run()
            .await
            .unwrap();
        assert_eq!(report.exit(), ExitOutcome::TimedOut { limit_ms: 500 });
        assert!(t0.elapsed() < Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_finishes_before_deadline() {
        let report = Command::new("true")
            .timeout_ms(3000)
            .wall_timeout_ms(3000)
            .run()
            .await
            .unwrap();
        assert_eq!(report.exit(), ExitOutcome::Returned { code: 0 });
    }
}

mod test_quit {
    use super::*;

    use std::fs;

    fn assert_quit(report: &Report) {
        assert_eq!(report.exit(), ExitOutcome::FailedBeforeExec);
        assert_eq!(report.exit().repr(), None);
        assert_eq!(report.exit().description(), "child error before exec");
        assert_eq!(report.total_ms(), 0.0);
        assert_eq!(report.max_rss_kb(), 0);
    }

    #[tokio::test]
    async fn test_missing_program() {
        let t0 = Instant::now();
        let report = Command::new("./no/such/program")
            .timeout_ms(5000)
            .wall_timeout_ms(5000)
            .run()
            .await
            .unwrap();
        assert!(t0.elapsed() < Duration::from_millis(50));
        assert_quit(&report);
    }

    #[tokio::test]
    async fn test_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text.txt");
        fs::write(&path, "just some text\n").unwrap();

        let t0 = Instant::now();
        let report = Command::new(&path).wall_timeout_ms(5000).run().await.unwrap();
        assert!(t0.elapsed() < Duration::from_millis(50));
        assert_quit(&report);
    }
}

mod test_config {
    use super::*;

    #[tokio::test]
    async fn test_long_delimiter_is_a_supervisor_error() {
        let result = Command::new("true")
            .delimiter("x".repeat(20))
            .run()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_report_round_trip() {
        let report = sh("exit 5").run().await.unwrap();
        let text = serde_json::to_string(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["exit"]["type"], "return");
        assert_eq!(value["exit"]["repr"], 5);
        let parsed: Report = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, report);
    }
}
