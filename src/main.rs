use anyhow::Result;
use clap::Parser;
use proctime::SupervisorConfig;
use tokio::runtime;

fn setup_tracing(verbose: bool) {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "trace" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .event_format(fmt::format::Format::default().pretty())
        .with_env_filter(filter)
        .with_timer(fmt::time::ChronoLocal::rfc3339())
        .with_writer(std::io::stderr)
        .finish()
        .with(ErrorLayer::default())
        .init();
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = SupervisorConfig::parse();
    setup_tracing(config.verbose);

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(1)
        .enable_time()
        .build()?;

    let report = runtime.block_on(proctime::run(&config))?;

    config.sink().emit(&report, &config.report_format())?;

    Ok(())
}
