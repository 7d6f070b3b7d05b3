use anyhow::Result;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE: &str = "cli.log";

/// Initialize logging for the CLI
///
/// `RUST_LOG` takes precedence over `level`. Unless `no_file_log` is set,
/// everything is also written to `<state_dir>/cli.log`.
pub fn init_logging(level: Level, state_dir: &Path, no_file_log: bool) -> Result<()> {
    let level_str = level.as_str().to_lowercase();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("hrdesk={level_str},hrdesk_core={level_str},hrdesk_http={level_str},hrdesk_session={level_str}").into()
    });

    fn stderr<S>() -> impl tracing_subscriber::Layer<S>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    }

    if no_file_log {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr())
            .init();
        return Ok(());
    }

    std::fs::create_dir_all(state_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(state_dir.join(LOG_FILE))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .with(stderr())
        .init();

    Ok(())
}
