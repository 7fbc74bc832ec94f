use std::fs::File;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use daemonize::Daemonize;
use log::{LevelFilter, info};
use night_dimd::{application::Application, cli::Cli, config::Config};
use syslog::{BasicLogger, Facility, Formatter3164};

const DAEMON_LOG: &str = "/var/tmp/night_dimd.log";

/// Logs to syslog, or to stderr when no syslog socket is reachable.
fn init_log(level: LevelFilter) -> Result<()> {
    let formatter = Formatter3164 {
        facility: Facility::LOG_DAEMON,
        hostname: None,
        process: "night_dimd".into(),
        pid: std::process::id(),
    };

    match syslog::unix(formatter) {
        Ok(logger) => log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
            .map(|()| log::set_max_level(level))
            .map_err(|e| anyhow!("{e}")),
        Err(e) => {
            env_logger::Builder::new()
                .filter_level(level)
                .try_init()
                .context("Failed to initialize stderr logger")?;
            info!("syslog unavailable ({e}), logging to stderr");
            Ok(())
        }
    }
}

fn into_daemon() -> Result<()> {
    let stdout =
        File::create(DAEMON_LOG).with_context(|| format!("Failed to create {DAEMON_LOG}"))?;
    let stderr = stdout.try_clone()?;

    Daemonize::new()
        .stdout(stdout)
        .stderr(stderr)
        .start()
        .map_err(|e| anyhow!("{e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    init_log(level)?;
    if cli.daemonize {
        // Fork before any runtime threads exist.
        into_daemon()?;
    }

    let config = Config::from_cli(&cli);
    info!("Starting night_dimd with {config:?}");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async {
            Application::builder()
                .with_config(config)
                .build()?
                .run()
                .await
        })
}
