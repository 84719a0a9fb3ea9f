use std::io;
use std::path::Path;

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use crossterm::terminal::disable_raw_mode;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use apscan::app;
use apscan::config::{self, CliArgs, Config, Transport};
use apscan::console::serial;
use apscan::console::terminal::{RawModeGuard, TerminalSource};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();

    if cli.print_default_config {
        print!("{}", config::default_config_toml());
        return Ok(());
    }

    // color-eyre reports, plus a hook that leaves raw mode before printing
    install_panic_hook()?;

    let config = config::load(&cli)?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(&config)?;

    info!("apscan starting");

    let radio = app::build_radio(&config)
        .await
        .wrap_err("Failed to set up the scan backend")?;

    match config.console.transport {
        Transport::Serial => {
            let port = &config.console.serial_port;
            let (source, sink) = serial::open(port, config.console.baud_rate)
                .wrap_err_with(|| format!("Failed to open serial console {port}"))?;
            app::run_session(source, sink, radio, &config).await?;
        }
        Transport::Terminal => {
            let _raw_mode = RawModeGuard::enable().wrap_err("Failed to enable raw mode")?;
            app::run_session(TerminalSource::new(), tokio::io::stdout(), radio, &config).await?;
        }
    }

    info!("apscan exiting");
    Ok(())
}

/// Install color-eyre, wrapping its panic hook so the terminal is restored
/// before the report is printed
fn install_panic_hook() -> Result<()> {
    color_eyre::install()?;
    let eyre_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        eyre_hook(panic_info);
    }));
    Ok(())
}

/// Initialize tracing.
///
/// Logs go to the configured file if there is one. Otherwise they go to
/// stderr when the console is a serial port, and are discarded when the
/// console is this terminal.
fn init_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    if let Some(ref path) = config.general.log_file {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .ok_or_else(|| eyre!("Log file path has no file name: {}", path.display()))?;

        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Ok(Some(guard))
    } else if config.console.transport == Transport::Serial {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        Ok(None)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("off"))
            .with_writer(io::sink)
            .init();
        Ok(None)
    }
}
