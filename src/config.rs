use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;
use tracing::info;

use crate::network::types::RawAccessPoint;

// ─── Embedded Default ────────────────────────────────────────────────────
/// Baked into the binary at compile time and written out on first run.
const DEFAULT_CONFIG_TOML: &str = include_str!("../default_config.toml");

// ─── CLI Arguments (override layer) ─────────────────────────────────────
/// apscan — continuous WiFi access point scanner with a serial console
#[derive(Parser, Debug, Clone)]
#[command(name = "apscan", version, about, long_about = None)]
pub struct CliArgs {
    /// Path to a custom config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Scan backend (overrides config file)
    #[arg(short, long, value_enum)]
    pub backend: Option<Backend>,

    /// WiFi interface to scan with (overrides config file)
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Serve the console on this serial device instead of the terminal
    #[arg(short, long, value_name = "PORT")]
    pub serial: Option<String>,

    /// Serial baud rate (overrides config file)
    #[arg(long)]
    pub baud: Option<u32>,

    /// Log level filter (overrides config file)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Log file path (overrides config file)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print the default config to stdout and exit
    #[arg(long)]
    pub print_default_config: bool,
}

// ─── TOML Structs ───────────────────────────────────────────────────────

/// Root configuration — parsed from TOML, then overridden by CLI flags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub simulated: SimulatedConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,

    /// Log file (logs go elsewhere or nowhere when unset)
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// NetworkManager over the system D-Bus
    #[value(name = "networkmanager")]
    NetworkManager,
    /// Fixed access points from the config file
    Simulated,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub backend: Backend,

    /// WiFi interface (empty string = auto-detect)
    pub interface: String,

    /// Pause between scan cycles (milliseconds)
    pub interval_ms: u64,

    /// Upper bound on one NetworkManager scan (milliseconds)
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Terminal,
    Serial,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub transport: Transport,
    pub serial_port: String,
    pub baud_rate: u32,

    /// Longest wait for one input byte (milliseconds)
    pub read_timeout_ms: u64,

    /// Translate "\n" into "\r\n" on output
    pub crlf: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    pub scan_time_ms: u64,
    pub access_points: Vec<RawAccessPoint>,
}

// ─── Defaults ───────────────────────────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".into(),
            log_file: None,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            backend: Backend::NetworkManager,
            interface: String::new(),
            interval_ms: 1700,
            timeout_ms: 10_000,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Terminal,
            serial_port: "/dev/ttyUSB0".into(),
            baud_rate: 115_200,
            read_timeout_ms: 20,
            crlf: true,
        }
    }
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            scan_time_ms: 400,
            access_points: Vec::new(),
        }
    }
}

// ─── Path Resolution ────────────────────────────────────────────────────

impl Config {
    /// Standard config file path: ~/.config/apscan/config.toml
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("apscan")
            .join("config.toml")
    }

    /// Convenience: interface as Option<&str> (empty = None)
    pub fn interface(&self) -> Option<&str> {
        let iface = self.scan.interface.trim();
        if iface.is_empty() {
            None
        } else {
            Some(iface)
        }
    }

    /// Pause between scan cycles as Duration
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan.interval_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan.timeout_ms)
    }

    /// Per-tick input wait; never zero so the console always yields
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.console.read_timeout_ms.max(1))
    }

    pub fn simulated_scan_time(&self) -> Duration {
        Duration::from_millis(self.simulated.scan_time_ms)
    }

    /// Parse a config from TOML text
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).wrap_err("Failed to parse config")
    }

    /// Apply CLI flags on top of the file values
    pub fn apply_cli(&mut self, cli: &CliArgs) {
        if let Some(backend) = cli.backend {
            self.scan.backend = backend;
        }
        if let Some(ref iface) = cli.interface {
            self.scan.interface = iface.clone();
        }
        if let Some(ref port) = cli.serial {
            self.console.transport = Transport::Serial;
            self.console.serial_port = port.clone();
        }
        if let Some(baud) = cli.baud {
            self.console.baud_rate = baud;
        }
        if let Some(ref level) = cli.log_level {
            self.general.log_level = level.clone();
        }
        if let Some(ref path) = cli.log_file {
            self.general.log_file = Some(path.clone());
        }
    }
}

// ─── Bootloader ─────────────────────────────────────────────────────────

/// The single entry point for configuration. Called exactly once at startup.
///
/// 1. Resolve config file path (CLI override or default)
/// 2. If the file doesn't exist, create directory tree + write defaults
/// 3. Parse TOML from disk into Config
/// 4. Apply CLI overrides on top
pub fn load(cli: &CliArgs) -> Result<Config> {
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);

    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&config_path, DEFAULT_CONFIG_TOML).wrap_err_with(|| {
            format!(
                "Failed to write default config to {}",
                config_path.display()
            )
        })?;
        info!("Created default config at {}", config_path.display());
    }

    let toml_str = std::fs::read_to_string(&config_path)
        .wrap_err_with(|| format!("Failed to read config from {}", config_path.display()))?;

    let mut config = Config::from_toml(&toml_str).wrap_err_with(|| {
        format!(
            "Invalid config at {}.\n\
             Delete the file to regenerate defaults, or run:\n  \
             apscan --print-default-config > {:?}",
            config_path.display(),
            config_path
        )
    })?;

    config.apply_cli(cli);
    Ok(config)
}

/// Returns the embedded default config TOML string.
pub fn default_config_toml() -> &'static str {
    DEFAULT_CONFIG_TOML
}
