//! # apscan
//!
//! Continuous WiFi access point scanner driven from a line-oriented console.
//!
//! - [`scanner::ScanController`] runs at most one background scan loop that
//!   scans, replaces the [`network::SnapshotStore`], prints one line per
//!   access point and sleeps.
//! - [`console::CommandInterpreter`] reads the console byte by byte, echoes
//!   input and dispatches `scanap`, `stopscan` and `help`.
//! - [`network::Radio`] is the scan backend: NetworkManager over D-Bus, or a
//!   simulated radio fed from the config file.

pub mod app;
pub mod config;
pub mod console;
pub mod error;
pub mod network;
pub mod scanner;

pub use error::{ApScanError, ApScanResult};
