// D-Bus proxy trait definitions for the NetworkManager interfaces the
// scanner needs. zbus's #[proxy] macro generates the typed async clients.

use std::collections::HashMap;
use zbus::proxy;
use zbus::zvariant::{OwnedObjectPath, OwnedValue};

// ── NetworkManager Main Interface ─────────────────────────────────────

#[proxy(
    interface = "org.freedesktop.NetworkManager",
    default_service = "org.freedesktop.NetworkManager",
    default_path = "/org/freedesktop/NetworkManager"
)]
pub trait NetworkManager {
    /// Get all network devices
    fn get_devices(&self) -> zbus::Result<Vec<OwnedObjectPath>>;

    /// NetworkManager version
    #[zbus(property)]
    fn version(&self) -> zbus::Result<String>;

    /// Whether wireless is enabled
    #[zbus(property)]
    fn wireless_enabled(&self) -> zbus::Result<bool>;
}

// ── Device Interface ──────────────────────────────────────────────────

#[proxy(
    interface = "org.freedesktop.NetworkManager.Device",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait Device {
    /// Device interface name (e.g., "wlan0")
    #[zbus(property)]
    fn interface(&self) -> zbus::Result<String>;

    /// Device type (2 = WiFi)
    #[zbus(property)]
    fn device_type(&self) -> zbus::Result<u32>;
}

// ── Wireless Device Interface ─────────────────────────────────────────

#[proxy(
    interface = "org.freedesktop.NetworkManager.Device.Wireless",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait Wireless {
    /// Request a WiFi scan
    fn request_scan(&self, options: HashMap<String, OwnedValue>) -> zbus::Result<()>;

    /// Get all visible access points, hidden ones included
    fn get_all_access_points(&self) -> zbus::Result<Vec<OwnedObjectPath>>;

    /// Last scan time (CLOCK_BOOTTIME milliseconds, -1 if never scanned)
    #[zbus(property)]
    fn last_scan(&self) -> zbus::Result<i64>;
}

// ── Access Point Interface ────────────────────────────────────────────

#[proxy(
    interface = "org.freedesktop.NetworkManager.AccessPoint",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait AccessPoint {
    /// SSID as bytes
    #[zbus(property)]
    fn ssid(&self) -> zbus::Result<Vec<u8>>;

    /// BSSID (MAC address string)
    #[zbus(property)]
    fn hw_address(&self) -> zbus::Result<String>;

    /// Frequency in MHz
    #[zbus(property)]
    fn frequency(&self) -> zbus::Result<u32>;

    /// Signal strength 0-100
    #[zbus(property)]
    fn strength(&self) -> zbus::Result<u8>;
}
