use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use zbus::proxy::CacheProperties;
use zbus::zvariant::OwnedObjectPath;
use zbus::Connection;

use crate::error::{ApScanError, ApScanResult};
use crate::network::dbus_proxies::*;
use crate::network::radio::Radio;
use crate::network::types::{channel_from_frequency, rssi_from_quality, RawAccessPoint};

/// NM device type for 802.11 devices
const DEVICE_TYPE_WIFI: u32 = 2;

/// How often `LastScan` is re-read while waiting for a scan to finish
const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Radio backend driving a wireless device through NetworkManager's D-Bus API.
pub struct NetworkManagerRadio {
    connection: Connection,
    device_path: OwnedObjectPath,
    interface: String,
    scan_timeout: Duration,
}

impl NetworkManagerRadio {
    /// Connect to the system D-Bus and pick the wireless device to scan with.
    ///
    /// `interface` selects a device by name; `None` takes the first WiFi
    /// device NetworkManager reports.
    pub async fn connect(interface: Option<&str>, scan_timeout: Duration) -> ApScanResult<Self> {
        let connection = Connection::system().await?;

        let nm_proxy = NetworkManagerProxy::new(&connection).await?;
        let version = nm_proxy.version().await?;
        if !nm_proxy.wireless_enabled().await.unwrap_or(true) {
            warn!("Wireless is disabled in NetworkManager; scans will come back empty");
        }

        let (device_path, interface) = find_wifi_device(&connection, interface).await?;
        info!(
            "Using {} ({}) via NetworkManager v{}",
            interface, device_path, version
        );

        Ok(Self {
            connection,
            device_path,
            interface,
            scan_timeout,
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    async fn wireless_proxy(&self) -> ApScanResult<WirelessProxy<'_>> {
        Ok(WirelessProxy::builder(&self.connection)
            .path(self.device_path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    /// Poll `LastScan` until it moves past `previous`
    async fn wait_for_scan(&self, proxy: &WirelessProxy<'_>, previous: i64) -> ApScanResult<()> {
        let wait = async {
            loop {
                tokio::time::sleep(SCAN_POLL_INTERVAL).await;
                if proxy.last_scan().await? != previous {
                    return Ok::<(), ApScanError>(());
                }
            }
        };

        tokio::time::timeout(self.scan_timeout, wait)
            .await
            .map_err(|_| {
                ApScanError::Timeout(format!(
                    "no scan result from {} after {:?}",
                    self.interface, self.scan_timeout
                ))
            })?
    }

    async fn read_access_point(&self, path: &OwnedObjectPath) -> ApScanResult<RawAccessPoint> {
        let proxy = AccessPointProxy::builder(&self.connection)
            .path(path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;

        let ssid = proxy.ssid().await.unwrap_or_default();
        let hw_address = proxy.hw_address().await?;
        let frequency = proxy.frequency().await.unwrap_or(0);
        let strength = proxy.strength().await.unwrap_or(0);

        raw_from_properties(ssid, &hw_address, frequency, strength)
    }
}

#[async_trait]
impl Radio for NetworkManagerRadio {
    async fn scan(&self) -> ApScanResult<Vec<RawAccessPoint>> {
        let proxy = self.wireless_proxy().await?;
        let previous = proxy.last_scan().await.unwrap_or(-1);

        match proxy.request_scan(HashMap::new()).await {
            Ok(()) => self.wait_for_scan(&proxy, previous).await?,
            // NM refuses back-to-back requests while a scan is running or
            // shortly after one finished; its list is current either way
            Err(e) => debug!("Scan request on {} not accepted: {}", self.interface, e),
        }

        let ap_paths = proxy.get_all_access_points().await?;
        let mut access_points = Vec::with_capacity(ap_paths.len());
        for ap_path in &ap_paths {
            match self.read_access_point(ap_path).await {
                Ok(ap) => access_points.push(ap),
                // APs can vanish between listing and reading
                Err(e) => debug!("Failed to read AP {}: {}", ap_path, e),
            }
        }

        Ok(access_points)
    }

    fn name(&self) -> &str {
        "networkmanager"
    }
}

/// Find the WiFi device path, optionally matching an interface name
async fn find_wifi_device(
    connection: &Connection,
    wanted: Option<&str>,
) -> ApScanResult<(OwnedObjectPath, String)> {
    let nm_proxy = NetworkManagerProxy::new(connection).await?;
    let devices = nm_proxy.get_devices().await?;

    for path in devices {
        let dev_proxy = DeviceProxy::builder(connection)
            .path(path.clone())?
            .build()
            .await?;

        if dev_proxy.device_type().await.unwrap_or(0) != DEVICE_TYPE_WIFI {
            continue;
        }

        let interface = dev_proxy.interface().await.unwrap_or_default();
        if wanted.map_or(true, |w| w == interface) {
            return Ok((path, interface));
        }
    }

    Err(ApScanError::DeviceNotFound(match wanted {
        Some(name) => format!("no WiFi device named {name}"),
        None => "no WiFi device managed by NetworkManager".into(),
    }))
}

/// Build a raw record from NetworkManager's access point properties
pub fn raw_from_properties(
    ssid: Vec<u8>,
    hw_address: &str,
    frequency: u32,
    strength: u8,
) -> ApScanResult<RawAccessPoint> {
    Ok(RawAccessPoint {
        bssid: hw_address.parse()?,
        channel: channel_from_frequency(frequency),
        rssi: rssi_from_quality(strength),
        ssid,
    })
}
