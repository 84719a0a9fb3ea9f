use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ApScanResult;
use crate::network::radio::Radio;
use crate::network::types::RawAccessPoint;

/// Radio that reports a fixed set of access points.
///
/// Used when no wireless hardware is available and for demos; each scan
/// takes `scan_time` and returns the configured list unchanged.
pub struct SimulatedRadio {
    access_points: Vec<RawAccessPoint>,
    scan_time: Duration,
}

impl SimulatedRadio {
    pub fn new(access_points: Vec<RawAccessPoint>, scan_time: Duration) -> Self {
        Self {
            access_points,
            scan_time,
        }
    }
}

#[async_trait]
impl Radio for SimulatedRadio {
    async fn scan(&self) -> ApScanResult<Vec<RawAccessPoint>> {
        tokio::time::sleep(self.scan_time).await;
        debug!(
            "Simulated scan returned {} access points",
            self.access_points.len()
        );
        Ok(self.access_points.clone())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::types::Bssid;

    #[tokio::test(start_paused = true)]
    async fn returns_configured_access_points_in_order() {
        let aps = vec![
            RawAccessPoint {
                bssid: Bssid([1, 2, 3, 4, 5, 6]),
                channel: 1,
                rssi: -40,
                ssid: b"first".to_vec(),
            },
            RawAccessPoint {
                bssid: Bssid([6, 5, 4, 3, 2, 1]),
                channel: 44,
                rssi: -71,
                ssid: Vec::new(),
            },
        ];
        let radio = SimulatedRadio::new(aps.clone(), Duration::from_millis(300));

        let started = tokio::time::Instant::now();
        let result = radio.scan().await.unwrap();
        assert_eq!(result, aps);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
