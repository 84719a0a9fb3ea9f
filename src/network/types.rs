use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::ApScanError;

/// Maximum SSID length in bytes (802.11)
pub const SSID_CAPACITY: usize = 32;

/// Placeholder printed for networks that do not broadcast a name
pub const HIDDEN_SSID: &str = "<hidden>";

// ── BSSID ─────────────────────────────────────────────────────────────

/// 6-byte hardware address of an access point radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bssid(pub [u8; 6]);

impl Bssid {
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for Bssid {
    type Err = ApScanError;

    /// Parse `aa:bb:cc:dd:ee:ff` (either case), as reported by NetworkManager
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ApScanError::Scan(format!("invalid BSSID: \"{s}\""));

        let mut bytes = [0u8; 6];
        let mut parts = s.trim().split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

impl<'de> Deserialize<'de> for Bssid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── SSID ──────────────────────────────────────────────────────────────

/// Network name held in a fixed 32-byte buffer.
///
/// Raw names are cut at the first NUL and then at [`SSID_CAPACITY`] bytes, so
/// a record never carries more than the radio can advertise, whatever the
/// backend handed over.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ssid(heapless::Vec<u8, SSID_CAPACITY>);

impl Ssid {
    pub fn from_raw(raw: &[u8]) -> Self {
        let mut name = heapless::Vec::new();
        for &byte in raw.iter().take_while(|&&b| b != 0).take(SSID_CAPACITY) {
            // Cannot overflow: the iterator is already capped at capacity
            let _ = name.push(byte);
        }
        Self(name)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// An empty name marks a hidden network
    pub fn is_hidden(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Ssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_hidden() {
            f.write_str(HIDDEN_SSID)
        } else {
            f.write_str(&String::from_utf8_lossy(&self.0))
        }
    }
}

// ── Band ──────────────────────────────────────────────────────────────

/// Coarse frequency band derived from a channel number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    TwoPointFour,
    Five,
    Six,
    Unknown,
}

impl Band {
    /// Classify a channel number.
    ///
    /// Ranges are tested in order 2.4G, 5G, 6G. The 6G test accepts anything
    /// in `1..=233`, so channels 15-35 and 166-233 are reported as 6G by
    /// elimination rather than by a real 6 GHz channel table.
    pub fn from_channel(channel: u8) -> Self {
        if (1..=14).contains(&channel) {
            Self::TwoPointFour
        } else if (36..=165).contains(&channel) {
            Self::Five
        } else if (1..=233).contains(&channel) {
            Self::Six
        } else {
            Self::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TwoPointFour => "2.4G",
            Self::Five => "5G",
            Self::Six => "6G",
            Self::Unknown => "?",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Band label for a channel: `"2.4G"`, `"5G"`, `"6G"` or `"?"`
pub fn band_from_channel(channel: u8) -> &'static str {
    Band::from_channel(channel).label()
}

/// Compute WiFi channel from frequency in MHz
pub fn channel_from_frequency(freq: u32) -> u8 {
    let channel = match freq {
        2484 => 14,
        2412..=2472 => (freq - 2407) / 5,
        5000..=5900 => (freq - 5000) / 5,
        // 6 GHz channel 2 sits off the 5950 MHz grid
        5935 => 2,
        5925..=7125 => freq.saturating_sub(5950) / 5,
        _ => 0,
    };
    u8::try_from(channel).unwrap_or(0)
}

/// Approximate dBm from a 0-100 signal quality percentage
pub fn rssi_from_quality(quality: u8) -> i32 {
    i32::from(quality.min(100)) / 2 - 100
}

// ── Records ───────────────────────────────────────────────────────────

/// An access point as handed over by a radio backend, before normalization
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawAccessPoint {
    pub bssid: Bssid,
    pub channel: u8,
    pub rssi: i32,
    /// Name bytes as received; may be longer than 32 bytes or contain NULs
    #[serde(default, deserialize_with = "deserialize_ssid_bytes")]
    pub ssid: Vec<u8>,
}

fn deserialize_ssid_bytes<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(String::deserialize(deserializer)?.into_bytes())
}

/// One observed access point from a single scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPointRecord {
    pub bssid: Bssid,
    pub channel: u8,
    pub rssi: i32,
    pub ssid: Ssid,
}

impl AccessPointRecord {
    pub fn band(&self) -> Band {
        Band::from_channel(self.channel)
    }
}

impl From<&RawAccessPoint> for AccessPointRecord {
    fn from(raw: &RawAccessPoint) -> Self {
        Self {
            bssid: raw.bssid,
            channel: raw.channel,
            rssi: raw.rssi,
            ssid: Ssid::from_raw(&raw.ssid),
        }
    }
}

/// Renders the console line for a record (without the trailing newline)
impl fmt::Display for AccessPointRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Band: {} RSSI: {} Ch: {} BSSID: {} ESSID: {}",
            self.band(),
            self.rssi,
            self.channel,
            self.bssid,
            self.ssid
        )
    }
}
