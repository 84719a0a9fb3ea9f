use std::collections::TryReserveError;
use std::sync::{Arc, RwLock};

use super::types::{AccessPointRecord, RawAccessPoint};

/// The complete result of one scan, in the order the radio reported it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: Vec<AccessPointRecord>,
}

impl Snapshot {
    pub fn new(records: Vec<AccessPointRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessPointRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[AccessPointRecord] {
        &self.records
    }
}

/// Normalize raw scan output into records, allocating fallibly.
///
/// An allocation failure is returned rather than producing a partial list.
pub fn normalize(raw: &[RawAccessPoint]) -> Result<Vec<AccessPointRecord>, TryReserveError> {
    let mut records = Vec::new();
    records.try_reserve_exact(raw.len())?;
    records.extend(raw.iter().map(AccessPointRecord::from));
    Ok(records)
}

/// Holds the most recent scan snapshot.
///
/// Every install swaps the whole snapshot behind one pointer, so a reader
/// sees either the old set or the new one, never a mix. The previous
/// snapshot is dropped once its last reader lets go of it.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new snapshot, discarding the previous one
    pub fn replace(&self, records: Vec<AccessPointRecord>) {
        self.install(Arc::new(Snapshot::new(records)));
    }

    /// Install an explicit empty snapshot
    pub fn clear(&self) {
        self.install(Arc::new(Snapshot::default()));
    }

    /// Normalize and install raw scan output; falls back to an empty
    /// snapshot when the records cannot be allocated
    pub fn replace_raw(&self, raw: &[RawAccessPoint]) -> Arc<Snapshot> {
        self.install_normalized(normalize(raw))
    }

    /// Install the outcome of [`normalize`]; a failed allocation leaves an
    /// explicit empty snapshot, never the previous or a partial one
    pub fn install_normalized(
        &self,
        records: Result<Vec<AccessPointRecord>, TryReserveError>,
    ) -> Arc<Snapshot> {
        match records {
            Ok(records) => self.replace(records),
            Err(e) => {
                tracing::warn!("Dropping scan results: {}", e);
                self.clear();
            }
        }
        self.current()
    }

    /// The most recently installed snapshot (empty before the first scan)
    pub fn current(&self) -> Arc<Snapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn install(&self, snapshot: Arc<Snapshot>) {
        let previous = match self.current.write() {
            Ok(mut guard) => std::mem::replace(&mut *guard, snapshot),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), snapshot),
        };
        // Release old storage outside the lock
        drop(previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::types::Bssid;

    fn raw(last: u8, ssid: &str) -> RawAccessPoint {
        RawAccessPoint {
            bssid: Bssid([0, 0x11, 0x22, 0x33, 0x44, last]),
            channel: 11,
            rssi: -60,
            ssid: ssid.as_bytes().to_vec(),
        }
    }

    #[test]
    fn starts_empty_not_missing() {
        let store = SnapshotStore::new();
        assert!(store.current().is_empty());
        assert_eq!(store.current().len(), 0);
    }

    #[test]
    fn replace_keeps_scan_order() {
        let store = SnapshotStore::new();
        let snapshot = store.replace_raw(&[raw(3, "c"), raw(1, "a"), raw(2, "b")]);

        let order: Vec<u8> = snapshot.iter().map(|r| r.bssid.0[5]).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn empty_scan_discards_previous_snapshot() {
        let store = SnapshotStore::new();
        store.replace_raw(&[raw(1, "a"), raw(2, "b")]);
        assert_eq!(store.current().len(), 2);

        let snapshot = store.replace_raw(&[]);
        assert_eq!(snapshot.len(), 0);
        assert!(store.current().is_empty());
    }

    #[test]
    fn new_scan_is_not_concatenated() {
        let store = SnapshotStore::new();
        store.replace_raw(&[raw(1, "a"), raw(2, "b")]);
        store.replace_raw(&[raw(9, "z")]);

        let current = store.current();
        assert_eq!(current.len(), 1);
        assert_eq!(current.records()[0].bssid.0[5], 9);
    }

    #[test]
    fn allocation_failure_installs_empty_snapshot() {
        let store = SnapshotStore::new();
        store.replace_raw(&[raw(1, "a"), raw(2, "b")]);
        assert_eq!(store.current().len(), 2);

        let err = Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err();
        let snapshot = store.install_normalized(Err(err));

        assert_eq!(snapshot.len(), 0);
        assert_eq!(store.current().len(), 0);
    }

    #[test]
    fn old_reader_keeps_its_snapshot() {
        let store = SnapshotStore::new();
        store.replace_raw(&[raw(1, "a")]);
        let held = store.current();

        store.clear();
        assert_eq!(held.len(), 1);
        assert!(store.current().is_empty());
    }
}
