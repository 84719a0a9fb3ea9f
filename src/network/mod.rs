pub mod dbus_proxies;
pub mod manager;
pub mod radio;
pub mod simulated;
pub mod snapshot;
pub mod types;

pub use manager::NetworkManagerRadio;
pub use radio::Radio;
pub use simulated::SimulatedRadio;
pub use snapshot::{Snapshot, SnapshotStore};
pub use types::*;
