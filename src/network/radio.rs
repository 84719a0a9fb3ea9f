use async_trait::async_trait;

use crate::error::ApScanResult;
use crate::network::types::RawAccessPoint;

/// The radio subsystem as seen by the scan loop.
///
/// `scan` starts a scan and resolves only once it has completed, returning
/// every access point seen in radio order. An empty list is a valid result.
#[async_trait]
pub trait Radio: Send + Sync {
    async fn scan(&self) -> ApScanResult<Vec<RawAccessPoint>>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}
