use std::sync::Arc;

use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

use crate::config::{Backend, Config};
use crate::console::transport::{spawn_writer, ByteSource, ConsoleWriter};
use crate::console::CommandInterpreter;
use crate::error::ApScanResult;
use crate::network::manager::NetworkManagerRadio;
use crate::network::radio::Radio;
use crate::network::simulated::SimulatedRadio;
use crate::network::snapshot::SnapshotStore;
use crate::scanner::ScanController;

/// Build the radio backend selected in the config
pub async fn build_radio(config: &Config) -> ApScanResult<Arc<dyn Radio>> {
    match config.scan.backend {
        Backend::NetworkManager => {
            let radio =
                NetworkManagerRadio::connect(config.interface(), config.scan_timeout()).await?;
            Ok(Arc::new(radio))
        }
        Backend::Simulated => {
            if config.simulated.access_points.is_empty() {
                warn!("Simulated backend has no access points configured");
            }
            Ok(Arc::new(SimulatedRadio::new(
                config.simulated.access_points.clone(),
                config.simulated_scan_time(),
            )))
        }
    }
}

/// Run one console session over the given transport until its input closes.
///
/// Wires the shared console writer, the snapshot store, the scan controller
/// and the interpreter together; returns after the scan loop has stopped and
/// all queued output has been written.
pub async fn run_session<S, W>(
    source: S,
    sink: W,
    radio: Arc<dyn Radio>,
    config: &Config,
) -> ApScanResult<()>
where
    S: ByteSource,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (console, rx) = ConsoleWriter::channel();
    let writer = spawn_writer(rx, sink, config.console.crlf);

    let controller = ScanController::new(
        Arc::clone(&radio),
        Arc::new(SnapshotStore::new()),
        console.clone(),
        config.scan_interval(),
    );
    let interpreter = CommandInterpreter::new(source, console, controller, config.read_timeout());

    info!("Console ready (backend: {})", radio.name());
    let result = interpreter.run().await;

    // Every ConsoleWriter is gone now, so the writer drains and exits
    match writer.await {
        Ok(Ok(())) => debug!("Console writer finished"),
        Ok(Err(e)) => warn!("Console writer failed: {}", e),
        Err(e) => warn!("Console writer task ended abnormally: {}", e),
    }

    result
}
