use tokio::io::{ReadHalf, WriteHalf};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::info;

use crate::console::transport::StreamSource;
use crate::error::ApScanResult;

/// Console input half of a serial port
pub type SerialSource = StreamSource<ReadHalf<SerialStream>>;

/// Open a serial console at 8N1 without flow control.
///
/// Returns the byte source for the interpreter and the write half for the
/// console writer task.
pub fn open(path: &str, baud_rate: u32) -> ApScanResult<(SerialSource, WriteHalf<SerialStream>)> {
    let port = tokio_serial::new(path, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()?;

    info!("Serial console on {} at {} baud", path, baud_rate);

    let (reader, writer) = tokio::io::split(port);
    Ok((StreamSource::new(reader), writer))
}
