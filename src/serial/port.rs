//! Real serial ports via the `serialport` crate.

use std::io;
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use super::{FramingOptions, SerialLink, SerialTransport};
use crate::config::SerialConfig;
use crate::error::TransportError;

pub type PortTransport = SerialTransport<Box<dyn SerialPort>>;

/// Let the line settle after open before flushing buffers.
const OPEN_SETTLE: Duration = Duration::from_millis(100);

impl SerialLink for Box<dyn SerialPort> {
    fn pending(&mut self) -> io::Result<usize> {
        Ok((**self).bytes_to_read()? as usize)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// Map the `usb` / `serial` shorthands to device paths.
pub fn resolve_port(name: &str) -> &str {
    match name {
        "usb" => "/dev/ttyUSB0",
        "serial" => "/dev/serial0",
        other => other,
    }
}

/// Open the configured device as 8N1 without flow control.
pub fn open(config: &SerialConfig) -> Result<PortTransport, TransportError> {
    let path = resolve_port(&config.port);
    let port = serialport::new(path, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(config.read_timeout_ms))
        .open()
        .map_err(|source| TransportError::Open {
            port: path.to_string(),
            source,
        })?;

    std::thread::sleep(OPEN_SETTLE);
    port.clear(ClearBuffer::All)
        .map_err(|e| TransportError::Control(e.to_string()))?;

    tracing::info!(port = path, baud = config.baud_rate, "serial port opened");
    Ok(SerialTransport::new(port, FramingOptions::from(config)))
}

/// Names of the serial ports the OS reports.
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to enumerate serial ports");
            Vec::new()
        }
    }
}
