// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Byte transport to the signal generator.
//!
//! The device sits behind a USB serial bridge. Opening the port asserts DTR,
//! which resets the microcontroller, so callers must wait a settle period
//! after [`SerialTransport::open`] before the first command.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time;
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use siggen_core::{GenError, GenResult};

use crate::dummy::{DummyTransport, DUMMY_PORT};

/// Alias to reduce type complexity in [`Transport`].
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = GenResult<T>> + Send + 'a>>;

/// Opens a transport for a port identifier.
pub type TransportFactory = Arc<dyn Fn(&str) -> GenResult<Box<dyn Transport>> + Send + Sync>;

/// Half-duplex line-oriented link to the device.
pub trait Transport: Send {
    /// Port identifier this transport was opened on.
    fn port_name(&self) -> &str;

    /// Write all bytes and flush.
    fn write<'a>(&'a mut self, bytes: &'a [u8]) -> TransportFuture<'a, ()>;

    /// Non-blocking check for buffered input.
    fn has_input(&mut self) -> GenResult<bool>;

    /// Read up to and including the next `\n`.
    ///
    /// May return a partial line when the inter-character timeout expires.
    fn read_line<'a>(&'a mut self) -> TransportFuture<'a, Vec<u8>>;

    /// Release the port. Safe to call more than once.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Serial port transport.
pub struct SerialTransport {
    port_name: String,
    port: Option<SerialStream>,
    pending: Vec<u8>,
    read_timeout: Duration,
}

impl SerialTransport {
    pub const DEFAULT_BAUD: u32 = 115_200;
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
    const MAX_LINE_BYTES: usize = 16 * 1024;

    /// Open the port exclusively. Must be called within a tokio runtime.
    pub fn open(path: &str, baud: u32, read_timeout: Duration) -> GenResult<Self> {
        let port = tokio_serial::new(path, baud)
            .timeout(read_timeout)
            .open_native_async()
            .map_err(|e| GenError::PortUnavailable {
                port: path.to_string(),
                reason: e.to_string(),
            })?;
        info!("Opened {} @ {} baud", path, baud);
        Ok(Self {
            port_name: path.to_string(),
            port: Some(port),
            pending: Vec::with_capacity(256),
            read_timeout,
        })
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> GenResult<()> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| GenError::link("serial port is closed"))?;
        port.write_all(bytes)
            .await
            .map_err(|e| GenError::link(format!("write failed: {e}")))?;
        port.flush()
            .await
            .map_err(|e| GenError::link(format!("flush failed: {e}")))?;
        Ok(())
    }

    async fn read_line_bytes(&mut self) -> GenResult<Vec<u8>> {
        loop {
            if let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
                return Ok(self.pending.drain(..=pos).collect());
            }
            if self.pending.len() > Self::MAX_LINE_BYTES {
                self.pending.clear();
                return Err(GenError::link(format!(
                    "line exceeds maximum size of {} bytes",
                    Self::MAX_LINE_BYTES
                )));
            }

            let port = self
                .port
                .as_mut()
                .ok_or_else(|| GenError::link("serial port is closed"))?;
            let mut chunk = [0u8; 256];
            match time::timeout(self.read_timeout, port.read(&mut chunk)).await {
                Err(_) => {
                    debug!("inter-character timeout with {} bytes", self.pending.len());
                    return Ok(std::mem::take(&mut self.pending));
                }
                Ok(Ok(0)) => return Err(GenError::link("serial port closed by device")),
                Ok(Ok(n)) => self.pending.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(GenError::link(format!("read failed: {e}"))),
            }
        }
    }
}

impl Transport for SerialTransport {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn write<'a>(&'a mut self, bytes: &'a [u8]) -> TransportFuture<'a, ()> {
        Box::pin(self.write_bytes(bytes))
    }

    fn has_input(&mut self) -> GenResult<bool> {
        if !self.pending.is_empty() {
            return Ok(true);
        }
        let port = self
            .port
            .as_ref()
            .ok_or_else(|| GenError::link("serial port is closed"))?;
        let waiting = port
            .bytes_to_read()
            .map_err(|e| GenError::link(format!("input poll failed: {e}")))?;
        Ok(waiting > 0)
    }

    fn read_line<'a>(&'a mut self) -> TransportFuture<'a, Vec<u8>> {
        Box::pin(self.read_line_bytes())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Closed {}", self.port_name);
        }
        self.pending.clear();
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

/// Factory opening a [`SerialTransport`], or the in-memory dummy device when
/// the port is named `dummy`.
pub fn serial_factory(baud: u32, read_timeout: Duration) -> TransportFactory {
    Arc::new(move |port: &str| -> GenResult<Box<dyn Transport>> {
        if port.eq_ignore_ascii_case(DUMMY_PORT) {
            return Ok(Box::new(DummyTransport::new()));
        }
        Ok(Box::new(SerialTransport::open(port, baud, read_timeout)?))
    })
}

/// Names of the serial ports present on this machine.
pub fn list_ports() -> GenResult<Vec<String>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| GenError::link(format!("port enumeration failed: {e}")))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
