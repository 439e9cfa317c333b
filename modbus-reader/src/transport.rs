use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_modbus::client::{Context, Reader};
use tokio_modbus::slave::Slave;
use tracing::{info, warn};

use crate::codec::{bytes_to_words, words_to_bytes, Address, Quantity, Word};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot connect to {target}: {message}")]
    Connect { target: String, message: String },
    #[error("link failure: {0}")]
    Link(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("device exception: {0}")]
    Exception(tokio_modbus::Exception),
    #[error("no register at address {0:#06x}")]
    MissingRegister(Address),
}

#[async_trait]
/// Source of raw holding register contents.
pub trait RegisterSource: Send {
    /// Read `cnt` consecutive holding registers starting at `addr`, returned as big-endian bytes.
    async fn read_registers(
        &mut self,
        addr: Address,
        cnt: Quantity,
    ) -> Result<Vec<u8>, TransportError>;
}

/// Default time a device gets to answer a request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Modbus client connection owned for the duration of a run.
///
/// Every request, including the TCP connect, is bounded by `timeout`.
#[derive(Debug)]
pub struct ModbusTransport {
    ctx: Context,
    timeout: Duration,
}

impl ModbusTransport {
    pub async fn connect_tcp(
        socket_addr: SocketAddr,
        unit_id: u8,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let connect = tokio_modbus::client::tcp::connect_slave(socket_addr, Slave(unit_id));
        let ctx = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| TransportError::Connect {
                target: socket_addr.to_string(),
                message: format!("no connection within {timeout:?}"),
            })?
            .map_err(|err| TransportError::Connect {
                target: socket_addr.to_string(),
                message: err.to_string(),
            })?;
        info!(%socket_addr, unit_id, "connected");
        Ok(Self { ctx, timeout })
    }

    #[cfg(feature = "serial")]
    pub fn connect_rtu(
        path: &str,
        baud_rate: u32,
        unit_id: u8,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let builder = tokio_serial::new(path, baud_rate);
        let serial_stream =
            tokio_serial::SerialStream::open(&builder).map_err(|err| TransportError::Connect {
                target: path.to_string(),
                message: err.to_string(),
            })?;
        let ctx = tokio_modbus::client::rtu::attach_slave(serial_stream, Slave(unit_id));
        info!(path, baud_rate, unit_id, "serial port attached");
        Ok(Self { ctx, timeout })
    }

    /// Close the connection.
    pub async fn disconnect(mut self) {
        if let Err(err) = self.ctx.disconnect().await {
            warn!(%err, "disconnect failed");
        }
    }
}

#[async_trait]
impl RegisterSource for ModbusTransport {
    async fn read_registers(
        &mut self,
        addr: Address,
        cnt: Quantity,
    ) -> Result<Vec<u8>, TransportError> {
        let request = self.ctx.read_holding_registers(addr, cnt);
        let words = match tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
            .map_err(|err| TransportError::Link(err.to_string()))?
        {
            Ok(words) => words,
            Err(exc) => return Err(TransportError::Exception(exc)),
        };
        Ok(words_to_bytes(&words))
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory holding registers, readable without a device.
pub struct RegisterBank(HashMap<Address, Word>);

impl RegisterBank {
    /// Insert new consecutive registers with `words` values starting at `addr` address.
    pub fn insert(&mut self, addr: Address, words: Vec<Word>) {
        for (i, value) in words.into_iter().enumerate() {
            let reg_addr = addr.wrapping_add(i as Address);
            self.0.insert(reg_addr, value);
        }
    }

    /// Insert raw bytes, two per register, starting at `addr`.
    pub fn insert_bytes(&mut self, addr: Address, bytes: &[u8]) {
        self.insert(addr, bytes_to_words(bytes));
    }

    /// Read `cnt` consecutive registers starting at `addr`.
    pub fn read(&self, addr: Address, cnt: Quantity) -> Result<Vec<Word>, TransportError> {
        (0..cnt)
            .map(|i| {
                let reg_addr = addr.wrapping_add(i);
                self.0
                    .get(&reg_addr)
                    .copied()
                    .ok_or(TransportError::MissingRegister(reg_addr))
            })
            .collect()
    }
}

#[async_trait]
impl RegisterSource for RegisterBank {
    async fn read_registers(
        &mut self,
        addr: Address,
        cnt: Quantity,
    ) -> Result<Vec<u8>, TransportError> {
        self.read(addr, cnt).map(|words| words_to_bytes(&words))
    }
}
