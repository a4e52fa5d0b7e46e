// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Serial control client for a two-channel signal generator.
//!
//! [`Session`] owns the link and the mirrored device state; every operation
//! is one JSON line out and one JSON line back through [`exchange`].

pub mod config;
pub mod dummy;
pub mod exchange;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::{ApplyProfile, ClientConfig};
pub use dummy::{DummyTransport, DUMMY_PORT};
pub use exchange::{exchange, exchange_polled};
pub use session::{Connection, Session, SessionConfig};
pub use transport::{list_ports, serial_factory, SerialTransport, Transport, TransportFactory};
