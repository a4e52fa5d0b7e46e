// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Dummy signal generator for development and testing.
//!
//! Holds device state in memory and answers every command immediately.
//! No hardware or serial port required.

use std::collections::VecDeque;

use siggen_core::{DeviceState, GenError, GenResult};
use siggen_protocol::codec::{encode_error_reply, encode_ok_reply, encode_settings_reply};
use siggen_protocol::Command;

use crate::transport::{Transport, TransportFuture};

pub const DUMMY_PORT: &str = "dummy";

pub struct DummyTransport {
    state: DeviceState,
    inbox: Vec<u8>,
    outbox: VecDeque<Vec<u8>>,
    open: bool,
    commands_seen: usize,
}

impl DummyTransport {
    pub fn new() -> Self {
        Self::with_state(DeviceState::default())
    }

    pub fn with_state(state: DeviceState) -> Self {
        Self {
            state,
            inbox: Vec::new(),
            outbox: VecDeque::new(),
            open: true,
            commands_seen: 0,
        }
    }

    /// Current device-side state.
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn commands_seen(&self) -> usize {
        self.commands_seen
    }

    fn handle_line(&mut self, line: &[u8]) {
        self.commands_seen += 1;
        let reply = match serde_json::from_slice::<Command>(line) {
            Ok(Command::GetSettings) => encode_settings_reply(&self.state),
            Ok(Command::SetChannel { channel, settings }) => {
                *self.state.channel_mut(channel) = settings;
                encode_ok_reply()
            }
            Ok(Command::SetModulation(modulation)) => {
                self.state.modulation = modulation;
                encode_ok_reply()
            }
            Err(e) => {
                tracing::debug!("dummy device rejected command: {}", e);
                encode_error_reply("Unknown command")
            }
        };
        self.outbox.push_back(reply);
    }
}

impl Default for DummyTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for DummyTransport {
    fn port_name(&self) -> &str {
        DUMMY_PORT
    }

    fn write<'a>(&'a mut self, bytes: &'a [u8]) -> TransportFuture<'a, ()> {
        let result = if self.open {
            self.inbox.extend_from_slice(bytes);
            while let Some(pos) = self.inbox.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.inbox.drain(..=pos).collect();
                if line.iter().any(|b| !b.is_ascii_whitespace()) {
                    self.handle_line(&line);
                }
            }
            Ok(())
        } else {
            Err(GenError::link("dummy device is closed"))
        };
        Box::pin(std::future::ready(result))
    }

    fn has_input(&mut self) -> GenResult<bool> {
        if !self.open {
            return Err(GenError::link("dummy device is closed"));
        }
        Ok(!self.outbox.is_empty())
    }

    fn read_line<'a>(&'a mut self) -> TransportFuture<'a, Vec<u8>> {
        let result = if self.open {
            Ok(self.outbox.pop_front().unwrap_or_default())
        } else {
            Err(GenError::link("dummy device is closed"))
        };
        Box::pin(std::future::ready(result))
    }

    fn close(&mut self) {
        self.open = false;
        self.inbox.clear();
        self.outbox.clear();
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
