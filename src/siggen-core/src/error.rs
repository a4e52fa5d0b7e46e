// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use thiserror::Error;

use crate::settings::ChannelId;

/// Failure of a single device operation.
///
/// The `Display` text of `Timeout` and `MalformedResponse` is the message the
/// exchange layer reports, so callers can show it to the user verbatim.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenError {
    #[error("Failed to open {port}: {reason}")]
    PortUnavailable { port: String, reason: String },

    #[error("{0}")]
    Link(String),

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Invalid response format")]
    MalformedResponse,

    #[error("{0}")]
    Device(String),

    #[error("Data must be comma-separated integers (bad token '{0}')")]
    InvalidDataFormat(String),

    #[error("Frequency {0} Hz is out of range (maximum is 3 MHz)")]
    FrequencyOutOfRange(f64),

    #[error("Failed to encode command: {0}")]
    Encode(String),

    #[error("Not connected")]
    NotConnected,
}

impl GenError {
    pub fn link(message: impl Into<String>) -> Self {
        GenError::Link(message.into())
    }

    /// Errors after which the serial link cannot be trusted anymore.
    pub fn is_link_loss(&self) -> bool {
        matches!(self, GenError::Link(_))
    }
}

pub type GenResult<T> = Result<T, GenError>;

/// Why `Session::connect` did not reach the connected state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConnectError {
    #[error("Already connected to {0}")]
    AlreadyConnected(String),

    #[error(transparent)]
    Open(GenError),

    #[error("Failed to retrieve settings from device: {0}")]
    Query(GenError),
}

/// Step of an apply-all sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStep {
    Modulation,
    Channel(ChannelId),
}

/// First failing step of an apply-all sequence; later steps were not attempted.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{}: {source}", step_message(.step))]
pub struct ApplyError {
    pub step: ApplyStep,
    pub source: GenError,
}

fn step_message(step: &ApplyStep) -> String {
    match step {
        ApplyStep::Modulation => "Failed to apply Modulation settings".to_string(),
        ApplyStep::Channel(id) => format!("Failed to apply Channel {} settings", id),
    }
}
