// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Transport DTOs for the JSON line protocol.

use serde::{Deserialize, Serialize};

use siggen_core::{ChannelId, ChannelSettings, GenError, GenResult, ModulationSettings, SettingsPayload};

/// Command sent to the device, one per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    GetSettings,
    SetChannel {
        channel: ChannelId,
        #[serde(flatten)]
        settings: ChannelSettings,
    },
    SetModulation(ModulationSettings),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetSettings => "get_settings",
            Command::SetChannel { .. } => "set_channel",
            Command::SetModulation(_) => "set_modulation",
        }
    }
}

/// Outcome of one exchange with the device.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// `status: ok`, with whatever settings the reply carried.
    Ok(Option<SettingsPayload>),
    /// Device error, or a transport/decode fault normalized into a response.
    Error(GenError),
}

impl Response {
    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok(_))
    }

    /// Message suitable for display, `None` for `Ok`.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Response::Ok(_) => None,
            Response::Error(e) => Some(e.to_string()),
        }
    }

    pub fn into_result(self) -> GenResult<Option<SettingsPayload>> {
        match self {
            Response::Ok(payload) => Ok(payload),
            Response::Error(e) => Err(e),
        }
    }
}
