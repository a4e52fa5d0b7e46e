// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod error;
pub mod reconcile;
pub mod settings;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use error::{ApplyError, ApplyStep, ConnectError, GenError, GenResult};
pub use reconcile::{ChannelPatch, ModulationPatch, SettingsPayload};
pub use settings::{
    ChannelId, ChannelSettings, DeviceState, ModulationSettings, ModulationType, SignalType,
    MAX_CHANNEL_FREQ_HZ,
};
