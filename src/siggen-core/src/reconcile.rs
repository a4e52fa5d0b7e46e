// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Reconciling the local mirror with what the device reports.
//!
//! Modulation supersedes direct channel output: whenever modulation is
//! enabled both channels are disabled, in the mirror and in every command the
//! client sends. The device does not enforce this, so the client does.

use crate::settings::{
    ChannelSettings, DeviceState, ModulationSettings, ModulationType, SignalType,
};

/// Channel fields present in a device reply. Absent fields are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelPatch {
    pub signal_type: Option<SignalType>,
    pub frequency_hz: Option<f64>,
    pub phase_deg: Option<f64>,
    pub enabled: Option<bool>,
}

impl ChannelPatch {
    pub fn apply_to(&self, channel: &mut ChannelSettings) {
        if let Some(t) = self.signal_type {
            channel.signal_type = t;
        }
        if let Some(f) = self.frequency_hz {
            channel.frequency_hz = f;
        }
        if let Some(p) = self.phase_deg {
            channel.phase_deg = p;
        }
        if let Some(e) = self.enabled {
            channel.enabled = e;
        }
    }
}

/// Modulation fields present in a device reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModulationPatch {
    pub mod_type: Option<ModulationType>,
    pub m: Option<u32>,
    pub carrier_frequency_hz: Option<f64>,
    pub delta: Option<f64>,
    pub baud_rate_hz: Option<f64>,
    pub mod_time_s: Option<f64>,
    pub data: Option<Vec<i64>>,
    pub enabled: Option<bool>,
}

impl ModulationPatch {
    pub fn apply_to(&self, modulation: &mut ModulationSettings) {
        if let Some(t) = self.mod_type {
            modulation.mod_type = t;
        }
        if let Some(m) = self.m {
            modulation.m = m;
        }
        if let Some(f) = self.carrier_frequency_hz {
            modulation.carrier_frequency_hz = f;
        }
        if let Some(d) = self.delta {
            modulation.delta = d;
        }
        if let Some(b) = self.baud_rate_hz {
            modulation.baud_rate_hz = b;
        }
        if let Some(t) = self.mod_time_s {
            modulation.mod_time_s = t;
        }
        if let Some(data) = &self.data {
            modulation.data = data.clone();
        }
        if let Some(e) = self.enabled {
            modulation.enabled = e;
        }
    }
}

/// Settings carried by an `ok` reply (complete for `get_settings`, usually
/// absent for mutations).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPayload {
    pub channel1: Option<ChannelPatch>,
    pub channel2: Option<ChannelPatch>,
    pub modulation: Option<ModulationPatch>,
}

impl SettingsPayload {
    pub fn is_empty(&self) -> bool {
        self.channel1.is_none() && self.channel2.is_none() && self.modulation.is_none()
    }
}

/// Force both channels off while modulation is enabled.
///
/// Returns `true` if the mirror was changed.
pub fn enforce_exclusivity(state: &mut DeviceState) -> bool {
    if !state.modulation.enabled {
        return false;
    }
    let changed = state.channel1.enabled || state.channel2.enabled;
    state.channel1.enabled = false;
    state.channel2.enabled = false;
    changed
}

/// Merge a device reply into the mirror, keeping the mirror's values for
/// anything the device left out, then re-apply the exclusivity rule.
///
/// The client policy wins over the device echo: a reply claiming modulation
/// and a channel are both enabled ends up with the channel disabled.
pub fn merge(mirror: &mut DeviceState, payload: &SettingsPayload) {
    if let Some(patch) = &payload.channel1 {
        patch.apply_to(&mut mirror.channel1);
    }
    if let Some(patch) = &payload.channel2 {
        patch.apply_to(&mut mirror.channel2);
    }
    if let Some(patch) = &payload.modulation {
        patch.apply_to(&mut mirror.modulation);
    }
    if enforce_exclusivity(mirror) {
        tracing::debug!("modulation enabled on device, channels disabled in mirror");
    }
}

/// Channel settings as they may be sent given the current mirror.
pub fn outgoing_channel(mirror: &DeviceState, settings: &ChannelSettings) -> ChannelSettings {
    let mut out = settings.clone();
    if mirror.modulation.enabled && out.enabled {
        tracing::debug!("modulation is enabled, sending channel with output disabled");
        out.enabled = false;
    }
    out
}
