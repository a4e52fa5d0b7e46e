// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Highest frequency either output channel can synthesize.
pub const MAX_CHANNEL_FREQ_HZ: f64 = 3_000_000.0;

/// Waveform produced by a direct-output channel.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SignalType {
    #[default]
    Sine,
    Square,
    Triangle,
}

impl SignalType {
    pub const ALL: [SignalType; 3] = [SignalType::Sine, SignalType::Square, SignalType::Triangle];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Sine => "Sine",
            SignalType::Square => "Square",
            SignalType::Triangle => "Triangle",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalType {
    type Err = String;

    /// Case-insensitive; accepts the wire names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignalType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown signal type '{}'", s))
    }
}

/// Alternate output mode that supersedes direct channel output.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModulationType {
    #[default]
    MFSK,
    MPSK,
    ASK,
    SWEEP,
    PWM,
    AM,
}

impl ModulationType {
    pub const ALL: [ModulationType; 6] = [
        ModulationType::MFSK,
        ModulationType::MPSK,
        ModulationType::ASK,
        ModulationType::SWEEP,
        ModulationType::PWM,
        ModulationType::AM,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModulationType::MFSK => "MFSK",
            ModulationType::MPSK => "MPSK",
            ModulationType::ASK => "ASK",
            ModulationType::SWEEP => "SWEEP",
            ModulationType::PWM => "PWM",
            ModulationType::AM => "AM",
        }
    }
}

impl fmt::Display for ModulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModulationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModulationType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown modulation type '{}'", s))
    }
}

/// Output channel selector. Encoded as the bare number `1` or `2` on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "u8", try_from = "u8")]
pub enum ChannelId {
    One,
    Two,
}

impl ChannelId {
    pub fn number(self) -> u8 {
        match self {
            ChannelId::One => 1,
            ChannelId::Two => 2,
        }
    }
}

impl From<ChannelId> for u8 {
    fn from(id: ChannelId) -> Self {
        id.number()
    }
}

impl TryFrom<u8> for ChannelId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ChannelId::One),
            2 => Ok(ChannelId::Two),
            other => Err(format!("channel must be 1 or 2, got {}", other)),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl FromStr for ChannelId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("channel must be 1 or 2, got '{}'", s))?;
        ChannelId::try_from(n)
    }
}

/// Settings of one direct-output channel. Field names follow the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    #[serde(rename = "frequency")]
    pub frequency_hz: f64,
    #[serde(rename = "phase")]
    pub phase_deg: f64,
    pub enabled: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            signal_type: SignalType::Sine,
            frequency_hz: 1000.0,
            phase_deg: 0.0,
            enabled: true,
        }
    }
}

/// Modulation block settings. `data` holds byte-like symbols (0..=255 expected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationSettings {
    #[serde(rename = "type")]
    pub mod_type: ModulationType,
    /// Symbol count for MFSK/MPSK, level count otherwise.
    pub m: u32,
    #[serde(rename = "frequency")]
    pub carrier_frequency_hz: f64,
    /// Hz or degrees depending on `mod_type`.
    #[serde(rename = "delta_freq")]
    pub delta: f64,
    #[serde(rename = "baud_rate")]
    pub baud_rate_hz: f64,
    #[serde(rename = "mod_time")]
    pub mod_time_s: f64,
    pub data: Vec<i64>,
    pub enabled: bool,
}

impl Default for ModulationSettings {
    fn default() -> Self {
        Self {
            mod_type: ModulationType::MFSK,
            m: 2,
            carrier_frequency_hz: 100_000.0,
            delta: 1000.0,
            baud_rate_hz: 1000.0,
            mod_time_s: 10.0,
            data: Vec::new(),
            enabled: false,
        }
    }
}

/// Locally mirrored copy of the whole device configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceState {
    pub channel1: ChannelSettings,
    pub channel2: ChannelSettings,
    pub modulation: ModulationSettings,
}

impl DeviceState {
    pub fn channel_mut(&mut self, id: ChannelId) -> &mut ChannelSettings {
        match id {
            ChannelId::One => &mut self.channel1,
            ChannelId::Two => &mut self.channel2,
        }
    }
}
