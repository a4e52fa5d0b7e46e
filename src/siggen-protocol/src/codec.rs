// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Encoding commands and decoding device replies.

use serde_json::{json, Map, Value};

use siggen_core::{
    ChannelPatch, DeviceState, GenError, GenResult, ModulationPatch, SettingsPayload,
};

use crate::types::{Command, Response};

/// Serialize a command to a single `\n`-terminated JSON line.
///
/// Non-finite floats are rejected since JSON would carry them as `null`.
pub fn encode(cmd: &Command) -> GenResult<Vec<u8>> {
    check_finite(cmd)?;
    let mut bytes = serde_json::to_vec(cmd).map_err(|e| GenError::Encode(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn check_finite(cmd: &Command) -> GenResult<()> {
    let values: Vec<(&str, f64)> = match cmd {
        Command::GetSettings => Vec::new(),
        Command::SetChannel { settings, .. } => vec![
            ("frequency", settings.frequency_hz),
            ("phase", settings.phase_deg),
        ],
        Command::SetModulation(m) => vec![
            ("frequency", m.carrier_frequency_hz),
            ("delta_freq", m.delta),
            ("baud_rate", m.baud_rate_hz),
            ("mod_time", m.mod_time_s),
        ],
    };
    match values.into_iter().find(|(_, v)| !v.is_finite()) {
        Some((field, v)) => Err(GenError::Encode(format!(
            "{} is not a finite number ({})",
            field, v
        ))),
        None => Ok(()),
    }
}

/// Decode one reply line.
///
/// Never fails: anything that is not a JSON object becomes
/// `Error("Invalid response format")`.
pub fn decode(line: &[u8]) -> Response {
    let value: Value = match serde_json::from_slice(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(
                "undecodable reply {:?}: {}",
                String::from_utf8_lossy(line).trim_end(),
                e
            );
            return Response::Error(GenError::MalformedResponse);
        }
    };
    let Some(obj) = value.as_object() else {
        return Response::Error(GenError::MalformedResponse);
    };

    match obj.get("status").and_then(Value::as_str) {
        Some("ok") => {
            let payload = settings_payload(obj);
            Response::Ok((!payload.is_empty()).then_some(payload))
        }
        status => {
            let message = obj
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            if status != Some("error") {
                tracing::warn!("reply has unexpected status {:?}", status);
            }
            Response::Error(GenError::Device(message.to_string()))
        }
    }
}

fn settings_payload(obj: &Map<String, Value>) -> SettingsPayload {
    SettingsPayload {
        channel1: obj
            .get("channel1")
            .and_then(Value::as_object)
            .map(channel_patch),
        channel2: obj
            .get("channel2")
            .and_then(Value::as_object)
            .map(channel_patch),
        modulation: obj
            .get("modulation")
            .and_then(Value::as_object)
            .map(modulation_patch),
    }
}

// Fields with an unexpected JSON type are treated as absent.
fn channel_patch(obj: &Map<String, Value>) -> ChannelPatch {
    ChannelPatch {
        signal_type: parsed_str(obj, "type"),
        frequency_hz: obj.get("frequency").and_then(Value::as_f64),
        phase_deg: obj.get("phase").and_then(Value::as_f64),
        enabled: obj.get("enabled").and_then(Value::as_bool),
    }
}

fn modulation_patch(obj: &Map<String, Value>) -> ModulationPatch {
    ModulationPatch {
        mod_type: parsed_str(obj, "type"),
        m: obj
            .get("m")
            .and_then(Value::as_u64)
            .and_then(|m| u32::try_from(m).ok()),
        carrier_frequency_hz: obj.get("frequency").and_then(Value::as_f64),
        delta: obj.get("delta_freq").and_then(Value::as_f64),
        baud_rate_hz: obj.get("baud_rate").and_then(Value::as_f64),
        mod_time_s: obj.get("mod_time").and_then(Value::as_f64),
        data: obj.get("data").and_then(Value::as_array).and_then(|items| {
            items.iter().map(Value::as_i64).collect::<Option<Vec<_>>>()
        }),
        enabled: obj.get("enabled").and_then(Value::as_bool),
    }
}

fn parsed_str<T: std::str::FromStr<Err = String>>(
    obj: &Map<String, Value>,
    key: &str,
) -> Option<T> {
    let raw = obj.get(key)?.as_str()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("ignoring reply field {}: {}", key, e);
            None
        }
    }
}

/// Parse the comma-separated data text entered by the user.
///
/// Only the empty string is an empty sequence; otherwise every token is
/// trimmed and must be an integer. Range is not checked here.
pub fn parse_data(raw: &str) -> GenResult<Vec<i64>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<i64>()
                .map_err(|_| GenError::InvalidDataFormat(token.to_string()))
        })
        .collect()
}

/// Render a data sequence back to its comma-separated text form.
pub fn format_data(data: &[i64]) -> String {
    data.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// `ok` reply carrying a full settings snapshot, as sent for `get_settings`.
pub fn encode_settings_reply(state: &DeviceState) -> Vec<u8> {
    let mut line = json!({
        "status": "ok",
        "channel1": state.channel1,
        "channel2": state.channel2,
        "modulation": state.modulation,
    })
    .to_string()
    .into_bytes();
    line.push(b'\n');
    line
}

pub fn encode_ok_reply() -> Vec<u8> {
    b"{\"status\":\"ok\"}\n".to_vec()
}

pub fn encode_error_reply(message: &str) -> Vec<u8> {
    let mut line = json!({ "status": "error", "error": message })
        .to_string()
        .into_bytes();
    line.push(b'\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use siggen_core::reconcile::merge;
    use siggen_core::{
        ChannelId, ChannelSettings, ModulationSettings, ModulationType, SignalType,
    };

    fn line(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn encode_get_settings() {
        assert_eq!(
            line(encode(&Command::GetSettings).unwrap()),
            "{\"cmd\":\"get_settings\"}\n"
        );
    }

    #[test]
    fn encode_set_channel_field_names() {
        let cmd = Command::SetChannel {
            channel: ChannelId::Two,
            settings: ChannelSettings {
                signal_type: SignalType::Square,
                frequency_hz: 2500.5,
                phase_deg: -45.0,
                enabled: false,
            },
        };
        assert_eq!(
            line(encode(&cmd).unwrap()),
            "{\"cmd\":\"set_channel\",\"channel\":2,\"type\":\"Square\",\"frequency\":2500.5,\"phase\":-45.0,\"enabled\":false}\n"
        );
    }

    #[test]
    fn encode_set_modulation_field_names() {
        let cmd = Command::SetModulation(ModulationSettings {
            mod_type: ModulationType::MPSK,
            m: 4,
            carrier_frequency_hz: 100000.0,
            delta: 90.0,
            baud_rate_hz: 1000.0,
            mod_time_s: 10.0,
            data: vec![1, 2, 255],
            enabled: true,
        });
        assert_eq!(
            line(encode(&cmd).unwrap()),
            "{\"cmd\":\"set_modulation\",\"type\":\"MPSK\",\"m\":4,\"frequency\":100000.0,\"delta_freq\":90.0,\"baud_rate\":1000.0,\"mod_time\":10.0,\"data\":[1,2,255],\"enabled\":true}\n"
        );
    }

    #[test]
    fn encode_rejects_nan() {
        let cmd = Command::SetChannel {
            channel: ChannelId::One,
            settings: ChannelSettings {
                phase_deg: f64::NAN,
                ..Default::default()
            },
        };
        assert!(matches!(encode(&cmd), Err(GenError::Encode(_))));
    }

    #[test]
    fn commands_parse_back() {
        let cmd: Command = serde_json::from_str(
            r#"{"cmd":"set_channel","channel":1,"type":"Triangle","frequency":10,"phase":0,"enabled":true}"#,
        )
        .unwrap();
        match cmd {
            Command::SetChannel { channel, settings } => {
                assert_eq!(channel, ChannelId::One);
                assert_eq!(settings.signal_type, SignalType::Triangle);
                assert_eq!(settings.frequency_hz, 10.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        let bad = serde_json::from_str::<Command>(r#"{"cmd":"set_channel","channel":3}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn decode_invalid_json() {
        assert_eq!(
            decode(b"{\"status\":\"ok\"\n"),
            Response::Error(GenError::MalformedResponse)
        );
        assert_eq!(decode(b"\n"), Response::Error(GenError::MalformedResponse));
        assert_eq!(decode(b"42\n"), Response::Error(GenError::MalformedResponse));
        assert_eq!(
            decode(b"\xff\xfe\n"),
            Response::Error(GenError::MalformedResponse)
        );
        assert_eq!(
            decode(b"garbage").error_message().as_deref(),
            Some("Invalid response format")
        );
    }

    #[test]
    fn decode_plain_ok() {
        assert_eq!(decode(b"{\"status\":\"ok\"}\r\n"), Response::Ok(None));
    }

    #[test]
    fn decode_device_error() {
        assert_eq!(
            decode(br#"{"status":"error","error":"bad channel"}"#),
            Response::Error(GenError::Device("bad channel".into()))
        );
        assert_eq!(
            decode(br#"{"status":"error"}"#),
            Response::Error(GenError::Device("Unknown error".into()))
        );
        assert!(!decode(br#"{"result":1}"#).is_ok());
    }

    #[test]
    fn decode_partial_settings() {
        let resp = decode(br#"{"status":"ok","channel1":{"frequency":2000.0}}"#);
        let payload = resp.into_result().unwrap().expect("payload");
        let ch1 = payload.channel1.expect("channel1");
        assert_eq!(ch1.frequency_hz, Some(2000.0));
        assert_eq!(ch1.phase_deg, None);
        assert!(payload.channel2.is_none());
        assert!(payload.modulation.is_none());
    }

    #[test]
    fn decode_ignores_mistyped_fields() {
        let resp = decode(
            br#"{"status":"ok","channel2":{"type":"Sawtooth","frequency":"fast","enabled":false},
                "modulation":{"m":3,"data":[1,"x"],"type":"am"}}"#,
        );
        let payload = resp.into_result().unwrap().unwrap();
        let ch2 = payload.channel2.unwrap();
        assert_eq!(ch2.signal_type, None);
        assert_eq!(ch2.frequency_hz, None);
        assert_eq!(ch2.enabled, Some(false));
        let m = payload.modulation.unwrap();
        assert_eq!(m.m, Some(3));
        assert_eq!(m.data, None);
        assert_eq!(m.mod_type, Some(ModulationType::AM));
    }

    #[test]
    fn channel_round_trips_through_merge() {
        let original = ChannelSettings {
            signal_type: SignalType::Triangle,
            frequency_hz: 123456.75,
            phase_deg: 179.5,
            enabled: false,
        };
        let cmd = Command::SetChannel {
            channel: ChannelId::One,
            settings: original.clone(),
        };
        let mut echo: Value = serde_json::from_slice(&encode(&cmd).unwrap()).unwrap();
        let fields = echo.as_object_mut().unwrap();
        fields.remove("cmd");
        fields.remove("channel");
        let reply = json!({ "status": "ok", "channel1": echo }).to_string();

        let payload = decode(reply.as_bytes()).into_result().unwrap().unwrap();
        let mut mirror = DeviceState::default();
        merge(&mut mirror, &payload);
        assert_eq!(mirror.channel1, original);
    }

    #[test]
    fn settings_reply_decodes_to_same_state() {
        let mut state = DeviceState::default();
        state.channel2.signal_type = SignalType::Square;
        state.modulation.data = vec![7, 8];
        let payload = decode(&encode_settings_reply(&state))
            .into_result()
            .unwrap()
            .unwrap();
        let mut mirror = DeviceState::default();
        merge(&mut mirror, &payload);
        assert_eq!(mirror, state);
    }

    #[test]
    fn parse_data_tokens() {
        assert_eq!(parse_data(""), Ok(vec![]));
        assert_eq!(parse_data("1,2,3"), Ok(vec![1, 2, 3]));
        assert_eq!(parse_data(" 10 , -2,+7 "), Ok(vec![10, -2, 7]));
        assert_eq!(parse_data("300"), Ok(vec![300]));
    }

    #[test]
    fn parse_data_rejects_non_integers() {
        for bad in ["1,a,3", "1,,2", "1.5", "0x10", "1;2", "1,", "   "] {
            assert!(
                matches!(parse_data(bad), Err(GenError::InvalidDataFormat(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn blank_data_text_is_an_empty_token() {
        assert_eq!(
            parse_data("   "),
            Err(GenError::InvalidDataFormat(String::new()))
        );
    }

    #[test]
    fn format_data_joins() {
        assert_eq!(format_data(&[]), "");
        assert_eq!(format_data(&[1, 20, 255]), "1,20,255");
        assert_eq!(parse_data(&format_data(&[4, 5])), Ok(vec![4, 5]));
    }
}
