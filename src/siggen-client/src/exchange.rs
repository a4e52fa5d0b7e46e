// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! One command, one reply.
//!
//! The caller must hold exclusive access to the transport for the whole
//! exchange; the session lock provides that.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, warn};

use siggen_core::{GenError, GenResult};
use siggen_protocol::{decode, encode, Command, Response};

use crate::transport::Transport;

pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Send `cmd` and wait up to `timeout` for the first reply line.
///
/// Never fails out-of-band: transport and decode faults come back as
/// [`Response::Error`].
pub async fn exchange(transport: &mut dyn Transport, cmd: &Command, timeout: Duration) -> Response {
    exchange_polled(transport, cmd, timeout, DEFAULT_POLL_INTERVAL).await
}

/// [`exchange`] with an explicit input poll interval.
pub async fn exchange_polled(
    transport: &mut dyn Transport,
    cmd: &Command,
    timeout: Duration,
    poll_interval: Duration,
) -> Response {
    match round_trip(transport, cmd, timeout, poll_interval).await {
        Ok(response) => response,
        Err(e) => {
            warn!("{} on {} failed: {}", cmd.name(), transport.port_name(), e);
            Response::Error(e)
        }
    }
}

async fn round_trip(
    transport: &mut dyn Transport,
    cmd: &Command,
    timeout: Duration,
    poll_interval: Duration,
) -> GenResult<Response> {
    let frame = encode(cmd)?;
    debug!(
        "-> {}",
        String::from_utf8_lossy(&frame[..frame.len().saturating_sub(1)])
    );
    let deadline = Instant::now() + timeout;
    match time::timeout_at(deadline, transport.write(&frame)).await {
        Ok(written) => written?,
        Err(_) => return Err(GenError::Timeout),
    }

    loop {
        if transport.has_input()? {
            break;
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(GenError::Timeout);
        }
        time::sleep(poll_interval.min(deadline - now)).await;
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    let line = match time::timeout(remaining, transport.read_line()).await {
        Ok(line) => line?,
        Err(_) => return Err(GenError::Timeout),
    };
    debug!("<- {}", String::from_utf8_lossy(&line).trim_end());
    Ok(decode(&line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedTransport};
    use siggen_core::{ChannelId, ChannelSettings};

    const SHORT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn returns_first_line_only() {
        let (mut transport, script) = ScriptedTransport::new(vec![
            Reply::line(r#"{"status":"ok"}"#),
            Reply::line(r#"{"status":"error","error":"stale"}"#),
        ]);
        let response = exchange(&mut transport, &Command::GetSettings, SHORT).await;
        assert_eq!(response, Response::Ok(None));
        assert_eq!(script.written_lines(), vec![r#"{"cmd":"get_settings"}"#]);
        assert_eq!(script.pending_replies(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_device_times_out_within_bound() {
        let (mut transport, _script) = ScriptedTransport::new(vec![Reply::Silence]);
        let started = Instant::now();
        let response = exchange(&mut transport, &Command::GetSettings, SHORT).await;
        let elapsed = started.elapsed();
        assert_eq!(response, Response::Error(GenError::Timeout));
        assert_eq!(
            response.error_message().as_deref(),
            Some("Timeout waiting for response")
        );
        assert!(elapsed >= SHORT);
        assert!(elapsed < SHORT + DEFAULT_POLL_INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_write_times_out_within_bound() {
        let (mut transport, script) = ScriptedTransport::new(vec![Reply::WriteStall]);
        let started = Instant::now();
        let response = exchange(&mut transport, &Command::GetSettings, SHORT).await;
        assert_eq!(response, Response::Error(GenError::Timeout));
        let elapsed = started.elapsed();
        assert!(elapsed >= SHORT && elapsed < SHORT + DEFAULT_POLL_INTERVAL);
        assert_eq!(script.written_bytes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply_within_deadline() {
        let (mut transport, _script) = ScriptedTransport::new(vec![Reply::Delayed(
            Duration::from_millis(50),
            r#"{"status":"ok"}"#.to_string(),
        )]);
        let response = exchange(&mut transport, &Command::GetSettings, SHORT).await;
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn garbled_line_is_malformed() {
        let (mut transport, _script) = ScriptedTransport::new(vec![Reply::line("{\"status\":")]);
        let response = exchange(&mut transport, &Command::GetSettings, SHORT).await;
        assert_eq!(response, Response::Error(GenError::MalformedResponse));
    }

    #[tokio::test]
    async fn write_fault_becomes_error_response() {
        let (mut transport, _script) = ScriptedTransport::new(vec![Reply::WriteFault]);
        let cmd = Command::SetChannel {
            channel: ChannelId::One,
            settings: ChannelSettings::default(),
        };
        match exchange(&mut transport, &cmd, SHORT).await {
            Response::Error(e) => assert!(e.is_link_loss()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn device_error_message_is_kept() {
        let (mut transport, _script) =
            ScriptedTransport::new(vec![Reply::line(r#"{"status":"error","error":"bad m"}"#)]);
        let response = exchange(&mut transport, &Command::GetSettings, SHORT).await;
        assert_eq!(response.error_message().as_deref(), Some("bad m"));
    }
}
