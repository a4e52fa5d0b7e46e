// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Connection lifecycle and the mirrored device state.

use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use siggen_core::reconcile::{enforce_exclusivity, merge, outgoing_channel};
use siggen_core::{
    ApplyError, ApplyStep, ChannelId, ChannelSettings, ConnectError, DeviceState, GenError,
    GenResult, ModulationSettings, SettingsPayload, MAX_CHANNEL_FREQ_HZ,
};
use siggen_protocol::{parse_data, Command};

use crate::exchange::{exchange_polled, DEFAULT_POLL_INTERVAL, DEFAULT_RESPONSE_TIMEOUT};
use crate::transport::{serial_factory, Transport, TransportFactory};

/// Timing knobs of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Wait after opening the port; the device resets when the port opens.
    pub settle: Duration,
    pub response_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    Disconnected,
    Connected { port: String },
}

struct Inner {
    transport: Option<Box<dyn Transport>>,
    mirror: DeviceState,
}

/// Client session with one signal generator.
///
/// All operations take the same lock, so at most one exchange is in flight
/// and connect/disconnect never interleave with one.
pub struct Session {
    config: SessionConfig,
    factory: TransportFactory,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<DeviceState>,
}

impl Session {
    pub fn new(config: SessionConfig, factory: TransportFactory) -> Self {
        let mirror = DeviceState::default();
        let (state_tx, _) = watch::channel(mirror.clone());
        Self {
            config,
            factory,
            inner: Mutex::new(Inner {
                transport: None,
                mirror,
            }),
            state_tx,
        }
    }

    /// Session over real serial ports (and the `dummy` device).
    pub fn serial(config: SessionConfig, baud: u32, read_timeout: Duration) -> Self {
        Self::new(config, serial_factory(baud, read_timeout))
    }

    /// Open `port`, wait for the device to settle and load its settings.
    ///
    /// On failure the port is closed again and the mirror is left as it was.
    pub async fn connect(&self, port: &str) -> Result<DeviceState, ConnectError> {
        let mut inner = self.inner.lock().await;
        if let Some(transport) = inner.transport.as_ref() {
            return Err(ConnectError::AlreadyConnected(
                transport.port_name().to_string(),
            ));
        }

        let mut transport = (self.factory)(port).map_err(ConnectError::Open)?;
        if !self.config.settle.is_zero() {
            debug!("Waiting {:?} for {} to settle", self.config.settle, port);
            tokio::time::sleep(self.config.settle).await;
        }

        let response = exchange_polled(
            &mut *transport,
            &Command::GetSettings,
            self.config.response_timeout,
            self.config.poll_interval,
        )
        .await;
        match response.into_result() {
            Ok(payload) => {
                if let Some(payload) = payload {
                    merge(&mut inner.mirror, &payload);
                }
                inner.transport = Some(transport);
                info!("Connected to {}", port);
                self.publish(&inner);
                Ok(inner.mirror.clone())
            }
            Err(e) => {
                transport.close();
                warn!("Initial query on {} failed: {}", port, e);
                Err(ConnectError::Query(e))
            }
        }
    }

    /// Close the port if open. Safe to call in any state.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(mut transport) = inner.transport.take() {
            transport.close();
            info!("Disconnected from {}", transport.port_name());
        }
    }

    pub async fn connection(&self) -> Connection {
        let inner = self.inner.lock().await;
        match inner.transport.as_ref() {
            Some(transport) => Connection::Connected {
                port: transport.port_name().to_string(),
            },
            None => Connection::Disconnected,
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.transport.is_some()
    }

    /// Last confirmed device state.
    pub fn state(&self) -> DeviceState {
        self.state_tx.borrow().clone()
    }

    /// Receiver notified after every confirmed change of the mirror.
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.state_tx.subscribe()
    }

    /// Re-read the device settings and merge them into the mirror.
    pub async fn query_settings(&self) -> GenResult<DeviceState> {
        let mut inner = self.inner.lock().await;
        if let Some(payload) = self.round_trip(&mut inner, Command::GetSettings).await? {
            merge(&mut inner.mirror, &payload);
            self.publish(&inner);
        }
        Ok(inner.mirror.clone())
    }

    pub async fn try_set_channel(&self, id: ChannelId, settings: &ChannelSettings) -> GenResult<()> {
        let mut inner = self.inner.lock().await;
        self.set_channel_locked(&mut inner, id, settings).await
    }

    /// Send one channel's settings. `false` on any failure; see
    /// [`Session::try_set_channel`] for the reason.
    pub async fn set_channel(&self, id: ChannelId, settings: &ChannelSettings) -> bool {
        match self.try_set_channel(id, settings).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to apply Channel {} settings: {}", id, e);
                false
            }
        }
    }

    /// Send modulation settings with `data` taken from the comma-separated
    /// `raw_data` text.
    pub async fn try_set_modulation(
        &self,
        settings: &ModulationSettings,
        raw_data: &str,
    ) -> GenResult<()> {
        let mut inner = self.inner.lock().await;
        self.set_modulation_locked(&mut inner, settings, raw_data)
            .await
    }

    pub async fn set_modulation(&self, settings: &ModulationSettings, raw_data: &str) -> bool {
        match self.try_set_modulation(settings, raw_data).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to apply Modulation settings: {}", e);
                false
            }
        }
    }

    /// Modulation first, then both channels unless modulation is enabled.
    ///
    /// Stops at the first failing step; the error names it.
    pub async fn try_apply_all(
        &self,
        channel1: &ChannelSettings,
        channel2: &ChannelSettings,
        modulation: &ModulationSettings,
        raw_data: &str,
    ) -> Result<(), ApplyError> {
        let mut inner = self.inner.lock().await;
        self.set_modulation_locked(&mut inner, modulation, raw_data)
            .await
            .map_err(|source| ApplyError {
                step: ApplyStep::Modulation,
                source,
            })?;
        if modulation.enabled {
            debug!("Modulation enabled, channel settings not sent");
            return Ok(());
        }
        for (id, settings) in [(ChannelId::One, channel1), (ChannelId::Two, channel2)] {
            self.set_channel_locked(&mut inner, id, settings)
                .await
                .map_err(|source| ApplyError {
                    step: ApplyStep::Channel(id),
                    source,
                })?;
        }
        Ok(())
    }

    pub async fn apply_all(
        &self,
        channel1: &ChannelSettings,
        channel2: &ChannelSettings,
        modulation: &ModulationSettings,
        raw_data: &str,
    ) -> bool {
        match self
            .try_apply_all(channel1, channel2, modulation, raw_data)
            .await
        {
            Ok(()) => {
                info!("All settings applied");
                true
            }
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }

    async fn set_channel_locked(
        &self,
        inner: &mut Inner,
        id: ChannelId,
        settings: &ChannelSettings,
    ) -> GenResult<()> {
        validate_frequency(settings.frequency_hz)?;
        if inner.transport.is_none() {
            return Err(GenError::NotConnected);
        }
        let outgoing = outgoing_channel(&inner.mirror, settings);
        let cmd = Command::SetChannel {
            channel: id,
            settings: outgoing.clone(),
        };
        self.round_trip(inner, cmd).await?;
        *inner.mirror.channel_mut(id) = outgoing;
        self.publish(inner);
        Ok(())
    }

    async fn set_modulation_locked(
        &self,
        inner: &mut Inner,
        settings: &ModulationSettings,
        raw_data: &str,
    ) -> GenResult<()> {
        let data = parse_data(raw_data)?;
        if inner.transport.is_none() {
            return Err(GenError::NotConnected);
        }
        let modulation = ModulationSettings {
            data,
            ..settings.clone()
        };
        self.round_trip(inner, Command::SetModulation(modulation.clone()))
            .await?;
        inner.mirror.modulation = modulation;
        if enforce_exclusivity(&mut inner.mirror) {
            debug!("Modulation enabled, channel outputs cleared");
        }
        self.publish(inner);
        Ok(())
    }

    /// One exchange on the open transport. A link fault closes the port.
    async fn round_trip(
        &self,
        inner: &mut Inner,
        cmd: Command,
    ) -> GenResult<Option<SettingsPayload>> {
        let transport = inner.transport.as_mut().ok_or(GenError::NotConnected)?;
        let response = exchange_polled(
            &mut **transport,
            &cmd,
            self.config.response_timeout,
            self.config.poll_interval,
        )
        .await;
        match response.into_result() {
            Err(e) if e.is_link_loss() => {
                if let Some(mut transport) = inner.transport.take() {
                    transport.close();
                    warn!("Lost link to {}, disconnected", transport.port_name());
                }
                Err(e)
            }
            other => other,
        }
    }

    fn publish(&self, inner: &Inner) {
        self.state_tx.send_replace(inner.mirror.clone());
    }
}

fn validate_frequency(frequency_hz: f64) -> GenResult<()> {
    if !frequency_hz.is_finite() || frequency_hz > MAX_CHANNEL_FREQ_HZ {
        return Err(GenError::FrequencyOutOfRange(frequency_hz));
    }
    Ok(())
}
