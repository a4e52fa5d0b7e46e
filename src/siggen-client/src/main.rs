// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use siggen_app::{init_logging, ConfigError};
use siggen_client::{list_ports, ApplyProfile, ClientConfig, Session};
use siggen_core::{
    ChannelId, ChannelSettings, DeviceState, DynResult, ModulationSettings, ModulationType,
    SignalType,
};
use siggen_protocol::format_data;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - signal generator control");

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Serial port of the generator, or `dummy`
    #[arg(short = 'p', long = "port")]
    port: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List serial ports on this machine
    Ports,
    /// Print the device settings as JSON (default)
    Status,
    /// Configure one direct-output channel
    Channel {
        /// Channel number (1 or 2)
        channel: ChannelId,
        #[arg(long = "type", default_value_t = SignalType::Sine)]
        signal_type: SignalType,
        /// Frequency in Hz
        #[arg(long = "freq", default_value_t = 1000.0)]
        frequency: f64,
        /// Phase in degrees
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        phase: f64,
        /// Leave the output switched off
        #[arg(long)]
        disabled: bool,
    },
    /// Configure the modulation block
    Modulation {
        #[arg(long = "type", default_value_t = ModulationType::MFSK)]
        mod_type: ModulationType,
        #[arg(long, default_value_t = 2)]
        m: u32,
        /// Carrier frequency in Hz
        #[arg(long = "freq", default_value_t = 100_000.0)]
        frequency: f64,
        /// Deviation in Hz or degrees, depending on type
        #[arg(long, default_value_t = 1000.0, allow_negative_numbers = true)]
        delta: f64,
        #[arg(long = "baud-rate", default_value_t = 1000.0)]
        baud_rate: f64,
        /// Modulation time in seconds
        #[arg(long = "mod-time", default_value_t = 10.0)]
        mod_time: f64,
        /// Comma-separated symbols, e.g. "1,0,1,1"
        #[arg(long, default_value = "")]
        data: String,
        /// Switch modulation on (turns both channels off)
        #[arg(long)]
        enabled: bool,
    },
    /// Apply a TOML profile with [channel1], [channel2] and [modulation]
    Apply {
        #[arg(value_name = "PROFILE")]
        profile: PathBuf,
    },
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ClientConfig::example_toml());
        return Ok(());
    }

    let (cfg, config_path) = if let Some(ref path) = cli.config {
        let cfg = ClientConfig::load_from_file(path)?;
        (cfg, Some(path.clone()))
    } else {
        ClientConfig::load_from_default_paths()?
    };
    cfg.validate().map_err(ConfigError::Invalid)?;

    init_logging(
        cli.log_level
            .as_deref()
            .or(cfg.general.log_level.as_deref()),
    );

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let command = cli.command.unwrap_or(Command::Status);
    if let Command::Ports = command {
        for port in list_ports()? {
            println!("{}", port);
        }
        return Ok(());
    }

    // Resolve port: CLI > config [serial] section > error
    let port = cli
        .port
        .or_else(|| cfg.serial.port.clone())
        .ok_or("Serial port not specified. Use --port or set [serial].port in config.")?;

    let session = Session::serial(cfg.session_config(), cfg.serial.baud, cfg.read_timeout());
    session.connect(&port).await?;
    let result = run(&session, command).await;
    session.disconnect().await;
    result
}

async fn run(session: &Session, command: Command) -> DynResult<()> {
    match command {
        Command::Ports | Command::Status => print_state(&session.state())?,
        Command::Channel {
            channel,
            signal_type,
            frequency,
            phase,
            disabled,
        } => {
            let settings = ChannelSettings {
                signal_type,
                frequency_hz: frequency,
                phase_deg: phase,
                enabled: !disabled,
            };
            session
                .try_set_channel(channel, &settings)
                .await
                .map_err(|e| format!("Failed to apply Channel {} settings: {}", channel, e))?;
            println!("Channel {} settings applied", channel);
        }
        Command::Modulation {
            mod_type,
            m,
            frequency,
            delta,
            baud_rate,
            mod_time,
            data,
            enabled,
        } => {
            let settings = ModulationSettings {
                mod_type,
                m,
                carrier_frequency_hz: frequency,
                delta,
                baud_rate_hz: baud_rate,
                mod_time_s: mod_time,
                data: Vec::new(),
                enabled,
            };
            session
                .try_set_modulation(&settings, &data)
                .await
                .map_err(|e| format!("Failed to apply Modulation settings: {}", e))?;
            println!("Modulation settings applied");
        }
        Command::Apply { profile } => {
            let profile = ApplyProfile::load(&profile)?;
            let data = format_data(&profile.modulation.data);
            session
                .try_apply_all(
                    &profile.channel1,
                    &profile.channel2,
                    &profile.modulation,
                    &data,
                )
                .await?;
            println!("All settings applied successfully");
        }
    }
    Ok(())
}

fn print_state(state: &DeviceState) -> DynResult<()> {
    println!("{}", serde_json::to_string_pretty(state)?);
    Ok(())
}
