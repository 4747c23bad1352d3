//! # RC RF Bridge
//!
//! Host-commanded RF link engine.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (path from the first argument, else
//!      `config/default.toml`, else built-in defaults)
//!    - Set up logging with a tracing subscriber
//!    - Build the engine around the radio and open the host serial port
//!
//! 2. **Main Loop** (one `tokio::select!`)
//!    - Feed received bytes to the host link and write responses back
//!    - Run the active protocol whenever its deadline passes
//!    - Reopen the serial port after it is lost
//!    - Write telemetry records at the configured interval
//!
//! 3. **Graceful Shutdown** on Ctrl+C
//!    - Stop the protocol, leaving the radio reset

use std::path::Path;

use anyhow::{Context, Result};
use tokio::time::{interval, sleep_until, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use rc_rf_bridge::config::{Config, LoggingConfig, SerialConfig};
use rc_rf_bridge::engine::Engine;
use rc_rf_bridge::hostlink::HostLink;
use rc_rf_bridge::protocol::ProtocolSelection;
use rc_rf_bridge::radio::simulated::SimulatedRadio;
use rc_rf_bridge::radio::RadioTransceiver;
use rc_rf_bridge::serial::{device_candidates, HostSerial};
use rc_rf_bridge::telemetry::{LinkStatusRecord, TelemetryLogger, TelemetryWriter};

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Serial read chunk size
const READ_BUF_SIZE: usize = 256;

/// Longest a response write may hold up the loop
const RESPONSE_WRITE_TIMEOUT: Duration = Duration::from_millis(20);

/// Log file name prefix inside `[logging] directory`
const LOG_FILE_PREFIX: &str = "rc-rf-bridge.log";

#[tokio::main]
async fn main() -> Result<()> {
    let (config, source) = load_config(std::env::args().nth(1))?;
    let _log_guard = init_logging(&config.logging)?;

    info!("RC RF Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", source);

    let radio = SimulatedRadio::new(config.radio.ack_simulation);
    let engine = Engine::new(radio, config.radio.controller_id)
        .with_power(config.radio.tx_power)
        .with_controls_timeout(config.engine.controls_timeout_ms);
    let mut link = HostLink::new(engine);

    let clock = Instant::now();

    if let Some(value) = config.engine.auto_start {
        auto_start(link.handler_mut(), value);
    }

    let mut telemetry = if config.telemetry.enabled {
        Some(TelemetryWriter::spawn(TelemetryLogger::from_config(&config.telemetry)?))
    } else {
        None
    };
    let mut telemetry_tick = interval(Duration::from_millis(config.telemetry.log_interval_ms));
    telemetry_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut serial = open_serial(&config.serial);
    let mut reconnect_tick = interval(Duration::from_millis(config.serial.reconnect_interval_ms));
    reconnect_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    reconnect_tick.reset();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut buf = [0u8; READ_BUF_SIZE];
    info!("Press Ctrl+C to exit");

    // Main loop
    loop {
        let next = link.handler_mut().poll(elapsed_ms(clock));
        let wake = next.map(|ms| clock + Duration::from_millis(ms));

        tokio::select! {
            result = read_serial(&mut serial, &mut buf), if serial.is_some() => {
                match result {
                    Ok(0) => {
                        warn!("Host link closed, reconnecting...");
                        serial = None;
                        reconnect_tick.reset();
                    }
                    Ok(n) => {
                        link.handler_mut().sync_clock(elapsed_ms(clock));
                        for response in link.feed_all(&buf[..n]) {
                            let Some(port) = serial.as_mut() else { break };
                            if let Err(e) = port.send_response_within(&response, RESPONSE_WRITE_TIMEOUT).await {
                                warn!("{}, reconnecting...", e);
                                serial = None;
                                reconnect_tick.reset();
                            }
                        }
                    }
                    Err(e) => {
                        warn!("{}, reconnecting...", e);
                        serial = None;
                        reconnect_tick.reset();
                    }
                }
            }

            // Protocol deadline
            _ = sleep_until(wake.unwrap_or(clock)), if wake.is_some() => {}

            _ = reconnect_tick.tick(), if serial.is_none() => {
                serial = open_serial(&config.serial);
            }

            _ = telemetry_tick.tick(), if telemetry.is_some() => {
                if let Some(writer) = telemetry.as_mut() {
                    writer.submit(LinkStatusRecord::now(&link.handler().status(), link.stats()));
                }
            }

            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let status = link.handler().status();
    if let Err(e) = link.handler_mut().stop() {
        warn!("Failed to stop protocol cleanly: {}", e);
    }
    let stats = link.stats();
    info!(
        "Commands acked: {}, rejected: {}, checksum errors: {}, packets sent: {}",
        stats.acked,
        stats.rejected,
        stats.checksum_errors,
        status.link.map_or(0, |l| l.packet_counter)
    );

    if let Some(writer) = telemetry {
        if writer.dropped() > 0 {
            warn!("Telemetry records dropped: {}", writer.dropped());
        }
        writer.shutdown().await;
    }

    Ok(())
}

/// Load configuration from `path`, or the default file when it exists
///
/// Returns the configuration and a description of where it came from.
fn load_config(path: Option<String>) -> Result<(Config, String)> {
    match path {
        Some(path) => {
            let config = Config::load(&path)
                .with_context(|| format!("Failed to load configuration from {}", path))?;
            Ok((config, path))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            let config = Config::load(DEFAULT_CONFIG_PATH)
                .with_context(|| format!("Failed to load configuration from {}", DEFAULT_CONFIG_PATH))?;
            Ok((config, DEFAULT_CONFIG_PATH.to_string()))
        }
        None => Ok((Config::default(), "built-in defaults".to_string())),
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` takes precedence over `[logging] level`. The returned guard
/// must live as long as file logging is wanted.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level '{}'", config.level))?;

    if config.directory.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    }

    let appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    Ok(Some(guard))
}

fn auto_start<R: RadioTransceiver>(engine: &mut Engine<R>, value: u32) {
    let selection = ProtocolSelection::from_u32(value);
    match engine.select(selection).and_then(|_| engine.start()) {
        Ok(()) => info!("Auto-started protocol selection {:#010x}", value),
        Err(e) => warn!("Auto-start of {:#010x} failed: {}", value, e),
    }
}

/// Open the configured port, falling back to the default device paths
fn open_serial(config: &SerialConfig) -> Option<HostSerial> {
    match HostSerial::open_with_paths(&device_candidates(&config.port), config.baud_rate) {
        Ok(serial) => Some(serial),
        Err(e) => {
            debug!("Host link unavailable: {}", e);
            None
        }
    }
}

async fn read_serial(serial: &mut Option<HostSerial>, buf: &mut [u8]) -> rc_rf_bridge::error::Result<usize> {
    match serial {
        Some(port) => port.read_bytes(buf).await,
        None => std::future::pending().await,
    }
}

fn elapsed_ms(clock: Instant) -> u64 {
    clock.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_argument() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[radio]\ncontroller_id = 7\n").unwrap();
        file.flush().unwrap();

        let path = file.path().to_string_lossy().to_string();
        let (config, source) = load_config(Some(path.clone())).unwrap();
        assert_eq!(config.radio.controller_id, 7);
        assert_eq!(source, path);
    }

    #[test]
    fn test_load_config_missing_argument_file_fails() {
        assert!(load_config(Some("/nonexistent/bridge.toml".to_string())).is_err());
    }

    #[test]
    fn test_auto_start_runs_protocol() {
        let mut engine = Engine::new(SimulatedRadio::new(true), 1);
        auto_start(&mut engine, 0x0000_0001);
        assert!(engine.is_running());
    }

    #[test]
    fn test_auto_start_failure_leaves_engine_idle() {
        let mut engine = Engine::new(SimulatedRadio::new(true), 1);
        auto_start(&mut engine, 0x0000_0900);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_open_serial_missing_device() {
        let config = SerialConfig {
            port: "/dev/nonexistent_serial_device_12345".to_string(),
            ..Config::default().serial
        };
        assert!(open_serial(&config).is_none());
    }
}
