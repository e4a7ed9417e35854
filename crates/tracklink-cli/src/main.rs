//! `tracklink`: runs the vehicle unit control loop on a host.
//!
//! Without hardware the radio, GPS receiver and watchdog are simulated and a
//! console on stdin drives them (see [`console`]). With the `hardware-serial`
//! feature the card reader bridge and the audio module can be real devices
//! on serial ports.

mod cli;
mod console;
mod logging;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracklink_controller::{Device, Peripherals};
use tracklink_core::{CardUid, DeviceConfig};
use tracklink_hardware::mock::{
    MockAudioPlayer, MockCardReader, MockCardReaderHandle, MockLink, MockLinkHandle,
    MockLocationHandle, MockLocationSource, MockWatchdog,
};
use tracklink_hardware::{AnyAudioPlayer, AnyCardReader, LinkStatus, LocationFix};
use tracklink_network::{
    AnyTransport, AuthResponse, HttpAuthClient, HttpAuthClientConfig, MockTransport,
};

use crate::cli::Cli;
use crate::console::ConsoleCommand;

type HostDevice = Device<
    AnyCardReader,
    MockLocationSource,
    MockLink,
    AnyTransport,
    AnyAudioPlayer,
    MockWatchdog,
>;

/// Handles of the simulated peripherals.
struct Simulation {
    cards: Option<MockCardReaderHandle>,
    radio: MockLinkHandle,
    gps: MockLocationHandle,
}

/// Interval between periodic status lines.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let config = load_config(&cli)?;
    if cli.check_config {
        println!("{config:#?}");
        return Ok(());
    }

    let (mut device, simulation) = build_device(&cli, &config)?;
    run(&mut device, &simulation, &config).await;
    device.shutdown().await;

    Ok(())
}

fn load_config(cli: &Cli) -> Result<DeviceConfig> {
    let config = match &cli.config {
        Some(path) => DeviceConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => {
            let config =
                DeviceConfig::default().with_env_overrides(|key| std::env::var(key).ok());
            config.validate().context("invalid default configuration")?;
            config
        }
    };

    info!(
        device_id = %config.device.device_id,
        server_url = %config.network.server_url,
        tick_ms = config.device.tick_period_ms,
        "Configuration loaded"
    );
    Ok(config)
}

fn build_device(cli: &Cli, config: &DeviceConfig) -> Result<(HostDevice, Simulation)> {
    let (reader, cards) = card_reader(cli, config);
    let audio = audio_player(cli)?;

    let (link, radio) = MockLink::new();
    radio.script([LinkStatus::Connected]);

    let (location, gps) = MockLocationSource::new();
    if !cli.no_fix {
        gps.set_fix(simulated_fix(41.0082, 28.9784));
    }

    let transport = if cli.simulate {
        info!(allowed = cli.allowed_cards.len(), "Using simulated backend");
        AnyTransport::Mock(simulated_backend(&cli.allowed_cards)?)
    } else {
        let client = HttpAuthClient::new(HttpAuthClientConfig::from(config))
            .context("failed to build HTTP client")?;
        info!(server_url = client.server_url(), "Using HTTP backend");
        AnyTransport::Http(client)
    };

    let (watchdog, _wdt) = MockWatchdog::new();

    let device = Device::new(
        config,
        Peripherals {
            reader,
            location,
            link,
            transport,
            audio,
            watchdog,
        },
    )
    .context("failed to build device")?;

    Ok((device, Simulation { cards, radio, gps }))
}

#[cfg(feature = "hardware-serial")]
fn card_reader(
    cli: &Cli,
    config: &DeviceConfig,
) -> (AnyCardReader, Option<MockCardReaderHandle>) {
    use tracklink_hardware::serial::SerialCardReader;

    match &cli.card_port {
        Some(path) => {
            info!(%path, "Using serial card reader");
            let reader = SerialCardReader::new(path.as_str(), config.session.card_debounce());
            (AnyCardReader::Serial(reader), None)
        }
        None => mock_card_reader(config),
    }
}

#[cfg(not(feature = "hardware-serial"))]
fn card_reader(
    _cli: &Cli,
    config: &DeviceConfig,
) -> (AnyCardReader, Option<MockCardReaderHandle>) {
    mock_card_reader(config)
}

fn mock_card_reader(config: &DeviceConfig) -> (AnyCardReader, Option<MockCardReaderHandle>) {
    let (reader, handle) = MockCardReader::new(config.session.card_debounce());
    (AnyCardReader::Mock(reader), Some(handle))
}

#[cfg(feature = "hardware-serial")]
fn audio_player(cli: &Cli) -> Result<AnyAudioPlayer> {
    use tracklink_hardware::serial::SerialAudioPlayer;

    match &cli.audio_port {
        Some(path) => {
            let player = SerialAudioPlayer::open(path.as_str())
                .with_context(|| format!("failed to open audio module on {path}"))?;
            Ok(AnyAudioPlayer::Serial(player))
        }
        None => Ok(mock_audio_player()),
    }
}

#[cfg(not(feature = "hardware-serial"))]
fn audio_player(_cli: &Cli) -> Result<AnyAudioPlayer> {
    Ok(mock_audio_player())
}

fn mock_audio_player() -> AnyAudioPlayer {
    let (player, _handle) = MockAudioPlayer::new();
    AnyAudioPlayer::Mock(player)
}

fn simulated_fix(latitude: f64, longitude: f64) -> LocationFix {
    LocationFix::new(latitude, longitude)
        .with_motion(0.0, 0.0)
        .with_quality(1.0, 8)
}

/// Backend stand-in: authorizes the listed cards, denies the rest and
/// acknowledges telemetry.
fn simulated_backend(allowed: &[String]) -> Result<MockTransport> {
    let allowed: Vec<CardUid> = allowed
        .iter()
        .map(|uid| CardUid::new(uid))
        .collect::<tracklink_core::Result<_>>()
        .context("invalid --allow-card value")?;

    let (transport, handle) = MockTransport::new();
    handle.respond_with(move |report| {
        Ok(match &report.rfid_card_id {
            Some(uid) if allowed.contains(uid) => {
                AuthResponse::authorized(format!("sim-{uid}"), "Simulated Driver")
            }
            Some(_) => AuthResponse::denied(),
            None => AuthResponse::acknowledged("Location saved"),
        })
    });

    Ok(transport)
}

async fn run(device: &mut HostDevice, simulation: &Simulation, config: &DeviceConfig) {
    let mut ticker = tokio::time::interval(config.tick_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    device.start(Instant::now()).await;
    let mut last_status = Instant::now();
    info!("Control loop running; type a card UID or `quit`");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                device.tick(now).await;
                if now.duration_since(last_status) >= STATUS_INTERVAL {
                    log_status(device);
                    last_status = now;
                }
            }
            line = lines.next_line(), if console_open => match line {
                Ok(Some(line)) => {
                    if !apply_console_line(&line, device, simulation) {
                        break;
                    }
                }
                Ok(None) => console_open = false,
                Err(e) => {
                    warn!(error = %e, "Console closed");
                    console_open = false;
                }
            },
            _ = &mut shutdown => {
                info!("Interrupted");
                break;
            }
        }
    }
}

/// Apply one console line; returns `false` to stop the unit.
fn apply_console_line(line: &str, device: &HostDevice, simulation: &Simulation) -> bool {
    let command = match console::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return true,
        Err(e) => {
            warn!(error = %e, "Ignoring console input");
            return true;
        }
    };

    match command {
        ConsoleCommand::Present(uid) => match &simulation.cards {
            Some(cards) => {
                if let Err(e) = cards.present_uid(uid) {
                    warn!(error = %e, "Failed to present card");
                }
            }
            None => warn!("A serial card reader is in use; present the card to it"),
        },
        ConsoleCommand::Link(up) => {
            let status = if up {
                LinkStatus::Connected
            } else {
                LinkStatus::Disconnected
            };
            simulation.radio.set_status(status);
            info!(%status, "Simulated radio changed");
        }
        ConsoleCommand::Fix {
            latitude,
            longitude,
        } => {
            simulation.gps.set_fix(simulated_fix(latitude, longitude));
            info!(latitude, longitude, "Simulated fix published");
        }
        ConsoleCommand::FixLost => {
            simulation.gps.lose_fix();
            info!("Simulated fix lost");
        }
        ConsoleCommand::Status => log_status(device),
        ConsoleCommand::Quit => return false,
    }

    true
}

fn log_status(device: &HostDevice) {
    let session = device.sessions().session();
    let link = device.link().state();
    let stats = device.stats();
    let link_failure = device.link().last_failure().map(ToString::to_string);

    info!(
        session = %session.state,
        card = ?session.card_uid.as_ref().map(CardUid::as_str),
        driver = session.driver_name.as_deref().unwrap_or("-"),
        link = %link.status,
        rssi = ?link.rssi,
        quality = ?link.signal_quality(),
        link_failure = link_failure.as_deref().unwrap_or("-"),
        reports_sent = stats.reports_sent,
        reports_failed = stats.reports_failed,
        skipped = device.telemetry().skipped_count(),
        reader_enabled = device.reader_enabled(),
        "Status"
    );
}
