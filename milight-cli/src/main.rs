//! milight - encode, decode and simulate MiLight radio packets

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use milight_gateway::{GatewaySettings, MiLightClient};
use milight_protocol::{
    from_hex, to_hex, v2_encoding, BulbState, CommandName, FieldUpdates, Formatters, ParsedPacket,
    PacketFormatter, RadioConfig, RawCommand, RemoteType, Status, ALL_REMOTES,
};
use milight_sim::{RadioBus, VirtualRadioFactory};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// MiLight RF gateway tools
#[derive(Parser)]
#[command(name = "milight")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Gateway settings file (JSON); defaults are used when omitted
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Print compact JSON instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported remote types and their radio settings
    Remotes,

    /// Encode a command into the packets a remote would send
    Encode {
        /// Remote type name or alias (e.g. rgb_cct, fut089)
        #[arg(short, long)]
        remote: RemoteType,

        /// Device id, decimal or 0x-prefixed hex
        #[arg(short, long, value_parser = parse_device_id)]
        device: u16,

        /// Group id; 0 addresses every group
        #[arg(short, long, default_value = "1")]
        group: u8,

        #[arg(long)]
        status: Option<Status>,

        /// Hue in degrees (0-359)
        #[arg(long)]
        hue: Option<u16>,

        /// Saturation percent
        #[arg(long)]
        saturation: Option<u8>,

        /// Color temperature, 0 (coolest) to 100 (warmest)
        #[arg(long)]
        temperature: Option<u8>,

        /// Brightness percent
        #[arg(long)]
        brightness: Option<u8>,

        /// Scene number
        #[arg(long)]
        mode: Option<u8>,

        /// Named command (pair, unpair, set_white, night_mode, ...)
        #[arg(long)]
        command: Option<CommandName>,

        /// Raw button id, sent with --argument
        #[arg(long, requires = "argument")]
        button: Option<u8>,

        /// Raw argument byte
        #[arg(long, requires = "button")]
        argument: Option<u8>,

        /// Mark commands as long presses
        #[arg(long)]
        held: bool,

        /// Current bulb state as JSON, used for mode switching
        #[arg(long)]
        state: Option<String>,

        /// Restore the bulb's mode after mode-dependent commands
        #[arg(long)]
        auto_mode_switching: bool,
    },

    /// Decode a sniffed packet
    Decode {
        /// Only try this remote type
        #[arg(short, long)]
        remote: Option<RemoteType>,

        /// Packet bytes as hex
        hex: String,
    },

    /// Send status commands through simulated radios and report throttling
    Simulate {
        #[arg(short, long)]
        remote: RemoteType,

        #[arg(short, long, value_parser = parse_device_id, default_value = "0x0001")]
        device: u16,

        #[arg(short, long, default_value = "1")]
        group: u8,

        /// Number of commands to queue
        #[arg(short, long, default_value = "10")]
        count: usize,

        /// Simulated time between sender ticks
        #[arg(short, long, default_value = "1")]
        interval_ms: u64,
    },
}

#[derive(Serialize)]
struct RemoteInfo {
    name: &'static str,
    aliases: &'static [&'static str],
    packet_len: usize,
    num_groups: u8,
    radio: &'static RadioConfig,
}

#[derive(Serialize)]
struct EncodeOutput {
    remote: RemoteType,
    device_id: String,
    group_id: u8,
    packets: Vec<String>,
}

#[derive(Serialize)]
struct DecodeOutput {
    remote: RemoteType,
    /// Plain bytes of a whitened V2 packet
    #[serde(skip_serializing_if = "Option::is_none")]
    decoded: Option<String>,
    packet: ParsedPacket,
}

#[derive(Serialize)]
struct SimulateOutput {
    remote: RemoteType,
    commands: usize,
    queued_packets: usize,
    dropped_packets: u64,
    transmissions: usize,
    /// Physical repeats per distinct packet, in send order
    repeats: Vec<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "milight=info,milight_protocol=info,milight_gateway=info,milight_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;

    match cli.command {
        Commands::Remotes => {
            let remotes: Vec<RemoteInfo> = ALL_REMOTES
                .iter()
                .map(|r| RemoteInfo {
                    name: r.name,
                    aliases: r.remote_type.aliases(),
                    packet_len: r.packet_len,
                    num_groups: r.num_groups,
                    radio: r.radio_config(),
                })
                .collect();
            print_json(&remotes, cli.compact)
        }

        Commands::Encode {
            remote,
            device,
            group,
            status,
            hue,
            saturation,
            temperature,
            brightness,
            mode,
            command,
            button,
            argument,
            held,
            state,
            auto_mode_switching,
        } => {
            let snapshot = state
                .map(|s| serde_json::from_str::<BulbState>(&s))
                .transpose()
                .context("Failed to parse --state as bulb state JSON")?;

            let mut updates = FieldUpdates {
                status,
                brightness,
                hue,
                saturation,
                temperature,
                mode,
                command,
                ..Default::default()
            };
            if let (Some(button_id), Some(argument)) = (button, argument) {
                updates.raw = Some(RawCommand {
                    button_id,
                    argument,
                });
            }
            if updates.is_empty() {
                bail!("Nothing to encode; pass at least one field or --command");
            }

            let mut settings = settings;
            settings.formatter.automatic_mode_switching |= auto_mode_switching;
            let packets = encode(&settings, remote, device, group, snapshot, held, &updates)?;

            let output = EncodeOutput {
                remote,
                device_id: format!("0x{:04X}", device),
                group_id: group,
                packets: packets.iter().map(|p| to_hex(p)).collect(),
            };
            print_json(&output, cli.compact)
        }

        Commands::Decode { remote, hex } => {
            let bytes = from_hex(&hex).context("Failed to parse packet hex")?;
            let formatters = Formatters::new(settings.formatter);
            let states = milight_protocol::NoState;

            let remote = match remote {
                Some(remote) => remote,
                None => formatters
                    .identify(&bytes)
                    .with_context(|| format!("No remote type recognizes {}", to_hex(&bytes)))?,
            };
            let packet = formatters
                .get(remote)
                .parse_packet(&bytes, &states)
                .with_context(|| format!("Failed to decode packet as {}", remote))?;

            let output = DecodeOutput {
                remote,
                decoded: v2_encoding::decoded(&bytes).map(|p| to_hex(&p)),
                packet,
            };
            print_json(&output, cli.compact)
        }

        Commands::Simulate {
            remote,
            device,
            group,
            count,
            interval_ms,
        } => {
            let output = simulate(&settings, remote, device, group, count, interval_ms)?;
            print_json(&output, cli.compact)
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<GatewaySettings> {
    let Some(path) = path else {
        return Ok(GatewaySettings::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    let settings: GatewaySettings = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
    settings.validate().context("Invalid settings")?;
    debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Run the updates through a client on simulated radios and collect the
/// distinct packets that went on air
fn encode(
    settings: &GatewaySettings,
    remote: RemoteType,
    device: u16,
    group: u8,
    snapshot: Option<BulbState>,
    held: bool,
    updates: &FieldUpdates,
) -> Result<Vec<Vec<u8>>> {
    let bus = RadioBus::new();
    let factory = VirtualRadioFactory::new(bus.clone());
    let mut client = MiLightClient::new(settings, &factory).context("Failed to start gateway")?;

    client.prepare(remote, device, group, snapshot);
    client.set_held(held);
    client.set_repeats_override(1);
    let queued = client
        .update(updates)
        .with_context(|| format!("Failed to encode for {}", remote))?;
    client.flush();

    if client.sender().dropped_packets() > 0 {
        info!(
            "{} of {} packets did not fit the send queue",
            client.sender().dropped_packets(),
            queued
        );
    }
    Ok(bus.transmissions().into_iter().map(|t| t.bytes).collect())
}

fn simulate(
    settings: &GatewaySettings,
    remote: RemoteType,
    device: u16,
    group: u8,
    count: usize,
    interval_ms: u64,
) -> Result<SimulateOutput> {
    let bus = RadioBus::new();
    let factory = VirtualRadioFactory::new(bus.clone());
    let mut client = MiLightClient::new(settings, &factory).context("Failed to start gateway")?;
    client.prepare(remote, device, group, None);

    let mut queued_packets = 0;
    for i in 0..count {
        let status = if i % 2 == 0 { Status::On } else { Status::Off };
        queued_packets += client.update_status(status)?;
    }

    let step = Duration::from_millis(interval_ms);
    let mut now = Instant::now();
    while client.is_sending() {
        client.sender_mut().tick_at(now);
        now += step;
    }

    let transmissions = bus.transmissions();
    let mut repeats: Vec<usize> = Vec::new();
    let mut last: Option<&[u8]> = None;
    for t in &transmissions {
        match (last, repeats.last_mut()) {
            (Some(prev), Some(n)) if prev == t.bytes.as_slice() => *n += 1,
            _ => repeats.push(1),
        }
        last = Some(t.bytes.as_slice());
    }

    info!(
        "Simulated {} commands: {} transmissions, {} dropped",
        count,
        transmissions.len(),
        client.sender().dropped_packets()
    );

    Ok(SimulateOutput {
        remote,
        commands: count,
        queued_packets,
        dropped_packets: client.sender().dropped_packets(),
        transmissions: transmissions.len(),
        repeats,
    })
}

fn parse_device_id(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid device id '{}': {}", s, e))
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_id() {
        assert_eq!(parse_device_id("0x1234"), Ok(0x1234));
        assert_eq!(parse_device_id("4660"), Ok(0x1234));
        assert!(parse_device_id("0x12345").is_err());
        assert!(parse_device_id("lamp").is_err());
    }

    #[test]
    fn test_encode_then_decode() {
        let settings = GatewaySettings::default();
        let updates = FieldUpdates::default().with_brightness(70);
        let packets = encode(&settings, RemoteType::Fut091, 0x0A0B, 2, None, false, &updates).unwrap();
        assert_eq!(packets.len(), 1);

        let parsed = Formatters::default()
            .parse(&packets[0], &milight_protocol::NoState)
            .unwrap();
        assert_eq!(parsed.updates.brightness, Some(70));
        assert_eq!(parsed.bulb_id.group_id, 2);
    }

    #[test]
    fn test_simulate_without_throttle() {
        let output = simulate(&GatewaySettings::default(), RemoteType::Rgb, 1, 0, 3, 1).unwrap();
        assert_eq!(output.transmissions, 150);
        assert_eq!(output.repeats, vec![50, 50, 50]);
    }

    #[test]
    fn test_cli_parses_aliases() {
        let cli = Cli::try_parse_from(["milight", "decode", "--remote", "fut092", "00 11"]).unwrap();
        match cli.command {
            Commands::Decode { remote, .. } => assert_eq!(remote, Some(RemoteType::RgbCct)),
            _ => panic!("expected decode"),
        }
    }
}
