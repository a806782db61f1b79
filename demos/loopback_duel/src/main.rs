//! Loopback duel
//!
//! Runs two peers on separate threads, each with its own UDP data channel
//! on 127.0.0.1, negotiating through in-process signaling. Both play
//! scripted inputs for a fixed number of frames and compare checksums at
//! the end.
//!
//! ```text
//! cargo run -p loopback_duel -- [frames] [input_delay]
//! RUST_LOG=riposte_netcode=debug cargo run -p loopback_duel
//! ```

mod duel;

use duel::Duel;
use riposte_core::{Checksum, Clock, Frame, InputBits, PlayerSlot, Simulation, SystemClock};
use riposte_monitor::{AnomalyMonitor, MonitorConfig, Telemetry};
use riposte_netcode::{ConnectionState, NetStats, RollbackSession, SessionConfig, Transport};
use riposte_transport::{LowLatencyTransport, MemorySignaling, Role, TransportConfig, UdpLink};
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

type DemoResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

const FRAME_DURATION: Duration = Duration::from_micros(16_667);
const CONNECT_TIMEOUT_MS: f64 = 5000.0;
/// Frames compared at the end; far enough back to be confirmed on both sides
const SETTLE_FRAMES: Frame = 30;

struct PeerSummary {
    slot: PlayerSlot,
    checksum: Option<Checksum>,
    stats: NetStats,
    anomalies: usize,
    deterministic: bool,
}

/// Deterministic button mashing, different per player
fn scripted_input(slot: PlayerSlot, frame: Frame) -> InputBits {
    let phase = (frame / 20 + slot.index() as Frame * 3) % 8;
    let movement = match phase {
        0 | 1 => InputBits::RIGHT,
        2 => InputBits::UP,
        3 | 4 => InputBits::LEFT,
        5 => InputBits::BLOCK,
        _ => InputBits::NEUTRAL,
    };
    let attack = match frame % 37 {
        0 => InputBits::PUNCH_WEAK,
        11 => InputBits::KICK_MED,
        23 => InputBits::PUNCH_HEAVY,
        _ => InputBits::NEUTRAL,
    };
    movement | attack
}

fn run_peer(
    role: Role,
    slot: PlayerSlot,
    signaling: MemorySignaling,
    frames: Frame,
    input_delay: Frame,
) -> DemoResult<PeerSummary> {
    let clock = Arc::new(SystemClock::new());
    let transport_config = TransportConfig::default();
    let link = UdpLink::new(IpAddr::V4(Ipv4Addr::LOCALHOST), &transport_config);
    let mut transport =
        LowLatencyTransport::new(role, transport_config, link, signaling, clock.clone())?;

    transport.connect();
    while transport.state() != ConnectionState::Open {
        if clock.now_ms() > CONNECT_TIMEOUT_MS {
            return Err(format!("{slot} could not connect").into());
        }
        transport.poll();
        thread::sleep(Duration::from_millis(1));
    }
    info!(%slot, generation = transport.generation(), "Peer connected");

    let config = SessionConfig {
        local_slot: slot,
        input_delay,
        ..Default::default()
    };
    let mut session = RollbackSession::new(config, transport)?;
    let mut game = Duel::new();
    let mut monitor = AnomalyMonitor::with_default_probe(MonitorConfig::default())?;
    monitor.start(clock.now_ms());

    let mut next_tick = Instant::now();
    for frame in 0..frames + SETTLE_FRAMES {
        let input = if frame < frames {
            scripted_input(slot, frame)
        } else {
            InputBits::NEUTRAL
        };
        monitor.record_input();

        let report = session.advance_frame(&mut game, input).map_err(|e| {
            error!(%slot, frame, error = %e, "Session ended");
            e
        })?;
        if let Some(desync) = report.desync_frame {
            warn!(%slot, frame = desync, "Checksum mismatch");
        }

        let stats = session.net_stats();
        monitor.poll(
            clock.now_ms(),
            &Telemetry {
                net: stats,
                physics_signature: Some(game.signature()),
            },
        );
        if frame % 120 == 0 {
            info!(
                %slot,
                frame,
                rtt_ms = ?stats.rtt_ms,
                jitter_ms = stats.jitter_ms,
                rollbacks = stats.rollbacks,
                grade = ?stats.quality_grade(),
                "Net stats"
            );
        }

        next_tick += FRAME_DURATION;
        if let Some(wait) = next_tick.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }

    for report in monitor.drain() {
        info!(%slot, report = %report.to_json()?, "Anomaly report");
    }

    let state = game.state();
    info!(
        %slot,
        hp = ?[state.fighters[0].hp, state.fighters[1].hp],
        "Final state"
    );

    let summary = PeerSummary {
        slot,
        checksum: session.checksum_at(frames.saturating_sub(1)),
        stats: session.net_stats(),
        anomalies: monitor.reports().len(),
        deterministic: session.determinism_status().ok,
    };
    session.transport_mut().disconnect();
    Ok(summary)
}

fn parse_arg(args: &[String], index: usize, default: Frame) -> DemoResult<Frame> {
    match args.get(index) {
        Some(raw) => Ok(raw.parse()?),
        None => Ok(default),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (frames, input_delay) = match (parse_arg(&args, 1, 600), parse_arg(&args, 2, 2)) {
        (Ok(frames), Ok(delay)) => (frames, delay),
        (Err(e), _) | (_, Err(e)) => {
            error!("Invalid arguments: {}", e);
            std::process::exit(2);
        }
    };

    let (sig_one, sig_two) = MemorySignaling::pair();
    let one = thread::spawn(move || {
        run_peer(Role::Originator, PlayerSlot::One, sig_one, frames, input_delay)
    });
    let two = thread::spawn(move || {
        run_peer(Role::Responder, PlayerSlot::Two, sig_two, frames, input_delay)
    });

    let mut summaries = Vec::new();
    for handle in [one, two] {
        match handle.join() {
            Ok(Ok(summary)) => summaries.push(summary),
            Ok(Err(e)) => {
                error!("Peer failed: {}", e);
                std::process::exit(1);
            }
            Err(_) => {
                error!("Peer thread panicked");
                std::process::exit(1);
            }
        }
    }

    for summary in &summaries {
        info!(
            slot = %summary.slot,
            checksum = ?summary.checksum,
            rollbacks = summary.stats.rollbacks,
            resimulated = summary.stats.rollback_frames,
            out_of_order = summary.stats.out_of_order,
            anomalies = summary.anomalies,
            deterministic = summary.deterministic,
            "Peer summary"
        );
    }

    let in_sync = summaries.windows(2).all(|w| w[0].checksum == w[1].checksum);
    if in_sync {
        info!(frames, "Peers agree on the final frame");
    } else {
        error!(frames, "Peers diverged");
        std::process::exit(1);
    }
}
