//! Rollback synchronization engine
//!
//! Runs the predict → detect misprediction → rollback → resimulate loop for
//! one local and one remote player. The host calls
//! [`RollbackSession::advance_frame`] once per tick; the session never
//! blocks and does all of its resimulation inside that call, bounded by
//! `max_rollback` frames.
//!
//! Per tick:
//! 1. Pump the transport and drain remote inputs/checksums it delivered.
//! 2. If a confirmed remote input contradicts the prediction a past frame
//!    was simulated with, restore that frame's snapshot and resimulate up
//!    to the present.
//! 3. Refuse to speculate deeper than the snapshot ring can undo.
//! 4. Acknowledge the remote inputs confirmed so far, then record and send
//!    the local input `input_delay` frames ahead along with every recent
//!    input the peer has not acknowledged.
//! 5. Snapshot, step the simulation once, and store the frame's checksum.
//! 6. Hand checksums of newly confirmed frames to the determinism validator
//!    and the peer, and drop snapshots no rollback can target any more.

use crate::input_buffer::{Confirmation, LocalInputs, RemoteInputs};
use crate::transport::Transport;
use crate::{DeterminismStatus, DeterminismValidator, Error, NetStats, Result, SessionConfig};
use riposte_core::{Checksum, Frame, InputBits, Simulation, SnapshotHistory};
use riposte_rollback_buffer::{FrameRing, RollbackBuffer};
use std::sync::mpsc::{self, Receiver};
use tracing::{debug, error, trace, warn};

/// Remote data handed from transport callbacks to the engine
enum RemoteEvent {
    Input(Frame, InputBits),
    Checksum(Frame, Checksum),
    Ack(Frame),
}

/// A rollback performed during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollbackInfo {
    /// Frame whose snapshot was restored
    pub to_frame: Frame,
    /// Frames stepped again to return to the present
    pub resimulated: Frame,
}

/// What happened while advancing one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// The frame that was simulated
    pub frame: Frame,
    /// Whether it was simulated with a predicted remote input
    pub speculative: bool,
    /// Rollback performed before simulating it, if any
    pub rollback: Option<RollbackInfo>,
    /// Set when a checksum mismatch was detected during this tick
    pub desync_frame: Option<Frame>,
}

/// Peer-to-peer rollback session for a two-player match
///
/// Owns every frame-indexed buffer (inputs, snapshots, checksums) and the
/// transport. The simulation is borrowed per call so the host keeps full
/// ownership of game state between ticks.
pub struct RollbackSession<S: Simulation, T: Transport> {
    config: SessionConfig,
    transport: T,
    inbox: Receiver<RemoteEvent>,
    local_inputs: LocalInputs,
    remote_inputs: RemoteInputs,
    snapshots: RollbackBuffer<S::Snapshot>,
    checksums: FrameRing<Checksum>,
    validator: DeterminismValidator,
    /// Next frame to simulate
    current_frame: Frame,
    /// Earliest frame found mispredicted since the last tick
    pending_rollback: Option<Frame>,
    /// Next frame to hand to the validator once confirmed
    next_checksum_frame: Frame,
    /// Peer holds all of our inputs below this frame
    peer_ack: Frame,
    /// Remote frontier we last acknowledged
    acked_to_peer: Frame,
    rollbacks: u64,
    rollback_frames: u64,
    unrecoverable_desyncs: u64,
    halted: bool,
}

impl<S: Simulation, T: Transport> RollbackSession<S, T> {
    /// Create a session and subscribe to the transport's remote data
    pub fn new(config: SessionConfig, mut transport: T) -> Result<Self> {
        config.validate()?;

        let (tx, inbox) = mpsc::channel();
        let input_tx = tx.clone();
        transport.on_remote_input(Box::new(move |frame, bits| {
            let _ = input_tx.send(RemoteEvent::Input(frame, bits));
        }));
        let checksum_tx = tx.clone();
        transport.on_remote_checksum(Box::new(move |frame, checksum| {
            let _ = checksum_tx.send(RemoteEvent::Checksum(frame, checksum));
        }));
        transport.on_remote_ack(Box::new(move |frame| {
            let _ = tx.send(RemoteEvent::Ack(frame));
        }));

        let window = config.input_window();
        let lead_in = config.input_delay;
        Ok(Self {
            local_inputs: LocalInputs::new(window, lead_in),
            remote_inputs: RemoteInputs::new(window, lead_in),
            snapshots: RollbackBuffer::new(config.max_rollback as usize),
            checksums: FrameRing::new(window),
            validator: DeterminismValidator::new(config.validator_history),
            config,
            transport,
            inbox,
            current_frame: 0,
            pending_rollback: None,
            next_checksum_frame: 0,
            peer_ack: lead_in,
            acked_to_peer: lead_in,
            rollbacks: 0,
            rollback_frames: 0,
            unrecoverable_desyncs: 0,
            halted: false,
        })
    }

    /// Advance the simulation by one frame
    ///
    /// `local` is the local player's input sampled this tick; it takes
    /// effect `input_delay` frames from now.
    ///
    /// Returns `Err` with a fatal error when the session can no longer
    /// guarantee both peers see the same match. Every later call returns
    /// [`Error::Halted`] until [`RollbackSession::reset`].
    pub fn advance_frame(&mut self, sim: &mut S, local: InputBits) -> Result<FrameReport> {
        if self.halted {
            return Err(Error::Halted);
        }

        self.transport.poll();
        let mismatches_before = self.validator.mismatch_count();
        self.drain_inbox();

        let rollback = match self.pending_rollback.take() {
            Some(target) => Some(self.rollback(sim, target)?),
            None => None,
        };

        let gap = self.prediction_gap();
        if gap > self.config.max_rollback {
            self.halted = true;
            error!(
                frame = self.current_frame,
                gap,
                max = self.config.max_rollback,
                "Prediction gap exceeds rollback depth"
            );
            return Err(Error::PredictionGapExceeded {
                gap,
                max: self.config.max_rollback,
            });
        }

        self.acknowledge_remote();

        let target = self.current_frame + self.config.input_delay;
        self.local_inputs.push(target, local)?;
        self.transport.send_local_input(target, local);
        self.resend_unacknowledged(target);

        let frame = self.current_frame;
        let speculative = self.simulate(sim, frame);
        self.current_frame += 1;

        self.publish_checksums();

        let desync_frame = if self.validator.mismatch_count() > mismatches_before {
            self.validator.status().last_mismatch_frame
        } else {
            None
        };

        Ok(FrameReport {
            frame,
            speculative,
            rollback,
            desync_frame,
        })
    }

    /// Snapshot, step and checksum one frame
    ///
    /// Returns whether the remote input used was a prediction.
    fn simulate(&mut self, sim: &mut S, frame: Frame) -> bool {
        self.snapshots.save_state(frame, sim.snapshot());

        let local = self.local_inputs.get(frame).unwrap_or_default();
        let (remote, speculative) = self.remote_inputs.resolve(frame, self.config.prediction);

        let mut inputs = [InputBits::NEUTRAL; 2];
        inputs[self.config.local_slot.index()] = local;
        inputs[self.config.local_slot.opponent().index()] = remote;
        sim.step(&inputs);

        self.checksums.insert(frame, sim.checksum());
        speculative
    }

    /// Restore the snapshot for `target` and resimulate to the present
    fn rollback(&mut self, sim: &mut S, target: Frame) -> Result<RollbackInfo> {
        let Some(snapshot) = self.snapshots.get_state(target) else {
            let oldest = self.snapshots.window().map(|window| window.earliest);
            self.unrecoverable_desyncs += 1;
            self.halted = true;
            error!(
                frame = target,
                ?oldest,
                "Rollback target no longer buffered, desync is unrecoverable"
            );
            return Err(Error::SnapshotEvicted {
                frame: target,
                oldest,
            });
        };
        sim.restore(snapshot);

        let end = self.current_frame;
        for frame in target..end {
            self.simulate(sim, frame);
        }

        let resimulated = end - target;
        self.rollbacks += 1;
        self.rollback_frames += resimulated as u64;
        debug!(to_frame = target, resimulated, "Rolled back");

        Ok(RollbackInfo {
            to_frame: target,
            resimulated,
        })
    }

    fn drain_inbox(&mut self) {
        while let Ok(event) = self.inbox.try_recv() {
            match event {
                RemoteEvent::Input(frame, bits) => self.confirm_remote(frame, bits),
                RemoteEvent::Checksum(frame, checksum) => {
                    self.validator.validate(frame, checksum);
                }
                RemoteEvent::Ack(frame) => self.peer_ack = self.peer_ack.max(frame),
            }
        }
    }

    fn confirm_remote(&mut self, frame: Frame, bits: InputBits) {
        match self.remote_inputs.confirm(frame, bits) {
            Confirmation::Accepted {
                previous: Some(predicted),
            } if predicted != bits && frame < self.current_frame => {
                trace!(frame, %predicted, actual = %bits, "Misprediction");
                self.pending_rollback = Some(self.pending_rollback.map_or(frame, |f| f.min(frame)));
            }
            Confirmation::Accepted { .. } => {}
            Confirmation::Duplicate => trace!(frame, "Duplicate remote input ignored"),
            Confirmation::OutOfWindow => warn!(
                frame,
                current = self.current_frame,
                "Remote input too far ahead, dropped"
            ),
        }
    }

    /// Tell the peer how far its inputs are confirmed, when that moved
    ///
    /// A lost ack only costs the peer a few extra re-sends until the next one.
    fn acknowledge_remote(&mut self) {
        let frontier = self.remote_inputs.frontier();
        if frontier > self.acked_to_peer {
            self.transport.send_input_ack(frontier);
            self.acked_to_peer = frontier;
        }
    }

    /// Re-send local inputs below `target` the peer has not acknowledged
    ///
    /// Bounded to the newest `input_redundancy` frames. Without acks from
    /// the transport this degrades to plain redundancy.
    fn resend_unacknowledged(&mut self, target: Frame) {
        let floor = target
            .saturating_sub(self.config.input_redundancy)
            .max(self.peer_ack);
        for frame in floor..target {
            if let Some(bits) = self.local_inputs.get(frame) {
                self.transport.send_local_input(frame, bits);
            }
        }
    }

    /// Record and send checksums of frames whose inputs are all final
    ///
    /// Snapshots below those frames are released too: a rollback only ever
    /// targets a frame simulated with a prediction.
    fn publish_checksums(&mut self) {
        let confirmed_end = self.remote_inputs.frontier().min(self.current_frame);
        self.snapshots.clear_before(confirmed_end);
        while self.next_checksum_frame < confirmed_end {
            let frame = self.next_checksum_frame;
            if let Some(&checksum) = self.checksums.get(frame) {
                self.validator.record(frame, checksum);
                if frame % self.config.checksum_interval == 0 {
                    self.transport.send_checksum(frame, checksum);
                }
            }
            self.next_checksum_frame += 1;
        }
    }

    /// Current frame minus the last confirmed remote frame
    ///
    /// Zero once the remote input for the current frame is already known.
    pub fn prediction_gap(&self) -> Frame {
        (self.current_frame + 1).saturating_sub(self.remote_inputs.frontier())
    }

    /// Point-in-time telemetry
    pub fn net_stats(&self) -> NetStats {
        NetStats {
            input_delay: self.config.input_delay,
            rollbacks: self.rollbacks,
            rollback_frames: self.rollback_frames,
            unrecoverable_desyncs: self.unrecoverable_desyncs,
            current_frame: self.current_frame,
            last_confirmed_frame: self.remote_inputs.last_confirmed(),
            prediction_gap: self.prediction_gap(),
            ..Default::default()
        }
        .with_link(&self.transport.link_stats())
    }

    /// Checksum verdict so far
    pub fn determinism_status(&self) -> DeterminismStatus {
        self.validator.status()
    }

    /// Local checksum stored for `frame`, if still buffered
    pub fn checksum_at(&self, frame: Frame) -> Option<Checksum> {
        self.checksums.get(frame).copied()
    }

    /// Next frame to be simulated
    pub fn current_frame(&self) -> Frame {
        self.current_frame
    }

    /// Last frame of the contiguous confirmed remote prefix
    pub fn confirmed_frame(&self) -> Option<Frame> {
        self.remote_inputs.last_confirmed()
    }

    /// Whether a fatal error has stopped the session
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Start over from frame 0 for a rematch, keeping the transport
    ///
    /// The caller resets its simulation to the initial state as well.
    pub fn reset(&mut self) {
        while self.inbox.try_recv().is_ok() {}

        let window = self.config.input_window();
        self.local_inputs = LocalInputs::new(window, self.config.input_delay);
        self.remote_inputs = RemoteInputs::new(window, self.config.input_delay);
        self.snapshots.clear();
        self.checksums.clear();
        self.validator.reset();
        self.current_frame = 0;
        self.pending_rollback = None;
        self.next_checksum_frame = 0;
        self.peer_ack = self.config.input_delay;
        self.acked_to_peer = self.config.input_delay;
        self.rollbacks = 0;
        self.rollback_frames = 0;
        self.unrecoverable_desyncs = 0;
        self.halted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use crate::{PredictionPolicy, WireMessage};
    use proptest::collection::vec;
    use proptest::prelude::*;
    use riposte_core::{decode_snapshot, encode_snapshot, ChecksumBuilder, PlayerSlot};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Fighter {
        x: i32,
        hp: i32,
        cooldown: u8,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct DuelState {
        frame: u32,
        fighters: [Fighter; 2],
    }

    /// Tiny deterministic fighting game
    struct Duel {
        state: DuelState,
        /// Nudge health on this frame to fake a non-deterministic step
        corrupt_at: Option<u32>,
    }

    impl Duel {
        fn new() -> Self {
            Self {
                state: DuelState {
                    frame: 0,
                    fighters: [
                        Fighter {
                            x: -20,
                            hp: 1000,
                            cooldown: 0,
                        },
                        Fighter {
                            x: 20,
                            hp: 1000,
                            cooldown: 0,
                        },
                    ],
                },
                corrupt_at: None,
            }
        }
    }

    impl Simulation for Duel {
        type Snapshot = Vec<u8>;

        fn snapshot(&self) -> Vec<u8> {
            encode_snapshot(&self.state).unwrap()
        }

        fn restore(&mut self, snapshot: &Vec<u8>) {
            self.state = decode_snapshot(snapshot).unwrap();
        }

        fn step(&mut self, inputs: &[InputBits; 2]) {
            for (i, input) in inputs.iter().enumerate() {
                let other = 1 - i;
                let fighter = &mut self.state.fighters[i];
                if input.contains(InputBits::LEFT) {
                    fighter.x -= 2;
                }
                if input.contains(InputBits::RIGHT) {
                    fighter.x += 2;
                }
                fighter.cooldown = fighter.cooldown.saturating_sub(1);

                let damage = if input.contains(InputBits::PUNCH_HEAVY) {
                    8
                } else if input.contains(InputBits::PUNCH_MED) {
                    5
                } else if input.contains(InputBits::PUNCH_WEAK) {
                    3
                } else {
                    0
                };
                let x = fighter.x;
                if damage > 0 && fighter.cooldown == 0 {
                    fighter.cooldown = 10;
                    let target = &mut self.state.fighters[other];
                    if (target.x - x).abs() < 60 && !input.contains(InputBits::BLOCK) {
                        target.hp -= damage;
                    }
                }
            }
            self.state.frame += 1;
            if self.corrupt_at == Some(self.state.frame) {
                self.state.fighters[0].hp += 1;
            }
        }

        fn checksum(&self) -> Checksum {
            let mut builder = ChecksumBuilder::new();
            builder.write_u32(self.state.frame);
            for fighter in &self.state.fighters {
                builder
                    .write_i32(fighter.x)
                    .write_i32(fighter.hp)
                    .write_u8(fighter.cooldown);
            }
            builder.finish()
        }
    }

    type TestSession = RollbackSession<Duel, MemoryTransport>;

    fn pair(config: SessionConfig) -> (TestSession, TestSession) {
        let (mut ta, mut tb) = MemoryTransport::pair();
        ta.connect();
        tb.connect();
        let a = RollbackSession::new(
            SessionConfig {
                local_slot: PlayerSlot::One,
                ..config.clone()
            },
            ta,
        )
        .unwrap();
        let b = RollbackSession::new(
            SessionConfig {
                local_slot: PlayerSlot::Two,
                ..config
            },
            tb,
        )
        .unwrap();
        (a, b)
    }

    fn scripted_input(frame: Frame, seed: u16) -> InputBits {
        InputBits::from_bits_truncate(((frame as u16).wrapping_mul(37) ^ seed) & 0x07ff)
    }

    #[test]
    fn test_lockstep_without_rollback() {
        let (mut a, mut b) = pair(SessionConfig::default());
        let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());

        for frame in 0..120 {
            let ra = a.advance_frame(&mut sim_a, scripted_input(frame, 0x15)).unwrap();
            let rb = b.advance_frame(&mut sim_b, scripted_input(frame, 0x2a)).unwrap();
            assert!(ra.rollback.is_none());
            assert!(rb.rollback.is_none());
            assert!(!rb.speculative);
        }

        assert_eq!(sim_a.state, sim_b.state);
        assert_eq!(a.net_stats().rollbacks, 0);
        assert_eq!(b.net_stats().rollbacks, 0);
        for frame in 0..120 {
            assert_eq!(a.checksum_at(frame), b.checksum_at(frame));
        }
        assert!(a.determinism_status().ok);
        assert!(b.determinism_status().ok);
        assert!(b.determinism_status().last_validated_frame.is_some());
    }

    #[test]
    fn test_late_input_triggers_single_rollback() {
        let config = SessionConfig {
            input_delay: 0,
            max_rollback: 16,
            prediction: PredictionPolicy::Neutral,
            ..Default::default()
        };
        let (mut a, mut b) = pair(config);
        let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());

        for _ in 0..9 {
            a.advance_frame(&mut sim_a, InputBits::RIGHT).unwrap();
        }
        for _ in 0..10 {
            let report = b.advance_frame(&mut sim_b, InputBits::NEUTRAL).unwrap();
            assert!(report.rollback.is_none());
        }
        // Frame 9 was simulated on B with a neutral guess
        assert_eq!(b.confirmed_frame(), Some(8));

        a.advance_frame(&mut sim_a, InputBits::PUNCH_HEAVY).unwrap();
        let report = b.advance_frame(&mut sim_b, InputBits::NEUTRAL).unwrap();
        assert_eq!(
            report.rollback,
            Some(RollbackInfo {
                to_frame: 9,
                resimulated: 1
            })
        );
        assert_eq!(b.net_stats().rollbacks, 1);
        assert_eq!(b.net_stats().rollback_frames, 1);

        a.advance_frame(&mut sim_a, InputBits::NEUTRAL).unwrap();
        assert_eq!(a.net_stats().rollbacks, 0);
        assert_eq!(a.checksum_at(9), b.checksum_at(9));
        assert_eq!(a.checksum_at(10), b.checksum_at(10));
        assert_eq!(sim_a.state, sim_b.state);

        for _ in 0..5 {
            a.advance_frame(&mut sim_a, InputBits::NEUTRAL).unwrap();
            b.advance_frame(&mut sim_b, InputBits::NEUTRAL).unwrap();
        }
        assert_eq!(b.net_stats().rollbacks, 1);
        assert!(a.determinism_status().ok);
        assert!(b.determinism_status().ok);
    }

    #[test]
    fn test_out_of_order_rolls_back_to_earliest() {
        let config = SessionConfig {
            input_delay: 0,
            max_rollback: 16,
            prediction: PredictionPolicy::RepeatLastConfirmed,
            ..Default::default()
        };
        let (mut a, mut b) = pair(config);
        let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());

        b.transport_mut().hold_inbound(true);
        for frame in 0..6 {
            a.advance_frame(&mut sim_a, scripted_input(frame, 0x3)).unwrap();
            b.advance_frame(&mut sim_b, InputBits::NEUTRAL).unwrap();
        }
        b.transport_mut().reverse_inbound();
        b.transport_mut().hold_inbound(false);

        let report = b.advance_frame(&mut sim_b, InputBits::NEUTRAL).unwrap();
        let rollback = report.rollback.unwrap();
        assert_eq!(rollback.to_frame, 0);
        assert_eq!(rollback.resimulated, 6);
        assert_eq!(b.confirmed_frame(), Some(5));
        for frame in 0..6 {
            assert_eq!(a.checksum_at(frame), b.checksum_at(frame));
        }
    }

    #[test]
    fn test_prediction_gap_is_fatal() {
        let config = SessionConfig {
            input_delay: 0,
            max_rollback: 4,
            ..Default::default()
        };
        let (_a, mut b) = pair(config);
        let mut sim = Duel::new();

        for expected_gap in 1..=4 {
            b.advance_frame(&mut sim, InputBits::NEUTRAL).unwrap();
            assert_eq!(b.net_stats().prediction_gap, expected_gap + 1);
        }
        assert_eq!(
            b.advance_frame(&mut sim, InputBits::NEUTRAL),
            Err(Error::PredictionGapExceeded { gap: 5, max: 4 })
        );
        assert!(b.is_halted());
        assert_eq!(b.current_frame(), 4);
        assert_eq!(b.advance_frame(&mut sim, InputBits::NEUTRAL), Err(Error::Halted));
    }

    #[test]
    fn test_evicted_snapshot_is_fatal() {
        let config = SessionConfig {
            max_rollback: 4,
            ..Default::default()
        };
        let (_a, mut b) = pair(config);
        let mut sim_b = Duel::new();
        // Nothing arrives from A, so frames 2..=5 stay speculative
        for _ in 0..6 {
            b.advance_frame(&mut sim_b, InputBits::NEUTRAL).unwrap();
        }

        let result = b.rollback(&mut sim_b, 1);
        assert_eq!(
            result,
            Err(Error::SnapshotEvicted {
                frame: 1,
                oldest: Some(2)
            })
        );
        assert!(result.unwrap_err().is_fatal());
        assert_eq!(b.net_stats().unrecoverable_desyncs, 1);
        assert_eq!(b.advance_frame(&mut sim_b, InputBits::NEUTRAL), Err(Error::Halted));
    }

    #[test]
    fn test_checksum_mismatch_is_reported_not_fatal() {
        let (mut a, mut b) = pair(SessionConfig::default());
        let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());
        sim_b.corrupt_at = Some(20);

        let mut desync_frames = Vec::new();
        for frame in 0..40 {
            for report in [
                a.advance_frame(&mut sim_a, scripted_input(frame, 1)).unwrap(),
                b.advance_frame(&mut sim_b, scripted_input(frame, 2)).unwrap(),
            ] {
                if let Some(f) = report.desync_frame {
                    desync_frames.push(f);
                }
            }
        }

        // Frame 19 is the step that produced state frame 20
        assert_eq!(desync_frames.first(), Some(&19));
        assert!(!a.is_halted());
        assert!(!b.is_halted());
        assert_eq!(b.determinism_status().last_mismatch_frame.map(|f| f >= 19), Some(true));
    }

    #[test]
    fn test_input_redundancy_resends() {
        let config = SessionConfig {
            input_redundancy: 2,
            ..Default::default()
        };
        let (mut a, mut b) = pair(config);
        let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());

        for _ in 0..3 {
            a.advance_frame(&mut sim_a, InputBits::UP).unwrap();
        }
        // Inputs 2, then 3 + 2, then 4 + 3 + 2, plus checksums of frames 0 and 1
        assert_eq!(b.transport().pending_inbound(), 8);
        b.advance_frame(&mut sim_b, InputBits::UP).unwrap();
        assert_eq!(b.confirmed_frame(), Some(4));

        // B acknowledged everything below 5, so only the new input goes out
        a.advance_frame(&mut sim_a, InputBits::UP).unwrap();
        let mut sent = Vec::new();
        b.transport_mut().drop_inbound(|msg| {
            if let WireMessage::Input { frame, .. } = msg {
                sent.push(*frame);
            }
            false
        });
        assert_eq!(sent, vec![5]);
    }

    #[test]
    fn test_lost_input_is_repaired() {
        let (mut a, mut b) = pair(SessionConfig::default());
        let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());

        for frame in 0..60 {
            a.advance_frame(&mut sim_a, scripted_input(frame, 0x15)).unwrap();
            if frame == 10 {
                let lost = b
                    .transport_mut()
                    .drop_inbound(|msg| matches!(msg, WireMessage::Input { .. }));
                assert_eq!(lost, 1);
            }
            b.advance_frame(&mut sim_b, scripted_input(frame, 0x2a)).unwrap();
        }

        assert_eq!(sim_a.state, sim_b.state);
        for frame in 40..60 {
            assert!(a.checksum_at(frame).is_some());
            assert_eq!(a.checksum_at(frame), b.checksum_at(frame));
        }
        assert!(b.net_stats().prediction_gap <= 1);
        assert!(a.determinism_status().ok);
        assert!(b.determinism_status().ok);
    }

    #[test]
    fn test_fire_and_forget_cannot_repair_loss() {
        let config = SessionConfig {
            input_redundancy: 0,
            ..Default::default()
        };
        let (mut a, mut b) = pair(config);
        let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());

        let mut failure = None;
        for frame in 0..60 {
            a.advance_frame(&mut sim_a, InputBits::NEUTRAL).unwrap();
            if frame == 10 {
                b.transport_mut()
                    .drop_inbound(|msg| matches!(msg, WireMessage::Input { .. }));
            }
            if let Err(e) = b.advance_frame(&mut sim_b, InputBits::NEUTRAL) {
                failure = Some((frame, e));
                break;
            }
        }

        // Frame 12 never arrives, so B's confirmed frontier stops there
        assert_eq!(
            failure,
            Some((20, Error::PredictionGapExceeded { gap: 9, max: 8 }))
        );
    }

    #[test]
    fn test_periodic_loss_recovers_through_rollback() {
        let config = SessionConfig {
            input_delay: 0,
            prediction: PredictionPolicy::RepeatLastConfirmed,
            ..Default::default()
        };
        let (mut a, mut b) = pair(config);
        let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());
        let is_input = |msg: &WireMessage| matches!(msg, WireMessage::Input { .. });

        for frame in 0..80 {
            a.advance_frame(&mut sim_a, scripted_input(frame, 0x11)).unwrap();
            if frame % 5 == 2 {
                b.transport_mut().drop_inbound(is_input);
            }
            b.advance_frame(&mut sim_b, scripted_input(frame, 0x44)).unwrap();
            if frame % 5 == 2 {
                a.transport_mut().drop_inbound(is_input);
            }
        }
        for _ in 0..4 {
            a.advance_frame(&mut sim_a, InputBits::NEUTRAL).unwrap();
            b.advance_frame(&mut sim_b, InputBits::NEUTRAL).unwrap();
        }

        assert!(b.net_stats().rollbacks > 0);
        for frame in 70..82 {
            assert_eq!(a.checksum_at(frame), b.checksum_at(frame));
        }
        assert!(!a.is_halted());
        assert!(!b.is_halted());
        assert!(a.determinism_status().ok);
        assert!(b.determinism_status().ok);
    }

    #[test]
    fn test_lost_checksums_raise_no_desync() {
        let (mut a, mut b) = pair(SessionConfig::default());
        let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());
        let is_checksum = |msg: &WireMessage| matches!(msg, WireMessage::Checksum { .. });

        let mut desyncs = Vec::new();
        for frame in 0..60 {
            let ra = a.advance_frame(&mut sim_a, scripted_input(frame, 7)).unwrap();
            if (10..20).contains(&frame) {
                b.transport_mut().drop_inbound(is_checksum);
            }
            let rb = b.advance_frame(&mut sim_b, scripted_input(frame, 8)).unwrap();
            if (10..20).contains(&frame) {
                a.transport_mut().drop_inbound(is_checksum);
            }
            desyncs.extend(ra.desync_frame);
            desyncs.extend(rb.desync_frame);
        }

        assert!(desyncs.is_empty());
        for session in [&a, &b] {
            let status = session.determinism_status();
            assert!(status.ok);
            assert_eq!(status.last_mismatch_frame, None);
            assert!(status.last_validated_frame.is_some_and(|f| f > 20));
        }
    }

    #[test]
    fn test_confirmed_snapshots_are_released() {
        let (mut a, mut b) = pair(SessionConfig::default());
        let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());

        for _ in 0..4 {
            b.advance_frame(&mut sim_b, InputBits::NEUTRAL).unwrap();
        }
        // Frames 0 and 1 are lead-in; only the speculative ones stay
        let window = b.snapshots.window().map(|w| (w.earliest, w.latest));
        assert_eq!(window, Some((2, 3)));

        for _ in 0..4 {
            a.advance_frame(&mut sim_a, InputBits::NEUTRAL).unwrap();
        }
        let report = b.advance_frame(&mut sim_b, InputBits::NEUTRAL).unwrap();
        assert!(report.rollback.is_none());
        assert!(b.snapshots.window().is_none());
    }

    #[test]
    fn test_reset_for_rematch() {
        let (mut a, mut b) = pair(SessionConfig::default());
        let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());
        for frame in 0..10 {
            a.advance_frame(&mut sim_a, scripted_input(frame, 9)).unwrap();
            b.advance_frame(&mut sim_b, scripted_input(frame, 4)).unwrap();
        }

        a.reset();
        b.reset();
        let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());
        assert_eq!(a.current_frame(), 0);
        assert_eq!(a.net_stats().rollbacks, 0);
        assert!(a.checksum_at(3).is_none());

        for frame in 0..10 {
            a.advance_frame(&mut sim_a, scripted_input(frame, 9)).unwrap();
            b.advance_frame(&mut sim_b, scripted_input(frame, 4)).unwrap();
        }
        assert_eq!(sim_a.state, sim_b.state);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_rollback_matches_non_speculative(
            a_inputs in vec(0u16..0x800, 40),
            b_inputs in vec(0u16..0x800, 40),
            holds in vec(any::<bool>(), 40),
        ) {
            let config = SessionConfig {
                input_delay: 1,
                max_rollback: 48,
                ..Default::default()
            };
            let (mut a, mut b) = pair(config);
            let (mut sim_a, mut sim_b) = (Duel::new(), Duel::new());

            let bits = |seq: &[u16], i: usize| InputBits::from_bits_truncate(seq[i]);
            for i in 0..40 {
                b.transport_mut().hold_inbound(holds[i]);
                a.advance_frame(&mut sim_a, bits(&a_inputs, i)).unwrap();
                b.advance_frame(&mut sim_b, bits(&b_inputs, i)).unwrap();
            }
            b.transport_mut().hold_inbound(false);
            for _ in 0..4 {
                a.advance_frame(&mut sim_a, InputBits::NEUTRAL).unwrap();
                b.advance_frame(&mut sim_b, InputBits::NEUTRAL).unwrap();
            }

            // Step a reference simulation with every input known up front
            let applied = |seq: &[u16], frame: usize| {
                frame
                    .checked_sub(1)
                    .and_then(|i| seq.get(i))
                    .map(|&raw| InputBits::from_bits_truncate(raw))
                    .unwrap_or_default()
            };
            let mut reference = Duel::new();
            for frame in 0..44usize {
                reference.step(&[applied(&a_inputs, frame), applied(&b_inputs, frame)]);
                prop_assert_eq!(a.checksum_at(frame as Frame), Some(reference.checksum()));
                prop_assert_eq!(b.checksum_at(frame as Frame), Some(reference.checksum()));
            }
            prop_assert_eq!(&sim_b.state, &reference.state);
            prop_assert!(b.determinism_status().ok);
        }
    }
}
