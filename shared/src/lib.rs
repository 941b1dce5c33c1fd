use serde::{Deserialize, Serialize};

pub mod animation;
pub mod character;
pub mod collision;
pub mod math;
pub mod states;

use math::{Quat, Vec3};

/// Simulation ticks per second, shared by both peers.
pub const TICK_RATE: u32 = 50;
/// Seconds per simulation tick.
pub const TICK_DELTA: f32 = 1.0 / TICK_RATE as f32;

pub const WALK_SPEED: f32 = 5.0;
pub const RUNNING_SPEED: f32 = 10.0;
pub const DODGE_SPEED: f32 = 10.0;
pub const BLOCKING_MOVE_SPEED: f32 = 2.0;
/// Radians per second of turn-rate scaling applied when facing the
/// movement direction.
pub const TURN_SPEED: f32 = 5.0;

pub const SPEED_DAMP_TIME: f32 = 0.1;
pub const ROTATION_DAMP_TIME: f32 = 0.2;
/// Animation drives inside this band snap to exactly zero when movement
/// stops, so idle characters never creep.
pub const DRIVE_EPSILON: f32 = 0.01;

pub const ATTACK_DURATION: f32 = 0.8;
pub const DODGE_DURATION: f32 = 0.4;

/// Maximum unacknowledged intents the predicting peer keeps for replay.
/// Caps memory when snapshots stop arriving; ~2.5s at the shared tick rate.
pub const REPLAY_WINDOW_TICKS: usize = 128;

/// Half-extent of the square arena used by the default collision world.
pub const ARENA_EXTENT: f32 = 50.0;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    /// Predicting peer -> authority, once per simulation tick.
    Intent {
        tick: u64,
        movement: Vec3,
        facing: Quat,
        is_running: bool,
    },
    Disconnect,

    Connected {
        client_id: u32,
    },
    /// Authority -> predicting peer. `tick` echoes the tick of the last
    /// intent the authority applied before capturing this state.
    Snapshot {
        tick: u64,
        position: Vec3,
        orientation: Quat,
    },
    /// Out-of-band absolute rotation, applied immediately on receipt.
    RotationOverride {
        orientation: Quat,
    },
    Disconnected {
        reason: String,
    },
}

/// What the input source reports each rendered frame. `attack` and `dodge`
/// are press edges; `run` and `block` are held.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    pub movement_axis: (f32, f32),
    pub run: bool,
    pub attack: bool,
    pub dodge: bool,
    pub block: bool,
}

/// Per-tick movement order produced by the active state and consumed exactly
/// once by the movement loop. `movement` is already speed-scaled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub movement: Vec3,
    pub facing: Quat,
    pub is_running: bool,
}

impl MoveIntent {
    /// An intent that does not move and keeps the given facing. Used when
    /// the authority has no intent for a tick; keeping the facing matters
    /// because movement application sets orientation from the intent.
    pub fn neutral(facing: Quat) -> Self {
        MoveIntent {
            movement: Vec3::ZERO,
            facing,
            is_running: false,
        }
    }
}

/// Post-move authoritative state for one tick, exchanged for reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSnapshot {
    pub position: Vec3,
    pub orientation: Quat,
}
