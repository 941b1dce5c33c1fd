//! Hierarchical player state machine. Exactly one state is active per
//! character; transitions are ordered (exit completes before enter) and
//! requested by the states themselves as return values rather than applied
//! from inside a hook.

mod actions;
mod movement;
mod reactions;

pub use actions::{AttackState, BlockState, DodgeState};
pub use movement::MovementState;
pub use reactions::{BlockHitState, DeathState, ImpactState};

use crate::animation::Animator;
use crate::character::CharacterSim;
use crate::collision::CollisionWorld;
use crate::{FrameInput, MoveIntent};
use log::debug;
use thiserror::Error;

/// The closed set of behaviors a character can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerStateKind {
    Movement,
    Running,
    Attack,
    Dodge,
    Block,
    Death,
    Impact,
    BlockHit,
}

impl PlayerStateKind {
    pub const COUNT: usize = 8;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn all() -> [PlayerStateKind; Self::COUNT] {
        [
            PlayerStateKind::Movement,
            PlayerStateKind::Running,
            PlayerStateKind::Attack,
            PlayerStateKind::Dodge,
            PlayerStateKind::Block,
            PlayerStateKind::Death,
            PlayerStateKind::Impact,
            PlayerStateKind::BlockHit,
        ]
    }

    /// States in which the character is reacting to damage and cannot act.
    pub fn is_reacting(self) -> bool {
        matches!(self, PlayerStateKind::Impact | PlayerStateKind::BlockHit)
    }
}

/// Fatal setup problem. A machine with an unbound state must never start
/// simulating.
#[derive(Debug, Error)]
pub enum StateConfigError {
    #[error("no state bound for {0:?}")]
    UnboundState(PlayerStateKind),
}

/// One behavior implementation. All hooks default to no-ops so reaction
/// states only override what they need.
pub trait State: Send {
    fn enter(&mut self, _sim: &CharacterSim, _animator: &mut dyn Animator) {}

    fn exit(&mut self, _sim: &CharacterSim, _animator: &mut dyn Animator) {}

    /// Owner-only, once per rendered frame. Returns the transition the
    /// state wants, if any.
    fn handle_frame_input(
        &mut self,
        _sim: &CharacterSim,
        _input: &FrameInput,
    ) -> Option<PlayerStateKind> {
        None
    }

    /// Owner-only, once per simulation tick: turn the latest frame input
    /// into this tick's movement order.
    fn build_intent(&mut self, sim: &CharacterSim, _input: &FrameInput, _dt: f32) -> MoveIntent {
        MoveIntent::neutral(sim.orientation)
    }

    /// Both roles, once per simulation tick. The only path through which
    /// simulation state is mutated.
    fn tick_movement(
        &mut self,
        _sim: &mut CharacterSim,
        _world: &dyn CollisionWorld,
        _intent: &MoveIntent,
        _dt: f32,
        _is_authority: bool,
        _is_replay: bool,
    ) -> Option<PlayerStateKind> {
        None
    }
}

/// Binds one implementation per [`PlayerStateKind`]; building fails if any
/// slot is left empty.
pub struct StateMachineBuilder {
    slots: [Option<Box<dyn State>>; PlayerStateKind::COUNT],
}

impl Default for StateMachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachineBuilder {
    pub fn new() -> Self {
        StateMachineBuilder {
            slots: std::array::from_fn(|_| None),
        }
    }

    pub fn bind(mut self, kind: PlayerStateKind, state: Box<dyn State>) -> Self {
        self.slots[kind.index()] = Some(state);
        self
    }

    pub fn build(mut self) -> Result<StateMachine, StateConfigError> {
        let mut states = Vec::with_capacity(PlayerStateKind::COUNT);
        for kind in PlayerStateKind::all() {
            match self.slots[kind.index()].take() {
                Some(state) => states.push(state),
                None => return Err(StateConfigError::UnboundState(kind)),
            }
        }
        Ok(StateMachine {
            states,
            active: PlayerStateKind::Movement,
        })
    }
}

/// Owns all state instances for the lifetime of the character and forwards
/// frame and tick dispatch to the active one.
pub struct StateMachine {
    states: Vec<Box<dyn State>>,
    active: PlayerStateKind,
}

impl StateMachine {
    /// Machine with the full default behavior set bound.
    pub fn standard() -> Result<StateMachine, StateConfigError> {
        StateMachineBuilder::new()
            .bind(
                PlayerStateKind::Movement,
                Box::new(MovementState::walking()),
            )
            .bind(PlayerStateKind::Running, Box::new(MovementState::running()))
            .bind(PlayerStateKind::Attack, Box::new(AttackState::new()))
            .bind(PlayerStateKind::Dodge, Box::new(DodgeState::new()))
            .bind(PlayerStateKind::Block, Box::new(BlockState::new()))
            .bind(PlayerStateKind::Death, Box::new(DeathState))
            .bind(PlayerStateKind::Impact, Box::new(ImpactState))
            .bind(PlayerStateKind::BlockHit, Box::new(BlockHitState))
            .build()
    }

    pub fn active(&self) -> PlayerStateKind {
        self.active
    }

    /// Sets the starting state and runs its enter hook. No exit is invoked
    /// because no previous state exists. Call once before any dispatch.
    pub fn initialize(
        &mut self,
        kind: PlayerStateKind,
        sim: &CharacterSim,
        animator: &mut dyn Animator,
    ) {
        self.active = kind;
        self.states[kind.index()].enter(sim, animator);
    }

    /// Ordered transition: exit the current state fully, then enter the new
    /// one. Re-entering the active state is a no-op, and nothing leaves
    /// Death.
    pub fn change_state(
        &mut self,
        kind: PlayerStateKind,
        sim: &CharacterSim,
        animator: &mut dyn Animator,
    ) {
        if kind == self.active {
            return;
        }
        if self.active == PlayerStateKind::Death {
            debug!("ignoring transition to {:?}: character is dead", kind);
            return;
        }
        self.states[self.active.index()].exit(sim, animator);
        self.active = kind;
        self.states[kind.index()].enter(sim, animator);
    }

    /// Owner-only per-frame dispatch; applies any transition the active
    /// state requests.
    pub fn handle_frame_input(
        &mut self,
        sim: &CharacterSim,
        input: &FrameInput,
        animator: &mut dyn Animator,
    ) {
        if let Some(next) = self.states[self.active.index()].handle_frame_input(sim, input) {
            self.change_state(next, sim, animator);
        }
    }

    /// Owner-only per-tick intent production.
    pub fn build_intent(&mut self, sim: &CharacterSim, input: &FrameInput, dt: f32) -> MoveIntent {
        self.states[self.active.index()].build_intent(sim, input, dt)
    }

    /// Per-tick movement dispatch for both roles; applies any completion
    /// transition the active state requests.
    #[allow(clippy::too_many_arguments)]
    pub fn dispatch_tick_movement(
        &mut self,
        sim: &mut CharacterSim,
        world: &dyn CollisionWorld,
        intent: &MoveIntent,
        dt: f32,
        is_authority: bool,
        is_replay: bool,
        animator: &mut dyn Animator,
    ) {
        if let Some(next) = self.states[self.active.index()].tick_movement(
            sim,
            world,
            intent,
            dt,
            is_authority,
            is_replay,
        ) {
            self.change_state(next, sim, animator);
        }
    }
}
