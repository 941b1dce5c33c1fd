use crate::animation::Animator;
use crate::collision::CollisionWorld;
use crate::math::{damp, Quat, Vec3};
use crate::states::{PlayerStateKind, StateConfigError, StateMachine};
use crate::{
    FrameInput, MoveIntent, ReconcileSnapshot, BLOCKING_MOVE_SPEED, DODGE_SPEED, DRIVE_EPSILON,
    RUNNING_SPEED, SPEED_DAMP_TIME, TURN_SPEED, WALK_SPEED,
};
use serde::{Deserialize, Serialize};

/// Per-entity movement tuning. Defaults mirror the reference character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharacterTuning {
    pub walk_speed: f32,
    pub running_speed: f32,
    pub dodge_speed: f32,
    pub blocking_move_speed: f32,
    pub turn_speed: f32,
    /// Smoothing time for the animation drive values.
    pub speed_damp_time: f32,
}

impl Default for CharacterTuning {
    fn default() -> Self {
        CharacterTuning {
            walk_speed: WALK_SPEED,
            running_speed: RUNNING_SPEED,
            dodge_speed: DODGE_SPEED,
            blocking_move_speed: BLOCKING_MOVE_SPEED,
            turn_speed: TURN_SPEED,
            speed_damp_time: SPEED_DAMP_TIME,
        }
    }
}

/// Smoothed scalar values fed to the animation collaborator. Part of the
/// simulation state so replay reproduces them deterministically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveValues {
    pub lateral: f32,
    pub forward: f32,
    pub speed: f32,
}

/// The simulated transform of one character. Mutated only inside tick
/// processing; states produce intents, they never write here directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSim {
    pub position: Vec3,
    pub orientation: Quat,
    pub drives: DriveValues,
    pub is_dead: bool,
    pub tuning: CharacterTuning,
}

impl CharacterSim {
    pub fn new(tuning: CharacterTuning) -> Self {
        CharacterSim {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            drives: DriveValues::default(),
            is_dead: false,
            tuning,
        }
    }

    /// Applies one movement intent. Dead characters freeze: every intent is
    /// ignored on both roles. A zero movement never translates; it only
    /// decays the drive values, snapping them to zero inside the dead-zone
    /// so idle characters do not creep. Orientation comes straight from the
    /// intent; the producing state already smoothed it.
    pub fn apply_move(&mut self, intent: &MoveIntent, dt: f32, world: &dyn CollisionWorld) {
        if self.is_dead {
            return;
        }

        let lateral_target = self.orientation.right().dot(&intent.movement);
        let forward_target = self.orientation.forward().dot(&intent.movement);
        self.drives.lateral = damp(
            self.drives.lateral,
            lateral_target,
            self.tuning.speed_damp_time,
            dt,
        );
        self.drives.forward = damp(
            self.drives.forward,
            forward_target,
            self.tuning.speed_damp_time,
            dt,
        );

        if intent.movement == Vec3::ZERO {
            if self.drives.lateral.abs() < DRIVE_EPSILON {
                self.drives.lateral = 0.0;
            }
            if self.drives.forward.abs() < DRIVE_EPSILON {
                self.drives.forward = 0.0;
            }
        } else {
            self.position = world.resolve(self.position, intent.movement.scale(dt));
        }

        self.orientation = intent.facing;
    }

    /// Post-move reconciliation record for the current tick.
    pub fn snapshot(&self) -> ReconcileSnapshot {
        ReconcileSnapshot {
            position: self.position,
            orientation: self.orientation,
        }
    }

    /// Overwrites the simulated transform from an authoritative snapshot.
    pub fn restore(&mut self, snapshot: &ReconcileSnapshot) {
        self.position = snapshot.position;
        self.orientation = snapshot.orientation;
    }

    /// Substitute for a missing intent: no movement, keep the current
    /// facing so orientation does not snap.
    pub fn neutral_intent(&self) -> MoveIntent {
        MoveIntent::neutral(self.orientation)
    }
}

/// Signals from the health collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HealthEvent {
    Damaged { amount: f32, attacker_position: Vec3 },
    Died,
}

/// One character instance: simulation state plus the behavior state machine
/// and the animation collaborator. Used as-is by both peers; the predicting
/// and authoritative roles differ only in which tick entry point they call.
pub struct Character {
    pub sim: CharacterSim,
    machine: StateMachine,
    animator: Box<dyn Animator>,
    last_input: FrameInput,
    last_hit_from: Option<Vec3>,
}

impl Character {
    pub fn new(
        tuning: CharacterTuning,
        mut animator: Box<dyn Animator>,
    ) -> Result<Self, StateConfigError> {
        let sim = CharacterSim::new(tuning);
        let mut machine = StateMachine::standard()?;
        machine.initialize(PlayerStateKind::Movement, &sim, animator.as_mut());
        Ok(Character {
            sim,
            machine,
            animator,
            last_input: FrameInput::default(),
            last_hit_from: None,
        })
    }

    pub fn active_state(&self) -> PlayerStateKind {
        self.machine.active()
    }

    /// Current animation drive values for the animation collaborator.
    pub fn drives(&self) -> DriveValues {
        self.sim.drives
    }

    /// Position of the attacker that last damaged this character, if any.
    pub fn last_hit_from(&self) -> Option<Vec3> {
        self.last_hit_from
    }

    /// Owner-only, per rendered frame. Stores the input for the next tick's
    /// intent and lets the active state react to triggers promptly instead
    /// of waiting for the tick.
    pub fn handle_frame_input(&mut self, input: FrameInput) {
        self.last_input = input;
        self.machine
            .handle_frame_input(&self.sim, &input, self.animator.as_mut());
    }

    /// Owner per-tick speculative execution: build this tick's intent from
    /// the latest input, apply it locally, and return it for buffering and
    /// transmission.
    pub fn predict_tick(&mut self, world: &dyn CollisionWorld, dt: f32) -> MoveIntent {
        let intent = self.machine.build_intent(&self.sim, &self.last_input, dt);
        self.machine.dispatch_tick_movement(
            &mut self.sim,
            world,
            &intent,
            dt,
            false,
            false,
            self.animator.as_mut(),
        );
        intent
    }

    /// Re-execution of a buffered intent after a reconciliation restore.
    /// State-internal timers do not advance on replayed ticks.
    pub fn replay_tick(&mut self, intent: &MoveIntent, world: &dyn CollisionWorld, dt: f32) {
        self.machine.dispatch_tick_movement(
            &mut self.sim,
            world,
            intent,
            dt,
            false,
            true,
            self.animator.as_mut(),
        );
    }

    /// Authoritative per-tick execution. `None` means no intent arrived for
    /// this tick; a neutral intent is substituted so simulation never
    /// stalls. Returns the post-move state, the only state ever treated as
    /// ground truth.
    pub fn authority_tick(
        &mut self,
        intent: Option<&MoveIntent>,
        world: &dyn CollisionWorld,
        dt: f32,
    ) -> ReconcileSnapshot {
        let intent = match intent {
            Some(intent) => *intent,
            None => self.sim.neutral_intent(),
        };
        self.machine.dispatch_tick_movement(
            &mut self.sim,
            world,
            &intent,
            dt,
            true,
            false,
            self.animator.as_mut(),
        );
        self.sim.snapshot()
    }

    /// Damage routing from the health collaborator: blocking input selects
    /// BlockHit over Impact. Death is terminal and overrides any
    /// in-progress transition.
    pub fn handle_health_event(&mut self, event: HealthEvent) {
        match event {
            HealthEvent::Damaged {
                attacker_position, ..
            } => {
                self.last_hit_from = Some(attacker_position);
                let next = if self.last_input.block {
                    PlayerStateKind::BlockHit
                } else {
                    PlayerStateKind::Impact
                };
                self.machine
                    .change_state(next, &self.sim, self.animator.as_mut());
            }
            HealthEvent::Died => {
                self.machine
                    .change_state(PlayerStateKind::Death, &self.sim, self.animator.as_mut());
                self.sim.is_dead = true;
            }
        }
    }

    /// External reaction-complete signal; returns a reacting character to
    /// Movement.
    pub fn reaction_complete(&mut self) {
        if self.machine.active().is_reacting() {
            self.machine.change_state(
                PlayerStateKind::Movement,
                &self.sim,
                self.animator.as_mut(),
            );
        }
    }

    /// Out-of-band absolute rotation, applied immediately and bypassing the
    /// intent flow.
    pub fn apply_rotation_override(&mut self, orientation: Quat) {
        self.sim.orientation = orientation;
    }
}
