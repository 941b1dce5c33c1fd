use crate::animation::Animator;
use crate::character::CharacterSim;
use crate::collision::CollisionWorld;
use crate::math::Vec3;
use crate::states::movement::{drive_and_move, planar_intent};
use crate::states::{PlayerStateKind, State};
use crate::{FrameInput, MoveIntent, ATTACK_DURATION, DODGE_DURATION};

/// Swing in progress. Movement is suppressed for the duration, then the
/// state hands control back to Movement. The countdown advances on live
/// ticks only; replayed ticks were already counted once.
pub struct AttackState {
    elapsed: f32,
}

impl AttackState {
    pub fn new() -> Self {
        AttackState { elapsed: 0.0 }
    }
}

impl Default for AttackState {
    fn default() -> Self {
        Self::new()
    }
}

impl State for AttackState {
    fn enter(&mut self, _sim: &CharacterSim, animator: &mut dyn Animator) {
        self.elapsed = 0.0;
        animator.crossfade("attack");
    }

    fn tick_movement(
        &mut self,
        sim: &mut CharacterSim,
        world: &dyn CollisionWorld,
        intent: &MoveIntent,
        dt: f32,
        _is_authority: bool,
        is_replay: bool,
    ) -> Option<PlayerStateKind> {
        sim.apply_move(intent, dt, world);
        if is_replay {
            return None;
        }
        self.elapsed += dt;
        if self.elapsed >= ATTACK_DURATION {
            Some(PlayerStateKind::Movement)
        } else {
            None
        }
    }
}

/// Burst move along the facing captured on entry.
pub struct DodgeState {
    elapsed: f32,
    direction: Vec3,
}

impl DodgeState {
    pub fn new() -> Self {
        DodgeState {
            elapsed: 0.0,
            direction: Vec3::ZERO,
        }
    }
}

impl Default for DodgeState {
    fn default() -> Self {
        Self::new()
    }
}

impl State for DodgeState {
    fn enter(&mut self, sim: &CharacterSim, animator: &mut dyn Animator) {
        self.elapsed = 0.0;
        self.direction = sim.orientation.forward();
        animator.crossfade("dodge");
    }

    fn build_intent(&mut self, sim: &CharacterSim, _input: &FrameInput, _dt: f32) -> MoveIntent {
        MoveIntent {
            movement: self.direction.scale(sim.tuning.dodge_speed),
            facing: sim.orientation,
            is_running: false,
        }
    }

    fn tick_movement(
        &mut self,
        sim: &mut CharacterSim,
        world: &dyn CollisionWorld,
        intent: &MoveIntent,
        dt: f32,
        _is_authority: bool,
        is_replay: bool,
    ) -> Option<PlayerStateKind> {
        sim.apply_move(intent, dt, world);
        if is_replay {
            return None;
        }
        self.elapsed += dt;
        if self.elapsed >= DODGE_DURATION {
            Some(PlayerStateKind::Movement)
        } else {
            None
        }
    }
}

/// Guard raised. Movement continues at the reduced blocking speed until the
/// block hold is released.
pub struct BlockState;

impl BlockState {
    pub fn new() -> Self {
        BlockState
    }
}

impl Default for BlockState {
    fn default() -> Self {
        Self::new()
    }
}

impl State for BlockState {
    fn enter(&mut self, _sim: &CharacterSim, animator: &mut dyn Animator) {
        animator.crossfade("block");
    }

    fn handle_frame_input(
        &mut self,
        _sim: &CharacterSim,
        input: &FrameInput,
    ) -> Option<PlayerStateKind> {
        if !input.block {
            Some(PlayerStateKind::Movement)
        } else {
            None
        }
    }

    fn build_intent(&mut self, sim: &CharacterSim, input: &FrameInput, dt: f32) -> MoveIntent {
        planar_intent(
            sim,
            input.movement_axis,
            sim.tuning.blocking_move_speed,
            false,
            dt,
        )
    }

    fn tick_movement(
        &mut self,
        sim: &mut CharacterSim,
        world: &dyn CollisionWorld,
        intent: &MoveIntent,
        dt: f32,
        _is_authority: bool,
        _is_replay: bool,
    ) -> Option<PlayerStateKind> {
        drive_and_move(sim, world, intent, dt);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::testing::RecordingAnimator;
    use crate::character::CharacterTuning;
    use crate::collision::OpenWorld;
    use crate::math::Quat;
    use crate::{BLOCKING_MOVE_SPEED, TICK_DELTA};
    use assert_approx_eq::assert_approx_eq;

    fn sim() -> CharacterSim {
        CharacterSim::new(CharacterTuning::default())
    }

    #[test]
    fn test_attack_completes_back_to_movement() {
        let mut sim = sim();
        let mut state = AttackState::new();
        let mut animator = RecordingAnimator::default();
        let world = OpenWorld;
        state.enter(&sim, &mut animator);
        assert_eq!(animator.clips, ["attack"]);

        let neutral = sim.neutral_intent();
        let ticks = (ATTACK_DURATION / TICK_DELTA).ceil() as usize + 2;
        let mut next = None;
        for _ in 0..ticks {
            next = state.tick_movement(&mut sim, &world, &neutral, TICK_DELTA, false, false);
            if next.is_some() {
                break;
            }
        }

        assert_eq!(next, Some(PlayerStateKind::Movement));
        assert_eq!(sim.position, Vec3::ZERO);
    }

    #[test]
    fn test_attack_timer_frozen_during_replay() {
        let mut sim = sim();
        let mut state = AttackState::new();
        let mut animator = RecordingAnimator::default();
        let world = OpenWorld;
        state.enter(&sim, &mut animator);

        let neutral = sim.neutral_intent();
        for _ in 0..1000 {
            let next = state.tick_movement(&mut sim, &world, &neutral, TICK_DELTA, false, true);
            assert_eq!(next, None);
        }
    }

    #[test]
    fn test_dodge_moves_along_entry_facing() {
        let mut sim = sim();
        sim.orientation = Quat::look_rotation(Vec3::new(1.0, 0.0, 0.0));
        let mut state = DodgeState::new();
        let mut animator = RecordingAnimator::default();
        let world = OpenWorld;
        state.enter(&sim, &mut animator);

        let intent = state.build_intent(&sim, &FrameInput::default(), TICK_DELTA);
        assert_approx_eq!(intent.movement.x, sim.tuning.dodge_speed, 1e-4);
        assert_approx_eq!(intent.movement.z, 0.0, 1e-4);

        let ticks = (DODGE_DURATION / TICK_DELTA).ceil() as usize + 2;
        let mut next = None;
        for _ in 0..ticks {
            let intent = state.build_intent(&sim, &FrameInput::default(), TICK_DELTA);
            next = state.tick_movement(&mut sim, &world, &intent, TICK_DELTA, false, false);
            if next.is_some() {
                break;
            }
        }

        assert_eq!(next, Some(PlayerStateKind::Movement));
        assert!(sim.position.x > 0.0);
    }

    #[test]
    fn test_block_caps_planar_speed() {
        let sim = sim();
        let mut state = BlockState::new();
        let input = FrameInput {
            movement_axis: (0.0, 1.0),
            run: true,
            block: true,
            ..FrameInput::default()
        };

        let intent = state.build_intent(&sim, &input, TICK_DELTA);

        assert_approx_eq!(intent.movement.z, BLOCKING_MOVE_SPEED);
        assert!(!intent.is_running);
    }

    #[test]
    fn test_block_release_returns_to_movement() {
        let mut state = BlockState::new();

        assert_eq!(
            state.handle_frame_input(
                &sim(),
                &FrameInput {
                    block: true,
                    ..FrameInput::default()
                }
            ),
            None
        );
        assert_eq!(
            state.handle_frame_input(&sim(), &FrameInput::default()),
            Some(PlayerStateKind::Movement)
        );
    }
}
