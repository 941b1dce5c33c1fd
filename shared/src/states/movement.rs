use crate::animation::Animator;
use crate::character::CharacterSim;
use crate::collision::CollisionWorld;
use crate::math::{damp, Quat, Vec3};
use crate::states::{PlayerStateKind, State};
use crate::{FrameInput, MoveIntent, DRIVE_EPSILON};

/// Ground locomotion. One implementation backs both the Movement and
/// Running kinds; the bound role only decides which run-flag edge leaves
/// the state.
pub struct MovementState {
    running: bool,
}

impl MovementState {
    pub fn walking() -> Self {
        MovementState { running: false }
    }

    pub fn running() -> Self {
        MovementState { running: true }
    }
}

/// Maps the 2D input axis onto the ground plane, scales it by `speed` and
/// smooths the facing toward the movement direction at the tuned turn rate.
pub(super) fn planar_intent(
    sim: &CharacterSim,
    axis: (f32, f32),
    speed: f32,
    is_running: bool,
    dt: f32,
) -> MoveIntent {
    let movement = Vec3::new(axis.0, 0.0, axis.1).scale(speed);
    let facing = if movement == Vec3::ZERO {
        sim.orientation
    } else {
        sim.orientation
            .slerp(&Quat::look_rotation(movement), dt * sim.tuning.turn_speed)
    };
    MoveIntent {
        movement,
        facing,
        is_running,
    }
}

/// Smooths the overall speed drive toward the locomotion intensity for this
/// intent, snaps it inside the dead-zone, then runs the shared move
/// application.
pub(super) fn drive_and_move(
    sim: &mut CharacterSim,
    world: &dyn CollisionWorld,
    intent: &MoveIntent,
    dt: f32,
) {
    let target = if intent.movement == Vec3::ZERO {
        0.0
    } else if intent.is_running {
        1.0
    } else {
        0.5
    };
    sim.drives.speed = damp(sim.drives.speed, target, sim.tuning.speed_damp_time, dt);
    if sim.drives.speed.abs() < DRIVE_EPSILON {
        sim.drives.speed = 0.0;
    }
    sim.apply_move(intent, dt, world);
}

impl State for MovementState {
    fn enter(&mut self, _sim: &CharacterSim, animator: &mut dyn Animator) {
        animator.crossfade("movement_blend_tree");
    }

    fn handle_frame_input(
        &mut self,
        _sim: &CharacterSim,
        input: &FrameInput,
    ) -> Option<PlayerStateKind> {
        if input.attack {
            return Some(PlayerStateKind::Attack);
        }
        if input.dodge {
            return Some(PlayerStateKind::Dodge);
        }
        if input.block {
            return Some(PlayerStateKind::Block);
        }
        if input.run != self.running {
            return Some(if input.run {
                PlayerStateKind::Running
            } else {
                PlayerStateKind::Movement
            });
        }
        None
    }

    fn build_intent(&mut self, sim: &CharacterSim, input: &FrameInput, dt: f32) -> MoveIntent {
        let speed = if input.run {
            sim.tuning.running_speed
        } else {
            sim.tuning.walk_speed
        };
        planar_intent(sim, input.movement_axis, speed, input.run, dt)
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
    use crate::{RUNNING_SPEED, TICK_DELTA, WALK_SPEED};
    use assert_approx_eq::assert_approx_eq;

    fn sim() -> CharacterSim {
        CharacterSim::new(CharacterTuning::default())
    }

    #[test]
    fn test_enter_starts_locomotion_blend() {
        let mut animator = RecordingAnimator::default();
        MovementState::walking().enter(&sim(), &mut animator);
        assert_eq!(animator.clips, ["movement_blend_tree"]);
    }

    #[test]
    fn test_intent_scales_with_run_flag() {
        let sim = sim();
        let mut state = MovementState::walking();

        let walk = state.build_intent(
            &sim,
            &FrameInput {
                movement_axis: (0.0, 1.0),
                ..FrameInput::default()
            },
            TICK_DELTA,
        );
        assert_approx_eq!(walk.movement.z, WALK_SPEED);
        assert!(!walk.is_running);

        let run = state.build_intent(
            &sim,
            &FrameInput {
                movement_axis: (0.0, 1.0),
                run: true,
                ..FrameInput::default()
            },
            TICK_DELTA,
        );
        assert_approx_eq!(run.movement.z, RUNNING_SPEED);
        assert!(run.is_running);
    }

    #[test]
    fn test_facing_turns_toward_movement() {
        let sim = sim();
        let mut state = MovementState::walking();
        let input = FrameInput {
            movement_axis: (1.0, 0.0),
            ..FrameInput::default()
        };

        let intent = state.build_intent(&sim, &input, TICK_DELTA);

        let goal = Quat::look_rotation(Vec3::new(1.0, 0.0, 0.0));
        let before = sim.orientation.dot(&goal).abs();
        let after = intent.facing.dot(&goal).abs();
        assert!(after > before, "facing should move toward the goal");
        assert!(after < 0.9999, "turn rate limits a single tick");
    }

    #[test]
    fn test_idle_intent_keeps_facing() {
        let mut sim = sim();
        sim.orientation = Quat::from_axis_angle(Vec3::UNIT_Y, 0.8);
        let mut state = MovementState::walking();

        let intent = state.build_intent(&sim, &FrameInput::default(), TICK_DELTA);

        assert_eq!(intent.movement, Vec3::ZERO);
        assert_eq!(intent.facing, sim.orientation);
    }

    #[test]
    fn test_attack_trigger_requests_attack() {
        let mut state = MovementState::walking();
        let next = state.handle_frame_input(
            &sim(),
            &FrameInput {
                attack: true,
                ..FrameInput::default()
            },
        );
        assert_eq!(next, Some(PlayerStateKind::Attack));
    }

    #[test]
    fn test_run_flag_toggles_between_kinds() {
        let mut walking = MovementState::walking();
        assert_eq!(
            walking.handle_frame_input(
                &sim(),
                &FrameInput {
                    run: true,
                    ..FrameInput::default()
                }
            ),
            Some(PlayerStateKind::Running)
        );

        let mut running = MovementState::running();
        assert_eq!(
            running.handle_frame_input(&sim(), &FrameInput::default()),
            Some(PlayerStateKind::Movement)
        );
        assert_eq!(
            running.handle_frame_input(
                &sim(),
                &FrameInput {
                    run: true,
                    ..FrameInput::default()
                }
            ),
            None
        );
    }

    #[test]
    fn test_speed_drive_decays_when_idle() {
        let mut sim = sim();
        sim.drives.speed = 1.0;
        let mut state = MovementState::walking();
        let world = OpenWorld;
        let neutral = sim.neutral_intent();

        for _ in 0..400 {
            state.tick_movement(&mut sim, &world, &neutral, TICK_DELTA, false, false);
        }

        assert_eq!(sim.drives.speed, 0.0);
    }
}
