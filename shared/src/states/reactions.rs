use crate::animation::Animator;
use crate::character::CharacterSim;
use crate::states::State;

/// Staggered by a hit while not blocking. Non-interactive: no intents are
/// produced and the movement hook does nothing, so the character holds
/// still until the external reaction-complete signal arrives.
pub struct ImpactState;

impl State for ImpactState {
    fn enter(&mut self, _sim: &CharacterSim, animator: &mut dyn Animator) {
        animator.crossfade("impact");
    }
}

/// Hit absorbed by a raised guard. Same shape as Impact with its own clip.
pub struct BlockHitState;

impl State for BlockHitState {
    fn enter(&mut self, _sim: &CharacterSim, animator: &mut dyn Animator) {
        animator.crossfade("block_hit");
    }
}

/// Terminal. Every hook is a no-op and the machine refuses to leave this
/// state.
pub struct DeathState;

impl State for DeathState {
    fn enter(&mut self, _sim: &CharacterSim, animator: &mut dyn Animator) {
        animator.crossfade("death");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::testing::RecordingAnimator;
    use crate::character::{CharacterSim, CharacterTuning};
    use crate::collision::OpenWorld;
    use crate::math::{Quat, Vec3};
    use crate::{FrameInput, MoveIntent, TICK_DELTA};

    fn sim() -> CharacterSim {
        CharacterSim::new(CharacterTuning::default())
    }

    #[test]
    fn test_impact_ignores_movement() {
        let mut sim = sim();
        let mut state = ImpactState;
        let world = OpenWorld;
        let intent = MoveIntent {
            movement: Vec3::new(0.0, 0.0, 5.0),
            facing: Quat::IDENTITY,
            is_running: false,
        };

        let next = state.tick_movement(&mut sim, &world, &intent, TICK_DELTA, false, false);

        assert_eq!(next, None);
        assert_eq!(sim.position, Vec3::ZERO);
    }

    #[test]
    fn test_reaction_states_suppress_intent_production() {
        let mut sim = sim();
        sim.orientation = Quat::look_rotation(Vec3::new(1.0, 0.0, 0.0));
        let input = FrameInput {
            movement_axis: (0.0, 1.0),
            run: true,
            ..FrameInput::default()
        };

        let impact = ImpactState.build_intent(&sim, &input, TICK_DELTA);
        assert_eq!(impact.movement, Vec3::ZERO);
        assert_eq!(impact.facing, sim.orientation);

        let block_hit = BlockHitState.build_intent(&sim, &input, TICK_DELTA);
        assert_eq!(block_hit.movement, Vec3::ZERO);
    }

    #[test]
    fn test_reaction_states_never_request_transitions() {
        let input = FrameInput {
            attack: true,
            dodge: true,
            ..FrameInput::default()
        };
        assert_eq!(ImpactState.handle_frame_input(&sim(), &input), None);
        assert_eq!(BlockHitState.handle_frame_input(&sim(), &input), None);
        assert_eq!(DeathState.handle_frame_input(&sim(), &input), None);
    }

    #[test]
    fn test_clips_on_entry() {
        let sim = sim();
        let mut animator = RecordingAnimator::default();
        ImpactState.enter(&sim, &mut animator);
        BlockHitState.enter(&sim, &mut animator);
        DeathState.enter(&sim, &mut animator);
        assert_eq!(animator.clips, ["impact", "block_hit", "death"]);
    }
}
