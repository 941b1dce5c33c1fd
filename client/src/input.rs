//! Frame-cadence input sources with press-edge detection.

use shared::FrameInput;

/// Raw device sample for one rendered frame. All buttons report held
/// state; edge detection happens in [`InputTracker`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawInput {
    pub movement_axis: (f32, f32),
    pub run_held: bool,
    pub attack_held: bool,
    pub dodge_held: bool,
    pub block_held: bool,
}

/// The input collaborator. Polled once per rendered frame on a faster
/// cadence than the simulation tick; never touches simulation state.
pub trait InputSource: Send {
    fn poll(&mut self) -> RawInput;
}

/// Deterministic bot input used by the headless client binary: a slowly
/// rotating movement direction with periodic run, attack, block and dodge
/// phases.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    frame: u64,
}

impl ScriptedInput {
    pub fn new() -> Self {
        ScriptedInput { frame: 0 }
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> RawInput {
        let t = self.frame as f32;
        self.frame += 1;

        RawInput {
            movement_axis: ((t * 0.01).sin(), (t * 0.01).cos()),
            run_held: (self.frame / 300) % 2 == 1,
            attack_held: self.frame % 500 < 5,
            dodge_held: self.frame % 777 < 5,
            block_held: self.frame % 400 >= 340,
        }
    }
}

/// Converts held-button samples into [`FrameInput`] trigger semantics:
/// attack and dodge fire on the press edge only, run and block stay level.
#[derive(Debug, Default)]
pub struct InputTracker {
    prev_attack: bool,
    prev_dodge: bool,
}

impl InputTracker {
    pub fn new() -> Self {
        InputTracker::default()
    }

    pub fn update(&mut self, raw: RawInput) -> FrameInput {
        let input = FrameInput {
            movement_axis: raw.movement_axis,
            run: raw.run_held,
            attack: raw.attack_held && !self.prev_attack,
            dodge: raw.dodge_held && !self.prev_dodge,
            block: raw.block_held,
        };

        self.prev_attack = raw.attack_held;
        self.prev_dodge = raw.dodge_held;

        input
    }
}
