//! Speculative simulation for the locally controlled character.
//!
//! Every simulation tick runs reconcile-then-simulate: any pending
//! authoritative snapshot is applied first and the unacknowledged intents
//! buffered after it are replayed in tick order, then the new tick's intent
//! is built, applied locally and buffered. Misprediction is repaired
//! without ever discarding unacknowledged input.

use log::{debug, warn};
use shared::character::Character;
use shared::collision::CollisionWorld;
use shared::{MoveIntent, ReconcileSnapshot, REPLAY_WINDOW_TICKS, TICK_DELTA};
use std::collections::VecDeque;

/// Tick-keyed history of intents the authority has not acknowledged yet.
/// Bounded: when the window is full the oldest entry is dropped with a
/// warning, never silently.
pub struct IntentBuffer {
    buffer: VecDeque<(u64, MoveIntent)>,
    max_size: usize,
}

impl IntentBuffer {
    pub fn new(max_size: usize) -> Self {
        IntentBuffer {
            buffer: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    pub fn push(&mut self, tick: u64, intent: MoveIntent) {
        self.buffer.push_back((tick, intent));
        if self.buffer.len() > self.max_size {
            if let Some((dropped, _)) = self.buffer.pop_front() {
                warn!(
                    "replay window full, dropping unacknowledged intent for tick {}",
                    dropped
                );
            }
        }
    }

    /// Drops every intent the snapshot for `tick` already covers.
    pub fn prune_through(&mut self, tick: u64) {
        self.buffer.retain(|(t, _)| *t > tick);
    }

    /// Buffered intents in strictly increasing tick order.
    pub fn iter(&self) -> impl Iterator<Item = &(u64, MoveIntent)> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// The predicting role's movement loop: owns the local character, its tick
/// counter and the replay buffer.
pub struct Predictor {
    character: Character,
    buffer: IntentBuffer,
    tick: u64,
    pending_snapshot: Option<(u64, ReconcileSnapshot)>,
    last_applied_tick: Option<u64>,
}

impl Predictor {
    pub fn new(character: Character) -> Self {
        Predictor {
            character,
            buffer: IntentBuffer::new(REPLAY_WINDOW_TICKS),
            tick: 0,
            pending_snapshot: None,
            last_applied_tick: None,
        }
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn character_mut(&mut self) -> &mut Character {
        &mut self.character
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn buffered_intents(&self) -> usize {
        self.buffer.len()
    }

    /// Stores the newest authoritative snapshot for the next tick's
    /// reconcile pass. Stale and superseded snapshots are ignored.
    pub fn receive_snapshot(&mut self, tick: u64, snapshot: ReconcileSnapshot) {
        if self.last_applied_tick.map_or(false, |t| tick <= t) {
            debug!("ignoring stale snapshot for tick {}", tick);
            return;
        }
        match self.pending_snapshot {
            Some((pending, _)) if tick <= pending => {}
            _ => self.pending_snapshot = Some((tick, snapshot)),
        }
    }

    /// One simulation tick of the predicting role. Returns the tick number
    /// and intent to hand to the transport.
    pub fn simulation_tick(&mut self, world: &dyn CollisionWorld) -> (u64, MoveIntent) {
        self.reconcile(world);

        self.tick += 1;
        let intent = self.character.predict_tick(world, TICK_DELTA);
        self.buffer.push(self.tick, intent);
        (self.tick, intent)
    }

    /// Applies the pending snapshot, then fast-forwards through every
    /// buffered intent issued after it, in strictly increasing tick order.
    fn reconcile(&mut self, world: &dyn CollisionWorld) {
        let Some((snapshot_tick, snapshot)) = self.pending_snapshot.take() else {
            return;
        };

        let before = self.character.sim.position;
        self.character.sim.restore(&snapshot);
        self.buffer.prune_through(snapshot_tick);

        let mut replayed = 0;
        for (_, intent) in self.buffer.iter() {
            self.character.replay_tick(intent, world, TICK_DELTA);
            replayed += 1;
        }

        let correction = before.distance(&self.character.sim.position);
        if correction > 0.0001 {
            debug!(
                "reconciled at tick {}: replayed {} intents, corrected {:.4}",
                snapshot_tick, replayed, correction
            );
        }
        self.last_applied_tick = Some(snapshot_tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::animation::NullAnimator;
    use shared::character::{CharacterTuning, HealthEvent};
    use shared::collision::OpenWorld;
    use shared::math::{Quat, Vec3};
    use shared::states::PlayerStateKind;
    use shared::FrameInput;
    use assert_approx_eq::assert_approx_eq;

    fn character() -> Character {
        Character::new(CharacterTuning::default(), Box::new(NullAnimator)).unwrap()
    }

    fn forward_input() -> FrameInput {
        FrameInput {
            movement_axis: (0.0, 1.0),
            ..FrameInput::default()
        }
    }

    #[test]
    fn test_buffer_keeps_tick_order() {
        let mut buffer = IntentBuffer::new(8);
        for tick in 1..=5 {
            buffer.push(tick, MoveIntent::neutral(Quat::IDENTITY));
        }

        buffer.prune_through(2);

        let ticks: Vec<u64> = buffer.iter().map(|(t, _)| *t).collect();
        assert_eq!(ticks, [3, 4, 5]);
    }

    #[test]
    fn test_buffer_is_bounded() {
        let mut buffer = IntentBuffer::new(4);
        for tick in 1..=10 {
            buffer.push(tick, MoveIntent::neutral(Quat::IDENTITY));
        }

        assert_eq!(buffer.len(), 4);
        let ticks: Vec<u64> = buffer.iter().map(|(t, _)| *t).collect();
        assert_eq!(ticks, [7, 8, 9, 10]);
    }

    #[test]
    fn test_prediction_buffers_and_advances() {
        let mut predictor = Predictor::new(character());
        let world = OpenWorld;
        predictor.character_mut().handle_frame_input(forward_input());

        let (tick, intent) = predictor.simulation_tick(&world);

        assert_eq!(tick, 1);
        assert_eq!(intent.movement, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(predictor.buffered_intents(), 1);
        assert!(predictor.character().sim.position.z > 0.0);
    }

    #[test]
    fn test_reconciliation_replays_to_authority_state() {
        let world = OpenWorld;

        // Predicting role simulates 5 ticks speculatively.
        let mut predictor = Predictor::new(character());
        predictor.character_mut().handle_frame_input(forward_input());
        let mut sent = Vec::new();
        for _ in 0..5 {
            sent.push(predictor.simulation_tick(&world));
        }

        // The authority applies the same intents independently.
        let mut authority = character();
        let mut snapshots = Vec::new();
        for (tick, intent) in &sent {
            let snapshot = authority.authority_tick(Some(intent), &world, TICK_DELTA);
            snapshots.push((*tick, snapshot));
        }

        // Inject drift as if tick 2 had been mispredicted, then reconcile
        // against the authority's tick-2 snapshot.
        predictor.character_mut().sim.position.x += 0.35;
        let (tick, snapshot) = snapshots[1];
        predictor.receive_snapshot(tick, snapshot);

        predictor.character_mut().handle_frame_input(forward_input());
        let (tick6, intent6) = predictor.simulation_tick(&world);
        let auth6 = authority.authority_tick(Some(&intent6), &world, TICK_DELTA);

        assert_eq!(tick6, 6);
        assert_eq!(predictor.character().sim.position, auth6.position);
        assert_eq!(predictor.character().sim.orientation, auth6.orientation);
    }

    #[test]
    fn test_stale_snapshot_is_ignored() {
        let world = OpenWorld;
        let mut predictor = Predictor::new(character());
        predictor.character_mut().handle_frame_input(forward_input());

        for _ in 0..3 {
            predictor.simulation_tick(&world);
        }

        let fresh = ReconcileSnapshot {
            position: Vec3::new(0.0, 0.0, 0.1),
            orientation: Quat::IDENTITY,
        };
        predictor.receive_snapshot(2, fresh);
        predictor.simulation_tick(&world);

        // A snapshot for an older tick must not win over the applied one.
        let stale = ReconcileSnapshot {
            position: Vec3::new(100.0, 0.0, 100.0),
            orientation: Quat::IDENTITY,
        };
        predictor.receive_snapshot(1, stale);
        predictor.simulation_tick(&world);

        assert!(predictor.character().sim.position.x < 1.0);
    }

    #[test]
    fn test_acknowledged_intents_are_pruned() {
        let world = OpenWorld;
        let mut predictor = Predictor::new(character());
        predictor.character_mut().handle_frame_input(forward_input());

        for _ in 0..5 {
            predictor.simulation_tick(&world);
        }
        assert_eq!(predictor.buffered_intents(), 5);

        let snapshot = ReconcileSnapshot {
            position: Vec3::new(0.0, 0.0, 0.3),
            orientation: Quat::IDENTITY,
        };
        predictor.receive_snapshot(3, snapshot);
        predictor.simulation_tick(&world);

        // Ticks 1..=3 acknowledged, 4..=5 replayed, 6 freshly buffered.
        assert_eq!(predictor.buffered_intents(), 3);
    }

    #[test]
    fn test_dead_character_stops_moving_but_keeps_protocol() {
        let world = OpenWorld;
        let mut predictor = Predictor::new(character());
        predictor.character_mut().handle_frame_input(forward_input());
        predictor.simulation_tick(&world);

        predictor
            .character_mut()
            .handle_health_event(HealthEvent::Died);
        let frozen = predictor.character().sim.position;

        let (tick, intent) = predictor.simulation_tick(&world);
        assert_eq!(tick, 2);
        assert_eq!(intent.movement, Vec3::ZERO);
        assert_eq!(predictor.character().sim.position, frozen);
        assert_eq!(
            predictor.character().active_state(),
            PlayerStateKind::Death
        );
    }

    #[test]
    fn test_ten_tick_walk_lands_on_one_unit() {
        let world = OpenWorld;
        let mut predictor = Predictor::new(character());
        predictor.character_mut().handle_frame_input(forward_input());

        for _ in 0..10 {
            predictor.simulation_tick(&world);
        }

        assert_approx_eq!(predictor.character().sim.position.z, 1.0, 1e-4);
    }
}
