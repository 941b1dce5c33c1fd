//! Authoritative world state: one character per connected client.

use log::{info, warn};
use shared::animation::NullAnimator;
use shared::character::{Character, CharacterTuning, HealthEvent};
use shared::collision::ArenaBounds;
use shared::math::{Quat, Vec3};
use shared::states::{PlayerStateKind, StateConfigError};
use shared::{MoveIntent, ReconcileSnapshot, TICK_DELTA};
use std::collections::HashMap;

pub struct GameWorld {
    characters: HashMap<u32, Character>,
    world: ArenaBounds,
    tick: u64,
}

impl Default for GameWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl GameWorld {
    pub fn new() -> Self {
        GameWorld {
            characters: HashMap::new(),
            world: ArenaBounds::default(),
            tick: 0,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Starts a new server tick. Called once per tick before the characters
    /// are advanced.
    pub fn advance_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn add_player(&mut self, client_id: u32) -> Result<(), StateConfigError> {
        let character = Character::new(CharacterTuning::default(), Box::new(NullAnimator))?;
        info!("Added player {}", client_id);
        self.characters.insert(client_id, character);
        Ok(())
    }

    pub fn remove_player(&mut self, client_id: &u32) {
        if self.characters.remove(client_id).is_some() {
            info!("Removed player {}", client_id);
        }
    }

    pub fn contains_player(&self, client_id: u32) -> bool {
        self.characters.contains_key(&client_id)
    }

    pub fn character(&self, client_id: u32) -> Option<&Character> {
        self.characters.get(&client_id)
    }

    /// Advances one character by one tick. A missing intent never stalls
    /// simulation; a neutral one is substituted and logged.
    pub fn tick_character(
        &mut self,
        client_id: u32,
        intent: Option<&MoveIntent>,
    ) -> Option<ReconcileSnapshot> {
        let character = self.characters.get_mut(&client_id)?;
        if intent.is_none() {
            warn!(
                "no intent from client {} for server tick {}, substituting neutral",
                client_id, self.tick
            );
        }
        Some(character.authority_tick(intent, &self.world, TICK_DELTA))
    }

    /// Health-collaborator entry point: routes a hit into Impact or
    /// BlockHit on the authoritative state machine.
    pub fn apply_damage(&mut self, client_id: u32, amount: f32, attacker_position: Vec3) {
        if let Some(character) = self.characters.get_mut(&client_id) {
            character.handle_health_event(HealthEvent::Damaged {
                amount,
                attacker_position,
            });
        }
    }

    /// Health-collaborator entry point: terminal death.
    pub fn kill(&mut self, client_id: u32) {
        if let Some(character) = self.characters.get_mut(&client_id) {
            character.handle_health_event(HealthEvent::Died);
        }
    }

    pub fn reaction_complete(&mut self, client_id: u32) {
        if let Some(character) = self.characters.get_mut(&client_id) {
            character.reaction_complete();
        }
    }

    /// Authoritative absolute-rotation override. Applies immediately here;
    /// the caller forwards the same rotation to the owning client.
    pub fn set_rotation(&mut self, client_id: u32, orientation: Quat) -> bool {
        match self.characters.get_mut(&client_id) {
            Some(character) => {
                character.apply_rotation_override(orientation);
                true
            }
            None => false,
        }
    }

    pub fn active_state(&self, client_id: u32) -> Option<PlayerStateKind> {
        self.characters
            .get(&client_id)
            .map(|character| character.active_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn world_with_player() -> GameWorld {
        let mut world = GameWorld::new();
        world.add_player(1).unwrap();
        world
    }

    fn forward_intent() -> MoveIntent {
        MoveIntent {
            movement: Vec3::new(0.0, 0.0, 5.0),
            facing: Quat::IDENTITY,
            is_running: false,
        }
    }

    #[test]
    fn test_advance_tick_increments() {
        let mut world = GameWorld::new();
        assert_eq!(world.tick(), 0);
        assert_eq!(world.advance_tick(), 1);
        assert_eq!(world.tick(), 1);
    }

    #[test]
    fn test_add_and_remove_player() {
        let mut world = world_with_player();
        assert!(world.contains_player(1));

        world.remove_player(&1);
        assert!(!world.contains_player(1));
    }

    #[test]
    fn test_tick_applies_intent() {
        let mut world = world_with_player();
        world.advance_tick();

        let snapshot = world.tick_character(1, Some(&forward_intent())).unwrap();

        assert_approx_eq!(snapshot.position.z, 5.0 * TICK_DELTA);
    }

    #[test]
    fn test_missing_intent_substitutes_neutral() {
        let mut world = world_with_player();
        world.advance_tick();

        let snapshot = world.tick_character(1, None).unwrap();

        assert_eq!(snapshot.position, Vec3::ZERO);
        assert_eq!(snapshot.orientation, Quat::IDENTITY);
    }

    #[test]
    fn test_tick_unknown_player_is_none() {
        let mut world = GameWorld::new();
        assert!(world.tick_character(7, None).is_none());
    }

    #[test]
    fn test_damage_routes_to_impact() {
        let mut world = world_with_player();

        world.apply_damage(1, 12.0, Vec3::new(1.0, 0.0, 0.0));

        assert_eq!(world.active_state(1), Some(PlayerStateKind::Impact));

        world.reaction_complete(1);
        assert_eq!(world.active_state(1), Some(PlayerStateKind::Movement));
    }

    #[test]
    fn test_kill_freezes_character() {
        let mut world = world_with_player();
        world.kill(1);
        world.advance_tick();

        let snapshot = world.tick_character(1, Some(&forward_intent())).unwrap();

        assert_eq!(world.active_state(1), Some(PlayerStateKind::Death));
        assert_eq!(snapshot.position, Vec3::ZERO);
    }

    #[test]
    fn test_rotation_override() {
        let mut world = world_with_player();
        let target = Quat::from_axis_angle(Vec3::UNIT_Y, 1.5);

        assert!(world.set_rotation(1, target));
        assert!(!world.set_rotation(9, target));

        assert_eq!(world.character(1).unwrap().sim.orientation, target);
    }

    #[test]
    fn test_arena_bounds_contain_character() {
        let mut world = world_with_player();
        let sprint = MoveIntent {
            movement: Vec3::new(0.0, 0.0, 10.0),
            facing: Quat::IDENTITY,
            is_running: true,
        };

        // Far longer than it takes to reach the wall.
        for _ in 0..2000 {
            world.advance_tick();
            world.tick_character(1, Some(&sprint));
        }

        let position = world.character(1).unwrap().sim.position;
        assert!(position.z <= shared::ARENA_EXTENT + 1e-3);
    }
}
