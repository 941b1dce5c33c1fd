use crate::math::Vec3;
use crate::ARENA_EXTENT;

/// Collision-aware move primitive. The movement loop never writes positions
/// directly; every translation goes through `resolve`, which returns the
/// post-move position. Both peers must use the same implementation or the
/// simulations diverge.
pub trait CollisionWorld: Send + Sync {
    fn resolve(&self, from: Vec3, displacement: Vec3) -> Vec3;
}

/// Unobstructed world; moves are applied verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenWorld;

impl CollisionWorld for OpenWorld {
    fn resolve(&self, from: Vec3, displacement: Vec3) -> Vec3 {
        from.add(&displacement)
    }
}

/// Square arena centered on the origin. Moves are clamped to the arena
/// extent on both ground axes; height is passed through.
#[derive(Debug, Clone, Copy)]
pub struct ArenaBounds {
    pub extent: f32,
}

impl Default for ArenaBounds {
    fn default() -> Self {
        ArenaBounds {
            extent: ARENA_EXTENT,
        }
    }
}

impl CollisionWorld for ArenaBounds {
    fn resolve(&self, from: Vec3, displacement: Vec3) -> Vec3 {
        let target = from.add(&displacement);
        Vec3 {
            x: target.x.clamp(-self.extent, self.extent),
            y: target.y,
            z: target.z.clamp(-self.extent, self.extent),
        }
    }
}
