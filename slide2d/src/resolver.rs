//! Collision-aware movement: an entity slides along whatever blocks it
//! instead of stopping dead.

use crate::entity::CollisionType;
use crate::error::{ensure_finite, Result};
use crate::math::{self, Line, Rect, Vec2};
use crate::physics::{ensure_point, PhysicsWorld};
use crate::world::EntityId;

/// Which attempt of a move was committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
    Full,
    SlideX,
    SlideY,
}

impl PhysicsWorld {
    /// Move an entity so its position ends up at `target`, sliding if blocked.
    ///
    /// Returns `Ok(false)` when every attempt was blocked; the entity then
    /// stays where it was.
    pub fn move_to(&mut self, id: EntityId, target: Vec2) -> Result<bool> {
        ensure_point(target, "move target")?;
        self.resolve(id, target, true)
    }

    /// Move an entity by a relative offset.
    pub fn move_by(&mut self, id: EntityId, dx: f64, dy: f64) -> Result<bool> {
        ensure_finite(dx, "move delta x")?;
        ensure_finite(dy, "move delta y")?;
        let position = self.entities.require(id)?.position;
        self.resolve(id, position + Vec2::new(dx, dy), true)
    }

    /// Move an entity `distance` units along a compass `angle`.
    pub fn move_in_direction(&mut self, id: EntityId, angle: f64, distance: f64) -> Result<bool> {
        ensure_finite(angle, "move angle")?;
        ensure_finite(distance, "move distance")?;
        let position = self.entities.require(id)?.position;
        self.resolve(id, math::project(position, angle, distance), true)
    }

    /// Move an entity along its current facing angle.
    pub fn move_forward(&mut self, id: EntityId, distance: f64) -> Result<bool> {
        let angle = self.entities.require(id)?.angle;
        self.move_in_direction(id, angle, distance)
    }

    /// Move the entity's collision-box center up to `distance` units towards
    /// `target`, stopping on it rather than overshooting.
    pub fn move_towards(&mut self, id: EntityId, target: Vec2, distance: f64) -> Result<bool> {
        ensure_point(target, "move target")?;
        ensure_finite(distance, "move distance")?;
        let entity = self.entities.require(id)?;
        let center = entity.collision_box_center();
        let step = distance.min(center.distance(target));
        let delta = math::project_towards(center, target, step) - center;
        let position = entity.position;
        self.resolve(id, position + delta, true)
    }

    /// Relative move used by forces: never turns the entity.
    pub(crate) fn displace(&mut self, id: EntityId, delta: Vec2) -> Result<bool> {
        let position = self.entities.require(id)?.position;
        self.resolve(id, position + delta, false)
    }

    fn resolve(&mut self, id: EntityId, target: Vec2, turn: bool) -> Result<bool> {
        let bounds = self.index.bounds();
        let entity = self.entities.require_mut(id)?;
        let current = entity.position;

        if turn && entity.turn_on_move && target != current {
            entity.angle = math::bearing(current, target);
        }

        let target = match bounds {
            Some(bounds) => {
                let candidate = entity.collision_box_at(target);
                clamp_into(candidate, entity.position, target, &bounds)
            }
            None => target,
        };

        if !entity.has_collision() {
            entity.position = target;
            log::trace!("Entity {:?} moved to {:?} without collision", id, target);
            return Ok(true);
        }

        let origin = entity.collision_box_center();
        let mut attempts = vec![(Attempt::Full, target)];
        if target.x != current.x && target.y != current.y {
            attempts.push((Attempt::SlideX, Vec2::new(target.x, current.y)));
            attempts.push((Attempt::SlideY, Vec2::new(current.x, target.y)));
        }

        let mut blockers: Vec<EntityId> = Vec::new();
        for (attempt, location) in attempts {
            let candidate = self.entities.require(id)?.collision_box_at(location);
            match self.obstruction(id, &candidate, origin) {
                None => {
                    self.commit(id, location, &candidate, &blockers)?;
                    log::trace!("Entity {:?} moved to {:?} ({:?})", id, location, attempt);
                    return Ok(true);
                }
                Some(blocking) => {
                    for other in blocking {
                        if !blockers.contains(&other) {
                            blockers.push(other);
                        }
                    }
                }
            }
        }

        log::trace!("Entity {:?} blocked moving to {:?}", id, target);
        Ok(false)
    }

    /// `None` when `candidate` is free, otherwise the entities in the way.
    ///
    /// The list may be empty when only static rectangles or the world bounds
    /// block the candidate.
    fn obstruction(&self, id: EntityId, candidate: &Rect, origin: Vec2) -> Option<Vec<EntityId>> {
        let outside = self
            .index
            .bounds()
            .map_or(false, |bounds| !bounds.intersects(candidate));
        let sweep = self
            .config
            .sweep_moves
            .then(|| Line::new(origin, candidate.center()));

        let mut blocked = outside;
        let mut blocking = Vec::new();
        for collider in self.index.colliders(&self.entities, CollisionType::Any, Some(id)) {
            let hit = collider.rect.intersects(candidate)
                || sweep.map_or(false, |line| line.intersects_rect(&collider.rect));
            if hit {
                blocked = true;
                if let Some(other) = collider.entity {
                    blocking.push(other);
                }
            }
        }

        blocked.then_some(blocking)
    }

    fn commit(
        &mut self,
        id: EntityId,
        location: Vec2,
        placed: &Rect,
        blockers: &[EntityId],
    ) -> Result<()> {
        self.entities.require_mut(id)?.position = location;

        let touched: Vec<EntityId> = self
            .index
            .colliders(&self.entities, CollisionType::Any, Some(id))
            .filter_map(|collider| {
                let other = collider.entity?;
                (blockers.contains(&other) || collider.rect.touches(placed)).then_some(other)
            })
            .collect();

        self.events.publish(id, touched);
        Ok(())
    }
}

/// Shift `target` so the collision box lands inside `bounds`.
fn clamp_into(candidate: Rect, position: Vec2, target: Vec2, bounds: &Rect) -> Vec2 {
    let offset = candidate.location() - target;
    let x = math::clamp(candidate.x, bounds.min_x(), bounds.max_x() - candidate.width);
    let y = math::clamp(candidate.y, bounds.min_y(), bounds.max_y() - candidate.height);
    let clamped = Vec2::new(x, y) - offset;
    if clamped != target {
        log::trace!("Clamped move from {:?} to {:?} into world bounds", position, clamped);
    }
    clamped
}
