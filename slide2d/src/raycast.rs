//! First-hit line queries against the collision index.

use crate::entity::CollisionType;
use crate::error::{ensure_finite, PhysicsError, Result};
use crate::math::{self, Line, Rect, Vec2};
use crate::physics::{ensure_point, PhysicsWorld};
use crate::world::EntityId;

/// Extra length added to derived ray lengths so the farthest corner is reached.
const RAY_MARGIN: f64 = 1.0;

/// Closest intersection of a ray with the collision geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastHit {
    pub point: Vec2,
    /// `None` when a bare static rectangle was hit.
    pub entity: Option<EntityId>,
    /// The box that was hit.
    pub rect: Rect,
    /// Distance from the ray origin to `point`.
    pub distance: f64,
}

impl PhysicsWorld {
    /// Cast along `line` and return the hit closest to its start.
    ///
    /// A ray starting inside a box hits that box at its origin. Boxes at
    /// exactly the same distance resolve to the first one in index order.
    pub fn raycast(
        &self,
        line: &Line,
        filter: CollisionType,
        exclude: Option<EntityId>,
    ) -> Result<Option<RaycastHit>> {
        if !line.is_finite() {
            return Err(PhysicsError::InvalidArgument(format!(
                "ray must be finite, got {line:?}"
            )));
        }

        let origin = line.start;
        let mut closest: Option<RaycastHit> = None;
        for collider in self.index.colliders(&self.entities, filter, exclude) {
            let Some(point) = nearest_intersection(line, &collider.rect) else {
                continue;
            };
            let distance = origin.distance(point);
            if closest.map_or(true, |hit| distance < hit.distance) {
                closest = Some(RaycastHit {
                    point,
                    entity: collider.entity,
                    rect: collider.rect,
                    distance,
                });
            }
        }

        Ok(closest)
    }

    /// Cast from `from` to `to`.
    pub fn raycast_between(
        &self,
        from: Vec2,
        to: Vec2,
        filter: CollisionType,
        exclude: Option<EntityId>,
    ) -> Result<Option<RaycastHit>> {
        self.raycast(&Line::new(from, to), filter, exclude)
    }

    /// Cast from `origin` along a compass `angle`.
    ///
    /// Without `max_distance` the ray is long enough to reach every registered
    /// box and the world bounds, unless the config fixes a ray length.
    pub fn raycast_angle(
        &self,
        origin: Vec2,
        angle: f64,
        max_distance: Option<f64>,
        filter: CollisionType,
        exclude: Option<EntityId>,
    ) -> Result<Option<RaycastHit>> {
        ensure_point(origin, "ray origin")?;
        ensure_finite(angle, "ray angle")?;
        let length = match max_distance {
            Some(distance) => {
                ensure_finite(distance, "ray distance")?;
                if distance < 0.0 {
                    return Err(PhysicsError::InvalidArgument(format!(
                        "ray distance must not be negative, got {distance}"
                    )));
                }
                distance
            }
            None => self.unbounded_ray_length(origin),
        };

        let line = Line::new(origin, math::project(origin, angle, length));
        self.raycast(&line, filter, exclude)
    }

    fn unbounded_ray_length(&self, origin: Vec2) -> f64 {
        if let Some(length) = self.config.ray_length {
            return length;
        }

        let farthest = self
            .index
            .colliders(&self.entities, CollisionType::Any, None)
            .flat_map(|collider| collider.rect.corners())
            .map(|corner| origin.distance(corner))
            .fold(0.0, f64::max);
        let bounds = self.index.bounds().map_or(0.0, |b| {
            b.corners()
                .iter()
                .map(|corner| origin.distance(*corner))
                .fold(0.0, f64::max)
        });

        farthest.max(bounds) + RAY_MARGIN
    }
}

/// Point where `line` first meets `rect`, measured from the line start.
fn nearest_intersection(line: &Line, rect: &Rect) -> Option<Vec2> {
    if rect.contains(line.start) {
        return Some(line.start);
    }
    line.intersections(rect).into_iter().min_by(|a, b| {
        line.start
            .distance(*a)
            .total_cmp(&line.start.distance(*b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::CollisionEntity;
    use approx::assert_relative_eq;

    #[test]
    fn ray_starting_inside_hits_origin() {
        let mut world = PhysicsWorld::new();
        world.add_static(Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        let hit = world
            .raycast_between(Vec2::new(5.0, 5.0), Vec2::new(50.0, 5.0), CollisionType::Any, None)
            .unwrap()
            .unwrap();
        assert_eq!(hit.point, Vec2::new(5.0, 5.0));
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.entity, None);
    }

    #[test]
    fn equal_distances_keep_index_order() {
        let mut world = PhysicsWorld::new();
        let first = world
            .spawn_registered(CollisionEntity::new(Vec2::new(10.0, -5.0), 5.0, 5.0))
            .unwrap();
        world
            .spawn_registered(CollisionEntity::new(Vec2::new(10.0, 0.0), 5.0, 5.0))
            .unwrap();
        let hit = world
            .raycast_between(Vec2::ZERO, Vec2::new(20.0, 0.0), CollisionType::Any, None)
            .unwrap()
            .unwrap();
        assert_eq!(hit.entity, Some(first));
        assert_eq!(hit.point, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn bounded_angle_ray_stops_short() {
        let mut world = PhysicsWorld::new();
        world.add_static(Rect::new(-1.0, 20.0, 2.0, 2.0)).unwrap();
        assert!(world
            .raycast_angle(Vec2::ZERO, 0.0, Some(10.0), CollisionType::Any, None)
            .unwrap()
            .is_none());
        let hit = world
            .raycast_angle(Vec2::ZERO, 0.0, None, CollisionType::Any, None)
            .unwrap()
            .unwrap();
        assert_eq!(hit.point.x, 0.0);
        assert_relative_eq!(hit.point.y, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn configured_ray_length_is_used() {
        let config = crate::config::PhysicsConfig::new().with_ray_length(5.0);
        let mut world = PhysicsWorld::with_config(config).unwrap();
        world.add_static(Rect::new(-1.0, 20.0, 2.0, 2.0)).unwrap();
        assert!(world
            .raycast_angle(Vec2::ZERO, 0.0, None, CollisionType::Any, None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn negative_distance_is_invalid() {
        let world = PhysicsWorld::new();
        assert!(world
            .raycast_angle(Vec2::ZERO, 0.0, Some(-1.0), CollisionType::Any, None)
            .is_err());
    }
}
