//! Forces: displacement sources that pull an entity towards a location,
//! independent of its own velocity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, PhysicsError, Result};
use crate::math::{self, Vec2};
use crate::physics::PhysicsWorld;
use crate::tick::Tick;
use crate::world::EntityId;

/// Handle of a force inside one [`ForceAccumulator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForceId(u32);

/// What a sticky force follows.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ForceTarget {
    Point(Vec2),
    /// The collision-box center of an entity, re-read every tick.
    Entity(EntityId),
}

/// How a force determines where it pulls towards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ForceLocation {
    /// A fixed point.
    Fixed(Vec2),
    /// Tracks its target every tick and never counts as reached.
    Sticky { target: ForceTarget },
    /// A point ahead of `entity` along a compass `angle`. Never cancels itself.
    Projected { entity: EntityId, angle: f64 },
}

/// A pull towards a location with its own cancellation rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Force {
    pub location: ForceLocation,
    /// Units per second.
    pub strength: f64,
    /// Diameter of the zone around the location that counts as reached.
    pub size: f64,
    cancel_on_collision: bool,
    cancel_on_reached: bool,
    pub identifier: Option<String>,
    ended: bool,
}

impl Force {
    /// A pull towards a fixed point; ends when reached or when blocked.
    pub fn new(location: Vec2, strength: f64, size: f64) -> Self {
        Self {
            location: ForceLocation::Fixed(location),
            strength,
            size,
            cancel_on_collision: true,
            cancel_on_reached: true,
            identifier: None,
            ended: false,
        }
    }

    /// A pull that follows `target`; ends only when blocked.
    pub fn sticky(target: ForceTarget, strength: f64, size: f64) -> Self {
        Self {
            location: ForceLocation::Sticky { target },
            cancel_on_reached: false,
            ..Self::new(Vec2::ZERO, strength, size)
        }
    }

    /// A constant pull in direction `angle` relative to `entity`, e.g. gravity.
    pub fn projected(entity: EntityId, angle: f64, strength: f64) -> Self {
        Self {
            location: ForceLocation::Projected { entity, angle },
            cancel_on_collision: false,
            cancel_on_reached: false,
            ..Self::new(Vec2::ZERO, strength, 0.0)
        }
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    #[must_use]
    pub fn with_cancel_on_collision(mut self, cancel: bool) -> Self {
        self.cancel_on_collision = cancel;
        self
    }

    #[must_use]
    pub fn with_cancel_on_reached(mut self, cancel: bool) -> Self {
        self.cancel_on_reached = cancel;
        self
    }

    pub fn set_cancel_on_collision(&mut self, cancel: bool) {
        self.cancel_on_collision = cancel;
    }

    pub fn set_cancel_on_reached(&mut self, cancel: bool) {
        self.cancel_on_reached = cancel;
    }

    pub fn cancel_on_collision(&self) -> bool {
        self.cancel_on_collision && !matches!(self.location, ForceLocation::Projected { .. })
    }

    pub fn cancel_on_reached(&self) -> bool {
        self.cancel_on_reached && matches!(self.location, ForceLocation::Fixed(_))
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    pub fn end(&mut self) {
        self.ended = true;
    }

    /// Current location, or `None` if the followed entity is gone.
    pub fn resolve_location(&self, world: &PhysicsWorld) -> Option<Vec2> {
        match self.location {
            ForceLocation::Fixed(point) => Some(point),
            ForceLocation::Sticky {
                target: ForceTarget::Point(point),
            } => Some(point),
            ForceLocation::Sticky {
                target: ForceTarget::Entity(id),
            } => world.entity(id).map(|e| e.collision_box_center()),
            ForceLocation::Projected { entity, angle } => {
                let followed = world.entity(entity)?;
                let rect = followed.collision_box();
                let reach = rect.width.max(rect.height) * 2.0;
                let reach = if reach > 0.0 { reach } else { 1.0 };
                Some(math::project(rect.center(), angle, reach))
            }
        }
    }

    /// Whether `entity`'s box overlaps the reach circle around `location`.
    pub fn has_reached(&self, world: &PhysicsWorld, entity: EntityId, location: Vec2) -> bool {
        world
            .entity(entity)
            .map_or(false, |e| e.collision_box().intersects_circle(location, self.size))
    }

    fn validate(&self) -> Result<()> {
        ensure_finite(self.strength, "force strength")?;
        ensure_finite(self.size, "force size")?;
        if self.size < 0.0 {
            return Err(PhysicsError::InvalidArgument(format!(
                "force size must not be negative, got {}",
                self.size
            )));
        }
        match self.location {
            ForceLocation::Fixed(p)
            | ForceLocation::Sticky {
                target: ForceTarget::Point(p),
            } if !p.is_finite() => Err(PhysicsError::InvalidArgument(format!(
                "force location must be finite, got {p:?}"
            ))),
            ForceLocation::Projected { angle, .. } => ensure_finite(angle, "force angle"),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Force {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .identifier
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("Force");
        write!(f, "{}: {}/sec; {:?}", name, self.strength, self.location)
    }
}

/// The active forces acting on one entity.
#[derive(Clone, Debug)]
pub struct ForceAccumulator {
    entity: EntityId,
    next_id: u32,
    active: Vec<(ForceId, Force)>,
}

impl ForceAccumulator {
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            next_id: 1,
            active: Vec::new(),
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Start applying `force`.
    pub fn apply(&mut self, force: Force) -> Result<ForceId> {
        force.validate()?;
        let id = ForceId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        log::debug!("Applying {} to entity {:?}", force, self.entity);
        self.active.push((id, force));
        Ok(id)
    }

    pub fn get(&self, id: ForceId) -> Option<&Force> {
        self.active.iter().find(|(fid, _)| *fid == id).map(|(_, f)| f)
    }

    /// Edit an applied force; changes take effect on the next tick.
    pub fn get_mut(&mut self, id: ForceId) -> Option<&mut Force> {
        self.active
            .iter_mut()
            .find(|(fid, _)| *fid == id)
            .map(|(_, f)| f)
    }

    /// First active force with the given identifier.
    pub fn force(&self, identifier: &str) -> Option<(ForceId, &Force)> {
        if identifier.is_empty() {
            return None;
        }
        self.active
            .iter()
            .find(|(_, f)| f.identifier.as_deref() == Some(identifier))
            .map(|(id, f)| (*id, f))
    }

    pub fn force_mut(&mut self, identifier: &str) -> Option<(ForceId, &mut Force)> {
        if identifier.is_empty() {
            return None;
        }
        self.active
            .iter_mut()
            .find(|(_, f)| f.identifier.as_deref() == Some(identifier))
            .map(|(id, f)| (*id, f))
    }

    /// Flag a force as ended; it is dropped on the next tick.
    pub fn end(&mut self, id: ForceId) -> bool {
        match self.active.iter_mut().find(|(fid, _)| *fid == id) {
            Some((_, force)) if !force.has_ended() => {
                force.end();
                true
            }
            _ => false,
        }
    }

    /// Forces still applied, in the order they were added.
    pub fn active(&self) -> impl Iterator<Item = (ForceId, &Force)> {
        self.active.iter().map(|(id, f)| (*id, f))
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Combine every active force into one move for this tick.
    ///
    /// Returns the move result, or `None` when no force contributed.
    pub fn update(&mut self, world: &mut PhysicsWorld, tick: Tick) -> Result<Option<bool>> {
        tick.validate()?;
        self.drop_ended();
        if self.active.is_empty() {
            return Ok(None);
        }

        let center = world.entities.require(self.entity)?.collision_box_center();
        let mut delta = Vec2::ZERO;
        let mut contributed = false;
        for (_, force) in self.active.iter_mut() {
            let Some(location) = force.resolve_location(world) else {
                force.end();
                continue;
            };
            if force.cancel_on_reached() && force.has_reached(world, self.entity, location) {
                force.end();
                continue;
            }

            let angle = math::bearing(center, location);
            delta += math::compass_delta(angle, tick.distance(force.strength));
            contributed = true;
        }

        let outcome = if contributed {
            let moved = world.displace(self.entity, delta)?;
            if !moved {
                for (_, force) in self.active.iter_mut() {
                    if force.cancel_on_collision() {
                        force.end();
                    }
                }
            }
            Some(moved)
        } else {
            None
        };

        self.drop_ended();
        Ok(outcome)
    }

    fn drop_ended(&mut self) {
        let entity = self.entity;
        self.active.retain(|(id, force)| {
            if force.has_ended() {
                log::debug!("Force {:?} ({}) on entity {:?} ended", id, force, entity);
            }
            !force.has_ended()
        });
    }
}
