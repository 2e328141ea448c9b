//! Per-entity velocity integration with acceleration and deceleration curves.

use crate::entity::{CollisionEntity, Mobility};
use crate::error::{ensure_finite, Result};
use crate::forces::{Force, ForceAccumulator, ForceId};
use crate::math::{self, Vec2};
use crate::physics::{ensure_point, PhysicsWorld};
use crate::tick::Tick;
use crate::world::EntityId;

/// Gate checked every tick; returning `false` freezes the entity.
pub type MovementPredicate = Box<dyn Fn(&CollisionEntity) -> bool + Send + Sync>;

/// Drives one mobile entity: self-propelled movement plus the forces acting
/// on it.
///
/// Input is one-shot: `set_input`/`steer_towards` only affect the next
/// [`update`](Self::update).
pub struct MovementController {
    entity: EntityId,
    mobility: Mobility,
    dx: f64,
    dy: f64,
    velocity: f64,
    move_angle: f64,
    last_tick: Tick,
    forces: ForceAccumulator,
    predicates: Vec<MovementPredicate>,
}

impl MovementController {
    pub fn new(entity: EntityId, mobility: Mobility) -> Self {
        Self {
            entity,
            mobility,
            dx: 0.0,
            dy: 0.0,
            velocity: 0.0,
            move_angle: 0.0,
            last_tick: Tick::default(),
            forces: ForceAccumulator::new(entity),
            predicates: Vec::new(),
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn mobility(&self) -> Mobility {
        self.mobility
    }

    pub fn set_mobility(&mut self, mobility: Mobility) {
        self.mobility = mobility;
        self.set_velocity(self.velocity);
    }

    /// Desired movement for the next tick.
    pub fn set_input(&mut self, dx: f64, dy: f64) -> Result<()> {
        ensure_finite(dx, "input dx")?;
        ensure_finite(dy, "input dy")?;
        self.dx = dx;
        self.dy = dy;
        Ok(())
    }

    pub fn input(&self) -> Vec2 {
        Vec2::new(self.dx, self.dy)
    }

    /// Head for a navigation waypoint on the next tick.
    pub fn steer_towards(&mut self, world: &PhysicsWorld, target: Vec2) -> Result<()> {
        ensure_point(target, "steering target")?;
        let position = world.entities.require(self.entity)?.position;
        let delta = target - position;
        self.set_input(delta.x, delta.y)
    }

    /// Current per-tick velocity.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Clamped into `[-max, max]`, where `max` is the distance the entity can
    /// cover in the last seen tick.
    pub fn set_velocity(&mut self, velocity: f64) {
        let max = self.max_velocity();
        self.velocity = math::clamp(velocity, -max, max);
    }

    /// Maximum per-tick velocity for the last seen tick.
    pub fn max_velocity(&self) -> f64 {
        self.mobility
            .tick_velocity(self.last_tick.delta_ms, self.last_tick.time_scale)
            .abs()
    }

    /// Compass angle of the last self-propelled move; 0 when standing still.
    pub fn move_angle(&self) -> f64 {
        self.move_angle
    }

    /// Add a gate; every gate must pass for the entity to move.
    pub fn on_movement_check<F>(&mut self, predicate: F)
    where
        F: Fn(&CollisionEntity) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Box::new(predicate));
    }

    pub fn apply(&mut self, force: Force) -> Result<ForceId> {
        self.forces.apply(force)
    }

    pub fn forces(&self) -> &ForceAccumulator {
        &self.forces
    }

    pub fn forces_mut(&mut self) -> &mut ForceAccumulator {
        &mut self.forces
    }

    /// Run one tick: forces first, then self-propelled movement.
    ///
    /// The two are resolved as separate moves, never summed before collision
    /// testing.
    pub fn update(&mut self, world: &mut PhysicsWorld, tick: Tick) -> Result<()> {
        tick.validate()?;
        self.last_tick = tick;
        self.forces.update(world, tick)?;
        self.handle_movement(world, tick)?;
        Ok(())
    }

    /// Self-propelled part of [`update`](Self::update). Returns the move
    /// result, or `None` if the entity did not try to move.
    pub fn handle_movement(
        &mut self,
        world: &mut PhysicsWorld,
        tick: Tick,
    ) -> Result<Option<bool>> {
        tick.validate()?;
        self.last_tick = tick;

        let entity = world.entities.require(self.entity)?;
        if !self.predicates.iter().all(|allowed| allowed(entity)) {
            self.velocity = 0.0;
            return Ok(None);
        }

        let max = self.max_velocity();
        let acceleration = self.mobility.acceleration_for(tick.delta_ms, tick.time_scale);
        let deceleration = self
            .mobility
            .deceleration_for(tick.delta_ms, tick.time_scale, self.velocity);

        let requested = Vec2::new(self.dx, self.dy);
        self.dx = 0.0;
        self.dy = 0.0;

        let mut direction = requested;
        let length = requested.length();
        if length > 0.0 {
            self.velocity = math::clamp(self.velocity + length.min(acceleration), 0.0, max);
        } else {
            self.velocity = math::clamp(self.velocity - deceleration, 0.0, max);
            direction = Vec2::from_angle(self.move_angle);
        }

        if self.velocity == 0.0 {
            self.move_angle = 0.0;
            return Ok(None);
        }

        self.move_angle = math::heading(direction.x, direction.y);
        let moved = world.move_in_direction(self.entity, self.move_angle, self.velocity)?;
        Ok(Some(moved))
    }
}

impl std::fmt::Debug for MovementController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovementController")
            .field("entity", &self.entity)
            .field("mobility", &self.mobility)
            .field("velocity", &self.velocity)
            .field("move_angle", &self.move_angle)
            .field("forces", &self.forces.len())
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn setup(mobility: Mobility) -> (PhysicsWorld, MovementController) {
        let mut world = PhysicsWorld::new();
        let id = world
            .spawn_registered(CollisionEntity::new(Vec2::ZERO, 10.0, 10.0))
            .unwrap();
        (world, MovementController::new(id, mobility))
    }

    #[test]
    fn instant_acceleration_reaches_top_speed() {
        let (mut world, mut controller) = setup(Mobility::new(100.0, 0, 0));
        controller.set_input(10.0, 0.0).unwrap();
        controller.update(&mut world, Tick::new(100.0, 1.0)).unwrap();
        assert_relative_eq!(controller.velocity(), 10.0);
        assert_relative_eq!(controller.move_angle(), 90.0);
        assert_relative_eq!(world.entity(controller.entity()).unwrap().position.x, 10.0);
    }

    #[test]
    fn small_inputs_only_add_what_was_requested() {
        let (mut world, mut controller) = setup(Mobility::new(100.0, 0, 1000));
        controller.set_input(0.0, 2.0).unwrap();
        controller.update(&mut world, Tick::new(100.0, 1.0)).unwrap();
        assert_relative_eq!(controller.velocity(), 2.0);
        assert_eq!(controller.move_angle(), 0.0);
    }

    #[test]
    fn coasts_along_last_heading_while_decelerating() {
        let (mut world, mut controller) = setup(Mobility::new(100.0, 0, 1000));
        controller.set_input(1.0, 0.0).unwrap();
        controller.update(&mut world, Tick::new(100.0, 1.0)).unwrap();
        assert_relative_eq!(controller.velocity(), 1.0);

        // deceleration per tick: 100 / 1000 * 10 = 1.0
        controller.update(&mut world, Tick::new(100.0, 1.0)).unwrap();
        assert_eq!(controller.velocity(), 0.0);
        assert_eq!(controller.move_angle(), 0.0);
        assert_relative_eq!(world.entity(controller.entity()).unwrap().position.x, 1.0);
    }

    #[test]
    fn rejecting_predicate_freezes_entity() {
        let (mut world, mut controller) = setup(Mobility::default());
        controller.set_velocity(1.0);
        controller.on_movement_check(|_| false);
        controller.set_input(5.0, 5.0).unwrap();
        controller.update(&mut world, Tick::default()).unwrap();
        assert_eq!(controller.velocity(), 0.0);
        assert_eq!(world.entity(controller.entity()).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn set_velocity_is_clamped_to_tick_maximum() {
        let (_, mut controller) = setup(Mobility::new(39.0, 0, 0));
        controller.last_tick = Tick::new(10.0, 2.0);
        controller.set_velocity(5.0);
        assert_relative_eq!(controller.velocity(), 0.78);
        controller.set_velocity(-5.0);
        assert_relative_eq!(controller.velocity(), -0.78);
    }

    #[test]
    fn slower_mobility_clamps_current_velocity() {
        let (_, mut controller) = setup(Mobility::new(100.0, 0, 0));
        controller.last_tick = Tick::new(10.0, 1.0);
        controller.set_velocity(1.0);
        controller.set_mobility(Mobility::new(60.0, 0, 0));
        assert_relative_eq!(controller.velocity(), 0.6);
        assert_relative_eq!(controller.max_velocity(), 0.6);
    }

    #[test]
    fn steering_sets_input_towards_waypoint() {
        let (world, mut controller) = setup(Mobility::default());
        controller.steer_towards(&world, Vec2::new(3.0, -4.0)).unwrap();
        assert_eq!(controller.input(), Vec2::new(3.0, -4.0));
    }
}
