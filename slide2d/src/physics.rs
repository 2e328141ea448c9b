// slide2d/src/physics.rs
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::config::{validate_bounds, PhysicsConfig};
use crate::entity::{CollisionEntity, CollisionType};
use crate::error::{ensure_finite, PhysicsError, Result};
use crate::events::{CollisionEvent, CollisionEventBus, CollisionNotice, ListenerId};
use crate::index::CollisionIndex;
use crate::math::{Line, Rect, Vec2};
use crate::world::{EntityId, EntityStore};

/// One simulated world: entity geometry, collision index, event bus and
/// settings.
///
/// Every operation takes `&self`/`&mut self`; there is no shared global
/// state, so several worlds can live side by side (one per thread if needed).
pub struct PhysicsWorld {
    pub(crate) config: PhysicsConfig,
    pub(crate) entities: EntityStore,
    pub(crate) index: CollisionIndex,
    pub(crate) events: CollisionEventBus,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            config: PhysicsConfig::default(),
            entities: EntityStore::new(),
            index: CollisionIndex::new(),
            events: CollisionEventBus::new(),
        }
    }

    /// Create a world from validated settings.
    pub fn with_config(config: PhysicsConfig) -> Result<Self> {
        config.validate()?;
        let mut world = Self::new();
        world.index.set_bounds(config.bounds);
        world.config = config;
        Ok(world)
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn set_sweep_moves(&mut self, sweep: bool) {
        self.config.sweep_moves = sweep;
    }

    /// Clear all registered geometry and the bounds. Entities stay spawned
    /// but no longer collide until registered again.
    pub fn clear(&mut self) {
        self.index.clear();
        self.config.bounds = None;
        log::debug!("Cleared collision index");
    }

    // ------------------------------
    // Entity lifecycle
    // ------------------------------

    /// Store an entity without registering it for collision.
    pub fn spawn(&mut self, entity: CollisionEntity) -> Result<EntityId> {
        validate_entity(&entity)?;
        Ok(self.entities.spawn(entity))
    }

    /// Store an entity and register it for collision.
    pub fn spawn_registered(&mut self, entity: CollisionEntity) -> Result<EntityId> {
        let id = self.spawn(entity)?;
        self.register(id)?;
        Ok(id)
    }

    /// Remove an entity from the world, deregistering it and dropping its
    /// collision listeners.
    pub fn despawn(&mut self, id: EntityId) -> Option<CollisionEntity> {
        let entity = self.entities.despawn(id)?;
        self.index.remove(id);
        self.events.remove_listeners(id);
        log::debug!("Despawned entity {:?}", id);
        Some(entity)
    }

    pub fn entity(&self, id: EntityId) -> Option<&CollisionEntity> {
        self.entities.get(id)
    }

    /// Mutable access to entity geometry. Changes are seen by the next query.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut CollisionEntity> {
        self.entities.get_mut(id)
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn index(&self) -> &CollisionIndex {
        &self.index
    }

    /// Register a spawned entity for collision. Returns `false` if it already was.
    pub fn register(&mut self, id: EntityId) -> Result<bool> {
        self.entities.require(id)?;
        let added = self.index.add(id);
        if added {
            log::debug!("Registered entity {:?} for collision", id);
        }
        Ok(added)
    }

    /// Returns whether the entity was registered.
    pub fn deregister(&mut self, id: EntityId) -> bool {
        let removed = self.index.remove(id);
        if removed {
            log::debug!("Deregistered entity {:?}", id);
        }
        removed
    }

    pub fn is_registered(&self, id: EntityId) -> bool {
        self.index.contains(id)
    }

    /// Register a bare static rectangle. Returns `false` for a duplicate.
    pub fn add_static(&mut self, rect: Rect) -> Result<bool> {
        validate_rect(&rect, "static rectangle")?;
        let added = self.index.add_static(rect);
        if added {
            log::debug!("Added static collision box {:?}", rect);
        }
        Ok(added)
    }

    pub fn remove_static(&mut self, rect: Rect) -> bool {
        let removed = self.index.remove_static(rect);
        if removed {
            log::debug!("Removed static collision box {:?}", rect);
        }
        removed
    }

    /// Let entity pairs pass through each other: `filter(entity, other)`
    /// returning `false` means `entity` ignores `other` in its moves,
    /// raycasts and queries. Replaces any previous filter.
    pub fn set_collision_filter<F>(&mut self, filter: F)
    where
        F: Fn(EntityId, EntityId) -> bool + Send + Sync + 'static,
    {
        self.index.set_collision_filter(Some(Arc::new(filter)));
        log::debug!("Installed collision filter");
    }

    pub fn clear_collision_filter(&mut self) {
        self.index.set_collision_filter(None);
    }

    // ------------------------------
    // World bounds
    // ------------------------------

    /// Constrain every following move to `bounds`; `None` lifts the constraint.
    pub fn set_bounds(&mut self, bounds: Option<Rect>) -> Result<()> {
        if let Some(rect) = &bounds {
            validate_bounds(rect)?;
        }
        self.index.set_bounds(bounds);
        self.config.bounds = bounds;
        log::debug!("World bounds set to {:?}", bounds);
        Ok(())
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.index.bounds()
    }

    // ------------------------------
    // Overlap queries
    // ------------------------------

    pub fn collides_point(
        &self,
        point: Vec2,
        filter: CollisionType,
        exclude: Option<EntityId>,
    ) -> Result<bool> {
        ensure_point(point, "query point")?;
        Ok(self.index.collides_point(&self.entities, point, filter, exclude))
    }

    pub fn collides_rect(
        &self,
        rect: &Rect,
        filter: CollisionType,
        exclude: Option<EntityId>,
    ) -> Result<bool> {
        validate_rect(rect, "query rectangle")?;
        Ok(self.index.collides_rect(&self.entities, rect, filter, exclude))
    }

    pub fn collides_line(
        &self,
        line: &Line,
        filter: CollisionType,
        exclude: Option<EntityId>,
    ) -> Result<bool> {
        if !line.is_finite() {
            return Err(PhysicsError::InvalidArgument(format!(
                "query line must be finite, got {line:?}"
            )));
        }
        Ok(self.index.collides_line(&self.entities, line, filter, exclude))
    }

    /// Whether the entity's current box overlaps anything but itself.
    pub fn collides_entity(&self, id: EntityId, filter: CollisionType) -> Result<bool> {
        let rect = self.entities.require(id)?.collision_box();
        Ok(self.index.collides_rect(&self.entities, &rect, filter, Some(id)))
    }

    pub fn collision_boxes(&self, filter: CollisionType) -> Vec<Rect> {
        self.index.collision_boxes(&self.entities, filter)
    }

    pub fn collision_entities(&self, filter: CollisionType) -> Vec<EntityId> {
        self.index.collision_entities(&self.entities, filter)
    }

    // ------------------------------
    // Collision events
    // ------------------------------

    /// Call `callback` for every collision event delivered to `id`.
    pub fn on_collision<F>(&mut self, id: EntityId, callback: F) -> Result<ListenerId>
    where
        F: Fn(&CollisionEvent) + Send + Sync + 'static,
    {
        self.entities.require(id)?;
        Ok(self.events.on_collision(id, callback))
    }

    pub fn remove_collision_listener(&mut self, id: EntityId, listener: ListenerId) -> bool {
        self.events.remove_listener(id, listener)
    }

    pub fn on_any_collision<F>(&mut self, callback: F)
    where
        F: Fn(EntityId, &CollisionEvent) + Send + Sync + 'static,
    {
        self.events.on_any(callback);
    }

    pub fn subscribe(&mut self) -> Receiver<CollisionNotice> {
        self.events.subscribe()
    }

    /// Drain collision notices collected since the last call.
    pub fn drain_events(&mut self) -> Vec<CollisionNotice> {
        self.events.drain_events()
    }
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("config", &self.config)
            .field("entities", &self.entities.len())
            .field("index", &self.index)
            .field("events", &self.events)
            .finish()
    }
}

pub(crate) fn ensure_point(point: Vec2, what: &str) -> Result<()> {
    if point.is_finite() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidArgument(format!(
            "{what} must be finite, got {point:?}"
        )))
    }
}

fn validate_rect(rect: &Rect, what: &str) -> Result<()> {
    ensure_point(rect.location(), what)?;
    ensure_finite(rect.width, what)?;
    ensure_finite(rect.height, what)?;
    if rect.width < 0.0 || rect.height < 0.0 {
        return Err(PhysicsError::InvalidArgument(format!(
            "{what} must have a non-negative size, got {rect:?}"
        )));
    }
    Ok(())
}

fn validate_entity(entity: &CollisionEntity) -> Result<()> {
    ensure_point(entity.position, "entity position")?;
    validate_rect(
        &Rect::new(0.0, 0.0, entity.width, entity.height),
        "entity size",
    )?;
    validate_rect(
        &Rect::new(
            0.0,
            0.0,
            entity.collision_box_width,
            entity.collision_box_height,
        ),
        "collision box size",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_can_move_to_a_worker_thread() {
        fn assert_send<T: Send>() {}
        assert_send::<PhysicsWorld>();
    }

    #[test]
    fn despawn_deregisters_and_drops_listeners() {
        let mut world = PhysicsWorld::new();
        let id = world
            .spawn_registered(CollisionEntity::new(Vec2::ZERO, 10.0, 10.0))
            .unwrap();
        world.on_collision(id, |_| {}).unwrap();

        assert!(world.is_registered(id));
        assert!(world.despawn(id).is_some());
        assert!(!world.is_registered(id));
        assert!(!world.events.remove_listeners(id));
        assert!(matches!(world.register(id), Err(PhysicsError::UnknownEntity(_))));
    }

    #[test]
    fn listeners_follow_registration_and_removal() {
        use std::sync::Mutex;

        let mut world = PhysicsWorld::new();
        let mover = world
            .spawn_registered(CollisionEntity::new(Vec2::ZERO, 10.0, 10.0))
            .unwrap();
        let wall = world
            .spawn_registered(CollisionEntity::new(Vec2::new(20.0, 0.0), 10.0, 10.0))
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        world.on_any_collision(move |recipient, event| {
            sink.lock().unwrap().push((recipient, event.source));
        });
        let own = Arc::new(Mutex::new(0));
        let counter = own.clone();
        let listener = world
            .on_collision(mover, move |_| *counter.lock().unwrap() += 1)
            .unwrap();

        assert!(world.move_by(mover, 10.0, 0.0).unwrap());
        assert_eq!(*seen.lock().unwrap(), vec![(mover, mover), (wall, mover)]);
        assert_eq!(*own.lock().unwrap(), 1);

        assert!(world.remove_collision_listener(mover, listener));
        assert!(world.move_by(mover, 0.0, 1.0).unwrap());
        assert_eq!(*own.lock().unwrap(), 1);
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let mut world = PhysicsWorld::new();
        assert!(world
            .spawn(CollisionEntity::new(Vec2::new(f64::NAN, 0.0), 1.0, 1.0))
            .is_err());
        assert!(world.spawn(CollisionEntity::new(Vec2::ZERO, -1.0, 1.0)).is_err());
        assert!(world.add_static(Rect::new(0.0, 0.0, f64::INFINITY, 1.0)).is_err());
        assert!(world
            .collides_point(Vec2::new(0.0, f64::NAN), CollisionType::Any, None)
            .is_err());
        assert!(world.set_bounds(Some(Rect::new(0.0, 0.0, -5.0, 5.0))).is_err());
    }

    #[test]
    fn config_bounds_reach_the_index() {
        let config = PhysicsConfig::new().with_bounds(Rect::new(0.0, 0.0, 50.0, 50.0));
        let world = PhysicsWorld::with_config(config).unwrap();
        assert_eq!(world.bounds(), Some(Rect::new(0.0, 0.0, 50.0, 50.0)));
        assert!(world
            .collides_point(Vec2::new(75.0, 10.0), CollisionType::Any, None)
            .unwrap());
    }

    #[test]
    fn collides_entity_excludes_itself() {
        let mut world = PhysicsWorld::new();
        let a = world
            .spawn_registered(CollisionEntity::new(Vec2::ZERO, 10.0, 10.0))
            .unwrap();
        assert!(!world.collides_entity(a, CollisionType::Any).unwrap());
        world.add_static(Rect::new(5.0, 5.0, 10.0, 10.0)).unwrap();
        assert!(world.collides_entity(a, CollisionType::Any).unwrap());
        assert!(!world.collides_entity(a, CollisionType::Dynamic).unwrap());
    }

    #[test]
    fn clear_drops_geometry_and_bounds() {
        let mut world = PhysicsWorld::new();
        let a = world
            .spawn_registered(CollisionEntity::new(Vec2::ZERO, 10.0, 10.0))
            .unwrap();
        world.add_static(Rect::new(20.0, 0.0, 5.0, 5.0)).unwrap();
        world.set_bounds(Some(Rect::new(0.0, 0.0, 100.0, 100.0))).unwrap();

        world.clear();
        assert!(world.collision_boxes(CollisionType::Any).is_empty());
        assert_eq!(world.bounds(), None);
        assert!(world.entity(a).is_some());
    }
}
