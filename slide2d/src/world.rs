use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::CollisionEntity;
use crate::error::{PhysicsError, Result};

/// Unique identifier for an entity in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Get the underlying integer ID (useful for debugging or serialization).
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// Owner of entity geometry.
///
/// This stands in for the game's entity registry: it hands out `EntityId`s
/// and keeps the `CollisionEntity` values the physics components read and
/// move. Spawning does not make an entity collide; it has to be registered
/// with the collision index as well.
#[derive(Debug, Clone)]
pub struct EntityStore {
    next_id: u32,
    entities: HashMap<EntityId, CollisionEntity>,
}

impl EntityStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entities: HashMap::new(),
        }
    }

    /// Store an entity and return its `EntityId`.
    pub fn spawn(&mut self, entity: CollisionEntity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity, returning its last state.
    pub fn despawn(&mut self, id: EntityId) -> Option<CollisionEntity> {
        self.entities.remove(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&CollisionEntity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut CollisionEntity> {
        self.entities.get_mut(&id)
    }

    /// Like `get`, but an unknown id is an error.
    pub fn require(&self, id: EntityId) -> Result<&CollisionEntity> {
        self.get(id).ok_or(PhysicsError::UnknownEntity(id))
    }

    pub fn require_mut(&mut self, id: EntityId) -> Result<&mut CollisionEntity> {
        self.get_mut(id).ok_or(PhysicsError::UnknownEntity(id))
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if there are no entities in the store.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
