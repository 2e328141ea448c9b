//! Registry of active collision geometry and the overlap queries on it.

use std::sync::Arc;

use crate::entity::CollisionType;
use crate::math::{Line, Rect, Vec2};
use crate::world::{EntityId, EntityStore};

/// Decides whether the first entity may collide with the second.
///
/// Asked with the entity a query is made for (the mover, or the excluded
/// entity of a query) and each registered entity it is tested against.
/// Static rectangles are never filtered.
pub type CollisionFilter = Arc<dyn Fn(EntityId, EntityId) -> bool + Send + Sync>;

/// One piece of collision geometry as seen by a query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    /// `None` for bare static rectangles.
    pub entity: Option<EntityId>,
    pub rect: Rect,
    pub collision_type: CollisionType,
}

/// Holds registered entities and static rectangles in insertion order.
///
/// Entity boxes are not cached: every query reads the current geometry from
/// the [`EntityStore`], so a committed move is visible to the very next query.
#[derive(Clone, Default)]
pub struct CollisionIndex {
    entities: Vec<EntityId>,
    static_boxes: Vec<Rect>,
    bounds: Option<Rect>,
    filter: Option<CollisionFilter>,
}

impl CollisionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity. Returns `false` if it was already registered.
    pub fn add(&mut self, id: EntityId) -> bool {
        if self.entities.contains(&id) {
            return false;
        }
        self.entities.push(id);
        true
    }

    /// Register a bare static rectangle. Returns `false` for a duplicate.
    pub fn add_static(&mut self, rect: Rect) -> bool {
        if self.static_boxes.contains(&rect) {
            return false;
        }
        self.static_boxes.push(rect);
        true
    }

    /// Deregister an entity. Returns whether it was registered.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let before = self.entities.len();
        self.entities.retain(|e| *e != id);
        before != self.entities.len()
    }

    pub fn remove_static(&mut self, rect: Rect) -> bool {
        let before = self.static_boxes.len();
        self.static_boxes.retain(|r| *r != rect);
        before != self.static_boxes.len()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains(&id)
    }

    /// Drop all entities, static rectangles and the bounds.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.static_boxes.clear();
        self.bounds = None;
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Option<Rect>) {
        self.bounds = bounds;
    }

    /// Install the pair filter consulted by every query made for an entity.
    pub fn set_collision_filter(&mut self, filter: Option<CollisionFilter>) {
        self.filter = filter;
    }

    /// Whether `entity` may collide with `other` under the installed filter.
    pub fn can_collide(&self, entity: EntityId, other: EntityId) -> bool {
        entity != other && self.filter.as_ref().map_or(true, |allow| allow(entity, other))
    }

    /// Registered entity ids in registration order.
    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn static_boxes(&self) -> &[Rect] {
        &self.static_boxes
    }

    /// Active geometry passing `filter`, skipping `exclude` and every entity
    /// the pair filter says `exclude` cannot collide with.
    ///
    /// Registered entities come first, then static rectangles; this order is
    /// stable between calls as long as the index is not modified.
    pub fn colliders<'a>(
        &'a self,
        store: &'a EntityStore,
        filter: CollisionType,
        exclude: Option<EntityId>,
    ) -> impl Iterator<Item = Collider> + 'a {
        let entities = self.entities.iter().filter_map(move |&id| {
            if let Some(me) = exclude {
                if !self.can_collide(me, id) {
                    return None;
                }
            }
            let entity = store.get(id)?;
            if !entity.has_collision() || !filter.matches(entity.collision_type()) {
                return None;
            }
            Some(Collider {
                entity: Some(id),
                rect: entity.collision_box(),
                collision_type: entity.collision_type(),
            })
        });

        let statics = self
            .static_boxes
            .iter()
            .filter(move |rect| !rect.is_empty() && filter.matches(CollisionType::Static))
            .map(|rect| Collider {
                entity: None,
                rect: *rect,
                collision_type: CollisionType::Static,
            });

        entities.chain(statics)
    }

    /// Whether `point` lies inside any matching box, or outside the bounds.
    pub fn collides_point(
        &self,
        store: &EntityStore,
        point: Vec2,
        filter: CollisionType,
        exclude: Option<EntityId>,
    ) -> bool {
        if let Some(bounds) = self.bounds {
            if !bounds.contains(point) {
                return true;
            }
        }
        self.colliders(store, filter, exclude)
            .any(|c| c.rect.contains(point))
    }

    /// Whether `rect` overlaps any matching box, or misses the bounds entirely.
    pub fn collides_rect(
        &self,
        store: &EntityStore,
        rect: &Rect,
        filter: CollisionType,
        exclude: Option<EntityId>,
    ) -> bool {
        if let Some(bounds) = self.bounds {
            if !bounds.intersects(rect) {
                return true;
            }
        }
        self.colliders(store, filter, exclude)
            .any(|c| c.rect.intersects(rect))
    }

    /// Whether `line` touches any matching box.
    pub fn collides_line(
        &self,
        store: &EntityStore,
        line: &Line,
        filter: CollisionType,
        exclude: Option<EntityId>,
    ) -> bool {
        self.colliders(store, filter, exclude)
            .any(|c| line.intersects_rect(&c.rect))
    }

    /// Snapshot of all matching boxes in index order.
    pub fn collision_boxes(&self, store: &EntityStore, filter: CollisionType) -> Vec<Rect> {
        self.colliders(store, filter, None).map(|c| c.rect).collect()
    }

    /// Registered entities that currently contribute a matching box.
    pub fn collision_entities(
        &self,
        store: &EntityStore,
        filter: CollisionType,
    ) -> Vec<EntityId> {
        self.colliders(store, filter, None)
            .filter_map(|c| c.entity)
            .collect()
    }
}

impl std::fmt::Debug for CollisionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionIndex")
            .field("entities", &self.entities)
            .field("static_boxes", &self.static_boxes)
            .field("bounds", &self.bounds)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::CollisionEntity;

    fn setup() -> (EntityStore, CollisionIndex, EntityId, EntityId) {
        let mut store = EntityStore::new();
        let mut index = CollisionIndex::new();
        let wall = store.spawn(CollisionEntity::obstacle(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let mob = store.spawn(CollisionEntity::new(Vec2::new(20.0, 0.0), 10.0, 10.0));
        index.add(wall);
        index.add(mob);
        (store, index, wall, mob)
    }

    #[test]
    fn registration_is_idempotent() {
        let (_, mut index, wall, _) = setup();
        assert!(!index.add(wall));
        assert_eq!(index.entity_ids().len(), 2);
        assert!(index.remove(wall));
        assert!(!index.remove(wall));
        assert!(index.add_static(Rect::new(1.0, 1.0, 1.0, 1.0)));
        assert!(!index.add_static(Rect::new(1.0, 1.0, 1.0, 1.0)));
    }

    #[test]
    fn filters_by_type_and_exclusion() {
        let (store, index, wall, mob) = setup();
        let query = Rect::new(5.0, 0.0, 20.0, 5.0);
        assert!(index.collides_rect(&store, &query, CollisionType::Static, None));
        assert!(index.collides_rect(&store, &query, CollisionType::Dynamic, None));
        assert!(!index.collides_rect(&store, &query, CollisionType::None, None));
        assert!(!index.collides_rect(&store, &query, CollisionType::Static, Some(wall)));
        assert_eq!(index.collision_entities(&store, CollisionType::Dynamic), vec![mob]);
    }

    #[test]
    fn none_typed_and_inactive_entities_are_invisible() {
        let (mut store, index, wall, mob) = setup();
        store.require_mut(wall).unwrap().set_collision_type(CollisionType::None);
        store.require_mut(mob).unwrap().collision = false;
        assert!(index.collision_boxes(&store, CollisionType::Any).is_empty());
        assert!(!index.collides_point(&store, Vec2::new(5.0, 5.0), CollisionType::Any, None));
    }

    #[test]
    fn outside_bounds_counts_as_collision() {
        let (store, mut index, _, _) = setup();
        index.set_bounds(Some(Rect::new(0.0, 0.0, 50.0, 50.0)));
        assert!(index.collides_point(&store, Vec2::new(60.0, 5.0), CollisionType::Any, None));
        let far = Rect::new(70.0, 70.0, 5.0, 5.0);
        assert!(index.collides_rect(&store, &far, CollisionType::Any, None));
        assert!(!index.collides_point(&store, Vec2::new(40.0, 40.0), CollisionType::Any, None));
    }

    #[test]
    fn line_queries() {
        let (store, index, wall, _) = setup();
        let line = Line::new(Vec2::new(-5.0, 5.0), Vec2::new(5.0, 5.0));
        assert!(index.collides_line(&store, &line, CollisionType::Any, None));
        assert!(!index.collides_line(&store, &line, CollisionType::Any, Some(wall)));
    }

    #[test]
    fn pair_filter_hides_entities_from_queries_made_for_another() {
        let (store, mut index, wall, mob) = setup();
        index.add_static(Rect::new(0.0, 20.0, 10.0, 10.0));
        let filter: CollisionFilter =
            Arc::new(move |me: EntityId, other: EntityId| !(me == mob && other == wall));
        index.set_collision_filter(Some(filter));

        let around_wall = Rect::new(2.0, 2.0, 4.0, 4.0);
        assert!(!index.collides_rect(&store, &around_wall, CollisionType::Any, Some(mob)));
        assert!(index.collides_rect(&store, &around_wall, CollisionType::Any, None));
        assert!(!index.can_collide(mob, wall));
        assert!(index.can_collide(wall, mob));
        assert!(!index.can_collide(wall, wall));

        let on_static = Rect::new(2.0, 22.0, 4.0, 4.0);
        assert!(index.collides_rect(&store, &on_static, CollisionType::Any, Some(mob)));

        index.set_collision_filter(None);
        assert!(index.collides_rect(&store, &around_wall, CollisionType::Any, Some(mob)));
    }

    #[test]
    fn static_boxes_follow_entities() {
        let (store, mut index, _, _) = setup();
        index.add_static(Rect::new(100.0, 100.0, 5.0, 5.0));
        let boxes = index.collision_boxes(&store, CollisionType::Any);
        assert_eq!(boxes.len(), 3);
        assert_eq!(boxes[2], Rect::new(100.0, 100.0, 5.0, 5.0));
        assert!(index.collision_boxes(&store, CollisionType::Dynamic).len() == 1);
    }
}
