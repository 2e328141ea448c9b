//! Synchronous delivery of resolved-collision notifications.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::world::EntityId;

/// Raised when a committed move leaves the mover touching other entities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollisionEvent {
    /// The entity that moved.
    pub source: EntityId,
    /// Entities touched by the move. Empty in the copy sent to touched entities.
    pub involved: Arc<[EntityId]>,
}

impl CollisionEvent {
    pub fn new(source: EntityId, involved: impl Into<Arc<[EntityId]>>) -> Self {
        Self {
            source,
            involved: involved.into(),
        }
    }
}

/// An event together with the entity it was delivered to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollisionNotice {
    pub recipient: EntityId,
    pub event: CollisionEvent,
}

/// Handle of a per-entity listener, used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// Per-entity collision listener.
pub type CollisionCallback = Box<dyn Fn(&CollisionEvent) + Send + Sync>;

/// Listener for every delivery; receives the recipient alongside the event.
pub type GlobalCollisionCallback = Box<dyn Fn(EntityId, &CollisionEvent) + Send + Sync>;

/// Ordered listener lists plus channel subscribers.
///
/// Listeners only see the event, never the world, so a listener cannot move
/// entities while a delivery is in progress.
#[derive(Default)]
pub struct CollisionEventBus {
    next_listener: u32,
    listeners: HashMap<EntityId, Vec<(ListenerId, CollisionCallback)>>,
    global: Vec<GlobalCollisionCallback>,
    subscribers: Vec<Sender<CollisionNotice>>,
    pending: Vec<CollisionNotice>,
}

impl CollisionEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_collision<F>(&mut self, entity: EntityId, callback: F) -> ListenerId
    where
        F: Fn(&CollisionEvent) + Send + Sync + 'static,
    {
        self.next_listener = self.next_listener.wrapping_add(1);
        let id = ListenerId(self.next_listener);
        self.listeners
            .entry(entity)
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Remove one listener of `entity`. Returns whether it was found.
    pub fn remove_listener(&mut self, entity: EntityId, listener: ListenerId) -> bool {
        let Some(callbacks) = self.listeners.get_mut(&entity) else {
            return false;
        };
        let before = callbacks.len();
        callbacks.retain(|(id, _)| *id != listener);
        let removed = callbacks.len() != before;
        if callbacks.is_empty() {
            self.listeners.remove(&entity);
        }
        removed
    }

    pub fn on_any<F>(&mut self, callback: F)
    where
        F: Fn(EntityId, &CollisionEvent) + Send + Sync + 'static,
    {
        self.global.push(Box::new(callback));
    }

    /// Open a channel receiving every delivery from now on.
    pub fn subscribe(&mut self) -> Receiver<CollisionNotice> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Forget the per-entity listeners of `entity`.
    pub fn remove_listeners(&mut self, entity: EntityId) -> bool {
        self.listeners.remove(&entity).is_some()
    }

    /// Deliver the events for one committed move.
    ///
    /// The mover is notified first with the full `involved` list, then each
    /// touched entity once with an event naming the mover. Nothing is sent
    /// when `involved` is empty.
    pub fn publish(&mut self, source: EntityId, involved: Vec<EntityId>) {
        if involved.is_empty() {
            return;
        }

        let touched: Arc<[EntityId]> = involved.into();
        self.deliver(source, CollisionEvent::new(source, touched.clone()));

        let reply = CollisionEvent::new(source, Vec::<EntityId>::new());
        for &entity in touched.iter() {
            self.deliver(entity, reply.clone());
        }
    }

    fn deliver(&mut self, recipient: EntityId, event: CollisionEvent) {
        if let Some(callbacks) = self.listeners.get(&recipient) {
            for (_, cb) in callbacks {
                cb(&event);
            }
        }
        for cb in &self.global {
            cb(recipient, &event);
        }

        let notice = CollisionNotice { recipient, event };
        self.subscribers.retain(|tx| {
            if tx.send(notice.clone()).is_ok() {
                true
            } else {
                log::warn!("Dropping disconnected collision event subscriber");
                false
            }
        });
        self.pending.push(notice);
    }

    /// Take every notice delivered since the last drain.
    pub fn drain_events(&mut self) -> Vec<CollisionNotice> {
        std::mem::take(&mut self.pending)
    }
}

impl std::fmt::Debug for CollisionEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionEventBus")
            .field("listeners", &self.listeners.len())
            .field("global", &self.global.len())
            .field("subscribers", &self.subscribers.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
