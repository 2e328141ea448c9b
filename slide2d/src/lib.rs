//! slide2d - tick-driven 2D movement and collision.
//!
//! Entities slide along obstacles instead of stopping dead, forces pull them
//! around, and raycasts answer line-of-sight queries. Everything lives in an
//! explicit [`PhysicsWorld`] value.

pub mod config;
pub mod controller;
pub mod entity;
pub mod error;
pub mod events;
pub mod forces;
pub mod index;
pub mod math;
pub mod physics;
pub mod raycast;
mod resolver;
pub mod tick;
pub mod world;

pub use crate::config::PhysicsConfig;
pub use crate::controller::{MovementController, MovementPredicate};
pub use crate::entity::{Align, CollisionEntity, CollisionType, Mobility, Valign};
pub use crate::error::{PhysicsError, Result};
pub use crate::events::{CollisionEvent, CollisionEventBus, CollisionNotice, ListenerId};
pub use crate::forces::{Force, ForceAccumulator, ForceId, ForceLocation, ForceTarget};
pub use crate::index::{Collider, CollisionFilter, CollisionIndex};
pub use crate::math::{Line, Rect, Vec2};
pub use crate::physics::PhysicsWorld;
pub use crate::raycast::RaycastHit;
pub use crate::tick::Tick;
pub use crate::world::{EntityId, EntityStore};
