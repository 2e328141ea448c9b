//! Collision-aware entity geometry.
//!
//! Entities are owned by the world collaborator (see [`crate::world::EntityStore`]);
//! every other component refers to them through [`crate::world::EntityId`].

use serde::{Deserialize, Serialize};

use crate::math::{Rect, Vec2};

/// Collision category of an entity, also used as a query filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionType {
    /// Contributes no collision box and matches nothing as a filter.
    None,
    Static,
    Dynamic,
    /// Filter only: matches `Static` and `Dynamic`.
    Any,
}

impl CollisionType {
    /// Whether geometry of type `other` passes this filter.
    pub fn matches(self, other: CollisionType) -> bool {
        match self {
            CollisionType::None => false,
            CollisionType::Any => matches!(other, CollisionType::Static | CollisionType::Dynamic),
            filter => filter == other,
        }
    }
}

/// Horizontal alignment of the collision box inside the entity bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Align {
    Left,
    MiddleLeft,
    #[default]
    Center,
    MiddleRight,
    Right,
}

impl Align {
    pub fn portion(self) -> f64 {
        match self {
            Align::Left => 0.0,
            Align::MiddleLeft => 0.25,
            Align::Center => 0.5,
            Align::MiddleRight => 0.75,
            Align::Right => 1.0,
        }
    }

    /// Offset of a box of `box_width` inside an entity of `width`.
    pub fn offset(self, width: f64, box_width: f64) -> f64 {
        aligned_offset(self.portion(), width, box_width)
    }
}

/// Vertical alignment of the collision box inside the entity bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Valign {
    Top,
    MiddleTop,
    Middle,
    MiddleDown,
    #[default]
    Down,
}

impl Valign {
    pub fn portion(self) -> f64 {
        match self {
            Valign::Top => 0.0,
            Valign::MiddleTop => 0.25,
            Valign::Middle => 0.5,
            Valign::MiddleDown => 0.75,
            Valign::Down => 1.0,
        }
    }

    /// Offset of a box of `box_height` inside an entity of `height`.
    pub fn offset(self, height: f64, box_height: f64) -> f64 {
        aligned_offset(self.portion(), height, box_height)
    }
}

fn aligned_offset(portion: f64, size: f64, box_size: f64) -> f64 {
    let location = portion * size - box_size / 2.0;
    if box_size > size {
        return location;
    }
    location.clamp(0.0, size - box_size)
}

/// Geometry and collision settings of one entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionEntity {
    /// Top-left corner of the entity bounds.
    pub position: Vec2,
    pub width: f64,
    pub height: f64,
    pub collision_box_width: f64,
    pub collision_box_height: f64,
    pub align: Align,
    pub valign: Valign,
    collision_type: CollisionType,
    /// Active flag; inactive entities are ignored by every query.
    pub collision: bool,
    /// Facing angle in compass degrees.
    pub angle: f64,
    /// Face the target on every move.
    pub turn_on_move: bool,
}

impl CollisionEntity {
    /// A dynamic entity whose collision box covers its whole bounds.
    pub fn new(position: Vec2, width: f64, height: f64) -> Self {
        Self {
            position,
            width,
            height,
            collision_box_width: width,
            collision_box_height: height,
            align: Align::Center,
            valign: Valign::Down,
            collision_type: CollisionType::Dynamic,
            collision: true,
            angle: 0.0,
            turn_on_move: false,
        }
    }

    /// A static obstacle covering `rect`.
    pub fn obstacle(rect: Rect) -> Self {
        Self::new(rect.location(), rect.width, rect.height)
            .with_collision_type(CollisionType::Static)
    }

    #[must_use]
    pub fn with_collision_box(mut self, width: f64, height: f64) -> Self {
        self.collision_box_width = width;
        self.collision_box_height = height;
        self
    }

    #[must_use]
    pub fn with_alignment(mut self, align: Align, valign: Valign) -> Self {
        self.align = align;
        self.valign = valign;
        self
    }

    #[must_use]
    pub fn with_collision_type(mut self, collision_type: CollisionType) -> Self {
        self.set_collision_type(collision_type);
        self
    }

    #[must_use]
    pub fn with_turn_on_move(mut self, turn_on_move: bool) -> Self {
        self.turn_on_move = turn_on_move;
        self
    }

    pub fn collision_type(&self) -> CollisionType {
        self.collision_type
    }

    /// `Any` is a query filter and is refused as an entity type.
    pub fn set_collision_type(&mut self, collision_type: CollisionType) {
        if collision_type == CollisionType::Any {
            log::warn!(
                "CollisionType::Any may only be used as a query filter; keeping {:?}",
                self.collision_type
            );
            return;
        }
        self.collision_type = collision_type;
    }

    pub fn has_collision(&self) -> bool {
        self.collision
            && self.collision_type != CollisionType::None
            && self.collision_box_width > 0.0
            && self.collision_box_height > 0.0
    }

    /// Offset of the collision box from the entity position.
    pub fn collision_box_offset(&self) -> Vec2 {
        Vec2::new(
            self.align.offset(self.width, self.collision_box_width),
            self.valign.offset(self.height, self.collision_box_height),
        )
    }

    /// Collision box at the current position.
    pub fn collision_box(&self) -> Rect {
        self.collision_box_at(self.position)
    }

    /// Collision box the entity would have at `location`.
    pub fn collision_box_at(&self, location: Vec2) -> Rect {
        let offset = self.collision_box_offset();
        Rect::new(
            location.x + offset.x,
            location.y + offset.y,
            self.collision_box_width,
            self.collision_box_height,
        )
    }

    pub fn collision_box_center(&self) -> Vec2 {
        self.collision_box().center()
    }

    /// Center of the entity bounds (not the collision box).
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.position.x + self.width * 0.5,
            self.position.y + self.height * 0.5,
        )
    }
}

/// Movement tuning of a mobile entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mobility {
    /// Top speed in units per second.
    pub velocity: f64,
    /// Milliseconds to reach top speed; 0 means instant.
    pub acceleration: u32,
    /// Milliseconds to stop from top speed; 0 means instant.
    pub deceleration: u32,
}

impl Default for Mobility {
    fn default() -> Self {
        Self {
            velocity: 100.0,
            acceleration: 0,
            deceleration: 0,
        }
    }
}

impl Mobility {
    pub fn new(velocity: f64, acceleration: u32, deceleration: u32) -> Self {
        Self {
            velocity,
            acceleration,
            deceleration,
        }
    }

    /// Maximum distance covered within one tick.
    pub fn tick_velocity(&self, delta_ms: f64, time_scale: f64) -> f64 {
        self.velocity * delta_ms * 0.001 * time_scale
    }

    /// Velocity gain available this tick.
    pub fn acceleration_for(&self, delta_ms: f64, time_scale: f64) -> f64 {
        let max = self.tick_velocity(delta_ms, time_scale);
        if self.acceleration == 0 {
            max
        } else {
            delta_ms * time_scale / f64::from(self.acceleration) * max
        }
    }

    /// Velocity loss this tick when no input is given.
    pub fn deceleration_for(&self, delta_ms: f64, time_scale: f64, velocity: f64) -> f64 {
        if self.deceleration == 0 {
            velocity
        } else {
            let max = self.tick_velocity(delta_ms, time_scale);
            delta_ms * time_scale / f64::from(self.deceleration) * max
        }
    }
}
