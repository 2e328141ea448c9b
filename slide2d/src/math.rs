//! Geometry primitives shared by every physics component.
//!
//! All angles are compass degrees: 0° points along +y, 90° along +x, and the
//! angle grows clockwise when +y is drawn upward.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Delta components smaller than this are snapped to zero after projection.
const NEGLIGIBLE: f64 = 1e-12;

/// 2D vector / point type used throughout slide2d.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Computes the distance between two points.
    pub fn distance(self, rhs: Self) -> f64 {
        (self - rhs).length()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn to_glam(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    /// Unit delta for a compass angle.
    pub fn from_angle(angle: f64) -> Self {
        compass_delta(angle, 1.0)
    }
}

impl From<(f64, f64)> for Vec2 {
    fn from(value: (f64, f64)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

impl From<DVec2> for Vec2 {
    fn from(value: DVec2) -> Self {
        Self::new(value.x, value.y)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle given by its top-left corner and size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn location(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Strict overlap: rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        let a = self.center();
        let b = other.center();
        (a.x - b.x).abs() < (self.width + other.width) * 0.5
            && (a.y - b.y).abs() < (self.height + other.height) * 0.5
    }

    /// Closed overlap: shared edges and corners count.
    pub fn touches(&self, other: &Rect) -> bool {
        self.x <= other.max_x()
            && other.x <= self.max_x()
            && self.y <= other.max_y()
            && other.y <= self.max_y()
    }

    /// Half-open containment (`min <= p < max`).
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.max_x() && p.y < self.max_y()
    }

    /// Closed containment, used for points on edges.
    pub fn contains_closed(&self, p: Vec2) -> bool {
        p.x >= self.x && p.y >= self.y && p.x <= self.max_x() && p.y <= self.max_y()
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x, self.y),
            Vec2::new(self.max_x(), self.y),
            Vec2::new(self.max_x(), self.max_y()),
            Vec2::new(self.x, self.max_y()),
        ]
    }

    /// Edges in clockwise order starting at the left edge.
    pub fn edges(&self) -> [Line; 4] {
        let [tl, tr, br, bl] = self.corners();
        [
            Line::new(tl, bl),
            Line::new(bl, br),
            Line::new(br, tr),
            Line::new(tr, tl),
        ]
    }

    /// Squared distance from `p` to the closest point of the rectangle.
    pub fn distance_squared_to(&self, p: Vec2) -> f64 {
        let dx = (self.x - p.x).max(p.x - self.max_x()).max(0.0);
        let dy = (self.y - p.y).max(p.y - self.max_y()).max(0.0);
        dx * dx + dy * dy
    }

    /// Whether a circle of `diameter` centered on `center` overlaps this rectangle.
    /// A zero-sized circle never overlaps anything.
    pub fn intersects_circle(&self, center: Vec2, diameter: f64) -> bool {
        let radius = diameter * 0.5;
        radius > 0.0 && self.distance_squared_to(center) < radius * radius
    }
}

/// Line segment from `start` to `end`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Vec2,
    pub end: Vec2,
}

impl Line {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.end.is_finite()
    }

    /// Intersection point of two segments. Parallel segments yield `None`.
    pub fn intersection(&self, other: &Line) -> Option<Vec2> {
        let p = self.start.to_glam();
        let r = self.end.to_glam() - p;
        let q = other.start.to_glam();
        let s = other.end.to_glam() - q;

        let denom = r.perp_dot(s);
        if denom == 0.0 {
            return None;
        }

        let qp = q - p;
        let t = qp.perp_dot(s) / denom;
        let u = qp.perp_dot(r) / denom;
        if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
            return None;
        }

        Some((p + r * t).into())
    }

    /// Points where this segment crosses the rectangle outline, deduplicated.
    pub fn intersections(&self, rect: &Rect) -> Vec<Vec2> {
        let mut points: Vec<Vec2> = Vec::with_capacity(2);
        for edge in rect.edges() {
            if let Some(p) = self.intersection(&edge) {
                if !points.contains(&p) {
                    points.push(p);
                }
            }
        }
        points
    }

    /// Whether the segment touches the rectangle at all.
    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        rect.contains_closed(self.start)
            || rect.contains_closed(self.end)
            || rect.edges().iter().any(|edge| self.intersection(edge).is_some())
    }
}

/// Delta of length `distance` along a compass `angle`.
pub fn compass_delta(angle: f64, distance: f64) -> Vec2 {
    let (sin, cos) = angle.to_radians().sin_cos();
    Vec2::new(snap(sin * distance), snap(cos * distance))
}

/// Point reached from `start` after `distance` along a compass `angle`.
pub fn project(start: Vec2, angle: f64, distance: f64) -> Vec2 {
    start + compass_delta(angle, distance)
}

/// Point reached from `start` after `distance` along the direction towards `target`.
pub fn project_towards(start: Vec2, target: Vec2, distance: f64) -> Vec2 {
    let delta = target - start;
    let len = delta.length();
    if len == 0.0 {
        return start;
    }
    start + delta * (distance / len)
}

/// Compass angle of the vector `(dx, dy)` in `[0, 360)`.
pub fn heading(dx: f64, dy: f64) -> f64 {
    normalize_angle(dx.atan2(dy).to_degrees())
}

/// Compass angle from `from` towards `to` in `[0, 360)`.
pub fn bearing(from: Vec2, to: Vec2) -> f64 {
    heading(to.x - from.x, to.y - from.y)
}

pub fn normalize_angle(angle: f64) -> f64 {
    let normalized = angle % 360.0;
    if normalized < 0.0 {
        normalized + 360.0
    } else {
        normalized
    }
}

/// Clamp that tolerates an inverted range by pinning to `lo`.
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    if hi < lo {
        return lo;
    }
    value.max(lo).min(hi)
}

fn snap(value: f64) -> f64 {
    if value.abs() < NEGLIGIBLE {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn compass_axes() {
        let down = compass_delta(0.0, 5.0);
        assert_eq!(down, Vec2::new(0.0, 5.0));

        let right = compass_delta(90.0, 5.0);
        assert_relative_eq!(right.x, 5.0);
        assert_eq!(right.y, 0.0);

        let left = compass_delta(270.0, 5.0);
        assert_relative_eq!(left.x, -5.0);
        assert_eq!(left.y, 0.0);
    }

    #[test]
    fn bearing_matches_projection() {
        let origin = Vec2::new(3.0, 4.0);
        for angle in [0.0, 45.0, 90.0, 135.0, 200.0, 315.0] {
            let target = project(origin, angle, 10.0);
            assert_relative_eq!(bearing(origin, target), angle, epsilon = 1e-9);
        }
    }

    #[test]
    fn rect_overlap_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.touches(&b));
        assert!(a.intersects(&Rect::new(9.5, 9.5, 1.0, 1.0)));
    }

    #[test]
    fn segment_crossing_box() {
        let line = Line::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        let rect = Rect::new(1.0, 3.0, 5.0, 5.0);
        let points = line.intersections(&rect);
        assert_eq!(points.len(), 2);
        assert!(points.contains(&Vec2::new(3.0, 3.0)));
        assert!(line.intersects_rect(&rect));
        assert!(!Line::new(Vec2::new(20.0, 0.0), Vec2::new(30.0, 0.0)).intersects_rect(&rect));
    }

    #[test]
    fn circle_overlap() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.intersects_circle(Vec2::new(12.0, 5.0), 6.0));
        assert!(!rect.intersects_circle(Vec2::new(14.0, 5.0), 6.0));
        assert!(!rect.intersects_circle(Vec2::new(5.0, 5.0), 0.0));
    }

    #[test]
    fn inverted_clamp_pins_low() {
        assert_eq!(clamp(5.0, 0.0, 10.0), 5.0);
        assert_eq!(clamp(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp(3.0, 4.0, 2.0), 4.0);
    }
}
