//! Planar geometry primitives backing every spatial query in the engine.
//!
//! Polygons are the sole collision primitive: cell occupancy, placement
//! validation, and click hit testing all reduce to the operations defined
//! here. Touching boundaries do not count as intersection, so shapes that
//! exactly tile the cell grid report only the cells they genuinely overlap.

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Immutable 2D coordinate expressed in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    /// Origin of the world coordinate system.
    pub const ZERO: Point = Point::new(0.0, 0.0);

    /// Creates a new point from explicit coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate of the point.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical coordinate of the point.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(self, other: Point) -> f32 {
        let diff = other - self;
        diff.x.hypot(diff.y)
    }

    /// Moves this point toward `target` by at most `max_step` world units,
    /// never overshooting the target.
    #[must_use]
    pub fn step_towards(self, target: Point, max_step: f32) -> Point {
        let distance = self.distance_to(target);
        if distance <= max_step || distance == 0.0 {
            return target;
        }
        let scale = max_step / distance;
        self + (target - self) * scale
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle described by its extreme corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    min: Point,
    max: Point,
}

impl BoundingBox {
    /// Creates a bounding box from its lower-left and upper-right corners.
    #[must_use]
    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Corner with the smallest coordinates on both axes.
    #[must_use]
    pub const fn min(&self) -> Point {
        self.min
    }

    /// Corner with the largest coordinates on both axes.
    #[must_use]
    pub const fn max(&self) -> Point {
        self.max
    }
}

/// Closed polygon described by its vertices in order.
///
/// Polygons are assumed to be non-self-intersecting and to carry at least
/// three vertices; the engine only ever constructs axis-aligned squares, but
/// every operation below works for arbitrary simple polygons.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon from an ordered vertex list.
    #[must_use]
    pub fn new(vertices: Vec<Point>) -> Self {
        debug_assert!(vertices.len() >= 3);
        Self { vertices }
    }

    /// Creates an axis-aligned square centered on the provided point.
    #[must_use]
    pub fn square(center: Point, side: f32) -> Self {
        let half = side / 2.0;
        Self::new(vec![
            center + Point::new(-half, -half),
            center + Point::new(half, -half),
            center + Point::new(half, half),
            center + Point::new(-half, half),
        ])
    }

    /// Ordered vertices describing the polygon outline.
    #[must_use]
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Computes the axis-aligned bounding box enclosing the polygon.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        let mut min = self.vertices[0];
        let mut max = self.vertices[0];
        for vertex in &self.vertices[1..] {
            min = Point::new(min.x().min(vertex.x()), min.y().min(vertex.y()));
            max = Point::new(max.x().max(vertex.x()), max.y().max(vertex.y()));
        }
        BoundingBox::new(min, max)
    }

    /// Center of the polygon's bounding box.
    #[must_use]
    pub fn center(&self) -> Point {
        let bbox = self.bounding_box();
        Point::new(
            (bbox.min().x() + bbox.max().x()) / 2.0,
            (bbox.min().y() + bbox.max().y()) / 2.0,
        )
    }

    /// Returns a copy of the polygon shifted so its center lands on `center`.
    #[must_use]
    pub fn centered_at(&self, center: Point) -> Polygon {
        let offset = center - self.center();
        Polygon {
            vertices: self
                .vertices
                .iter()
                .map(|vertex| *vertex + offset)
                .collect(),
        }
    }

    /// Reports whether the point lies strictly inside the polygon using a
    /// crossing-number test. Points on the outline are not contained.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        let mut inside = false;
        let mut previous = self.vertices[self.vertices.len() - 1];
        for &vertex in &self.vertices {
            if (vertex.y() > point.y()) != (previous.y() > point.y()) {
                let crossing_x = (previous.x() - vertex.x()) * (point.y() - vertex.y())
                    / (previous.y() - vertex.y())
                    + vertex.x();
                if point.x() < crossing_x {
                    inside = !inside;
                }
            }
            previous = vertex;
        }
        inside
    }

    /// Reports whether two polygons overlap. The test is symmetric: it looks
    /// for a proper edge crossing, then falls back to mutual containment so
    /// that fully nested shapes are detected. Shapes that merely share an
    /// edge or a vertex do not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Polygon) -> bool {
        for (a_start, a_end) in edges(&self.vertices) {
            for (b_start, b_end) in edges(&other.vertices) {
                if segments_cross(a_start, a_end, b_start, b_end) {
                    return true;
                }
            }
        }
        self.contains(other.center()) || other.contains(self.center())
    }
}

fn edges(vertices: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    vertices
        .iter()
        .enumerate()
        .map(|(index, &start)| (start, vertices[(index + 1) % vertices.len()]))
}

fn cross(origin: Point, a: Point, b: Point) -> f32 {
    let u = a - origin;
    let v = b - origin;
    u.x() * v.y() - u.y() * v.x()
}

fn segments_cross(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);
    (d1 > 0.0) != (d2 > 0.0)
        && (d3 > 0.0) != (d4 > 0.0)
        && d1 != 0.0
        && d2 != 0.0
        && d3 != 0.0
        && d4 != 0.0
}
