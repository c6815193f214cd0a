//! Collision detection based on basic shapes.

use super::{Angle, Position};

/// Penetration below this depth counts as touching, not intersecting.
const CONTACT_EPSILON: f64 = 1e-9;

pub trait HasCollision {
    fn has_collision(&self, other: &dyn HasCollision) -> bool {
        self.shape().has_intersection(&other.shape())
    }

    fn shape(&self) -> Shape;
}

impl HasCollision for Shape {
    fn shape(&self) -> Shape {
        *self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Box centred on `position`, rotated by `angle` around its centre.
    Rectangle {
        position: Position,
        x_length: f64,
        y_length: f64,
        angle: Angle,
    },
    Circle {
        position: Position,
        radius: f64,
    },
}

impl Shape {
    pub fn has_intersection(&self, other: &Shape) -> bool {
        match (self, other) {
            (
                Shape::Circle { position, radius },
                Shape::Circle {
                    position: other_position,
                    radius: other_radius,
                },
            ) => position.distance(*other_position) + CONTACT_EPSILON < radius + other_radius,
            (Shape::Circle { position, radius }, rectangle @ Shape::Rectangle { .. })
            | (rectangle @ Shape::Rectangle { .. }, Shape::Circle { position, radius }) => {
                rectangle.distance_to(*position) + CONTACT_EPSILON < *radius
            }
            (Shape::Rectangle { .. }, Shape::Rectangle { .. }) => {
                let (Some(corners), Some(other_corners)) = (self.corners(), other.corners()) else {
                    return false;
                };
                self.axes()
                    .into_iter()
                    .chain(other.axes())
                    .all(|axis| overlap(&corners, &other_corners, axis) > CONTACT_EPSILON)
            }
        }
    }

    /// Distance from `point` to the shape, zero if the point lies inside.
    pub fn distance_to(&self, point: Position) -> f64 {
        match self {
            Shape::Circle { position, radius } => (position.distance(point) - radius).max(0.0),
            Shape::Rectangle {
                position,
                x_length,
                y_length,
                angle,
            } => {
                let local = (point - *position).rotate_vector(-*angle);
                let dx = (local.x().abs() - x_length / 2.0).max(0.0);
                let dy = (local.y().abs() - y_length / 2.0).max(0.0);
                (dx * dx + dy * dy).sqrt()
            }
        }
    }

    pub fn contains(&self, point: Position) -> bool {
        match self {
            Shape::Circle { position, radius } => position.distance(point) <= *radius,
            Shape::Rectangle {
                position,
                x_length,
                y_length,
                angle,
            } => {
                let local = (point - *position).rotate_vector(-*angle);
                local.x().abs() <= x_length / 2.0 + f64::EPSILON
                    && local.y().abs() <= y_length / 2.0 + f64::EPSILON
            }
        }
    }

    /// Corners in counter-clockwise order starting at the local bottom left.
    pub fn corners(&self) -> Option<[Position; 4]> {
        match self {
            Shape::Rectangle {
                position,
                x_length,
                y_length,
                angle,
            } => {
                let (hx, hy) = (x_length / 2.0, y_length / 2.0);
                Some(
                    [(-hx, -hy), (hx, -hy), (hx, hy), (-hx, hy)]
                        .map(|c| *position + Position::from(c).rotate_vector(*angle)),
                )
            }
            Shape::Circle { .. } => None,
        }
    }

    pub fn translated(&self, offset: Position) -> Shape {
        match *self {
            Shape::Rectangle {
                position,
                x_length,
                y_length,
                angle,
            } => Shape::Rectangle {
                position: position + offset,
                x_length,
                y_length,
                angle,
            },
            Shape::Circle { position, radius } => Shape::Circle {
                position: position + offset,
                radius,
            },
        }
    }

    /// Axis aligned bounding box as (min, max).
    pub fn bounds(&self) -> (Position, Position) {
        match self {
            Shape::Circle { position, radius } => (
                *position - Position::new(*radius, *radius),
                *position + Position::new(*radius, *radius),
            ),
            Shape::Rectangle { position, .. } => {
                let corners = self.corners().unwrap_or([*position; 4]);
                let x_min = corners.iter().map(|c| c.x()).fold(f64::INFINITY, f64::min);
                let x_max = corners.iter().map(|c| c.x()).fold(f64::NEG_INFINITY, f64::max);
                let y_min = corners.iter().map(|c| c.y()).fold(f64::INFINITY, f64::min);
                let y_max = corners.iter().map(|c| c.y()).fold(f64::NEG_INFINITY, f64::max);
                (Position::new(x_min, y_min), Position::new(x_max, y_max))
            }
        }
    }

    fn axes(&self) -> Vec<Position> {
        match self {
            Shape::Rectangle { angle, .. } => vec![
                Position::unit(*angle),
                Position::unit(*angle + Angle::from_deg(90.0)),
            ],
            Shape::Circle { .. } => vec![],
        }
    }
}

/// Length of the overlap of both corner sets projected onto `axis`, negative if separated.
fn overlap(corners: &[Position; 4], other_corners: &[Position; 4], axis: Position) -> f64 {
    let project = |points: &[Position; 4]| {
        points.iter().map(|p| p.dot(axis)).fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), d| (min.min(d), max.max(d)),
        )
    };
    let (min, max) = project(corners);
    let (other_min, other_max) = project(other_corners);
    max.min(other_max) - min.max(other_min)
}
