//! Basic building blocks.

use std::{
    f64::consts::PI,
    ops::{Add, Mul, Neg, Sub},
};

use serde::{Deserialize, Serialize};

/// Point or offset on the field, in millimetres.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Position {
    x: f64,
    y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn distance(&self, position: Self) -> f64 {
        ((self.x - position.x).powi(2) + (self.y - position.y).powi(2)).sqrt()
    }

    pub fn length(&self) -> f64 {
        self.distance(Position::default())
    }

    pub fn dot(&self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product.
    pub fn cross(&self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn lerp(&self, other: Self, t: f64) -> Position {
        *self + (other - *self) * t
    }

    pub fn rotate_vector(&self, angle: Angle) -> Position {
        Position::new(
            self.x * angle.0.cos() - self.y * angle.0.sin(),
            self.x * angle.0.sin() + self.y * angle.0.cos(),
        )
    }

    pub fn unit(angle: Angle) -> Position {
        Position::new(angle.0.cos(), angle.0.sin())
    }
}

impl From<Position> for (f32, f32) {
    fn from(value: Position) -> Self {
        (value.x as f32, value.y as f32)
    }
}

impl From<Position> for (f64, f64) {
    fn from(value: Position) -> Self {
        (value.x, value.y)
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f64> for Position {
    type Output = Position;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl Neg for Position {
    type Output = Position;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

/// Angle in radians. Counter-clockwise is positive.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Angle(f64);

impl Angle {
    pub fn new(radians: f64) -> Self {
        Self(radians)
    }

    pub fn from_deg(degree: f64) -> Self {
        Self(degree * PI / 180.0)
    }

    /// Degrees in `[0, 360)`.
    pub fn to_deg(self) -> f64 {
        (self.0 * (180.0 / PI)).rem_euclid(360.0)
    }

    pub fn radians(self) -> f64 {
        self.0
    }

    /// Equivalent angle in `(-PI, PI]`.
    pub fn normalized(self) -> Angle {
        let a = self.0.rem_euclid(2.0 * PI);
        if a > PI {
            Angle(a - 2.0 * PI)
        } else {
            Angle(a)
        }
    }
}

impl Neg for Angle {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Angle(-self.0)
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Angle {
    type Output = Angle;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl From<Angle> for f64 {
    fn from(value: Angle) -> Self {
        value.0
    }
}

impl From<Angle> for f32 {
    fn from(value: Angle) -> Self {
        value.0 as f32
    }
}

/// Linear velocity in mm/s.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Velocity(f64);

impl Velocity {
    pub fn new(velocity: f64) -> Self {
        Self(velocity)
    }
}

impl Add for Velocity {
    type Output = Velocity;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl From<Velocity> for f64 {
    fn from(value: Velocity) -> Self {
        value.0
    }
}

/// Position and heading of a body on the field.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Pose {
    pub position: Position,
    pub heading: Angle,
}

impl Pose {
    pub fn new(position: Position, heading: Angle) -> Self {
        Self { position, heading }
    }

    /// Interpolates position linearly and heading along the shorter arc.
    pub fn lerp(&self, other: Pose, t: f64) -> Pose {
        let turn = (other.heading - self.heading).normalized();
        Pose {
            position: self.position.lerp(other.position, t),
            heading: self.heading + turn * t,
        }
    }
}
