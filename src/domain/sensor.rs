//! Sensors mounted on the robot.
//!
//! A [`Sensor`] knows where it sits on the robot and delegates sampling to its model. Models only
//! see the world through a [`SensorContext`], which carries the map, the sensor's world placement,
//! the simulation time and the noise generator.

mod color;
mod gyro;
mod touch;
mod ultrasonic;

pub use color::{Color, ColorSensor};
pub use gyro::GyroSensor;
pub use touch::TouchSensor;
pub use ultrasonic::UltrasonicSensor;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::{Angle, GameMap, Pose, Position};

pub trait SensorModel {
    fn sample(&mut self, ctx: &mut SensorContext<'_>, dt: f64);

    fn reading(&self) -> Reading;

    fn reset(&mut self);
}

pub struct SensorContext<'a> {
    pub map: &'a GameMap,
    /// World position of the sensor.
    pub position: Position,
    /// World direction the sensor faces.
    pub direction: Angle,
    pub robot_heading: Angle,
    /// Simulation time in seconds.
    pub time: f64,
    pub rng: &'a mut ChaCha8Rng,
}

impl SensorContext<'_> {
    /// Uniform noise in `[-magnitude, magnitude]`.
    pub fn noise(&mut self, magnitude: f64) -> f64 {
        if magnitude > 0.0 {
            self.rng.random_range(-magnitude..=magnitude)
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reading {
    Color {
        color: Color,
        reflected: f64,
        ambient: f64,
    },
    Distance {
        mm: f64,
    },
    Angle {
        degrees: f64,
        rate: f64,
    },
    Touch {
        pressed: bool,
        press_count: u32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum SensorKind {
    Color(ColorSensor),
    Ultrasonic(UltrasonicSensor),
    Gyro(GyroSensor),
    Touch(TouchSensor),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sensor {
    position: Position,
    direction: Angle,
    enabled: bool,
    kind: SensorKind,
}

impl Sensor {
    /// Sensor mounted at `position` relative to the robot centre, facing `direction` relative to
    /// the robot heading.
    pub fn new(kind: SensorKind, position: Position, direction: Angle) -> Self {
        Self {
            position,
            direction,
            enabled: true,
            kind,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn direction(&self) -> Angle {
        self.direction
    }

    pub fn kind(&self) -> &SensorKind {
        &self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn world_position(&self, pose: Pose) -> Position {
        pose.position + self.position.rotate_vector(pose.heading)
    }

    pub fn world_direction(&self, pose: Pose) -> Angle {
        pose.heading + self.direction
    }

    pub fn update(
        &mut self,
        pose: Pose,
        map: &GameMap,
        time: f64,
        rng: &mut ChaCha8Rng,
        dt: f64,
    ) {
        if !self.enabled {
            return;
        }
        let mut ctx = SensorContext {
            map,
            position: self.world_position(pose),
            direction: self.world_direction(pose),
            robot_heading: pose.heading,
            time,
            rng,
        };
        self.model_mut().sample(&mut ctx, dt);
    }

    pub fn reading(&self) -> Reading {
        self.model().reading()
    }

    pub fn reset(&mut self) {
        self.model_mut().reset();
    }

    pub fn as_color(&self) -> Option<&ColorSensor> {
        match &self.kind {
            SensorKind::Color(sensor) => Some(sensor),
            _ => None,
        }
    }

    pub fn as_color_mut(&mut self) -> Option<&mut ColorSensor> {
        match &mut self.kind {
            SensorKind::Color(sensor) => Some(sensor),
            _ => None,
        }
    }

    pub fn as_ultrasonic(&self) -> Option<&UltrasonicSensor> {
        match &self.kind {
            SensorKind::Ultrasonic(sensor) => Some(sensor),
            _ => None,
        }
    }

    pub fn as_gyro(&self) -> Option<&GyroSensor> {
        match &self.kind {
            SensorKind::Gyro(sensor) => Some(sensor),
            _ => None,
        }
    }

    pub fn as_gyro_mut(&mut self) -> Option<&mut GyroSensor> {
        match &mut self.kind {
            SensorKind::Gyro(sensor) => Some(sensor),
            _ => None,
        }
    }

    pub fn as_touch(&self) -> Option<&TouchSensor> {
        match &self.kind {
            SensorKind::Touch(sensor) => Some(sensor),
            _ => None,
        }
    }

    pub fn as_touch_mut(&mut self) -> Option<&mut TouchSensor> {
        match &mut self.kind {
            SensorKind::Touch(sensor) => Some(sensor),
            _ => None,
        }
    }

    fn model(&self) -> &dyn SensorModel {
        match &self.kind {
            SensorKind::Color(sensor) => sensor,
            SensorKind::Ultrasonic(sensor) => sensor,
            SensorKind::Gyro(sensor) => sensor,
            SensorKind::Touch(sensor) => sensor,
        }
    }

    fn model_mut(&mut self) -> &mut dyn SensorModel {
        match &mut self.kind {
            SensorKind::Color(sensor) => sensor,
            SensorKind::Ultrasonic(sensor) => sensor,
            SensorKind::Gyro(sensor) => sensor,
            SensorKind::Touch(sensor) => sensor,
        }
    }
}
