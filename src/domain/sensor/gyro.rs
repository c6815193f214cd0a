use super::{Reading, SensorContext, SensorModel};
use crate::domain::Angle;

/// Heading sensor integrating the robot's rotation, with drift and noise.
#[derive(Clone, Debug, PartialEq)]
pub struct GyroSensor {
    /// Accumulated angle in degrees, not wrapped.
    angle: f64,
    rate: f64,
    calibration_offset: f64,
    accumulated_drift: f64,
    drift_rate: f64,
    angle_noise: f64,
    rate_noise: f64,
    previous_heading: Option<Angle>,
}

impl Default for GyroSensor {
    fn default() -> Self {
        Self {
            angle: 0.0,
            rate: 0.0,
            calibration_offset: 0.0,
            accumulated_drift: 0.0,
            drift_rate: 0.1,
            angle_noise: 0.1,
            rate_noise: 0.5,
            previous_heading: None,
        }
    }
}

impl GyroSensor {
    /// Sensor without drift or noise.
    pub fn ideal() -> Self {
        Self {
            drift_rate: 0.0,
            angle_noise: 0.0,
            rate_noise: 0.0,
            ..Self::default()
        }
    }

    pub fn with_drift_rate(self, drift_rate: f64) -> Self {
        Self { drift_rate, ..self }
    }

    /// Heading in degrees in `[0, 360)` relative to the last calibration.
    pub fn angle(&self) -> f64 {
        (self.angle - self.calibration_offset).rem_euclid(360.0)
    }

    /// Angular velocity in degrees per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn accumulated_drift(&self) -> f64 {
        self.accumulated_drift
    }

    /// Makes the current heading the zero reference.
    pub fn calibrate(&mut self) {
        self.calibration_offset = self.angle;
        self.accumulated_drift = 0.0;
    }

    pub fn reset_angle(&mut self) {
        self.angle = 0.0;
        self.calibration_offset = 0.0;
        self.accumulated_drift = 0.0;
    }

    /// Signed turn in `(-180, 180]` degrees from the current heading to `target`.
    pub fn relative_heading(&self, target: f64) -> f64 {
        let diff = (target - self.angle()).rem_euclid(360.0);
        if diff > 180.0 {
            diff - 360.0
        } else {
            diff
        }
    }

    pub fn has_rotated(&self, threshold: f64) -> bool {
        self.rate.abs() > threshold
    }

    pub fn rotation_stopped(&self, threshold: f64) -> bool {
        self.rate.abs() < threshold
    }

    pub fn at_heading(&self, target: f64, tolerance: f64) -> bool {
        self.relative_heading(target).abs() <= tolerance
    }
}

impl SensorModel for GyroSensor {
    fn sample(&mut self, ctx: &mut SensorContext<'_>, dt: f64) {
        let heading = ctx.robot_heading;
        let Some(previous) = self.previous_heading.replace(heading) else {
            return;
        };

        let change = (heading - previous).normalized().radians().to_degrees();
        self.rate = if dt > 0.0 { change / dt } else { 0.0 };
        self.angle += change;

        let drift = self.drift_rate * dt;
        self.accumulated_drift += drift;
        self.angle += drift;

        self.angle += ctx.noise(self.angle_noise) * dt;
        self.rate += ctx.noise(self.rate_noise);
    }

    fn reading(&self) -> Reading {
        Reading::Angle {
            degrees: self.angle(),
            rate: self.rate,
        }
    }

    fn reset(&mut self) {
        *self = Self {
            drift_rate: self.drift_rate,
            angle_noise: self.angle_noise,
            rate_noise: self.rate_noise,
            ..Self::default()
        };
    }
}
