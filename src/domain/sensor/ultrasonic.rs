use super::{Reading, SensorContext, SensorModel};
use crate::domain::Angle;

/// Distance sensor casting a fan of rays across its beam.
#[derive(Clone, Debug, PartialEq)]
pub struct UltrasonicSensor {
    max_range: f64,
    beam_width: f64,
    angle_step: f64,
    resolution: f64,
    noise_factor: f64,
    distance: f64,
}

impl Default for UltrasonicSensor {
    fn default() -> Self {
        Self {
            max_range: 2550.0,
            beam_width: 30.0,
            angle_step: 5.0,
            resolution: 1.0,
            noise_factor: 0.02,
            distance: 2550.0,
        }
    }
}

impl UltrasonicSensor {
    pub fn with_noise_factor(self, noise_factor: f64) -> Self {
        Self {
            noise_factor: noise_factor.max(0.0),
            ..self
        }
    }

    pub fn with_beam_width(self, degrees: f64) -> Self {
        Self {
            beam_width: degrees.max(0.0),
            ..self
        }
    }

    pub fn max_range(&self) -> f64 {
        self.max_range
    }

    pub fn beam_width(&self) -> f64 {
        self.beam_width
    }

    /// Measured distance in mm, `max_range` when nothing is in range.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn distance_cm(&self) -> f64 {
        self.distance / 10.0
    }

    pub fn distance_inches(&self) -> f64 {
        self.distance / 25.4
    }

    pub fn is_object_present(&self, threshold: f64) -> bool {
        self.distance < threshold
    }

    fn ray_offsets(&self) -> Vec<f64> {
        let count = ((self.beam_width / self.angle_step) as usize).max(1);
        if count == 1 {
            return vec![0.0];
        }
        (0..count)
            .map(|i| (i as f64 / (count - 1) as f64 - 0.5) * self.beam_width)
            .collect()
    }
}

impl SensorModel for UltrasonicSensor {
    fn sample(&mut self, ctx: &mut SensorContext<'_>, _dt: f64) {
        let nearest = self
            .ray_offsets()
            .into_iter()
            .filter_map(|offset| {
                ctx.map
                    .distance_to_next_obstacle(ctx.position, ctx.direction + Angle::from_deg(offset))
            })
            .fold(self.max_range, f64::min);

        let mut distance = nearest;
        if distance < self.max_range {
            distance += distance * self.noise_factor * ctx.noise(1.0);
        }
        distance = (distance / self.resolution).round() * self.resolution;
        self.distance = distance.clamp(0.0, self.max_range);
    }

    fn reading(&self) -> Reading {
        Reading::Distance { mm: self.distance }
    }

    fn reset(&mut self) {
        self.distance = self.max_range;
    }
}
