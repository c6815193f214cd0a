use super::{Reading, SensorContext, SensorModel};
use crate::domain::Shape;

/// Bump switch pressed by any obstacle within its detection radius.
#[derive(Clone, Debug, PartialEq)]
pub struct TouchSensor {
    detection_radius: f64,
    debounce_time: f64,
    pressed: bool,
    previously_pressed: bool,
    press_count: u32,
    last_change: Option<f64>,
}

impl Default for TouchSensor {
    fn default() -> Self {
        Self {
            detection_radius: 5.0,
            debounce_time: 0.1,
            pressed: false,
            previously_pressed: false,
            press_count: 0,
            last_change: None,
        }
    }
}

impl TouchSensor {
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Rising edge in the last sample.
    pub fn was_pressed(&self) -> bool {
        self.pressed && !self.previously_pressed
    }

    /// Falling edge in the last sample.
    pub fn was_released(&self) -> bool {
        !self.pressed && self.previously_pressed
    }

    /// A full press and release cycle just ended.
    pub fn bumped(&self) -> bool {
        self.was_released() && self.press_count > 0
    }

    pub fn press_count(&self) -> u32 {
        self.press_count
    }

    pub fn reset_press_count(&mut self) {
        self.press_count = 0;
    }

    pub fn detection_radius(&self) -> f64 {
        self.detection_radius
    }
}

impl SensorModel for TouchSensor {
    fn sample(&mut self, ctx: &mut SensorContext<'_>, _dt: f64) {
        self.previously_pressed = self.pressed;

        let probe = Shape::Circle {
            position: ctx.position,
            radius: self.detection_radius,
        };
        let contact = ctx.map.has_collision(&probe);
        if contact == self.pressed {
            return;
        }

        let settled = self
            .last_change
            .map_or(true, |t| ctx.time - t >= self.debounce_time);
        if settled {
            self.pressed = contact;
            self.last_change = Some(ctx.time);
            if contact {
                self.press_count += 1;
            }
        }
    }

    fn reading(&self) -> Reading {
        Reading::Touch {
            pressed: self.pressed,
            press_count: self.press_count,
        }
    }

    fn reset(&mut self) {
        *self = Self {
            detection_radius: self.detection_radius,
            debounce_time: self.debounce_time,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::domain::{Angle, GameMap, Position};

    const NEAR_BLOCK: Position = Position::new(-103.0, 0.0);
    const AWAY: Position = Position::new(-300.0, 0.0);

    fn sample(sensor: &mut TouchSensor, map: &GameMap, position: Position, time: f64) {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut ctx = SensorContext {
            map,
            position,
            direction: Angle::default(),
            robot_heading: Angle::default(),
            time,
            rng: &mut rng,
        };
        sensor.sample(&mut ctx, 0.02);
    }

    #[test]
    fn test_touch_press_and_release() {
        let map = GameMap::demo();
        let mut sensor = TouchSensor::default();

        sample(&mut sensor, &map, AWAY, 0.0);
        assert!(!sensor.is_pressed());

        sample(&mut sensor, &map, NEAR_BLOCK, 0.02);
        assert!(sensor.is_pressed());
        assert!(sensor.was_pressed());
        assert_eq!(sensor.press_count(), 1);

        sample(&mut sensor, &map, NEAR_BLOCK, 0.04);
        assert!(sensor.is_pressed());
        assert!(!sensor.was_pressed());

        sample(&mut sensor, &map, AWAY, 0.20);
        assert!(!sensor.is_pressed());
        assert!(sensor.was_released());
        assert!(sensor.bumped());
    }

    #[test]
    fn test_touch_debounce() {
        let map = GameMap::demo();
        let mut sensor = TouchSensor::default();

        sample(&mut sensor, &map, NEAR_BLOCK, 0.0);
        assert_eq!(sensor.press_count(), 1);

        sample(&mut sensor, &map, AWAY, 0.05);
        assert!(sensor.is_pressed());

        sample(&mut sensor, &map, AWAY, 0.10);
        assert!(!sensor.is_pressed());

        sample(&mut sensor, &map, NEAR_BLOCK, 0.15);
        assert!(!sensor.is_pressed());

        sample(&mut sensor, &map, NEAR_BLOCK, 0.25);
        assert!(sensor.is_pressed());
        assert_eq!(sensor.press_count(), 2);

        sensor.reset_press_count();
        assert_eq!(sensor.press_count(), 0);
    }

    #[test]
    fn test_touch_reset() {
        let map = GameMap::demo();
        let mut sensor = TouchSensor::default();
        sample(&mut sensor, &map, NEAR_BLOCK, 0.0);
        sensor.reset();
        assert_eq!(sensor, TouchSensor::default());
    }
}
