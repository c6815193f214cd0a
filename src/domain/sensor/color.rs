use serde::{Deserialize, Serialize};

use super::{Reading, SensorContext, SensorModel};
use crate::domain::Rgb;

/// LEGO colour values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    NoColor = 0,
    Black = 1,
    Blue = 2,
    Green = 3,
    Yellow = 4,
    Red = 5,
    White = 6,
    Brown = 7,
}

impl Color {
    const DETECTABLE: [Color; 7] = [
        Color::Black,
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::Red,
        Color::White,
        Color::Brown,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn rgb(self) -> Option<Rgb> {
        match self {
            Color::NoColor => None,
            Color::Black => Some(Rgb([0, 0, 0])),
            Color::Blue => Some(Rgb([0, 0, 255])),
            Color::Green => Some(Rgb([0, 255, 0])),
            Color::Yellow => Some(Rgb([255, 255, 0])),
            Color::Red => Some(Rgb([255, 0, 0])),
            Color::White => Some(Rgb([255, 255, 255])),
            Color::Brown => Some(Rgb([139, 69, 19])),
        }
    }

    /// Nearest detectable colour in RGB space.
    pub fn classify(rgb: Rgb) -> Color {
        Color::DETECTABLE
            .into_iter()
            .min_by_key(|c| c.rgb().map_or(u32::MAX, |reference| rgb.distance_squared(reference)))
            .unwrap_or_default()
    }

    /// Light intensity the colour reflects, in percent.
    pub fn brightness(self) -> f64 {
        match self {
            Color::NoColor => 50.0,
            Color::Black => 5.0,
            Color::Blue => 25.0,
            Color::Green => 45.0,
            Color::Yellow => 85.0,
            Color::Red => 35.0,
            Color::White => 95.0,
            Color::Brown => 20.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColorSensor {
    color: Color,
    ambient_light: f64,
    reflected_light: f64,
    noise: f64,
}

impl Default for ColorSensor {
    fn default() -> Self {
        Self {
            color: Color::NoColor,
            ambient_light: 50.0,
            reflected_light: 50.0,
            noise: 5.0,
        }
    }
}

impl ColorSensor {
    /// Sets the amplitude of the light noise in percent.
    pub fn with_noise(self, noise: f64) -> Self {
        Self {
            noise: noise.max(0.0),
            ..self
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn color_id(&self) -> u8 {
        self.color.id()
    }

    pub fn rgb(&self) -> Rgb {
        self.color.rgb().unwrap_or(Rgb::BLACK)
    }

    pub fn ambient_light(&self) -> f64 {
        self.ambient_light
    }

    pub fn reflected_light(&self) -> f64 {
        self.reflected_light
    }

    pub fn calibrate_white(&mut self) {
        self.color = Color::White;
        self.reflected_light = Color::White.brightness();
    }

    pub fn calibrate_black(&mut self) {
        self.color = Color::Black;
        self.reflected_light = Color::Black.brightness();
    }
}

impl SensorModel for ColorSensor {
    fn sample(&mut self, ctx: &mut SensorContext<'_>, _dt: f64) {
        self.color = Color::classify(ctx.map.color_at(ctx.position));
        let brightness = self.color.brightness();
        let variation = ctx.noise(self.noise);
        self.ambient_light = (brightness + variation).clamp(0.0, 100.0);
        self.reflected_light = (brightness + variation * 0.5).clamp(0.0, 100.0);
    }

    fn reading(&self) -> Reading {
        Reading::Color {
            color: self.color,
            reflected: self.reflected_light,
            ambient: self.ambient_light,
        }
    }

    fn reset(&mut self) {
        *self = Self {
            noise: self.noise,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    use super::*;
    use crate::domain::{Angle, GameMap, Position};

    fn sample(sensor: &mut ColorSensor, position: Position, seed: u64) {
        let map = GameMap::demo();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut ctx = SensorContext {
            map: &map,
            position,
            direction: Angle::default(),
            robot_heading: Angle::default(),
            time: 0.0,
            rng: &mut rng,
        };
        sensor.sample(&mut ctx, 0.1);
    }

    #[rstest]
    #[case(Rgb([0, 0, 0]), Color::Black)]
    #[case(Rgb([250, 250, 250]), Color::White)]
    #[case(Rgb([200, 30, 20]), Color::Red)]
    #[case(Rgb([240, 230, 40]), Color::Yellow)]
    #[case(Rgb([130, 70, 30]), Color::Brown)]
    #[case(Rgb([10, 20, 200]), Color::Blue)]
    fn test_color_classify(#[case] rgb: Rgb, #[case] expected: Color) {
        assert_eq!(Color::classify(rgb), expected);
    }

    #[rstest]
    #[case::red_zone(Position::new(-600.0, -300.0), Color::Red, 35.0)]
    #[case::green_line(Position::new(0.0, 400.0), Color::Green, 45.0)]
    #[case::surface(Position::new(0.0, 0.0), Color::White, 95.0)]
    fn test_color_sensor_sample(
        #[case] position: Position,
        #[case] color: Color,
        #[case] brightness: f64,
    ) {
        let mut sensor = ColorSensor::default().with_noise(0.0);
        sample(&mut sensor, position, 0);
        assert_eq!(sensor.color(), color);
        assert_abs_diff_eq!(sensor.reflected_light(), brightness);
        assert_abs_diff_eq!(sensor.ambient_light(), brightness);
    }

    #[test]
    fn test_color_sensor_noise_bounds() {
        for seed in 0..50 {
            let mut sensor = ColorSensor::default();
            sample(&mut sensor, Position::new(0.0, 0.0), seed);
            let variation = sensor.ambient_light() - 95.0;
            assert!((-5.0..=5.0).contains(&variation));
            assert!(sensor.ambient_light() <= 100.0);
            assert!((sensor.reflected_light() - 95.0).abs() <= 2.5 + 1e-9);
        }
    }

    #[test]
    fn test_color_sensor_calibration() {
        let mut sensor = ColorSensor::default();
        assert_eq!(sensor.color_id(), 0);
        assert_eq!(sensor.rgb(), Rgb::BLACK);

        sensor.calibrate_white();
        assert_eq!(sensor.color(), Color::White);
        assert_abs_diff_eq!(sensor.reflected_light(), 95.0);
        assert_eq!(sensor.color_id(), 6);

        sensor.calibrate_black();
        assert_abs_diff_eq!(sensor.reflected_light(), 5.0);

        sensor.reset();
        assert_eq!(sensor.color(), Color::NoColor);
    }
}
