//! Test utils.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::domain::{Angle, Pose, Position, Robot, RobotConfig};

/// Default robot standing at `(x, y)` facing `degrees`.
pub fn robot_at(x: f64, y: f64, degrees: f64) -> Robot {
    Robot::new(
        Pose::new(Position::new(x, y), Angle::from_deg(degrees)),
        RobotConfig::default(),
    )
}

pub fn seeded_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}
