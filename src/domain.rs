//! The domain module encapsulates the core business logic. It defines the `Robot`, `GameMap`,
//! `Mission` and `Sensor` entities, along with the rules governing their interactions.
//!
//! By minimizing hard dependencies, this module ensures the business logic remains adaptable and
//! independent of specific implementation details. Only plain configuration records derive serde
//! traits.

mod basis;
mod collision;
mod game_map;
mod mission;
mod robot;
mod sensor;

pub use basis::{Angle, Pose, Position, Velocity};
pub use collision::{HasCollision, Shape};
pub use game_map::{ColorZone, GameMap, LineSegment, MapConfig, Movability, Obstacle, Rgb};
pub use mission::{
    Area, ConditionKind, Mission, MissionBuilder, MissionCondition, MissionContext, MissionEvent,
    MissionEventKind, MissionState, MissionStatus, MissionType,
};
pub use robot::{Motor, Robot, RobotConfig, RobotError, Side};
pub use sensor::{
    Color, ColorSensor, GyroSensor, Reading, Sensor, SensorContext, SensorKind, SensorModel,
    TouchSensor, UltrasonicSensor,
};
