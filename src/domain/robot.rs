//! Differential drive robot with two driven wheels and a set of mounted sensors.

use std::{collections::BTreeMap, slice::Iter, time::Duration};

use nalgebra::{Matrix2, Vector2};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    Angle, ColorSensor, GameMap, GyroSensor, HasCollision, Pose, Position, Reading, Rgb, Sensor,
    SensorKind, Shape, TouchSensor, UltrasonicSensor, Velocity,
};

/// Below this angular velocity (rad/s) the robot is treated as driving straight.
const STRAIGHT_EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq)]
pub struct Robot {
    pose: Pose,
    initial_pose: Pose,
    motors: BTreeMap<Side, Motor>,
    distance_travelled: f64,
    rotation_travelled: f64,
    sensors: BTreeMap<String, Sensor>,
    config: RobotConfig,
}

impl Robot {
    /// Robot at `pose` carrying the standard sensor set.
    pub fn new(pose: Pose, config: RobotConfig) -> Self {
        let sensors = default_sensors(&config);
        Self {
            pose,
            initial_pose: pose,
            motors: BTreeMap::from_iter(Side::iter().map(|side| (*side, Motor::default()))),
            distance_travelled: 0.0,
            rotation_travelled: 0.0,
            sensors,
            config,
        }
    }

    pub fn without_sensors(self) -> Self {
        Self {
            sensors: BTreeMap::new(),
            ..self
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn initial_pose(&self) -> Pose {
        self.initial_pose
    }

    pub fn position(&self) -> Position {
        self.pose.position
    }

    pub fn heading(&self) -> Angle {
        self.pose.heading
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    /// Path length driven since the last reset, in mm.
    pub fn distance_travelled(&self) -> f64 {
        self.distance_travelled
    }

    /// Total absolute rotation since the last reset, in degrees.
    pub fn rotation_travelled(&self) -> f64 {
        self.rotation_travelled
    }

    /// Moves the robot without driving and makes `pose` the new reset pose.
    pub fn place(&mut self, pose: Pose) {
        self.pose = pose;
        self.initial_pose = pose;
    }

    pub fn motor_speed(&self, side: Side) -> f64 {
        self.motors[&side].speed
    }

    pub fn motor_target(&self, side: Side) -> f64 {
        self.motors[&side].target
    }

    pub fn wheel_rotation(&self, side: Side) -> Angle {
        self.motors[&side].rotation
    }

    pub fn wheel_velocity(&self, side: Side) -> Velocity {
        Velocity::new(self.v(side))
    }

    /// Sets the target speeds in percent of `max_speed`, clamped to `[-100, 100]`.
    pub fn set_motor_speeds(&mut self, left: f64, right: f64) {
        for (side, target) in [(Side::Left, left), (Side::Right, right)] {
            if let Some(motor) = self.motors.get_mut(&side) {
                motor.target = target.clamp(-100.0, 100.0);
            }
        }
    }

    pub fn stop_motors(&mut self) {
        self.set_motor_speeds(0.0, 0.0);
    }

    pub fn is_stopped(&self) -> bool {
        self.motors
            .values()
            .all(|m| m.speed.abs() < f64::EPSILON && m.target.abs() < f64::EPSILON)
    }

    /// Ramps the actual motor speeds towards their targets within the acceleration limit.
    pub fn update_motor_speeds(&mut self, dt: Duration) {
        let max_change =
            self.config.acceleration * dt.as_secs_f64() / self.config.max_speed * 100.0;
        for motor in self.motors.values_mut() {
            motor.speed += (motor.target - motor.speed).clamp(-max_change, max_change);
        }
    }

    pub fn linear_velocity(&self) -> Velocity {
        Velocity::new(self.velocity_vector()[0])
    }

    /// Angular velocity in rad/s, counter-clockwise positive.
    pub fn angular_velocity(&self) -> f64 {
        self.velocity_vector()[1]
    }

    /// Copy of the robot after driving for `dt` with the current motor speeds.
    pub fn updated_pose(&self, dt: Duration) -> Robot {
        let mut robot = self.clone();
        robot.spin_wheels(dt);
        robot.advance_to(self.next_pose(dt));
        robot
    }

    /// Pose reached after `dt` when both wheel speeds stay constant.
    pub fn next_pose(&self, dt: Duration) -> Pose {
        let q = self.velocity_vector();
        let (v, omega) = (q[0], q[1]);
        let dt = dt.as_secs_f64();
        let Pose { position, heading } = self.pose;

        if omega.abs() < STRAIGHT_EPSILON {
            return Pose::new(position + Position::unit(heading) * (v * dt), heading);
        }

        let radius = v / omega;
        let new_heading = heading + Angle::new(omega * dt);
        let (sin, cos) = heading.radians().sin_cos();
        let (new_sin, new_cos) = new_heading.radians().sin_cos();
        Pose::new(
            position + Position::new(radius * (new_sin - sin), -radius * (new_cos - cos)),
            new_heading,
        )
    }

    /// Commits `pose` and accumulates both odometers.
    pub fn advance_to(&mut self, pose: Pose) {
        self.distance_travelled += self.pose.position.distance(pose.position);
        self.rotation_travelled += (pose.heading - self.pose.heading)
            .normalized()
            .radians()
            .abs()
            .to_degrees();
        self.pose = pose;
    }

    pub fn spin_wheels(&mut self, dt: Duration) {
        let radius = self.config.wheel_radius();
        let dt = dt.as_secs_f64();
        for side in Side::iter() {
            let v = self.v(*side);
            if let Some(motor) = self.motors.get_mut(side) {
                motor.rotation = motor.rotation + Angle::new(v / radius * dt);
            }
        }
    }

    /// Footprint of the robot if it stood at `pose`.
    pub fn shape_at(&self, pose: Pose) -> Shape {
        Shape::Rectangle {
            position: pose.position,
            x_length: self.config.length,
            y_length: self.config.width,
            angle: pose.heading,
        }
    }

    pub fn sensors(&self) -> &BTreeMap<String, Sensor> {
        &self.sensors
    }

    pub fn sensor(&self, name: &str) -> Option<&Sensor> {
        self.sensors.get(name)
    }

    pub fn sensor_mut(&mut self, name: &str) -> Option<&mut Sensor> {
        self.sensors.get_mut(name)
    }

    pub fn add_sensor(&mut self, name: impl Into<String>, sensor: Sensor) {
        self.sensors.insert(name.into(), sensor);
    }

    pub fn remove_sensor(&mut self, name: &str) -> Result<Sensor, RobotError> {
        self.sensors
            .remove(name)
            .ok_or_else(|| RobotError::UnknownSensor(name.to_string()))
    }

    pub fn sensor_reading(&self, name: &str) -> Result<Reading, RobotError> {
        if let Some(sensor) = self.sensors.get(name) {
            Ok(sensor.reading())
        } else {
            Err(RobotError::UnknownSensor(name.to_string()))
        }
    }

    pub fn set_sensor_enabled(&mut self, name: &str, enabled: bool) -> Result<(), RobotError> {
        if let Some(sensor) = self.sensors.get_mut(name) {
            if enabled {
                sensor.enable();
            } else {
                sensor.disable();
            }
            Ok(())
        } else {
            Err(RobotError::UnknownSensor(name.to_string()))
        }
    }

    pub fn readings(&self) -> BTreeMap<String, Reading> {
        self.sensors
            .iter()
            .map(|(name, sensor)| (name.clone(), sensor.reading()))
            .collect()
    }

    pub fn update_sensors(&mut self, map: &GameMap, time: f64, rng: &mut ChaCha8Rng, dt: Duration) {
        let pose = self.pose;
        let dt = dt.as_secs_f64();
        for sensor in self.sensors.values_mut() {
            sensor.update(pose, map, time, rng, dt);
        }
    }

    /// Back to the initial pose with motors, odometers and sensors cleared.
    pub fn reset(&mut self) {
        self.pose = self.initial_pose;
        self.motors.values_mut().for_each(|m| *m = Motor::default());
        self.distance_travelled = 0.0;
        self.rotation_travelled = 0.0;
        self.sensors.values_mut().for_each(Sensor::reset);
    }

    /// Linear velocity (mm/s) and angular velocity (rad/s) from the two wheel velocities.
    fn velocity_vector(&self) -> Vector2<f64> {
        let b = self.config.wheel_base;
        let j = Matrix2::new(0.5, 0.5, -1.0 / b, 1.0 / b);
        let q = j * Vector2::new(self.v(Side::Left), self.v(Side::Right));
        let max_omega = self.config.max_angular_velocity.to_radians();
        Vector2::new(q[0], q[1].clamp(-max_omega, max_omega))
    }

    fn v(&self, side: Side) -> f64 {
        self.motors[&side].speed / 100.0 * self.config.max_speed
    }
}

impl HasCollision for Robot {
    fn shape(&self) -> Shape {
        self.shape_at(self.pose)
    }
}

fn default_sensors(config: &RobotConfig) -> BTreeMap<String, Sensor> {
    let front = config.length / 2.0;
    let side = config.width / 2.0;
    BTreeMap::from([
        (
            "color_down".to_string(),
            Sensor::new(
                SensorKind::Color(ColorSensor::default()),
                Position::new(20.0, 0.0),
                Angle::default(),
            ),
        ),
        (
            "ultrasonic_front".to_string(),
            Sensor::new(
                SensorKind::Ultrasonic(UltrasonicSensor::default()),
                Position::new(front, 0.0),
                Angle::default(),
            ),
        ),
        (
            "gyro".to_string(),
            Sensor::new(
                SensorKind::Gyro(GyroSensor::default()),
                Position::default(),
                Angle::default(),
            ),
        ),
        (
            "touch_left".to_string(),
            Sensor::new(
                SensorKind::Touch(TouchSensor::default()),
                Position::new(front, side),
                Angle::from_deg(45.0),
            ),
        ),
        (
            "touch_right".to_string(),
            Sensor::new(
                SensorKind::Touch(TouchSensor::default()),
                Position::new(front, -side),
                Angle::from_deg(-45.0),
            ),
        ),
    ])
}

#[derive(Error, Debug, PartialEq)]
pub enum RobotError {
    #[error("unknown sensor {0:?}")]
    UnknownSensor(String),
    #[error("invalid robot configuration: {0}")]
    InvalidConfig(String),
}

/// Distances in mm, speeds in mm/s, angular velocity in degrees per second. The robot's front is
/// facing along its positive x-axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub width: f64,
    pub length: f64,
    /// In kg.
    pub mass: f64,
    pub wheel_diameter: f64,
    /// Distance between the two wheel contact points.
    pub wheel_base: f64,
    pub max_speed: f64,
    pub max_angular_velocity: f64,
    pub acceleration: f64,
    pub friction: f64,
    pub restitution: f64,
    pub color: Rgb,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            width: 180.0,
            length: 200.0,
            mass: 1.0,
            wheel_diameter: 56.0,
            wheel_base: 160.0,
            max_speed: 500.0,
            max_angular_velocity: 360.0,
            acceleration: 1000.0,
            friction: 0.7,
            restitution: 0.1,
            color: Rgb([255, 200, 0]),
        }
    }
}

impl RobotConfig {
    pub fn wheel_radius(&self) -> f64 {
        self.wheel_diameter / 2.0
    }

    pub fn validate(&self) -> Result<(), RobotError> {
        let positive = [
            ("width", self.width),
            ("length", self.length),
            ("mass", self.mass),
            ("wheel_diameter", self.wheel_diameter),
            ("wheel_base", self.wheel_base),
            ("max_speed", self.max_speed),
            ("max_angular_velocity", self.max_angular_velocity),
            ("acceleration", self.acceleration),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| v.is_nan() || *v <= 0.0) {
            return Err(RobotError::InvalidConfig(format!(
                "{name} must be positive, got {value}"
            )));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(RobotError::InvalidConfig(format!(
                "restitution must be within [0, 1], got {}",
                self.restitution
            )));
        }
        if self.friction < 0.0 {
            return Err(RobotError::InvalidConfig(format!(
                "friction must not be negative, got {}",
                self.friction
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn iter() -> Iter<'static, Side> {
        static SIDES: [Side; 2] = [Side::Left, Side::Right];
        SIDES.iter()
    }
}

/// Speeds in percent of the configured maximum speed.
#[derive(Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Motor {
    speed: f64,
    target: f64,
    rotation: Angle,
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const EPSILON: f64 = 1e-9;

    fn robot(heading: f64) -> Robot {
        Robot::new(
            Pose::new(Position::default(), Angle::new(heading)),
            RobotConfig::default(),
        )
    }

    fn set_speeds(robot: &mut Robot, left: f64, right: f64) {
        robot.set_motor_speeds(left, right);
        for motor in robot.motors.values_mut() {
            motor.speed = motor.target;
        }
    }

    #[rstest]
    #[case::up(             0.5 * PI, 100.0, 1.0, (   0.0,  500.0) )]
    #[case::down(           1.5 * PI, 100.0, 1.0, (   0.0, -500.0) )]
    #[case::left(                 PI, 100.0, 1.0, (-500.0,    0.0) )]
    #[case::right(               0.0, 100.0, 1.0, ( 500.0,    0.0) )]
    #[case::double_time(         0.0, 100.0, 2.0, (1000.0,    0.0) )]
    #[case::half_speed(          0.0,  50.0, 1.0, ( 250.0,    0.0) )]
    #[case::backwards(           0.0, -50.0, 1.0, (-250.0,    0.0) )]
    fn test_robot_updated_pose_straight(
        #[case] heading: f64,
        #[case] speed: f64,
        #[case] time: f64,
        #[case] position: (f64, f64),
    ) {
        let mut robot = robot(heading);
        set_speeds(&mut robot, speed, speed);
        let robot = robot.updated_pose(Duration::from_secs_f64(time));
        assert_abs_diff_eq!(robot.position(), Position::from(position), epsilon = EPSILON);
        assert_abs_diff_eq!(robot.heading().radians(), heading, epsilon = EPSILON);
        assert_abs_diff_eq!(
            robot.distance_travelled(),
            speed.abs() / 100.0 * 500.0 * time,
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_robot_spin_in_place() {
        let mut robot = robot(0.0);
        set_speeds(&mut robot, -50.0, 50.0);
        assert_abs_diff_eq!(robot.linear_velocity(), Velocity::new(0.0));
        assert_abs_diff_eq!(robot.angular_velocity(), 500.0 / 160.0, epsilon = EPSILON);

        let moved = robot.updated_pose(Duration::from_millis(100));
        assert_abs_diff_eq!(moved.position(), Position::default(), epsilon = EPSILON);
        assert_abs_diff_eq!(moved.heading().radians(), 0.3125, epsilon = EPSILON);
        assert_abs_diff_eq!(moved.rotation_travelled(), 0.3125_f64.to_degrees(), epsilon = EPSILON);
    }

    #[test]
    fn test_robot_angular_velocity_is_capped() {
        let mut robot = Robot::new(
            Pose::default(),
            RobotConfig {
                max_angular_velocity: 90.0,
                ..RobotConfig::default()
            },
        );
        set_speeds(&mut robot, -100.0, 100.0);
        assert_abs_diff_eq!(robot.angular_velocity(), 0.5 * PI, epsilon = EPSILON);
        let moved = robot.updated_pose(Duration::from_secs(1));
        assert_abs_diff_eq!(moved.heading().radians(), 0.5 * PI, epsilon = EPSILON);
    }

    #[test]
    fn test_robot_quarter_arc() {
        let mut robot = robot(0.0);
        set_speeds(&mut robot, 25.0, 75.0);
        let omega = robot.angular_velocity();
        assert_abs_diff_eq!(omega, 250.0 / 160.0, epsilon = EPSILON);

        let moved = robot.updated_pose(Duration::from_secs_f64(0.5 * PI / omega));
        assert_abs_diff_eq!(moved.position(), Position::new(160.0, 160.0), epsilon = 1e-6);
        assert_abs_diff_eq!(moved.heading().radians(), 0.5 * PI, epsilon = 1e-6);
    }

    #[test]
    fn test_robot_arc_integration_matches_small_steps() {
        let mut robot = robot(0.3);
        set_speeds(&mut robot, 40.0, 70.0);
        let once = robot.next_pose(Duration::from_secs(1));
        let mut stepped = robot.clone();
        for _ in 0..10 {
            stepped = stepped.updated_pose(Duration::from_millis(100));
        }
        assert_abs_diff_eq!(stepped.position(), once.position, epsilon = 1e-6);
        assert_abs_diff_eq!(stepped.heading(), once.heading, epsilon = 1e-9);
    }

    #[test]
    fn test_robot_motor_ramp() {
        let mut robot = robot(0.0);
        robot.set_motor_speeds(100.0, -40.0);
        robot.update_motor_speeds(Duration::from_millis(100));
        assert_abs_diff_eq!(robot.motor_speed(Side::Left), 20.0, epsilon = EPSILON);
        assert_abs_diff_eq!(robot.motor_speed(Side::Right), -20.0, epsilon = EPSILON);

        for _ in 0..4 {
            robot.update_motor_speeds(Duration::from_millis(100));
        }
        assert_abs_diff_eq!(robot.motor_speed(Side::Left), 100.0, epsilon = EPSILON);
        assert_abs_diff_eq!(robot.motor_speed(Side::Right), -40.0, epsilon = EPSILON);
        assert!(!robot.is_stopped());
    }

    #[rstest]
    #[case(150.0, -150.0, 100.0, -100.0)]
    #[case(30.0, 60.0, 30.0, 60.0)]
    fn test_robot_set_motor_speeds_clamps(
        #[case] left: f64,
        #[case] right: f64,
        #[case] expected_left: f64,
        #[case] expected_right: f64,
    ) {
        let mut robot = robot(0.0);
        robot.set_motor_speeds(left, right);
        assert_abs_diff_eq!(robot.motor_target(Side::Left), expected_left);
        assert_abs_diff_eq!(robot.motor_target(Side::Right), expected_right);
    }

    #[test]
    fn test_robot_wheel_rotation() {
        let mut robot = robot(0.0);
        set_speeds(&mut robot, 56.0 * PI / 5.0, 0.0);
        let moved = robot.updated_pose(Duration::from_secs(1));
        // 56 pi mm/s on a 56 mm wheel is one revolution per second
        assert_abs_diff_eq!(
            moved.wheel_rotation(Side::Left).radians(),
            2.0 * PI,
            epsilon = EPSILON
        );
        assert_abs_diff_eq!(moved.wheel_rotation(Side::Right).radians(), 0.0);
    }

    #[test]
    fn test_robot_advance_to_odometry() {
        let mut robot = robot(0.0);
        robot.advance_to(Pose::new(Position::new(300.0, 400.0), Angle::from_deg(90.0)));
        robot.advance_to(Pose::new(Position::new(300.0, 400.0), Angle::from_deg(-90.0)));
        assert_abs_diff_eq!(robot.distance_travelled(), 500.0, epsilon = EPSILON);
        assert_abs_diff_eq!(robot.rotation_travelled(), 270.0, epsilon = EPSILON);
    }

    #[test]
    fn test_robot_shape() {
        let robot = Robot::new(
            Pose::new(Position::new(10.0, 20.0), Angle::from_deg(90.0)),
            RobotConfig::default(),
        );
        let (min, max) = robot.shape().bounds();
        assert_abs_diff_eq!(min, Position::new(-80.0, -80.0), epsilon = EPSILON);
        assert_abs_diff_eq!(max, Position::new(100.0, 120.0), epsilon = EPSILON);
    }

    #[test]
    fn test_robot_default_sensors() {
        let robot = robot(0.0);
        assert_eq!(
            robot.sensors().keys().cloned().collect::<Vec<_>>(),
            vec!["color_down", "gyro", "touch_left", "touch_right", "ultrasonic_front"]
        );
        let touch = robot.sensor("touch_right").unwrap();
        assert_abs_diff_eq!(touch.position(), Position::new(100.0, -90.0));
        assert_abs_diff_eq!(touch.direction().to_deg(), 315.0, epsilon = EPSILON);
        assert!(robot.without_sensors().sensors().is_empty());
    }

    #[test]
    fn test_robot_unknown_sensor() {
        let mut robot = robot(0.0);
        assert_eq!(
            robot.sensor_reading("camera"),
            Err(RobotError::UnknownSensor("camera".to_string()))
        );
        assert!(robot.set_sensor_enabled("camera", false).is_err());
        assert!(robot.set_sensor_enabled("gyro", false).is_ok());
        assert!(!robot.sensor("gyro").unwrap().is_enabled());
        assert!(robot.remove_sensor("gyro").is_ok());
        assert!(robot.sensor("gyro").is_none());
    }

    #[test]
    fn test_robot_reset() {
        let mut robot = robot(0.0);
        set_speeds(&mut robot, 50.0, 60.0);
        robot = robot.updated_pose(Duration::from_secs(1));
        robot.reset();
        assert_eq!(robot.pose(), robot.initial_pose());
        assert!(robot.is_stopped());
        assert_abs_diff_eq!(robot.distance_travelled(), 0.0);
        assert_abs_diff_eq!(robot.rotation_travelled(), 0.0);
    }

    #[rstest]
    #[case::zero_wheel_base(RobotConfig { wheel_base: 0.0, ..RobotConfig::default() })]
    #[case::negative_mass(RobotConfig { mass: -1.0, ..RobotConfig::default() })]
    #[case::nan_speed(RobotConfig { max_speed: f64::NAN, ..RobotConfig::default() })]
    #[case::restitution(RobotConfig { restitution: 1.5, ..RobotConfig::default() })]
    fn test_robot_config_validate_rejects(#[case] config: RobotConfig) {
        assert!(matches!(config.validate(), Err(RobotError::InvalidConfig(_))));
    }

    #[test]
    fn test_robot_config_from_yaml() {
        let config: RobotConfig = serde_yaml::from_str("width: 150\nmass: 1.5\n").unwrap();
        assert_abs_diff_eq!(config.width, 150.0);
        assert_abs_diff_eq!(config.mass, 1.5);
        assert_abs_diff_eq!(config.wheel_base, 160.0);
        assert!(config.validate().is_ok());
    }

    impl approx::AbsDiffEq for Velocity {
        type Epsilon = f64;

        fn default_epsilon() -> f64 {
            f64::EPSILON
        }

        fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
            f64::abs_diff_eq(&f64::from(*self), &f64::from(*other), epsilon)
        }
    }
}
