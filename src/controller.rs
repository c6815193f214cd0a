//! Controller steering the robot.
//!
//! The robot is controlled either by a queue of autonomous commands or by the arrow keys. Keys take
//! precedence while any of them is held; the interrupted command restarts once all keys are
//! released. Motion commands complete on odometry, so a robot held up by an obstacle does not count
//! as having arrived.

use std::{collections::VecDeque, fmt, time::Duration};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::domain::{Robot, RobotConfig, Side};

/// Stopping ramps are simulated for at most this many steps.
const MAX_BRAKING_STEPS: usize = 10_000;

const MANUAL_DRIVE_SPEED: f64 = 60.0;
const MANUAL_TURN_SPEED: f64 = 30.0;

fn default_drive_speed() -> f64 {
    50.0
}

fn default_turn_speed() -> f64 {
    30.0
}

/// Autonomous command. Speeds are motor percentages, positive degrees are counter-clockwise for
/// curves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Forward {
        distance: f64,
        #[serde(default = "default_drive_speed")]
        speed: f64,
    },
    Backward {
        distance: f64,
        #[serde(default = "default_drive_speed")]
        speed: f64,
    },
    TurnLeft {
        degrees: f64,
        #[serde(default = "default_turn_speed")]
        speed: f64,
    },
    TurnRight {
        degrees: f64,
        #[serde(default = "default_turn_speed")]
        speed: f64,
    },
    Curve {
        radius: f64,
        degrees: f64,
        #[serde(default = "default_drive_speed")]
        speed: f64,
    },
    Wait {
        duration: f64,
    },
    Stop,
}

impl Command {
    pub fn forward(distance: f64) -> Self {
        Command::Forward {
            distance,
            speed: default_drive_speed(),
        }
    }

    pub fn backward(distance: f64) -> Self {
        Command::Backward {
            distance,
            speed: default_drive_speed(),
        }
    }

    pub fn turn_left(degrees: f64) -> Self {
        Command::TurnLeft {
            degrees,
            speed: default_turn_speed(),
        }
    }

    pub fn turn_right(degrees: f64) -> Self {
        Command::TurnRight {
            degrees,
            speed: default_turn_speed(),
        }
    }

    /// Motor targets in percent while the command drives.
    fn motor_speeds(&self, config: &RobotConfig) -> (f64, f64) {
        match *self {
            Command::Forward { speed, .. } => (speed.abs(), speed.abs()),
            Command::Backward { speed, .. } => (-speed.abs(), -speed.abs()),
            Command::TurnLeft { speed, .. } => (-speed.abs(), speed.abs()),
            Command::TurnRight { speed, .. } => (speed.abs(), -speed.abs()),
            Command::Curve {
                radius,
                degrees,
                speed,
            } => {
                // Radius zero spins in place, inner wheel reversed.
                let half_track = config.wheel_base / 2.0;
                let radius = radius.abs();
                let outer = speed.abs();
                let inner = outer * (radius - half_track) / (radius + half_track);
                if degrees >= 0.0 {
                    (inner, outer)
                } else {
                    (outer, inner)
                }
            }
            Command::Wait { .. } | Command::Stop => (0.0, 0.0),
        }
    }

    /// Odometer the command is measured with.
    fn goal(&self) -> Option<Goal> {
        match *self {
            Command::Forward { distance, .. } | Command::Backward { distance, .. } => {
                Some(Goal::Distance(distance.abs()))
            }
            Command::TurnLeft { degrees, .. }
            | Command::TurnRight { degrees, .. }
            | Command::Curve { degrees, .. } => Some(Goal::Rotation(degrees.abs())),
            Command::Wait { .. } | Command::Stop => None,
        }
    }

    /// Duration of the command at full commanded speed, ignoring acceleration. Zero for
    /// commands that cannot move, so they stall after the grace period.
    fn expected_duration(&self, config: &RobotConfig) -> f64 {
        let (left, right) = self.motor_speeds(config);
        let (v_left, v_right) = (
            left / 100.0 * config.max_speed,
            right / 100.0 * config.max_speed,
        );
        let v = ((v_left + v_right) / 2.0).abs();
        let omega = ((v_right - v_left) / config.wheel_base)
            .abs()
            .min(config.max_angular_velocity.to_radians())
            .to_degrees();
        match self.goal() {
            Some(Goal::Distance(distance)) if v > 0.0 => distance / v,
            Some(Goal::Rotation(degrees)) if omega > 0.0 => degrees / omega,
            Some(_) => 0.0,
            None => match *self {
                Command::Wait { duration } => duration,
                _ => 0.0,
            },
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Forward { distance, speed } => {
                write!(f, "forward {distance} mm at {speed}%")
            }
            Command::Backward { distance, speed } => {
                write!(f, "backward {distance} mm at {speed}%")
            }
            Command::TurnLeft { degrees, speed } => write!(f, "turn left {degrees}° at {speed}%"),
            Command::TurnRight { degrees, speed } => {
                write!(f, "turn right {degrees}° at {speed}%")
            }
            Command::Curve {
                radius,
                degrees,
                speed,
            } => write!(f, "curve r={radius} mm {degrees}° at {speed}%"),
            Command::Wait { duration } => write!(f, "wait {duration} s"),
            Command::Stop => write!(f, "stop"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Goal {
    /// Path length in mm.
    Distance(f64),
    /// Absolute rotation in degrees.
    Rotation(f64),
}

impl Goal {
    fn travelled(&self, robot: &Robot) -> f64 {
        match self {
            Goal::Distance(_) => robot.distance_travelled(),
            Goal::Rotation(_) => robot.rotation_travelled(),
        }
    }

    fn target(&self) -> f64 {
        match *self {
            Goal::Distance(target) | Goal::Rotation(target) => target,
        }
    }

    /// Odometer change during one step at the current speed.
    fn step(&self, robot: &Robot, dt: f64) -> f64 {
        match self {
            Goal::Distance(_) => f64::from(robot.linear_velocity()).abs() * dt,
            Goal::Rotation(_) => robot.angular_velocity().abs().to_degrees() * dt,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandEvent {
    Started(String),
    Finished(String),
    Stalled(String),
}

#[derive(Clone, Debug, PartialEq)]
struct ActiveCommand {
    command: Command,
    elapsed: f64,
    start: f64,
    braking: bool,
}

/// Raw arrow key state as delivered by the key bit mask.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DriveKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl DriveKeys {
    pub fn from_raw(raw: u16) -> Self {
        Self {
            up: raw & 0x0001 != 0,
            down: raw & 0x0002 != 0,
            left: raw & 0x0004 != 0,
            right: raw & 0x0008 != 0,
        }
    }

    pub fn to_raw(self) -> u16 {
        let mut raw = 0;
        if self.up {
            raw |= 0x0001;
        }
        if self.down {
            raw |= 0x0002;
        }
        if self.left {
            raw |= 0x0004;
        }
        if self.right {
            raw |= 0x0008;
        }
        raw
    }

    pub fn is_empty(self) -> bool {
        self.to_raw() == 0
    }

    /// Left and right motor targets in percent.
    pub fn motor_speeds(self) -> (f64, f64) {
        let forward = match (self.up, self.down) {
            (true, false) => MANUAL_DRIVE_SPEED,
            (false, true) => -MANUAL_DRIVE_SPEED,
            _ => 0.0,
        };
        let turn = match (self.left, self.right) {
            (true, false) => MANUAL_TURN_SPEED,
            (false, true) => -MANUAL_TURN_SPEED,
            _ => 0.0,
        };
        (forward - turn, forward + turn)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Controller {
    queue: VecDeque<Command>,
    active: Option<ActiveCommand>,
    keys: DriveKeys,
    manual: bool,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    pub fn extend(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.queue.extend(commands);
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.active = None;
    }

    pub fn queue(&self) -> &VecDeque<Command> {
        &self.queue
    }

    pub fn active(&self) -> Option<&Command> {
        self.active.as_ref().map(|a| &a.command)
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty() && !self.manual
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn set_keys(&mut self, keys: DriveKeys) {
        self.keys = keys;
    }

    /// Sets the motor targets of `robot` for the next step.
    pub fn update(&mut self, robot: &mut Robot, dt: Duration) -> Vec<CommandEvent> {
        let mut events = vec![];

        if !self.keys.is_empty() {
            if !self.manual {
                self.manual = true;
                if let Some(active) = self.active.take() {
                    debug!("manual control interrupts {}", active.command);
                    self.queue.push_front(active.command);
                }
            }
            let (left, right) = self.keys.motor_speeds();
            robot.set_motor_speeds(left, right);
            return events;
        }

        if self.manual {
            self.manual = false;
            robot.stop_motors();
        }

        if self.active.is_none() {
            let Some(command) = self.queue.pop_front() else {
                return events;
            };
            debug!("starting {command}");
            events.push(CommandEvent::Started(command.to_string()));
            let start = command.goal().map_or(0.0, |g| g.travelled(robot));
            self.active = Some(ActiveCommand {
                command,
                elapsed: 0.0,
                start,
                braking: false,
            });
        }

        let dt = dt.as_secs_f64();
        let Some(active) = self.active.as_mut() else {
            return events;
        };

        let done = match active.command.goal() {
            Some(goal) => {
                let stall_limit = 2.0 * active.command.expected_duration(robot.config()) + 1.0;
                if active.elapsed > stall_limit {
                    warn!(
                        "{} stalled after {:.2} s",
                        active.command, active.elapsed
                    );
                    robot.stop_motors();
                    events.push(CommandEvent::Stalled(active.command.to_string()));
                    self.active = None;
                    return events;
                }

                let remaining = goal.target() - (goal.travelled(robot) - active.start);
                if !active.braking {
                    let coasting = stopping_travel(robot, goal, dt);
                    if coasting + goal.step(robot, dt) / 2.0 >= remaining {
                        active.braking = true;
                    }
                }
                if active.braking {
                    robot.stop_motors();
                    motors_at_rest(robot)
                } else {
                    let (left, right) = active.command.motor_speeds(robot.config());
                    robot.set_motor_speeds(left, right);
                    false
                }
            }
            None => match active.command {
                Command::Wait { duration } => {
                    robot.stop_motors();
                    active.elapsed >= duration
                }
                _ => {
                    robot.stop_motors();
                    true
                }
            },
        };

        active.elapsed += dt;

        if done {
            debug!("finished {} after {:.2} s", active.command, active.elapsed);
            events.push(CommandEvent::Finished(active.command.to_string()));
            self.active = None;
        }

        events
    }
}

fn motors_at_rest(robot: &Robot) -> bool {
    Side::iter().all(|side| robot.motor_speed(*side).abs() < f64::EPSILON)
}

/// Odometer change if the motors were stopped now and ramped down step by step.
fn stopping_travel(robot: &Robot, goal: Goal, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }
    let step = Duration::from_secs_f64(dt);
    let mut ghost = robot.clone().without_sensors();
    let start = goal.travelled(&ghost);
    ghost.stop_motors();
    for _ in 0..MAX_BRAKING_STEPS {
        if motors_at_rest(&ghost) {
            break;
        }
        ghost.update_motor_speeds(step);
        let pose = ghost.next_pose(step);
        ghost.advance_to(pose);
    }
    goal.travelled(&ghost) - start
}

/// Pybricks drive base settings. Speeds in mm/s and deg/s.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PybricksConfig {
    pub wheel_diameter: f64,
    pub axle_track: f64,
    pub use_gyro: bool,
    pub straight_speed: f64,
    pub straight_acceleration: f64,
    pub turn_rate: f64,
    pub turn_acceleration: f64,
}

impl Default for PybricksConfig {
    fn default() -> Self {
        Self {
            wheel_diameter: 56.0,
            axle_track: 160.0,
            use_gyro: false,
            straight_speed: 200.0,
            straight_acceleration: 400.0,
            turn_rate: 100.0,
            turn_acceleration: 300.0,
        }
    }
}

/// Pybricks style drive base translating `straight`, `turn` and `curve` into commands.
///
/// As in Pybricks, positive turn angles are clockwise.
#[derive(Clone, Debug, PartialEq)]
pub struct DriveBase {
    config: PybricksConfig,
    max_speed: f64,
    max_angular_velocity: f64,
    distance_offset: f64,
    heading_offset: f64,
}

impl DriveBase {
    pub fn new(config: PybricksConfig, robot: &RobotConfig) -> Self {
        Self {
            config,
            max_speed: robot.max_speed,
            max_angular_velocity: robot.max_angular_velocity,
            distance_offset: 0.0,
            heading_offset: 0.0,
        }
    }

    pub fn config(&self) -> &PybricksConfig {
        &self.config
    }

    pub fn settings(
        &mut self,
        straight_speed: Option<f64>,
        straight_acceleration: Option<f64>,
        turn_rate: Option<f64>,
        turn_acceleration: Option<f64>,
    ) {
        if let Some(speed) = straight_speed {
            self.config.straight_speed = speed;
        }
        if let Some(acceleration) = straight_acceleration {
            self.config.straight_acceleration = acceleration;
        }
        if let Some(rate) = turn_rate {
            self.config.turn_rate = rate;
        }
        if let Some(acceleration) = turn_acceleration {
            self.config.turn_acceleration = acceleration;
        }
    }

    pub fn straight(&self, distance: f64) -> Command {
        let speed = self.straight_percent();
        if distance >= 0.0 {
            Command::Forward { distance, speed }
        } else {
            Command::Backward {
                distance: -distance,
                speed,
            }
        }
    }

    pub fn turn(&self, angle: f64) -> Command {
        let speed = percent(self.config.turn_rate / self.max_angular_velocity * 100.0);
        if angle >= 0.0 {
            Command::TurnRight {
                degrees: angle,
                speed,
            }
        } else {
            Command::TurnLeft {
                degrees: -angle,
                speed,
            }
        }
    }

    pub fn curve(&self, radius: f64, angle: f64) -> Command {
        Command::Curve {
            radius: radius.abs(),
            degrees: -angle,
            speed: self.straight_percent(),
        }
    }

    /// Drives directly at `speed` mm/s turning at `turn_rate` deg/s clockwise.
    pub fn drive(&self, robot: &mut Robot, speed: f64, turn_rate: f64) {
        let half_track = robot.config().wheel_base / 2.0;
        let turn = turn_rate.to_radians() * half_track;
        robot.set_motor_speeds(
            (speed + turn) / self.max_speed * 100.0,
            (speed - turn) / self.max_speed * 100.0,
        );
    }

    pub fn stop(&self, robot: &mut Robot) {
        robot.stop_motors();
    }

    /// Distance driven since the last `reset`, in mm.
    pub fn distance(&self, robot: &Robot) -> f64 {
        robot.distance_travelled() - self.distance_offset
    }

    /// Clockwise heading change since the last `reset`, in degrees.
    pub fn angle(&self, robot: &Robot) -> f64 {
        -(robot.heading().radians().to_degrees() - self.heading_offset)
    }

    pub fn reset(&mut self, robot: &Robot) {
        self.distance_offset = robot.distance_travelled();
        self.heading_offset = robot.heading().radians().to_degrees();
    }

    fn straight_percent(&self) -> f64 {
        percent(self.config.straight_speed / self.max_speed * 100.0)
    }
}

fn percent(value: f64) -> f64 {
    value.abs().clamp(1.0, 100.0)
}
