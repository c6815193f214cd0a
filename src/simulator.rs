//! Simulation of the robot on a game map.
//!
//! Every step the controller sets the motor targets, the motors ramp towards them and the robot's
//! pose is advanced. Collisions with the field are resolved before the new pose is committed:
//! movable props are pushed along, everything else blocks the robot. Afterwards the sensors sample
//! the updated world and the missions are evaluated.

use std::{collections::BTreeMap, time::Duration};

use log::{debug, info, trace};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{
    config::ConfigError,
    controller::{Command, CommandEvent, Controller, DriveKeys},
    domain::{
        GameMap, HasCollision, MissionEvent, MissionEventKind, MissionState, Obstacle, Pose,
        Position, Reading, Robot, Shape, Side,
    },
};

/// Iterations used to find the furthest collision-free fraction of a blocked step.
const BISECTION_STEPS: usize = 16;

pub const DEFAULT_COMPETITION_TIME: f64 = 150.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub physics_fps: u32,
    /// Seconds per physics step.
    pub physics_dt: f64,
    /// Playback speed relative to wall clock time, 0 runs as fast as possible.
    pub real_time_factor: f64,
    pub seed: Option<u64>,
    pub show_debug_info: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            physics_fps: 60,
            physics_dt: 1.0 / 60.0,
            real_time_factor: 1.0,
            seed: None,
            show_debug_info: false,
        }
    }
}

impl SimulationConfig {
    pub fn dt(&self) -> Duration {
        Duration::from_secs_f64(self.physics_dt)
    }

    /// Wall clock time to wait between two steps, `None` when running unthrottled.
    pub fn frame_delay(&self) -> Option<Duration> {
        (self.real_time_factor > 0.0)
            .then(|| Duration::from_secs_f64(self.physics_dt / self.real_time_factor))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.physics_fps == 0 {
            return Err(ConfigError::Invalid(
                "physics_fps must be positive".to_string(),
            ));
        }
        if self.physics_dt.is_nan() || self.physics_dt <= 0.0 || self.physics_dt > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "physics_dt must be within (0, 1] s, got {}",
                self.physics_dt
            )));
        }
        if self.real_time_factor.is_nan() || self.real_time_factor < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "real_time_factor must not be negative, got {}",
                self.real_time_factor
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    Command(CommandEvent),
    Mission(MissionEvent),
    Collision { obstacle: String },
    CompetitionOver { score: u32 },
}

/// Lifecycle of a run. Stopped is final until `reset`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Running,
    Paused,
    Stopped,
}

impl RunState {
    /// Target state if the transition is allowed.
    fn transition(self, to: RunState) -> Option<RunState> {
        match (self, to) {
            (RunState::Running, RunState::Paused)
            | (RunState::Paused, RunState::Running)
            | (RunState::Running | RunState::Paused, RunState::Stopped) => Some(to),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Competition {
    limit: f64,
    remaining: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RobotState {
    pub x: f64,
    pub y: f64,
    /// Degrees in `[0, 360)`.
    pub heading: f64,
    pub left_motor: f64,
    pub right_motor: f64,
    pub distance_travelled: f64,
}

/// Snapshot of a running simulation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationState {
    pub time: f64,
    pub frame: u64,
    pub run_state: RunState,
    pub robot: RobotState,
    pub sensors: BTreeMap<String, Reading>,
    pub active_command: Option<String>,
    pub queue: Vec<String>,
    pub missions: Vec<MissionState>,
    pub score: u32,
    pub max_score: u32,
    pub competition_time_left: Option<f64>,
}

pub struct Simulator {
    robot: Robot,
    map: GameMap,
    config: SimulationConfig,
    controller: Controller,
    rng: ChaCha8Rng,
    seed: u64,
    time: f64,
    frame: u64,
    run_state: RunState,
    competition: Option<Competition>,
    blocked_by: Vec<usize>,
    trajectory: Vec<Position>,
}

impl Simulator {
    pub fn new(robot: Robot, mut map: GameMap, config: SimulationConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        debug!("simulation seed {seed}");
        for event in map.start_missions(0.0) {
            debug!("mission {} started", event.mission);
        }
        let trajectory = vec![robot.position()];
        Self {
            robot,
            map,
            config,
            controller: Controller::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            time: 0.0,
            frame: 0,
            run_state: RunState::Running,
            competition: None,
            blocked_by: vec![],
            trajectory,
        }
    }

    /// Enables the competition countdown that stops the run when it reaches zero.
    pub fn with_competition(mut self, limit: Option<f64>) -> Self {
        let limit = limit.unwrap_or(DEFAULT_COMPETITION_TIME);
        self.competition = Some(Competition {
            limit,
            remaining: limit,
        });
        self
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn robot_mut(&mut self) -> &mut Robot {
        &mut self.robot
    }

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.run_state == RunState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.run_state == RunState::Stopped
    }

    pub fn trajectory(&self) -> &[Position] {
        &self.trajectory
    }

    pub fn competition_time_left(&self) -> Option<f64> {
        self.competition.as_ref().map(|c| c.remaining)
    }

    pub fn push_command(&mut self, command: Command) {
        self.controller.push(command);
    }

    pub fn push_commands(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.controller.extend(commands);
    }

    /// Applies the raw arrow key bit mask.
    pub fn handle_keys(&mut self, raw: u16) {
        self.controller.set_keys(DriveKeys::from_raw(raw));
    }

    pub fn pause(&mut self) -> bool {
        self.transition(RunState::Paused)
    }

    pub fn resume(&mut self) -> bool {
        self.transition(RunState::Running)
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.run_state {
            RunState::Running => self.pause(),
            RunState::Paused => self.resume(),
            RunState::Stopped => false,
        }
    }

    pub fn stop(&mut self) -> bool {
        if !self.transition(RunState::Stopped) {
            return false;
        }
        self.robot.stop_motors();
        info!("simulation stopped at {:.2} s", self.time);
        true
    }

    /// Moves to `to`, returns false and keeps the state if the transition is not allowed.
    fn transition(&mut self, to: RunState) -> bool {
        match self.run_state.transition(to) {
            Some(state) => {
                debug!("simulation {:?} -> {state:?}", self.run_state);
                self.run_state = state;
                true
            }
            None => {
                debug!("ignoring {:?} -> {to:?}", self.run_state);
                false
            }
        }
    }

    /// Restores robot, map and clock to their initial state and reseeds the noise generator.
    pub fn reset(&mut self) {
        self.robot.reset();
        self.map.reset();
        self.map.start_missions(0.0);
        self.controller.clear();
        self.controller.set_keys(DriveKeys::default());
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.time = 0.0;
        self.frame = 0;
        self.run_state = RunState::Running;
        if let Some(competition) = self.competition.as_mut() {
            competition.remaining = competition.limit;
        }
        self.blocked_by.clear();
        self.trajectory = vec![self.robot.position()];
        info!("simulation reset");
    }

    pub fn step(&mut self, dt: Duration) -> Vec<SimEvent> {
        if !self.is_running() {
            return vec![];
        }

        let mut events: Vec<SimEvent> = self
            .controller
            .update(&mut self.robot, dt)
            .into_iter()
            .map(SimEvent::Command)
            .collect();

        self.robot.update_motor_speeds(dt);
        let candidate = self.robot.updated_pose(dt);
        events.extend(self.resolve_contact(candidate, dt));

        let time = self.time + dt.as_secs_f64();
        self.robot.update_sensors(&self.map, time, &mut self.rng, dt);

        for event in self.map.update_missions(dt.as_secs_f64(), &self.robot, time) {
            match &event.kind {
                MissionEventKind::Completed { points } => {
                    info!("mission {} completed (+{points} points)", event.mission)
                }
                MissionEventKind::Failed { reason } => {
                    info!("mission {} failed: {reason}", event.mission)
                }
                MissionEventKind::TimedOut => info!("mission {} timed out", event.mission),
                _ => {}
            }
            events.push(SimEvent::Mission(event));
        }

        self.time = time;
        self.frame += 1;
        self.trajectory.push(self.robot.position());
        trace!(
            "frame {} t={:.3} pose=({:.1}, {:.1}, {:.1}°)",
            self.frame,
            self.time,
            self.robot.position().x(),
            self.robot.position().y(),
            self.robot.heading().to_deg()
        );

        if let Some(competition) = self.competition.as_mut() {
            competition.remaining = (competition.remaining - dt.as_secs_f64()).max(0.0);
            if competition.remaining <= 0.0 {
                let score = self.map.total_score();
                info!("competition over, score {score}/{}", self.map.max_score());
                self.stop();
                events.push(SimEvent::CompetitionOver { score });
            }
        }

        events
    }

    /// Runs fixed physics steps for `duration` of simulated time.
    pub fn run_for(&mut self, duration: Duration) -> Vec<SimEvent> {
        let dt = self.config.dt();
        let steps = (duration.as_secs_f64() / dt.as_secs_f64()).round() as u64;
        let mut events = vec![];
        for _ in 0..steps {
            if !self.is_running() {
                break;
            }
            events.extend(self.step(dt));
        }
        events
    }

    /// Runs until all commands are done and the robot stands still, at most for `limit`.
    pub fn run_until_idle(&mut self, limit: Duration) -> Vec<SimEvent> {
        let dt = self.config.dt();
        let end = self.time + limit.as_secs_f64();
        let mut events = vec![];
        while self.is_running() && self.time < end {
            events.extend(self.step(dt));
            if self.controller.is_idle() && self.robot.is_stopped() {
                break;
            }
        }
        events
    }

    pub fn state(&self) -> SimulationState {
        let position = self.robot.position();
        SimulationState {
            time: self.time,
            frame: self.frame,
            run_state: self.run_state,
            robot: RobotState {
                x: position.x(),
                y: position.y(),
                heading: self.robot.heading().to_deg(),
                left_motor: self.robot.motor_speed(Side::Left),
                right_motor: self.robot.motor_speed(Side::Right),
                distance_travelled: self.robot.distance_travelled(),
            },
            sensors: self.robot.readings(),
            active_command: self.controller.active().map(ToString::to_string),
            queue: self.controller.queue().iter().map(ToString::to_string).collect(),
            missions: self.map.mission_states(),
            score: self.map.total_score(),
            max_score: self.map.max_score(),
            competition_time_left: self.competition_time_left(),
        }
    }

    /// Commits `candidate` or the part of its motion the field allows.
    fn resolve_contact(&mut self, candidate: Robot, dt: Duration) -> Vec<SimEvent> {
        if self.is_free(&candidate.shape()) {
            self.blocked_by.clear();
            self.robot = candidate;
            return vec![];
        }

        let start = self.robot.pose();
        let target = candidate.pose();
        let free = self.free_fraction(start, target);
        let hits = self.map.colliding_obstacles(&candidate);

        if let Some(fraction) = self.push(start, target, free, &hits) {
            self.blocked_by.clear();
            self.robot.spin_wheels(dt.mul_f64(fraction));
            self.robot.advance_to(start.lerp(target, fraction));
            return vec![];
        }

        self.robot.spin_wheels(dt.mul_f64(free));
        self.robot.advance_to(start.lerp(target, free));

        let events = hits
            .iter()
            .filter(|i| !self.blocked_by.contains(*i))
            .filter_map(|i| self.map.obstacles().get(*i))
            .map(|o| {
                debug!("robot blocked by {} at {:.2} s", o.name(), self.time);
                SimEvent::Collision {
                    obstacle: o.name().to_string(),
                }
            })
            .collect();
        self.blocked_by = hits;
        events
    }

    /// Furthest fraction of the motion from `start` to `target` without contact.
    fn free_fraction(&self, start: Pose, target: Pose) -> f64 {
        let (mut free, mut blocked) = (0.0, 1.0);
        for _ in 0..BISECTION_STEPS {
            let fraction = (free + blocked) / 2.0;
            if self.is_free(&self.robot.shape_at(start.lerp(target, fraction))) {
                free = fraction;
            } else {
                blocked = fraction;
            }
        }
        free
    }

    /// Pushes the obstacles in `hits` if all of them are movable and nothing else is in the way.
    ///
    /// The robot drives freely up to the contact at `free`, the rest of its motion is shared with
    /// the pushed obstacles by mass. Returns the fraction of the motion the robot made.
    fn push(&mut self, start: Pose, target: Pose, free: f64, hits: &[usize]) -> Option<f64> {
        let obstacles = self.map.obstacles();
        let pushed: Vec<&Obstacle> = hits.iter().filter_map(|i| obstacles.get(*i)).collect();
        if pushed.is_empty() || pushed.iter().any(|o| !o.is_movable()) {
            return None;
        }

        let robot_mass = self.robot.config().mass;
        let pushed_mass: f64 = pushed.iter().map(|o| o.mass()).sum();
        let fraction = free + (1.0 - free) * robot_mass / (robot_mass + pushed_mass);
        let contact = start.lerp(target, free);
        let pose = start.lerp(target, fraction);
        let robot_shape = self.robot.shape_at(pose);
        if !self.map.contains(&robot_shape) {
            return None;
        }

        // Turning robots sweep their corners further than their centre.
        let offset = [1.0, 1.5, 2.0]
            .into_iter()
            .map(|factor| (pose.position - contact.position) * factor)
            .find(|offset| {
                let moved: Vec<Shape> = pushed.iter().map(|o| o.shape().translated(*offset)).collect();
                let mut others = obstacles
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !hits.contains(i))
                    .map(|(_, o)| o.shape());
                moved
                    .iter()
                    .all(|m| self.map.contains(m) && !m.has_intersection(&robot_shape))
                    && !others.any(|o| {
                        o.has_intersection(&robot_shape) || moved.iter().any(|m| o.has_intersection(m))
                    })
            })?;

        let targets: Vec<(usize, Position)> = hits
            .iter()
            .filter_map(|i| obstacles.get(*i).map(|o| (*i, o.position() + offset)))
            .collect();
        for (i, position) in targets {
            trace!("pushing obstacle {i} to ({:.1}, {:.1})", position.x(), position.y());
            self.map.set_obstacle_position(i, position);
        }
        Some(fraction)
    }

    fn is_free(&self, shape: &Shape) -> bool {
        !self.map.has_collision(shape) && self.map.contains(shape)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{domain::MapConfig, tests::robot_at};

    fn simulator(map: GameMap, x: f64, y: f64) -> Simulator {
        let robot = robot_at(x, y, 0.0);
        let config = SimulationConfig {
            seed: Some(7),
            ..SimulationConfig::default()
        };
        Simulator::new(robot, map, config)
    }

    fn collisions(events: &[SimEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                SimEvent::Collision { obstacle } => Some(obstacle.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_simulator_drives_free() {
        let mut sim = simulator(GameMap::new(MapConfig::default()), 0.0, 0.0);
        sim.push_command(Command::forward(300.0));
        let events = sim.run_until_idle(Duration::from_secs(10));

        assert!(sim.controller().is_idle());
        assert!(collisions(&events).is_empty());
        assert_abs_diff_eq!(sim.robot().position(), Position::new(300.0, 0.0), epsilon = 5.0);
        assert_eq!(sim.trajectory().len() as u64, sim.frame() + 1);
    }

    #[test]
    fn test_simulator_blocked_by_wall() {
        let mut sim = simulator(GameMap::new(MapConfig::default()), 1000.0, 0.0);
        sim.push_command(Command::forward(500.0));
        let events = sim.run_until_idle(Duration::from_secs(10));

        assert_eq!(collisions(&events), vec!["Right Wall"]);
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::Command(CommandEvent::Stalled(_))
        )));
        let x = sim.robot().position().x();
        assert!(x <= 1100.0 && x > 1099.0, "x = {x}");
    }

    #[test]
    fn test_simulator_pushes_movable_obstacle() {
        let mut sim = simulator(GameMap::demo(), -400.0, 0.0);
        sim.push_command(Command::forward(500.0));
        let events = sim.run_until_idle(Duration::from_secs(10));

        assert!(collisions(&events).is_empty());
        let Some(block) = sim.map().obstacle("Center Block") else {
            panic!("missing center block");
        };
        let (block_x, robot_x) = (block.position().x(), sim.robot().position().x());
        assert!(block_x > 250.0 && block_x < 320.0, "block at {block_x}");
        assert_abs_diff_eq!(block.position().y(), 0.0, epsilon = 1e-6);
        assert!(robot_x + 200.0 <= block_x + 1e-6);
        assert!(!sim.map().has_collision(sim.robot()));
    }

    #[test]
    fn test_simulator_completes_mission() {
        let mut sim = simulator(GameMap::demo(), -600.0, -300.0);
        let events = sim.run_for(Duration::from_secs_f64(2.5));

        let completed: Vec<&MissionEvent> = events
            .iter()
            .filter_map(|e| match e {
                SimEvent::Mission(m) if matches!(m.kind, MissionEventKind::Completed { .. }) => {
                    Some(m)
                }
                _ => None,
            })
            .collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].mission, "Visit Red Zone");
        assert_eq!(sim.state().score, 20);
        assert_eq!(sim.state().max_score, 60);
    }

    #[test]
    fn test_simulator_competition_countdown() {
        let mut sim = simulator(GameMap::demo(), -1000.0, -400.0).with_competition(Some(1.0));
        assert_eq!(sim.competition_time_left(), Some(1.0));
        let events = sim.run_for(Duration::from_secs(2));

        assert!(sim.is_stopped());
        assert_eq!(sim.competition_time_left(), Some(0.0));
        assert_eq!(events.last(), Some(&SimEvent::CompetitionOver { score: 0 }));
        assert!(sim.time() > 0.99 && sim.time() < 1.02);
        assert!(sim.step(sim.config().dt()).is_empty());
    }

    #[test]
    fn test_simulator_pause_and_resume() {
        let mut sim = simulator(GameMap::demo(), -1000.0, -400.0);
        let dt = sim.config().dt();
        assert!(sim.pause());
        assert!(sim.step(dt).is_empty());
        assert_eq!(sim.frame(), 0);

        assert!(sim.toggle_pause());
        sim.step(dt);
        assert_eq!(sim.frame(), 1);

        assert!(sim.toggle_pause());
        assert!(sim.is_paused());
        assert!(!sim.pause());
        assert!(sim.resume());
        assert!(sim.is_running());
        assert!(!sim.resume());
    }

    #[rstest]
    #[case::pause(RunState::Running, RunState::Paused, Some(RunState::Paused))]
    #[case::resume(RunState::Paused, RunState::Running, Some(RunState::Running))]
    #[case::stop_running(RunState::Running, RunState::Stopped, Some(RunState::Stopped))]
    #[case::stop_paused(RunState::Paused, RunState::Stopped, Some(RunState::Stopped))]
    #[case::resume_stopped(RunState::Stopped, RunState::Running, None)]
    #[case::pause_stopped(RunState::Stopped, RunState::Paused, None)]
    #[case::stop_twice(RunState::Stopped, RunState::Stopped, None)]
    #[case::pause_twice(RunState::Paused, RunState::Paused, None)]
    fn test_run_state_transition(
        #[case] from: RunState,
        #[case] to: RunState,
        #[case] expected: Option<RunState>,
    ) {
        assert_eq!(from.transition(to), expected);
    }

    #[test]
    fn test_simulator_stop_is_final_until_reset() {
        let mut sim = simulator(GameMap::demo(), -1000.0, -400.0);
        sim.push_command(Command::forward(300.0));
        sim.run_for(Duration::from_millis(500));
        assert!(sim.stop());
        assert!(sim.robot().motor_target(Side::Left).abs() < f64::EPSILON);
        assert!(!sim.stop());
        assert!(!sim.resume());
        assert!(!sim.toggle_pause());
        assert_eq!(sim.state().run_state, RunState::Stopped);

        sim.reset();
        assert_eq!(sim.run_state(), RunState::Running);
        sim.step(sim.config().dt());
        assert_eq!(sim.frame(), 1);
    }

    #[test]
    fn test_simulator_manual_keys() {
        let mut sim = simulator(GameMap::demo(), -1000.0, -400.0);
        sim.handle_keys(0x0001);
        sim.run_for(Duration::from_secs(1));
        assert!(sim.controller().is_manual());
        assert!(sim.robot().position().x() > -900.0);

        sim.handle_keys(0x0000);
        sim.run_for(Duration::from_secs(1));
        assert!(!sim.controller().is_manual());
        assert!(sim.robot().is_stopped());
    }

    #[test]
    fn test_simulator_reset() {
        let mut sim = simulator(GameMap::demo(), -400.0, 0.0);
        sim.push_command(Command::forward(500.0));
        sim.run_for(Duration::from_secs(2));
        sim.reset();

        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.frame(), 0);
        assert_eq!(sim.trajectory(), &[Position::new(-400.0, 0.0)]);
        assert_eq!(sim.robot().distance_travelled(), 0.0);
        assert!(sim.controller().is_idle());
        assert_eq!(
            sim.map().obstacle("Center Block").map(|o| o.position()),
            Some(Position::new(0.0, 0.0))
        );
    }

    #[test]
    fn test_simulator_state_snapshot() {
        let mut sim = simulator(GameMap::demo(), -1000.0, -400.0);
        sim.push_commands([Command::forward(100.0), Command::turn_left(90.0)]);
        let state = sim.state();
        assert_eq!(state.active_command, None);
        assert_eq!(
            state.queue,
            vec!["forward 100 mm at 50%", "turn left 90° at 30%"]
        );
        assert_eq!(state.sensors.len(), 5);

        sim.step(sim.config().dt());
        let state = sim.state();
        assert_eq!(state.active_command.as_deref(), Some("forward 100 mm at 50%"));
        assert_eq!(state.queue.len(), 1);
        assert_eq!(state.frame, 1);
    }

    #[test]
    fn test_simulator_is_deterministic_for_seed() {
        let run = || {
            let mut sim = simulator(GameMap::demo(), -1000.0, -400.0);
            sim.push_commands([Command::forward(300.0), Command::turn_left(45.0)]);
            sim.run_until_idle(Duration::from_secs(10));
            serde_json::to_string(&sim.state()).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[rstest]
    #[case::default(SimulationConfig::default(), true)]
    #[case::zero_fps(SimulationConfig { physics_fps: 0, ..SimulationConfig::default() }, false)]
    #[case::zero_dt(SimulationConfig { physics_dt: 0.0, ..SimulationConfig::default() }, false)]
    #[case::nan_dt(SimulationConfig { physics_dt: f64::NAN, ..SimulationConfig::default() }, false)]
    #[case::negative_factor(SimulationConfig { real_time_factor: -1.0, ..SimulationConfig::default() }, false)]
    #[case::unthrottled(SimulationConfig { real_time_factor: 0.0, ..SimulationConfig::default() }, true)]
    fn test_simulation_config_validate(#[case] config: SimulationConfig, #[case] valid: bool) {
        assert_eq!(config.validate().is_ok(), valid);
    }

    #[test]
    fn test_simulation_config_frame_delay() {
        let config = SimulationConfig {
            physics_dt: 0.02,
            real_time_factor: 2.0,
            ..SimulationConfig::default()
        };
        assert_eq!(config.frame_delay(), Some(Duration::from_millis(10)));
        let config = SimulationConfig {
            real_time_factor: 0.0,
            ..config
        };
        assert_eq!(config.frame_delay(), None);
    }
}
