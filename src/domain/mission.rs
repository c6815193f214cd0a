//! Missions: scored objectives evaluated against the robot and the field every step.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Color, Obstacle, Position, Robot};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionType {
    AreaVisit,
    ObjectTransport,
    ButtonPress,
    LineFollow,
    ColorDetection,
    PrecisionParking,
    ObstacleNavigation,
    TimeChallenge,
    Custom,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MissionStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
    Timeout,
}

impl MissionStatus {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            MissionStatus::Completed | MissionStatus::Failed | MissionStatus::Timeout
        )
    }
}

/// Axis aligned target area given by its centre and size.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Area {
    pub position: Position,
    pub x_length: f64,
    pub y_length: f64,
}

impl Area {
    pub fn new(position: Position, x_length: f64, y_length: f64) -> Self {
        Self {
            position,
            x_length,
            y_length,
        }
    }

    pub fn contains(&self, point: Position, tolerance: f64) -> bool {
        (point.x() - self.position.x()).abs() <= self.x_length / 2.0 + tolerance
            && (point.y() - self.position.y()).abs() <= self.y_length / 2.0 + tolerance
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConditionKind {
    RobotInArea { area: Area, tolerance: f64 },
    ObjectInArea { object: String, area: Area, tolerance: f64 },
    TouchPressed { sensor: String, presses: u32 },
    ColorDetected { sensor: String, color: Color },
    DistanceTravelled { distance: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct MissionCondition {
    kind: ConditionKind,
    required: bool,
    duration: f64,
    is_met: bool,
    hold_start: Option<f64>,
}

impl MissionCondition {
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            required: true,
            duration: 0.0,
            is_met: false,
            hold_start: None,
        }
    }

    /// The condition has to hold continuously for `seconds` before it counts as met.
    pub fn held_for(self, seconds: f64) -> Self {
        Self {
            duration: seconds.max(0.0),
            ..self
        }
    }

    pub fn optional(self) -> Self {
        Self {
            required: false,
            ..self
        }
    }

    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_met(&self) -> bool {
        self.is_met
    }

    fn reset(&mut self) {
        self.is_met = false;
        self.hold_start = None;
    }

    fn check(&mut self, ctx: &MissionContext<'_>) {
        let holds = self.evaluate(ctx);
        if self.duration <= 0.0 {
            self.is_met = holds;
            return;
        }
        if holds {
            let since = *self.hold_start.get_or_insert(ctx.time);
            self.is_met = ctx.time - since + f64::EPSILON >= self.duration;
        } else {
            self.reset();
        }
    }

    fn evaluate(&self, ctx: &MissionContext<'_>) -> bool {
        match &self.kind {
            ConditionKind::RobotInArea { area, tolerance } => {
                area.contains(ctx.robot.position(), *tolerance)
            }
            ConditionKind::ObjectInArea {
                object,
                area,
                tolerance,
            } => ctx
                .obstacles
                .iter()
                .find(|o| o.name() == object)
                .is_some_and(|o| area.contains(o.position(), *tolerance)),
            ConditionKind::TouchPressed { sensor, presses } => ctx
                .robot
                .sensor(sensor)
                .and_then(|s| s.as_touch())
                .is_some_and(|t| t.press_count() >= *presses),
            ConditionKind::ColorDetected { sensor, color } => ctx
                .robot
                .sensor(sensor)
                .and_then(|s| s.as_color())
                .is_some_and(|c| c.color() == *color),
            ConditionKind::DistanceTravelled { distance } => {
                ctx.robot.distance_travelled() >= *distance
            }
        }
    }
}

/// What a mission looks at when it is updated.
pub struct MissionContext<'a> {
    pub robot: &'a Robot,
    pub obstacles: &'a [Obstacle],
    /// Simulation time in seconds.
    pub time: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MissionEvent {
    pub mission: String,
    pub kind: MissionEventKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MissionEventKind {
    Started,
    Progress(f64),
    Completed { points: u32 },
    Failed { reason: String },
    TimedOut,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mission {
    name: String,
    description: String,
    mission_type: MissionType,
    points: u32,
    time_limit: Option<f64>,
    target_area: Option<Area>,
    target_object: Option<String>,
    conditions: Vec<MissionCondition>,
    status: MissionStatus,
    progress: f64,
    points_earned: u32,
    time_elapsed: f64,
    started_at: Option<f64>,
    finished_at: Option<f64>,
    failure_reason: Option<String>,
}

impl Mission {
    pub fn builder(name: impl Into<String>, mission_type: MissionType) -> MissionBuilder {
        MissionBuilder::new(name, mission_type)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn mission_type(&self) -> MissionType {
        self.mission_type
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn time_limit(&self) -> Option<f64> {
        self.time_limit
    }

    pub fn target_area(&self) -> Option<Area> {
        self.target_area
    }

    pub fn target_object(&self) -> Option<&str> {
        self.target_object.as_deref()
    }

    pub fn conditions(&self) -> &[MissionCondition] {
        &self.conditions
    }

    pub fn status(&self) -> MissionStatus {
        self.status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn points_earned(&self) -> u32 {
        self.points_earned
    }

    pub fn time_elapsed(&self) -> f64 {
        self.time_elapsed
    }

    pub fn started_at(&self) -> Option<f64> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<f64> {
        self.finished_at
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn state(&self) -> MissionState {
        MissionState {
            name: self.name.clone(),
            status: self.status_text(),
            progress: self.progress,
            points: self.points,
            points_earned: self.points_earned,
        }
    }

    pub fn add_condition(&mut self, condition: MissionCondition) {
        self.conditions.push(condition);
    }

    pub fn start(&mut self, time: f64) -> Option<MissionEvent> {
        if self.status != MissionStatus::NotStarted {
            return None;
        }
        self.status = MissionStatus::InProgress;
        self.started_at = Some(time);
        self.time_elapsed = 0.0;
        self.conditions.iter_mut().for_each(MissionCondition::reset);
        Some(self.event(MissionEventKind::Started))
    }

    pub fn update(&mut self, dt: f64, ctx: &MissionContext<'_>) -> Option<MissionEvent> {
        if self.status != MissionStatus::InProgress {
            return None;
        }

        self.time_elapsed += dt;

        if let Some(limit) = self.time_limit {
            if self.time_elapsed >= limit {
                self.status = MissionStatus::Timeout;
                self.finished_at = Some(ctx.time);
                return Some(self.event(MissionEventKind::TimedOut));
            }
        }

        for condition in &mut self.conditions {
            condition.check(ctx);
        }

        let previous = self.progress;
        self.progress = self.measure_progress();

        if !self.conditions.is_empty() && self.conditions.iter().all(|c| c.is_met || !c.required)
        {
            return self.complete(ctx.time);
        }

        if (self.progress - previous).abs() > f64::EPSILON {
            Some(self.event(MissionEventKind::Progress(self.progress)))
        } else {
            None
        }
    }

    pub fn complete(&mut self, time: f64) -> Option<MissionEvent> {
        if self.status != MissionStatus::InProgress {
            return None;
        }
        self.status = MissionStatus::Completed;
        self.finished_at = Some(time);
        self.progress = 1.0;
        self.points_earned = self.points;
        Some(self.event(MissionEventKind::Completed {
            points: self.points,
        }))
    }

    pub fn fail(&mut self, time: f64, reason: impl Into<String>) -> Option<MissionEvent> {
        if self.status != MissionStatus::InProgress {
            return None;
        }
        let reason = reason.into();
        self.status = MissionStatus::Failed;
        self.finished_at = Some(time);
        self.failure_reason = Some(reason.clone());
        Some(self.event(MissionEventKind::Failed { reason }))
    }

    pub fn reset(&mut self) {
        self.status = MissionStatus::NotStarted;
        self.progress = 0.0;
        self.points_earned = 0;
        self.time_elapsed = 0.0;
        self.started_at = None;
        self.finished_at = None;
        self.failure_reason = None;
        self.conditions.iter_mut().for_each(MissionCondition::reset);
    }

    pub fn status_text(&self) -> String {
        match self.status {
            MissionStatus::NotStarted => "Not Started".to_string(),
            MissionStatus::InProgress => format!("In Progress ({:.0}%)", self.progress * 100.0),
            MissionStatus::Completed => format!("Completed ({} points)", self.points_earned),
            MissionStatus::Failed => "Failed".to_string(),
            MissionStatus::Timeout => "Timeout".to_string(),
        }
    }

    fn measure_progress(&self) -> f64 {
        let required = self.conditions.iter().filter(|c| c.required).count();
        if required == 0 {
            return if self.conditions.is_empty() { 0.0 } else { 1.0 };
        }
        let met = self
            .conditions
            .iter()
            .filter(|c| c.required && c.is_met)
            .count();
        met as f64 / required as f64
    }

    fn event(&self, kind: MissionEventKind) -> MissionEvent {
        MissionEvent {
            mission: self.name.clone(),
            kind,
        }
    }
}

/// Snapshot of a mission for reports.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MissionState {
    pub name: String,
    pub status: String,
    pub progress: f64,
    pub points: u32,
    pub points_earned: u32,
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} pts): {}", self.name, self.points, self.status_text())
    }
}

pub struct MissionBuilder {
    mission: Mission,
    target_sensor: Option<String>,
    required_presses: u32,
    target_color: Option<Color>,
    color_sensor: Option<String>,
}

impl MissionBuilder {
    fn new(name: impl Into<String>, mission_type: MissionType) -> Self {
        Self {
            mission: Mission {
                name: name.into(),
                description: String::new(),
                mission_type,
                points: 0,
                time_limit: None,
                target_area: None,
                target_object: None,
                conditions: vec![],
                status: MissionStatus::NotStarted,
                progress: 0.0,
                points_earned: 0,
                time_elapsed: 0.0,
                started_at: None,
                finished_at: None,
                failure_reason: None,
            },
            target_sensor: None,
            required_presses: 1,
            target_color: None,
            color_sensor: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.mission.description = description.into();
        self
    }

    pub fn points(mut self, points: u32) -> Self {
        self.mission.points = points;
        self
    }

    pub fn time_limit(mut self, seconds: Option<f64>) -> Self {
        self.mission.time_limit = seconds.filter(|s| *s > 0.0);
        self
    }

    pub fn target_area(mut self, area: Area) -> Self {
        self.mission.target_area = Some(area);
        self
    }

    pub fn target_object(mut self, name: impl Into<String>) -> Self {
        self.mission.target_object = Some(name.into());
        self
    }

    pub fn target_sensor(mut self, name: impl Into<String>) -> Self {
        self.target_sensor = Some(name.into());
        self
    }

    pub fn required_presses(mut self, presses: u32) -> Self {
        self.required_presses = presses;
        self
    }

    pub fn target_color(mut self, color: Color) -> Self {
        self.target_color = Some(color);
        self
    }

    pub fn color_sensor(mut self, name: impl Into<String>) -> Self {
        self.color_sensor = Some(name.into());
        self
    }

    pub fn condition(mut self, condition: MissionCondition) -> Self {
        self.mission.conditions.push(condition);
        self
    }

    /// Without explicit conditions, the mission type decides what completes it.
    pub fn build(mut self) -> Mission {
        if self.mission.conditions.is_empty() {
            if let Some(condition) = self.default_condition() {
                self.mission.conditions.push(condition);
            }
        }
        self.mission
    }

    fn default_condition(&self) -> Option<MissionCondition> {
        let mission = &self.mission;
        match mission.mission_type {
            MissionType::AreaVisit => mission.target_area.map(|area| {
                MissionCondition::new(ConditionKind::RobotInArea {
                    area,
                    tolerance: 50.0,
                })
                .held_for(2.0)
            }),
            MissionType::ObjectTransport => {
                match (&mission.target_object, mission.target_area) {
                    (Some(object), Some(area)) => Some(
                        MissionCondition::new(ConditionKind::ObjectInArea {
                            object: object.clone(),
                            area,
                            tolerance: 30.0,
                        })
                        .held_for(1.0),
                    ),
                    _ => None,
                }
            }
            MissionType::ButtonPress => Some(MissionCondition::new(ConditionKind::TouchPressed {
                sensor: self
                    .target_sensor
                    .clone()
                    .unwrap_or_else(|| "touch_left".to_string()),
                presses: self.required_presses,
            })),
            MissionType::ColorDetection => Some(
                MissionCondition::new(ConditionKind::ColorDetected {
                    sensor: self
                        .color_sensor
                        .clone()
                        .unwrap_or_else(|| "color_down".to_string()),
                    color: self.target_color.unwrap_or(Color::Red),
                })
                .held_for(1.0),
            ),
            _ => None,
        }
    }
}
