//! Configuration presets and file formats.
//!
//! Robots, simulation settings, drive base settings, profiles and FLL seasons are kept in named
//! tables. The built-in tables are compiled into the binary from `configs/`; a config directory
//! with files of the same names extends or replaces single entries. Maps and scripts are read from
//! separate YAML files.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use once_cell::sync::OnceCell;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{
    controller::{Command, DriveBase, PybricksConfig},
    domain::{
        Angle, Area, Color, ColorZone, ConditionKind, GameMap, MapConfig, Mission,
        MissionCondition, MissionType, Movability, Obstacle, Pose, Position, Rgb, RobotConfig,
        RobotError,
    },
    simulator::SimulationConfig,
};

const ROBOTS: &str = include_str!("../configs/robots.yaml");
const SIMULATIONS: &str = include_str!("../configs/simulations.yaml");
const PYBRICKS: &str = include_str!("../configs/pybricks.yaml");
const PROFILES: &str = include_str!("../configs/profiles.yaml");
const SEASONS: &str = include_str!("../configs/seasons.yaml");

static BUILTIN: OnceCell<Catalog> = OnceCell::new();

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unknown {kind} '{name}', available: {available}")]
    Unknown {
        kind: &'static str,
        name: String,
        available: String,
    },
    #[error(transparent)]
    Robot(#[from] RobotError),
    #[error("{0}")]
    Invalid(String),
}

/// Table entry with a display name and description next to the settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preset<T> {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub config: T,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub theme: String,
    /// Width and depth of the competition table in mm.
    pub table_size: [f64; 2],
    pub mission_count: u32,
    pub max_score: u32,
    /// Match duration in seconds.
    pub time_limit: f64,
    #[serde(default)]
    pub missions: Vec<String>,
}

/// A preset referenced by its table key or given in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry<T> {
    Named(String),
    Inline(T),
}

fn default_season() -> String {
    "2024".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub robot_config: Entry<RobotConfig>,
    pub simulation_config: Entry<SimulationConfig>,
    pub pybricks_config: Entry<PybricksConfig>,
    #[serde(default = "default_season")]
    pub fll_season: String,
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
}

/// Profile with all references resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    pub name: String,
    pub description: String,
    pub robot: RobotConfig,
    pub simulation: SimulationConfig,
    pub pybricks: PybricksConfig,
    pub season: String,
    pub features: BTreeMap<String, bool>,
}

impl Profile {
    pub fn feature(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }

    fn to_spec(&self) -> ProfileSpec {
        ProfileSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            robot_config: Entry::Inline(self.robot.clone()),
            simulation_config: Entry::Inline(self.simulation.clone()),
            pybricks_config: Entry::Inline(self.pybricks.clone()),
            fll_season: self.season.clone(),
            features: self.features.clone(),
        }
    }
}

/// Keys of all tables, as listed by `fll-sim presets`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CatalogNames {
    pub robots: Vec<String>,
    pub simulations: Vec<String>,
    pub pybricks: Vec<String>,
    pub profiles: Vec<String>,
    pub seasons: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    robots: BTreeMap<String, Preset<RobotConfig>>,
    simulations: BTreeMap<String, Preset<SimulationConfig>>,
    pybricks: BTreeMap<String, Preset<PybricksConfig>>,
    profiles: BTreeMap<String, ProfileSpec>,
    seasons: BTreeMap<String, Season>,
}

impl Catalog {
    /// Presets shipped with the binary, parsed on first use.
    pub fn builtin() -> Result<&'static Catalog, ConfigError> {
        BUILTIN.get_or_try_init(|| -> Result<Catalog, ConfigError> {
            Ok(Catalog {
                robots: parse(ROBOTS, Path::new("configs/robots.yaml"))?,
                simulations: parse(SIMULATIONS, Path::new("configs/simulations.yaml"))?,
                pybricks: parse(PYBRICKS, Path::new("configs/pybricks.yaml"))?,
                profiles: parse(PROFILES, Path::new("configs/profiles.yaml"))?,
                seasons: parse(SEASONS, Path::new("configs/seasons.yaml"))?,
            })
        })
    }

    /// Copy of the catalog extended by the tables found in `dir`.
    ///
    /// Besides the five table files, every file in `dir/profiles/` holds a single profile named
    /// after the file.
    pub fn with_overrides_from(&self, dir: &Path) -> Result<Catalog, ConfigError> {
        let mut catalog = self.clone();
        merge(&mut catalog.robots, &dir.join("robots.yaml"))?;
        merge(&mut catalog.simulations, &dir.join("simulations.yaml"))?;
        merge(&mut catalog.pybricks, &dir.join("pybricks.yaml"))?;
        merge(&mut catalog.profiles, &dir.join("profiles.yaml"))?;
        merge(&mut catalog.seasons, &dir.join("seasons.yaml"))?;

        let profile_dir = dir.join("profiles");
        if profile_dir.is_dir() {
            let entries = fs::read_dir(&profile_dir).map_err(|source| ConfigError::Io {
                path: profile_dir.clone(),
                source,
            })?;
            for entry in entries {
                let path = entry
                    .map_err(|source| ConfigError::Io {
                        path: profile_dir.clone(),
                        source,
                    })?
                    .path();
                if !is_yaml(&path) {
                    continue;
                }
                let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let spec: ProfileSpec = read_yaml(&path)?;
                debug!("profile '{key}' loaded from {}", path.display());
                catalog.profiles.insert(key.to_string(), spec);
            }
        }
        Ok(catalog)
    }

    pub fn names(&self) -> CatalogNames {
        CatalogNames {
            robots: self.robots.keys().cloned().collect(),
            simulations: self.simulations.keys().cloned().collect(),
            pybricks: self.pybricks.keys().cloned().collect(),
            profiles: self.profiles.keys().cloned().collect(),
            seasons: self.seasons.keys().cloned().collect(),
        }
    }

    pub fn robots(&self) -> &BTreeMap<String, Preset<RobotConfig>> {
        &self.robots
    }

    pub fn profiles(&self) -> &BTreeMap<String, ProfileSpec> {
        &self.profiles
    }

    pub fn seasons(&self) -> &BTreeMap<String, Season> {
        &self.seasons
    }

    pub fn robot(&self, key: &str) -> Result<RobotConfig, ConfigError> {
        let config = lookup(&self.robots, "robot", key)?.config.clone();
        config.validate()?;
        Ok(config)
    }

    pub fn simulation(&self, key: &str) -> Result<SimulationConfig, ConfigError> {
        let config = lookup(&self.simulations, "simulation", key)?.config.clone();
        config.validate()?;
        Ok(config)
    }

    pub fn pybricks(&self, key: &str) -> Result<PybricksConfig, ConfigError> {
        Ok(lookup(&self.pybricks, "pybricks config", key)?.config.clone())
    }

    pub fn season(&self, key: &str) -> Result<&Season, ConfigError> {
        lookup(&self.seasons, "season", key)
    }

    pub fn profile(&self, key: &str) -> Result<Profile, ConfigError> {
        let spec = lookup(&self.profiles, "profile", key)?;
        let robot = match &spec.robot_config {
            Entry::Named(name) => self.robot(name)?,
            Entry::Inline(config) => {
                config.validate()?;
                config.clone()
            }
        };
        let simulation = match &spec.simulation_config {
            Entry::Named(name) => self.simulation(name)?,
            Entry::Inline(config) => {
                config.validate()?;
                config.clone()
            }
        };
        let pybricks = match &spec.pybricks_config {
            Entry::Named(name) => self.pybricks(name)?,
            Entry::Inline(config) => config.clone(),
        };
        self.season(&spec.fll_season)?;
        Ok(Profile {
            name: spec.name.clone(),
            description: spec.description.clone(),
            robot,
            simulation,
            pybricks,
            season: spec.fll_season.clone(),
            features: spec.features.clone(),
        })
    }
}

/// Writes `profile` with all presets inlined to `dir/profiles/<key>.yaml`.
pub fn save_profile(dir: &Path, key: &str, profile: &Profile) -> Result<PathBuf, ConfigError> {
    let profile_dir = dir.join("profiles");
    fs::create_dir_all(&profile_dir).map_err(|source| ConfigError::Io {
        path: profile_dir.clone(),
        source,
    })?;
    let path = profile_dir.join(format!("{key}.yaml"));
    let yaml = serde_yaml::to_string(&profile.to_spec()).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, yaml).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    info!("profile '{key}' saved to {}", path.display());
    Ok(path)
}

/// Table key derived from a display name, e.g. "My Team" becomes "my_team".
pub fn profile_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

fn lookup<'a, T>(
    table: &'a BTreeMap<String, T>,
    kind: &'static str,
    key: &str,
) -> Result<&'a T, ConfigError> {
    table.get(key).ok_or_else(|| ConfigError::Unknown {
        kind,
        name: key.to_string(),
        available: table.keys().cloned().collect::<Vec<_>>().join(", "),
    })
}

fn parse<T: DeserializeOwned>(text: &str, path: &Path) -> Result<T, ConfigError> {
    serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text, path)
}

fn merge<T: DeserializeOwned>(
    table: &mut BTreeMap<String, T>,
    path: &Path,
) -> Result<(), ConfigError> {
    if !path.is_file() {
        return Ok(());
    }
    let entries: BTreeMap<String, T> = read_yaml(path)?;
    debug!("{} entries loaded from {}", entries.len(), path.display());
    table.extend(entries);
    Ok(())
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

/// Pose with the heading in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct PoseSpec {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub heading: f64,
}

impl From<PoseSpec> for Pose {
    fn from(value: PoseSpec) -> Self {
        Pose::new(
            Position::new(value.x, value.y),
            Angle::from_deg(value.heading),
        )
    }
}

fn default_mass() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ObstacleSpec {
    pub name: String,
    pub position: Position,
    pub x_length: f64,
    pub y_length: f64,
    /// Degrees.
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub movable: bool,
    #[serde(default = "default_mass")]
    pub mass: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ColorZoneSpec {
    pub name: String,
    pub position: Position,
    pub x_length: f64,
    pub y_length: f64,
    #[serde(default)]
    pub angle: f64,
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionKindSpec {
    RobotInArea {
        area: Area,
        #[serde(default)]
        tolerance: f64,
    },
    ObjectInArea {
        object: String,
        area: Area,
        #[serde(default)]
        tolerance: f64,
    },
    TouchPressed {
        sensor: String,
        #[serde(default = "default_presses")]
        presses: u32,
    },
    ColorDetected {
        sensor: String,
        color: Color,
    },
    DistanceTravelled {
        distance: f64,
    },
}

fn default_presses() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ConditionSpec {
    #[serde(flatten)]
    pub kind: ConditionKindSpec,
    /// Seconds the condition has to hold.
    #[serde(default)]
    pub hold: f64,
    #[serde(default)]
    pub optional: bool,
}

impl From<ConditionSpec> for MissionCondition {
    fn from(value: ConditionSpec) -> Self {
        let kind = match value.kind {
            ConditionKindSpec::RobotInArea { area, tolerance } => {
                ConditionKind::RobotInArea { area, tolerance }
            }
            ConditionKindSpec::ObjectInArea {
                object,
                area,
                tolerance,
            } => ConditionKind::ObjectInArea {
                object,
                area,
                tolerance,
            },
            ConditionKindSpec::TouchPressed { sensor, presses } => {
                ConditionKind::TouchPressed { sensor, presses }
            }
            ConditionKindSpec::ColorDetected { sensor, color } => {
                ConditionKind::ColorDetected { sensor, color }
            }
            ConditionKindSpec::DistanceTravelled { distance } => {
                ConditionKind::DistanceTravelled { distance }
            }
        };
        let condition = MissionCondition::new(kind).held_for(value.hold);
        if value.optional {
            condition.optional()
        } else {
            condition
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MissionSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub mission_type: MissionType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub time_limit: Option<f64>,
    #[serde(default)]
    pub target_area: Option<Area>,
    #[serde(default)]
    pub target_object: Option<String>,
    #[serde(default)]
    pub target_sensor: Option<String>,
    #[serde(default)]
    pub required_presses: Option<u32>,
    #[serde(default)]
    pub target_color: Option<Color>,
    #[serde(default)]
    pub color_sensor: Option<String>,
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
}

impl MissionSpec {
    fn build(self) -> Mission {
        let mut builder = Mission::builder(self.name, self.mission_type)
            .description(self.description)
            .points(self.points)
            .time_limit(self.time_limit);
        if let Some(area) = self.target_area {
            builder = builder.target_area(area);
        }
        if let Some(object) = self.target_object {
            builder = builder.target_object(object);
        }
        if let Some(sensor) = self.target_sensor {
            builder = builder.target_sensor(sensor);
        }
        if let Some(presses) = self.required_presses {
            builder = builder.required_presses(presses);
        }
        if let Some(color) = self.target_color {
            builder = builder.target_color(color);
        }
        if let Some(sensor) = self.color_sensor {
            builder = builder.color_sensor(sensor);
        }
        self.conditions
            .into_iter()
            .fold(builder, |b, c| b.condition(c.into()))
            .build()
    }
}

/// Game map file. The field always gets its four border walls.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct MapFile {
    #[serde(default)]
    pub config: MapConfig,
    #[serde(default)]
    pub obstacles: Vec<ObstacleSpec>,
    #[serde(default)]
    pub color_zones: Vec<ColorZoneSpec>,
    #[serde(default)]
    pub start_positions: BTreeMap<String, PoseSpec>,
    #[serde(default)]
    pub missions: Vec<MissionSpec>,
}

impl MapFile {
    pub fn load(path: &Path) -> Result<MapFile, ConfigError> {
        read_yaml(path)
    }

    pub fn into_map(self) -> Result<GameMap, ConfigError> {
        if self.config.width <= 0.0 || self.config.height <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "map size must be positive, got {} x {}",
                self.config.width, self.config.height
            )));
        }
        let mut map = GameMap::new(self.config);

        for spec in self.obstacles {
            if spec.x_length <= 0.0 || spec.y_length <= 0.0 || spec.mass <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "obstacle '{}' needs a positive size and mass",
                    spec.name
                )));
            }
            let movability = if spec.movable {
                Movability::Movable
            } else {
                Movability::Unmovable
            };
            map.add_obstacle(
                Obstacle::new(spec.name, spec.position, spec.x_length, spec.y_length)
                    .with_angle(Angle::from_deg(spec.angle))
                    .with_movability(movability)
                    .with_mass(spec.mass),
            );
        }

        for spec in self.color_zones {
            map.add_color_zone(
                ColorZone::new(
                    spec.name,
                    spec.position,
                    spec.x_length,
                    spec.y_length,
                    spec.color,
                )
                .with_angle(Angle::from_deg(spec.angle)),
            );
        }

        for (name, pose) in self.start_positions {
            map.add_start_position(name, pose.into());
        }

        for spec in self.missions {
            let mission = spec.build();
            for condition in mission.conditions() {
                if let ConditionKind::ObjectInArea { object, .. } = condition.kind() {
                    if map.obstacle(object).is_none() {
                        return Err(ConfigError::Invalid(format!(
                            "mission '{}' refers to unknown object '{object}'",
                            mission.name()
                        )));
                    }
                }
            }
            map.add_mission(mission);
        }

        Ok(map)
    }
}

pub fn load_map(path: &Path) -> Result<GameMap, ConfigError> {
    let map = MapFile::load(path)?.into_map()?;
    info!(
        "map {} loaded: {} obstacles, {} missions",
        path.display(),
        map.obstacles().len(),
        map.missions().len()
    );
    Ok(map)
}

/// Pybricks style drive base call in a script.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriveStep {
    Straight {
        distance: f64,
    },
    Turn {
        angle: f64,
    },
    Curve {
        radius: f64,
        angle: f64,
    },
    Settings {
        straight_speed: Option<f64>,
        straight_acceleration: Option<f64>,
        turn_rate: Option<f64>,
        turn_acceleration: Option<f64>,
    },
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    Drive(DriveStep),
    Command(Command),
}

/// Autonomous run written as a list of commands and drive base calls.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ScriptFile {
    #[serde(default)]
    pub name: String,
    /// Start position name on the map.
    #[serde(default)]
    pub start: Option<String>,
    /// Drive base preset for `straight`, `turn` and `curve` steps.
    #[serde(default)]
    pub pybricks: Option<String>,
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

impl ScriptFile {
    pub fn load(path: &Path) -> Result<ScriptFile, ConfigError> {
        let script: ScriptFile = read_yaml(path)?;
        info!(
            "script '{}' loaded with {} steps",
            script.name,
            script.steps.len()
        );
        Ok(script)
    }

    pub fn commands(&self, drive_base: &mut DriveBase) -> Vec<Command> {
        let mut commands = vec![];
        for step in &self.steps {
            match step {
                ScriptStep::Command(command) => commands.push(command.clone()),
                ScriptStep::Drive(DriveStep::Straight { distance }) => {
                    commands.push(drive_base.straight(*distance))
                }
                ScriptStep::Drive(DriveStep::Turn { angle }) => {
                    commands.push(drive_base.turn(*angle))
                }
                ScriptStep::Drive(DriveStep::Curve { radius, angle }) => {
                    commands.push(drive_base.curve(*radius, *angle))
                }
                ScriptStep::Drive(DriveStep::Settings {
                    straight_speed,
                    straight_acceleration,
                    turn_rate,
                    turn_acceleration,
                }) => drive_base.settings(
                    *straight_speed,
                    *straight_acceleration,
                    *turn_rate,
                    *turn_acceleration,
                ),
            }
        }
        commands
    }
}
