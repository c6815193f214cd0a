//! Game field with walls, mission props, coloured areas and missions.

use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};

use super::{
    Angle, Area, HasCollision, Mission, MissionContext, MissionEvent, MissionState, MissionType,
    Pose, Position, Robot, Shape,
};

const RAY_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    pub const RED: Rgb = Rgb([255, 0, 0]);
    pub const GREEN: Rgb = Rgb([0, 255, 0]);
    pub const BLUE: Rgb = Rgb([0, 0, 255]);

    pub fn r(&self) -> u8 {
        self.0[0]
    }

    pub fn g(&self) -> u8 {
        self.0[1]
    }

    pub fn b(&self) -> u8 {
        self.0[2]
    }

    /// Squared euclidean distance in RGB space.
    pub fn distance_squared(&self, other: Rgb) -> u32 {
        self.0
            .iter()
            .zip(other.0)
            .map(|(a, b)| (i32::from(*a) - i32::from(b)).pow(2) as u32)
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub width: f64,
    pub height: f64,
    pub border_thickness: f64,
    pub surface_color: Rgb,
    pub grid_spacing: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 2400.0,
            height: 1200.0,
            border_thickness: 50.0,
            surface_color: Rgb::WHITE,
            grid_spacing: 100.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameMap {
    config: MapConfig,
    obstacles: Vec<Obstacle>,
    color_zones: Vec<ColorZone>,
    start_positions: BTreeMap<String, Pose>,
    missions: Vec<Mission>,
}

impl GameMap {
    /// Empty field of the configured size surrounded by four walls.
    pub fn new(config: MapConfig) -> Self {
        let (w, h, t) = (config.width, config.height, config.border_thickness);
        let obstacles = vec![
            Obstacle::new("Bottom Wall", Position::new(0.0, -(h + t) / 2.0), w + 2.0 * t, t),
            Obstacle::new("Top Wall", Position::new(0.0, (h + t) / 2.0), w + 2.0 * t, t),
            Obstacle::new("Left Wall", Position::new(-(w + t) / 2.0, 0.0), t, h),
            Obstacle::new("Right Wall", Position::new((w + t) / 2.0, 0.0), t, h),
        ];
        Self {
            config,
            obstacles,
            color_zones: vec![],
            start_positions: BTreeMap::new(),
            missions: vec![],
        }
    }

    /// Demo field used when no map file is given.
    pub fn demo() -> Self {
        let mut map = GameMap::new(MapConfig::default());

        map.add_obstacle(
            Obstacle::new("Center Block", Position::new(0.0, 0.0), 200.0, 100.0)
                .with_movability(Movability::Movable)
                .with_mass(0.5),
        );
        map.add_obstacle(
            Obstacle::new("Left Barrier", Position::new(-800.0, 200.0), 300.0, 50.0)
                .with_angle(Angle::from_deg(45.0)),
        );

        let red_zone = Area::new(Position::new(-600.0, -300.0), 300.0, 200.0);
        let blue_zone = Area::new(Position::new(600.0, -300.0), 300.0, 200.0);
        map.add_color_zone(ColorZone::from_area("Red Zone", red_zone, Rgb::RED));
        map.add_color_zone(ColorZone::from_area("Blue Zone", blue_zone, Rgb::BLUE));
        map.add_color_zone(ColorZone::new(
            "Green Line",
            Position::new(0.0, 400.0),
            1000.0,
            50.0,
            Rgb::GREEN,
        ));

        map.add_start_position(
            "home",
            Pose::new(Position::new(-1000.0, -400.0), Angle::from_deg(0.0)),
        );
        map.add_start_position(
            "away",
            Pose::new(Position::new(1000.0, 400.0), Angle::from_deg(180.0)),
        );

        map.add_mission(
            Mission::builder("Visit Red Zone", MissionType::AreaVisit)
                .description("Drive the robot into the red zone and stay there")
                .points(20)
                .time_limit(Some(30.0))
                .target_area(red_zone)
                .build(),
        );
        map.add_mission(
            Mission::builder("Move Center Block", MissionType::ObjectTransport)
                .description("Push the center block into the blue zone")
                .points(40)
                .time_limit(Some(60.0))
                .target_object("Center Block")
                .target_area(blue_zone)
                .build(),
        );

        map
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn width(&self) -> f64 {
        self.config.width
    }

    pub fn height(&self) -> f64 {
        self.config.height
    }

    pub fn x_min(&self) -> f64 {
        -self.config.width / 2.0
    }

    pub fn x_max(&self) -> f64 {
        self.config.width / 2.0
    }

    pub fn y_min(&self) -> f64 {
        -self.config.height / 2.0
    }

    pub fn y_max(&self) -> f64 {
        self.config.height / 2.0
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn obstacle(&self, name: &str) -> Option<&Obstacle> {
        self.obstacles.iter().find(|o| o.name == name)
    }

    pub fn color_zones(&self) -> &[ColorZone] {
        &self.color_zones
    }

    pub fn start_positions(&self) -> &BTreeMap<String, Pose> {
        &self.start_positions
    }

    pub fn missions(&self) -> &[Mission] {
        &self.missions
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn add_color_zone(&mut self, zone: ColorZone) {
        self.color_zones.push(zone);
    }

    pub fn add_start_position(&mut self, name: impl Into<String>, pose: Pose) {
        self.start_positions.insert(name.into(), pose);
    }

    pub fn add_mission(&mut self, mission: Mission) {
        self.missions.push(mission);
    }

    /// Named start pose, the field origin facing +x if unknown.
    pub fn starting_position(&self, name: &str) -> Pose {
        self.start_positions.get(name).copied().unwrap_or_default()
    }

    /// Colour of the first zone containing `position`, the surface colour elsewhere.
    pub fn color_at(&self, position: Position) -> Rgb {
        self.color_zones
            .iter()
            .find(|z| z.contains(position))
            .map(|z| z.color)
            .unwrap_or(self.config.surface_color)
    }

    pub fn distance_to_next_obstacle(&self, position: Position, angle: Angle) -> Option<f64> {
        self.obstacles
            .iter()
            .flat_map(|o| o.edges())
            .filter_map(|e| {
                e.intersect_with_ray(position, angle)
                    .map(|i| position.distance(i))
            })
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Indices of all obstacles intersecting `object`.
    pub fn colliding_obstacles(&self, object: &dyn HasCollision) -> Vec<usize> {
        self.obstacles
            .iter()
            .enumerate()
            .filter(|(_, o)| o.has_collision(object))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn has_collision(&self, object: &dyn HasCollision) -> bool {
        self.obstacles.iter().any(|o| o.has_collision(object))
    }

    /// Checks whether `object` lies completely inside the field.
    pub fn contains(&self, object: &dyn HasCollision) -> bool {
        let (min, max) = object.shape().bounds();
        min.x() + RAY_EPSILON >= self.x_min()
            && max.x() - RAY_EPSILON <= self.x_max()
            && min.y() + RAY_EPSILON >= self.y_min()
            && max.y() - RAY_EPSILON <= self.y_max()
    }

    pub fn set_obstacle_position(&mut self, idx: usize, position: Position) {
        if let Some(obstacle) = self.obstacles.get_mut(idx) {
            obstacle.set_position(position)
        }
    }

    pub fn start_missions(&mut self, time: f64) -> Vec<MissionEvent> {
        self.missions
            .iter_mut()
            .filter_map(|m| m.start(time))
            .collect()
    }

    pub fn update_missions(&mut self, dt: f64, robot: &Robot, time: f64) -> Vec<MissionEvent> {
        let Self {
            missions,
            obstacles,
            ..
        } = self;
        let ctx = MissionContext {
            robot,
            obstacles,
            time,
        };
        missions
            .iter_mut()
            .filter_map(|m| m.update(dt, &ctx))
            .collect()
    }

    pub fn mission_states(&self) -> Vec<MissionState> {
        self.missions.iter().map(Mission::state).collect()
    }

    pub fn total_score(&self) -> u32 {
        self.missions.iter().map(Mission::points_earned).sum()
    }

    pub fn max_score(&self) -> u32 {
        self.missions.iter().map(Mission::points).sum()
    }

    /// Puts movable obstacles back in place and resets all missions.
    pub fn reset(&mut self) {
        self.obstacles.iter_mut().for_each(Obstacle::reset);
        self.missions.iter_mut().for_each(Mission::reset);
        info!("game map reset");
    }
}

impl Default for GameMap {
    fn default() -> Self {
        Self::demo()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    name: String,
    position: Position,
    x_length: f64,
    y_length: f64,
    angle: Angle,
    movability: Movability,
    mass: f64,
    initial_position: Position,
    initial_angle: Angle,
}

impl Obstacle {
    pub fn new(name: impl Into<String>, position: Position, x_length: f64, y_length: f64) -> Self {
        Self {
            name: name.into(),
            position,
            x_length,
            y_length,
            angle: Angle::default(),
            movability: Movability::default(),
            mass: 1.0,
            initial_position: position,
            initial_angle: Angle::default(),
        }
    }

    pub fn with_angle(self, angle: Angle) -> Self {
        Self {
            angle,
            initial_angle: angle,
            ..self
        }
    }

    pub fn with_movability(self, movability: Movability) -> Self {
        Self { movability, ..self }
    }

    pub fn with_mass(self, mass: f64) -> Self {
        Self { mass, ..self }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn x_length(&self) -> f64 {
        self.x_length
    }

    pub fn y_length(&self) -> f64 {
        self.y_length
    }

    pub fn angle(&self) -> Angle {
        self.angle
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn is_movable(&self) -> bool {
        self.movability == Movability::Movable
    }

    pub fn initial_position(&self) -> Position {
        self.initial_position
    }

    pub fn corners(&self) -> [Position; 4] {
        self.shape().corners().unwrap_or([self.position; 4])
    }

    pub fn edges(&self) -> [LineSegment; 4] {
        let [bl, br, tr, tl] = self.corners();
        [
            LineSegment::new(bl, br),
            LineSegment::new(br, tr),
            LineSegment::new(tr, tl),
            LineSegment::new(tl, bl),
        ]
    }

    pub fn contains(&self, position: Position) -> bool {
        self.shape().contains(position)
    }

    pub fn reset(&mut self) {
        self.position = self.initial_position;
        self.angle = self.initial_angle;
    }
}

impl HasCollision for Obstacle {
    fn shape(&self) -> Shape {
        Shape::Rectangle {
            position: self.position,
            x_length: self.x_length,
            y_length: self.y_length,
            angle: self.angle,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Movability {
    #[default]
    Unmovable,
    Movable,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColorZone {
    name: String,
    position: Position,
    x_length: f64,
    y_length: f64,
    angle: Angle,
    color: Rgb,
}

impl ColorZone {
    pub fn new(
        name: impl Into<String>,
        position: Position,
        x_length: f64,
        y_length: f64,
        color: Rgb,
    ) -> Self {
        Self {
            name: name.into(),
            position,
            x_length,
            y_length,
            angle: Angle::default(),
            color,
        }
    }

    pub fn from_area(name: impl Into<String>, area: Area, color: Rgb) -> Self {
        Self::new(name, area.position, area.x_length, area.y_length, color)
    }

    pub fn with_angle(self, angle: Angle) -> Self {
        Self { angle, ..self }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn shape(&self) -> Shape {
        Shape::Rectangle {
            position: self.position,
            x_length: self.x_length,
            y_length: self.y_length,
            angle: self.angle,
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        self.shape().contains(position)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct LineSegment {
    p1: Position,
    p2: Position,
}

impl LineSegment {
    pub fn new(p1: Position, p2: Position) -> Self {
        Self { p1, p2 }
    }

    pub fn p1(&self) -> Position {
        self.p1
    }

    pub fn p2(&self) -> Position {
        self.p2
    }

    /// First point where the ray from `ray_origin` towards `angle` meets the segment.
    ///
    /// A ray running along the segment hits at its origin if the origin lies on the segment,
    /// otherwise at the nearer endpoint ahead.
    pub fn intersect_with_ray(&self, ray_origin: Position, angle: Angle) -> Option<Position> {
        let direction = Position::unit(angle);
        let edge = self.p2 - self.p1;
        let offset = self.p1 - ray_origin;
        let denominator = direction.cross(edge);

        if denominator.abs() < RAY_EPSILON {
            if offset.cross(direction).abs() >= RAY_EPSILON {
                // parallel
                return None;
            }
            let t1 = offset.dot(direction);
            let t2 = (self.p2 - ray_origin).dot(direction);
            let (near, far) = (t1.min(t2), t1.max(t2));
            return if near <= RAY_EPSILON && far >= -RAY_EPSILON {
                Some(ray_origin)
            } else if near > 0.0 {
                Some(ray_origin + direction * near)
            } else {
                None
            };
        }

        let t = offset.cross(edge) / denominator;
        let u = offset.cross(direction) / denominator;

        if t >= -RAY_EPSILON && (-RAY_EPSILON..=1.0 + RAY_EPSILON).contains(&u) {
            Some(ray_origin + direction * t.max(0.0))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::{assert_abs_diff_eq, AbsDiffEq};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::domain::{MissionStatus, RobotConfig};

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_game_map_borders() {
        let map = GameMap::new(MapConfig::default());
        assert_eq!(map.obstacles().len(), 4);
        assert_abs_diff_eq!(
            map.distance_to_next_obstacle(Position::new(0.0, 0.0), Angle::new(0.0))
                .unwrap(),
            1200.0,
            epsilon = EPSILON
        );
        assert_abs_diff_eq!(
            map.distance_to_next_obstacle(Position::new(0.0, 0.0), Angle::new(0.5 * PI))
                .unwrap(),
            600.0,
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_game_map_distance_to_next_obstacle() {
        let map = GameMap::demo();
        assert_abs_diff_eq!(
            map.distance_to_next_obstacle(Position::new(-500.0, 0.0), Angle::new(0.0))
                .unwrap(),
            400.0,
            epsilon = EPSILON
        );
    }

    #[rstest]
    #[case::start(Position::new(-1000.0, -400.0), false)]
    #[case::front_of_block(Position::new(-200.0, 0.0), false)]
    #[case::overlapping_block(Position::new(-150.0, 0.0), true)]
    #[case::left_wall(Position::new(-1150.0, 0.0), true)]
    fn test_game_map_has_collision(#[case] position: Position, #[case] expected: bool) {
        let map = GameMap::demo();
        let robot = Robot::new(Pose::new(position, Angle::new(0.0)), RobotConfig::default());
        assert_eq!(map.has_collision(&robot), expected);
    }

    #[test]
    fn test_game_map_colliding_obstacles() {
        let map = GameMap::demo();
        let robot = Robot::new(
            Pose::new(Position::new(-150.0, 0.0), Angle::new(0.0)),
            RobotConfig::default(),
        );
        let names = map
            .colliding_obstacles(&robot)
            .into_iter()
            .map(|i| map.obstacles()[i].name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Center Block".to_string()]);
    }

    #[rstest]
    #[case(Position::new(0.0, 0.0), true)]
    #[case(Position::new(1100.0, 0.0), true)]
    #[case(Position::new(1120.0, 0.0), false)]
    #[case(Position::new(0.0, -520.0), false)]
    fn test_game_map_contains(#[case] position: Position, #[case] expected: bool) {
        let map = GameMap::demo();
        let robot = Robot::new(Pose::new(position, Angle::new(0.0)), RobotConfig::default());
        assert_eq!(map.contains(&robot), expected);
    }

    #[rstest]
    #[case::red_zone(Position::new(-600.0, -300.0), Rgb::RED)]
    #[case::blue_zone(Position::new(700.0, -250.0), Rgb::BLUE)]
    #[case::green_line(Position::new(0.0, 410.0), Rgb::GREEN)]
    #[case::surface(Position::new(0.0, 0.0), Rgb::WHITE)]
    fn test_game_map_color_at(#[case] position: Position, #[case] expected: Rgb) {
        assert_eq!(GameMap::demo().color_at(position), expected);
    }

    #[test]
    fn test_game_map_starting_position() {
        let map = GameMap::demo();
        let away = map.starting_position("away");
        assert_abs_diff_eq!(away.position, Position::new(1000.0, 400.0));
        assert_abs_diff_eq!(away.heading.to_deg(), 180.0, epsilon = EPSILON);
        assert_eq!(map.starting_position("nowhere"), Pose::default());
    }

    #[test]
    fn test_game_map_missions() {
        let mut map = GameMap::demo();
        let events = map.start_missions(0.0);
        assert_eq!(events.len(), 2);
        assert_eq!(map.max_score(), 60);

        let idx = map
            .obstacles()
            .iter()
            .position(|o| o.name() == "Center Block")
            .unwrap();
        map.set_obstacle_position(idx, Position::new(600.0, -300.0));

        let robot = Robot::new(
            Pose::new(Position::new(-600.0, -300.0), Angle::new(0.0)),
            RobotConfig::default(),
        );
        for i in 1..=5 {
            map.update_missions(0.5, &robot, 0.5 * i as f64);
        }
        assert!(map
            .missions()
            .iter()
            .all(|m| m.status() == MissionStatus::Completed));
        assert_eq!(map.total_score(), 60);

        map.reset();
        assert_eq!(map.total_score(), 0);
        assert_abs_diff_eq!(
            map.obstacle("Center Block").unwrap().position(),
            Position::new(0.0, 0.0)
        );
    }

    #[test]
    fn test_obstacle_edges() {
        let obstacle = Obstacle::new("block", Position::new(0.2, 0.3), 0.2, 0.2);

        for (edge, expected) in std::iter::zip(
            obstacle.edges(),
            vec![
                LineSegment::new(Position::new(0.1, 0.2), Position::new(0.3, 0.2)),
                LineSegment::new(Position::new(0.3, 0.2), Position::new(0.3, 0.4)),
                LineSegment::new(Position::new(0.3, 0.4), Position::new(0.1, 0.4)),
                LineSegment::new(Position::new(0.1, 0.4), Position::new(0.1, 0.2)),
            ],
        ) {
            assert_abs_diff_eq!(edge, expected, epsilon = EPSILON);
        }
    }

    #[rstest]
    #[case::intersection_in_front_of_ray(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 2.0)),
        Position::new(1.0, 0.0),
        Angle::new(0.75 * PI),
        Some(Position::new(0.5, 0.5))
    )]
    #[case::intersection_behind_ray(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 2.0)),
        Position::new(0.0, 1.0),
        Angle::new(0.75 * PI),
        None
    )]
    #[case::intersection_not_on_line_segment(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 2.0)),
        Position::new(1.0, -2.0),
        Angle::new(0.75 * PI),
        None
    )]
    #[case::ray_origin_on_line_segment(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 2.0)),
        Position::new(0.5, 0.5),
        Angle::new(0.5 * PI),
        Some(Position::new(0.5, 0.5))
    )]
    #[case::collinear_ahead(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 2.0)),
        Position::new(-0.5, -0.5),
        Angle::new(0.25 * PI),
        Some(Position::new(0.0, 0.0))
    )]
    #[case::collinear_behind(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 2.0)),
        Position::new(3.0, 3.0),
        Angle::new(0.25 * PI),
        None
    )]
    #[case::identical(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 2.0)),
        Position::new(1.0, 1.0),
        Angle::new(0.25 * PI),
        Some(Position::new(1.0, 1.0))
    )]
    #[case::parallel(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 2.0)),
        Position::new(0.0, 1.0),
        Angle::new(0.25 * PI),
        None
    )]
    #[case::vertical_line_segment_right(
        LineSegment::new(Position::new(1.0, 1.0), Position::new(1.0, -1.0)),
        Position::new(0.0, 1.0),
        Angle::new(0.0),
        Some(Position::new(1.0, 1.0))
    )]
    #[case::vertical_line_segment_left(
        LineSegment::new(Position::new(-1.0, 1.0), Position::new(-1.0, -1.0)),
        Position::new(-0.8, 0.0),
        Angle::new(3.0/4.0 * PI),
        Some(Position::new(-1.0, 0.2))
    )]
    #[case::vertical_line_segment_left_corner(
        LineSegment::new(Position::new(-1.0, 1.0), Position::new(-1.0, -1.0)),
        Position::new(0.0, 0.0),
        Angle::new(3.0/4.0 * PI),
        Some(Position::new(-1.0, 1.0))
    )]
    #[case::vertical_line_segment_left_behind(
        LineSegment::new(Position::new(-1.0, 1.0), Position::new(-1.0, -1.0)),
        Position::new(-2.0, 0.0),
        Angle::new(3.0/4.0 * PI),
        None
    )]
    #[case::vertical_ray(
        LineSegment::new(Position::new(-2.0, 1.0), Position::new(2.0, 1.0)),
        Position::new(1.0, 0.0),
        Angle::new(0.5 * PI),
        Some(Position::new(1.0, 1.0))
    )]
    fn test_line_segment_intersect_with_ray(
        #[case] line: LineSegment,
        #[case] position: Position,
        #[case] angle: Angle,
        #[case] intersection: Option<Position>,
    ) {
        let result = line.intersect_with_ray(position, angle);
        if let (Some(r), Some(i)) = (result, intersection) {
            assert_abs_diff_eq!(r, i, epsilon = EPSILON);
        } else {
            assert_eq!(result, intersection);
        }
    }

    impl AbsDiffEq for LineSegment {
        type Epsilon = f64;

        fn default_epsilon() -> f64 {
            f64::EPSILON
        }

        fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
            Position::abs_diff_eq(&self.p1, &other.p1, epsilon)
                && Position::abs_diff_eq(&self.p2, &other.p2, epsilon)
        }
    }
}
