//! Terminal charts of the field and the driven path.

use textplots::{Chart, Plot, Shape};

use crate::domain::{GameMap, Position};

const CHART_WIDTH: u32 = 160;
const CHART_HEIGHT: u32 = 80;

/// Upper bound of trajectory points handed to the chart.
const MAX_TRAJECTORY_POINTS: usize = 500;

/// Line chart of the field border, the props inside the field and `trajectory`.
pub fn plot_field(map: &GameMap, trajectory: &[Position]) -> String {
    let border = vec![
        (map.x_min() as f32, map.y_min() as f32),
        (map.x_max() as f32, map.y_min() as f32),
        (map.x_max() as f32, map.y_max() as f32),
        (map.x_min() as f32, map.y_max() as f32),
        (map.x_min() as f32, map.y_min() as f32),
    ];
    let mut lines = vec![border];
    lines.extend(
        map.obstacles()
            .iter()
            .filter(|o| map.contains(*o))
            .map(|o| outline(o.corners())),
    );
    lines.push(downsample(trajectory, MAX_TRAJECTORY_POINTS));

    let mut chart = Chart::new_with_y_range(
        CHART_WIDTH,
        CHART_HEIGHT,
        map.x_min() as f32,
        map.x_max() as f32,
        map.y_min() as f32,
        map.y_max() as f32,
    );
    let chart = chart.lineplot(&Shape::Lines(&[]));
    let shapes = lines.iter().map(|l| Shape::Lines(l)).collect::<Vec<_>>();
    let chart = shapes.iter().fold(chart, |c, s| c.lineplot(s));
    chart.figures();
    chart.to_string()
}

fn outline(corners: [Position; 4]) -> Vec<(f32, f32)> {
    corners
        .iter()
        .chain(corners.first())
        .map(|c| (*c).into())
        .collect()
}

/// Every n-th point so that at most `max` points remain, always keeping the last one.
fn downsample(points: &[Position], max: usize) -> Vec<(f32, f32)> {
    if points.len() <= max || max < 2 {
        return points.iter().map(|p| (*p).into()).collect();
    }
    let stride = points.len().div_ceil(max - 1);
    let mut sampled: Vec<(f32, f32)> = points.iter().step_by(stride).map(|p| (*p).into()).collect();
    if let Some(last) = points.last() {
        if (points.len() - 1) % stride != 0 {
            sampled.push((*last).into());
        }
    }
    sampled
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::domain::MapConfig;

    fn line(n: usize) -> Vec<Position> {
        (0..n).map(|i| Position::new(i as f64, 0.0)).collect()
    }

    #[rstest]
    #[case::short(5, 10, vec![0.0, 1.0, 2.0, 3.0, 4.0])]
    #[case::stride_two(10, 6, vec![0.0, 2.0, 4.0, 6.0, 8.0, 9.0])]
    #[case::exact_end(7, 4, vec![0.0, 3.0, 6.0])]
    fn test_downsample(#[case] n: usize, #[case] max: usize, #[case] expected: Vec<f32>) {
        let sampled = downsample(&line(n), max);
        assert_eq!(sampled.iter().map(|p| p.0).collect::<Vec<_>>(), expected);
        assert!(sampled.len() <= max);
    }

    #[test]
    fn test_outline_is_closed() {
        let corners = [
            Position::new(0.0, 0.0),
            Position::new(1.0, 0.0),
            Position::new(1.0, 1.0),
            Position::new(0.0, 1.0),
        ];
        let outline = outline(corners);
        assert_eq!(outline.len(), 5);
        assert_eq!(outline.first(), outline.last());
    }

    #[test]
    fn test_plot_field_draws_trajectory() {
        let map = GameMap::new(MapConfig::default());
        let empty = plot_field(&map, &[]);
        let driven = plot_field(
            &map,
            &[Position::new(-1000.0, -400.0), Position::new(1000.0, 400.0)],
        );
        assert!(!empty.is_empty());
        assert_ne!(empty, driven);
    }
}
