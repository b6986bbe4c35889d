//! Hình học biểu đồ lịch sử mẫu (không phụ thuộc DOM).

use chrono::NaiveDate;
use oilsight_core::ChartDataPoint;

pub const PALETTE: [&str; 8] = [
    "#2563eb", "#dc6803", "#067647", "#b42318", "#7a5af8", "#0e9384", "#c11574", "#475467",
];

/// Kích thước vùng vẽ SVG.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            width: 720.0,
            height: 280.0,
            padding: 32.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub key: String,
    pub color: &'static str,
    pub points: Vec<PlotPoint>,
    /// Thuộc tính `d` của `<path>`.
    pub path: String,
}

pub fn series_keys(points: &[ChartDataPoint]) -> Vec<String> {
    points
        .first()
        .map(|point| point.values.keys().cloned().collect())
        .unwrap_or_default()
}

pub fn has_data(points: &[ChartDataPoint]) -> bool {
    points
        .iter()
        .any(|point| point.values.values().any(|value| *value != 0.0))
}

/// Giá trị lớn nhất trên trục y; 1.0 khi mọi điểm bằng 0.
pub fn value_ceiling(points: &[ChartDataPoint]) -> f64 {
    let max = points
        .iter()
        .flat_map(|point| point.values.values().copied())
        .fold(0.0_f64, f64::max);
    if max > 0.0 {
        max
    } else {
        1.0
    }
}

pub fn project(points: &[ChartDataPoint], layout: &ChartLayout) -> Vec<PlotSeries> {
    let ceiling = value_ceiling(points);
    let count = points.len();

    series_keys(points)
        .into_iter()
        .enumerate()
        .map(|(idx, key)| {
            let plotted: Vec<PlotPoint> = points
                .iter()
                .enumerate()
                .map(|(i, point)| {
                    let value = point.value(&key);
                    PlotPoint {
                        x: x_at(i, count, layout),
                        y: y_at(value, ceiling, layout),
                        date: point.date,
                        value,
                    }
                })
                .collect();
            let path = svg_path(&plotted);
            PlotSeries {
                key,
                color: PALETTE[idx % PALETTE.len()],
                points: plotted,
                path,
            }
        })
        .collect()
}

/// Nhãn trục x, tối đa `max_ticks` nhãn.
pub fn x_ticks(points: &[ChartDataPoint], layout: &ChartLayout, max_ticks: usize) -> Vec<(f64, String)> {
    let count = points.len();
    if count == 0 || max_ticks == 0 {
        return Vec::new();
    }
    let step = count.div_ceil(max_ticks).max(1);

    points
        .iter()
        .enumerate()
        .step_by(step)
        .map(|(i, point)| (x_at(i, count, layout), point.date.format("%d/%m").to_string()))
        .collect()
}

fn x_at(index: usize, count: usize, layout: &ChartLayout) -> f64 {
    let inner = layout.width - 2.0 * layout.padding;
    if count <= 1 {
        return layout.padding + inner / 2.0;
    }
    layout.padding + inner * index as f64 / (count - 1) as f64
}

fn y_at(value: f64, ceiling: f64, layout: &ChartLayout) -> f64 {
    let inner = layout.height - 2.0 * layout.padding;
    layout.height - layout.padding - inner * (value / ceiling)
}

fn svg_path(points: &[PlotPoint]) -> String {
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let command = if i == 0 { 'M' } else { 'L' };
            format!("{command}{:.1} {:.1}", point.x, point.y)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn point(day: u32, iron: f64) -> ChartDataPoint {
        ChartDataPoint {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            values: BTreeMap::from([("iron".to_string(), iron)]),
        }
    }

    #[test]
    fn projection_spans_the_inner_box() {
        let layout = ChartLayout {
            width: 100.0,
            height: 60.0,
            padding: 10.0,
        };
        let series = project(&[point(1, 0.0), point(2, 5.0), point(3, 10.0)], &layout);

        assert_eq!(series.len(), 1);
        let plotted = &series[0].points;
        assert_eq!(plotted[0].x, 10.0);
        assert_eq!(plotted[2].x, 90.0);
        assert_eq!(plotted[0].y, 50.0);
        assert_eq!(plotted[2].y, 10.0);
        assert_eq!(series[0].path, "M10.0 50.0 L50.0 30.0 L90.0 10.0");
        assert_eq!(series[0].color, PALETTE[0]);
    }

    #[test]
    fn all_zero_chart_keeps_a_unit_axis() {
        let points = vec![point(1, 0.0), point(2, 0.0)];
        assert_eq!(value_ceiling(&points), 1.0);
        assert!(!has_data(&points));
        assert!(has_data(&[point(1, 0.5)]));
    }

    #[test]
    fn ticks_are_thinned() {
        let points: Vec<ChartDataPoint> = (1..=10).map(|d| point(d, 1.0)).collect();
        let ticks = x_ticks(&points, &ChartLayout::default(), 4);
        let labels: Vec<&str> = ticks.iter().map(|(_, label)| label.as_str()).collect();
        assert_eq!(labels, vec!["01/03", "04/03", "07/03", "10/03"]);
        assert!(x_ticks(&[], &ChartLayout::default(), 4).is_empty());
    }

    #[test]
    fn single_point_is_centered() {
        let layout = ChartLayout::default();
        let series = project(&[point(1, 3.0)], &layout);
        assert_eq!(series[0].points[0].x, layout.width / 2.0);
    }
}
