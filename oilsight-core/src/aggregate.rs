//! Gom mẫu theo ngày, lấy trung bình từng chuỗi đo và lấp các ngày trống cho biểu đồ.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{DashboardError, Sample};

/// Một điểm trên biểu đồ: ngày và giá trị của từng chuỗi.
///
/// Được serialize phẳng: `{"date": "2024-03-01", "iron": 15.0, "water": 0.2}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartDataPoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl ChartDataPoint {
    pub fn zero<S: AsRef<str>>(date: NaiveDate, series: &[S]) -> Self {
        Self {
            date,
            values: series
                .iter()
                .map(|key| (key.as_ref().to_string(), 0.0))
                .collect(),
        }
    }

    pub fn value(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }
}

/// Khoảng ngày đóng `start..=end`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DashboardError> {
        if start > end {
            return Err(DashboardError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    /// `days` ngày kết thúc tại `end` (tính cả `end`).
    pub fn last_n_days(end: NaiveDate, days: u32) -> Result<Self, DashboardError> {
        let span = days.checked_sub(1).ok_or(DashboardError::InvalidRange)?;
        let start = end
            .checked_sub_signed(Duration::days(i64::from(span)))
            .ok_or(DashboardError::InvalidRange)?;
        Self::new(start, end)
    }

    pub fn day_count(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

/// Các khoảng thời gian chọn sẵn trên màn hình lịch sử mẫu.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPeriod {
    #[default]
    Week,
    Month,
    Quarter,
    Year,
}

impl HistoryPeriod {
    pub const ALL: [HistoryPeriod; 4] = [
        HistoryPeriod::Week,
        HistoryPeriod::Month,
        HistoryPeriod::Quarter,
        HistoryPeriod::Year,
    ];

    pub fn days(self) -> u32 {
        match self {
            HistoryPeriod::Week => 7,
            HistoryPeriod::Month => 30,
            HistoryPeriod::Quarter => 90,
            HistoryPeriod::Year => 365,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HistoryPeriod::Week => "Last 7 days",
            HistoryPeriod::Month => "Last 30 days",
            HistoryPeriod::Quarter => "Last 90 days",
            HistoryPeriod::Year => "Last 12 months",
        }
    }

    pub fn range_ending(self, end: NaiveDate) -> Result<DateRange, DashboardError> {
        DateRange::last_n_days(end, self.days())
    }
}

type Extract = Box<dyn Fn(&Sample) -> Option<f64> + Send + Sync>;

/// Chuỗi đo có tên và hàm lấy giá trị từ một mẫu.
pub struct SeriesExtractor {
    key: String,
    extract: Extract,
}

impl SeriesExtractor {
    pub fn custom<F>(key: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&Sample) -> Option<f64> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            extract: Box::new(extract),
        }
    }

    pub fn wear_metal(element: &str) -> Self {
        let element = normalize_series_name(element);
        let lookup = element.clone();
        Self::custom(element, move |sample| sample.wear_metal(&lookup))
    }

    pub fn contaminant(kind: &str) -> Self {
        let kind = normalize_series_name(kind);
        let lookup = kind.clone();
        Self::custom(kind, move |sample| sample.contaminant(&lookup))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn extract(&self, sample: &Sample) -> Option<f64> {
        (self.extract)(sample)
    }
}

impl fmt::Debug for SeriesExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeriesExtractor")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

fn normalize_series_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Tiền tố khóa cho chất nhiễm bẩn trùng tên với một kim loại mài mòn.
pub const CONTAMINANT_KEY_PREFIX: &str = "contaminant:";

/// Tạo một chuỗi cho mỗi kim loại mài mòn và mỗi loại nhiễm bẩn xuất hiện trong dữ liệu.
///
/// Kim loại đứng trước, chất nhiễm bẩn sau. Chất nhiễm bẩn trùng tên với kim
/// loại nhận khóa `contaminant:<tên>`.
pub fn discover_series(samples: &[Sample]) -> Vec<SeriesExtractor> {
    let metals: BTreeSet<String> = samples
        .iter()
        .flat_map(|sample| sample.wear_metals.iter())
        .map(|m| normalize_series_name(&m.name))
        .filter(|name| is_usable_series_name(name))
        .collect();

    let contaminants: BTreeSet<String> = samples
        .iter()
        .flat_map(|sample| sample.contaminants.iter())
        .map(|m| normalize_series_name(&m.name))
        .filter(|name| is_usable_series_name(name))
        .collect();

    let contaminant_series = contaminants.iter().map(|name| {
        if metals.contains(name) {
            let lookup = name.clone();
            SeriesExtractor::custom(format!("{CONTAMINANT_KEY_PREFIX}{name}"), move |sample| {
                sample.contaminant(&lookup)
            })
        } else {
            SeriesExtractor::contaminant(name)
        }
    });

    metals
        .iter()
        .map(|name| SeriesExtractor::wear_metal(name))
        .chain(contaminant_series)
        .collect()
}

// "date" is the x-axis key of every point.
fn is_usable_series_name(name: &str) -> bool {
    !name.is_empty() && name != "date"
}

/// Ngày (theo `offset`) của một Unix timestamp tính bằng giây.
pub fn day_key(timestamp: i64, offset: FixedOffset) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(&offset).date_naive())
}

/// Gom mẫu theo `date_key` và lấy trung bình từng chuỗi.
///
/// Trung bình chia cho số mẫu có giá trị của chuỗi đó, không chia cho số mẫu
/// trong nhóm. Chuỗi không có giá trị nào trong nhóm nhận 0. Mẫu không tính
/// được ngày bị bỏ qua.
pub fn bucket_and_average<F>(
    samples: &[Sample],
    date_key: F,
    extractors: &[SeriesExtractor],
) -> Vec<ChartDataPoint>
where
    F: Fn(&Sample) -> Option<NaiveDate>,
{
    let mut buckets: BTreeMap<NaiveDate, Vec<(f64, usize)>> = BTreeMap::new();

    for sample in samples {
        let Some(day) = date_key(sample) else {
            continue;
        };
        let totals = buckets
            .entry(day)
            .or_insert_with(|| vec![(0.0, 0); extractors.len()]);

        for (slot, extractor) in totals.iter_mut().zip(extractors) {
            if let Some(value) = extractor.extract(sample).filter(|v| v.is_finite()) {
                slot.0 += value;
                slot.1 += 1;
            }
        }
    }

    buckets
        .into_iter()
        .map(|(date, totals)| ChartDataPoint {
            date,
            values: extractors
                .iter()
                .zip(totals)
                .map(|(extractor, (sum, count))| {
                    let mean = if count == 0 { 0.0 } else { sum / count as f64 };
                    (extractor.key().to_string(), mean)
                })
                .collect(),
        })
        .collect()
}

/// Lấp đầy từng ngày trong `range` bằng điểm 0.
///
/// Đầu ra có đúng `range.day_count()` điểm; điểm nằm ngoài `range` bị bỏ.
/// Mọi điểm đầu ra có cùng tập khóa: `series` cộng với khóa của các điểm trong `range`.
pub fn fill_date_gaps<S: AsRef<str>>(
    points: Vec<ChartDataPoint>,
    range: &DateRange,
    series: &[S],
) -> Vec<ChartDataPoint> {
    let mut by_date: BTreeMap<NaiveDate, ChartDataPoint> = points
        .into_iter()
        .filter(|point| range.contains(point.date))
        .map(|point| (point.date, point))
        .collect();

    let mut keys: BTreeSet<String> = series.iter().map(|s| s.as_ref().to_string()).collect();
    for point in by_date.values() {
        keys.extend(point.values.keys().cloned());
    }
    let keys: Vec<String> = keys.into_iter().collect();

    range
        .days()
        .map(|day| match by_date.remove(&day) {
            Some(mut point) => {
                for key in &keys {
                    point.values.entry(key.clone()).or_insert(0.0);
                }
                point
            }
            None => ChartDataPoint::zero(day, &keys),
        })
        .collect()
}

/// Gom theo ngày rồi lấp khoảng trống: dữ liệu cho biểu đồ lịch sử mẫu.
///
/// Chỉ mẫu có ngày nằm trong `range` được tính.
pub fn aggregate_history(
    samples: &[Sample],
    extractors: &[SeriesExtractor],
    range: &DateRange,
    offset: FixedOffset,
) -> Vec<ChartDataPoint> {
    let points = bucket_and_average(
        samples,
        |sample| day_key(sample.date_sampled, offset).filter(|day| range.contains(*day)),
        extractors,
    );
    let keys: Vec<&str> = extractors.iter().map(SeriesExtractor::key).collect();
    fill_date_gaps(points, range, &keys)
}

/// Định dạng giá trị cho tooltip (2 chữ số thập phân).
pub fn format_chart_value(value: f64) -> String {
    format!("{value:.2}")
}
