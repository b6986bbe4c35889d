//! Logic lõi cho bộ lọc phụ thuộc (site → asset → sampling point) và tổng hợp lịch sử mẫu dầu.

mod aggregate;
mod cascade;
mod filter;
mod model;
mod payload;

use std::fmt;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use aggregate::{
    aggregate_history, bucket_and_average, day_key, discover_series, fill_date_gaps,
    format_chart_value, ChartDataPoint, DateRange, HistoryPeriod, SeriesExtractor,
    CONTAMINANT_KEY_PREFIX,
};
pub use cascade::{reconcile_selection, CascadeForm, CascadeState, ReferenceSet};
pub use filter::{filter_by_field, filter_by_parent, to_options};
pub use model::{
    Measurement, Notice, NoticeLevel, ParentRef, ReferenceRecord, Sample, SelectOption,
};
pub use payload::{
    AssetPayload, AssetPayloadBuilder, Attachment, Datasheet, SamplePayload,
    SamplePayloadBuilder,
};

/// Cấu hình dùng chung cho form và biểu đồ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Số ngày mặc định của biểu đồ lịch sử mẫu.
    pub history_days: u32,
    /// Độ lệch múi giờ (phút) dùng để chia mẫu theo ngày.
    pub utc_offset_minutes: i32,
    /// Giữ nguyên lựa chọn đã lưu khi nạp form chỉnh sửa.
    pub hydration_guard: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            history_days: 7,
            utc_offset_minutes: 0,
            hydration_guard: true,
        }
    }
}

impl DashboardConfig {
    /// Múi giờ cố định tương ứng với `utc_offset_minutes`, quay về UTC nếu ngoài phạm vi.
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Giá trị lựa chọn của một trường trong chuỗi lọc.
///
/// Đây là sentinel duy nhất cho "chưa chọn": trên wire được ghi là chuỗi rỗng,
/// khi đọc thì `""`, `"none"` và `null` đều được hiểu là [`Selection::None`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Selection {
    #[default]
    None,
    Id(String),
}

impl Selection {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Selection::None,
            Some(value) if value.eq_ignore_ascii_case("none") => Selection::None,
            Some(value) => Selection::Id(value.to_string()),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Selection::None => None,
            Selection::Id(id) => Some(id),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Chuỗi gửi lên backend (`""` khi chưa chọn).
    pub fn as_wire(&self) -> &str {
        self.id().unwrap_or_default()
    }
}

impl From<&str> for Selection {
    fn from(value: &str) -> Self {
        Selection::from_raw(Some(value))
    }
}

impl From<String> for Selection {
    fn from(value: String) -> Self {
        Selection::from_raw(Some(&value))
    }
}

impl From<Option<String>> for Selection {
    fn from(value: Option<String>) -> Self {
        Selection::from_raw(value.as_deref())
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Selection::from_raw(raw.as_deref()))
    }
}

/// Các cấp trong chuỗi lọc, từ cha tới con.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CascadeLevel {
    Organization,
    Site,
    Asset,
    SamplingPoint,
}

impl CascadeLevel {
    pub const ALL: [CascadeLevel; 4] = [
        CascadeLevel::Organization,
        CascadeLevel::Site,
        CascadeLevel::Asset,
        CascadeLevel::SamplingPoint,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn parent(self) -> Option<CascadeLevel> {
        self.index()
            .checked_sub(1)
            .map(|idx| CascadeLevel::ALL[idx])
    }

    pub fn ancestors(self) -> &'static [CascadeLevel] {
        &CascadeLevel::ALL[..self.index()]
    }

    pub fn descendants(self) -> &'static [CascadeLevel] {
        &CascadeLevel::ALL[self.index() + 1..]
    }

    /// Tên trường tham chiếu cha trong bản ghi của cấp này.
    pub fn parent_field(self) -> Option<&'static str> {
        match self {
            CascadeLevel::Organization => None,
            CascadeLevel::Site => Some("organization"),
            CascadeLevel::Asset => Some("parent_site"),
            CascadeLevel::SamplingPoint => Some("parent_asset"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CascadeLevel::Organization => "organization",
            CascadeLevel::Site => "site",
            CascadeLevel::Asset => "asset",
            CascadeLevel::SamplingPoint => "sampling point",
        }
    }

    pub fn plural_label(self) -> &'static str {
        match self {
            CascadeLevel::Organization => "organizations",
            CascadeLevel::Site => "sites",
            CascadeLevel::Asset => "assets",
            CascadeLevel::SamplingPoint => "sampling points",
        }
    }
}

impl fmt::Display for CascadeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Danh sách tham chiếu đang tải hoặc đã sẵn sàng.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Loadable<T> {
    #[default]
    Pending,
    Ready(T),
}

impl<T> Loadable<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Pending => None,
            Loadable::Ready(value) => Some(value),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Loadable::Ready(_))
    }
}

/// Lỗi chung của thư viện.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Dữ liệu đầu vào thiếu thông tin tối thiểu")]
    MissingData,
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
    #[error("Backend trả về HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Lỗi kết nối: {0}")]
    Network(String),
    #[error("Chưa chọn {0}")]
    MissingSelection(CascadeLevel),
    #[error("Khoảng ngày không hợp lệ")]
    InvalidRange,
    #[error("Lỗi khác: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_sentinels_collapse_to_none() {
        assert_eq!(Selection::from_raw(None), Selection::None);
        assert_eq!(Selection::from("  "), Selection::None);
        assert_eq!(Selection::from("none"), Selection::None);
        assert_eq!(Selection::from("NONE"), Selection::None);
        assert_eq!(Selection::from("s1"), Selection::Id("s1".into()));
    }

    #[test]
    fn selection_wire_format_is_empty_string() {
        let json = serde_json::to_string(&Selection::None).unwrap();
        assert_eq!(json, "\"\"");

        let parsed: Selection = serde_json::from_str("null").unwrap();
        assert!(parsed.is_none());
        let parsed: Selection = serde_json::from_str("\"a1\"").unwrap();
        assert_eq!(parsed.id(), Some("a1"));
    }

    #[test]
    fn cascade_levels_know_their_neighbours() {
        assert_eq!(CascadeLevel::Organization.parent(), None);
        assert_eq!(CascadeLevel::Asset.parent(), Some(CascadeLevel::Site));
        assert_eq!(
            CascadeLevel::Site.descendants(),
            &[CascadeLevel::Asset, CascadeLevel::SamplingPoint]
        );
        assert_eq!(
            CascadeLevel::Asset.ancestors(),
            &[CascadeLevel::Organization, CascadeLevel::Site]
        );
        assert!(CascadeLevel::SamplingPoint.descendants().is_empty());
    }

    #[test]
    fn config_offset_falls_back_to_utc() {
        let cfg = DashboardConfig {
            utc_offset_minutes: 420,
            ..DashboardConfig::default()
        };
        assert_eq!(cfg.offset().local_minus_utc(), 420 * 60);

        let broken = DashboardConfig {
            utc_offset_minutes: i32::MAX,
            ..DashboardConfig::default()
        };
        assert_eq!(broken.offset().local_minus_utc(), 0);
    }
}
