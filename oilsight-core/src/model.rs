use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tham chiếu lồng tới bản ghi cha (`{ id, name? }`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParentRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Bản ghi phẳng trong danh sách tham chiếu (organization, site, asset, sampling point, user).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Khóa ngoại theo tên trường, ví dụ `parent_site`.
    #[serde(default)]
    pub parents: BTreeMap<String, ParentRef>,
}

impl ReferenceRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            parents: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parent(mut self, field: impl Into<String>, parent_id: impl Into<String>) -> Self {
        self.parents.insert(
            field.into(),
            ParentRef {
                id: parent_id.into(),
                name: None,
            },
        );
        self
    }

    /// Id của bản ghi cha theo tên trường; `None` nếu trường không tồn tại.
    pub fn parent_id(&self, field: &str) -> Option<&str> {
        self.parents.get(field).map(|parent| parent.id.as_str())
    }

    /// Nhãn hiển thị, dùng id khi bản ghi không có tên.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

/// Cặp value/label cho control chọn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Một kết quả đo (kim loại mài mòn hoặc chất nhiễm bẩn).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub name: String,
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl Measurement {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Mẫu dầu đã phân tích.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Sample {
    pub id: String,
    /// Unix timestamp (giây).
    pub date_sampled: i64,
    #[serde(default)]
    pub site: Option<ParentRef>,
    #[serde(default)]
    pub asset: Option<ParentRef>,
    #[serde(default)]
    pub sampling_point: Option<ParentRef>,
    #[serde(default)]
    pub wear_metals: Vec<Measurement>,
    #[serde(default)]
    pub contaminants: Vec<Measurement>,
}

impl Sample {
    pub fn new(id: impl Into<String>, date_sampled: i64) -> Self {
        Self {
            id: id.into(),
            date_sampled,
            ..Self::default()
        }
    }

    pub fn with_wear_metal(mut self, element: &str, value: f64) -> Self {
        self.wear_metals.push(Measurement::new(element, value));
        self
    }

    pub fn with_contaminant(mut self, kind: &str, value: f64) -> Self {
        self.contaminants.push(Measurement::new(kind, value));
        self
    }

    pub fn wear_metal(&self, element: &str) -> Option<f64> {
        find_value(&self.wear_metals, element)
    }

    pub fn contaminant(&self, kind: &str) -> Option<f64> {
        find_value(&self.contaminants, kind)
    }
}

fn find_value(measurements: &[Measurement], name: &str) -> Option<f64> {
    measurements
        .iter()
        .filter(|m| m.name.trim().eq_ignore_ascii_case(name.trim()))
        .find_map(|m| m.value.filter(|v| v.is_finite()))
}

/// Mức độ của thông báo gửi cho người dùng.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Thông báo (toast) mà tầng giao diện sẽ hiển thị.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}
