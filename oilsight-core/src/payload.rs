//! Builder cho payload gửi lên backend, thay cho việc ghép object có điều kiện.

use serde::{Deserialize, Serialize};

use crate::{CascadeLevel, CascadeState, DashboardError, Measurement, Selection};

/// Thao tác với datasheet của asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Datasheet {
    #[default]
    Keep,
    Remove,
    Uploaded { file_name: String, url: String },
}

/// Tệp đính kèm đã được tải lên (URL do dịch vụ lưu trữ cấp).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetPayload {
    pub name: String,
    pub parent_site: String,
    pub model: Option<String>,
    pub datasheet: Datasheet,
    pub attachments: Vec<Attachment>,
}

impl AssetPayload {
    pub fn builder(name: impl Into<String>, site: Selection) -> AssetPayloadBuilder {
        AssetPayloadBuilder {
            name: name.into(),
            site,
            model: None,
            datasheet: Datasheet::Keep,
            attachments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssetPayloadBuilder {
    name: String,
    site: Selection,
    model: Option<String>,
    datasheet: Datasheet,
    attachments: Vec<Attachment>,
}

impl AssetPayloadBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = (!model.trim().is_empty()).then_some(model);
        self
    }

    pub fn datasheet(mut self, datasheet: Datasheet) -> Self {
        self.datasheet = datasheet;
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn build(self) -> Result<AssetPayload, DashboardError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DashboardError::MissingData);
        }
        let parent_site = self
            .site
            .id()
            .ok_or(DashboardError::MissingSelection(CascadeLevel::Site))?
            .to_string();

        Ok(AssetPayload {
            name,
            parent_site,
            model: self.model,
            datasheet: self.datasheet,
            attachments: self.attachments,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplePayload {
    pub site: Option<String>,
    pub asset: Option<String>,
    pub sampling_point: String,
    pub date_sampled: i64,
    pub wear_metals: Vec<Measurement>,
    pub contaminants: Vec<Measurement>,
}

impl SamplePayload {
    pub fn builder(sampling_point: Selection) -> SamplePayloadBuilder {
        SamplePayloadBuilder {
            site: Selection::None,
            asset: Selection::None,
            sampling_point,
            date_sampled: None,
            wear_metals: Vec::new(),
            contaminants: Vec::new(),
        }
    }

    /// Lấy site/asset/sampling point từ trạng thái chuỗi lọc của form.
    pub fn from_cascade(state: &CascadeState) -> SamplePayloadBuilder {
        Self::builder(state.get(CascadeLevel::SamplingPoint).clone())
            .site(state.get(CascadeLevel::Site).clone())
            .asset(state.get(CascadeLevel::Asset).clone())
    }
}

#[derive(Debug, Clone)]
pub struct SamplePayloadBuilder {
    site: Selection,
    asset: Selection,
    sampling_point: Selection,
    date_sampled: Option<i64>,
    wear_metals: Vec<Measurement>,
    contaminants: Vec<Measurement>,
}

impl SamplePayloadBuilder {
    pub fn site(mut self, site: Selection) -> Self {
        self.site = site;
        self
    }

    pub fn asset(mut self, asset: Selection) -> Self {
        self.asset = asset;
        self
    }

    pub fn date_sampled(mut self, timestamp: i64) -> Self {
        self.date_sampled = Some(timestamp);
        self
    }

    pub fn wear_metal(mut self, measurement: Measurement) -> Self {
        self.wear_metals.push(measurement);
        self
    }

    pub fn contaminant(mut self, measurement: Measurement) -> Self {
        self.contaminants.push(measurement);
        self
    }

    pub fn build(self) -> Result<SamplePayload, DashboardError> {
        let sampling_point = self
            .sampling_point
            .id()
            .ok_or(DashboardError::MissingSelection(CascadeLevel::SamplingPoint))?
            .to_string();
        let date_sampled = self.date_sampled.ok_or(DashboardError::MissingData)?;

        Ok(SamplePayload {
            site: self.site.id().map(str::to_string),
            asset: self.asset.id().map(str::to_string),
            sampling_point,
            date_sampled,
            wear_metals: self.wear_metals,
            contaminants: self.contaminants,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn asset_payload_has_definite_shape() {
        let payload = AssetPayload::builder("Main pump", Selection::from("s1"))
            .build()
            .unwrap();

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "name": "Main pump",
                "parent_site": "s1",
                "model": null,
                "datasheet": {"action": "keep"},
                "attachments": []
            })
        );
    }

    #[test]
    fn uploaded_datasheet_and_attachments_are_included() {
        let payload = AssetPayload::builder("Gearbox", Selection::from("s2"))
            .model("  ")
            .datasheet(Datasheet::Uploaded {
                file_name: "gearbox.pdf".into(),
                url: "https://files.example/gearbox.pdf".into(),
            })
            .attachment(Attachment {
                file_name: "photo.jpg".into(),
                url: "https://files.example/photo.jpg".into(),
            })
            .build()
            .unwrap();

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["model"], json!(null));
        assert_eq!(value["datasheet"]["action"], "uploaded");
        assert_eq!(value["datasheet"]["file_name"], "gearbox.pdf");
        assert_eq!(value["attachments"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn asset_requires_site() {
        let err = AssetPayload::builder("Pump", Selection::None)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::MissingSelection(CascadeLevel::Site)
        ));
        assert!(AssetPayload::builder(" ", Selection::from("s1")).build().is_err());
    }

    #[test]
    fn sample_payload_follows_cascade_state() {
        let mut state = CascadeState::new();
        state.select(CascadeLevel::Site, Selection::from("s1"));
        state.select(CascadeLevel::Asset, Selection::from("a1"));
        state.select(CascadeLevel::SamplingPoint, Selection::from("p1"));

        let payload = SamplePayload::from_cascade(&state)
            .date_sampled(1_709_251_200)
            .wear_metal(Measurement::new("iron", 12.0).with_unit("ppm"))
            .build()
            .unwrap();

        assert_eq!(payload.site.as_deref(), Some("s1"));
        assert_eq!(payload.asset.as_deref(), Some("a1"));
        assert_eq!(payload.sampling_point, "p1");
        assert_eq!(payload.wear_metals.len(), 1);
    }

    #[test]
    fn sample_requires_point_and_date() {
        let missing_point = SamplePayload::builder(Selection::None)
            .date_sampled(1)
            .build();
        assert!(matches!(
            missing_point,
            Err(DashboardError::MissingSelection(CascadeLevel::SamplingPoint))
        ));

        let missing_date = SamplePayload::builder(Selection::from("p1")).build();
        assert!(matches!(missing_date, Err(DashboardError::MissingData)));
    }
}
