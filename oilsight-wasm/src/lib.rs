//! Bridge WASM <-> JavaScript trung lập framework.

use chrono::{NaiveDate, Utc};
use oilsight_api::{parse_reference_list, parse_samples};
use oilsight_core::{
    aggregate_history, discover_series, filter_by_field, reconcile_selection, to_options,
    CascadeLevel, CascadeState, ChartDataPoint, DashboardConfig, DashboardError, DateRange,
    SelectOption, Selection, SeriesExtractor, CONTAMINANT_KEY_PREFIX,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize, Default)]
struct JsHistoryConfig {
    #[serde(default)]
    history_days: Option<u32>,
    #[serde(default)]
    utc_offset_minutes: Option<i32>,
    /// Ngày cuối của biểu đồ (`YYYY-MM-DD`), mặc định là hôm nay.
    #[serde(default)]
    end_date: Option<NaiveDate>,
    /// Danh sách chuỗi cần vẽ; bỏ trống để lấy mọi chuỗi có trong dữ liệu.
    #[serde(default)]
    series: Option<Vec<String>>,
}

impl From<&JsHistoryConfig> for DashboardConfig {
    fn from(cfg: &JsHistoryConfig) -> Self {
        let mut base = DashboardConfig::default();
        if let Some(days) = cfg.history_days {
            base.history_days = days;
        }
        if let Some(minutes) = cfg.utc_offset_minutes {
            base.utc_offset_minutes = minutes;
        }
        base
    }
}

#[derive(Deserialize, Default)]
struct JsPersistedSelection {
    #[serde(default)]
    organization: Selection,
    #[serde(default)]
    site: Selection,
    #[serde(default)]
    asset: Selection,
    #[serde(default)]
    sampling_point: Selection,
}

#[derive(Serialize)]
struct JsCascadeUpdate {
    state: CascadeState,
    cleared: Vec<CascadeLevel>,
}

/// Lọc danh sách tham chiếu theo id cha, trả về cặp `{ value, label }`.
#[wasm_bindgen]
pub fn filter_options(items: JsValue, field: &str, parent: JsValue) -> Result<JsValue, JsValue> {
    init_panic_hook();

    let items = from_value::<Value>(items)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được danh sách: {err}")))?;
    let parent = selection_from_js(parent)?;

    let options = filter_options_value(&items, field, &parent)
        .map_err(|err| JsValue::from_str(&format_dashboard_error(err)))?;

    to_value(&options)
        .map_err(|err| JsValue::from_str(&format!("Không serialize options: {err}")))
}

/// Trả về lựa chọn còn hợp lệ, hoặc chuỗi rỗng nếu nó không còn trong danh sách con.
#[wasm_bindgen]
pub fn reconcile_child(children: JsValue, current: JsValue) -> Result<String, JsValue> {
    let children = from_value::<Value>(children)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được danh sách con: {err}")))?;
    let current = selection_from_js(current)?;
    Ok(reconcile_value(&children, &current).as_wire().to_string())
}

/// Nạp trạng thái chuỗi lọc từ bản ghi đã lưu `{ site, asset, sampling_point }`.
#[wasm_bindgen]
pub fn hydrate_cascade(persisted: JsValue) -> Result<JsValue, JsValue> {
    let persisted: JsPersistedSelection = if persisted.is_undefined() || persisted.is_null() {
        JsPersistedSelection::default()
    } else {
        from_value(persisted)
            .map_err(|err| JsValue::from_str(&format!("Không đọc được bản ghi: {err}")))?
    };

    to_value(&hydrate_value(persisted))
        .map_err(|err| JsValue::from_str(&format!("Không serialize trạng thái: {err}")))
}

/// Người dùng chọn giá trị cho một cấp; trả về `{ state, cleared }`.
#[wasm_bindgen]
pub fn cascade_select(state: JsValue, level: JsValue, value: JsValue) -> Result<JsValue, JsValue> {
    let state: CascadeState = if state.is_undefined() || state.is_null() {
        CascadeState::new()
    } else {
        from_value(state)
            .map_err(|err| JsValue::from_str(&format!("Không đọc được trạng thái: {err}")))?
    };
    let level: CascadeLevel = from_value(level)
        .map_err(|err| JsValue::from_str(&format!("Cấp không hợp lệ: {err}")))?;
    let value = selection_from_js(value)?;

    to_value(&cascade_select_value(state, level, value))
        .map_err(|err| JsValue::from_str(&format!("Không serialize trạng thái: {err}")))
}

/// Gom mẫu theo ngày thành dữ liệu biểu đồ liên tục.
#[wasm_bindgen]
pub fn aggregate_samples(samples: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    init_panic_hook();

    let samples = from_value::<Value>(samples)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON mẫu: {err}")))?;

    let cfg = match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => from_value(js_cfg)
            .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?,
        _ => JsHistoryConfig::default(),
    };

    let today = Utc::now().date_naive();
    let points = aggregate_value(&samples, &cfg, today)
        .map_err(|err| JsValue::from_str(&format_dashboard_error(err)))?;

    to_value(&points).map_err(|err| JsValue::from_str(&format!("Không serialize biểu đồ: {err}")))
}

fn init_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn selection_from_js(value: JsValue) -> Result<Selection, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(Selection::None);
    }
    from_value(value).map_err(|err| JsValue::from_str(&format!("Lựa chọn không hợp lệ: {err}")))
}

fn filter_options_value(
    items: &Value,
    field: &str,
    parent: &Selection,
) -> Result<Vec<SelectOption>, DashboardError> {
    let records = parse_reference_list(items)?;
    Ok(to_options(&filter_by_field(&records, field, parent)))
}

fn reconcile_value(children: &Value, current: &Selection) -> Selection {
    let ids: Vec<&str> = children
        .as_array()
        .map(|entries| entries.iter().filter_map(child_id).collect())
        .unwrap_or_default();
    reconcile_selection(ids, current)
}

// Con có thể là chuỗi id, bản ghi `{ id }` hoặc option `{ value }`.
fn child_id(entry: &Value) -> Option<&str> {
    entry
        .as_str()
        .or_else(|| entry.get("id").and_then(Value::as_str))
        .or_else(|| entry.get("value").and_then(Value::as_str))
}

fn hydrate_value(persisted: JsPersistedSelection) -> CascadeState {
    CascadeState::hydrate([
        (CascadeLevel::Organization, persisted.organization),
        (CascadeLevel::Site, persisted.site),
        (CascadeLevel::Asset, persisted.asset),
        (CascadeLevel::SamplingPoint, persisted.sampling_point),
    ])
}

fn cascade_select_value(
    mut state: CascadeState,
    level: CascadeLevel,
    value: Selection,
) -> JsCascadeUpdate {
    let cleared = state.select(level, value);
    JsCascadeUpdate { state, cleared }
}

fn aggregate_value(
    samples: &Value,
    cfg: &JsHistoryConfig,
    today: NaiveDate,
) -> Result<Vec<ChartDataPoint>, DashboardError> {
    let samples = parse_samples(samples)?;
    let config = DashboardConfig::from(cfg);
    let range = DateRange::last_n_days(cfg.end_date.unwrap_or(today), config.history_days)?;

    let extractors = match &cfg.series {
        Some(keys) => keys.iter().map(|key| any_measurement(key)).collect(),
        None => discover_series(&samples),
    };

    Ok(aggregate_history(
        &samples,
        &extractors,
        &range,
        config.offset(),
    ))
}

// `contaminant:<tên>` chỉ đọc chất nhiễm bẩn; tên trần ưu tiên kim loại mài mòn.
fn any_measurement(key: &str) -> SeriesExtractor {
    let name = key.trim().to_lowercase();
    if let Some(kind) = name.strip_prefix(CONTAMINANT_KEY_PREFIX) {
        let lookup = kind.trim().to_string();
        return SeriesExtractor::custom(name.clone(), move |sample| sample.contaminant(&lookup));
    }
    let lookup = name.clone();
    SeriesExtractor::custom(name, move |sample| {
        sample
            .wear_metal(&lookup)
            .or_else(|| sample.contaminant(&lookup))
    })
}

fn format_dashboard_error(err: DashboardError) -> String {
    format!("Dashboard error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn options_are_filtered_by_parent() {
        let items = json!([
            {"id": "a1", "name": "Pump", "parent_site": {"id": "s1"}},
            {"id": "a2", "parent_site": {"id": "s2"}}
        ]);
        let options = filter_options_value(&items, "parent_site", &Selection::from("s1")).unwrap();
        assert_eq!(
            options,
            vec![SelectOption {
                value: "a1".into(),
                label: "Pump".into()
            }]
        );
    }

    #[test]
    fn reconcile_accepts_ids_records_and_options() {
        let children = json!(["a1", {"id": "a2"}, {"value": "a3", "label": "A3"}]);
        for id in ["a1", "a2", "a3"] {
            assert_eq!(
                reconcile_value(&children, &Selection::from(id)).id(),
                Some(id)
            );
        }
        assert!(reconcile_value(&children, &Selection::from("a9")).is_none());
        assert!(reconcile_value(&json!(null), &Selection::from("a1")).is_none());
    }

    #[test]
    fn hydrated_state_round_trips_through_select() {
        let state = hydrate_value(JsPersistedSelection {
            site: Selection::from("s1"),
            asset: Selection::from("a1"),
            ..JsPersistedSelection::default()
        });
        assert!(state.is_guarded(CascadeLevel::Asset));

        let update = cascade_select_value(state, CascadeLevel::Site, Selection::from("s2"));
        assert_eq!(update.cleared, vec![CascadeLevel::Asset]);
        assert!(!update.state.is_guarded(CascadeLevel::Asset));
    }

    #[test]
    fn aggregate_defaults_to_window_ending_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let samples = json!([
            {"id": "1", "date_sampled": 1709280000, "wear_metals": [{"element": "iron", "value": 10}]},
            {"id": "2", "date_sampled": 1709283600, "wear_metals": [{"element": "iron", "value": 20}]}
        ]);

        let points = aggregate_value(&samples, &JsHistoryConfig::default(), today).unwrap();
        assert_eq!(points.len(), 7);
        assert_eq!(points[0].value("iron"), 15.0);

        let cfg = JsHistoryConfig {
            history_days: Some(3),
            series: Some(vec!["Water".into()]),
            ..JsHistoryConfig::default()
        };
        let points = aggregate_value(&json!([]), &cfg, today).unwrap();
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|p| p.values.keys().eq(["water"])));
    }

    #[test]
    fn prefixed_series_reads_the_contaminant() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let samples = json!([{
            "id": "1",
            "date_sampled": 1709280000,
            "wear_metals": [{"element": "silicon", "value": 4}],
            "contaminants": [{"type": "silicon", "value": 11}]
        }]);
        let cfg = JsHistoryConfig {
            history_days: Some(1),
            series: Some(vec!["silicon".into(), "contaminant:silicon".into()]),
            ..JsHistoryConfig::default()
        };

        let points = aggregate_value(&samples, &cfg, today).unwrap();
        assert_eq!(points[0].value("silicon"), 4.0);
        assert_eq!(points[0].value("contaminant:silicon"), 11.0);

        let discovered = aggregate_value(&samples, &JsHistoryConfig::default(), today).unwrap();
        assert_eq!(discovered[6].value("contaminant:silicon"), 11.0);
    }
}
