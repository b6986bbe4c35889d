//! Thành phần giao diện chuỗi lọc và biểu đồ lịch sử mẫu cho WebAssembly.

mod chart;
#[cfg(target_arch = "wasm32")]
mod styles;

use oilsight_api::parse_reference_list;
use oilsight_core::{CascadeLevel, Loadable, Notice, ReferenceSet};
use serde_json::Value;

pub use chart::{
    has_data, project, series_keys, value_ceiling, x_ticks, ChartLayout, PlotPoint, PlotSeries,
    PALETTE,
};

/// Đọc `{ organizations, sites, assets, sampling_points, users }` từ trang chủ.
///
/// Khóa vắng mặt nghĩa là danh sách còn đang tải. Danh sách đọc lỗi trở
/// thành rỗng kèm một cảnh báo.
pub fn reference_set_from_value(value: &Value) -> (ReferenceSet, Vec<Notice>) {
    let mut reference = ReferenceSet::default();
    let mut notices = Vec::new();

    for level in CascadeLevel::ALL {
        let Some(raw) = value.get(level_key(level)) else {
            continue;
        };
        match parse_reference_list(raw) {
            Ok(records) => reference.set(level, records),
            Err(err) => {
                notices.push(Notice::warning(format!(
                    "Could not load {}: {err}",
                    level.plural_label()
                )));
                reference.set(level, Vec::new());
            }
        }
    }

    if let Some(raw) = value.get("users") {
        let users = parse_reference_list(raw).unwrap_or_else(|err| {
            notices.push(Notice::warning(format!("Could not load users: {err}")));
            Vec::new()
        });
        reference.users = Loadable::Ready(users);
    }

    (reference, notices)
}

fn level_key(level: CascadeLevel) -> &'static str {
    match level {
        CascadeLevel::Organization => "organizations",
        CascadeLevel::Site => "sites",
        CascadeLevel::Asset => "assets",
        CascadeLevel::SamplingPoint => "sampling_points",
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_ui {
    use crate::{chart, reference_set_from_value, styles};
    use chrono::Utc;
    use oilsight_api::parse_samples;
    use oilsight_core::{
        aggregate_history, discover_series, filter_by_parent, format_chart_value, CascadeForm,
        CascadeLevel, CascadeState, ChartDataPoint, DashboardConfig, HistoryPeriod, Notice,
        NoticeLevel, ReferenceSet, Sample, Selection,
    };
    use serde::Deserialize;
    use serde_json::Value;
    use serde_wasm_bindgen::from_value;
    use wasm_bindgen::prelude::*;
    use web_sys::{console, Document, Element, HtmlSelectElement, Window};
    use yew::prelude::*;
    use yew::TargetCast;

    const MAX_TICKS: usize = 8;

    #[derive(Deserialize, Default)]
    struct PersistedSelection {
        #[serde(default)]
        organization: Selection,
        #[serde(default)]
        site: Selection,
        #[serde(default)]
        asset: Selection,
        #[serde(default)]
        sampling_point: Selection,
    }

    impl From<PersistedSelection> for CascadeState {
        fn from(persisted: PersistedSelection) -> Self {
            CascadeState::hydrate([
                (CascadeLevel::Organization, persisted.organization),
                (CascadeLevel::Site, persisted.site),
                (CascadeLevel::Asset, persisted.asset),
                (CascadeLevel::SamplingPoint, persisted.sampling_point),
            ])
        }
    }

    #[derive(Properties, PartialEq)]
    pub struct SampleHistoryProps {
        pub reference: ReferenceSet,
        pub persisted: CascadeState,
        pub samples: Vec<Sample>,
        pub config: DashboardConfig,
        #[prop_or_default]
        pub notices: Vec<Notice>,
    }

    #[function_component(SampleHistoryView)]
    fn sample_history_view(props: &SampleHistoryProps) -> Html {
        use_effect_with((), |_| {
            if let Some(window) = web_sys::window() {
                if let Some(document) = window.document() {
                    if let Err(err) = styles::ensure_styles(&document) {
                        console::error_1(&err);
                    }
                }
            }
            || ()
        });

        let form = {
            let reference = props.reference.clone();
            let persisted = props.persisted.clone();
            let config = props.config.clone();
            use_state(move || CascadeForm::with_config(reference, persisted, &config))
        };
        let period = use_state(HistoryPeriod::default);

        let point = form.selection(CascadeLevel::SamplingPoint).clone();
        let points = history_points(&props.samples, &point, *period, &props.config);

        let on_period = {
            let period = period.clone();
            Callback::from(move |event: Event| {
                let select: HtmlSelectElement = event.target_unchecked_into();
                let value = select.value();
                if let Some(next) = HistoryPeriod::ALL
                    .into_iter()
                    .find(|p| p.days().to_string() == value)
                {
                    period.set(next);
                }
            })
        };

        html! {
            <div class="oilsight-root">
                { render_notices(&props.notices) }
                <section class="cascade-form">
                    { for CascadeLevel::ALL.into_iter().map(|level| render_level(form.clone(), level)) }
                </section>
                <section class="history-chart" aria-live="polite">
                    <header class="history-toolbar">
                        <h3>{"Sample history"}</h3>
                        <select onchange={on_period} aria-label="History period">
                            { for HistoryPeriod::ALL.into_iter().map(|p| html! {
                                <option value={p.days().to_string()} selected={p == *period}>{ p.label() }</option>
                            }) }
                        </select>
                    </header>
                    { render_chart(&points) }
                </section>
            </div>
        }
    }

    fn render_notices(notices: &[Notice]) -> Html {
        if notices.is_empty() {
            return Html::default();
        }
        html! {
            <ul class="oilsight-notices" role="status">
                { for notices.iter().map(|notice| html! {
                    <li class="oilsight-notice" data-level={notice_level(notice.level)}>{ notice.message.clone() }</li>
                }) }
            </ul>
        }
    }

    fn render_level(form: UseStateHandle<CascadeForm>, level: CascadeLevel) -> Html {
        if form.is_loading(level) {
            return html! {
                <div class="cascade-field">
                    <span class="cascade-label">{ level.label() }</span>
                    <p class="cascade-loading">{ format!("Loading {}…", level.plural_label()) }</p>
                </div>
            };
        }

        let current = form.selection(level).as_wire().to_string();
        let options = form.display_options(level);
        let empty = form.empty_message(level);
        let disabled = options.is_empty();

        let onchange = {
            let form = form.clone();
            Callback::from(move |event: Event| {
                let select: HtmlSelectElement = event.target_unchecked_into();
                let mut next = (*form).clone();
                let cleared = next.select(level, Selection::from(select.value()));
                if !cleared.is_empty() {
                    console::debug_1(&format!("{level} changed, cleared {cleared:?}").into());
                }
                form.set(next);
            })
        };

        html! {
            <label class="cascade-field">
                <span class="cascade-label">{ level.label() }</span>
                <select {onchange} {disabled}>
                    <option value="" selected={current.is_empty()}>{ format!("Select {}", level.label()) }</option>
                    { for options.into_iter().map(|option| {
                        let selected = option.value == current;
                        html! { <option value={option.value} {selected}>{ option.label }</option> }
                    }) }
                </select>
                {
                    match empty {
                        Some(message) => html! { <p class="cascade-empty">{ message }</p> },
                        None => Html::default(),
                    }
                }
            </label>
        }
    }

    fn render_chart(points: &[ChartDataPoint]) -> Html {
        if !chart::has_data(points) {
            return html! { <p class="chart-empty">{"No sample data for this period."}</p> };
        }

        let layout = chart::ChartLayout::default();
        let series = chart::project(points, &layout);
        let baseline = layout.height - layout.padding;
        let view_box = format!("0 0 {} {}", layout.width, layout.height);

        html! {
            <figure class="chart">
                <svg viewBox={view_box} role="img" aria-label="Sample history chart">
                    <line class="chart-axis"
                        x1={format!("{:.1}", layout.padding)}
                        y1={format!("{baseline:.1}")}
                        x2={format!("{:.1}", layout.width - layout.padding)}
                        y2={format!("{baseline:.1}")} />
                    { for chart::x_ticks(points, &layout, MAX_TICKS).into_iter().map(|(x, label)| html! {
                        <text class="chart-tick" x={format!("{x:.1}")} y={format!("{:.1}", layout.height - 8.0)}>{ label }</text>
                    }) }
                    { for series.iter().map(render_series) }
                </svg>
                <figcaption class="chart-legend">
                    { for series.iter().map(|s| html! {
                        <span class="legend-item">
                            <i style={format!("background:{}", s.color)}></i>
                            { s.key.clone() }
                        </span>
                    }) }
                </figcaption>
            </figure>
        }
    }

    fn render_series(series: &chart::PlotSeries) -> Html {
        html! {
            <g class="chart-series">
                <path d={series.path.clone()} stroke={series.color} fill="none" stroke-width="2" />
                { for series.points.iter().map(|point| html! {
                    <circle
                        cx={format!("{:.1}", point.x)}
                        cy={format!("{:.1}", point.y)}
                        r="3"
                        fill={series.color}>
                        <title>{ format!("{} · {}: {}", point.date.format("%d/%m/%Y"), series.key, format_chart_value(point.value)) }</title>
                    </circle>
                }) }
            </g>
        }
    }

    fn history_points(
        samples: &[Sample],
        point: &Selection,
        period: HistoryPeriod,
        config: &DashboardConfig,
    ) -> Vec<ChartDataPoint> {
        let scoped: Vec<Sample> = filter_by_parent(
            samples,
            |sample| sample.sampling_point.as_ref().map(|p| p.id.as_str()),
            point,
        )
        .into_iter()
        .cloned()
        .collect();

        let offset = config.offset();
        let today = Utc::now().with_timezone(&offset).date_naive();
        match period.range_ending(today) {
            Ok(range) => aggregate_history(&scoped, &discover_series(&scoped), &range, offset),
            Err(err) => {
                console::error_1(&err.to_string().into());
                Vec::new()
            }
        }
    }

    fn notice_level(level: NoticeLevel) -> &'static str {
        match level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }

    fn optional<T>(value: JsValue, what: &str) -> Result<Option<T>, JsValue>
    where
        T: for<'de> Deserialize<'de>,
    {
        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }
        from_value(value)
            .map(Some)
            .map_err(|err| JsValue::from_str(&format!("Không đọc được {what}: {err}")))
    }

    /// Gắn giao diện vào phần tử `selector`.
    ///
    /// `persisted` là lựa chọn đã lưu `{ site, asset, sampling_point }`,
    /// `config` là [`DashboardConfig`] dạng JSON; cả hai đều có thể bỏ trống.
    #[wasm_bindgen]
    pub fn mount_sample_history(
        selector: &str,
        reference: JsValue,
        samples: JsValue,
        persisted: JsValue,
        config: JsValue,
    ) -> Result<(), JsValue> {
        console_error_panic_hook::set_once();

        let window: Window =
            web_sys::window().ok_or_else(|| JsValue::from_str("Không có window"))?;
        let document: Document = window
            .document()
            .ok_or_else(|| JsValue::from_str("Không truy cập được document"))?;

        let target: Element = document
            .query_selector(selector)
            .map_err(|err| JsValue::from_str(&format!("Selector lỗi: {err:?}")))?
            .ok_or_else(|| JsValue::from_str("Không tìm thấy element theo selector"))?;

        let reference_json: Value = optional(reference, "danh sách tham chiếu")?.unwrap_or_default();
        let (reference, mut notices) = reference_set_from_value(&reference_json);

        let samples = match optional::<Value>(samples, "mẫu")? {
            Some(raw) => parse_samples(&raw).unwrap_or_else(|err| {
                notices.push(Notice::warning(format!("Could not load samples: {err}")));
                Vec::new()
            }),
            None => Vec::new(),
        };

        let persisted: CascadeState = optional::<PersistedSelection>(persisted, "lựa chọn đã lưu")?
            .unwrap_or_default()
            .into();
        let config: DashboardConfig = optional(config, "config")?.unwrap_or_default();

        yew::Renderer::<SampleHistoryView>::with_root_and_props(
            target,
            SampleHistoryProps {
                reference,
                persisted,
                samples,
                config,
                notices,
            },
        )
        .render();
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_ui::mount_sample_history;

#[cfg(not(target_arch = "wasm32"))]
pub fn mount_sample_history(
    _: &str,
    _: wasm_bindgen::JsValue,
    _: wasm_bindgen::JsValue,
    _: wasm_bindgen::JsValue,
    _: wasm_bindgen::JsValue,
) -> Result<(), wasm_bindgen::JsValue> {
    Err(wasm_bindgen::JsValue::from_str(
        "oilsight-ui chỉ hỗ trợ biên dịch target wasm32",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oilsight_core::NoticeLevel;
    use serde_json::json;

    #[test]
    fn missing_lists_stay_pending() {
        let (reference, notices) = reference_set_from_value(&json!({
            "sites": [{"id": "s1"}],
            "assets": {"detail": "forbidden"}
        }));

        assert!(notices.len() == 1 && notices[0].level == NoticeLevel::Warning);
        assert!(notices[0].message.contains("assets"));
        assert_eq!(reference.sites.ready().map(Vec::len), Some(1));
        assert_eq!(reference.assets, Loadable::Ready(Vec::new()));
        assert_eq!(reference.sampling_points, Loadable::Pending);
        assert_eq!(reference.users, Loadable::Pending);
    }

    #[test]
    fn unreadable_users_give_a_warning() {
        let (reference, notices) = reference_set_from_value(&json!({
            "users": {"detail": "forbidden"}
        }));
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert!(notices[0].message.starts_with("Could not load users"));
        assert_eq!(reference.users, Loadable::Ready(Vec::new()));
    }

    #[test]
    fn users_are_loaded_alongside() {
        let (reference, notices) = reference_set_from_value(&json!({
            "users": [{"id": "u1", "email": "ops@example.com"}]
        }));
        assert!(notices.is_empty());
        assert_eq!(reference.users.ready().map(Vec::len), Some(1));
    }
}
