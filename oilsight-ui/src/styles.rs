#![cfg(target_arch = "wasm32")]

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Node};

const STYLE_TAG_SELECTOR: &str = "style[data-oilsight-ui]";

/// CSS mặc định; các biến `--oilsight-*` có thể ghi đè từ trang chủ.
pub const DEFAULT_STYLES: &str = r#"
:root {
  --oilsight-font-family: 'Inter', system-ui, -apple-system, 'Segoe UI', sans-serif;
  --oilsight-bg: #ffffff;
  --oilsight-surface: #f8fafc;
  --oilsight-border: rgba(148, 163, 184, 0.32);
  --oilsight-radius: 12px;
  --oilsight-text: #1f2933;
  --oilsight-muted: #52606d;
  --oilsight-accent: #2563eb;
  --oilsight-warning-bg: rgba(220, 104, 3, 0.12);
  --oilsight-warning-text: #b54708;
  --oilsight-error-bg: rgba(180, 35, 24, 0.1);
  --oilsight-error-text: #b42318;
}

.oilsight-root {
  font-family: var(--oilsight-font-family);
  color: var(--oilsight-text);
  background: var(--oilsight-bg);
  display: grid;
  gap: 20px;
}

.oilsight-notices {
  list-style: none;
  margin: 0;
  padding: 0;
  display: grid;
  gap: 8px;
}

.oilsight-notice {
  border-radius: var(--oilsight-radius);
  padding: 10px 14px;
  font-size: 0.9rem;
  background: var(--oilsight-surface);
}

.oilsight-notice[data-level="warning"] {
  background: var(--oilsight-warning-bg);
  color: var(--oilsight-warning-text);
}

.oilsight-notice[data-level="error"] {
  background: var(--oilsight-error-bg);
  color: var(--oilsight-error-text);
}

.cascade-form {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
  gap: 16px;
}

.cascade-field {
  display: grid;
  gap: 6px;
}

.cascade-label {
  font-size: 0.8rem;
  font-weight: 600;
  text-transform: uppercase;
  letter-spacing: 0.04em;
  color: var(--oilsight-muted);
}

.cascade-field select,
.history-toolbar select {
  font: inherit;
  padding: 8px 10px;
  border: 1px solid var(--oilsight-border);
  border-radius: 8px;
  background: var(--oilsight-bg);
}

.cascade-loading,
.cascade-empty,
.chart-empty {
  font-size: 0.85rem;
  color: var(--oilsight-muted);
  margin: 0;
}

.history-chart {
  border: 1px solid var(--oilsight-border);
  border-radius: var(--oilsight-radius);
  padding: 16px;
}

.history-toolbar {
  display: flex;
  align-items: center;
  justify-content: space-between;
  gap: 12px;
  margin-bottom: 12px;
}

.history-toolbar h3 {
  margin: 0;
  font-size: 1rem;
}

.chart svg {
  width: 100%;
  height: auto;
}

.chart-axis {
  stroke: var(--oilsight-border);
}

.chart-tick {
  font-size: 11px;
  fill: var(--oilsight-muted);
  text-anchor: middle;
}

.chart-legend {
  display: flex;
  flex-wrap: wrap;
  gap: 12px;
  margin-top: 8px;
  font-size: 0.85rem;
}

.legend-item {
  display: inline-flex;
  align-items: center;
  gap: 6px;
}

.legend-item i {
  width: 10px;
  height: 10px;
  border-radius: 50%;
}

@media (max-width: 640px) {
  .history-toolbar {
    flex-direction: column;
    align-items: stretch;
  }
}
"#;

pub fn ensure_styles(document: &Document) -> Result<(), JsValue> {
    if document.query_selector(STYLE_TAG_SELECTOR)?.is_some() {
        return Ok(());
    }

    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("Document không có thẻ <head>"))?;

    let style_el = document.create_element("style")?;
    style_el.set_attribute("data-oilsight-ui", "v1")?;
    style_el.set_text_content(Some(DEFAULT_STYLES));
    head.append_child(&style_el.clone().dyn_into::<Node>()?)?;

    Ok(())
}
