//! Trạng thái chuỗi lọc organization → site → asset → sampling point và bộ đối chiếu lựa chọn.

use serde::{Deserialize, Serialize};

use crate::{
    filter_by_field, to_options, CascadeLevel, DashboardConfig, Loadable, ReferenceRecord,
    SelectOption, Selection,
};

/// Giữ `current` nếu nó còn trong danh sách con, ngược lại trả về [`Selection::None`].
pub fn reconcile_selection<'a, I>(child_ids: I, current: &Selection) -> Selection
where
    I: IntoIterator<Item = &'a str>,
{
    let Some(current_id) = current.id() else {
        return Selection::None;
    };

    if child_ids.into_iter().any(|id| id == current_id) {
        current.clone()
    } else {
        Selection::None
    }
}

/// Lựa chọn hiện tại của từng cấp cùng cờ "người dùng đã chạm".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CascadeState {
    selections: [Selection; 4],
    touched: [bool; 4],
    hydrated: bool,
}

impl CascadeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nạp lựa chọn từ bản ghi đã lưu (form chỉnh sửa).
    ///
    /// Các giá trị này không bị đối chiếu cho tới khi người dùng đổi một cấp cha.
    pub fn hydrate<I>(persisted: I) -> Self
    where
        I: IntoIterator<Item = (CascadeLevel, Selection)>,
    {
        let mut state = Self {
            hydrated: true,
            ..Self::default()
        };
        for (level, selection) in persisted {
            state.selections[level.index()] = selection;
        }
        state
    }

    pub fn get(&self, level: CascadeLevel) -> &Selection {
        &self.selections[level.index()]
    }

    pub fn is_touched(&self, level: CascadeLevel) -> bool {
        self.touched[level.index()]
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn release_hydration(&mut self) {
        self.hydrated = false;
    }

    pub fn selections(&self) -> impl Iterator<Item = (CascadeLevel, &Selection)> + '_ {
        CascadeLevel::ALL
            .into_iter()
            .map(move |level| (level, self.get(level)))
    }

    /// Cấp này còn được bảo vệ khỏi đối chiếu hay không.
    pub fn is_guarded(&self, level: CascadeLevel) -> bool {
        self.hydrated
            && !self.is_touched(level)
            && !level
                .ancestors()
                .iter()
                .any(|ancestor| self.is_touched(*ancestor))
    }

    /// Người dùng chọn giá trị mới cho `level`.
    ///
    /// Khi giá trị thay đổi, mọi cấp con cháu bị xóa trong cùng một lần cập nhật.
    /// Chọn lại đúng giá trị hiện tại không làm gì, kể cả bảo vệ hydration.
    /// Trả về các cấp đã bị xóa.
    pub fn select(&mut self, level: CascadeLevel, selection: Selection) -> Vec<CascadeLevel> {
        let idx = level.index();
        if self.selections[idx] == selection {
            return Vec::new();
        }
        self.touched[idx] = true;
        self.selections[idx] = selection;
        self.clear_levels(level.descendants())
    }

    /// Đối chiếu lựa chọn của `level` với danh sách con vừa lọc.
    ///
    /// Nếu lựa chọn bị xóa thì các cấp con cháu cũng bị xóa theo.
    pub fn reconcile<'a, I>(&mut self, level: CascadeLevel, child_ids: I) -> Vec<CascadeLevel>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let current = self.get(level);
        if current.is_none() || self.is_guarded(level) {
            return Vec::new();
        }
        if reconcile_selection(child_ids, current).is_some() {
            return Vec::new();
        }

        self.selections[level.index()] = Selection::None;
        let mut cleared = vec![level];
        cleared.extend(self.clear_levels(level.descendants()));
        cleared
    }

    fn clear_levels(&mut self, levels: &[CascadeLevel]) -> Vec<CascadeLevel> {
        let mut cleared = Vec::new();
        for level in levels {
            let slot = &mut self.selections[level.index()];
            if slot.is_some() {
                *slot = Selection::None;
                cleared.push(*level);
            }
        }
        cleared
    }
}

/// Các danh sách tham chiếu của một phiên form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSet {
    pub organizations: Loadable<Vec<ReferenceRecord>>,
    pub sites: Loadable<Vec<ReferenceRecord>>,
    pub assets: Loadable<Vec<ReferenceRecord>>,
    pub sampling_points: Loadable<Vec<ReferenceRecord>>,
    pub users: Loadable<Vec<ReferenceRecord>>,
}

impl ReferenceSet {
    pub fn list(&self, level: CascadeLevel) -> &Loadable<Vec<ReferenceRecord>> {
        match level {
            CascadeLevel::Organization => &self.organizations,
            CascadeLevel::Site => &self.sites,
            CascadeLevel::Asset => &self.assets,
            CascadeLevel::SamplingPoint => &self.sampling_points,
        }
    }

    pub fn set(&mut self, level: CascadeLevel, records: Vec<ReferenceRecord>) {
        let slot = match level {
            CascadeLevel::Organization => &mut self.organizations,
            CascadeLevel::Site => &mut self.sites,
            CascadeLevel::Asset => &mut self.assets,
            CascadeLevel::SamplingPoint => &mut self.sampling_points,
        };
        *slot = Loadable::Ready(records);
    }

    pub fn is_complete(&self) -> bool {
        CascadeLevel::ALL
            .into_iter()
            .all(|level| self.list(level).is_ready())
            && self.users.is_ready()
    }
}

/// Form có chuỗi lọc: dữ liệu tham chiếu cộng trạng thái lựa chọn.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeForm {
    reference: ReferenceSet,
    state: CascadeState,
}

impl CascadeForm {
    pub fn new(reference: ReferenceSet, state: CascadeState) -> Self {
        let mut form = Self { reference, state };
        form.refresh();
        form
    }

    pub fn with_config(
        reference: ReferenceSet,
        mut state: CascadeState,
        config: &DashboardConfig,
    ) -> Self {
        if !config.hydration_guard {
            state.release_hydration();
        }
        Self::new(reference, state)
    }

    pub fn state(&self) -> &CascadeState {
        &self.state
    }

    pub fn into_state(self) -> CascadeState {
        self.state
    }

    pub fn reference(&self) -> &ReferenceSet {
        &self.reference
    }

    pub fn selection(&self, level: CascadeLevel) -> &Selection {
        self.state.get(level)
    }

    pub fn is_loading(&self, level: CascadeLevel) -> bool {
        !self.reference.list(level).is_ready()
    }

    /// Danh sách của `level` đã lọc theo lựa chọn ở cấp cha. Rỗng khi còn đang tải.
    pub fn filtered(&self, level: CascadeLevel) -> Vec<&ReferenceRecord> {
        let Some(records) = self.reference.list(level).ready() else {
            return Vec::new();
        };

        match (level.parent(), level.parent_field()) {
            (Some(parent), Some(field)) => filter_by_field(records, field, self.state.get(parent)),
            _ => records.iter().collect(),
        }
    }

    pub fn options(&self, level: CascadeLevel) -> Vec<SelectOption> {
        to_options(&self.filtered(level))
    }

    /// Như [`Self::options`], thêm lựa chọn đang giữ nếu nó không có trong danh sách lọc.
    ///
    /// Xảy ra khi hydration giữ một id đã lưu; nhãn của nó có hậu tố `(current)`.
    pub fn display_options(&self, level: CascadeLevel) -> Vec<SelectOption> {
        let mut options = self.options(level);
        let Some(current) = self.state.get(level).id() else {
            return options;
        };
        if options.iter().any(|option| option.value == current) {
            return options;
        }

        let label = self
            .reference
            .list(level)
            .ready()
            .and_then(|records| records.iter().find(|record| record.id == current))
            .map_or(current, |record| record.label());
        options.push(SelectOption {
            value: current.to_string(),
            label: format!("{label} (current)"),
        });
        options
    }

    /// Thông báo trạng thái rỗng, ví dụ "No assets available for this site".
    pub fn empty_message(&self, level: CascadeLevel) -> Option<String> {
        if self.is_loading(level) || !self.filtered(level).is_empty() {
            return None;
        }

        let message = match level.parent().filter(|parent| self.state.get(*parent).is_some()) {
            Some(parent) => format!(
                "No {} available for this {}",
                level.plural_label(),
                parent.label()
            ),
            None => format!("No {} available", level.plural_label()),
        };
        Some(message)
    }

    /// Danh sách của `level` vừa tải xong.
    pub fn set_reference(
        &mut self,
        level: CascadeLevel,
        records: Vec<ReferenceRecord>,
    ) -> Vec<CascadeLevel> {
        self.reference.set(level, records);
        self.refresh()
    }

    pub fn select(&mut self, level: CascadeLevel, selection: Selection) -> Vec<CascadeLevel> {
        let mut cleared = self.state.select(level, selection);
        cleared.extend(self.refresh());
        cleared
    }

    /// Đối chiếu mọi cấp từ trên xuống; bỏ qua cấp còn đang tải.
    pub fn refresh(&mut self) -> Vec<CascadeLevel> {
        let mut cleared = Vec::new();
        for level in CascadeLevel::ALL {
            if self.is_loading(level) {
                continue;
            }
            let ids: Vec<String> = self
                .filtered(level)
                .into_iter()
                .map(|record| record.id.clone())
                .collect();
            cleared.extend(self.state.reconcile(level, ids.iter().map(String::as_str)));
        }
        cleared
    }
}
