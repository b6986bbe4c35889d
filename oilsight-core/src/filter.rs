//! Bộ lọc phụ thuộc: thu hẹp danh sách con theo id cha đang chọn.

use crate::{ReferenceRecord, SelectOption, Selection};

/// Lọc `items` theo id cha đang chọn.
///
/// Khi chưa chọn cha thì trả về toàn bộ danh sách. Bản ghi không phân giải
/// được id cha (`parent_of` trả về `None`) không bao giờ khớp.
pub fn filter_by_parent<'a, T, F>(items: &'a [T], parent_of: F, selected: &Selection) -> Vec<&'a T>
where
    F: Fn(&'a T) -> Option<&'a str>,
{
    let Some(parent_id) = selected.id() else {
        return items.iter().collect();
    };

    items
        .iter()
        .filter(|&item| parent_of(item) == Some(parent_id))
        .collect()
}

/// [`filter_by_parent`] trên bản ghi tham chiếu, theo tên trường khóa ngoại.
pub fn filter_by_field<'a>(
    records: &'a [ReferenceRecord],
    field: &str,
    selected: &Selection,
) -> Vec<&'a ReferenceRecord> {
    filter_by_parent(records, |record| record.parent_id(field), selected)
}

pub fn to_options(records: &[&ReferenceRecord]) -> Vec<SelectOption> {
    records
        .iter()
        .map(|record| SelectOption {
            value: record.id.clone(),
            label: record.label().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assets() -> Vec<ReferenceRecord> {
        vec![
            ReferenceRecord::new("a1").with_parent("parent_site", "s1"),
            ReferenceRecord::new("a2").with_parent("parent_site", "s2"),
            ReferenceRecord::new("a3").with_parent("parent_site", "s1"),
            ReferenceRecord::new("orphan"),
        ]
    }

    fn ids(records: &[&ReferenceRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn no_parent_selected_returns_everything() {
        let list = assets();
        let filtered = filter_by_field(&list, "parent_site", &Selection::None);
        assert_eq!(ids(&filtered), vec!["a1", "a2", "a3", "orphan"]);
    }

    #[test]
    fn selected_parent_keeps_matching_children_in_order() {
        let list = assets();
        let filtered = filter_by_field(&list, "parent_site", &Selection::from("s1"));
        assert_eq!(ids(&filtered), vec!["a1", "a3"]);
    }

    #[test]
    fn unresolved_field_never_matches() {
        let list = assets();
        let filtered = filter_by_field(&list, "parent_asset", &Selection::from("s1"));
        assert!(filtered.is_empty());

        let empty: Vec<ReferenceRecord> = Vec::new();
        assert!(filter_by_field(&empty, "parent_site", &Selection::from("s1")).is_empty());
    }

    #[test]
    fn options_use_labels() {
        let list = vec![ReferenceRecord::new("a1").with_name("Gearbox")];
        let refs: Vec<&ReferenceRecord> = list.iter().collect();
        assert_eq!(
            to_options(&refs),
            vec![SelectOption {
                value: "a1".into(),
                label: "Gearbox".into()
            }]
        );
    }

    fn arb_records() -> impl Strategy<Value = Vec<ReferenceRecord>> {
        prop::collection::vec(
            ("[a-z][0-9]{1,2}", prop::option::of("s[0-3]")),
            0..24,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .map(|(id, parent)| match parent {
                    Some(parent) => ReferenceRecord::new(id).with_parent("parent_site", parent),
                    None => ReferenceRecord::new(id),
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn filter_returns_exactly_matching_subset(list in arb_records(), parent in "s[0-3]") {
            let selected = Selection::from(parent.as_str());
            let filtered = filter_by_field(&list, "parent_site", &selected);
            let expected: Vec<&ReferenceRecord> = list
                .iter()
                .filter(|r| r.parent_id("parent_site") == Some(parent.as_str()))
                .collect();
            prop_assert_eq!(filtered, expected);
        }

        #[test]
        fn filter_is_idempotent(list in arb_records(), parent in "s[0-3]") {
            let selected = Selection::from(parent.as_str());
            let once: Vec<ReferenceRecord> = filter_by_field(&list, "parent_site", &selected)
                .into_iter()
                .cloned()
                .collect();
            let twice = filter_by_field(&once, "parent_site", &selected);
            prop_assert_eq!(twice.into_iter().cloned().collect::<Vec<_>>(), once.clone());
            prop_assert_eq!(
                filter_by_field(&list, "parent_site", &selected).len(),
                once.len()
            );
        }

        #[test]
        fn empty_parent_is_identity(list in arb_records()) {
            let filtered = filter_by_field(&list, "parent_site", &Selection::None);
            prop_assert_eq!(filtered, list.iter().collect::<Vec<_>>());
        }
    }
}
