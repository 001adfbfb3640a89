//! In-process narrowing of fully fetched collections.
//!
//! List endpoints always fetch the whole table and then narrow it here.
//! A search term and any number of exact-match filters compose by logical
//! AND; an absent or empty parameter never narrows.

/// Case-insensitive substring match of `term` against any of `fields`.
/// An empty term matches everything.
pub fn matches_search(term: &str, fields: &[&str]) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    fields
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
}

/// Exact-equality filter. `None` or an empty selection matches everything.
pub fn matches_eq(selected: Option<&str>, value: &str) -> bool {
    match selected {
        Some(selected) if !selected.is_empty() => selected == value,
        _ => true,
    }
}

/// Helper for optional query parameters stored as `Option<String>`.
pub fn opt(param: &Option<String>) -> Option<&str> {
    param.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row<'a> {
        name: &'a str,
        class_label: &'a str,
        status: &'a str,
    }

    fn rows() -> Vec<Row<'static>> {
        vec![
            Row { name: "Aarav Sharma", class_label: "Class 1", status: "present" },
            Row { name: "Diya Sharma", class_label: "Class 2", status: "absent" },
            Row { name: "Kabir Verma", class_label: "Class 1", status: "absent" },
            Row { name: "Ishaan Gupta", class_label: "Class 3", status: "present" },
        ]
    }

    #[test]
    fn empty_search_and_no_filters_keep_everything() {
        let kept: Vec<_> = rows()
            .into_iter()
            .filter(|r| matches_search("", &[r.name]) && matches_eq(None, r.class_label))
            .collect();
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let kept: Vec<_> = rows()
            .into_iter()
            .filter(|r| matches_search("sharma", &[r.name]))
            .map(|r| r.name)
            .collect();
        assert_eq!(kept, vec!["Aarav Sharma", "Diya Sharma"]);
    }

    // Search and filters intersect rather than union.
    #[test]
    fn search_and_filters_compose_by_and() {
        let kept: Vec<_> = rows()
            .into_iter()
            .filter(|r| {
                matches_search("a", &[r.name])
                    && matches_eq(Some("Class 1"), r.class_label)
                    && matches_eq(Some("absent"), r.status)
            })
            .map(|r| r.name)
            .collect();
        assert_eq!(kept, vec!["Kabir Verma"]);
    }

    #[test]
    fn clearing_filters_restores_full_set() {
        let narrowed = rows()
            .into_iter()
            .filter(|r| matches_eq(Some("Class 3"), r.class_label))
            .count();
        assert_eq!(narrowed, 1);
        let cleared = rows()
            .into_iter()
            .filter(|r| matches_eq(Some(""), r.class_label))
            .count();
        assert_eq!(cleared, 4);
    }

    #[test]
    fn opt_treats_empty_string_as_absent() {
        assert_eq!(opt(&Some(String::new())), None);
        assert_eq!(opt(&Some("paid".to_string())), Some("paid"));
        assert_eq!(opt(&None), None);
    }
}
