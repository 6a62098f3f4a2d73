/// Canonical form for carrier, store, and status labels: invisible
/// characters stripped, whitespace collapsed, upper-cased.
pub fn normalize_label(value: &str) -> String {
    let cleaned = value
        .replace(['\u{feff}', '\u{200b}'], "")
        .replace('\u{00a0}', " ");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_uppercase()
}

/// Trimmed label, `None` when nothing is left.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_label_collapses_whitespace_and_case() {
        assert_eq!(normalize_label("\u{feff}Mercado   Envíos "), "MERCADO ENVÍOS");
        assert_eq!(normalize_label("jt\u{00a0}express"), "JT EXPRESS");
    }

    #[test]
    fn non_empty_drops_blank_labels() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" LOGGI ".into())), Some("LOGGI".into()));
        assert_eq!(non_empty(None), None);
    }
}
