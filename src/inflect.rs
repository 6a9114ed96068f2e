//! Name inflections used for type tags.

use once_cell::sync::Lazy;
use regex::Regex;

static CAMEL_BOUNDARY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([a-z\d])([A-Z])").unwrap()
});

static SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[-\s]+").unwrap()
});

/// `EvilMinion`, `evilMinion` and `evil-minion` all become `evil_minion`.
pub fn underscore(name: &str) -> String {
    let split = CAMEL_BOUNDARY_REGEX.replace_all(name, "${1}_${2}");
    SEPARATOR_REGEX.replace_all(&split, "_").to_lowercase()
}

/// Turns a wire type-tag key into its camel form: `minion_type` -> `minionType`.
///
/// Returns `None` when `key` does not end with `suffix`.
pub fn camelize_type_key(key: &str, suffix: &str) -> Option<String> {
    let stem = key.strip_suffix(suffix)?;
    Some(format!("{}Type", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscore() {
        assert_eq!(underscore("EvilMinion"), "evil_minion");
        assert_eq!(underscore("evilMinion"), "evil_minion");
        assert_eq!(underscore("evil-minion"), "evil_minion");
        assert_eq!(underscore("user"), "user");
        assert_eq!(underscore("HTML5Page"), "html5_page");
    }

    #[test]
    fn test_camelize_type_key() {
        assert_eq!(camelize_type_key("minion_type", "_type").as_deref(), Some("minionType"));
        assert_eq!(camelize_type_key("minion", "_type"), None);
    }
}
