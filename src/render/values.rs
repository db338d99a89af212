/// Data value normalization
///
/// Turns the unordered data value map into the sorted `key=value` token list
/// that feeds change detection, and back again for execution.
use std::collections::HashMap;

/// Data values as configured. A `None` value renders as an empty string.
pub type DataValues = HashMap<String, Option<String>>;

/// Produce the deterministic, key-sorted `key=value` token list for a map
///
/// The result depends only on the map's content, never on its iteration order.
pub fn normalize(values: &DataValues) -> Vec<String> {
    if values.is_empty() {
        return Vec::new();
    }

    let mut entries: Vec<(&String, &Option<String>)> = values.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    entries
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value.as_deref().unwrap_or("")))
        .collect()
}

/// Rebuild a map from normalized tokens
///
/// Splits on the first `=`; tokens without one are skipped.
pub fn denormalize(tokens: &[String]) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(tokens.len());

    for token in tokens {
        if let Some((key, value)) = token.split_once('=') {
            map.insert(key.to_string(), value.to_string());
        }
    }

    map
}

/// Layer `overrides` on top of `defaults`, overrides win on collision
pub fn merge(defaults: &DataValues, overrides: &DataValues) -> DataValues {
    let mut merged = defaults.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Parse a `key=value` assignment as given on the command line
pub fn parse_assignment(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once('=')?;
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, Option<&str>)]) -> DataValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_normalize_sorts_by_key() {
        let map = values(&[("zeta", Some("9")), ("alpha", Some("1")), ("beta", None)]);

        let normalized = normalize(&map);

        assert_eq!(normalized, vec!["alpha=1", "beta=", "zeta=9"]);
    }

    #[test]
    fn test_normalize_is_insertion_order_independent() {
        let mut first = DataValues::new();
        first.insert("b".to_string(), Some("2".to_string()));
        first.insert("a".to_string(), Some("1".to_string()));
        first.insert("c".to_string(), Some("3".to_string()));

        let mut second = DataValues::new();
        second.insert("c".to_string(), Some("3".to_string()));
        second.insert("a".to_string(), Some("1".to_string()));
        second.insert("b".to_string(), Some("2".to_string()));

        assert_eq!(normalize(&first), normalize(&second));
    }

    #[test]
    fn test_normalize_null_value_is_empty() {
        let map = values(&[("K", None)]);
        assert_eq!(normalize(&map), vec!["K="]);
    }

    #[test]
    fn test_normalize_empty_map() {
        assert!(normalize(&DataValues::new()).is_empty());
        assert!(normalize(&DataValues::default()).is_empty());
    }

    #[test]
    fn test_normalize_uses_ordinal_order() {
        let map = values(&[("b", Some("x")), ("B", Some("y")), ("a", Some("z"))]);
        assert_eq!(normalize(&map), vec!["B=y", "a=z", "b=x"]);
    }

    #[test]
    fn test_denormalize_splits_on_first_equals() {
        let tokens = vec![
            "url=http://host/?a=b".to_string(),
            "empty=".to_string(),
            "garbage".to_string(),
        ];

        let map = denormalize(&tokens);

        assert_eq!(map.len(), 2);
        assert_eq!(map["url"], "http://host/?a=b");
        assert_eq!(map["empty"], "");
    }

    #[test]
    fn test_merge_overrides_win() {
        let defaults = values(&[("version", Some("1.0.0")), ("region", Some("us"))]);
        let overrides = values(&[("version", Some("2.0.0")), ("stage", None)]);

        let merged = merge(&defaults, &overrides);

        assert_eq!(
            normalize(&merged),
            vec!["region=us", "stage=", "version=2.0.0"]
        );
        // Defaults are untouched
        assert_eq!(defaults["version"].as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("version=1.2"),
            Some(("version".to_string(), "1.2".to_string()))
        );
        assert_eq!(
            parse_assignment("k="),
            Some(("k".to_string(), String::new()))
        );
        assert_eq!(parse_assignment("novalue"), None);
        assert_eq!(parse_assignment("=x"), None);
    }
}
