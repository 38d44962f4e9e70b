//! Merging of config layers.

use std::collections::BTreeSet;

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Dotted paths of every leaf value in `val` (e.g. `logging.level`).
#[must_use]
pub fn leaf_paths(val: &toml::Value) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    collect_leaves(val, "", &mut paths);
    paths
}

fn collect_leaves(val: &toml::Value, prefix: &str, paths: &mut BTreeSet<String>) {
    match val {
        toml::Value::Table(table) => {
            for (key, child) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_leaves(child, &path, paths);
            }
        },
        _ if !prefix.is_empty() => {
            paths.insert(prefix.to_owned());
        },
        _ => {},
    }
}

/// Set the value at a dotted path, creating intermediate tables.
pub fn set_path(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut current = root;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), value);
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_overlay_replaces_scalars_and_keeps_siblings() {
        let mut base = parse("[logging]\nlevel = \"info\"\nformat = \"compact\"\n");
        deep_merge(&mut base, &parse("[logging]\nlevel = \"debug\"\n"));

        assert_eq!(base["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(base["logging"]["format"].as_str(), Some("compact"));
    }

    #[test]
    fn test_arrays_are_replaced_not_appended() {
        let mut base = parse("[logging]\ndirectives = [\"a=debug\"]\n");
        deep_merge(&mut base, &parse("[logging]\ndirectives = [\"b=trace\"]\n"));

        let directives = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].as_str(), Some("b=trace"));
    }

    #[test]
    fn test_leaf_paths() {
        let paths = leaf_paths(&parse(
            "[correlation]\nmax_live_entries = 4\n[logging]\nlevel = \"warn\"\n",
        ));
        let paths: Vec<_> = paths.into_iter().collect();
        assert_eq!(paths, vec!["correlation.max_live_entries", "logging.level"]);
    }

    #[test]
    fn test_set_path_creates_tables() {
        let mut root = toml::Value::Table(toml::map::Map::new());
        set_path(&mut root, "dispatch.log_dropped_events", toml::Value::Boolean(false));
        assert_eq!(root["dispatch"]["log_dropped_events"].as_bool(), Some(false));
    }
}
