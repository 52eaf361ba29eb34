//! JSON tree navigation and mutation helpers for the memory store

use haven_storage_traits::is_server_timestamp;
use serde_json::{Map, Value};

/// Look up the node at `segments`, treating missing keys as absent.
pub(crate) fn node<'a>(mut current: &'a Value, segments: &[String]) -> Option<&'a Value> {
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Overwrite the node at `segments` with `value`.
///
/// Intermediate objects are created as needed. Writing `Null` (or an empty
/// object) deletes the node, and emptied ancestors are pruned on the way
/// back up, so absent and null paths stay indistinguishable.
pub(crate) fn write_at(current: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *current = value;
        return;
    };
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    let Value::Object(map) = current else {
        return;
    };
    let child = map.entry(head.clone()).or_insert(Value::Null);
    write_at(child, rest, value);
    let prune = match map.get(head) {
        Some(Value::Null) => true,
        Some(Value::Object(inner)) => inner.is_empty(),
        _ => false,
    };
    if prune {
        map.remove(head);
    }
    // Collapse an emptied object so absent and null stay indistinguishable
    // all the way up to the root
    if map.is_empty() {
        *current = Value::Null;
    }
}

/// Replace every server-timestamp sentinel in `value` with `now` (unix ms).
pub(crate) fn resolve_server_values(value: &mut Value, now: u64) {
    if is_server_timestamp(value) {
        *value = Value::from(now);
        return;
    }
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                resolve_server_values(child, now);
            }
        }
        Value::Array(items) => {
            for child in items.iter_mut() {
                resolve_server_values(child, now);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use haven_storage_traits::server_timestamp;
    use serde_json::json;

    use super::*;

    fn segments(raw: &str) -> Vec<String> {
        raw.split('/').map(str::to_string).collect()
    }

    #[test]
    fn test_write_and_lookup() {
        let mut tree = Value::Null;
        write_at(&mut tree, &segments("a/b/c"), json!(1));
        assert_eq!(node(&tree, &segments("a/b/c")), Some(&json!(1)));
        assert_eq!(node(&tree, &segments("a/b")), Some(&json!({ "c": 1 })));
        assert_eq!(node(&tree, &segments("a/x")), None);
    }

    #[test]
    fn test_null_write_prunes_ancestors() {
        let mut tree = Value::Null;
        write_at(&mut tree, &segments("a/b/c"), json!(1));
        write_at(&mut tree, &segments("a/b/c"), Value::Null);
        // The whole branch collapses, not just the leaf
        assert!(node(&tree, &segments("a")).is_none());
        assert!(tree.is_null());
    }

    #[test]
    fn test_null_write_keeps_siblings() {
        let mut tree = Value::Null;
        write_at(&mut tree, &segments("a/b"), json!(1));
        write_at(&mut tree, &segments("a/c"), json!(2));
        write_at(&mut tree, &segments("a/b"), Value::Null);
        assert_eq!(node(&tree, &segments("a")), Some(&json!({ "c": 2 })));
    }

    #[test]
    fn test_leaf_overwritten_by_branch() {
        let mut tree = Value::Null;
        write_at(&mut tree, &segments("a"), json!("leaf"));
        write_at(&mut tree, &segments("a/b"), json!(1));
        assert_eq!(node(&tree, &segments("a/b")), Some(&json!(1)));
    }

    #[test]
    fn test_resolve_server_values() {
        let mut value = json!({
            "text": "hi",
            "timestamp": server_timestamp(),
            "nested": { "deletedAt": server_timestamp() },
        });
        resolve_server_values(&mut value, 1234);
        assert_eq!(value["timestamp"], json!(1234));
        assert_eq!(value["nested"]["deletedAt"], json!(1234));
        assert_eq!(value["text"], json!("hi"));
    }
}
