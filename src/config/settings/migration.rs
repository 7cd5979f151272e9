// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use serde_json::{Map, Value};

/// Flat keys written by older plugin builds and where they live now
const LEGACY_RECALL_KEYS: &[(&str, &str)] = &[
    ("preventSelfMsg", "intercept_self_recall"),
    ("redirectPicPath", "redirect_pictures"),
];

/// Move legacy top-level keys into the `recall` section.
///
/// A value already present under `recall` wins over the legacy one.
pub(super) fn migrate_on_load(value: Value) -> Value {
    let mut root = match value {
        Value::Object(root) => root,
        other => return other,
    };

    let mut moved = Vec::new();
    for (legacy, current) in LEGACY_RECALL_KEYS {
        if let Some(old) = root.remove(*legacy) {
            moved.push((*current, old));
        }
    }
    if moved.is_empty() {
        return Value::Object(root);
    }

    let recall = root
        .entry("recall")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(recall) = recall {
        for (key, old) in moved {
            if !recall.contains_key(key) {
                tracing::debug!("Migrating legacy setting to recall.{}", key);
                recall.insert(key.to_string(), old);
            }
        }
    }

    Value::Object(root)
}

/// Deep-merge two JSON values.
/// `base` is existing file content, `overlay` is serialized current struct.
/// Overlay values take priority.
pub(super) fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = if let Some(base_val) = base_map.remove(&key) {
                    deep_merge(base_val, overlay_val)
                } else {
                    overlay_val
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_base, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_keys_moved() {
        let migrated = migrate_on_load(json!({
            "preventSelfMsg": true,
            "redirectPicPath": true
        }));
        assert_eq!(
            migrated,
            json!({"recall": {"intercept_self_recall": true, "redirect_pictures": true}})
        );
    }

    #[test]
    fn test_current_key_wins() {
        let migrated = migrate_on_load(json!({
            "preventSelfMsg": true,
            "recall": {"intercept_self_recall": false}
        }));
        assert_eq!(migrated, json!({"recall": {"intercept_self_recall": false}}));
    }

    #[test]
    fn test_modern_file_untouched() {
        let value = json!({"recall": {"ring_capacity": 3}});
        assert_eq!(migrate_on_load(value.clone()), value);
    }

    #[test]
    fn test_deep_merge_overlay_wins() {
        let merged = deep_merge(
            json!({"a": {"x": 1, "keep": true}, "b": 2}),
            json!({"a": {"x": 5}}),
        );
        assert_eq!(merged, json!({"a": {"x": 5, "keep": true}, "b": 2}));
    }
}
