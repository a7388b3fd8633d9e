//! Deep merge of JSON partials into stored documents.

use serde_json::Value;

/// Merge `patch` into `target`.
///
/// Objects merge key by key, recursively, and a `null` member removes the key.
/// Any other value (arrays, scalars) replaces what was there.
pub fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    target.remove(&key);
                    continue;
                }
                match target.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value)
                    }
                    _ => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_maps_merge_per_key() {
        let mut tile = json!({
            "tile_type": "ocean",
            "next": { "left": "a", "right": null, "up": null, "down": null }
        });
        deep_merge(&mut tile, json!({ "next": { "right": "b" } }));
        assert_eq!(tile["next"]["left"], "a");
        assert_eq!(tile["next"]["right"], "b");
        assert_eq!(tile["tile_type"], "ocean");
    }

    #[test]
    fn test_scalars_and_arrays_replace() {
        let mut doc = json!({ "tile_type": "ocean", "entities": ["a", "b"] });
        deep_merge(&mut doc, json!({ "tile_type": "shore", "entities": ["c"] }));
        assert_eq!(doc, json!({ "tile_type": "shore", "entities": ["c"] }));
    }

    #[test]
    fn test_new_keys_are_added() {
        let mut doc = json!({ "a": 1 });
        deep_merge(&mut doc, json!({ "b": { "c": 2 } }));
        assert_eq!(doc, json!({ "a": 1, "b": { "c": 2 } }));
    }

    #[test]
    fn test_null_removes_key() {
        let mut world = json!({ "id": "w", "chunks": { "a": true, "b": true } });
        deep_merge(&mut world, json!({ "chunks": { "a": null, "c": true } }));
        assert_eq!(world, json!({ "id": "w", "chunks": { "b": true, "c": true } }));

        deep_merge(&mut world, json!({ "missing": null }));
        assert!(world.get("missing").is_none());
    }

    #[test]
    fn test_non_object_target_is_replaced() {
        let mut doc = json!("scalar");
        deep_merge(&mut doc, json!({ "a": 1 }));
        assert_eq!(doc, json!({ "a": 1 }));
    }
}
