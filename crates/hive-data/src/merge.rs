// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Default-schema merge for definition documents.
//!
//! When the engine adds a new optional setting, definitions saved by an older
//! version do not have it. [`merge_with_defaults`] fills in every missing key from
//! the current default document without touching anything the stored document
//! already defines.

use serde_json::{Map, Value};

/// A key whose value type differs between the stored and the default document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConflict {
    /// The dotted path of the key, such as `guideLayer.settings.autoAlign`.
    pub path: String,
    /// The JSON type of the stored value.
    pub stored: &'static str,
    /// The JSON type of the default value.
    pub default: &'static str,
}

/// What a merge changed or flagged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Dotted paths of keys taken from the defaults.
    pub added: Vec<String>,
    /// Keys whose type changed. The stored value was kept for each of them.
    pub conflicts: Vec<TypeConflict>,
}

impl MergeReport {
    /// Returns `true` if the merge neither added keys nor found conflicts.
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.conflicts.is_empty()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Merges `defaults` into `stored`. The stored document wins everywhere.
///
/// * Objects are unioned recursively; keys only present in `defaults` are appended.
/// * Arrays of objects keyed by a string `id`, such as the guide tree and its
///   nested `children`, keep the stored elements in stored order; each element is
///   merged with the default element carrying the same id at the same level.
///   Elements only present in `defaults` are not added, and an element missing an
///   id-keyed list does not get one, so a guide without `children` stays a leaf.
/// * Other arrays and scalars keep the stored value.
/// * A key whose type differs (object vs. scalar, number vs. string, ...) keeps the
///   stored value and is reported in [`MergeReport::conflicts`]. Nulls on either
///   side are not conflicts.
pub fn merge_with_defaults(stored: &Value, defaults: &Value) -> (Value, MergeReport) {
    let mut report = MergeReport::default();
    let merged = merge_value(stored, defaults, "", &mut report);
    (merged, report)
}

fn merge_value(stored: &Value, defaults: &Value, path: &str, report: &mut MergeReport) -> Value {
    match (stored, defaults) {
        (Value::Object(s), Value::Object(d)) => {
            Value::Object(merge_object(s, d, path, false, report))
        }
        (Value::Array(s), Value::Array(d)) if is_keyed(s) && is_keyed(d) => {
            Value::Array(merge_keyed(s, d, path, report))
        }
        (Value::Null, _) | (_, Value::Null) => stored.clone(),
        (s, d) if type_name(s) != type_name(d) => {
            log::warn!(
                "Definition key '{}' is a {} but the current schema expects a {}; keeping the stored value",
                path,
                type_name(s),
                type_name(d)
            );
            report.conflicts.push(TypeConflict {
                path: path.to_string(),
                stored: type_name(s),
                default: type_name(d),
            });
            stored.clone()
        }
        _ => stored.clone(),
    }
}

fn element_id(value: &Value) -> Option<&str> {
    value.as_object()?.get("id")?.as_str()
}

fn is_keyed(values: &[Value]) -> bool {
    !values.is_empty() && values.iter().all(|v| element_id(v).is_some())
}

fn merge_keyed(stored: &[Value], defaults: &[Value], path: &str, report: &mut MergeReport) -> Vec<Value> {
    stored
        .iter()
        .map(|element| {
            let id = element_id(element).unwrap_or_default();
            let default = defaults.iter().find(|d| element_id(d) == Some(id));
            match (element, default) {
                (Value::Object(s), Some(Value::Object(d))) => {
                    Value::Object(merge_object(s, d, &format!("{path}[{id}]"), true, report))
                }
                _ => element.clone(),
            }
        })
        .collect()
}

fn merge_object(
    stored: &Map<String, Value>,
    defaults: &Map<String, Value>,
    path: &str,
    element: bool,
    report: &mut MergeReport,
) -> Map<String, Value> {
    let mut out = stored.clone();
    for (key, default_value) in defaults {
        let key_path = join(path, key);
        match stored.get(key) {
            Some(stored_value) => {
                let merged = merge_value(stored_value, default_value, &key_path, report);
                out.insert(key.clone(), merged);
            }
            None if element && default_value.as_array().is_some_and(|a| is_keyed(a)) => {
                log::debug!("Not creating id-keyed list '{}' from defaults", key_path);
            }
            None => {
                out.insert(key.clone(), default_value.clone());
                report.added.push(key_path);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_keys_come_from_defaults() {
        let stored = json!({ "settings": { "jointCount": 5 } });
        let defaults = json!({ "settings": { "jointCount": 3, "autoAlign": true }, "info": {} });
        let (merged, report) = merge_with_defaults(&stored, &defaults);
        assert_eq!(
            merged,
            json!({ "settings": { "jointCount": 5, "autoAlign": true }, "info": {} })
        );
        assert_eq!(report.added, vec!["settings.autoAlign", "info"]);
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn test_arrays_keep_their_stored_elements() {
        let stored = json!({ "dag": [{ "id": "a" }], "drivers": [1, 2] });
        let defaults = json!({ "dag": [{ "id": "x" }, { "id": "y" }], "drivers": [3] });
        let (merged, report) = merge_with_defaults(&stored, &defaults);
        assert_eq!(merged, stored);
        assert!(report.is_clean());
    }

    #[test]
    fn test_guide_tree_is_merged_by_id() {
        // ARRANGE
        let stored = json!({ "dag": [
            { "id": "upr", "children": [
                { "id": "mid", "shape": "cube" },
                { "id": "extra" }
            ]}
        ]});
        let defaults = json!({ "dag": [
            { "id": "upr", "shape": "circle", "children": [
                { "id": "mid", "shape": "circle", "settings": { "twist": 0 }, "children": [
                    { "id": "end" }
                ]}
            ]}
        ]});

        // ACT
        let (merged, report) = merge_with_defaults(&stored, &defaults);

        // ASSERT
        assert_eq!(
            merged,
            json!({ "dag": [
                { "id": "upr", "children": [
                    { "id": "mid", "shape": "cube", "settings": { "twist": 0 } },
                    { "id": "extra" }
                ], "shape": "circle" }
            ]})
        );
        assert_eq!(
            report.added,
            vec!["dag[upr].shape", "dag[upr].children[mid].settings"]
        );
    }

    #[test]
    fn test_type_conflict_is_flagged_not_coerced() {
        let stored = json!({ "settings": { "autoAlign": "yes", "space": 1 } });
        let defaults = json!({ "settings": { "autoAlign": true, "space": { "world": 0 } } });
        let (merged, report) = merge_with_defaults(&stored, &defaults);
        assert_eq!(merged, stored);
        assert_eq!(report.conflicts.len(), 2);
        assert_eq!(report.conflicts[0].path, "settings.autoAlign");
        assert_eq!(report.conflicts[0].stored, "string");
        assert_eq!(report.conflicts[1].default, "object");
    }

    #[test]
    fn test_stored_key_order_is_kept() {
        let stored = json!({ "b": 1, "a": 2 });
        let defaults = json!({ "a": 0, "c": 3 });
        let (merged, _) = merge_with_defaults(&stored, &defaults);
        let keys: Vec<&String> = merged.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }
}
