// This file is part of the terraform-provider-http project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
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

use serde_json::{Map, Value};

/// Blank and `null` bodies decode as an empty document
pub(super) fn decode_body(raw: &str) -> Result<Map<String, Value>, serde_json::Error> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        Ok(Map::new())
    } else {
        serde_json::from_str(raw)
    }
}

/// Deep equality where numbers compare by value, so `1` and `1.0` are equal
pub(super) fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| same_value(a, b))
        }
        (Value::Object(a), Value::Object(b)) => same_object(a, b),
        _ => a == b,
    }
}

pub(super) fn same_object(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| same_value(value, other)))
}

/// Make `target` agree with `source` at `path`
///
/// Returns whether `target` was touched.
pub(super) fn sync_path(
    target: &mut Map<String, Value>,
    source: &Map<String, Value>,
    path: &[String],
) -> bool {
    let Some((key, rest)) = path.split_first() else {
        return false;
    };

    if rest.is_empty() {
        return match source.get(key) {
            Some(value) if target.get(key).is_some_and(|current| same_value(current, value)) => {
                false
            }
            Some(value) => {
                target.insert(key.clone(), value.clone());
                true
            }
            None => target.remove(key).is_some(),
        };
    }

    let Some(source_child) = source.get(key) else {
        return target.remove(key).is_some();
    };
    let Value::Object(source_child) = source_child else {
        if target
            .get(key)
            .is_some_and(|current| same_value(current, source_child))
        {
            return false;
        }
        target.insert(key.clone(), source_child.clone());
        return true;
    };

    match target.get_mut(key) {
        Some(Value::Object(target_child)) => sync_path(target_child, source_child, rest),
        Some(other) => {
            *other = Value::Object(source_child.clone());
            true
        }
        None => {
            let mut child = Map::new();
            let touched = sync_path(&mut child, source_child, rest);
            target.insert(key.clone(), Value::Object(child));
            touched
        }
    }
}
