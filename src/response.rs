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

use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde_json::{Map, Value};
use serde_json_path::JsonPath;

use tf_provider::{AttributePath, Diagnostics};

/// Values recorded in state from one response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseRecord {
    pub code: u16,
    pub body: String,
    pub body_id: Option<String>,
    pub body_json: BTreeMap<String, String>,
}

pub fn is_success(status: u16, accept_not_found: bool) -> bool {
    (200..300).contains(&status) || (accept_not_found && status == 404)
}

/// Record a response
///
/// With `lenient`, failures to decode a JSON body are reported as warnings instead of errors.
pub fn interpret(
    diags: &mut Diagnostics,
    status: u16,
    body: &str,
    is_json: bool,
    id_filter: &str,
    lenient: bool,
) -> ResponseRecord {
    let mut record = ResponseRecord {
        code: status,
        body: body.to_owned(),
        ..Default::default()
    };

    if !is_json {
        return record;
    }

    let report = |diags: &mut Diagnostics, summary: &'static str, detail: String| {
        let attr_path = AttributePath::new("response_body");
        if lenient {
            diags.warning(summary, detail, attr_path);
        } else {
            diags.error(summary, detail, attr_path);
        }
    };

    match compact_json(body) {
        Ok(compact) => record.body = compact,
        Err(err) => {
            report(diags, "Error compacting JSON response body...", err.to_string());
            return record;
        }
    }

    record.body_id = extract_id(diags, &record.body, id_filter);

    match flatten_json(&record.body) {
        Ok(flat) => record.body_json = flat,
        Err(err) => report(
            diags,
            "Error unmarshalling response body to a JSON map reference...",
            err.to_string(),
        ),
    }

    record
}

/// Remove insignificant whitespace, keeping member order and string escapes untouched
pub fn compact_json(body: &str) -> Result<String, serde_json::Error> {
    serde_json::from_str::<IgnoredAny>(body)?;

    let mut compact = String::with_capacity(body.len());
    let mut in_string = false;
    let mut escaped = false;
    for c in body.chars() {
        if in_string {
            compact.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            compact.push(c);
        } else if !matches!(c, ' ' | '\t' | '\n' | '\r') {
            compact.push(c);
        }
    }
    Ok(compact)
}

/// First value matched by `filter`, non-fatal on any failure
pub fn extract_id(diags: &mut Diagnostics, body: &str, filter: &str) -> Option<String> {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(err) => {
            diags.warning(
                "It wasn't possible to unmarshall response body to a JSON map reference...",
                err.to_string(),
                AttributePath::new("response_body"),
            );
            return None;
        }
    };

    let path = match JsonPath::parse(filter) {
        Ok(path) => path,
        Err(err) => {
            diags.warning(
                "It wasn't possible to parse the JSON path using the `response_body_id_filter` provided...",
                err.to_string(),
                AttributePath::new("response_body_id_filter"),
            );
            return None;
        }
    };

    match path.query(&json).first() {
        Some(value) if !value.is_null() => Some(stringify(value)),
        _ => {
            diags.warning(
                "The JSON path provided didn't return any value...",
                "Please check the `response_body_id_filter` provided.",
                AttributePath::new("response_body_id_filter"),
            );
            None
        }
    }
}

/// Flatten a JSON object into dotted keys, only objects are walked into
pub fn flatten_json(body: &str) -> Result<BTreeMap<String, String>, serde_json::Error> {
    let object: Map<String, Value> = serde_json::from_str(body)?;
    let mut flat = BTreeMap::new();
    flatten_into(&mut flat, "", &object);
    Ok(flat)
}

fn flatten_into(flat: &mut BTreeMap<String, String>, prefix: &str, object: &Map<String, Value>) {
    for (key, value) in object {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) => flatten_into(flat, &key, nested),
            leaf => {
                flat.insert(key, stringify(leaf));
            }
        }
    }
}

/// Strings as-is, anything else as compact JSON
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
