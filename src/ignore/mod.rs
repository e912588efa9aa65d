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

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use tf_provider::value::{Value, ValueBool, ValueMap, ValueString};
use tf_provider::{AttributePath, Diagnostics};

use crate::config::BasicAuthState;
use crate::http_request::RequestState;
use crate::utils::{plain_map, DisplayJoinable};

mod json;

/// Attributes only read when destroying, they never produce a diff
pub const DESTROY_ONLY_ATTRIBUTES: [&str; 5] = [
    "is_delete_enabled",
    "delete_method",
    "delete_path",
    "delete_headers",
    "delete_request_body",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// String or bool, no sub-path
    Scalar,
    /// At most one segment: the map key
    Map,
    /// Any JSON sub-path in the body document
    Body,
    /// Compared and copied as a whole
    Object,
}

impl AttributeKind {
    fn check(self, sub_path: &[String]) -> Result<(), &'static str> {
        match self {
            AttributeKind::Scalar | AttributeKind::Object if !sub_path.is_empty() => {
                Err("nested paths are not supported for this attribute")
            }
            AttributeKind::Map if sub_path.len() > 1 => {
                Err("only a single map key can be referenced (e.g. headers.Authorization)")
            }
            _ => Ok(()),
        }
    }
}

/// Place where a plan/state difference must not count as a change,
/// eg: `method`, `headers.Authorization` or `request_body.metadata.trace_id`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IgnoreEntry {
    pub attribute: String,
    pub sub_path: Vec<String>,
}

impl IgnoreEntry {
    pub fn is_whole(&self) -> bool {
        self.sub_path.is_empty()
    }
}

struct Field<'a, V> {
    plan: for<'s> fn(&'s mut RequestState<'a>) -> &'s mut V,
    state: for<'s> fn(&'s RequestState<'a>) -> &'s V,
}

enum Applier<'a> {
    Text(Field<'a, ValueString<'a>>),
    Flag(Field<'a, ValueBool>),
    Map(Field<'a, ValueMap<'a, ValueString<'a>>>),
    Body(Field<'a, ValueString<'a>>),
    Object(Field<'a, Value<BasicAuthState<'a>>>),
}

macro_rules! field {
    ($name:ident) => {
        Field {
            plan: |state| &mut state.$name,
            state: |state| &state.$name,
        }
    };
}

fn appliers<'a>() -> [(&'static str, Applier<'a>); 10] {
    [
        ("method", Applier::Text(field!(method))),
        ("path", Applier::Text(field!(path))),
        ("base_url", Applier::Text(field!(base_url))),
        ("response_body_id_filter", Applier::Text(field!(response_body_id_filter))),
        ("ignore_tls", Applier::Flag(field!(ignore_tls))),
        ("is_response_body_json", Applier::Flag(field!(is_response_body_json))),
        ("headers", Applier::Map(field!(headers))),
        ("query_parameters", Applier::Map(field!(query_parameters))),
        ("request_body", Applier::Body(field!(request_body))),
        ("basic_auth", Applier::Object(field!(basic_auth))),
    ]
}

impl<'a> Applier<'a> {
    fn kind(&self) -> AttributeKind {
        match self {
            Applier::Text(_) | Applier::Flag(_) => AttributeKind::Scalar,
            Applier::Map(_) => AttributeKind::Map,
            Applier::Body(_) => AttributeKind::Body,
            Applier::Object(_) => AttributeKind::Object,
        }
    }

    fn apply(
        &self,
        diags: &mut Diagnostics,
        entries: &[&IgnoreEntry],
        plan: &mut RequestState<'a>,
        state: &RequestState<'a>,
    ) -> bool {
        match self {
            Applier::Text(field) => apply_whole((field.plan)(plan), (field.state)(state)),
            Applier::Flag(field) => apply_whole((field.plan)(plan), (field.state)(state)),
            Applier::Object(field) => apply_whole((field.plan)(plan), (field.state)(state)),
            Applier::Map(field) => apply_map(entries, (field.plan)(plan), (field.state)(state)),
            Applier::Body(field) => {
                apply_body(diags, entries, (field.plan)(plan), (field.state)(state))
            }
        }
    }
}

pub fn kind_of(attribute: &str) -> Option<AttributeKind> {
    appliers()
        .iter()
        .find(|(name, _)| *name == attribute)
        .map(|(_, applier)| applier.kind())
}

pub fn supported_attributes() -> Vec<&'static str> {
    appliers().iter().map(|(name, _)| *name).collect()
}

/// Parse raw entries, unusable ones are reported and dropped
pub fn parse_entries<'s, I>(
    diags: &mut Diagnostics,
    attr_path: &AttributePath,
    raw_entries: I,
) -> Vec<IgnoreEntry>
where
    I: IntoIterator<Item = &'s str>,
{
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for raw in raw_entries {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut segments = trimmed.split('.');
        let attribute = segments.next().unwrap_or_default().trim().to_lowercase();
        let sub_path: Vec<String> = segments
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect();

        let Some(kind) = kind_of(&attribute) else {
            let detail = if DESTROY_ONLY_ATTRIBUTES.contains(&attribute.as_str()) {
                format!(
                    "Entry {raw:?} references attribute {attribute:?} which is only used at destroy time and never produces a diff. This entry will be ignored."
                )
            } else {
                format!(
                    "Entry {raw:?} references attribute {attribute:?} which is not supported. This entry will be ignored. Supported attributes: {}.",
                    supported_attributes().iter().join_with(", ")
                )
            };
            diags.warning("Unsupported ignore_changes entry", detail, attr_path.clone());
            continue;
        };

        if let Err(reason) = kind.check(&sub_path) {
            diags.error(
                "Invalid ignore_changes entry",
                format!("Entry {raw:?} is invalid: {reason}"),
                attr_path.clone(),
            );
            continue;
        }

        let entry = IgnoreEntry {
            attribute,
            sub_path,
        };
        if seen.insert(entry.clone()) {
            entries.push(entry);
        }
    }

    entries
}

/// Copy prior state values over `plan` where entries ask for it
///
/// Returns whether `plan` was modified.
pub fn apply<'a>(
    diags: &mut Diagnostics,
    entries: &[IgnoreEntry],
    plan: &mut RequestState<'a>,
    state: &RequestState<'a>,
) -> bool {
    let mut grouped: BTreeMap<&str, Vec<&IgnoreEntry>> = BTreeMap::new();
    for entry in entries {
        grouped.entry(entry.attribute.as_str()).or_default().push(entry);
    }

    let appliers = appliers();
    let mut changed = false;
    for (attribute, entries) in grouped {
        if let Some((_, applier)) = appliers.iter().find(|(name, _)| *name == attribute) {
            changed |= applier.apply(diags, &entries, plan, state);
        }
    }
    changed
}

fn apply_whole<V: PartialEq + Clone>(plan: &mut V, state: &V) -> bool {
    if plan == state {
        false
    } else {
        *plan = state.clone();
        true
    }
}

fn apply_map<'a>(
    entries: &[&IgnoreEntry],
    plan: &mut ValueMap<'a, ValueString<'a>>,
    state: &ValueMap<'a, ValueString<'a>>,
) -> bool {
    if entries.iter().any(|entry| entry.is_whole()) {
        return apply_whole(plan, state);
    }
    if plan.is_unknown() {
        return false;
    }

    let state_map = plain_map(state);
    let mut plan_map = plain_map(plan);
    let mut touched = false;

    for key in entries.iter().filter_map(|entry| entry.sub_path.first()) {
        match state_map.get(key) {
            Some(value) => {
                if plan_map.get(key) != Some(value) {
                    plan_map.insert(key.clone(), value.clone());
                    touched = true;
                }
            }
            None => touched |= plan_map.remove(key).is_some(),
        }
    }

    if !touched {
        return false;
    }

    if plan_map.is_empty() && state_map.is_empty() {
        *plan = state.clone();
    } else {
        *plan = Value::Value(
            plan_map
                .into_iter()
                .map(|(key, value)| (Cow::Owned(key), Value::Value(Cow::Owned(value))))
                .collect(),
        );
    }
    true
}

fn apply_body<'a>(
    diags: &mut Diagnostics,
    entries: &[&IgnoreEntry],
    plan: &mut ValueString<'a>,
    state: &ValueString<'a>,
) -> bool {
    if entries.iter().any(|entry| entry.is_whole()) {
        return apply_whole(plan, state);
    }

    let (Value::Value(plan_raw), Value::Value(state_raw)) = (&*plan, state) else {
        return false;
    };

    let mut target = match json::decode_body(plan_raw) {
        Ok(json) => json,
        Err(err) => {
            diags.warning(
                "Unable to parse request_body for ignore_changes",
                err.to_string(),
                AttributePath::new("request_body"),
            );
            return false;
        }
    };
    let source = match json::decode_body(state_raw) {
        Ok(json) => json,
        Err(err) => {
            diags.warning(
                "Unable to parse state request_body for ignore_changes",
                err.to_string(),
                AttributePath::new("request_body"),
            );
            return false;
        }
    };

    let mut touched = false;
    for entry in entries {
        touched |= json::sync_path(&mut target, &source, &entry.sub_path);
    }

    // Only commit when the ignored paths were the whole difference
    if touched && json::same_object(&target, &source) && plan_raw != state_raw {
        *plan = state.clone();
        true
    } else {
        false
    }
}
