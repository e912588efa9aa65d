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
use std::collections::BTreeMap;
use std::io;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use tf_provider::value::{Value, ValueBool, ValueMap, ValueString};

use crate::config::BasicAuthState;
use crate::http_request::RequestState;
use crate::utils::{is_true, plain_map};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("expected a string with the format <RANDOM UUID>/<PARAMETERS ENCODED IN BASE64>")]
    Malformed,
    #[error("failed to decode Base64 identifier here is the specific cause: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to decode the JSON parameters: {0}")]
    Json(#[from] serde_json::Error),
    #[error("the imported model is incomplete, it's expected to have at least the method and path informed")]
    Incomplete,
}

impl IdentityError {
    pub fn summary(&self) -> &'static str {
        match self {
            IdentityError::Incomplete => {
                "Incomplete Model provided, please check the provided Base64 identifier..."
            }
            _ => "Invalid Import Identifier please check the Base64 encoding...",
        }
    }
}

/// Plain projection of the resource, empty optional fields are omitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestRecord {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub request_body: String,
    #[serde(skip_serializing_if = "is_false")]
    pub is_response_body_json: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub response_body_id_filter: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub query_parameters: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub basic_auth: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "is_false")]
    pub ignore_tls: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub is_delete_enabled: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub delete_method: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub delete_path: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub delete_headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub delete_request_body: String,

    pub response_code: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub response_body: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub response_body_id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub response_body_json: BTreeMap<String, String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl RequestRecord {
    pub fn from_state(state: &RequestState) -> Self {
        Self {
            method: state.method.as_str().to_owned(),
            path: state.path.as_str().to_owned(),
            headers: plain_map(&state.headers),
            request_body: state.request_body.as_str().to_owned(),
            is_response_body_json: is_true(&state.is_response_body_json),
            response_body_id_filter: state.response_body_id_filter.as_str().to_owned(),
            query_parameters: plain_map(&state.query_parameters),
            base_url: state.base_url.as_str().to_owned(),
            basic_auth: match &state.basic_auth {
                Value::Value(auth) => BTreeMap::from([
                    ("password".to_owned(), auth.password.as_str().to_owned()),
                    ("username".to_owned(), auth.username.as_str().to_owned()),
                ]),
                _ => BTreeMap::new(),
            },
            ignore_tls: is_true(&state.ignore_tls),
            is_delete_enabled: is_true(&state.is_delete_enabled),
            delete_method: state.delete_method.as_str().to_owned(),
            delete_path: state.delete_path.as_str().to_owned(),
            delete_headers: plain_map(&state.delete_headers),
            delete_request_body: state.delete_request_body.as_str().to_owned(),
            response_code: state.response_code.unwrap_or(0),
            response_body: state.response_body.as_str().to_owned(),
            response_body_id: state.response_body_id.as_str().to_owned(),
            response_body_json: plain_map(&state.response_body_json),
        }
    }

    /// Rehydrate a state, only non-empty fields are set
    pub fn into_state<'a>(self, id: String) -> RequestState<'a> {
        RequestState {
            id: Value::Value(Cow::Owned(id)),
            method: string_value(self.method),
            path: string_value(self.path),
            headers: map_value(self.headers),
            query_parameters: map_value(self.query_parameters),
            request_body: string_value(self.request_body),
            base_url: string_value(self.base_url),
            basic_auth: if self.basic_auth.is_empty() {
                Value::Null
            } else {
                let mut auth = self.basic_auth;
                Value::Value(BasicAuthState {
                    username: Value::Value(Cow::Owned(auth.remove("username").unwrap_or_default())),
                    password: Value::Value(Cow::Owned(auth.remove("password").unwrap_or_default())),
                })
            },
            ignore_tls: bool_value(self.ignore_tls),
            is_response_body_json: bool_value(self.is_response_body_json),
            response_body_id_filter: string_value(self.response_body_id_filter),
            is_delete_enabled: bool_value(self.is_delete_enabled),
            delete_method: string_value(self.delete_method),
            delete_path: string_value(self.delete_path),
            delete_headers: map_value(self.delete_headers),
            delete_request_body: string_value(self.delete_request_body),
            ignore_changes: Value::Null,
            delete_resolved_path: Value::Null,
            response_code: Value::Value(self.response_code),
            response_body: string_value(self.response_body),
            response_body_id: string_value(self.response_body_id),
            response_body_json: map_value(self.response_body_json),
        }
    }
}

fn string_value<'a>(value: String) -> ValueString<'a> {
    if value.is_empty() {
        Value::Null
    } else {
        Value::Value(Cow::Owned(value))
    }
}

fn bool_value(value: bool) -> ValueBool {
    if value {
        Value::Value(true)
    } else {
        Value::Null
    }
}

fn map_value<'a>(map: BTreeMap<String, String>) -> ValueMap<'a, ValueString<'a>> {
    if map.is_empty() {
        Value::Null
    } else {
        Value::Value(
            map.into_iter()
                .map(|(key, value)| (Cow::Owned(key), Value::Value(Cow::Owned(value))))
                .collect(),
        )
    }
}

/// Compact JSON with `<`, `>`, `&`, U+2028 and U+2029 escaped inside strings
struct HtmlSafeFormatter;

impl serde_json::ser::Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escaped = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Base64 part of the identifier
pub fn encode_parameters(record: &RequestRecord) -> Result<String, IdentityError> {
    let mut json = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut json, HtmlSafeFormatter);
    record.serialize(&mut serializer)?;
    Ok(STANDARD.encode(json))
}

/// Build a fresh identifier: `<uuid v4>/<base64 of the compact JSON record>`
pub fn encode(record: &RequestRecord) -> Result<String, IdentityError> {
    Ok(format!("{}/{}", Uuid::new_v4(), encode_parameters(record)?))
}

/// Decode an identifier, the base64 part may itself contain `/`
pub fn decode(id: &str) -> Result<RequestRecord, IdentityError> {
    let (_, encoded) = id
        .split_once('/')
        .filter(|(prefix, encoded)| !prefix.is_empty() && !encoded.is_empty())
        .ok_or(IdentityError::Malformed)?;

    let json = STANDARD.decode(encoded.trim())?;
    let record: RequestRecord = serde_json::from_slice(&json)?;

    if record.method.is_empty() || record.path.is_empty() {
        return Err(IdentityError::Incomplete);
    }
    Ok(record)
}
