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
use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;
use serde_json_path::JsonPath;
use thiserror::Error;

use crate::response::stringify;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"\$\.[^/]+").expect("delete path token pattern is valid");
}

#[derive(Debug, Error)]
pub enum DeletePathError {
    #[error("`delete_path` contains JSONPath tokens but `response_body` is empty; cannot resolve.")]
    MissingBody,
    #[error("response_body is not valid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),
    #[error("token {token:?}: {reason}")]
    InvalidToken { token: String, reason: String },
    #[error("token {token:?} did not resolve against create response")]
    Unresolved { token: String },
}

impl DeletePathError {
    pub fn summary(&self) -> &'static str {
        match self {
            DeletePathError::MissingBody => "Missing response_body to resolve delete_path",
            DeletePathError::InvalidBody(_) => {
                "Failed to parse response_body for delete_path resolution"
            }
            DeletePathError::InvalidToken { .. } => "Failed to parse JSONPath token in delete_path",
            DeletePathError::Unresolved { .. } => "JSONPath token not found in response_body",
        }
    }
}

pub fn has_tokens(template: &str) -> bool {
    TOKEN.is_match(template)
}

/// Substitute every `$.` token of `template` with its value in `body`
///
/// Nothing is substituted unless every token resolves.
pub fn resolve<'t>(template: &'t str, body: &str) -> Result<Cow<'t, str>, DeletePathError> {
    if !has_tokens(template) {
        return Ok(Cow::Borrowed(template));
    }
    if body.trim().is_empty() {
        return Err(DeletePathError::MissingBody);
    }

    let json: Value = serde_json::from_str(body).map_err(DeletePathError::InvalidBody)?;

    let mut resolved = HashMap::new();
    for token in TOKEN.find_iter(template).map(|m| m.as_str()) {
        if resolved.contains_key(token) {
            continue;
        }
        let path = JsonPath::parse(token).map_err(|err| DeletePathError::InvalidToken {
            token: token.to_owned(),
            reason: err.to_string(),
        })?;
        match path.query(&json).first() {
            Some(value) if !value.is_null() => {
                resolved.insert(token, stringify(value));
            }
            _ => {
                return Err(DeletePathError::Unresolved {
                    token: token.to_owned(),
                })
            }
        }
    }

    Ok(TOKEN.replace_all(template, |caps: &Captures| {
        resolved.get(&caps[0]).cloned().unwrap_or_default()
    }))
}
