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

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use thiserror::Error;
use url::{form_urlencoded, Url};

use tf_provider::value::{Value, ValueMap, ValueString};

use crate::config::Credentials;
use crate::connection::OutgoingRequest;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
pub const JSON_ACCEPT: &str = "application/json";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),
    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),
    #[error("invalid value for header {0:?}")]
    InvalidHeaderValue(String),
    #[error("value of `{attribute}` key {key:?} is not known yet")]
    UnknownMapValue { attribute: &'static str, key: String },
}

/// Everything needed to send one request, borrowed from the resource state
#[derive(Debug, Clone, Default)]
pub struct RequestParams<'r> {
    pub method: &'r str,
    pub path: &'r str,
    pub query: Vec<(&'r str, &'r str)>,
    pub headers: Vec<(&'r str, &'r str)>,
    pub body: Option<&'r str>,
    pub expect_json: bool,
    pub auth: Option<&'r Credentials>,
}

impl<'r> RequestParams<'r> {
    pub fn build(&self, base_url: &Url) -> Result<OutgoingRequest, BuildError> {
        let method = self.method.trim().to_uppercase();
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| BuildError::InvalidMethod(self.method.to_owned()))?;

        let url = build_url(base_url, self.path, &self.query);

        let (body, looks_json) = match self.body {
            Some(body) => {
                let (body, looks_json) = coerce_body(body);
                (Some(body.into_owned()), looks_json)
            }
            None => (None, false),
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| BuildError::InvalidHeaderName((*name).to_owned()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| BuildError::InvalidHeaderValue((*name).to_owned()))?;
            headers.insert(header_name, header_value);
        }

        if (self.expect_json || looks_json) && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }
        if self.expect_json && !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static(JSON_ACCEPT));
        }

        if let Some(auth) = self.auth {
            let token = STANDARD.encode(format!("{}:{}", auth.username, auth.password));
            let mut value = HeaderValue::from_str(&format!("Basic {token}"))
                .map_err(|_| BuildError::InvalidHeaderValue(AUTHORIZATION.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(OutgoingRequest {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Known entries of a string map, a null map is empty
pub fn map_entries<'v>(
    attribute: &'static str,
    map: &'v ValueMap<'_, ValueString<'_>>,
) -> Result<Vec<(&'v str, &'v str)>, BuildError> {
    let mut entries = Vec::new();
    for (key, value) in map.iter().flatten() {
        match value {
            Value::Value(value) => entries.push((key.as_ref(), value.as_ref())),
            Value::Null => (),
            Value::Unknown => {
                return Err(BuildError::UnknownMapValue {
                    attribute,
                    key: key.to_string(),
                })
            }
        }
    }
    Ok(entries)
}

/// Join `path` below the base URL path and merge every query parameter
///
/// The path is joined segment-wise and cleaned (`.`/`..` resolved, duplicate and trailing
/// slashes removed). Query parameters of the base URL, of the path, then of `query` are kept
/// in that order, stably sorted by name. The fragment comes from the path.
pub fn build_url(base_url: &Url, path: &str, query: &[(&str, &str)]) -> Url {
    let (path, fragment) = match path.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (path, None),
    };
    let (path, path_query) = match path.split_once('?') {
        Some((path, path_query)) => (path, Some(path_query)),
        None => (path, None),
    };

    let mut url = base_url.clone();

    let mut pairs: Vec<(Cow<str>, Cow<str>)> = base_url.query_pairs().collect();
    if let Some(path_query) = path_query {
        pairs.extend(form_urlencoded::parse(path_query.as_bytes()));
    }
    pairs.extend(
        query
            .iter()
            .map(|(key, value)| (Cow::Borrowed(*key), Cow::Borrowed(*value))),
    );
    pairs.sort_by(|(a, _), (b, _)| a.cmp(b));

    url.set_path(&join_paths(base_url.path(), path));
    url.set_query(None);
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    url.set_fragment(fragment.filter(|fragment| !fragment.is_empty()));

    url
}

/// Join two absolute paths and clean the result
fn join_paths(base: &str, path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(path.split('/')) {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Returns the body to send and whether it looks like JSON
///
/// A body given as a quoted JSON string literal holding a JSON document is unquoted.
pub fn coerce_body(raw: &str) -> (Cow<'_, str>, bool) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (Cow::Borrowed(raw), false);
    }
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        if let Ok(unquoted) = serde_json::from_str::<String>(trimmed) {
            if looks_like_json(&unquoted) {
                return (Cow::Owned(unquoted), true);
            }
        }
    }
    (Cow::Borrowed(raw), looks_like_json(trimmed))
}

fn looks_like_json(body: &str) -> bool {
    let body = body.trim_start();
    body.starts_with('{') || body.starts_with('[')
}
