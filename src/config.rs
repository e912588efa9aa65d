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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Description};
use tf_provider::value::{Value, ValueBool, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::utils::{non_empty, WithCredentials};

pub const ENV_URL: &str = "PROVIDER_HTTP_URL";
pub const ENV_USERNAME: &str = "PROVIDER_HTTP_USERNAME";
pub const ENV_PASSWORD: &str = "PROVIDER_HTTP_PASSWORD";

/// `basic_auth` block, shared by the provider and the resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BasicAuthState<'a> {
    #[serde(borrow = "'a")]
    pub username: ValueString<'a>,
    pub password: ValueString<'a>,
}

impl<'a> WithCredentials for BasicAuthState<'a> {
    fn username(&self) -> &str {
        self.username.as_str()
    }
    fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl<'a> BasicAuthState<'a> {
    pub fn schema(description: &str) -> Attribute {
        Attribute {
            attr_type: AttributeType::AttributeSingle(map! {
                "username" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("Username used for basic authentication"),
                    constraint: AttributeConstraint::Required,
                    ..Default::default()
                },
                "password" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("Password used for basic authentication"),
                    constraint: AttributeConstraint::Required,
                    sensitive: true,
                    ..Default::default()
                },
            }),
            description: Description::plain(description),
            constraint: AttributeConstraint::Optional,
            ..Default::default()
        }
    }

    /// Both fields must be set once the block is present
    pub fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        for (name, value) in [("username", &self.username), ("password", &self.password)] {
            if value.is_unknown() {
                continue;
            }
            if value.as_str().is_empty() {
                diags.error(
                    "Incomplete basic_auth",
                    format!("`{name}` must be set and non-empty when `basic_auth` is provided."),
                    attr_path.clone().attribute(name),
                );
            }
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username().to_owned(),
            password: self.password().to_owned(),
        }
    }
}

/// Provider block as declared in the Terraform configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderState<'a> {
    #[serde(borrow = "'a")]
    pub url: ValueString<'a>,
    pub basic_auth: Value<BasicAuthState<'a>>,
    pub ignore_tls: ValueBool,
}

impl<'a> ProviderState<'a> {
    pub fn schema() -> HashMap<String, Attribute> {
        map! {
            "url" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain(format!(
                    "Base URL of every request. Can be set with the `{ENV_URL}` environment variable."
                )),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
            "basic_auth" => BasicAuthState::schema(&format!(
                "Basic authentication sent with every request. Can be set with the `{ENV_USERNAME}` and `{ENV_PASSWORD}` environment variables."
            )),
            "ignore_tls" => Attribute {
                attr_type: AttributeType::Bool,
                description: Description::plain("Skip TLS certificate verification"),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Settings resolved at configure time, read-only afterwards
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub basic_auth: Option<Credentials>,
    pub ignore_tls: bool,
}

impl ProviderConfig {
    pub fn from_env(state: &ProviderState) -> Self {
        Self::from_lookup(state, |name| std::env::var(name).ok())
    }

    /// Build the config, an environment value wins when non-empty
    pub fn from_lookup<F>(state: &ProviderState, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let base_url = env(ENV_URL).unwrap_or_else(|| state.url.as_str().to_owned());
        let username = env(ENV_USERNAME).unwrap_or_else(|| state.basic_auth.username().to_owned());
        let password = env(ENV_PASSWORD).unwrap_or_else(|| state.basic_auth.password().to_owned());

        let basic_auth = if username.is_empty() || password.is_empty() {
            None
        } else {
            Some(Credentials { username, password })
        };

        Self {
            base_url,
            basic_auth,
            ignore_tls: state.ignore_tls.unwrap_or(false),
        }
    }

    pub fn has_authentication(&self) -> bool {
        self.basic_auth.is_some()
    }

    /// Merge with the resource-level overrides, the resource always wins when set
    pub fn resolve(
        &self,
        base_url: &ValueString,
        basic_auth: &Value<BasicAuthState>,
        ignore_tls: &ValueBool,
    ) -> Result<ResolvedConfig, ConfigError> {
        let base_url = match non_empty(base_url) {
            Some(url) => url,
            None if !self.base_url.is_empty() => self.base_url.as_str(),
            None => return Err(ConfigError::MissingBaseUrl),
        };

        let auth = match basic_auth {
            Value::Value(auth) => Some(auth.credentials()),
            _ => self.basic_auth.clone(),
        };

        let ignore_tls = match ignore_tls {
            Value::Value(ignore_tls) => *ignore_tls,
            _ => self.ignore_tls,
        };

        Ok(ResolvedConfig {
            base_url: parse_base_url(base_url)?,
            auth,
            ignore_tls,
        })
    }
}

/// Effective settings for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub base_url: Url,
    pub auth: Option<Credentials>,
    pub ignore_tls: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("a base URL must be configured either at the provider level (using the `url` attribute) or at the resource level (using the `base_url` attribute)")]
    MissingBaseUrl,
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported scheme {scheme:?} in base URL {url:?}, expected http or https")]
    UnsupportedScheme { url: String, scheme: String },
}

impl ConfigError {
    pub fn summary(&self) -> &'static str {
        match self {
            ConfigError::MissingBaseUrl => "No base URL configured",
            ConfigError::InvalidBaseUrl { .. } | ConfigError::UnsupportedScheme { .. } => {
                "Error parsing base URL"
            }
        }
    }
}

pub fn parse_base_url(url: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(url).map_err(|source| ConfigError::InvalidBaseUrl {
        url: url.to_owned(),
        source,
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ConfigError::UnsupportedScheme {
            url: url.to_owned(),
            scheme: scheme.to_owned(),
        }),
    }
}
