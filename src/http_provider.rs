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

use async_trait::async_trait;

use tf_provider::schema::{Block, Description, Schema};
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{map, AttributePath, DynamicDataSource, DynamicResource, Provider};

use crate::config::{parse_base_url, ProviderConfig, ProviderState};
use crate::context::{ProviderContext, SharedContext};
use crate::http_request::HttpRequestResource;

#[derive(Debug, Default, Clone)]
pub struct HttpProvider {
    context: SharedContext,
}

impl HttpProvider {
    pub fn context(&self) -> &SharedContext {
        &self.context
    }
}

#[async_trait]
impl Provider for HttpProvider {
    type Config<'a> = ProviderState<'a>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut tf_provider::Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                attributes: ProviderState::schema(),
                description: Description::plain(
                    "Manage HTTP requests as resources, sent against a shared base URL",
                ),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(
        &self,
        diags: &mut tf_provider::Diagnostics,
        config: Self::Config<'a>,
    ) -> Option<()> {
        if let Value::Value(url) = &config.url {
            if !url.is_empty() {
                if let Err(err) = parse_base_url(url) {
                    diags.error(err.summary(), err.to_string(), AttributePath::new("url"));
                }
            }
        }
        if let Value::Value(basic_auth) = &config.basic_auth {
            basic_auth.validate(diags, AttributePath::new("basic_auth"));
        }

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn configure<'a>(
        &self,
        diags: &mut tf_provider::Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let config = ProviderConfig::from_env(&config);
        tracing::info!(
            terraform_version = %terraform_version,
            base_url = %config.base_url,
            authenticated = config.has_authentication(),
            "configuring provider"
        );

        match ProviderContext::new(config) {
            Ok(context) => {
                self.context.configure(context);
                Some(())
            }
            Err(err) => {
                diags.root_error("Failed to initialize the HTTP client", format!("{err:#}"));
                None
            }
        }
    }

    fn get_resources(
        &self,
        _diags: &mut tf_provider::Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicResource>>> {
        Some(map! {
            "request"          => HttpRequestResource::new(self.context.clone(), false),
            "request_nonfatal" => HttpRequestResource::new(self.context.clone(), true),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut tf_provider::Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicDataSource>>> {
        Some(Default::default())
    }
}
