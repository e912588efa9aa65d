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

use async_trait::async_trait;
use serde_json_path::JsonPath;

use tf_provider::value::Value;
use tf_provider::{AttributePath, Diagnostics};

use crate::config::parse_base_url;
use crate::ignore;
use crate::utils::{is_true, WithValidate};

use super::state::RequestState;

#[async_trait]
impl<'a> WithValidate for RequestState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        for (name, value) in [("method", &self.method), ("path", &self.path)] {
            if let Value::Value(value) = value {
                if value.trim().is_empty() {
                    diags.error_short(
                        format!("`{name}` must not be empty"),
                        attr_path.clone().attribute(name),
                    );
                }
            }
        }

        let filter_path = attr_path.clone().attribute("response_body_id_filter");
        if is_true(&self.is_response_body_json) {
            let blank = match &self.response_body_id_filter {
                Value::Value(filter) => filter.trim().is_empty(),
                Value::Null | Value::Unknown => true,
            };
            if blank {
                diags.error(
                    "Since the response is JSON, the filter must be provided.",
                    "`response_body_id_filter` is required when `is_response_body_json` is true.",
                    filter_path.clone(),
                );
            }
        }
        if let Value::Value(filter) = &self.response_body_id_filter {
            if !filter.trim().is_empty() {
                if let Err(err) = JsonPath::parse(filter) {
                    diags.warning(
                        "It wasn't possible to parse the JSON path using the `response_body_id_filter` provided...",
                        err.to_string(),
                        filter_path,
                    );
                }
            }
        }

        if let Value::Value(base_url) = &self.base_url {
            if !base_url.is_empty() {
                if let Err(err) = parse_base_url(base_url) {
                    diags.error(
                        err.summary(),
                        err.to_string(),
                        attr_path.clone().attribute("base_url"),
                    );
                }
            }
        }

        if let Value::Value(basic_auth) = &self.basic_auth {
            basic_auth.validate(diags, attr_path.clone().attribute("basic_auth"));
        }

        if self.ignore_changes.is_value() {
            ignore::parse_entries(
                diags,
                &attr_path.attribute("ignore_changes"),
                self.ignore_entries(),
            );
        }
    }
}
