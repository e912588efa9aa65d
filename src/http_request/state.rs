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

use serde::{Deserialize, Serialize};

use tf_provider::map;
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{Value, ValueBool, ValueMap, ValueNumber, ValueSet, ValueString};

use crate::config::BasicAuthState;
use crate::utils::WithSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RequestState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub method: ValueString<'a>,
    pub path: ValueString<'a>,
    pub headers: ValueMap<'a, ValueString<'a>>,
    pub query_parameters: ValueMap<'a, ValueString<'a>>,
    pub request_body: ValueString<'a>,
    pub base_url: ValueString<'a>,
    pub basic_auth: Value<BasicAuthState<'a>>,
    pub ignore_tls: ValueBool,
    pub is_response_body_json: ValueBool,
    pub response_body_id_filter: ValueString<'a>,
    pub is_delete_enabled: ValueBool,
    pub delete_method: ValueString<'a>,
    pub delete_path: ValueString<'a>,
    pub delete_headers: ValueMap<'a, ValueString<'a>>,
    pub delete_request_body: ValueString<'a>,
    pub ignore_changes: ValueSet<ValueString<'a>>,
    pub delete_resolved_path: ValueString<'a>,
    pub response_code: ValueNumber,
    pub response_body: ValueString<'a>,
    pub response_body_id: ValueString<'a>,
    pub response_body_json: ValueMap<'a, ValueString<'a>>,
}

impl<'a> RequestState<'a> {
    /// Attributes that shape the managed request
    pub fn same_request(&self, other: &Self) -> bool {
        self.method == other.method
            && self.path == other.path
            && self.headers == other.headers
            && self.query_parameters == other.query_parameters
            && self.request_body == other.request_body
            && self.base_url == other.base_url
            && self.basic_auth == other.basic_auth
            && self.ignore_tls == other.ignore_tls
            && self.is_response_body_json == other.is_response_body_json
            && self.response_body_id_filter == other.response_body_id_filter
    }

    /// Mark every attribute computed from the response unknown
    pub fn clear_response(&mut self) {
        self.response_code = Value::Unknown;
        self.response_body = Value::Unknown;
        self.response_body_id = Value::Unknown;
        self.response_body_json = Value::Unknown;
    }

    /// Copy the attributes computed from the response of `other`
    pub fn copy_response(&mut self, other: &Self) {
        self.response_code = other.response_code;
        self.response_body = other.response_body.clone();
        self.response_body_id = other.response_body_id.clone();
        self.response_body_json = other.response_body_json.clone();
    }

    pub fn ignore_entries(&self) -> Vec<&str> {
        self.ignore_changes
            .iter()
            .flatten()
            .filter_map(|entry| entry.as_deref_option())
            .collect()
    }
}

fn string(description: &str, constraint: AttributeConstraint) -> Attribute {
    Attribute {
        attr_type: AttributeType::String,
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

fn flag(description: &str) -> Attribute {
    Attribute {
        attr_type: AttributeType::Bool,
        description: Description::plain(description),
        constraint: AttributeConstraint::Optional,
        ..Default::default()
    }
}

fn string_map(description: &str, constraint: AttributeConstraint) -> Attribute {
    Attribute {
        attr_type: AttributeType::Map(AttributeType::String.into()),
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

impl<'a> WithSchema for RequestState<'a> {
    fn schema() -> Schema {
        use AttributeConstraint::{Computed, Optional, Required};

        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => string("Opaque identifier encoding the request and its response", Computed),
                    "method" => string("HTTP method of the request", Required),
                    "path" => string("Path of the request, relative to the base URL", Required),
                    "headers" => string_map("Headers of the request", Optional),
                    "query_parameters" => string_map("Query parameters of the request", Optional),
                    "request_body" => string("Body of the request", Optional),
                    "base_url" => string("Base URL of the request, overrides the provider `url`", Optional),
                    "basic_auth" => BasicAuthState::schema(
                        "Basic authentication of the request, overrides the provider `basic_auth`",
                    ),
                    "ignore_tls" => flag("Skip TLS certificate verification, overrides the provider `ignore_tls`"),
                    "is_response_body_json" => flag("Whether the response body is JSON"),
                    "response_body_id_filter" => string(
                        "JSONPath extracting the identifier from the JSON response body",
                        Optional,
                    ),
                    "is_delete_enabled" => flag("Whether a request is sent when the resource is destroyed"),
                    "delete_method" => string("HTTP method of the delete request, defaults to `DELETE`", Optional),
                    "delete_path" => string(
                        "Path of the delete request, `$.`-prefixed JSONPath tokens are resolved against the response body",
                        Optional,
                    ),
                    "delete_headers" => string_map("Headers of the delete request", Optional),
                    "delete_request_body" => string("Body of the delete request", Optional),
                    "ignore_changes" => Attribute {
                        attr_type: AttributeType::Set(AttributeType::String.into()),
                        description: Description::plain(
                            "Attributes, map keys or JSON body paths whose changes never re-issue the request",
                        ),
                        constraint: Optional,
                        ..Default::default()
                    },
                    "delete_resolved_path" => string("`delete_path` resolved against the response body", Computed),
                    "response_code" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Status code of the response"),
                        constraint: Computed,
                        ..Default::default()
                    },
                    "response_body" => string("Body of the response", Computed),
                    "response_body_id" => string("Identifier extracted from the response body", Computed),
                    "response_body_json" => string_map("JSON response body flattened with dotted keys", Computed),
                },
                description: Description::plain("Issue an HTTP request as a managed resource"),
                ..Default::default()
            },
        }
    }
}
