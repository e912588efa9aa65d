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

//! Lifecycle of the `http_request` resources against a mock HTTP server

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use tf_provider::value::{Value, ValueMap, ValueSet, ValueString};
use tf_provider::{Diagnostics, Resource};
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use terraform_provider_http::config::{Credentials, ProviderConfig};
use terraform_provider_http::context::{ProviderContext, SharedContext};
use terraform_provider_http::identity;
use terraform_provider_http::{HttpRequestResource, RequestState};

fn resource_with(config: ProviderConfig, accept_not_found: bool) -> HttpRequestResource {
    let context = ProviderContext::new(config).expect("client should build");
    HttpRequestResource::new(SharedContext::new(context), accept_not_found)
}

fn resource(server: &MockServer, accept_not_found: bool) -> HttpRequestResource {
    resource_with(
        ProviderConfig {
            base_url: server.uri(),
            ..Default::default()
        },
        accept_not_found,
    )
}

fn request<'a>(method: &'a str, path: &'a str) -> RequestState<'a> {
    RequestState {
        method: Value::Value(Cow::from(method)),
        path: Value::Value(Cow::from(path)),
        ..Default::default()
    }
}

fn string_map<'a>(pairs: &[(&'a str, &'a str)]) -> ValueMap<'a, ValueString<'a>> {
    Value::Value(
        pairs
            .iter()
            .map(|(key, value)| (Cow::from(*key), Value::Value(Cow::from(*value))))
            .collect::<BTreeMap<_, _>>(),
    )
}

fn string_set<'a>(entries: &[&'a str]) -> ValueSet<ValueString<'a>> {
    Value::Value(
        entries
            .iter()
            .map(|entry| Value::Value(Cow::from(*entry)))
            .collect::<BTreeSet<_>>(),
    )
}

async fn apply_create<'a>(
    resource: &HttpRequestResource,
    diags: &mut Diagnostics,
    config: RequestState<'a>,
) -> Option<RequestState<'a>> {
    let (planned, private) = resource
        .plan_create(diags, config.clone(), config.clone(), Default::default())
        .await?;
    let (state, _) = resource
        .create(diags, planned, config, private, Default::default())
        .await?;
    Some(state)
}

#[tokio::test]
async fn create_records_json_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/1"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "{\n  \"userId\": 1,\n  \"id\": 1,\n  \"title\": \"sunt aut facere\",\n  \"meta\": {\"tags\": [\"a\"]}\n}\n",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let resource = resource(&server, false);
    let mut diags = Diagnostics::default();
    let config = RequestState {
        is_response_body_json: Value::Value(true),
        response_body_id_filter: Value::Value(Cow::from("$.id")),
        ..request("GET", "/posts/1")
    };

    let state = apply_create(&resource, &mut diags, config)
        .await
        .expect("create should succeed");

    assert!(diags.errors.is_empty(), "{:?}", diags.errors);
    assert_eq!(state.response_code, Value::Value(200));
    assert_eq!(
        state.response_body.as_str(),
        r#"{"userId":1,"id":1,"title":"sunt aut facere","meta":{"tags":["a"]}}"#
    );
    assert_eq!(state.response_body_id, Value::Value(Cow::from("1")));
    assert_eq!(
        state.response_body_json,
        string_map(&[
            ("id", "1"),
            ("meta.tags", r#"["a"]"#),
            ("title", "sunt aut facere"),
            ("userId", "1"),
        ])
    );
    assert!(state.delete_resolved_path.is_null());

    let id = state.id.as_str();
    let (prefix, _) = id.split_once('/').expect("id has two parts");
    assert!(uuid::Uuid::parse_str(prefix).is_ok());
    let record = identity::decode(id).expect("id should decode");
    assert_eq!(record.method, "GET");
    assert_eq!(record.path, "/posts/1");
    assert_eq!(record.response_code, 200);
}

#[tokio::test]
async fn plain_body_with_query_and_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/items"))
        .and(query_param("page", "2"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(header("content-type", "application/json; charset=UTF-8"))
        .and(body_string(r#"{"name":"x"}"#))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&server)
        .await;

    let resource = resource_with(
        ProviderConfig {
            base_url: format!("{}/api", server.uri()),
            basic_auth: Some(Credentials {
                username: "user".to_owned(),
                password: "pass".to_owned(),
            }),
            ignore_tls: false,
        },
        false,
    );
    let mut diags = Diagnostics::default();
    let config = RequestState {
        query_parameters: string_map(&[("page", "2")]),
        request_body: Value::Value(Cow::from(r#"{"name":"x"}"#)),
        ..request("post", "items")
    };

    let state = apply_create(&resource, &mut diags, config)
        .await
        .expect("create should succeed");

    assert_eq!(state.response_code, Value::Value(201));
    assert_eq!(state.response_body.as_str(), "created");
    assert!(state.response_body_id.is_null());
    assert_eq!(state.response_body_json, Value::Value(Default::default()));
}

#[tokio::test]
async fn unexpected_status_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such thing"))
        .mount(&server)
        .await;

    let resource = resource(&server, false);
    let mut diags = Diagnostics::default();
    let state = apply_create(&resource, &mut diags, request("GET", "/missing")).await;

    assert!(state.is_none());
    assert_eq!(
        diags.errors[0].summary,
        "Error performing HTTP request. Not expected status code..."
    );
    assert!(diags.errors[0]
        .detail
        .starts_with("Response code: 404 Not Found. Response body: no such thing"));
}

#[tokio::test]
async fn nonfatal_variant_records_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>not found</html>"))
        .mount(&server)
        .await;

    let resource = resource(&server, true);
    let mut diags = Diagnostics::default();
    let config = RequestState {
        is_response_body_json: Value::Value(true),
        response_body_id_filter: Value::Value(Cow::from("$.id")),
        ..request("GET", "/missing")
    };
    let state = apply_create(&resource, &mut diags, config)
        .await
        .expect("404 is tolerated");

    assert!(diags.errors.is_empty(), "{:?}", diags.errors);
    assert!(!diags.warnings.is_empty());
    assert_eq!(state.response_code, Value::Value(404));
    assert_eq!(state.response_body.as_str(), "<html>not found</html>");

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let mut diags = Diagnostics::default();
    assert!(apply_create(&resource, &mut diags, request("GET", "/broken"))
        .await
        .is_none());
    assert_eq!(diags.errors.len(), 1);
}

#[tokio::test]
async fn missing_base_url_is_reported() {
    let resource = resource_with(ProviderConfig::default(), false);
    let mut diags = Diagnostics::default();
    assert!(apply_create(&resource, &mut diags, request("GET", "/x"))
        .await
        .is_none());
    assert_eq!(diags.errors[0].summary, "No base URL configured");
}

#[tokio::test]
async fn destroy_without_delete_enabled_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let resource = resource(&server, false);
    let mut diags = Diagnostics::default();
    let state = apply_create(&resource, &mut diags, request("GET", "/posts/1"))
        .await
        .expect("create should succeed");

    assert!(resource
        .destroy(&mut diags, state, Default::default(), Default::default())
        .await
        .is_some());
    assert!(diags.errors.is_empty());
}

#[tokio::test]
async fn destroy_uses_request_path_and_delete_settings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/posts/1"))
        .and(query_param("page", "2"))
        .and(header("x-delete", "yes"))
        .and(body_string("bye"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let resource = resource(&server, false);
    let mut diags = Diagnostics::default();
    let config = RequestState {
        is_delete_enabled: Value::Value(true),
        query_parameters: string_map(&[("page", "2")]),
        headers: string_map(&[("X-Create", "yes")]),
        delete_headers: string_map(&[("X-Delete", "yes")]),
        delete_request_body: Value::Value(Cow::from("bye")),
        ..request("POST", "/posts/1")
    };
    let state = apply_create(&resource, &mut diags, config)
        .await
        .expect("create should succeed");

    assert!(resource
        .destroy(&mut diags, state, Default::default(), Default::default())
        .await
        .is_some());
    assert!(diags.errors.is_empty(), "{:?}", diags.errors);
}

#[tokio::test]
async fn destroy_resolves_delete_path_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/7/posts"))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":101,"userId":7}"#))
        .mount(&server)
        .await;
    Mock::given(method("REMOVE"))
        .and(path("/users/7/posts/101"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let resource = resource(&server, false);
    let mut diags = Diagnostics::default();
    let config = RequestState {
        is_delete_enabled: Value::Value(true),
        delete_method: Value::Value(Cow::from(" remove ")),
        delete_path: Value::Value(Cow::from("/users/$.userId/posts/$.id")),
        ..request("POST", "/users/7/posts")
    };

    let (planned, _) = resource
        .plan_create(&mut diags, config.clone(), config.clone(), Default::default())
        .await
        .unwrap();
    assert!(planned.delete_resolved_path.is_unknown());

    let state = apply_create(&resource, &mut diags, config)
        .await
        .expect("create should succeed");
    assert_eq!(
        state.delete_resolved_path,
        Value::Value(Cow::from("/users/7/posts/101"))
    );

    assert!(resource
        .destroy(&mut diags, state, Default::default(), Default::default())
        .await
        .is_some());
    assert!(diags.errors.is_empty(), "{:?}", diags.errors);
}

#[tokio::test]
async fn destroy_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let resource = resource(&server, true);
    let mut diags = Diagnostics::default();
    let state = RequestState {
        is_delete_enabled: Value::Value(true),
        ..request("GET", "/posts/1")
    };

    assert!(resource
        .destroy(&mut diags, state, Default::default(), Default::default())
        .await
        .is_none());
    assert_eq!(
        diags.errors[0].summary,
        "DELETE request failed with unexpected status code"
    );
    assert!(diags.errors[0]
        .detail
        .starts_with("Response code: 500 Internal Server Error. Body: boom"));
}

#[tokio::test]
async fn unresolvable_delete_path_fails_at_destroy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"name":"x"}"#))
        .mount(&server)
        .await;

    let resource = resource(&server, false);
    let mut diags = Diagnostics::default();
    let config = RequestState {
        is_delete_enabled: Value::Value(true),
        delete_path: Value::Value(Cow::from("/posts/$.id")),
        ..request("POST", "/posts")
    };
    let state = apply_create(&resource, &mut diags, config)
        .await
        .expect("create only warns");
    assert!(state.delete_resolved_path.is_null());
    assert_eq!(diags.warnings.len(), 1);

    let mut diags = Diagnostics::default();
    assert!(resource
        .destroy(&mut diags, state, Default::default(), Default::default())
        .await
        .is_none());
    assert_eq!(
        diags.errors[0].summary,
        "JSONPath token not found in response_body"
    );
}

#[tokio::test]
async fn import_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id": "abc", "ok": true}"#))
        .mount(&server)
        .await;

    let resource = resource(&server, false);
    let mut diags = Diagnostics::default();
    let config = RequestState {
        headers: string_map(&[("X-Trace", "<1&2>")]),
        request_body: Value::Value(Cow::from(r#"{"title":"demo"}"#)),
        is_response_body_json: Value::Value(true),
        response_body_id_filter: Value::Value(Cow::from("$.id")),
        ..request("POST", "/posts")
    };
    let created = apply_create(&resource, &mut diags, config)
        .await
        .expect("create should succeed");
    let id = created.id.as_str().to_owned();

    let (imported, _) = resource
        .import(&mut diags, id.clone())
        .await
        .expect("import should succeed");

    assert!(diags.errors.is_empty(), "{:?}", diags.errors);
    assert_eq!(imported.id.as_str(), id);
    assert_eq!(imported.method, created.method);
    assert_eq!(imported.path, created.path);
    assert_eq!(imported.headers, created.headers);
    assert_eq!(imported.request_body, created.request_body);
    assert_eq!(imported.is_response_body_json, Value::Value(true));
    assert_eq!(imported.response_code, Value::Value(201));
    assert_eq!(imported.response_body, created.response_body);
    assert_eq!(imported.response_body_id, Value::Value(Cow::from("abc")));
    assert_eq!(imported.response_body_json, created.response_body_json);
    assert!(imported.ignore_tls.is_null());
}

#[tokio::test]
async fn import_rejects_bad_identifiers() {
    let resource = resource_with(ProviderConfig::default(), false);

    let mut diags = Diagnostics::default();
    assert!(resource
        .import(&mut diags, "no-separator".to_owned())
        .await
        .is_none());
    assert_eq!(
        diags.errors[0].summary,
        "Invalid Import Identifier please check the Base64 encoding..."
    );

    let mut diags = Diagnostics::default();
    // {"path":"/x"}
    assert!(resource
        .import(&mut diags, "some-uuid/eyJwYXRoIjoiL3gifQ==".to_owned())
        .await
        .is_none());
    assert_eq!(
        diags.errors[0].summary,
        "Incomplete Model provided, please check the provided Base64 identifier..."
    );
}

#[tokio::test]
async fn ignored_header_change_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(201).set_body_string("first"))
        .expect(1)
        .mount(&server)
        .await;

    let resource = resource(&server, false);
    let mut diags = Diagnostics::default();
    let config = RequestState {
        headers: string_map(&[("X-Request-Id", "a")]),
        ignore_changes: string_set(&["headers.X-Request-Id"]),
        ..request("POST", "/posts")
    };
    let created = apply_create(&resource, &mut diags, config)
        .await
        .expect("create should succeed");

    let proposed = RequestState {
        headers: string_map(&[("X-Request-Id", "b")]),
        ..created.clone()
    };
    let (planned, private, replace) = resource
        .plan_update(
            &mut diags,
            created.clone(),
            proposed.clone(),
            proposed.clone(),
            Default::default(),
            Default::default(),
        )
        .await
        .expect("plan should succeed");

    assert!(replace.is_empty());
    assert_eq!(planned.headers, proposed.headers);
    assert_eq!(planned.id, created.id);
    assert_eq!(planned.response_body, created.response_body);
    assert_eq!(planned.response_code, created.response_code);

    let (updated, _) = resource
        .update(
            &mut diags,
            created.clone(),
            planned,
            proposed,
            private,
            Default::default(),
        )
        .await
        .expect("update should succeed");

    assert!(diags.errors.is_empty(), "{:?}", diags.errors);
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.response_body.as_str(), "first");
    assert_eq!(updated.headers, string_map(&[("X-Request-Id", "b")]));
}

#[tokio::test]
async fn real_change_reissues_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(201).set_body_string("done"))
        .expect(2)
        .mount(&server)
        .await;

    let resource = resource(&server, false);
    let mut diags = Diagnostics::default();
    let config = RequestState {
        request_body: Value::Value(Cow::from(r#"{"title":"a","trace":"1"}"#)),
        ignore_changes: string_set(&["request_body.trace"]),
        ..request("POST", "/posts")
    };
    let created = apply_create(&resource, &mut diags, config)
        .await
        .expect("create should succeed");

    let proposed = RequestState {
        request_body: Value::Value(Cow::from(r#"{"title":"b","trace":"2"}"#)),
        ..created.clone()
    };
    let (planned, private, _) = resource
        .plan_update(
            &mut diags,
            created.clone(),
            proposed.clone(),
            proposed.clone(),
            Default::default(),
            Default::default(),
        )
        .await
        .expect("plan should succeed");
    assert!(planned.response_body.is_unknown());
    assert!(planned.response_code.is_unknown());
    assert_eq!(planned.id, created.id);

    let (updated, _) = resource
        .update(
            &mut diags,
            created.clone(),
            planned,
            proposed,
            private,
            Default::default(),
        )
        .await
        .expect("update should succeed");

    assert!(diags.errors.is_empty(), "{:?}", diags.errors);
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.response_code, Value::Value(201));
}
