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
use std::sync::Arc;

use async_trait::async_trait;

use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{schema::Schema, AttributePath, Diagnostics, Resource};

use crate::config::Credentials;
use crate::connection::Connection;
use crate::context::{ProviderContext, SharedContext};
use crate::delete_path::{self, DeletePathError};
use crate::identity::{self, RequestRecord};
use crate::ignore::{self, IgnoreEntry};
use crate::request::{map_entries, BuildError, RequestParams};
use crate::response::{self, ResponseRecord};
use crate::utils::{is_true, non_empty, WithNormalize, WithSchema, WithValidate};

use super::state::RequestState;

const DEFAULT_DELETE_METHOD: &str = "DELETE";

#[derive(Debug, Default, Clone)]
pub struct HttpRequestResource {
    context: SharedContext,
    accept_not_found: bool,
}

impl HttpRequestResource {
    /// With `accept_not_found`, a 404 answer to the managed request is recorded instead of failing
    pub fn new(context: SharedContext, accept_not_found: bool) -> Self {
        Self {
            context,
            accept_not_found,
        }
    }

    fn context(&self, diags: &mut Diagnostics) -> Option<Arc<ProviderContext>> {
        match self.context.current() {
            Ok(context) => Some(context),
            Err(err) => {
                diags.root_error("Failed to initialize the HTTP client", format!("{err:#}"));
                None
            }
        }
    }

    /// Send the managed request and interpret its response
    async fn send(&self, diags: &mut Diagnostics, state: &RequestState<'_>) -> Option<ResponseRecord> {
        let context = self.context(diags)?;
        let resolved = match context
            .config
            .resolve(&state.base_url, &state.basic_auth, &state.ignore_tls)
        {
            Ok(resolved) => resolved,
            Err(err) => {
                diags.error(err.summary(), err.to_string(), AttributePath::new("base_url"));
                return None;
            }
        };

        let expect_json = is_true(&state.is_response_body_json);
        let request = match state
            .request_params(resolved.auth.as_ref())
            .and_then(|params| params.build(&resolved.base_url))
        {
            Ok(request) => request,
            Err(err) => {
                diags.root_error(
                    "Error creating request. Check the method or request body informed...",
                    err.to_string(),
                );
                return None;
            }
        };

        let client = match context.client_for(resolved.ignore_tls) {
            Ok(client) => client,
            Err(err) => {
                diags.root_error("Error executing request using HTTP client...", format!("{err:#}"));
                return None;
            }
        };

        tracing::info!(method = %request.method, url = %request.url, "sending request");
        let response = match client.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                diags.root_error("Error executing request using HTTP client...", format!("{err:#}"));
                return None;
            }
        };
        tracing::info!(status = response.status, "request completed");

        if !response::is_success(response.status, self.accept_not_found) {
            diags.root_error(
                "Error performing HTTP request. Not expected status code...",
                format!(
                    "Response code: {}. Response body: {}",
                    response.status_line(),
                    response.body
                ),
            );
            return None;
        }

        let lenient = self.accept_not_found && response.status == 404;
        Some(response::interpret(
            diags,
            response.status,
            &response.body,
            expect_json,
            state.response_body_id_filter.as_str(),
            lenient,
        ))
    }

    async fn send_delete(&self, diags: &mut Diagnostics, state: &RequestState<'_>) -> Option<()> {
        let context = self.context(diags)?;
        let resolved = match context
            .config
            .resolve(&state.base_url, &state.basic_auth, &state.ignore_tls)
        {
            Ok(resolved) => resolved,
            Err(err) => {
                diags.error(err.summary(), err.to_string(), AttributePath::new("base_url"));
                return None;
            }
        };

        let path = match state.delete_target() {
            Ok(path) => path,
            Err(err) => {
                diags.error(err.summary(), err.to_string(), AttributePath::new("delete_path"));
                return None;
            }
        };

        let request = match state
            .delete_params(&path, resolved.auth.as_ref())
            .and_then(|params| params.build(&resolved.base_url))
        {
            Ok(request) => request,
            Err(err) => {
                diags.root_error("Error creating DELETE request", err.to_string());
                return None;
            }
        };

        let client = match context.client_for(resolved.ignore_tls) {
            Ok(client) => client,
            Err(err) => {
                diags.root_error("Error executing DELETE HTTP request", format!("{err:#}"));
                return None;
            }
        };

        tracing::info!(method = %request.method, url = %request.url, "sending delete request");
        let response = match client.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                diags.root_error("Error executing DELETE HTTP request", format!("{err:#}"));
                return None;
            }
        };
        tracing::debug!(status = response.status, body = %response.body, "delete response");

        if !response::is_success(response.status, true) {
            diags.root_error(
                "DELETE request failed with unexpected status code",
                format!(
                    "Response code: {}. Body: {}",
                    response.status_line(),
                    response.body
                ),
            );
            return None;
        }
        Some(())
    }
}

#[async_trait]
impl Resource for HttpRequestResource {
    type State<'a> = RequestState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(RequestState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config.validate(diags, Default::default()).await;

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        _diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        Some((state, private_state))
    }

    async fn plan_create<'a>(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.id = Value::Unknown;
        state.delete_resolved_path = Value::Null;
        state.clear_response();
        state.normalize(diags);

        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(
        Self::State<'a>,
        Self::PrivateState<'a>,
        Vec<tf_provider::AttributePath>,
    )> {
        let unchanged = proposed_state.reconciles_with(diags, &prior_state);

        let mut state = proposed_state;
        state.id = prior_state.id.clone();
        if unchanged {
            state.copy_response(&prior_state);
        } else {
            state.clear_response();
        }

        if unchanged && state.delete_path == prior_state.delete_path {
            state.delete_resolved_path = prior_state.delete_resolved_path.clone();
        } else {
            state.delete_resolved_path = Value::Null;
            state.normalize(diags);
        }

        Some((state, prior_private_state, Vec::new()))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(prior_private_state)
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = planned_state;

        let record = self.send(diags, &state).await?;
        if !diags.errors.is_empty() {
            return None;
        }

        state.record_response(record);
        state.resolve_delete_path(diags);

        if non_empty(&state.id).is_none() {
            match identity::encode(&RequestRecord::from_state(&state)) {
                Ok(id) => state.id = Value::Value(Cow::Owned(id)),
                Err(err) => {
                    diags.root_error(err.summary(), err.to_string());
                    return None;
                }
            }
        }

        Some((state, private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        if !planned_state.reconciles_with(diags, &prior_state) {
            return self
                .create(
                    diags,
                    planned_state,
                    config_state,
                    private_state,
                    provider_meta_state,
                )
                .await;
        }

        tracing::debug!("request unchanged after ignore_changes, not sending it");

        let mut state = planned_state;
        state.id = prior_state.id.clone();
        state.copy_response(&prior_state);
        if state.delete_path == prior_state.delete_path {
            state.delete_resolved_path = prior_state.delete_resolved_path.clone();
        } else {
            state.resolve_delete_path(diags);
        }

        Some((state, private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        if !is_true(&state.is_delete_enabled) {
            tracing::debug!("delete is not enabled, removing from state only");
            return Some(());
        }

        self.send_delete(diags, &state).await
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let record = match identity::decode(&id) {
            Ok(record) => record,
            Err(err) => {
                diags.root_error(err.summary(), err.to_string());
                return None;
            }
        };

        let state = record.into_state(id);
        state.validate(diags, Default::default()).await;
        if !diags.errors.is_empty() {
            return None;
        }

        Some((state, Default::default()))
    }
}

impl<'a> RequestState<'a> {
    fn parsed_ignore_entries(&self) -> Vec<IgnoreEntry> {
        // Parsing problems were already reported during validation
        ignore::parse_entries(
            &mut Diagnostics::default(),
            &AttributePath::new("ignore_changes"),
            self.ignore_entries(),
        )
    }

    /// Whether the request of `self` matches the one of `prior` once ignored changes are reverted
    fn reconciles_with(&self, diags: &mut Diagnostics, prior: &RequestState<'a>) -> bool {
        let entries = self.parsed_ignore_entries();
        let mut reconciled = self.clone();
        ignore::apply(diags, &entries, &mut reconciled, prior);
        reconciled.same_request(prior)
    }

    fn request_params<'r>(
        &'r self,
        auth: Option<&'r Credentials>,
    ) -> Result<RequestParams<'r>, BuildError> {
        Ok(RequestParams {
            method: self.method.as_str(),
            path: self.path.as_str(),
            query: map_entries("query_parameters", &self.query_parameters)?,
            headers: map_entries("headers", &self.headers)?,
            body: non_empty(&self.request_body),
            expect_json: is_true(&self.is_response_body_json),
            auth,
        })
    }

    /// The delete request shares the query parameters but nothing else of the managed request
    fn delete_params<'r>(
        &'r self,
        path: &'r str,
        auth: Option<&'r Credentials>,
    ) -> Result<RequestParams<'r>, BuildError> {
        Ok(RequestParams {
            method: non_empty(&self.delete_method)
                .map(str::trim)
                .filter(|method| !method.is_empty())
                .unwrap_or(DEFAULT_DELETE_METHOD),
            path,
            query: map_entries("query_parameters", &self.query_parameters)?,
            headers: map_entries("delete_headers", &self.delete_headers)?,
            body: non_empty(&self.delete_request_body),
            expect_json: is_true(&self.is_response_body_json),
            auth,
        })
    }

    fn delete_target(&self) -> Result<Cow<'_, str>, DeletePathError> {
        let Some(template) = non_empty(&self.delete_path) else {
            return Ok(Cow::Borrowed(self.path.as_str()));
        };
        match non_empty(&self.delete_resolved_path) {
            Some(resolved) => Ok(Cow::Borrowed(resolved)),
            None => delete_path::resolve(template, self.response_body.as_str()),
        }
    }

    fn record_response(&mut self, record: ResponseRecord) {
        self.response_code = Value::Value(record.code.into());
        self.response_body = Value::Value(Cow::Owned(record.body));
        self.response_body_id = record.body_id.map(Cow::Owned).into();
        self.response_body_json = Value::Value(
            record
                .body_json
                .into_iter()
                .map(|(key, value)| (Cow::Owned(key), Value::Value(Cow::Owned(value))))
                .collect(),
        );
    }

    /// Resolve `delete_path` against the recorded response, failures are deferred to destroy
    fn resolve_delete_path(&mut self, diags: &mut Diagnostics) {
        let resolved = match non_empty(&self.delete_path) {
            Some(template) if delete_path::has_tokens(template) => {
                match delete_path::resolve(template, self.response_body.as_str()) {
                    Ok(path) => Value::Value(Cow::Owned(path.into_owned())),
                    Err(err) => {
                        diags.warning(
                            err.summary(),
                            err.to_string(),
                            AttributePath::new("delete_path"),
                        );
                        Value::Null
                    }
                }
            }
            _ => Value::Null,
        };
        self.delete_resolved_path = resolved;
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::collections::{BTreeMap, BTreeSet};

    use tf_provider::value::Value;
    use tf_provider::Diagnostics;

    use crate::delete_path::DeletePathError;
    use crate::response::ResponseRecord;

    use super::RequestState;

    fn state<'a>() -> RequestState<'a> {
        RequestState {
            method: Value::Value(Cow::from("POST")),
            path: Value::Value(Cow::from("/posts")),
            ..Default::default()
        }
    }

    #[test]
    fn delete_target_selection() {
        let mut state = state();
        assert_eq!(state.delete_target().unwrap(), "/posts");

        state.delete_path = Value::Value(Cow::from("/posts/$.id"));
        state.delete_resolved_path = Value::Value(Cow::from("/posts/7"));
        assert_eq!(state.delete_target().unwrap(), "/posts/7");

        state.delete_resolved_path = Value::Null;
        state.response_body = Value::Value(Cow::from(r#"{"id":8}"#));
        assert_eq!(state.delete_target().unwrap(), "/posts/8");

        state.response_body = Value::Null;
        assert!(matches!(
            state.delete_target(),
            Err(DeletePathError::MissingBody)
        ));
    }

    #[test]
    fn delete_params_default_method_and_headers() {
        let mut state = state();
        state.headers = Value::Value(BTreeMap::from([(
            Cow::from("X-Create"),
            Value::Value(Cow::from("1")),
        )]));
        state.delete_headers = Value::Value(BTreeMap::from([(
            Cow::from("X-Delete"),
            Value::Value(Cow::from("1")),
        )]));
        state.request_body = Value::Value(Cow::from("create body"));

        let params = state.delete_params("/posts/1", None).unwrap();
        assert_eq!(params.method, "DELETE");
        assert_eq!(params.headers, vec![("X-Delete", "1")]);
        assert_eq!(params.body, None);

        state.delete_method = Value::Value(Cow::from(" post "));
        assert_eq!(state.delete_params("/posts/1", None).unwrap().method, "post");
    }

    #[test]
    fn recorded_response_and_resolved_path() {
        let mut state = state();
        state.delete_path = Value::Value(Cow::from("/posts/$.id"));
        state.record_response(ResponseRecord {
            code: 201,
            body: r#"{"id":3}"#.to_owned(),
            body_id: Some("3".to_owned()),
            body_json: BTreeMap::from([("id".to_owned(), "3".to_owned())]),
        });

        let mut diags = Diagnostics::default();
        state.resolve_delete_path(&mut diags);
        assert_eq!(state.response_code, Value::Value(201));
        assert_eq!(state.response_body_id, Value::Value(Cow::from("3")));
        assert_eq!(state.delete_resolved_path, Value::Value(Cow::from("/posts/3")));

        state.delete_path = Value::Value(Cow::from("/posts/$.missing"));
        state.resolve_delete_path(&mut diags);
        assert!(state.delete_resolved_path.is_null());
        assert!(diags.errors.is_empty());
        assert_eq!(diags.warnings.len(), 1);
    }

    #[test]
    fn ignored_header_reconciles() {
        let prior = RequestState {
            headers: Value::Value(BTreeMap::from([(
                Cow::from("X-Request-Id"),
                Value::Value(Cow::from("old")),
            )])),
            ..state()
        };
        let mut proposed = RequestState {
            headers: Value::Value(BTreeMap::from([(
                Cow::from("X-Request-Id"),
                Value::Value(Cow::from("new")),
            )])),
            ..state()
        };

        let mut diags = Diagnostics::default();
        assert!(!proposed.reconciles_with(&mut diags, &prior));

        proposed.ignore_changes = Value::Value(BTreeSet::from([Value::Value(Cow::from(
            "headers.X-Request-Id",
        ))]));
        assert!(proposed.reconciles_with(&mut diags, &prior));
    }
}
