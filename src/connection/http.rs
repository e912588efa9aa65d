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

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{Connection, HttpResponse, OutgoingRequest};

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    ignore_tls: bool,
}

impl HttpClient {
    pub fn new(ignore_tls: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(ignore_tls)
            .build()
            .context("failed to build the HTTP client")?;
        Ok(Self { client, ignore_tls })
    }

    pub fn ignore_tls(&self) -> bool {
        self.ignore_tls
    }

    /// Reuse this client when the TLS setting matches, build a dedicated one otherwise
    pub fn with_ignore_tls(&self, ignore_tls: bool) -> Result<Cow<'_, Self>> {
        if ignore_tls == self.ignore_tls {
            Ok(Cow::Borrowed(self))
        } else {
            tracing::debug!(ignore_tls, "building a dedicated HTTP client");
            Ok(Cow::Owned(Self::new(ignore_tls)?))
        }
    }
}

#[async_trait]
impl Connection for HttpClient {
    async fn execute(&self, request: OutgoingRequest) -> Result<HttpResponse> {
        let OutgoingRequest {
            method,
            url,
            headers,
            body,
        } = request;

        tracing::debug!("{} {}", method, url);

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.context("failed to send the request")?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .context("failed to read the response body")?;

        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}
