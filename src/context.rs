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
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;

use crate::config::ProviderConfig;
use crate::connection::HttpClient;

/// Everything resources need from the provider once it is configured
#[derive(Debug)]
pub struct ProviderContext {
    pub config: ProviderConfig,
    client: HttpClient,
}

impl ProviderContext {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = HttpClient::new(config.ignore_tls)?;
        Ok(Self { config, client })
    }

    pub fn client_for(&self, ignore_tls: bool) -> Result<Cow<'_, HttpClient>> {
        self.client.with_ignore_tls(ignore_tls)
    }
}

/// Handle given to resources at registration, filled by `configure`
#[derive(Debug, Default, Clone)]
pub struct SharedContext {
    inner: Arc<RwLock<Option<Arc<ProviderContext>>>>,
}

impl SharedContext {
    pub fn new(context: ProviderContext) -> Self {
        let shared = Self::default();
        shared.configure(context);
        shared
    }

    pub fn configure(&self, context: ProviderContext) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner = Some(Arc::new(context));
    }

    pub fn is_configured(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Current context, or an unconfigured default one
    pub fn current(&self) -> Result<Arc<ProviderContext>> {
        if let Some(context) = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(context.clone());
        }

        tracing::warn!("provider is not configured yet, using default settings");
        Ok(Arc::new(ProviderContext::new(ProviderConfig::default())?))
    }
}
