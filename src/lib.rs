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

pub mod config;
pub mod connection;
pub mod context;
pub mod delete_path;
pub mod http_provider;
pub mod http_request;
pub mod identity;
pub mod ignore;
pub mod request;
pub mod response;
mod utils;

pub use http_provider::HttpProvider;
pub use http_request::{HttpRequestResource, RequestState};
