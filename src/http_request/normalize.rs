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

use tf_provider::{value::Value, Diagnostics};

use crate::{delete_path, utils::WithNormalize};

use super::state::RequestState;

impl<'a> WithNormalize for RequestState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        if self.id.is_null() {
            self.id = Value::Unknown;
        }
        // Only a templated delete path needs the response to be known
        if self.delete_resolved_path.is_null() {
            self.delete_resolved_path = match &self.delete_path {
                Value::Value(template) if !delete_path::has_tokens(template) => Value::Null,
                Value::Null => Value::Null,
                _ => Value::Unknown,
            };
        }
    }
}
