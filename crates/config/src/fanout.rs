// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Fanout declarations: buffer sizing for branches and the upstream pipe.

use crate::error::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A fanout specification.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct FanoutSpec {
    /// Optional human-readable description of the fanout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Buffering policies.
    #[serde(default)]
    pub policies: FanoutPolicies,
}

impl FanoutSpec {
    /// Parses and validates a YAML fanout specification.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Error> {
        let spec: Self = serde_yaml::from_str(yaml).map_err(|e| Error::Parse {
            details: e.to_string(),
        })?;
        spec.validate()?;
        Ok(spec)
    }

    /// Reads, parses, and validates a YAML fanout specification from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Returns validation errors for this fanout specification.
    #[must_use]
    pub fn validation_errors(&self, path_prefix: &str) -> Vec<String> {
        self.policies
            .validation_errors(&format!("{path_prefix}.policies"))
    }

    /// Fails with [`Error::InvalidConfig`] when any policy is violated.
    pub fn validate(&self) -> Result<(), Error> {
        let errors = self.validation_errors("fanout");
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig { errors })
        }
    }

    /// Returns the JSON schema of the declaration format, pretty-printed.
    pub fn json_schema() -> Result<String, Error> {
        let schema = schemars::schema_for!(FanoutSpec);
        serde_json::to_string_pretty(&schema).map_err(|e| Error::Schema {
            details: e.to_string(),
        })
    }
}

/// Policies supported for fanouts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FanoutPolicies {
    /// Number of buffered chunks at which a branch stops asking for more.
    ///
    /// Zero is allowed: such a branch only asks while its reader is waiting.
    #[serde(default = "default_branch_high_water_mark")]
    pub branch_high_water_mark: usize,
    /// Number of chunks a pipe writer may buffer ahead of the read loop.
    #[serde(default = "default_upstream_pipe_capacity")]
    pub upstream_pipe_capacity: usize,
}

impl Default for FanoutPolicies {
    fn default() -> Self {
        Self {
            branch_high_water_mark: default_branch_high_water_mark(),
            upstream_pipe_capacity: default_upstream_pipe_capacity(),
        }
    }
}

impl FanoutPolicies {
    /// Returns validation errors for this policy set.
    #[must_use]
    pub fn validation_errors(&self, path_prefix: &str) -> Vec<String> {
        let mut errors = Vec::new();
        if self.upstream_pipe_capacity == 0 {
            errors.push(format!(
                "{path_prefix}.upstream_pipe_capacity must be greater than 0"
            ));
        }
        errors
    }
}

const fn default_branch_high_water_mark() -> usize {
    1
}

const fn default_upstream_pipe_capacity() -> usize {
    1
}
