// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors produced while loading fanout declarations.

use std::path::PathBuf;

/// Errors produced while reading, parsing, or validating a [`FanoutSpec`](crate::FanoutSpec).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The declaration file could not be read.
    #[error("failed to read fanout config `{path}`: {details}")]
    FileRead {
        /// Path that failed to load.
        path: PathBuf,
        /// I/O error details.
        details: String,
    },
    /// The declaration is not valid YAML or does not match the expected shape.
    #[error("failed to parse fanout config: {details}")]
    Parse {
        /// Deserializer error details.
        details: String,
    },
    /// The declaration parsed but violates one or more policy constraints.
    #[error("invalid fanout config: {}", .errors.join("; "))]
    InvalidConfig {
        /// One message per violated constraint.
        errors: Vec<String>,
    },
    /// The JSON schema of the declaration format could not be rendered.
    #[error("failed to render fanout config schema: {details}")]
    Schema {
        /// Serializer error details.
        details: String,
    },
}
