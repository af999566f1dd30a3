// Copyright 2026 Manifold Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
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

//! Error types for manifold-index
//!
//! This module defines all error types used throughout the index subsystem.

use thiserror::Error;

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for index operations
///
/// Covers both sentinel errors and structured errors with context.
/// Protocol-misuse faults (committing past an unvalidated staging log) are
/// deliberately not represented here: they indicate a defective caller, not a
/// failed operation, and abort via panic instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Index errors
    // =========================================================================
    /// Index not found in the registry
    #[error("index '{0}' not found")]
    IndexNotFound(String),

    /// Index id or name already registered
    #[error("index '{0}' already exists")]
    IndexAlreadyExists(String),

    /// Index has not been populated from its source table yet
    #[error("index '{0}' is not initialized")]
    IndexNotInitialized(String),

    // =========================================================================
    // Constraint errors
    // =========================================================================
    /// Unique constraint violation
    #[error("unique constraint failed for index {index} on column {column} with value {value}")]
    UniqueConstraint {
        index: String,
        column: String,
        value: String,
    },

    // =========================================================================
    // Key / tuple errors
    // =========================================================================
    /// Key field count does not match the indexed column list
    #[error("index {index}: key arity mismatch, expected {expected}, got {got}")]
    KeyArityMismatch {
        index: String,
        expected: usize,
        got: usize,
    },

    /// Tuple field count does not match the target column list
    #[error("index {index}: tuple arity mismatch, expected {expected}, got {got}")]
    TupleArityMismatch {
        index: String,
        expected: usize,
        got: usize,
    },

    // =========================================================================
    // Rebuild errors
    // =========================================================================
    /// Source-table scan failed or produced malformed rows during rebuild
    #[error("rebuild of index {index} failed: {message}")]
    RebuildFailed { index: String, message: String },

    // =========================================================================
    // Other errors
    // =========================================================================
    /// Requested index method / flag combination has no provider
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Internal error for unexpected conditions
    #[error("{message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new UniqueConstraint error
    pub fn unique_constraint(
        index: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Error::UniqueConstraint {
            index: index.into(),
            column: column.into(),
            value: value.into(),
        }
    }

    /// Create a new KeyArityMismatch error
    pub fn key_arity(index: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::KeyArityMismatch {
            index: index.into(),
            expected,
            got,
        }
    }

    /// Create a new TupleArityMismatch error
    pub fn tuple_arity(index: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::TupleArityMismatch {
            index: index.into(),
            expected,
            got,
        }
    }

    /// Create a new RebuildFailed error
    pub fn rebuild_failed(index: impl Into<String>, message: impl Into<String>) -> Self {
        Error::RebuildFailed {
            index: index.into(),
            message: message.into(),
        }
    }

    /// Create a new NotSupported error
    pub fn not_supported(message: impl Into<String>) -> Self {
        Error::NotSupported(message.into())
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::IndexNotFound(_))
    }

    /// Check if this is a constraint violation error
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Error::UniqueConstraint { .. })
    }
}
