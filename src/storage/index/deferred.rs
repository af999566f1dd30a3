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

//! Deferred update records
//!
//! Each write call on an index appends one [`DeferredUpdate`] to the calling
//! transaction's commit log. At commit the log is replayed verbatim, in call
//! order, against the base state - this replay is what actually mutates the
//! committed index content, independent of the transaction's overlay. The
//! records are never inspected or mutated after construction.

use super::key::{IndexKey, Tuple};

/// Non-transactional mutators over an index's base state
///
/// The raw counterpart of the public write operations: no staging, no
/// validation, no overlay. Only `rebuild` and [`DeferredUpdate::execute`]
/// may call these, which is why the trait is crate-private.
pub(crate) trait BaseOps {
    /// Inserts `key -> tuple` directly into the base state
    fn raw_insert(&mut self, key: IndexKey, tuple: Tuple);

    /// Removes everything stored under `key`
    fn raw_delete(&mut self, key: &IndexKey);

    /// Removes exactly `key -> tuple`, leaving other tuples under the key
    fn raw_delete_primary(&mut self, key: &IndexKey, tuple: &Tuple);
}

/// An immutable, replayable record of one batch insert or batch delete
#[derive(Debug, Clone)]
pub(crate) enum DeferredUpdate {
    /// Insert every `key -> tuple` pair
    Insert { rows: Vec<(IndexKey, Tuple)> },

    /// Delete everything stored under each key
    Delete { keys: Vec<IndexKey> },

    /// Delete exactly each `key -> tuple` pair
    DeletePrimary { rows: Vec<(IndexKey, Tuple)> },
}

impl DeferredUpdate {
    /// Replays this record against a base state
    pub(crate) fn execute(&self, base: &mut dyn BaseOps) {
        match self {
            DeferredUpdate::Insert { rows } => {
                for (key, tuple) in rows {
                    base.raw_insert(key.clone(), tuple.clone());
                }
            }
            DeferredUpdate::Delete { keys } => {
                for key in keys {
                    base.raw_delete(key);
                }
            }
            DeferredUpdate::DeletePrimary { rows } => {
                for (key, tuple) in rows {
                    base.raw_delete_primary(key, tuple);
                }
            }
        }
    }
}
