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

//! Index trait - the transactional contract shared by all implementations
//!

use crate::core::{IndexId, IndexMethod, Result, Row, TxnId};
use crate::storage::index::{IndexKey, Tuple};
use crate::storage::traits::scan::TableScan;

/// Index represents a transactional secondary index over one table
///
/// Every operation is keyed by the calling transaction's id and sees the
/// committed base state overlaid with that transaction's own validated
/// changes. Writes are staged, validated by [`barrier`](Index::barrier), and
/// only reach the shared base state when [`commit`](Index::commit) replays
/// the transaction's log.
///
/// # Per-transaction lifecycle
///
/// ```text
/// Absent -> ReadOnly (first reference) -> Writing (first write)
///        -> Ended (barrier + commit, or rollback) -> Absent
/// ```
///
/// `begin` is idempotent and implied by every other operation, so callers
/// never have to drive the lifecycle explicitly.
///
/// Note: all methods use `&self` with interior mutability for thread-safe
/// concurrent access across transactions.
pub trait Index: Send + Sync + std::fmt::Debug {
    /// Returns the catalog id of the index
    fn id(&self) -> IndexId;

    /// Returns the unique name of the index
    fn name(&self) -> &str;

    /// Returns the name of the schema the indexed table belongs to
    fn schema_name(&self) -> &str;

    /// Returns the name of the table this index belongs to
    fn table_name(&self) -> &str;

    /// Returns the indexed column names, in key field order
    fn column_names(&self) -> &[String];

    /// Returns the target (primary-key) column names a match resolves to
    fn target_column_names(&self) -> &[String];

    /// Returns the physical index method
    fn method(&self) -> IndexMethod;

    /// Returns true if this index enforces a uniqueness constraint
    fn is_unique(&self) -> bool;

    /// Returns true if this index survives restarts (no provider today)
    fn is_persistent(&self) -> bool;

    /// Returns true once the index has been populated from its source table
    fn is_initialized(&self) -> bool;

    /// Registers the transaction with this index
    ///
    /// Idempotent; implied by every read and write operation. The pairing is
    /// recorded so registry-level `barrier`/`commit`/`rollback` reach this
    /// index.
    fn begin(&self, xid: TxnId);

    /// Stages an insert of `key -> tuple` under the transaction
    ///
    /// No visible effect until `barrier` folds it into the transaction's
    /// overlay and `commit` replays it against the base state. Uniqueness is
    /// checked at `barrier`, not here.
    fn insert(&self, xid: TxnId, key: IndexKey, tuple: Tuple) -> Result<()>;

    /// Stages a batch of inserts as one logical write
    ///
    /// Unique indexes pre-validate the whole batch (intra-batch duplicates
    /// and collisions with already-visible keys) before staging any row,
    /// producing an early failure without tainting the staging log.
    fn insert_all(&self, xid: TxnId, entries: Vec<(IndexKey, Tuple)>) -> Result<()>;

    /// Stages a delete of every entry stored under `key`
    fn delete(&self, xid: TxnId, key: IndexKey) -> Result<()>;

    /// Stages a delete of exactly `key -> tuple`
    fn delete_primary(&self, xid: TxnId, key: IndexKey, tuple: Tuple) -> Result<()>;

    /// Stages a batch of key-wide deletes as one logical write
    fn delete_all(&self, xid: TxnId, keys: Vec<IndexKey>) -> Result<()>;

    /// Stages a batch of exact `key -> tuple` deletes as one logical write
    fn delete_all_primary(&self, xid: TxnId, entries: Vec<(IndexKey, Tuple)>) -> Result<()>;

    /// Returns whether `key` is visible to the transaction
    ///
    /// Layers the transaction's overlay (including tombstones) over the
    /// committed base state. A key whose arity does not match the indexed
    /// columns is simply absent; reads never raise.
    fn contains(&self, xid: TxnId, key: &IndexKey) -> bool;

    /// Returns true if any of `keys` is visible to the transaction
    ///
    /// Short-circuits on the first match.
    fn contains_any(&self, xid: TxnId, keys: &[IndexKey]) -> bool;

    /// Returns true if all of `keys` are visible to the transaction
    ///
    /// Short-circuits on the first miss.
    fn contains_all(&self, xid: TxnId, keys: &[IndexKey]) -> bool;

    /// Validates and folds the transaction's staged operations into its
    /// private overlay
    ///
    /// Staged operations are processed in call order; unique indexes raise a
    /// constraint violation on the first insert whose key collides with an
    /// already-visible entry. The staging log is cleared either way; on
    /// violation the transaction is tainted and expected to roll back. Must
    /// be called before `commit`.
    fn barrier(&self, xid: TxnId) -> Result<()>;

    /// Replays the transaction's commit log against the shared base state,
    /// then discards all per-transaction state
    ///
    /// # Panics
    ///
    /// Panics if the transaction still has staged operations, since that
    /// means the caller skipped `barrier` and the log was never validated.
    fn commit(&self, xid: TxnId) -> Result<()>;

    /// Discards all per-transaction state with no effect on the base state
    fn rollback(&self, xid: TxnId);

    /// Materializes the transaction's effective view as a row-set
    ///
    /// Each row is the key fields followed by the target fields (the key
    /// fields twice when the index is its table's primary-key index). Row
    /// order is unspecified.
    fn get_as_values(&self, xid: TxnId) -> Vec<Row>;

    /// Materializes the transaction's effective view of a single key
    fn get_key_as_values(&self, xid: TxnId, key: &IndexKey) -> Vec<Row>;

    /// Returns the number of keys visible to the transaction
    fn size(&self, xid: TxnId) -> usize;

    /// Clears all state and repopulates the base state from a full scan of
    /// the source table
    ///
    /// This is the subsystem's only recovery mechanism. Runs outside any
    /// transaction. If the scan fails or produces malformed rows, the index
    /// is left uninitialized rather than silently partial.
    fn rebuild(&self, source: &mut dyn TableScan) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify the contract stays object-safe; the registry stores indexes as
    // Arc<dyn Index>.
    fn _assert_object_safe(_: &dyn Index) {}
}
