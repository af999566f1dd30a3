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

//! Unique copy-on-write hash index
//!
//! One key maps to at most one primary-key tuple. Per-transaction state is a
//! tombstone overlay: a key the transaction deleted is recorded as an
//! explicit "present but null" entry, distinct from the key being absent.
//!
//! ## Write path
//!
//! - `insert`/`delete` append to the transaction's staging log and commit
//!   log; nothing is validated or visible yet
//! - `barrier` folds the staging log into the overlay in call order and
//!   raises a uniqueness violation when an insert collides with a
//!   non-tombstone overlay entry or with the committed base state
//! - `commit` replays the commit log against the base state without
//!   re-validation; `barrier` must already have proven it conflict-free
//!
//! ## Read-only fast path
//!
//! A transaction that has only read stays in a cheap read-only set; overlay,
//! staging log and commit log are allocated lazily on its first write.
//! MultiHashIndex allocates eagerly instead - a deliberate asymmetry between
//! the two variants.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{Error, IndexId, IndexMethod, Result, Row, TxnId};
use crate::storage::index::deferred::{BaseOps, DeferredUpdate};
use crate::storage::index::key::{IndexKey, Tuple};
use crate::storage::index::registry::{IndexDef, TxnTracker};
use crate::storage::traits::{Index, TableScan};

/// Committed base state: key -> primary-key tuple
#[derive(Debug, Default)]
struct UniqueBase {
    map: FxHashMap<IndexKey, Tuple>,
}

impl UniqueBase {
    fn contains(&self, key: &IndexKey) -> bool {
        self.map.contains_key(key)
    }
}

impl BaseOps for UniqueBase {
    fn raw_insert(&mut self, key: IndexKey, tuple: Tuple) {
        self.map.insert(key, tuple);
    }

    fn raw_delete(&mut self, key: &IndexKey) {
        self.map.remove(key);
    }

    fn raw_delete_primary(&mut self, key: &IndexKey, tuple: &Tuple) {
        if self.map.get(key) == Some(tuple) {
            self.map.remove(key);
        }
    }
}

/// Per-transaction overlay entry: `Some(tuple)` is a validated insert,
/// `None` is a tombstone.
type Overlay = FxHashMap<IndexKey, Option<Tuple>>;

#[derive(Debug, Default)]
struct UniqueInner {
    base: UniqueBase,
    /// Validated per-transaction views, keyed by transaction id
    overlay: FxHashMap<TxnId, Overlay>,
    /// Unvalidated staged writes in call order; `None` value = delete marker
    staged: FxHashMap<TxnId, Vec<(IndexKey, Option<Tuple>)>>,
    /// Replay log, one record per write call
    commit_log: FxHashMap<TxnId, Vec<DeferredUpdate>>,
    /// Transactions that have referenced the index but not written to it
    read_only: FxHashSet<TxnId>,
    initialized: bool,
}

impl UniqueInner {
    /// Promote the transaction to writing, allocating its structures
    fn ensure_writing(&mut self, xid: TxnId) {
        if self.overlay.contains_key(&xid) {
            return;
        }
        self.read_only.remove(&xid);
        self.overlay.insert(xid, Overlay::default());
        self.staged.insert(xid, Vec::new());
        self.commit_log.insert(xid, Vec::new());
    }

    /// Drop every trace of the transaction; base state untouched
    fn purge_txn(&mut self, xid: TxnId) {
        self.overlay.remove(&xid);
        self.staged.remove(&xid);
        self.commit_log.remove(&xid);
        self.read_only.remove(&xid);
    }

    fn contains_for(&self, xid: TxnId, key: &IndexKey) -> bool {
        if let Some(overlay) = self.overlay.get(&xid) {
            if let Some(entry) = overlay.get(key) {
                return entry.is_some();
            }
        }
        // Read-only transactions (and keys this transaction never touched)
        // answer from the committed base state
        self.base.contains(key)
    }
}

/// Unique hash index: one key, at most one primary-key tuple
pub struct UniqueHashIndex {
    id: IndexId,
    name: String,
    schema_name: String,
    table_name: String,
    column_names: Vec<String>,
    target_column_names: Vec<String>,
    tracker: Arc<TxnTracker>,
    inner: RwLock<UniqueInner>,
}

impl std::fmt::Debug for UniqueHashIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniqueHashIndex")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("schema_name", &self.schema_name)
            .field("table_name", &self.table_name)
            .field("column_names", &self.column_names)
            .field("target_column_names", &self.target_column_names)
            .finish_non_exhaustive()
    }
}

impl UniqueHashIndex {
    /// Create an empty, uninitialized index from its catalog definition
    pub(crate) fn new(def: &IndexDef, tracker: Arc<TxnTracker>) -> Self {
        Self {
            id: def.id,
            name: def.name.clone(),
            schema_name: def.schema.clone(),
            table_name: def.table.clone(),
            column_names: def.columns.clone(),
            target_column_names: def.target_columns.clone(),
            tracker,
            inner: RwLock::new(UniqueInner::default()),
        }
    }

    fn check_key(&self, key: &IndexKey) -> Result<()> {
        if key.arity() != self.column_names.len() {
            return Err(Error::key_arity(
                &self.name,
                self.column_names.len(),
                key.arity(),
            ));
        }
        Ok(())
    }

    fn check_tuple(&self, tuple: &Tuple) -> Result<()> {
        if tuple.len() != self.target_column_names.len() {
            return Err(Error::tuple_arity(
                &self.name,
                self.target_column_names.len(),
                tuple.len(),
            ));
        }
        Ok(())
    }

    fn violation(&self, key: &IndexKey) -> Error {
        Error::unique_constraint(&self.name, self.column_names.join(", "), key.to_string())
    }

    fn make_row(key: &IndexKey, tuple: &Tuple) -> Row {
        key.values().iter().cloned().chain(tuple.iter().cloned()).collect()
    }
}

impl Index for UniqueHashIndex {
    fn id(&self) -> IndexId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn schema_name(&self) -> &str {
        &self.schema_name
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn column_names(&self) -> &[String] {
        &self.column_names
    }

    fn target_column_names(&self) -> &[String] {
        &self.target_column_names
    }

    fn method(&self) -> IndexMethod {
        IndexMethod::Hash
    }

    fn is_unique(&self) -> bool {
        true
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn is_initialized(&self) -> bool {
        self.inner.read().initialized
    }

    fn begin(&self, xid: TxnId) {
        {
            let inner = self.inner.read();
            if inner.read_only.contains(&xid) || inner.overlay.contains_key(&xid) {
                return;
            }
        }
        {
            let mut inner = self.inner.write();
            if inner.read_only.contains(&xid) || inner.overlay.contains_key(&xid) {
                return;
            }
            inner.read_only.insert(xid);
        }
        self.tracker.register(xid, self.id);
    }

    fn insert(&self, xid: TxnId, key: IndexKey, tuple: Tuple) -> Result<()> {
        self.check_key(&key)?;
        self.check_tuple(&tuple)?;
        self.begin(xid);

        let mut inner = self.inner.write();
        inner.ensure_writing(xid);
        if let Some(staged) = inner.staged.get_mut(&xid) {
            staged.push((key.clone(), Some(tuple.clone())));
        }
        if let Some(log) = inner.commit_log.get_mut(&xid) {
            log.push(DeferredUpdate::Insert {
                rows: vec![(key, tuple)],
            });
        }
        Ok(())
    }

    fn insert_all(&self, xid: TxnId, entries: Vec<(IndexKey, Tuple)>) -> Result<()> {
        for (key, tuple) in &entries {
            self.check_key(key)?;
            self.check_tuple(tuple)?;
        }
        self.begin(xid);

        // Pre-validate the whole batch before staging anything: duplicates
        // within the batch and collisions with already-visible keys fail
        // early, ahead of the authoritative barrier-time check.
        {
            let inner = self.inner.read();
            let mut seen: FxHashSet<&IndexKey> = FxHashSet::default();
            seen.reserve(entries.len());
            for (key, _) in &entries {
                if !seen.insert(key) {
                    return Err(self.violation(key));
                }
                if inner.contains_for(xid, key) {
                    return Err(self.violation(key));
                }
            }
        }

        let mut inner = self.inner.write();
        inner.ensure_writing(xid);
        if let Some(staged) = inner.staged.get_mut(&xid) {
            staged.reserve(entries.len());
            for (key, tuple) in &entries {
                staged.push((key.clone(), Some(tuple.clone())));
            }
        }
        if let Some(log) = inner.commit_log.get_mut(&xid) {
            log.push(DeferredUpdate::Insert { rows: entries });
        }
        Ok(())
    }

    fn delete(&self, xid: TxnId, key: IndexKey) -> Result<()> {
        self.check_key(&key)?;
        self.begin(xid);

        let mut inner = self.inner.write();
        inner.ensure_writing(xid);
        if let Some(staged) = inner.staged.get_mut(&xid) {
            staged.push((key.clone(), None));
        }
        if let Some(log) = inner.commit_log.get_mut(&xid) {
            log.push(DeferredUpdate::Delete { keys: vec![key] });
        }
        Ok(())
    }

    fn delete_primary(&self, xid: TxnId, key: IndexKey, tuple: Tuple) -> Result<()> {
        self.check_key(&key)?;
        self.check_tuple(&tuple)?;
        self.begin(xid);

        let mut inner = self.inner.write();
        inner.ensure_writing(xid);
        if let Some(staged) = inner.staged.get_mut(&xid) {
            staged.push((key.clone(), None));
        }
        if let Some(log) = inner.commit_log.get_mut(&xid) {
            log.push(DeferredUpdate::DeletePrimary {
                rows: vec![(key, tuple)],
            });
        }
        Ok(())
    }

    fn delete_all(&self, xid: TxnId, keys: Vec<IndexKey>) -> Result<()> {
        for key in &keys {
            self.check_key(key)?;
        }
        self.begin(xid);

        let mut inner = self.inner.write();
        inner.ensure_writing(xid);
        if let Some(staged) = inner.staged.get_mut(&xid) {
            staged.reserve(keys.len());
            for key in &keys {
                staged.push((key.clone(), None));
            }
        }
        if let Some(log) = inner.commit_log.get_mut(&xid) {
            log.push(DeferredUpdate::Delete { keys });
        }
        Ok(())
    }

    fn delete_all_primary(&self, xid: TxnId, entries: Vec<(IndexKey, Tuple)>) -> Result<()> {
        for (key, tuple) in &entries {
            self.check_key(key)?;
            self.check_tuple(tuple)?;
        }
        self.begin(xid);

        let mut inner = self.inner.write();
        inner.ensure_writing(xid);
        if let Some(staged) = inner.staged.get_mut(&xid) {
            staged.reserve(entries.len());
            for (key, _) in &entries {
                staged.push((key.clone(), None));
            }
        }
        if let Some(log) = inner.commit_log.get_mut(&xid) {
            log.push(DeferredUpdate::DeletePrimary { rows: entries });
        }
        Ok(())
    }

    fn contains(&self, xid: TxnId, key: &IndexKey) -> bool {
        self.begin(xid);
        self.inner.read().contains_for(xid, key)
    }

    fn contains_any(&self, xid: TxnId, keys: &[IndexKey]) -> bool {
        self.begin(xid);
        let inner = self.inner.read();
        keys.iter().any(|key| inner.contains_for(xid, key))
    }

    fn contains_all(&self, xid: TxnId, keys: &[IndexKey]) -> bool {
        self.begin(xid);
        let inner = self.inner.read();
        keys.iter().all(|key| inner.contains_for(xid, key))
    }

    fn barrier(&self, xid: TxnId) -> Result<()> {
        self.begin(xid);
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let Some(staged) = inner.staged.get_mut(&xid) else {
            return Ok(());
        };
        let ops = std::mem::take(staged);
        if ops.is_empty() {
            return Ok(());
        }

        let overlay = inner.overlay.entry(xid).or_default();
        for (key, value) in ops {
            match value {
                // Delete marker: last write for the key wins within one call
                None => {
                    overlay.insert(key, None);
                }
                Some(tuple) => {
                    let occupied = matches!(overlay.get(&key), Some(Some(_)));
                    if occupied || inner.base.contains(&key) {
                        // Staging log is already cleared; the transaction is
                        // tainted and expected to roll back
                        return Err(self.violation(&key));
                    }
                    overlay.insert(key, Some(tuple));
                }
            }
        }
        Ok(())
    }

    fn commit(&self, xid: TxnId) -> Result<()> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let staged = inner.staged.get(&xid).map_or(0, |s| s.len());
        assert!(
            staged == 0,
            "index '{}': commit of transaction {} with {} staged operations not validated by barrier",
            self.name,
            xid,
            staged
        );

        if let Some(log) = inner.commit_log.remove(&xid) {
            for update in &log {
                update.execute(&mut inner.base);
            }
        }
        inner.purge_txn(xid);
        Ok(())
    }

    fn rollback(&self, xid: TxnId) {
        self.inner.write().purge_txn(xid);
    }

    fn get_as_values(&self, xid: TxnId) -> Vec<Row> {
        self.begin(xid);
        let inner = self.inner.read();
        let mut rows = Vec::with_capacity(inner.base.map.len());
        match inner.overlay.get(&xid) {
            Some(overlay) => {
                for (key, tuple) in &inner.base.map {
                    if !overlay.contains_key(key) {
                        rows.push(Self::make_row(key, tuple));
                    }
                }
                for (key, entry) in overlay {
                    if let Some(tuple) = entry {
                        rows.push(Self::make_row(key, tuple));
                    }
                }
            }
            None => {
                for (key, tuple) in &inner.base.map {
                    rows.push(Self::make_row(key, tuple));
                }
            }
        }
        rows
    }

    fn get_key_as_values(&self, xid: TxnId, key: &IndexKey) -> Vec<Row> {
        self.begin(xid);
        let inner = self.inner.read();
        if let Some(overlay) = inner.overlay.get(&xid) {
            match overlay.get(key) {
                Some(Some(tuple)) => return vec![Self::make_row(key, tuple)],
                Some(None) => return Vec::new(),
                None => {}
            }
        }
        match inner.base.map.get(key) {
            Some(tuple) => vec![Self::make_row(key, tuple)],
            None => Vec::new(),
        }
    }

    fn size(&self, xid: TxnId) -> usize {
        self.begin(xid);
        let inner = self.inner.read();
        match inner.overlay.get(&xid) {
            Some(overlay) => {
                let unshadowed = inner
                    .base
                    .map
                    .keys()
                    .filter(|key| !overlay.contains_key(key))
                    .count();
                let added = overlay.values().filter(|entry| entry.is_some()).count();
                unshadowed + added
            }
            None => inner.base.map.len(),
        }
    }

    fn rebuild(&self, source: &mut dyn TableScan) -> Result<()> {
        // Fetch before touching any state, so a failing scan leaves the
        // index exactly as it was
        let rows = source
            .rows()
            .map_err(|e| Error::rebuild_failed(&self.name, e.to_string()))?;

        let key_width = self.column_names.len();
        let width = key_width + self.target_column_names.len();

        let mut inner = self.inner.write();
        *inner = UniqueInner::default();
        for mut row in rows {
            if row.len() != width {
                // Cleared but not initialized: never a silent partial state
                return Err(Error::rebuild_failed(
                    &self.name,
                    format!("scan row arity {}, expected {}", row.len(), width),
                ));
            }
            let tuple = row.split_off(key_width);
            inner.base.raw_insert(IndexKey::new(row), tuple);
        }
        inner.initialized = true;
        Ok(())
    }
}
