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

//! Non-unique copy-on-write hash index
//!
//! One key maps to a set of primary-key tuples; no uniqueness constraint, so
//! `barrier` never fails here. The per-transaction overlay is not a delta: the
//! first time a transaction touches a key, the committed set for that key is
//! cloned in full (or an empty set seeded) and then mutated in place. A
//! cleared set is how this variant expresses "deleted", where
//! UniqueHashIndex writes a tombstone.
//!
//! Every `begin` allocates all per-transaction structures eagerly; there is
//! no read-only fast path in this variant, unlike UniqueHashIndex.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{Error, IndexId, IndexMethod, Result, Row, TxnId};
use crate::storage::index::deferred::{BaseOps, DeferredUpdate};
use crate::storage::index::key::{IndexKey, Tuple};
use crate::storage::index::registry::{IndexDef, TxnTracker};
use crate::storage::traits::{Index, TableScan};

/// Committed base state: key -> set of primary-key tuples
#[derive(Debug, Default)]
struct MultiBase {
    map: FxHashMap<IndexKey, FxHashSet<Tuple>>,
}

impl BaseOps for MultiBase {
    fn raw_insert(&mut self, key: IndexKey, tuple: Tuple) {
        self.map.entry(key).or_default().insert(tuple);
    }

    fn raw_delete(&mut self, key: &IndexKey) {
        self.map.remove(key);
    }

    fn raw_delete_primary(&mut self, key: &IndexKey, tuple: &Tuple) {
        if let Some(set) = self.map.get_mut(key) {
            set.remove(tuple);
            if set.is_empty() {
                self.map.remove(key);
            }
        }
    }
}

/// Per-transaction overlay: full replacement copies of touched key sets
type Overlay = FxHashMap<IndexKey, FxHashSet<Tuple>>;

/// Staged write: (key, tuple, is_insert). A `None` tuple with
/// `is_insert == false` is a key-wide delete.
type StagedOp = (IndexKey, Option<Tuple>, bool);

#[derive(Debug, Default)]
struct MultiInner {
    base: MultiBase,
    overlay: FxHashMap<TxnId, Overlay>,
    staged: FxHashMap<TxnId, Vec<StagedOp>>,
    commit_log: FxHashMap<TxnId, Vec<DeferredUpdate>>,
    initialized: bool,
}

impl MultiInner {
    fn purge_txn(&mut self, xid: TxnId) {
        self.overlay.remove(&xid);
        self.staged.remove(&xid);
        self.commit_log.remove(&xid);
    }

    fn contains_for(&self, xid: TxnId, key: &IndexKey) -> bool {
        if let Some(overlay) = self.overlay.get(&xid) {
            if let Some(set) = overlay.get(key) {
                return !set.is_empty();
            }
        }
        self.base.map.get(key).is_some_and(|set| !set.is_empty())
    }
}

/// Non-unique hash index: one key, a set of primary-key tuples
pub struct MultiHashIndex {
    id: IndexId,
    name: String,
    schema_name: String,
    table_name: String,
    column_names: Vec<String>,
    target_column_names: Vec<String>,
    tracker: Arc<TxnTracker>,
    inner: RwLock<MultiInner>,
}

impl std::fmt::Debug for MultiHashIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiHashIndex")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("schema_name", &self.schema_name)
            .field("table_name", &self.table_name)
            .field("column_names", &self.column_names)
            .field("target_column_names", &self.target_column_names)
            .finish_non_exhaustive()
    }
}

impl MultiHashIndex {
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
            inner: RwLock::new(MultiInner::default()),
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

    fn make_row(key: &IndexKey, tuple: &Tuple) -> Row {
        key.values().iter().cloned().chain(tuple.iter().cloned()).collect()
    }

    /// Stage one operation and append its replay record
    fn stage(&self, xid: TxnId, op: StagedOp, update: DeferredUpdate) {
        self.begin(xid);
        let mut inner = self.inner.write();
        if let Some(staged) = inner.staged.get_mut(&xid) {
            staged.push(op);
        }
        if let Some(log) = inner.commit_log.get_mut(&xid) {
            log.push(update);
        }
    }
}

impl Index for MultiHashIndex {
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
        false
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
            if inner.staged.contains_key(&xid) {
                return;
            }
        }
        let registered = {
            let mut inner = self.inner.write();
            if inner.staged.contains_key(&xid) {
                false
            } else {
                // All per-transaction structures are allocated up front here,
                // reads included
                inner.overlay.insert(xid, Overlay::default());
                inner.staged.insert(xid, Vec::new());
                inner.commit_log.insert(xid, Vec::new());
                true
            }
        };
        if registered {
            self.tracker.register(xid, self.id);
        }
    }

    fn insert(&self, xid: TxnId, key: IndexKey, tuple: Tuple) -> Result<()> {
        self.check_key(&key)?;
        self.check_tuple(&tuple)?;
        self.stage(
            xid,
            (key.clone(), Some(tuple.clone()), true),
            DeferredUpdate::Insert {
                rows: vec![(key, tuple)],
            },
        );
        Ok(())
    }

    fn insert_all(&self, xid: TxnId, entries: Vec<(IndexKey, Tuple)>) -> Result<()> {
        for (key, tuple) in &entries {
            self.check_key(key)?;
            self.check_tuple(tuple)?;
        }
        self.begin(xid);

        let mut inner = self.inner.write();
        if let Some(staged) = inner.staged.get_mut(&xid) {
            staged.reserve(entries.len());
            for (key, tuple) in &entries {
                staged.push((key.clone(), Some(tuple.clone()), true));
            }
        }
        if let Some(log) = inner.commit_log.get_mut(&xid) {
            log.push(DeferredUpdate::Insert { rows: entries });
        }
        Ok(())
    }

    fn delete(&self, xid: TxnId, key: IndexKey) -> Result<()> {
        self.check_key(&key)?;
        self.stage(
            xid,
            (key.clone(), None, false),
            DeferredUpdate::Delete { keys: vec![key] },
        );
        Ok(())
    }

    fn delete_primary(&self, xid: TxnId, key: IndexKey, tuple: Tuple) -> Result<()> {
        self.check_key(&key)?;
        self.check_tuple(&tuple)?;
        self.stage(
            xid,
            (key.clone(), Some(tuple.clone()), false),
            DeferredUpdate::DeletePrimary {
                rows: vec![(key, tuple)],
            },
        );
        Ok(())
    }

    fn delete_all(&self, xid: TxnId, keys: Vec<IndexKey>) -> Result<()> {
        for key in &keys {
            self.check_key(key)?;
        }
        self.begin(xid);

        let mut inner = self.inner.write();
        if let Some(staged) = inner.staged.get_mut(&xid) {
            staged.reserve(keys.len());
            for key in &keys {
                staged.push((key.clone(), None, false));
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
        if let Some(staged) = inner.staged.get_mut(&xid) {
            staged.reserve(entries.len());
            for (key, tuple) in &entries {
                staged.push((key.clone(), Some(tuple.clone()), false));
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
        for (key, tuple, is_insert) in ops {
            // First touch of a key copies its committed set in full
            let set = overlay
                .entry(key)
                .or_insert_with_key(|k| inner.base.map.get(k).cloned().unwrap_or_default());
            if is_insert {
                if let Some(tuple) = tuple {
                    set.insert(tuple);
                }
            } else {
                match tuple {
                    // Key-wide delete clears the whole set
                    None => set.clear(),
                    Some(tuple) => {
                        set.remove(&tuple);
                    }
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
                for (key, set) in &inner.base.map {
                    if !overlay.contains_key(key) {
                        for tuple in set {
                            rows.push(Self::make_row(key, tuple));
                        }
                    }
                }
                for (key, set) in overlay {
                    for tuple in set {
                        rows.push(Self::make_row(key, tuple));
                    }
                }
            }
            None => {
                for (key, set) in &inner.base.map {
                    for tuple in set {
                        rows.push(Self::make_row(key, tuple));
                    }
                }
            }
        }
        rows
    }

    fn get_key_as_values(&self, xid: TxnId, key: &IndexKey) -> Vec<Row> {
        self.begin(xid);
        let inner = self.inner.read();
        let set = match inner.overlay.get(&xid).and_then(|ov| ov.get(key)) {
            Some(set) => Some(set),
            None => inner.base.map.get(key),
        };
        match set {
            Some(set) => set.iter().map(|tuple| Self::make_row(key, tuple)).collect(),
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
                    .iter()
                    .filter(|(key, set)| !overlay.contains_key(key) && !set.is_empty())
                    .count();
                let touched = overlay.values().filter(|set| !set.is_empty()).count();
                unshadowed + touched
            }
            None => inner.base.map.len(),
        }
    }

    fn rebuild(&self, source: &mut dyn TableScan) -> Result<()> {
        let rows = source
            .rows()
            .map_err(|e| Error::rebuild_failed(&self.name, e.to_string()))?;

        let key_width = self.column_names.len();
        let width = key_width + self.target_column_names.len();

        let mut inner = self.inner.write();
        *inner = MultiInner::default();
        for mut row in rows {
            if row.len() != width {
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
