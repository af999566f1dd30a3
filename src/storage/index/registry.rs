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

//! Index registry
//!
//! One registry instance owns every index in the process. It is constructed
//! before any index or transaction exists and handed by shared reference to
//! every call site; there is no global singleton. The registry selects a
//! concrete implementation for new indexes through its factory chain, tracks
//! which indexes each open transaction has touched, and fans
//! `barrier`/`commit`/`rollback` out to all of them.
//!
//! `commit` re-runs `barrier` on every touched index before issuing `commit`
//! to any of them, so a lingering constraint violation surfaces while the
//! whole transaction can still roll back. This is all-validate-then-all-
//! commit ordering, not a true atomic two-phase commit across indexes.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::core::{Error, IndexId, IndexMethod, Result, TxnId};
use crate::storage::index::multi_hash::MultiHashIndex;
use crate::storage::index::unique_hash::UniqueHashIndex;
use crate::storage::traits::{Index, ScanProvider, TableScan};

/// Catalog definition of an index
///
/// Produced by the DDL layer at creation time or by the catalog during
/// startup recovery. `target_columns` name the primary-key columns a match
/// resolves to; when `columns == target_columns` the index is its table's
/// primary-key index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub id: IndexId,
    pub name: String,
    pub schema: String,
    pub table: String,
    pub columns: Vec<String>,
    pub target_columns: Vec<String>,
    pub method: IndexMethod,
    pub unique: bool,
    pub persistent: bool,
}

/// Records which indexes each open transaction has touched
///
/// Shared between the registry and every index it creates: `Index::begin`
/// registers the (transaction, index) pairing here, and the registry reads
/// it back when fanning out lifecycle calls. Registration order is
/// preserved; re-registration of the same pairing is a no-op.
pub struct TxnTracker {
    open: Mutex<FxHashMap<TxnId, SmallVec<[IndexId; 4]>>>,
}

impl TxnTracker {
    pub(crate) fn new() -> Self {
        Self {
            open: Mutex::new(FxHashMap::default()),
        }
    }

    /// Record that `xid` touched `index`; idempotent per pairing
    pub fn register(&self, xid: TxnId, index: IndexId) {
        let mut open = self.open.lock();
        let touched = open.entry(xid).or_default();
        if !touched.contains(&index) {
            touched.push(index);
        }
    }

    /// Indexes touched by `xid`, in registration order, mapping retained
    pub(crate) fn touched(&self, xid: TxnId) -> Vec<IndexId> {
        self.open
            .lock()
            .get(&xid)
            .map(|ids| ids.to_vec())
            .unwrap_or_default()
    }

    /// Indexes touched by `xid`, removing the mapping
    pub(crate) fn take(&self, xid: TxnId) -> Vec<IndexId> {
        self.open
            .lock()
            .remove(&xid)
            .map(|ids| ids.to_vec())
            .unwrap_or_default()
    }

    /// Number of transactions with a recorded index set
    pub fn open_count(&self) -> usize {
        self.open.lock().len()
    }
}

/// Builds a concrete index implementation for definitions it can provide
pub trait IndexFactory: Send + Sync {
    /// Whether this factory can provide the requested combination
    fn can_provide(&self, method: IndexMethod, unique: bool, persistent: bool) -> bool;

    /// Build an empty, uninitialized index for `def`
    fn create(&self, def: &IndexDef, tracker: Arc<TxnTracker>) -> Arc<dyn Index>;
}

/// Provides in-memory hash indexes; persistence is not supported
pub struct HashIndexFactory;

impl IndexFactory for HashIndexFactory {
    fn can_provide(&self, method: IndexMethod, _unique: bool, persistent: bool) -> bool {
        method == IndexMethod::Hash && !persistent
    }

    fn create(&self, def: &IndexDef, tracker: Arc<TxnTracker>) -> Arc<dyn Index> {
        if def.unique {
            Arc::new(UniqueHashIndex::new(def, tracker))
        } else {
            Arc::new(MultiHashIndex::new(def, tracker))
        }
    }
}

#[derive(Default)]
struct RegistryMaps {
    by_id: FxHashMap<IndexId, Arc<dyn Index>>,
    by_name: FxHashMap<String, IndexId>,
}

/// Process-wide owner of all index instances
pub struct IndexRegistry {
    indexes: RwLock<RegistryMaps>,
    tracker: Arc<TxnTracker>,
    factories: Vec<Box<dyn IndexFactory>>,
}

impl IndexRegistry {
    /// Create a registry with the default hash index factory
    pub fn new() -> Self {
        Self::with_factories(vec![Box::new(HashIndexFactory)])
    }

    /// Create a registry with an explicit factory chain; the first factory
    /// whose `can_provide` matches a definition wins
    pub fn with_factories(factories: Vec<Box<dyn IndexFactory>>) -> Self {
        Self {
            indexes: RwLock::new(RegistryMaps::default()),
            tracker: Arc::new(TxnTracker::new()),
            factories,
        }
    }

    /// The shared transaction tracker, for wiring externally built indexes
    pub fn tracker(&self) -> Arc<TxnTracker> {
        Arc::clone(&self.tracker)
    }

    /// Create, populate and register an index
    ///
    /// Selects the first factory that can provide the definition, rebuilds
    /// the new index from `scan`, and only then registers it, so a failed
    /// rebuild never leaves an unpopulated index reachable.
    pub fn add_index(&self, def: IndexDef, scan: &mut dyn TableScan) -> Result<Arc<dyn Index>> {
        if def.columns.is_empty() || def.target_columns.is_empty() {
            return Err(Error::internal(format!(
                "index '{}' must name at least one column and one target column",
                def.name
            )));
        }
        {
            let maps = self.indexes.read();
            if maps.by_id.contains_key(&def.id) {
                return Err(Error::IndexAlreadyExists(format!("#{}", def.id)));
            }
            if maps.by_name.contains_key(&def.name) {
                return Err(Error::IndexAlreadyExists(def.name.clone()));
            }
        }

        let factory = self
            .factories
            .iter()
            .find(|f| f.can_provide(def.method, def.unique, def.persistent))
            .ok_or_else(|| {
                Error::not_supported(format!(
                    "no index factory for method {} (unique: {}, persistent: {})",
                    def.method, def.unique, def.persistent
                ))
            })?;
        let index = factory.create(&def, Arc::clone(&self.tracker));
        index.rebuild(scan)?;

        let mut maps = self.indexes.write();
        // Re-check under the write lock; a racing registration wins
        if maps.by_id.contains_key(&def.id) {
            return Err(Error::IndexAlreadyExists(format!("#{}", def.id)));
        }
        if maps.by_name.contains_key(&def.name) {
            return Err(Error::IndexAlreadyExists(def.name.clone()));
        }
        maps.by_name.insert(def.name.clone(), def.id);
        maps.by_id.insert(def.id, Arc::clone(&index));
        info!(
            index = %def.name,
            table = %def.table,
            unique = def.unique,
            "registered index"
        );
        Ok(index)
    }

    /// Drop an index by id
    pub fn delete_index(&self, id: IndexId) -> Result<()> {
        let mut maps = self.indexes.write();
        let index = maps
            .by_id
            .remove(&id)
            .ok_or_else(|| Error::IndexNotFound(format!("#{}", id)))?;
        maps.by_name.remove(index.name());
        info!(index = %index.name(), "dropped index");
        Ok(())
    }

    /// Drop an index by name
    pub fn delete_index_by_name(&self, name: &str) -> Result<()> {
        let mut maps = self.indexes.write();
        let id = maps
            .by_name
            .remove(name)
            .ok_or_else(|| Error::IndexNotFound(name.to_string()))?;
        maps.by_id.remove(&id);
        info!(index = %name, "dropped index");
        Ok(())
    }

    /// Look up an index by name, initialized or not
    pub fn get_index_by_name(&self, name: &str) -> Option<Arc<dyn Index>> {
        let maps = self.indexes.read();
        let id = maps.by_name.get(name)?;
        maps.by_id.get(id).cloned()
    }

    /// Look up an index by id, initialized or not
    pub fn get_index_by_id(&self, id: IndexId) -> Option<Arc<dyn Index>> {
        self.indexes.read().by_id.get(&id).cloned()
    }

    /// Find an initialized index matching the table and exact column list
    ///
    /// This is the planner entry point: only an initialized index may
    /// substitute for a table scan.
    pub fn get_index(
        &self,
        schema: &str,
        table: &str,
        columns: &[String],
    ) -> Option<Arc<dyn Index>> {
        self.find_index(schema, table, columns, None, None, None)
    }

    /// Find an initialized index, additionally filtering on method,
    /// uniqueness and persistence where requested
    pub fn find_index(
        &self,
        schema: &str,
        table: &str,
        columns: &[String],
        method: Option<IndexMethod>,
        unique: Option<bool>,
        persistent: Option<bool>,
    ) -> Option<Arc<dyn Index>> {
        let maps = self.indexes.read();
        maps.by_id
            .values()
            .find(|index| {
                index.is_initialized()
                    && index.schema_name() == schema
                    && index.table_name() == table
                    && index.column_names() == columns
                    && method.map_or(true, |m| index.method() == m)
                    && unique.map_or(true, |u| index.is_unique() == u)
                    && persistent.map_or(true, |p| index.is_persistent() == p)
            })
            .cloned()
    }

    /// All initialized indexes over a table
    ///
    /// The DML rewrite pass mirrors each statement's effect onto every one
    /// of these.
    pub fn get_indexes(&self, schema: &str, table: &str) -> Vec<Arc<dyn Index>> {
        let maps = self.indexes.read();
        maps.by_id
            .values()
            .filter(|index| {
                index.is_initialized()
                    && index.schema_name() == schema
                    && index.table_name() == table
            })
            .cloned()
            .collect()
    }

    /// Number of registered indexes
    pub fn index_count(&self) -> usize {
        self.indexes.read().by_id.len()
    }

    /// Validate the staged operations of every index `xid` touched
    ///
    /// Fans out in registration order and keeps the transaction's index set
    /// recorded, so `commit` or `rollback` still reaches every index. The
    /// first violation is returned and the caller is expected to roll back.
    pub fn barrier(&self, xid: TxnId) -> Result<()> {
        for index in self.resolve(self.tracker.touched(xid)) {
            index.barrier(xid)?;
        }
        Ok(())
    }

    /// Commit `xid` on every index it touched
    ///
    /// Re-runs `barrier` on all of them first, so a lingering violation
    /// surfaces before any index commits; only then is `commit` issued to
    /// each. If that late validation fails, every touched index is rolled
    /// back and the violation returned - the caller must treat the
    /// transaction as aborted.
    pub fn commit(&self, xid: TxnId) -> Result<()> {
        let indexes = self.resolve(self.tracker.take(xid));
        for index in &indexes {
            if let Err(err) = index.barrier(xid) {
                warn!(
                    index = %index.name(),
                    xid,
                    %err,
                    "validation failed at commit; rolling back"
                );
                for touched in &indexes {
                    touched.rollback(xid);
                }
                return Err(err);
            }
        }
        for index in &indexes {
            index.commit(xid)?;
        }
        debug!(xid, indexes = indexes.len(), "committed transaction");
        Ok(())
    }

    /// Roll back `xid` on every index it touched
    pub fn rollback(&self, xid: TxnId) {
        for index in self.resolve(self.tracker.take(xid)) {
            index.rollback(xid);
        }
    }

    /// Re-register catalog-stored definitions at startup, rebuilding each
    /// from a fresh source-table scan
    ///
    /// Persistent definitions are skipped (no provider exists for them).
    /// Returns the number of indexes restored; the first failure aborts the
    /// restore and is returned.
    pub fn restore_indexes(
        &self,
        defs: Vec<IndexDef>,
        provider: &mut dyn ScanProvider,
    ) -> Result<usize> {
        let mut restored = 0;
        for def in defs {
            if def.persistent {
                warn!(index = %def.name, "skipping persistent index during restore");
                continue;
            }
            let name = def.name.clone();
            let mut scan = provider.open_scan(&def)?;
            match self.add_index(def, scan.as_mut()) {
                Ok(_) => {
                    info!(index = %name, "restored index");
                    restored += 1;
                }
                Err(err) => {
                    warn!(index = %name, %err, "failed to restore index");
                    return Err(err);
                }
            }
        }
        Ok(restored)
    }

    /// Resolve touched index ids to live instances, skipping any index that
    /// was dropped while the transaction was open
    fn resolve(&self, ids: Vec<IndexId>) -> Vec<Arc<dyn Index>> {
        let maps = self.indexes.read();
        ids.iter()
            .filter_map(|id| maps.by_id.get(id).cloned())
            .collect()
    }
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IndexRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexRegistry")
            .field("index_count", &self.index_count())
            .field("open_transactions", &self.tracker.open_count())
            .finish_non_exhaustive()
    }
}
