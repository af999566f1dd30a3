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

//! # manifold-index - Transactional copy-on-write secondary indexes
//!
//! This crate is the secondary-index subsystem of the Manifold polystore
//! query engine. It maintains in-memory hash indexes over tables that live in
//! remote, heterogeneous stores, so the planner can substitute a full remote
//! table scan with a local, snapshot-consistent lookup while still taking
//! part in the engine's multi-statement, multi-store transactions.
//!
//! ## Key Features
//!
//! - **Copy-on-write transaction overlays** - every transaction sees the
//!   committed base state plus only its own staged-and-validated changes
//! - **Barrier validation** - uniqueness constraints are checked when staged
//!   operations fold into a transaction's private overlay, before anything
//!   becomes visible to other transactions
//! - **Deferred commit replay** - committed state is produced by replaying an
//!   ordered log of updates, independent of any transaction's overlay
//! - **Rebuildable, not durable** - there is no write-ahead log; an index is
//!   reconstructed at any time from a full scan of its source table
//!
//! ## Quick Start
//!
//! ```rust
//! use manifold_index::{
//!     Index, IndexDef, IndexKey, IndexMethod, IndexRegistry, Value, VecScan,
//! };
//!
//! let registry = IndexRegistry::new();
//! let index = registry
//!     .add_index(
//!         IndexDef {
//!             id: 1,
//!             name: "idx_users_email".into(),
//!             schema: "public".into(),
//!             table: "users".into(),
//!             columns: vec!["email".into()],
//!             target_columns: vec!["id".into()],
//!             method: IndexMethod::Hash,
//!             unique: true,
//!             persistent: false,
//!         },
//!         &mut VecScan::empty(),
//!     )
//!     .unwrap();
//!
//! // Stage a write under transaction 1, validate it, commit it.
//! let key = IndexKey::new(vec![Value::text("alice@example.com")]);
//! index.insert(1, key.clone(), vec![Value::integer(42)]).unwrap();
//! registry.barrier(1).unwrap();
//! registry.commit(1).unwrap();
//!
//! // Other transactions now see the committed entry.
//! assert!(index.contains(2, &key));
//! ```
//!
//! ## Modules
//!
//! - [`core`] - Fundamental types ([`Value`], [`DataType`], [`Error`])
//! - [`storage`] - The [`Index`] contract, the hash index implementations and
//!   the [`IndexRegistry`]

pub mod core;
pub mod storage;

// Re-export core types for convenience
pub use crate::core::{DataType, Error, IndexId, IndexMethod, Result, Row, TxnId, Value};

// Re-export the index contract and rebuild boundary
pub use storage::{Index, ScanProvider, TableScan, VecScan};

// Re-export index implementations and registry types
pub use storage::{
    HashIndexFactory, IndexDef, IndexFactory, IndexKey, IndexRegistry, MultiHashIndex, Tuple,
    TxnTracker, UniqueHashIndex,
};
