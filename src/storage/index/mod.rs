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

//! Copy-on-write secondary index implementations
//!
//! Two hash-based variants share the [`Index`](crate::storage::Index)
//! contract:
//!
//! - [`UniqueHashIndex`] - one key maps to at most one primary-key tuple;
//!   enforces a uniqueness constraint at barrier time
//! - [`MultiHashIndex`] - one key maps to a set of primary-key tuples
//!
//! Both keep three per-transaction collections besides the shared base
//! state: a staging log of unvalidated writes, a private overlay produced by
//! `barrier`, and a commit log of deferred-update records replayed at
//! commit. The [`IndexRegistry`] owns the instances and fans transaction
//! lifecycle calls out to every index a transaction touched.

pub(crate) mod deferred;
pub mod key;
pub mod multi_hash;
pub mod registry;
pub mod unique_hash;

pub use key::{IndexKey, Tuple};
pub use multi_hash::MultiHashIndex;
pub use registry::{HashIndexFactory, IndexDef, IndexFactory, IndexRegistry, TxnTracker};
pub use unique_hash::UniqueHashIndex;
