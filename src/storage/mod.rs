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

//! Storage module for manifold-index
//!
//! This module contains the index layer:
//! - The [`Index`] contract and the rebuild boundary traits
//! - Copy-on-write hash index implementations
//! - The [`IndexRegistry`] that owns indexes and fans out transaction
//!   lifecycle calls

pub mod index;
pub mod traits;

// Re-export trait types
pub use traits::{Index, ScanProvider, TableScan, VecScan};

// Re-export index types
pub use index::{
    HashIndexFactory, IndexDef, IndexFactory, IndexKey, IndexRegistry, MultiHashIndex, Tuple,
    TxnTracker, UniqueHashIndex,
};
