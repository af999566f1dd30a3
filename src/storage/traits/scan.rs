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

//! Rebuild boundary traits
//!
//! An index is repopulated from a full scan of its source table. The scan is
//! driven by the engine's query processor, which sits outside this crate;
//! these traits are the seam it plugs into.

use crate::core::{Result, Row};
use crate::storage::index::IndexDef;

/// A full scan of an indexed table, projected to the index's key columns
/// followed by its target columns
///
/// When the key and target column lists are identical (the index is its
/// table's primary-key index), each row carries the fields twice.
pub trait TableScan {
    /// Produces the complete row-set of the scan
    fn rows(&mut self) -> Result<Vec<Row>>;
}

/// Opens table scans for index definitions during startup recovery
pub trait ScanProvider {
    /// Opens a scan for the table and projection described by `index`
    fn open_scan(&mut self, index: &IndexDef) -> Result<Box<dyn TableScan>>;
}

/// A [`TableScan`] over an in-memory row-set
///
/// Used by tests and by callers that have already materialized the scan.
#[derive(Debug, Clone, Default)]
pub struct VecScan {
    rows: Vec<Row>,
}

impl VecScan {
    /// Create a scan over the given rows
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Create an empty scan (an empty source table)
    pub fn empty() -> Self {
        Self::default()
    }
}

impl TableScan for VecScan {
    fn rows(&mut self) -> Result<Vec<Row>> {
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    #[test]
    fn test_vec_scan() {
        let mut scan = VecScan::new(vec![
            vec![Value::integer(1), Value::text("a")],
            vec![Value::integer(2), Value::text("b")],
        ]);
        let rows = scan.rows().unwrap();
        assert_eq!(rows.len(), 2);
        // The scan is repeatable; rebuild may consume it more than once.
        assert_eq!(scan.rows().unwrap(), rows);

        assert!(VecScan::empty().rows().unwrap().is_empty());
    }
}
