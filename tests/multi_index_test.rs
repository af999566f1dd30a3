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

//! End-to-end tests for the non-unique copy-on-write hash index

use std::sync::Arc;

use manifold_index::{Index, IndexDef, IndexKey, IndexMethod, IndexRegistry, Value, VecScan};

fn multi_def(id: u64, name: &str) -> IndexDef {
    IndexDef {
        id,
        name: name.to_string(),
        schema: "public".to_string(),
        table: "orders".to_string(),
        columns: vec!["status".to_string()],
        target_columns: vec!["order_id".to_string()],
        method: IndexMethod::Hash,
        unique: false,
        persistent: false,
    }
}

fn setup() -> (IndexRegistry, Arc<dyn Index>) {
    let registry = IndexRegistry::new();
    let index = registry
        .add_index(multi_def(1, "idx_orders_status"), &mut VecScan::empty())
        .unwrap();
    (registry, index)
}

fn key(s: &str) -> IndexKey {
    IndexKey::single(Value::text(s))
}

#[test]
fn multiplicity_after_commit() {
    let (registry, index) = setup();

    index
        .insert(1, key("pending"), vec![Value::integer(1)])
        .unwrap();
    index
        .insert(1, key("pending"), vec![Value::integer(2)])
        .unwrap();
    registry.barrier(1).unwrap();
    registry.commit(1).unwrap();

    assert!(index.contains_any(2, &[key("pending")]));
    let mut rows = index.get_as_values(2);
    rows.sort();
    assert_eq!(
        rows,
        vec![
            vec![Value::text("pending"), Value::integer(1)],
            vec![Value::text("pending"), Value::integer(2)],
        ]
    );

    // Deleting one tuple leaves the other
    index
        .delete_primary(3, key("pending"), vec![Value::integer(1)])
        .unwrap();
    registry.barrier(3).unwrap();
    registry.commit(3).unwrap();
    assert_eq!(
        index.get_key_as_values(4, &key("pending")),
        vec![vec![Value::text("pending"), Value::integer(2)]]
    );
}

#[test]
fn duplicate_inserts_never_violate() {
    let (registry, index) = setup();

    index.insert(1, key("a"), vec![Value::integer(1)]).unwrap();
    index.insert(1, key("a"), vec![Value::integer(1)]).unwrap();
    registry.barrier(1).unwrap();
    registry.commit(1).unwrap();

    // Set semantics absorbed the duplicate
    assert_eq!(index.get_key_as_values(2, &key("a")).len(), 1);
}

#[test]
fn overlay_is_private_until_commit() {
    let (registry, index) = setup();

    index.insert(1, key("a"), vec![Value::integer(1)]).unwrap();
    registry.barrier(1).unwrap();
    registry.commit(1).unwrap();

    // T2 clears the key and re-adds a different tuple; T3 sees none of it
    index.delete(2, key("a")).unwrap();
    index.insert(2, key("a"), vec![Value::integer(9)]).unwrap();
    registry.barrier(2).unwrap();

    assert_eq!(
        index.get_key_as_values(3, &key("a")),
        vec![vec![Value::text("a"), Value::integer(1)]]
    );
    assert_eq!(
        index.get_key_as_values(2, &key("a")),
        vec![vec![Value::text("a"), Value::integer(9)]]
    );

    registry.commit(2).unwrap();
    assert_eq!(
        index.get_key_as_values(3, &key("a")),
        vec![vec![Value::text("a"), Value::integer(9)]]
    );
}

#[test]
fn key_wide_delete_then_rollback() {
    let (registry, index) = setup();

    index.insert(1, key("a"), vec![Value::integer(1)]).unwrap();
    index.insert(1, key("a"), vec![Value::integer(2)]).unwrap();
    registry.barrier(1).unwrap();
    registry.commit(1).unwrap();

    index.delete(2, key("a")).unwrap();
    registry.barrier(2).unwrap();
    assert!(!index.contains(2, &key("a")));
    registry.rollback(2);

    assert_eq!(index.get_key_as_values(3, &key("a")).len(), 2);
}

#[test]
fn rebuild_from_scan_with_duplicate_keys() {
    let (_registry, index) = setup();

    let mut scan = VecScan::new(vec![
        vec![Value::text("pending"), Value::integer(1)],
        vec![Value::text("pending"), Value::integer(2)],
        vec![Value::text("shipped"), Value::integer(3)],
    ]);
    index.rebuild(&mut scan).unwrap();

    assert_eq!(index.size(1), 2);
    assert_eq!(index.get_key_as_values(1, &key("pending")).len(), 2);

    // A malformed source leaves the index uninitialized, not half-built
    let mut bad = VecScan::new(vec![vec![Value::text("x")]]);
    assert!(index.rebuild(&mut bad).is_err());
    assert!(!index.is_initialized());
    assert_eq!(index.size(2), 0);
}
