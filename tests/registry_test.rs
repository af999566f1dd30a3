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

//! Registry-level lifecycle tests: factory selection, lookups, fan-out and
//! startup restore

use manifold_index::{
    Error, Index, IndexDef, IndexKey, IndexMethod, IndexRegistry, Result, ScanProvider, TableScan,
    Value, VecScan,
};

fn def(id: u64, name: &str, table: &str, column: &str, unique: bool) -> IndexDef {
    IndexDef {
        id,
        name: name.to_string(),
        schema: "public".to_string(),
        table: table.to_string(),
        columns: vec![column.to_string()],
        target_columns: vec!["id".to_string()],
        method: IndexMethod::Hash,
        unique,
        persistent: false,
    }
}

fn key(s: &str) -> IndexKey {
    IndexKey::single(Value::text(s))
}

#[test]
fn factory_selects_variant_by_uniqueness() {
    let registry = IndexRegistry::new();
    let unique = registry
        .add_index(def(1, "idx_u", "t", "a", true), &mut VecScan::empty())
        .unwrap();
    let multi = registry
        .add_index(def(2, "idx_m", "t", "b", false), &mut VecScan::empty())
        .unwrap();

    assert!(unique.is_unique());
    assert!(!multi.is_unique());
    assert_eq!(unique.method(), IndexMethod::Hash);

    // Same key inserted twice: the unique variant rejects, the multi
    // variant absorbs
    unique.insert(1, key("k"), vec![Value::integer(1)]).unwrap();
    unique.insert(1, key("k"), vec![Value::integer(2)]).unwrap();
    assert!(registry.barrier(1).is_err());
    registry.rollback(1);

    multi.insert(2, key("k"), vec![Value::integer(1)]).unwrap();
    multi.insert(2, key("k"), vec![Value::integer(2)]).unwrap();
    registry.barrier(2).unwrap();
    registry.commit(2).unwrap();
    assert_eq!(multi.get_key_as_values(3, &key("k")).len(), 2);
}

#[test]
fn planner_lookups_match_exact_column_lists() {
    let registry = IndexRegistry::new();
    registry
        .add_index(
            IndexDef {
                id: 1,
                name: "idx_composite".to_string(),
                schema: "public".to_string(),
                table: "t".to_string(),
                columns: vec!["a".to_string(), "b".to_string()],
                target_columns: vec!["id".to_string()],
                method: IndexMethod::Hash,
                unique: false,
                persistent: false,
            },
            &mut VecScan::empty(),
        )
        .unwrap();

    let cols = vec!["a".to_string(), "b".to_string()];
    assert!(registry.get_index("public", "t", &cols).is_some());

    // Order matters, prefixes do not match
    let swapped = vec!["b".to_string(), "a".to_string()];
    assert!(registry.get_index("public", "t", &swapped).is_none());
    assert!(registry
        .get_index("public", "t", &["a".to_string()])
        .is_none());
}

#[test]
fn dml_mirrors_statement_onto_every_table_index() {
    let registry = IndexRegistry::new();
    registry
        .add_index(def(1, "idx_name", "users", "name", true), &mut VecScan::empty())
        .unwrap();
    registry
        .add_index(def(2, "idx_city", "users", "city", false), &mut VecScan::empty())
        .unwrap();

    // The DML layer asks for all indexes of the table and mirrors one
    // inserted row into each
    let indexes = registry.get_indexes("public", "users");
    assert_eq!(indexes.len(), 2);
    for index in &indexes {
        let field = if index.id() == 1 { "alice" } else { "berlin" };
        index
            .insert(1, key(field), vec![Value::integer(10)])
            .unwrap();
    }
    registry.barrier(1).unwrap();
    registry.commit(1).unwrap();

    let by_name = registry.get_index_by_name("idx_name").unwrap();
    let by_city = registry.get_index_by_name("idx_city").unwrap();
    assert!(by_name.contains(2, &key("alice")));
    assert!(by_city.contains(2, &key("berlin")));
}

#[test]
fn restore_rebuilds_from_catalog_definitions() {
    struct CatalogScans;
    impl ScanProvider for CatalogScans {
        fn open_scan(&mut self, index: &IndexDef) -> Result<Box<dyn TableScan>> {
            assert_eq!(index.schema, "public");
            let rows = vec![
                vec![Value::text("alice"), Value::integer(1)],
                vec![Value::text("bob"), Value::integer(2)],
            ];
            Ok(Box::new(VecScan::new(rows)))
        }
    }

    let registry = IndexRegistry::new();
    let restored = registry
        .restore_indexes(
            vec![
                def(1, "idx_name", "users", "name", true),
                def(2, "idx_nick", "users", "nick", false),
            ],
            &mut CatalogScans,
        )
        .unwrap();
    assert_eq!(restored, 2);

    for name in ["idx_name", "idx_nick"] {
        let index = registry.get_index_by_name(name).unwrap();
        assert!(index.is_initialized());
        assert_eq!(index.size(1), 2);
        assert!(index.contains(1, &key("alice")));
    }
}

#[test]
fn commit_late_validation_rolls_back_all_indexes() {
    let registry = IndexRegistry::new();
    let idx_a = registry
        .add_index(def(1, "idx_a", "t", "a", false), &mut VecScan::empty())
        .unwrap();
    let idx_b = registry
        .add_index(def(2, "idx_b", "t", "b", true), &mut VecScan::empty())
        .unwrap();

    idx_b.insert(1, key("dup"), vec![Value::integer(1)]).unwrap();
    registry.barrier(1).unwrap();
    registry.commit(1).unwrap();

    // Coordinator skips the explicit barrier; commit validates on its own
    // and must abort both indexes on the collision
    idx_a.insert(2, key("x"), vec![Value::integer(1)]).unwrap();
    idx_b.insert(2, key("dup"), vec![Value::integer(2)]).unwrap();
    let err = registry.commit(2).unwrap_err();
    assert!(err.is_constraint_violation());

    assert!(!idx_a.contains(3, &key("x")));
    assert_eq!(idx_b.size(3), 1);
}

#[test]
fn unknown_lookups_return_not_found() {
    let registry = IndexRegistry::new();
    assert!(registry.get_index_by_name("nope").is_none());
    assert!(registry.get_index_by_id(99).is_none());
    assert!(matches!(
        registry.delete_index(99),
        Err(Error::IndexNotFound(_))
    ));
    // Lifecycle calls for unknown transactions are harmless no-ops
    registry.barrier(42).unwrap();
    registry.commit(42).unwrap();
    registry.rollback(42);
}
