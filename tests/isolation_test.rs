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

//! Transaction isolation across concurrent transactions

use std::sync::Arc;
use std::thread;

use manifold_index::{
    Index, IndexDef, IndexKey, IndexMethod, IndexRegistry, TxnId, Value, VecScan,
};

fn def(unique: bool) -> IndexDef {
    IndexDef {
        id: 1,
        name: "idx_t_k".to_string(),
        schema: "public".to_string(),
        table: "t".to_string(),
        columns: vec!["k".to_string()],
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
fn writes_invisible_until_commit() {
    let registry = IndexRegistry::new();
    let index = registry
        .add_index(def(true), &mut VecScan::empty())
        .unwrap();

    index.insert(1, key("a"), vec![Value::integer(1)]).unwrap();
    assert!(!index.contains(2, &key("a")), "staged write invisible");
    assert!(index.get_as_values(2).is_empty());

    registry.barrier(1).unwrap();
    assert!(!index.contains(2, &key("a")), "validated write still private");
    assert!(index.get_as_values(2).is_empty());

    registry.commit(1).unwrap();
    assert!(index.contains(2, &key("a")));
    assert_eq!(index.get_as_values(2).len(), 1);
}

#[test]
fn concurrent_overlays_are_mutually_invisible() {
    let registry = IndexRegistry::new();
    let index = registry
        .add_index(def(false), &mut VecScan::empty())
        .unwrap();

    index.insert(1, key("a"), vec![Value::integer(1)]).unwrap();
    index.insert(2, key("b"), vec![Value::integer(2)]).unwrap();
    registry.barrier(1).unwrap();
    registry.barrier(2).unwrap();

    assert!(index.contains(1, &key("a")));
    assert!(!index.contains(1, &key("b")));
    assert!(index.contains(2, &key("b")));
    assert!(!index.contains(2, &key("a")));

    registry.commit(1).unwrap();
    // T2's view now layers its overlay over the newly committed base
    assert!(index.contains(2, &key("a")));

    registry.rollback(2);
    assert!(!index.contains(3, &key("b")));
}

#[test]
fn threaded_writers_commit_atomically() {
    const WRITERS: usize = 8;
    const KEYS_PER_TXN: usize = 16;

    let registry = Arc::new(IndexRegistry::new());
    let index = registry
        .add_index(def(true), &mut VecScan::empty())
        .unwrap();

    let mut handles = Vec::new();
    for w in 0..WRITERS {
        let registry = Arc::clone(&registry);
        let index = Arc::clone(&index);
        handles.push(thread::spawn(move || {
            let xid = w as TxnId + 1;
            for i in 0..KEYS_PER_TXN {
                index
                    .insert(
                        xid,
                        key(&format!("w{}-{}", w, i)),
                        vec![Value::integer(i as i64)],
                    )
                    .unwrap();
            }
            registry.barrier(xid).unwrap();
            registry.commit(xid).unwrap();
        }));
    }

    // A transaction's commit replays its whole log under one exclusive
    // section, so any reader observes a key count that is a multiple of the
    // per-transaction batch size.
    let reader = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for probe in 0..200 {
                let xid = 1000 + probe as TxnId;
                let size = index.size(xid);
                assert_eq!(
                    size % KEYS_PER_TXN,
                    0,
                    "observed a partially committed transaction"
                );
            }
        })
    };

    for handle in handles {
        handle.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(index.size(0), WRITERS * KEYS_PER_TXN);
}

#[test]
fn distinct_transactions_do_not_conflict_on_distinct_keys() {
    let registry = Arc::new(IndexRegistry::new());
    let index = registry
        .add_index(def(true), &mut VecScan::empty())
        .unwrap();

    let mut handles = Vec::new();
    for w in 0..4 {
        let registry = Arc::clone(&registry);
        let index = Arc::clone(&index);
        handles.push(thread::spawn(move || {
            let xid = w as TxnId + 1;
            index
                .insert(xid, key(&format!("k{}", w)), vec![Value::integer(w as i64)])
                .unwrap();
            registry.barrier(xid).unwrap();
            registry.commit(xid).unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    for w in 0..4 {
        assert!(index.contains(100, &key(&format!("k{}", w))));
    }
}
