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

//! Composite index key
//!
//! An index key is an ordered, fixed-arity sequence of values whose field
//! order matches the indexed column order. Keys compare by structural
//! equality and are stored directly as hash map keys.

use std::fmt;

use crate::core::Value;

/// A primary-key tuple an index entry resolves to
pub type Tuple = Vec<Value>;

/// Composite key over one or more column values
///
/// Wraps `Vec<Value>` with `Hash`/`Ord` implementations that match the
/// structural equality of [`Value`], so `[Integer(5)]` and `[Float(5.0)]`
/// address the same entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey(pub Vec<Value>);

impl IndexKey {
    /// Create a key from column values in indexed-column order
    pub fn new(values: Vec<Value>) -> Self {
        IndexKey(values)
    }

    /// Create a single-column key
    pub fn single(value: Value) -> Self {
        IndexKey(vec![value])
    }

    /// Returns the number of key fields
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Returns the key fields as a slice
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for IndexKey {
    fn from(values: Vec<Value>) -> Self {
        IndexKey(values)
    }
}

impl std::hash::Hash for IndexKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for v in &self.0 {
            v.hash(state);
        }
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Compare element by element
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.cmp(b) {
                std::cmp::Ordering::Equal => continue,
                ord => return ord,
            }
        }
        // If all compared elements are equal, shorter is less
        self.0.len().cmp(&other.0.len())
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[test]
    fn test_structural_equality() {
        let a = IndexKey::new(vec![Value::integer(1), Value::text("x")]);
        let b = IndexKey::new(vec![Value::integer(1), Value::text("x")]);
        let c = IndexKey::new(vec![Value::integer(2), Value::text("x")]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        // Cross-type numeric equality carries through the key
        assert_eq!(
            IndexKey::single(Value::integer(5)),
            IndexKey::single(Value::float(5.0))
        );
    }

    #[test]
    fn test_map_key() {
        let mut map: FxHashMap<IndexKey, i32> = FxHashMap::default();
        map.insert(IndexKey::single(Value::text("a")), 1);
        map.insert(IndexKey::new(vec![Value::text("a"), Value::text("b")]), 2);

        assert_eq!(map.get(&IndexKey::single(Value::text("a"))), Some(&1));
        assert_eq!(
            map.get(&IndexKey::new(vec![Value::text("a"), Value::text("b")])),
            Some(&2)
        );
        assert_eq!(map.get(&IndexKey::single(Value::text("b"))), None);
        assert_eq!(map.get(&IndexKey::single(Value::integer(5))), None);
    }

    #[test]
    fn test_ordering() {
        let mut keys = vec![
            IndexKey::new(vec![Value::integer(2)]),
            IndexKey::new(vec![Value::integer(1), Value::integer(9)]),
            IndexKey::new(vec![Value::integer(1)]),
        ];
        keys.sort();
        assert_eq!(keys[0], IndexKey::new(vec![Value::integer(1)]));
        assert_eq!(
            keys[1],
            IndexKey::new(vec![Value::integer(1), Value::integer(9)])
        );
        assert_eq!(keys[2], IndexKey::new(vec![Value::integer(2)]));
    }

    #[test]
    fn test_display() {
        let key = IndexKey::new(vec![Value::text("alice"), Value::integer(3)]);
        assert_eq!(key.to_string(), "[alice, 3]");
        assert_eq!(IndexKey::new(vec![]).to_string(), "[]");
    }
}
