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

//! Value type for manifold-index - runtime values with type information
//!
//! Index keys and primary-key tuples are sequences of these values. Equality
//! is structural: `Integer(5) == Float(5.0)`, NULL equals NULL, and NaN
//! equals NaN, with a `Hash` implementation consistent with that equality so
//! values can key hash maps directly.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::types::DataType;

/// A materialized row: index key fields followed by target (primary-key)
/// fields, the shape both `get_as_values` emits and `rebuild` consumes.
pub type Row = Vec<Value>;

/// A runtime value with type information
///
/// Each variant carries its data directly. Text uses `Arc<str>` for cheap
/// cloning, since keys and tuples are copied into per-transaction overlays
/// and commit logs.
#[derive(Debug, Clone)]
pub enum Value {
    /// NULL value with optional type hint
    Null(DataType),

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit floating point
    Float(f64),

    /// UTF-8 text string (Arc for cheap cloning)
    Text(Arc<str>),

    /// Boolean value
    Boolean(bool),

    /// Timestamp (UTC)
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Create a NULL value with a type hint
    pub fn null(data_type: DataType) -> Self {
        Value::Null(data_type)
    }

    /// Create a NULL value with unknown type
    pub fn null_unknown() -> Self {
        Value::Null(DataType::Null)
    }

    /// Create an integer value
    pub fn integer(value: i64) -> Self {
        Value::Integer(value)
    }

    /// Create a float value
    pub fn float(value: f64) -> Self {
        Value::Float(value)
    }

    /// Create a text value
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(Arc::from(value.into().as_str()))
    }

    /// Create a boolean value
    pub fn boolean(value: bool) -> Self {
        Value::Boolean(value)
    }

    /// Create a timestamp value
    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }

    /// Returns true if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Returns the data type of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null(dt) => *dt,
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
            Value::Timestamp(_) => DataType::Timestamp,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(Arc::from(value.as_str()))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        // NULL equals NULL regardless of the type hint
        if self.is_null() && other.is_null() {
            return true;
        }
        if self.is_null() || other.is_null() {
            return false;
        }

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                // NaN != NaN in IEEE 754, but we consider them equal so a key
                // containing NaN can be found again
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            // Cross-type numeric comparison: a key built from an INTEGER
            // column must match a lookup arriving as FLOAT
            (Value::Integer(i), Value::Float(f)) | (Value::Float(f), Value::Integer(i)) => {
                *f == (*i as f64)
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Equal values must hash the same. Since Integer(5) == Float(5.0),
        // numeric variants hash as their f64 bit representation under a
        // shared discriminant; all NULLs hash alike since they compare equal.
        match self {
            Value::Null(_) => {
                0u8.hash(state);
            }
            Value::Integer(v) => {
                1u8.hash(state);
                (*v as f64).to_bits().hash(state);
            }
            Value::Float(v) => {
                1u8.hash(state);
                let canonical = if v.is_nan() { f64::NAN } else { *v };
                canonical.to_bits().hash(state);
            }
            Value::Text(s) => {
                2u8.hash(state);
                s.hash(state);
            }
            Value::Boolean(b) => {
                3u8.hash(state);
                b.hash(state);
            }
            Value::Timestamp(t) => {
                4u8.hash(state);
                t.timestamp_nanos_opt().hash(state);
            }
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total ordering for Value
///
/// Required so keys and rows can be sorted deterministically. NULLs order
/// first, numeric variants compare by numeric value (consistent with
/// `PartialEq`), remaining cross-type pairs order by type discriminant.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        // Cross-type numeric comparison, consistent with PartialEq
        match (self, other) {
            (Value::Integer(i), Value::Float(f)) => {
                if f.is_nan() {
                    return Ordering::Less;
                }
                return (*i as f64).partial_cmp(f).unwrap_or(Ordering::Equal);
            }
            (Value::Float(f), Value::Integer(i)) => {
                if f.is_nan() {
                    return Ordering::Greater;
                }
                return f.partial_cmp(&(*i as f64)).unwrap_or(Ordering::Equal);
            }
            _ => {}
        }

        fn type_discriminant(v: &Value) -> u8 {
            match v {
                Value::Null(_) => 0,
                Value::Boolean(_) => 1,
                // Integer and Float share a discriminant so they sort
                // together by numeric value
                Value::Integer(_) | Value::Float(_) => 2,
                Value::Text(_) => 3,
                Value::Timestamp(_) => 4,
            }
        }

        let self_disc = type_discriminant(self);
        let other_disc = type_discriminant(other);
        if self_disc != other_disc {
            return self_disc.cmp(&other_disc);
        }

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[test]
    fn test_structural_equality() {
        assert_eq!(Value::integer(5), Value::integer(5));
        assert_ne!(Value::integer(5), Value::integer(6));
        assert_eq!(Value::integer(5), Value::float(5.0));
        assert_eq!(Value::float(5.0), Value::integer(5));
        assert_ne!(Value::integer(5), Value::text("5"));
        assert_eq!(Value::text("abc"), Value::text("abc"));
        assert_eq!(Value::float(f64::NAN), Value::float(f64::NAN));
        assert_eq!(
            Value::null(DataType::Integer),
            Value::null(DataType::Text),
            "nulls compare equal regardless of type hint"
        );
        assert_ne!(Value::null_unknown(), Value::integer(0));
    }

    #[test]
    fn test_hash_consistent_with_eq() {
        let mut map: FxHashMap<Value, i32> = FxHashMap::default();
        map.insert(Value::integer(5), 1);
        assert_eq!(map.get(&Value::float(5.0)), Some(&1));

        map.insert(Value::null(DataType::Integer), 2);
        assert_eq!(map.get(&Value::null(DataType::Text)), Some(&2));

        map.insert(Value::float(f64::NAN), 3);
        assert_eq!(map.get(&Value::float(f64::NAN)), Some(&3));
    }

    #[test]
    fn test_ordering() {
        let mut values = vec![
            Value::text("b"),
            Value::integer(2),
            Value::null_unknown(),
            Value::float(1.5),
            Value::boolean(true),
            Value::text("a"),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::null_unknown(),
                Value::boolean(true),
                Value::float(1.5),
                Value::integer(2),
                Value::text("a"),
                Value::text("b"),
            ]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::integer(42).to_string(), "42");
        assert_eq!(Value::text("abc").to_string(), "abc");
        assert_eq!(Value::boolean(false).to_string(), "false");
        assert_eq!(Value::null_unknown().to_string(), "NULL");
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(Value::from(7i64), Value::integer(7));
        assert_eq!(Value::from("x"), Value::text("x"));
        assert_eq!(Value::from(true), Value::boolean(true));
        assert_eq!(Value::from(2.5f64), Value::float(2.5));
    }

    #[test]
    fn test_data_type() {
        assert_eq!(Value::integer(1).data_type(), DataType::Integer);
        assert_eq!(Value::null(DataType::Text).data_type(), DataType::Text);
        assert!(Value::null_unknown().is_null());
        assert!(!Value::integer(0).is_null());
    }
}
