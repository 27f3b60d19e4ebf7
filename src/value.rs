//! The CBOR value tree this codec operates on, plus a handful of numeric helpers.
//!
//! `ciborium::value::Value` is reused rather than reimplemented: its `Map` variant is a
//! `Vec<(Value, Value)>`, which preserves insertion order — map entry order is
//! significant here, since a CID is a hash of the exact re-encoded bytes, and a hash map
//! would silently reorder entries on re-encode.

pub use ciborium::value::{Integer, Value};

/// Builds a CBOR unsigned-integer `Value` from a `u64` index.
pub fn uint_value(n: u64) -> Value {
    Value::Integer(Integer::from(n))
}

/// Reads a non-negative integer out of a `Value`, if it is one.
pub fn as_u64(v: &Value) -> Option<u64> {
    v.as_integer().and_then(|i| i.try_into().ok())
}

/// Borrows the text out of a `Value`, if it is a text string.
pub fn as_text(v: &Value) -> Option<&str> {
    v.as_text()
}
