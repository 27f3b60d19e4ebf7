//! Edit scripts and diff application: rebuilds a document from a previous document plus
//! an edit script, addressing every edit by its index in the *original* document.

use std::collections::{HashMap, HashSet};

use crate::error::Error;
use crate::indexer::{self, IndexTable, SelfKind};
use crate::tags;
use crate::value::{as_u64, uint_value, Value};

/// An edit script: updates, deletes, inserts, and prepends against a previous document,
/// all addressed by original (prev-relative) index. Absent classes are simply empty.
#[derive(Debug, Clone, Default)]
pub struct EditScript {
    pub updates: Vec<(u64, Value)>,
    pub deletes: Vec<u64>,
    pub inserts: Vec<(u64, Value)>,
    pub prepends: Vec<(u64, Value)>,
}

impl EditScript {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
            && self.deletes.is_empty()
            && self.inserts.is_empty()
            && self.prepends.is_empty()
    }

    /// Parses an edit script out of its wire representation (a CBOR map with up to four
    /// single-letter keys). The RHS values are left exactly as found on the wire
    /// (possibly tag-compressed); decompression happens during `DiffApplier::apply`.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        let entries = match value {
            Value::Map(entries) => entries,
            other => {
                return Err(Error::MalformedEdit(format!(
                    "edit script must be a CBOR map, got {other:?}"
                )))
            }
        };

        let mut script = EditScript::default();
        for (k, v) in entries {
            let key = k
                .as_text()
                .ok_or_else(|| Error::MalformedEdit("edit script key must be text".into()))?;
            match key {
                "u" => script.updates = parse_pairs(v)?,
                "d" => script.deletes = parse_indices(v)?,
                "i" => script.inserts = parse_pairs(v)?,
                "p" => script.prepends = parse_pairs(v)?,
                other => {
                    return Err(Error::MalformedEdit(format!(
                        "unknown edit script key '{other}'"
                    )))
                }
            }
        }
        Ok(script)
    }

    /// Renders this edit script to its wire representation, applying `TagCodec::compress`
    /// to every embedded value.
    pub fn to_compressed_value(&self) -> Value {
        let mut entries = Vec::new();
        if !self.updates.is_empty() {
            entries.push((Value::Text("u".into()), compressed_pairs(&self.updates)));
        }
        if !self.deletes.is_empty() {
            entries.push((
                Value::Text("d".into()),
                Value::Array(self.deletes.iter().map(|i| uint_value(*i)).collect()),
            ));
        }
        if !self.inserts.is_empty() {
            entries.push((Value::Text("i".into()), compressed_pairs(&self.inserts)));
        }
        if !self.prepends.is_empty() {
            entries.push((Value::Text("p".into()), compressed_pairs(&self.prepends)));
        }
        Value::Map(entries)
    }
}

fn compressed_pairs(pairs: &[(u64, Value)]) -> Value {
    Value::Array(
        pairs
            .iter()
            .map(|(i, v)| Value::Array(vec![uint_value(*i), tags::compress(v)]))
            .collect(),
    )
}

fn parse_pairs(value: &Value) -> Result<Vec<(u64, Value)>, Error> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::MalformedEdit("expected an array of [index, value] pairs".into()))?;
    items
        .iter()
        .map(|item| {
            let pair = item
                .as_array()
                .filter(|p| p.len() == 2)
                .ok_or_else(|| Error::MalformedEdit("edit pair must be a 2-element array".into()))?;
            let index = as_u64(&pair[0])
                .ok_or_else(|| Error::MalformedEdit("edit pair index must be a uint".into()))?;
            Ok((index, pair[1].clone()))
        })
        .collect()
}

fn parse_indices(value: &Value) -> Result<Vec<u64>, Error> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::MalformedEdit("expected an array of indices".into()))?;
    items
        .iter()
        .map(|item| {
            as_u64(item).ok_or_else(|| Error::MalformedEdit("delete entry must be a uint".into()))
        })
        .collect()
}

/// Decompressed, index-validated edits, ready to apply against `prev` in one rebuild walk.
#[derive(Default)]
struct Edits {
    updates: HashMap<u64, Value>,
    deletes: HashSet<u64>,
    inserts: HashMap<u64, Vec<Value>>,
    prepends: HashMap<u64, Vec<Value>>,
}

fn build_edits(table: &IndexTable, script: &EditScript) -> Result<Edits, Error> {
    let mut edits = Edits::default();

    for (index, value) in &script.updates {
        let info = table
            .get(*index)
            .ok_or(Error::IndexOutOfRange { index: *index })?;
        if info.is_map_entry_marker {
            return Err(Error::WrongContainerKind {
                index: *index,
                expected: "a value or key position".into(),
                found: "a map entry marker".into(),
            });
        }
        edits.updates.insert(*index, tags::decompress(value)?);
    }

    for index in &script.deletes {
        let info = table
            .get(*index)
            .ok_or(Error::IndexOutOfRange { index: *index })?;
        if !(info.is_map_entry_marker || info.is_array_element) {
            return Err(Error::WrongContainerKind {
                index: *index,
                expected: "an array element or a map entry marker".into(),
                found: format!("{:?}", info.self_kind),
            });
        }
        edits.deletes.insert(*index);
    }

    for (index, payload) in &script.inserts {
        let info = table
            .get(*index)
            .ok_or(Error::IndexOutOfRange { index: *index })?;
        let decompressed = tags::decompress(payload)?;
        match info.self_kind {
            SelfKind::ArrayContainer => {
                edits.inserts.entry(*index).or_default().push(decompressed);
            }
            SelfKind::MapContainer => match &decompressed {
                Value::Array(pair) if pair.len() == 2 => {
                    edits.inserts.entry(*index).or_default().push(decompressed);
                }
                _ => {
                    return Err(Error::MalformedEdit(format!(
                        "insert payload for map index {index} must be a 2-element [key, value] array"
                    )))
                }
            },
            SelfKind::Scalar => {
                return Err(Error::WrongContainerKind {
                    index: *index,
                    expected: "an array or map container".into(),
                    found: "a scalar".into(),
                })
            }
        }
    }

    for (index, payload) in &script.prepends {
        let info = table
            .get(*index)
            .ok_or(Error::IndexOutOfRange { index: *index })?;
        if !info.is_array_element {
            return Err(Error::WrongContainerKind {
                index: *index,
                expected: "an array element (prepend is arrays-only)".into(),
                found: format!("{:?}", info.self_kind),
            });
        }
        edits
            .prepends
            .entry(*index)
            .or_default()
            .push(tags::decompress(payload)?);
    }

    Ok(edits)
}

/// Rebuilds `prev` against `script`, producing a fresh document. Never mutates `prev`.
pub fn apply(prev: &Value, script: &EditScript) -> Result<Value, Error> {
    let table = indexer::build(prev);
    let edits = build_edits(&table, script)?;
    let mut idx = 0u64;
    Ok(rebuild(prev, &mut idx, &edits))
}

fn rebuild(value: &Value, idx: &mut u64, edits: &Edits) -> Value {
    let this_idx = *idx;
    *idx += 1;

    let structural = match value {
        Value::Array(items) => Value::Array(rebuild_array_children(items, this_idx, idx, edits)),
        Value::Map(entries) => Value::Map(rebuild_map_children(entries, this_idx, idx, edits)),
        Value::Tag(n, inner) => match inner.as_ref() {
            Value::Array(items) => Value::Tag(
                *n,
                Box::new(Value::Array(rebuild_array_children(items, this_idx, idx, edits))),
            ),
            Value::Map(entries) => Value::Tag(
                *n,
                Box::new(Value::Map(rebuild_map_children(entries, this_idx, idx, edits))),
            ),
            _ => value.clone(),
        },
        _ => value.clone(),
    };

    match edits.updates.get(&this_idx) {
        Some(new_value) => new_value.clone(),
        None => structural,
    }
}

fn rebuild_array_children(
    items: &[Value],
    container_idx: u64,
    idx: &mut u64,
    edits: &Edits,
) -> Vec<Value> {
    let mut out = Vec::new();
    for item in items {
        let element_idx = *idx;
        let rebuilt = rebuild(item, idx, edits);
        if let Some(payloads) = edits.prepends.get(&element_idx) {
            out.extend(payloads.iter().cloned());
        }
        if !edits.deletes.contains(&element_idx) {
            out.push(rebuilt);
        }
    }
    if let Some(payloads) = edits.inserts.get(&container_idx) {
        out.extend(payloads.iter().cloned());
    }
    out
}

fn rebuild_map_children(
    entries: &[(Value, Value)],
    container_idx: u64,
    idx: &mut u64,
    edits: &Edits,
) -> Vec<(Value, Value)> {
    let mut out = Vec::new();
    for (k, v) in entries {
        let marker_idx = *idx;
        *idx += 1;
        let new_key = rebuild(k, idx, edits);
        let new_value = rebuild(v, idx, edits);
        if !edits.deletes.contains(&marker_idx) {
            out.push((new_key, new_value));
        }
    }
    if let Some(payloads) = edits.inserts.get(&container_idx) {
        for payload in payloads {
            if let Value::Array(pair) = payload {
                if pair.len() == 2 {
                    out.push((pair[0].clone(), pair[1].clone()));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Text(k.to_string()), v))
                .collect(),
        )
    }

    #[test]
    fn empty_script_is_identity() {
        let doc = map(vec![("type".into(), Value::Text("plc_operation".into()))]);
        let result = apply(&doc, &EditScript::default()).unwrap();
        assert_eq!(result, doc);
    }

    #[test]
    fn update_leaf_value() {
        let doc = map(vec![("n", Value::Integer(1.into()))]);
        // index 0 = map, 1 = marker, 2 = key "n", 3 = value 1
        let script = EditScript {
            updates: vec![(3, Value::Integer(99.into()))],
            ..Default::default()
        };
        let result = apply(&doc, &script).unwrap();
        assert_eq!(result, map(vec![("n", Value::Integer(99.into()))]));
    }

    #[test]
    fn delete_map_entry() {
        let doc = map(vec![
            ("a", Value::Integer(1.into())),
            ("b", Value::Integer(2.into())),
        ]);
        // entry marker for b is index 4
        let script = EditScript {
            deletes: vec![4],
            ..Default::default()
        };
        let result = apply(&doc, &script).unwrap();
        assert_eq!(result, map(vec![("a", Value::Integer(1.into()))]));
    }

    #[test]
    fn append_to_array() {
        let doc = map(vec![(
            "xs",
            Value::Array(vec![Value::Integer(1.into())]),
        )]);
        // 0 map,1 marker,2 key,3 array(=container),4 element 0
        let script = EditScript {
            inserts: vec![(3, Value::Integer(2.into()))],
            ..Default::default()
        };
        let result = apply(&doc, &script).unwrap();
        assert_eq!(
            result,
            map(vec![(
                "xs",
                Value::Array(vec![Value::Integer(1.into()), Value::Integer(2.into())])
            )])
        );
    }

    #[test]
    fn non_commutativity_guard() {
        // [x, y, z] at index C=0; delete x (idx1) and y (idx2) by original index.
        let doc = Value::Array(vec![
            Value::Text("x".into()),
            Value::Text("y".into()),
            Value::Text("z".into()),
        ]);
        let script = EditScript {
            deletes: vec![1, 2],
            ..Default::default()
        };
        let result = apply(&doc, &script).unwrap();
        assert_eq!(result, Value::Array(vec![Value::Text("z".into())]));
    }

    #[test]
    fn multiple_simultaneous_edits_s6() {
        // prev = {"x":[10,20,30]}
        // 0 map, 1 marker, 2 key "x", 3 array A, 4 E0(10), 5 E1(20), 6 E2(30)
        let doc = map(vec![(
            "x",
            Value::Array(vec![
                Value::Integer(10.into()),
                Value::Integer(20.into()),
                Value::Integer(30.into()),
            ]),
        )]);
        let script = EditScript {
            deletes: vec![5],
            inserts: vec![(3, Value::Integer(40.into()))],
            prepends: vec![(4, Value::Integer(5.into()))],
            ..Default::default()
        };
        let result = apply(&doc, &script).unwrap();
        assert_eq!(
            result,
            map(vec![(
                "x",
                Value::Array(vec![
                    Value::Integer(5.into()),
                    Value::Integer(10.into()),
                    Value::Integer(30.into()),
                    Value::Integer(40.into()),
                ])
            )])
        );
    }

    #[test]
    fn insert_against_scalar_is_wrong_container_kind() {
        let doc = map(vec![("n", Value::Integer(1.into()))]);
        let script = EditScript {
            inserts: vec![(3, Value::Integer(2.into()))], // index 3 is the scalar value
            ..Default::default()
        };
        assert!(matches!(
            apply(&doc, &script),
            Err(Error::WrongContainerKind { .. })
        ));
    }

    #[test]
    fn out_of_range_index_errors() {
        let doc = map(vec![("n", Value::Integer(1.into()))]);
        let script = EditScript {
            updates: vec![(999, Value::Integer(2.into()))],
            ..Default::default()
        };
        assert!(matches!(
            apply(&doc, &script),
            Err(Error::IndexOutOfRange { index: 999 })
        ));
    }
}
