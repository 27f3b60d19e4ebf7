//! Assigns stable integer indices to every structural node of a CBOR document in a
//! single pre-order walk, so a later document can be described as a diff against this one.
//!
//! Every scalar, array, map, and tag wrapper gets exactly one index, assigned in the
//! order the walk visits it; map entries additionally get an index for the entry marker
//! between the map and its key. The table built here is purely positional — it knows
//! nothing about diffs or edit scripts, only what kind of node sits at each index and what
//! role it plays in its parent.

use crate::value::Value;

/// What kind of container a node is, in its own right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfKind {
    Scalar,
    ArrayContainer,
    MapContainer,
}

/// Everything a diff needs to know about one index in order to validate an edit against it.
///
/// `self_kind` and the two role flags are independent: a node can simultaneously be the
/// container of its own children (`self_kind`) *and* an element of its parent array
/// (`is_array_element`) — a nested array is both at once, sharing one index.
#[derive(Debug, Clone, Copy)]
pub struct NodeInfo {
    pub self_kind: SelfKind,
    pub is_array_element: bool,
    pub is_map_entry_marker: bool,
}

/// The flat index → node-shape table produced by a single walk of a document.
#[derive(Debug, Clone)]
pub struct IndexTable {
    nodes: Vec<NodeInfo>,
}

impl IndexTable {
    pub fn get(&self, index: u64) -> Option<&NodeInfo> {
        self.nodes.get(index as usize)
    }

    pub fn max_index(&self) -> u64 {
        self.nodes.len().saturating_sub(1) as u64
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Walks `value` and builds its `IndexTable`.
pub fn build(value: &Value) -> IndexTable {
    let mut nodes = Vec::new();
    walk(value, false, &mut nodes);
    IndexTable { nodes }
}

fn walk(value: &Value, is_array_element: bool, out: &mut Vec<NodeInfo>) {
    match value {
        Value::Array(items) => {
            out.push(NodeInfo {
                self_kind: SelfKind::ArrayContainer,
                is_array_element,
                is_map_entry_marker: false,
            });
            for item in items {
                walk(item, true, out);
            }
        }
        Value::Map(entries) => {
            out.push(NodeInfo {
                self_kind: SelfKind::MapContainer,
                is_array_element,
                is_map_entry_marker: false,
            });
            for (k, v) in entries {
                out.push(NodeInfo {
                    self_kind: SelfKind::Scalar,
                    is_array_element: false,
                    is_map_entry_marker: true,
                });
                walk(k, false, out);
                walk(v, false, out);
            }
        }
        Value::Tag(_, inner) => match inner.as_ref() {
            Value::Array(_) | Value::Map(_) => walk(inner, is_array_element, out),
            _ => out.push(NodeInfo {
                self_kind: SelfKind::Scalar,
                is_array_element,
                is_map_entry_marker: false,
            }),
        },
        _ => out.push(NodeInfo {
            self_kind: SelfKind::Scalar,
            is_array_element,
            is_map_entry_marker: false,
        }),
    }
}
