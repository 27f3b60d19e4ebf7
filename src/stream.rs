//! Frames the outer `[full_op, diff_1, …]` CBOR array and orchestrates TagCodec and
//! DiffApplier in both directions.
//!
//! Decoding peels one frame off the array at a time: the first frame is a full document,
//! each frame after that is an edit script applied against the document the previous
//! frame produced, so the running `prev` document is threaded through the whole chain.

use tracing::debug;

use crate::diff::{self, EditScript};
use crate::error::Error;
use crate::tags;
use crate::value::Value;

/// Compresses a first document plus a caller-supplied chain of edit scripts into a single
/// CBOR-framed byte stream. Diff *computation* is out of scope — callers hand in edit
/// scripts already produced against their own previous/next document pairs.
pub fn encode(first: &Value, diffs: &[EditScript]) -> Result<Vec<u8>, Error> {
    debug!(diff_count = diffs.len(), "encoding PLC operation chain");

    let mut items = Vec::with_capacity(1 + diffs.len());
    items.push(tags::compress(first));
    for script in diffs {
        items.push(script.to_compressed_value());
    }

    let stream = Value::Array(items);
    let mut buf = Vec::new();
    ciborium::ser::into_writer(&stream, &mut buf)
        .map_err(|e| Error::MalformedCbor(e.to_string()))?;
    Ok(buf)
}

/// Decodes a compressed stream back into the full sequence of documents it represents.
/// Errors are wrapped with the zero-based index of the document in the chain that failed;
/// no partial document is yielded for a failing step.
pub fn decode(bytes: &[u8]) -> Result<Vec<Value>, Error> {
    let parsed: Value =
        ciborium::de::from_reader(bytes).map_err(|e| Error::MalformedCbor(e.to_string()))?;
    let items = match parsed {
        Value::Array(items) => items,
        other => {
            return Err(Error::MalformedCbor(format!(
                "outer stream must be a CBOR array, got {other:?}"
            )))
        }
    };

    let mut iter = items.into_iter();
    let first_raw = iter
        .next()
        .ok_or_else(|| Error::MalformedCbor("empty stream".into()))?;
    let first = tags::decompress(&first_raw).map_err(|e| e.at_document(0))?;

    let mut docs = Vec::with_capacity(1);
    docs.push(first.clone());
    let mut prev = first;

    for (position, raw_script) in iter.enumerate() {
        let doc_index = position + 1;
        let script = EditScript::from_value(&raw_script).map_err(|e| e.at_document(doc_index))?;
        let next = diff::apply(&prev, &script).map_err(|e| e.at_document(doc_index))?;
        docs.push(next.clone());
        prev = next;
    }

    debug!(document_count = docs.len(), "decoded PLC operation chain");
    Ok(docs)
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
    fn round_trips_a_single_document() {
        let doc = map(vec![("type", Value::Text("plc_operation".into()))]);
        let bytes = encode(&doc, &[]).unwrap();
        let docs = decode(&bytes).unwrap();
        assert_eq!(docs, vec![doc]);
    }

    #[test]
    fn round_trips_a_chain_with_a_diff() {
        let d0 = map(vec![("n", Value::Integer(1.into()))]);
        // 0 map,1 marker,2 key,3 value
        let script = EditScript {
            updates: vec![(3, Value::Integer(2.into()))],
            ..Default::default()
        };
        let bytes = encode(&d0, std::slice::from_ref(&script)).unwrap();
        let docs = decode(&bytes).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0], d0);
        assert_eq!(docs[1], map(vec![("n", Value::Integer(2.into()))]));
    }

    #[test]
    fn decode_error_reports_chain_position() {
        // A stream whose second element is not a valid edit-script map.
        let stream = Value::Array(vec![
            map(vec![("n", Value::Integer(1.into()))]),
            Value::Integer(7.into()),
        ]);
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&stream, &mut buf).unwrap();
        let err = decode(&buf).unwrap_err();
        match err {
            Error::Chained { index, .. } => assert_eq!(index, 1),
            other => panic!("expected Chained error, got {other:?}"),
        }
    }

    #[test]
    fn empty_stream_is_malformed() {
        let stream = Value::Array(vec![]);
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&stream, &mut buf).unwrap();
        assert!(matches!(decode(&buf), Err(Error::MalformedCbor(_))));
    }
}
