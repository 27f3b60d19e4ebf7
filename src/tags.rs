//! Semantic-tag substitution: rewrites known value shapes and key names to short tagged
//! forms and back.
//!
//! Value payloads are encoded with `base64` (`URL_SAFE_NO_PAD`) for signatures,
//! `multibase` for CIDs, and `bs58` for `did:key` material — the standard crate for each
//! encoding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use crate::error::Error;
use crate::value::Value;

const SIG_TAG: u64 = 6;
const CID_TAG: u64 = 7;
const DID_KEY_TAG: u64 = 8;
const AT_URI_TAG: u64 = 9;

const KEY_TAG_BASE: u64 = 10;
const KEY_TAG_MAX: u64 = 19;

const KEY_NAMES: &[&str] = &[
    "sig",                  // 10
    "prev",                 // 11
    "type",                 // 12
    "services",             // 13
    "alsoKnownAs",          // 14
    "rotationKeys",         // 15
    "verificationMethods",  // 16
    "atproto_pds",          // 17
    "endpoint",             // 18
    "atproto",              // 19
];

fn key_tag_for_name(name: &str) -> Option<u64> {
    KEY_NAMES
        .iter()
        .position(|&n| n == name)
        .map(|i| KEY_TAG_BASE + i as u64)
}

fn key_name_for_tag(tag: u64) -> Option<&'static str> {
    if (KEY_TAG_BASE..=KEY_TAG_MAX).contains(&tag) {
        KEY_NAMES.get((tag - KEY_TAG_BASE) as usize).copied()
    } else {
        None
    }
}

/// Replaces a map key with `tag(N, null)` if it names a known field, otherwise clones it
/// unchanged. Exposed for callers building edit-script insert/prepend payloads for a map
/// container who want the key compressed — compressing known keys is always optional.
pub fn compress_key(key: &Value) -> Value {
    if let Some(name) = key.as_text() {
        if let Some(tag) = key_tag_for_name(name) {
            return Value::Tag(tag, Box::new(Value::Null));
        }
    }
    key.clone()
}

/// Recursively rewrites every leaf value and map key in `value` to its compressed form.
pub fn compress(value: &Value) -> Value {
    match value {
        Value::Text(s) => compress_leaf_text(s).unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(compress).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (compress_key(k), compress(v)))
                .collect(),
        ),
        Value::Tag(n, inner) => Value::Tag(*n, Box::new(compress(inner))),
        other => other.clone(),
    }
}

fn compress_leaf_text(s: &str) -> Option<Value> {
    if s.len() == 86 {
        if let Ok(bytes) = URL_SAFE_NO_PAD.decode(s) {
            if bytes.len() == 64 {
                return Some(Value::Tag(SIG_TAG, Box::new(Value::Bytes(bytes))));
            }
        }
    }
    if s.len() == 59 && s.starts_with('b') {
        if let Ok((_, bytes)) = multibase::decode(s) {
            if bytes.len() == 36 {
                return Some(Value::Tag(CID_TAG, Box::new(Value::Bytes(bytes))));
            }
        }
    }
    if let Some(suffix) = s.strip_prefix("did:key:z") {
        if let Ok(bytes) = bs58::decode(suffix).into_vec() {
            if bytes.len() == 35 {
                return Some(Value::Tag(DID_KEY_TAG, Box::new(Value::Bytes(bytes))));
            }
        }
    }
    if let Some(suffix) = s.strip_prefix("at://") {
        return Some(Value::Tag(
            AT_URI_TAG,
            Box::new(Value::Text(suffix.to_string())),
        ));
    }
    None
}

/// Recursively reverses every compressed tag anywhere in `value`, whether it sits at a
/// map-key position or as a plain array element (e.g. the key slot of an `[key, value]`
/// map-insert payload) — tags 6..=19 are unambiguous wherever they appear.
pub fn decompress(value: &Value) -> Result<Value, Error> {
    match value {
        Value::Tag(n, inner) => decompress_tag(*n, inner),
        Value::Array(items) => Ok(Value::Array(
            items.iter().map(decompress).collect::<Result<_, _>>()?,
        )),
        Value::Map(entries) => {
            let mut out = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                out.push((decompress(k)?, decompress(v)?));
            }
            Ok(Value::Map(out))
        }
        other => Ok(other.clone()),
    }
}

fn decompress_tag(tag: u64, inner: &Value) -> Result<Value, Error> {
    match tag {
        SIG_TAG => {
            let bytes = inner.as_bytes().ok_or_else(|| Error::TagPayloadInvalid {
                tag,
                reason: "expected a byte string".into(),
            })?;
            if bytes.len() != 64 {
                return Err(Error::TagPayloadInvalid {
                    tag,
                    reason: format!("expected 64 bytes, got {}", bytes.len()),
                });
            }
            Ok(Value::Text(URL_SAFE_NO_PAD.encode(bytes)))
        }
        CID_TAG => {
            let bytes = inner.as_bytes().ok_or_else(|| Error::TagPayloadInvalid {
                tag,
                reason: "expected a byte string".into(),
            })?;
            if bytes.len() != 36 {
                return Err(Error::TagPayloadInvalid {
                    tag,
                    reason: format!("expected 36 bytes, got {}", bytes.len()),
                });
            }
            Ok(Value::Text(multibase::encode(
                multibase::Base::Base32Lower,
                bytes,
            )))
        }
        DID_KEY_TAG => {
            let bytes = inner.as_bytes().ok_or_else(|| Error::TagPayloadInvalid {
                tag,
                reason: "expected a byte string".into(),
            })?;
            if bytes.len() != 35 {
                return Err(Error::TagPayloadInvalid {
                    tag,
                    reason: format!("expected 35 bytes, got {}", bytes.len()),
                });
            }
            Ok(Value::Text(format!(
                "did:key:z{}",
                bs58::encode(bytes).into_string()
            )))
        }
        AT_URI_TAG => {
            let suffix = inner.as_text().ok_or_else(|| Error::TagPayloadInvalid {
                tag,
                reason: "expected a text string".into(),
            })?;
            Ok(Value::Text(format!("at://{suffix}")))
        }
        KEY_TAG_BASE..=KEY_TAG_MAX => {
            if !matches!(inner, Value::Null) {
                return Err(Error::TagPayloadInvalid {
                    tag,
                    reason: "key tag payload must be null".into(),
                });
            }
            let name = key_name_for_tag(tag).expect("tag in 10..=19 always has a name");
            Ok(Value::Text(name.to_string()))
        }
        other => Err(Error::TagPayloadInvalid {
            tag: other,
            reason: "not a known value tag (6..=9) or key tag (10..=19)".into(),
        }),
    }
}
