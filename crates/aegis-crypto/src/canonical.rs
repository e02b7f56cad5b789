// Path: crates/aegis-crypto/src/canonical.rs
//! In-house canonical encoding for signed payloads (§4.6).
//!
//! A general-purpose serializer's key order is an implementation detail,
//! not a contract: `serde_json` preserves insertion order unless paired
//! with a `BTreeMap`, and nothing stops a future field reorder from
//! silently changing the bytes a signature covers. This module instead
//! captures any `Serialize` value into an explicit [`CanonicalValue`] tree
//! — object keys held in a `BTreeMap` — and walks that tree to emit
//! deterministic bytes, so sorted-key, no-whitespace, integers-only output
//! is structural rather than incidental.
//!
//! The signature field itself is never part of this encoding: callers pass
//! the dedicated `Unsigned*` view type (`UnsignedEnvelope`, `UnsignedManifest`,
//! ...), which has no `signature` field to accidentally include.

use crate::error::CryptoError;
use serde::ser::{
    self, Serialize, SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant,
    SerializeTuple, SerializeTupleStruct, SerializeTupleVariant,
};
use std::collections::BTreeMap;
use std::fmt;

/// A captured, order-independent value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Array(Vec<CanonicalValue>),
    Object(BTreeMap<String, CanonicalValue>),
}

/// An error encountered while capturing a value into a [`CanonicalValue`]
/// tree — either a serde-reported failure or an explicitly unsupported
/// shape (floats: §4.6 requires integers, never floating point).
#[derive(Debug, Clone)]
pub struct CanonicalEncodeError(String);

impl fmt::Display for CanonicalEncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "canonical encoding error: {}", self.0)
    }
}

impl std::error::Error for CanonicalEncodeError {}

impl ser::Error for CanonicalEncodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        CanonicalEncodeError(msg.to_string())
    }
}

/// Captures any `Serialize` value into a [`CanonicalValue`] tree.
pub fn to_canonical_value<T: Serialize>(value: &T) -> Result<CanonicalValue, CanonicalEncodeError> {
    value.serialize(ValueSerializer)
}

/// Captures `value` and emits its deterministic canonical-encoding bytes,
/// ready to hash or sign.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CryptoError> {
    let tree = to_canonical_value(value)
        .map_err(|e| CryptoError::OperationFailed(format!("canonical encode failed: {}", e)))?;
    let mut out = Vec::new();
    write_value(&tree, &mut out);
    Ok(out)
}

fn write_value(value: &CanonicalValue, out: &mut Vec<u8>) {
    match value {
        CanonicalValue::Null => out.extend_from_slice(b"null"),
        CanonicalValue::Bool(true) => out.extend_from_slice(b"true"),
        CanonicalValue::Bool(false) => out.extend_from_slice(b"false"),
        CanonicalValue::Integer(n) => out.extend_from_slice(n.to_string().as_bytes()),
        CanonicalValue::String(s) => write_string(s, out),
        CanonicalValue::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out);
            }
            out.push(b']');
        }
        CanonicalValue::Object(fields) => {
            out.push(b'{');
            for (i, (key, val)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(key, out);
                out.push(b':');
                write_value(val, out);
            }
            out.push(b'}');
        }
    }
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes())
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = CanonicalValue;
    type Error = CanonicalEncodeError;

    type SerializeSeq = SeqCapture;
    type SerializeTuple = SeqCapture;
    type SerializeTupleStruct = SeqCapture;
    type SerializeTupleVariant = SeqCapture;
    type SerializeMap = MapCapture;
    type SerializeStruct = MapCapture;
    type SerializeStructVariant = MapCapture;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(v as i64)
    }
    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(v as i64)
    }
    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(v as i64)
    }
    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(v as i64)
    }
    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(v as i64)
    }
    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(v as i64)
    }
    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        i64::try_from(v)
            .map(CanonicalValue::Integer)
            .map_err(|_| CanonicalEncodeError("u64 value exceeds i64 range".into()))
    }

    fn serialize_f32(self, _v: f32) -> Result<Self::Ok, Self::Error> {
        Err(CanonicalEncodeError(
            "floating point values are not permitted in canonical encoding".into(),
        ))
    }
    fn serialize_f64(self, _v: f64) -> Result<Self::Ok, Self::Error> {
        Err(CanonicalEncodeError(
            "floating point values are not permitted in canonical encoding".into(),
        ))
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::String(hex::encode(v)))
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        let mut map = BTreeMap::new();
        map.insert(variant.to_string(), to_canonical_value(value)?);
        Ok(CanonicalValue::Object(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Ok(SeqCapture(Vec::with_capacity(len.unwrap_or(0))))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(MapCapture {
            fields: BTreeMap::new(),
            pending_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(MapCapture {
            fields: BTreeMap::new(),
            pending_key: None,
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Ok(MapCapture {
            fields: BTreeMap::new(),
            pending_key: None,
        })
    }
}

struct SeqCapture(Vec<CanonicalValue>);

impl SerializeSeq for SeqCapture {
    type Ok = CanonicalValue;
    type Error = CanonicalEncodeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        self.0.push(to_canonical_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Array(self.0))
    }
}

impl SerializeTuple for SeqCapture {
    type Ok = CanonicalValue;
    type Error = CanonicalEncodeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        SerializeSeq::end(self)
    }
}

impl SerializeTupleStruct for SeqCapture {
    type Ok = CanonicalValue;
    type Error = CanonicalEncodeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        SerializeSeq::end(self)
    }
}

impl SerializeTupleVariant for SeqCapture {
    type Ok = CanonicalValue;
    type Error = CanonicalEncodeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        SerializeSeq::end(self)
    }
}

struct MapCapture {
    fields: BTreeMap<String, CanonicalValue>,
    pending_key: Option<String>,
}

impl SerializeMap for MapCapture {
    type Ok = CanonicalValue;
    type Error = CanonicalEncodeError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Self::Error> {
        let key_value = to_canonical_value(key)?;
        let key_string = match key_value {
            CanonicalValue::String(s) => s,
            other => return Err(CanonicalEncodeError(format!(
                "map keys must serialize to strings, got {:?}",
                other
            ))),
        };
        self.pending_key = Some(key_string);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| CanonicalEncodeError("map value serialized before its key".into()))?;
        self.fields.insert(key, to_canonical_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Object(self.fields))
    }
}

impl SerializeStruct for MapCapture {
    type Ok = CanonicalValue;
    type Error = CanonicalEncodeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.fields.insert(key.to_string(), to_canonical_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Object(self.fields))
    }
}

impl SerializeStructVariant for MapCapture {
    type Ok = CanonicalValue;
    type Error = CanonicalEncodeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.fields.insert(key.to_string(), to_canonical_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Object(self.fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Inner {
        b: i64,
        a: i64,
    }

    #[derive(Serialize)]
    struct Outer {
        z: Inner,
        a: String,
    }

    #[test]
    fn sorts_object_keys_regardless_of_declaration_order() {
        let value = Outer {
            z: Inner { b: 2, a: 1 },
            a: "hello".to_string(),
        };
        let bytes = canonical_bytes(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":"hello","z":{"a":1,"b":2}}"#
        );
    }

    #[test]
    fn escapes_control_characters_in_strings() {
        let bytes = canonical_bytes(&"line\nbreak\tand\"quote".to_string()).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#""line\nbreak\tand\"quote""#
        );
    }

    #[test]
    fn two_field_orderings_of_the_same_data_encode_identically() {
        #[derive(Serialize)]
        struct AB {
            a: i64,
            b: i64,
        }
        #[derive(Serialize)]
        struct BA {
            b: i64,
            a: i64,
        }
        let ab = canonical_bytes(&AB { a: 1, b: 2 }).unwrap();
        let ba = canonical_bytes(&BA { b: 2, a: 1 }).unwrap();
        assert_eq!(ab, ba);
    }
}
