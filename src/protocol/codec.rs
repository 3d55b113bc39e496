//! Wire Codec Module
//!
//! Field layout for the registration protocol payloads.
//!
//! A payload has two parts. The *named-field section* holds tagged fields
//! that decoders look up by tag, independent of write order. The *raw
//! trailing section* holds untagged data that must be read back in exactly
//! the order it was written; that ordering is a binary-compatibility
//! contract, and any mismatch surfaces as an unrecoverable
//! [`NearCacheError::EncodingFault`].
//!
//! Layout:
//! ```text
//! [u8 field_count]
//!   field_count * ( [u8 tag] [u8 type] [payload] )
//!     string payload: [u32 len][utf8 bytes]
//!     bool payload:   [u8 0|1]
//! [raw section bytes...]
//!     blob: [u32 len][bytes]
//!     u16:  [u16]
//! ```
//! All integers are big-endian.

use std::collections::HashMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{NearCacheError, Result};

// == Field Tags ==
/// Named-field tag for the distributed object name.
pub const TAG_NAME: u8 = b'n';
/// Named-field tag for the register/unregister flag.
pub const TAG_REGISTER: u8 = b'r';

// Field type markers.
const TYPE_STRING: u8 = 0;
const TYPE_BOOL: u8 = 1;

// == Field Value ==
/// A decoded named field.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue {
    Str(String),
    Bool(bool),
}

// == Payload Writer ==
/// Builds a payload: named fields first, then the raw trailing section.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    field_count: u8,
    named: BytesMut,
    raw: BytesMut,
}

impl PayloadWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a tagged string field.
    pub fn write_string_field(&mut self, tag: u8, value: &str) {
        self.bump_field_count();
        self.named.put_u8(tag);
        self.named.put_u8(TYPE_STRING);
        self.named.put_u32(value.len() as u32);
        self.named.put_slice(value.as_bytes());
    }

    /// Writes a tagged bool field.
    pub fn write_bool_field(&mut self, tag: u8, value: bool) {
        self.bump_field_count();
        self.named.put_u8(tag);
        self.named.put_u8(TYPE_BOOL);
        self.named.put_u8(u8::from(value));
    }

    // The count is a single u8 on the wire; the protocol writes a handful
    // of fields, anything past 255 is a programming error.
    fn bump_field_count(&mut self) {
        debug_assert!(self.field_count < u8::MAX, "named-field section overflow");
        self.field_count = self.field_count.saturating_add(1);
    }

    /// Appends a length-prefixed blob to the raw section.
    pub fn write_raw_blob(&mut self, blob: &[u8]) {
        self.raw.put_u32(blob.len() as u32);
        self.raw.put_slice(blob);
    }

    /// Appends a bare u16 to the raw section.
    pub fn write_raw_u16(&mut self, value: u16) {
        self.raw.put_u16(value);
    }

    /// Assembles the final payload.
    pub fn finish(self) -> Bytes {
        let mut out = BytesMut::with_capacity(1 + self.named.len() + self.raw.len());
        out.put_u8(self.field_count);
        out.extend_from_slice(&self.named);
        out.extend_from_slice(&self.raw);
        out.freeze()
    }
}

// == Payload Reader ==
/// Decodes a payload written by [`PayloadWriter`].
///
/// Named fields are resolved by tag in any order; raw reads consume the
/// trailing section strictly in the order it was written.
#[derive(Debug)]
pub struct PayloadReader {
    fields: HashMap<u8, FieldValue>,
    raw: Bytes,
}

impl PayloadReader {
    /// Parses the named-field section and positions the raw cursor.
    pub fn new(payload: Bytes) -> Result<Self> {
        let mut buf = payload;
        if buf.remaining() < 1 {
            return Err(truncated("field count"));
        }
        let field_count = buf.get_u8();

        let mut fields = HashMap::with_capacity(field_count as usize);
        for _ in 0..field_count {
            if buf.remaining() < 2 {
                return Err(truncated("field header"));
            }
            let tag = buf.get_u8();
            let field_type = buf.get_u8();
            let value = match field_type {
                TYPE_STRING => {
                    if buf.remaining() < 4 {
                        return Err(truncated("string length"));
                    }
                    let len = buf.get_u32() as usize;
                    if buf.remaining() < len {
                        return Err(truncated("string payload"));
                    }
                    let bytes = buf.copy_to_bytes(len);
                    let s = String::from_utf8(bytes.to_vec()).map_err(|_| {
                        NearCacheError::EncodingFault(format!(
                            "field 0x{:02x}: invalid utf-8",
                            tag
                        ))
                    })?;
                    FieldValue::Str(s)
                }
                TYPE_BOOL => {
                    if buf.remaining() < 1 {
                        return Err(truncated("bool payload"));
                    }
                    FieldValue::Bool(buf.get_u8() != 0)
                }
                other => {
                    return Err(NearCacheError::EncodingFault(format!(
                        "unknown field type {}",
                        other
                    )))
                }
            };
            fields.insert(tag, value);
        }

        Ok(Self { fields, raw: buf })
    }

    /// Reads a string field by tag.
    pub fn read_string_field(&self, tag: u8) -> Result<String> {
        match self.fields.get(&tag) {
            Some(FieldValue::Str(s)) => Ok(s.clone()),
            Some(_) => Err(wrong_type(tag, "string")),
            None => Err(missing(tag)),
        }
    }

    /// Reads a bool field by tag.
    pub fn read_bool_field(&self, tag: u8) -> Result<bool> {
        match self.fields.get(&tag) {
            Some(FieldValue::Bool(b)) => Ok(*b),
            Some(_) => Err(wrong_type(tag, "bool")),
            None => Err(missing(tag)),
        }
    }

    /// Reads the next length-prefixed blob from the raw section.
    pub fn read_raw_blob(&mut self) -> Result<Bytes> {
        if self.raw.remaining() < 4 {
            return Err(truncated("raw blob length"));
        }
        let len = self.raw.get_u32() as usize;
        if self.raw.remaining() < len {
            return Err(truncated("raw blob payload"));
        }
        Ok(self.raw.copy_to_bytes(len))
    }

    /// Reads the next bare u16 from the raw section.
    pub fn read_raw_u16(&mut self) -> Result<u16> {
        if self.raw.remaining() < 2 {
            return Err(truncated("raw u16"));
        }
        Ok(self.raw.get_u16())
    }
}

fn truncated(what: &str) -> NearCacheError {
    NearCacheError::EncodingFault(format!("truncated payload: {}", what))
}

fn missing(tag: u8) -> NearCacheError {
    NearCacheError::EncodingFault(format!("missing field 0x{:02x}", tag))
}

fn wrong_type(tag: u8, expected: &str) -> NearCacheError {
    NearCacheError::EncodingFault(format!("field 0x{:02x} is not a {}", tag, expected))
}
