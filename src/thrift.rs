//! Thrift compact protocol, the serialization used for page headers and the
//! file footer.
//!
//! Only the subset the footer structures need is implemented: structs,
//! booleans, i32, i64, binary, lists and maps. Unknown fields are skipped.

use crate::encoding::bit_util::{write_uvarint, write_zigzag, ByteReader};
use crate::error::EncodingError;

/// Compact protocol type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    BoolTrue = 1,
    BoolFalse = 2,
    Byte = 3,
    I16 = 4,
    I32 = 5,
    I64 = 6,
    Double = 7,
    Binary = 8,
    List = 9,
    Set = 10,
    Map = 11,
    Struct = 12,
}

impl FieldType {
    fn from_nibble(nibble: u8) -> Result<Self, EncodingError> {
        Ok(match nibble {
            1 => FieldType::BoolTrue,
            2 => FieldType::BoolFalse,
            3 => FieldType::Byte,
            4 => FieldType::I16,
            5 => FieldType::I32,
            6 => FieldType::I64,
            7 => FieldType::Double,
            8 => FieldType::Binary,
            9 => FieldType::List,
            10 => FieldType::Set,
            11 => FieldType::Map,
            12 => FieldType::Struct,
            other => return Err(EncodingError::InvalidData(format!("unknown thrift type {other}"))),
        })
    }
}

/// Nesting bound for skipped values.
const MAX_DEPTH: usize = 64;

/// Serializes into an in-memory buffer.
#[derive(Debug, Default)]
pub struct CompactWriter {
    buf: Vec<u8>,
    last_field: Vec<i16>,
    current: i16,
}

impl CompactWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn struct_begin(&mut self) {
        self.last_field.push(self.current);
        self.current = 0;
    }

    pub fn struct_end(&mut self) {
        self.buf.push(0);
        self.current = self.last_field.pop().unwrap_or(0);
    }

    fn field_header(&mut self, id: i16, field_type: FieldType) {
        let delta = id - self.current;
        if (1..=15).contains(&delta) {
            self.buf.push(((delta as u8) << 4) | field_type as u8);
        } else {
            self.buf.push(field_type as u8);
            write_zigzag(id as i64, &mut self.buf);
        }
        self.current = id;
    }

    pub fn field_bool(&mut self, id: i16, value: bool) {
        let t = if value { FieldType::BoolTrue } else { FieldType::BoolFalse };
        self.field_header(id, t);
    }

    pub fn field_i32(&mut self, id: i16, value: i32) {
        self.field_header(id, FieldType::I32);
        self.i32(value);
    }

    pub fn field_i64(&mut self, id: i16, value: i64) {
        self.field_header(id, FieldType::I64);
        write_zigzag(value, &mut self.buf);
    }

    pub fn field_binary(&mut self, id: i16, value: &[u8]) {
        self.field_header(id, FieldType::Binary);
        self.binary(value);
    }

    /// Header of a nested struct field. The struct body follows, framed by
    /// [`struct_begin`](Self::struct_begin) and [`struct_end`](Self::struct_end).
    pub fn field_struct(&mut self, id: i16) {
        self.field_header(id, FieldType::Struct);
    }

    /// Starts a list field of `len` elements of `element_type`.
    pub fn field_list_begin(&mut self, id: i16, element_type: FieldType, len: usize) {
        self.field_header(id, FieldType::List);
        self.list_begin(element_type, len);
    }

    pub fn list_begin(&mut self, element_type: FieldType, len: usize) {
        if len < 15 {
            self.buf.push(((len as u8) << 4) | element_type as u8);
        } else {
            self.buf.push(0xf0 | element_type as u8);
            write_uvarint(len as u64, &mut self.buf);
        }
    }

    pub fn i32(&mut self, value: i32) {
        write_zigzag(value as i64, &mut self.buf);
    }

    pub fn binary(&mut self, value: &[u8]) {
        write_uvarint(value.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(value);
    }
}

/// Header of the next field in a struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    pub id: i16,
    pub field_type: FieldType,
}

/// Deserializes from a byte slice.
#[derive(Debug, Clone)]
pub struct CompactReader<'a> {
    reader: ByteReader<'a>,
    last_field: Vec<i16>,
    current: i16,
}

impl<'a> CompactReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(data),
            last_field: vec![],
            current: 0,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    pub fn struct_begin(&mut self) {
        self.last_field.push(self.current);
        self.current = 0;
    }

    pub fn struct_end(&mut self) {
        self.current = self.last_field.pop().unwrap_or(0);
    }

    /// Reads the next field header, or `None` at the end of the struct.
    pub fn field_header(&mut self) -> Result<Option<FieldHeader>, EncodingError> {
        let byte = self.reader.read_u8()?;
        if byte == 0 {
            return Ok(None);
        }
        let field_type = FieldType::from_nibble(byte & 0x0f)?;
        let delta = (byte >> 4) as i16;
        let id = if delta == 0 {
            self.read_i16()?
        } else {
            self.current
                .checked_add(delta)
                .ok_or_else(|| EncodingError::InvalidData("thrift field id overflow".to_string()))?
        };
        self.current = id;
        Ok(Some(FieldHeader { id, field_type }))
    }

    fn read_i16(&mut self) -> Result<i16, EncodingError> {
        let v = self.reader.read_zigzag()?;
        i16::try_from(v).map_err(|_| EncodingError::InvalidData(format!("thrift i16 {v} out of range")))
    }

    /// Value of a boolean field, which lives in its header.
    pub fn bool_of(header: FieldHeader) -> Result<bool, EncodingError> {
        match header.field_type {
            FieldType::BoolTrue => Ok(true),
            FieldType::BoolFalse => Ok(false),
            other => Err(EncodingError::InvalidData(format!("expected bool, found {other:?}"))),
        }
    }

    pub fn i32(&mut self) -> Result<i32, EncodingError> {
        let v = self.reader.read_zigzag()?;
        i32::try_from(v).map_err(|_| EncodingError::InvalidData(format!("thrift i32 {v} out of range")))
    }

    pub fn i64(&mut self) -> Result<i64, EncodingError> {
        self.reader.read_zigzag()
    }

    pub fn binary(&mut self) -> Result<Vec<u8>, EncodingError> {
        let len = self.reader.read_uvarint()? as usize;
        Ok(self.reader.read_bytes(len)?.to_vec())
    }

    pub fn string(&mut self) -> Result<String, EncodingError> {
        String::from_utf8(self.binary()?)
            .map_err(|e| EncodingError::InvalidData(format!("thrift string is not utf8: {e}")))
    }

    /// Reads a list header, returning the element type and length.
    pub fn list_begin(&mut self) -> Result<(FieldType, usize), EncodingError> {
        let byte = self.reader.read_u8()?;
        let element_type = FieldType::from_nibble(byte & 0x0f)?;
        let short = (byte >> 4) as usize;
        let len = if short == 15 {
            self.reader.read_uvarint()? as usize
        } else {
            short
        };
        if len > self.reader.remaining() {
            return Err(EncodingError::TruncatedBuffer {
                offset: self.reader.position(),
                needed: len - self.reader.remaining(),
            });
        }
        Ok((element_type, len))
    }

    /// Skips a value of `field_type`.
    pub fn skip(&mut self, field_type: FieldType) -> Result<(), EncodingError> {
        self.skip_depth(field_type, 0)
    }

    fn skip_depth(&mut self, field_type: FieldType, depth: usize) -> Result<(), EncodingError> {
        if depth > MAX_DEPTH {
            return Err(EncodingError::InvalidData("thrift nesting too deep".to_string()));
        }
        match field_type {
            FieldType::BoolTrue | FieldType::BoolFalse => Ok(()),
            FieldType::Byte => self.reader.read_u8().map(drop),
            FieldType::I16 | FieldType::I32 | FieldType::I64 => self.reader.read_uvarint().map(drop),
            FieldType::Double => self.reader.read_bytes(8).map(drop),
            FieldType::Binary => self.binary().map(drop),
            FieldType::List | FieldType::Set => {
                let (element_type, len) = self.list_begin()?;
                for _ in 0..len {
                    self.skip_element(element_type, depth + 1)?;
                }
                Ok(())
            }
            FieldType::Map => {
                let len = self.reader.read_uvarint()? as usize;
                if len == 0 {
                    return Ok(());
                }
                let types = self.reader.read_u8()?;
                let key = FieldType::from_nibble(types >> 4)?;
                let value = FieldType::from_nibble(types & 0x0f)?;
                for _ in 0..len {
                    self.skip_element(key, depth + 1)?;
                    self.skip_element(value, depth + 1)?;
                }
                Ok(())
            }
            FieldType::Struct => {
                self.struct_begin();
                while let Some(header) = self.field_header()? {
                    self.skip_depth(header.field_type, depth + 1)?;
                }
                self.struct_end();
                Ok(())
            }
        }
    }

    /// Booleans inside collections take a full byte.
    fn skip_element(&mut self, element_type: FieldType, depth: usize) -> Result<(), EncodingError> {
        match element_type {
            FieldType::BoolTrue | FieldType::BoolFalse => self.reader.read_u8().map(drop),
            other => self.skip_depth(other, depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_field_headers() {
        let mut w = CompactWriter::new();
        w.struct_begin();
        w.field_i32(1, 3);
        w.field_i64(2, -1);
        w.field_bool(4, true);
        w.struct_end();
        let bytes = w.into_inner();

        assert_eq!(bytes, vec![0x15, 6, 0x16, 1, 0x21, 0]);

        let mut r = CompactReader::new(&bytes);
        r.struct_begin();
        let h = r.field_header().unwrap().unwrap();
        assert_eq!((h.id, h.field_type), (1, FieldType::I32));
        assert_eq!(r.i32().unwrap(), 3);
        let h = r.field_header().unwrap().unwrap();
        assert_eq!(r.i64().unwrap(), -1, "field {}", h.id);
        let h = r.field_header().unwrap().unwrap();
        assert_eq!(h.id, 4);
        assert!(CompactReader::bool_of(h).unwrap());
        assert_eq!(r.field_header().unwrap(), None);
    }

    #[test]
    fn test_long_field_delta() {
        let mut w = CompactWriter::new();
        w.struct_begin();
        w.field_i32(20, 1);
        w.struct_end();
        let bytes = w.into_inner();

        assert_eq!(bytes[0], FieldType::I32 as u8, "Delta above 15 falls back to an explicit id");
        let mut r = CompactReader::new(&bytes);
        r.struct_begin();
        assert_eq!(r.field_header().unwrap().unwrap().id, 20);
    }

    #[test]
    fn test_skip_unknown_fields() {
        let mut w = CompactWriter::new();
        w.struct_begin();
        w.field_list_begin(1, FieldType::Binary, 20);
        for i in 0..20 {
            w.binary(format!("item{i}").as_bytes());
        }
        w.field_struct(2);
        w.struct_begin();
        w.field_bool(1, false);
        w.field_binary(2, b"nested");
        w.struct_end();
        w.field_i32(3, 42);
        w.struct_end();
        let bytes = w.into_inner();

        let mut r = CompactReader::new(&bytes);
        r.struct_begin();
        let mut found = None;
        while let Some(h) = r.field_header().unwrap() {
            if h.id == 3 {
                found = Some(r.i32().unwrap());
            } else {
                r.skip(h.field_type).unwrap();
            }
        }
        assert_eq!(found, Some(42));
        assert_eq!(r.position(), bytes.len());
    }

    #[test]
    fn test_truncated_struct() {
        let mut r = CompactReader::new(&[0x15]);
        r.struct_begin();
        r.field_header().unwrap();
        assert!(r.i32().is_err());
    }
}
