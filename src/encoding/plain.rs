//! PLAIN encoding: fixed width little-endian values, length prefixed byte
//! arrays and booleans bit-packed LSB first.

use super::bit_util::{pack_bits, unpack_bits, ByteReader};
use crate::basic::PhysicalType;
use crate::error::EncodingError;
use crate::physical::{Int96, PhysicalValue};

/// Appends the PLAIN encoding of a single non-boolean value.
///
/// A lone boolean is written as one byte holding 0 or 1, which is also what
/// packing a single boolean produces.
pub fn encode_one(value: &PhysicalValue, out: &mut Vec<u8>) {
    match value {
        PhysicalValue::Boolean(v) => out.push(*v as u8),
        PhysicalValue::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
        PhysicalValue::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
        PhysicalValue::Int96(v) => out.extend_from_slice(&v.to_le_bytes()),
        PhysicalValue::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
        PhysicalValue::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
        PhysicalValue::ByteArray(v) => {
            out.extend_from_slice(&(v.len() as u32).to_le_bytes());
            out.extend_from_slice(v);
        }
        PhysicalValue::FixedLenByteArray(v) => out.extend_from_slice(v),
    }
}

/// Encodes `values`, which must all be of `physical_type`.
pub fn encode(values: &[PhysicalValue], physical_type: PhysicalType) -> Result<Vec<u8>, EncodingError> {
    if let Some(other) = values.iter().find(|v| v.physical_type() != physical_type) {
        return Err(EncodingError::InvalidData(format!(
            "{} value in a {} column",
            other.physical_type(),
            physical_type
        )));
    }

    match physical_type {
        PhysicalType::Boolean => {
            let bytes = reader.read_bytes(count.div_ceil(8))?;
            Ok(unpack_bits(bytes, 1, count)
                .into_iter()
                .map(|b| PhysicalValue::Boolean(b == 1))
                .collect())
        }
        PhysicalType::Int32 => read_each(reader, count, |r| Ok(PhysicalValue::Int32(i32::from_le_bytes(r.read_array()?)))),
        PhysicalType::Int64 => read_each(reader, count, |r| Ok(PhysicalValue::Int64(i64::from_le_bytes(r.read_array()?)))),
        PhysicalType::Int96 => read_each(reader, count, |r| Ok(PhysicalValue::Int96(Int96::from_le_bytes(r.read_array()?)))),
        PhysicalType::Float => read_each(reader, count, |r| Ok(PhysicalValue::Float(f32::from_le_bytes(r.read_array()?)))),
        PhysicalType::Double => read_each(reader, count, |r| Ok(PhysicalValue::Double(f64::from_le_bytes(r.read_array()?)))),
        PhysicalType::ByteArray => read_each(reader, count, |r| {
            let len = r.read_u32_le()? as usize;
            Ok(PhysicalValue::ByteArray(r.read_bytes(len)?.to_vec()))
        }),
        PhysicalType::FixedLenByteArray => {
            let len = fixed_length(type_length)?;
            read_each(reader, count, |r| Ok(PhysicalValue::FixedLenByteArray(r.read_bytes(len)?.to_vec())))
        }
    }
}

fn read_each<'a, F>(reader: &mut ByteReader<'a>, count: usize, mut read: F) -> Result<Vec<PhysicalValue>, EncodingError>
where
    F: FnMut(&mut ByteReader<'a>) -> Result<PhysicalValue, EncodingError>,
{
    let mut out = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        out.push(read(reader)?);
    }
    Ok(out)
}

pub(crate) fn fixed_length(type_length: Option<i32>) -> Result<usize, EncodingError> {
    match type_length {
        Some(len) if len > 0 => Ok(len as usize),
        other => Err(EncodingError::InvalidData(format!(
            "fixed length byte array needs a positive type length, found {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booleans_are_bit_packed() {
        let values: Vec<_> = [true, false, true, true, false, false, false, false, true]
            .into_iter()
            .map(PhysicalValue::Boolean)
            .collect();
        let encoded = encode(&values, PhysicalType::Boolean).unwrap();

        assert_eq!(encoded, vec![0b0000_1101, 0b0000_0001]);
        assert_eq!(decode(&encoded, PhysicalType::Boolean, None, 9).unwrap(), values);
    }

    #[test]
    fn test_byte_arrays_are_length_prefixed() {
        let values = vec![
            PhysicalValue::ByteArray(b"ab".to_vec()),
            PhysicalValue::ByteArray(vec![]),
        ];
        let encoded = encode(&values, PhysicalType::ByteArray).unwrap();

        assert_eq!(encoded, vec![2, 0, 0, 0, b'a', b'b', 0, 0, 0, 0]);
        assert_eq!(decode(&encoded, PhysicalType::ByteArray, None, 2).unwrap(), values);
    }

    #[test]
    fn test_fixed_width_little_endian() {
        let encoded = encode(&[PhysicalValue::Int32(1), PhysicalValue::Int32(-2)], PhysicalType::Int32).unwrap();
        assert_eq!(encoded, vec![1, 0, 0, 0, 0xfe, 0xff, 0xff, 0xff]);

        let fixed = vec![PhysicalValue::FixedLenByteArray(vec![1, 2, 3])];
        let encoded = encode(&fixed, PhysicalType::FixedLenByteArray).unwrap();
        assert_eq!(
            decode(&encoded, PhysicalType::FixedLenByteArray, Some(3), 1).unwrap(),
            fixed
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(encode(&[], PhysicalType::Double).unwrap().is_empty());
        assert!(decode(&[], PhysicalType::Double, None, 0).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_input() {
        let result = decode(&[1, 0, 0], PhysicalType::Int32, None, 1);
        assert_eq!(
            result,
            Err(EncodingError::TruncatedBuffer { offset: 0, needed: 1 })
        );
    }

    #[test]
    fn test_truncated_booleans() {
        let result = decode(&[0xff], PhysicalType::Boolean, None, 9);
        assert_eq!(
            result,
            Err(EncodingError::TruncatedBuffer { offset: 0, needed: 1 })
        );
        assert!(decode(&[], PhysicalType::FixedLenByteArray, None, 1).is_err());
    }

    #[test]
    fn test_mixed_types_rejected() {
        let result = encode(
            &[PhysicalValue::Int32(1), PhysicalValue::Int64(2)],
            PhysicalType::Int32,
        );
        assert!(matches!(result, Err(EncodingError::InvalidData(_))));
    }
}
