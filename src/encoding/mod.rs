//! Value and level encodings.
//!
//! Each submodule holds an `encode`/`decode` pair for one scheme.
//! [`encode_values`] and [`decode_values`] pick the scheme from an
//! [`Encoding`] and the column's physical type. Dictionary encodings need
//! the chunk's dictionary and are driven by the page builder through
//! [`dictionary`] directly.

pub mod bit_util;
pub mod delta;
pub mod delta_bytes;
pub mod dictionary;
pub mod plain;
pub mod rle;

use crate::basic::{Encoding, PhysicalType};
use crate::error::EncodingError;
use crate::physical::PhysicalValue;

fn unsupported(encoding: Encoding, physical_type: PhysicalType) -> EncodingError {
    EncodingError::UnsupportedEncoding {
        encoding: encoding.to_string(),
        physical_type: physical_type.to_string(),
    }
}

fn mismatch(value: &PhysicalValue, physical_type: PhysicalType) -> EncodingError {
    EncodingError::InvalidData(format!("{} value in a {} column", value.physical_type(), physical_type))
}

/// Checks if `encoding` can encode values of `physical_type`.
pub fn supports(encoding: Encoding, physical_type: PhysicalType) -> bool {
    match encoding {
        Encoding::Plain => true,
        Encoding::PlainDictionary | Encoding::RleDictionary => physical_type != PhysicalType::Boolean,
        Encoding::Rle => physical_type == PhysicalType::Boolean,
        Encoding::DeltaBinaryPacked => matches!(physical_type, PhysicalType::Int32 | PhysicalType::Int64),
        Encoding::DeltaLengthByteArray => physical_type == PhysicalType::ByteArray,
        Encoding::DeltaByteArray => {
            matches!(physical_type, PhysicalType::ByteArray | PhysicalType::FixedLenByteArray)
        }
        Encoding::BitPacked | Encoding::ByteStreamSplit => false,
    }
}

/// Encodes the non-null values of a page.
pub fn encode_values(
    values: &[PhysicalValue],
    encoding: Encoding,
    physical_type: PhysicalType,
) -> Result<Vec<u8>, EncodingError> {
    if encoding.is_dictionary() || !supports(encoding, physical_type) {
        return Err(unsupported(encoding, physical_type));
    }

    match encoding {
        Encoding::Plain => plain::encode(values, physical_type),
        Encoding::Rle => {
            let bools = values
                .iter()
                .map(|v| match v {
                    PhysicalValue::Boolean(b) => Ok(*b),
                    other => Err(mismatch(other, physical_type)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rle::encode_booleans(&bools))
        }
        Encoding::DeltaBinaryPacked if physical_type == PhysicalType::Int32 => {
            let ints = values
                .iter()
                .map(|v| match v {
                    PhysicalValue::Int32(i) => Ok(*i),
                    other => Err(mismatch(other, physical_type)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(delta::encode_i32(&ints))
        }
        Encoding::DeltaBinaryPacked => {
            let ints = values
                .iter()
                .map(|v| match v {
                    PhysicalValue::Int64(i) => Ok(*i),
                    other => Err(mismatch(other, physical_type)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(delta::encode_i64(&ints))
        }
        Encoding::DeltaLengthByteArray | Encoding::DeltaByteArray => {
            let bytes = values
                .iter()
                .map(|v| match v {
                    PhysicalValue::ByteArray(b) | PhysicalValue::FixedLenByteArray(b)
                        if v.physical_type() == physical_type =>
                    {
                        Ok(b.as_slice())
                    }
                    other => Err(mismatch(other, physical_type)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            if encoding == Encoding::DeltaByteArray {
                Ok(delta_bytes::encode(&bytes))
            } else {
                Ok(delta_bytes::encode_lengths(&bytes))
            }
        }
        _ => Err(unsupported(encoding, physical_type)),
    }
}

/// Decodes `count` non-null values of a page.
///
/// Self-describing streams must hold exactly `count` values.
pub fn decode_values(
    data: &[u8],
    encoding: Encoding,
    physical_type: PhysicalType,
    type_length: Option<i32>,
    count: usize,
) -> Result<Vec<PhysicalValue>, EncodingError> {
    if encoding.is_dictionary() || !supports(encoding, physical_type) {
        return Err(unsupported(encoding, physical_type));
    }

    let values: Vec<PhysicalValue> = match encoding {
        Encoding::Plain => return plain::decode(data, physical_type, type_length, count),
        Encoding::Rle => rle::decode_booleans(data, count)?
            .into_iter()
            .map(PhysicalValue::Boolean)
            .collect(),
        Encoding::DeltaBinaryPacked if physical_type == PhysicalType::Int32 => {
            delta::decode_i32(data)?.0.into_iter().map(PhysicalValue::Int32).collect()
        }
        Encoding::DeltaBinaryPacked => delta::decode_i64(data)?.0.into_iter().map(PhysicalValue::Int64).collect(),
        Encoding::DeltaLengthByteArray => delta_bytes::decode_lengths(data)?
            .0
            .into_iter()
            .map(PhysicalValue::ByteArray)
            .collect(),
        Encoding::DeltaByteArray if physical_type == PhysicalType::FixedLenByteArray => {
            let len = plain::fixed_length(type_length)?;
            let values = delta_bytes::decode(data)?.0;
            if let Some(bad) = values.iter().find(|v| v.len() != len) {
                return Err(EncodingError::InvalidData(format!(
                    "{} byte value in a {len} byte fixed length column",
                    bad.len()
                )));
            }
            values.into_iter().map(PhysicalValue::FixedLenByteArray).collect()
        }
        Encoding::DeltaByteArray => delta_bytes::decode(data)?
            .0
            .into_iter()
            .map(PhysicalValue::ByteArray)
            .collect(),
        _ => return Err(unsupported(encoding, physical_type)),
    };

    if values.len() != count {
        return Err(EncodingError::InvalidData(format!(
            "{encoding} stream holds {} values, expected {count}",
            values.len()
        )));
    }
    Ok(values)
}
