//! Conversion between host [`Value`]s and their physical representation for
//! a given leaf column.

use crate::basic::{ConvertedType, PhysicalType};
use crate::descriptor::ColumnDescriptor;
use crate::error::{EncodingError, ShredError};
use crate::physical::{Int96, PhysicalValue};
use crate::value::{Decimal, Value};

fn mismatch(column: &ColumnDescriptor, expected: &str, found: &Value) -> ShredError {
    ShredError::ValueTypeMismatch {
        path: column.external_path().to_string(),
        expected: expected.to_string(),
        found: found.type_label().to_string(),
    }
}

fn out_of_range(column: &ColumnDescriptor, value: impl ToString) -> ShredError {
    ShredError::OutOfRange {
        path: column.external_path().to_string(),
        value: value.to_string(),
    }
}

/// Converts a non-null host value to the physical type of `column`.
///
/// Integers are range checked against the column's logical width, unsigned
/// values are bit-reinterpreted into the signed physical width, timestamps
/// are converted to the column's unit and decimals are rescaled to the
/// column's scale.
pub fn to_physical(value: &Value, column: &ColumnDescriptor) -> Result<PhysicalValue, ShredError> {
    let converted = column.converted_type();
    if converted == Some(ConvertedType::Decimal) {
        return decimal_to_physical(value, column);
    }

    match column.physical_type() {
        PhysicalType::Boolean => match value {
            Value::Boolean(b) => Ok(PhysicalValue::Boolean(*b)),
            other => Err(mismatch(column, "Boolean", other)),
        },
        PhysicalType::Int32 => {
            let (lo, hi): (i64, i64) = match converted {
                Some(ConvertedType::Int8) => (i8::MIN as i64, i8::MAX as i64),
                Some(ConvertedType::Int16) => (i16::MIN as i64, i16::MAX as i64),
                Some(ConvertedType::Uint8) => (0, u8::MAX as i64),
                Some(ConvertedType::Uint16) => (0, u16::MAX as i64),
                Some(ConvertedType::Uint32) => (0, u32::MAX as i64),
                _ => (i32::MIN as i64, i32::MAX as i64),
            };
            let v = match value {
                Value::Int(i) => *i,
                Value::UInt(u) => i64::try_from(*u).map_err(|_| out_of_range(column, u))?,
                Value::Date(d) if converted == Some(ConvertedType::Date) => *d as i64,
                other => return Err(mismatch(column, "Int", other)),
            };
            if v < lo || v > hi {
                return Err(out_of_range(column, v));
            }
            Ok(PhysicalValue::Int32(v as u32 as i32))
        }
        PhysicalType::Int64 => {
            let v = match (converted, value) {
                (Some(ConvertedType::TimestampMillis), Value::Timestamp(us)) => us.div_euclid(1000),
                (Some(ConvertedType::TimestampMicros), Value::Timestamp(us)) => *us,
                (Some(ConvertedType::Uint64), Value::UInt(u)) => *u as i64,
                (Some(ConvertedType::Uint64), Value::Int(i)) if *i < 0 => {
                    return Err(out_of_range(column, i))
                }
                (_, Value::Int(i)) => *i,
                (_, Value::UInt(u)) => i64::try_from(*u).map_err(|_| out_of_range(column, u))?,
                (_, other) => return Err(mismatch(column, "Int", other)),
            };
            Ok(PhysicalValue::Int64(v))
        }
        PhysicalType::Int96 => match value {
            Value::Timestamp(us) => Int96::from_micros(*us)
                .map(PhysicalValue::Int96)
                .ok_or_else(|| out_of_range(column, us)),
            other => Err(mismatch(column, "Timestamp", other)),
        },
        PhysicalType::Float => match value {
            Value::Float(f) => Ok(PhysicalValue::Float(*f)),
            Value::Double(d) => Ok(PhysicalValue::Float(*d as f32)),
            other => Err(mismatch(column, "Float", other)),
        },
        PhysicalType::Double => match value {
            Value::Double(d) => Ok(PhysicalValue::Double(*d)),
            Value::Float(f) => Ok(PhysicalValue::Double(*f as f64)),
            Value::Int(i) => Ok(PhysicalValue::Double(*i as f64)),
            other => Err(mismatch(column, "Double", other)),
        },
        PhysicalType::ByteArray => match value {
            Value::String(s) => Ok(PhysicalValue::ByteArray(s.as_bytes().to_vec())),
            Value::Bytes(b) => Ok(PhysicalValue::ByteArray(b.clone())),
            other => Err(mismatch(column, "String", other)),
        },
        PhysicalType::FixedLenByteArray => {
            let bytes = match value {
                Value::Bytes(b) => b.clone(),
                Value::String(s) => s.as_bytes().to_vec(),
                other => return Err(mismatch(column, "Bytes", other)),
            };
            let expected = column.type_length().unwrap_or(0) as usize;
            if bytes.len() != expected {
                return Err(out_of_range(
                    column,
                    format!("{} bytes, expected {expected}", bytes.len()),
                ));
            }
            Ok(PhysicalValue::FixedLenByteArray(bytes))
        }
    }
}

fn decimal_to_physical(value: &Value, column: &ColumnDescriptor) -> Result<PhysicalValue, ShredError> {
    let primitive = column.primitive();
    let scale = primitive.scale().unwrap_or(0) as u32;
    let precision = primitive.precision().unwrap_or(38) as u32;

    let decimal = match value {
        Value::Decimal(d) => d.rescale(scale),
        Value::Int(i) => Decimal::new(*i as i128, 0).rescale(scale),
        Value::Double(d) => Decimal::from_f64(*d, scale),
        Value::Float(f) => Decimal::from_f64(*f as f64, scale),
        Value::String(s) => Decimal::parse(s).and_then(|d| d.rescale(scale)),
        other => return Err(mismatch(column, "Decimal", other)),
    }
    .ok_or_else(|| out_of_range(column, value))?;

    let unscaled = decimal.unscaled();
    if precision < 39 && unscaled.unsigned_abs() >= 10u128.pow(precision) {
        return Err(out_of_range(column, decimal));
    }

    match column.physical_type() {
        PhysicalType::Int32 => i32::try_from(unscaled)
            .map(PhysicalValue::Int32)
            .map_err(|_| out_of_range(column, decimal)),
        PhysicalType::Int64 => i64::try_from(unscaled)
            .map(PhysicalValue::Int64)
            .map_err(|_| out_of_range(column, decimal)),
        PhysicalType::ByteArray => Ok(PhysicalValue::ByteArray(i128_to_be_bytes(unscaled, None))),
        PhysicalType::FixedLenByteArray => {
            let len = column.type_length().unwrap_or(0) as usize;
            let bytes = i128_to_be_bytes(unscaled, Some(len));
            if bytes.len() != len {
                return Err(out_of_range(column, decimal));
            }
            Ok(PhysicalValue::FixedLenByteArray(bytes))
        }
        other => Err(ShredError::ValueTypeMismatch {
            path: column.external_path().to_string(),
            expected: "DECIMAL base type".to_string(),
            found: other.to_string(),
        }),
    }
}

/// Big-endian two's complement bytes. Without a width the shortest
/// encoding which preserves the sign is produced, otherwise the value is
/// sign-extended to `width` bytes (or returned shortest if it does not fit).
pub fn i128_to_be_bytes(value: i128, width: Option<usize>) -> Vec<u8> {
    let full = value.to_be_bytes();
    let sign = if value < 0 { 0xff } else { 0x00 };
    let mut start = 0;
    while start < full.len() - 1 && full[start] == sign && (full[start + 1] & 0x80) == (sign & 0x80) {
        start += 1;
    }
    let minimal = &full[start..];
    match width {
        Some(w) if w >= minimal.len() => {
            let mut out = vec![sign; w - minimal.len()];
            out.extend_from_slice(minimal);
            out
        }
        _ => minimal.to_vec(),
    }
}

/// Sign-extends big-endian two's complement bytes.
pub fn i128_from_be_bytes(bytes: &[u8]) -> Option<i128> {
    if bytes.is_empty() {
        return Some(0);
    }
    let sign = if bytes[0] & 0x80 != 0 { 0xff } else { 0x00 };
    let (extra, tail) = bytes.split_at(bytes.len().saturating_sub(16));
    if extra.iter().any(|&b| b != sign) {
        return None;
    }
    let mut buf = [sign; 16];
    buf[16 - tail.len()..].copy_from_slice(tail);
    Some(i128::from_be_bytes(buf))
}

/// Converts a physical value read from `column` back to its canonical host
/// value.
pub fn to_value(value: &PhysicalValue, column: &ColumnDescriptor) -> Result<Value, EncodingError> {
    let converted = column.converted_type();
    let decimal = |unscaled: i128| {
        Value::Decimal(Decimal::new(
            unscaled,
            column.primitive().scale().unwrap_or(0) as u32,
        ))
    };

    let out = match value {
        PhysicalValue::Boolean(b) => Value::Boolean(*b),
        PhysicalValue::Int32(v) => match converted {
            Some(ConvertedType::Date) => Value::Date(*v),
            Some(c) if c.is_unsigned() => Value::UInt(*v as u32 as u64),
            Some(ConvertedType::Decimal) => decimal(*v as i128),
            _ => Value::Int(*v as i64),
        },
        PhysicalValue::Int64(v) => match converted {
            Some(ConvertedType::TimestampMillis) => Value::Timestamp(v.saturating_mul(1000)),
            Some(ConvertedType::TimestampMicros) => Value::Timestamp(*v),
            Some(ConvertedType::Uint64) => Value::UInt(*v as u64),
            Some(ConvertedType::Decimal) => decimal(*v as i128),
            _ => Value::Int(*v),
        },
        PhysicalValue::Int96(v) => Value::Timestamp(v.to_micros().ok_or_else(|| {
            EncodingError::InvalidData(format!(
                "INT96 timestamp (day {}, {} ns) in {} does not fit in i64 microseconds",
                v.julian_day(),
                v.nanos(),
                column.path()
            ))
        })?),
        PhysicalValue::Float(v) => Value::Float(*v),
        PhysicalValue::Double(v) => Value::Double(*v),
        PhysicalValue::ByteArray(b) | PhysicalValue::FixedLenByteArray(b) => match converted {
            Some(ConvertedType::Decimal) => decimal(i128_from_be_bytes(b).ok_or_else(|| {
                EncodingError::InvalidData(format!(
                    "decimal in {} does not fit in 128 bits",
                    column.path()
                ))
            })?),
            Some(c) if c.is_string() => Value::String(String::from_utf8(b.clone()).map_err(|e| {
                EncodingError::InvalidData(format!("invalid UTF-8 in {}: {e}", column.path()))
            })?),
            _ => Value::Bytes(b.clone()),
        },
    };
    Ok(out)
}
