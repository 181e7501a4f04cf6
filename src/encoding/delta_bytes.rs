//! DELTA_LENGTH_BYTE_ARRAY and DELTA_BYTE_ARRAY.

use super::bit_util::ByteReader;
use super::delta;
use crate::error::EncodingError;

/// Delta packed lengths followed by the concatenated payloads.
pub fn encode_lengths<B: AsRef<[u8]>>(values: &[B]) -> Vec<u8> {
    let lengths: Vec<i32> = values.iter().map(|v| v.as_ref().len() as i32).collect();
    let mut out = delta::encode_i32(&lengths);
    for v in values {
        out.extend_from_slice(v.as_ref());
    }
    out
}

/// Decodes a delta length stream, returning the values and the bytes
/// consumed.
pub fn decode_lengths(data: &[u8]) -> Result<(Vec<Vec<u8>>, usize), EncodingError> {
    let mut reader = ByteReader::new(data);
    let values = decode_lengths_from(&mut reader)?;
    Ok((values, reader.position()))
}

fn decode_lengths_from(reader: &mut ByteReader<'_>) -> Result<Vec<Vec<u8>>, EncodingError> {
    let lengths = delta::decode_i32_from(reader)?;
    let mut values = Vec::with_capacity(lengths.len());
    for len in lengths {
        let len = usize::try_from(len)
            .map_err(|_| EncodingError::InvalidData(format!("negative byte array length {len}")))?;
        values.push(reader.read_bytes(len)?.to_vec());
    }
    Ok(values)
}

/// Delta packed prefix lengths shared with the previous value, then the
/// suffixes as a delta length stream.
pub fn encode<B: AsRef<[u8]>>(values: &[B]) -> Vec<u8> {
    let mut prefixes = Vec::with_capacity(values.len());
    let mut suffixes = Vec::with_capacity(values.len());
    let mut previous: &[u8] = &[];
    for v in values {
        let v = v.as_ref();
        let shared = previous.iter().zip(v).take_while(|(a, b)| a == b).count();
        prefixes.push(shared as i32);
        suffixes.push(&v[shared..]);
        previous = v;
    }

    let mut out = delta::encode_i32(&prefixes);
    out.extend(encode_lengths(&suffixes));
    out
}

pub fn decode(data: &[u8]) -> Result<(Vec<Vec<u8>>, usize), EncodingError> {
    let mut reader = ByteReader::new(data);
    let prefixes = delta::decode_i32_from(&mut reader)?;
    let suffixes = decode_lengths_from(&mut reader)?;
    if prefixes.len() != suffixes.len() {
        return Err(EncodingError::InvalidData(format!(
            "{} prefix lengths for {} suffixes",
            prefixes.len(),
            suffixes.len()
        )));
    }

    let mut values: Vec<Vec<u8>> = Vec::with_capacity(prefixes.len());
    for (prefix, suffix) in prefixes.into_iter().zip(suffixes) {
        let previous = values.last().map(Vec::as_slice).unwrap_or(&[]);
        let prefix = usize::try_from(prefix)
            .ok()
            .filter(|&p| p <= previous.len())
            .ok_or_else(|| {
                EncodingError::InvalidData(format!(
                    "prefix length {prefix} exceeds previous value of {} bytes",
                    previous.len()
                ))
            })?;
        let mut value = Vec::with_capacity(prefix + suffix.len());
        value.extend_from_slice(&previous[..prefix]);
        value.extend_from_slice(&suffix);
        values.push(value);
    }
    Ok((values, reader.position()))
}
