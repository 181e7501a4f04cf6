//! Hybrid RLE / bit-packing of small unsigned integers.
//!
//! The stream is a sequence of runs, each introduced by a varint header. An
//! even header `count << 1` is an RLE run followed by the repeated value in
//! `ceil(bit_width / 8)` little-endian bytes. An odd header
//! `(groups << 1) | 1` is followed by `groups * 8` values bit-packed LSB
//! first. The bit width is not stored in the stream.
//!
//! Definition and repetition levels, dictionary indices and RLE booleans all
//! use this encoding.

use super::bit_util::{pack_bits, write_uvarint, ByteReader};
use crate::common::bit_width;
use crate::error::EncodingError;

/// Shortest run of equal values written as an RLE run.
const MIN_RLE_RUN: usize = 8;

/// Encodes `values`, each of which must fit in `bit_width` bits.
pub fn encode(values: &[u64], bit_width: u8) -> Vec<u8> {
    let mut out = vec![];
    let mut pending: Vec<u64> = Vec::with_capacity(64);

    let mut i = 0;
    while i < values.len() {
        let mut j = i + 1;
        while j < values.len() && values[j] == values[i] {
            j += 1;
        }

        if j - i >= MIN_RLE_RUN {
            // bit-packed runs hold whole groups of 8, so top up the pending
            // values from the run before switching
            let mut start = i;
            let partial = pending.len() % 8;
            if partial != 0 {
                let fill = 8 - partial;
                pending.extend_from_slice(&values[i..i + fill]);
                start += fill;
            }
            flush_bit_packed(&mut pending, bit_width, &mut out);
            write_rle_run(values[i], j - start, bit_width, &mut out);
        } else {
            pending.extend_from_slice(&values[i..j]);
        }
        i = j;
    }

    flush_bit_packed(&mut pending, bit_width, &mut out);
    out
}

fn write_rle_run(value: u64, count: usize, bit_width: u8, out: &mut Vec<u8>) {
    write_uvarint((count as u64) << 1, out);
    let width = (bit_width as usize).div_ceil(8);
    out.extend_from_slice(&value.to_le_bytes()[..width]);
}

fn flush_bit_packed(pending: &mut Vec<u64>, bit_width: u8, out: &mut Vec<u8>) {
    if pending.is_empty() {
        return;
    }
    let groups = pending.len().div_ceil(8);
    pending.resize(groups * 8, 0);
    write_uvarint(((groups as u64) << 1) | 1, out);
    pack_bits(pending, bit_width, out);
    pending.clear();
}

/// Decodes `count` values and returns them with the number of bytes
/// consumed. Padding in the final bit-packed group is dropped.
///
/// A run may not reach past `count`, other than the padding of a last
/// bit-packed group.
pub fn decode(data: &[u8], bit_width: u8, count: usize) -> Result<(Vec<u64>, usize), EncodingError> {
    if bit_width > 64 {
        return Err(EncodingError::InvalidData(format!("bit width {bit_width} exceeds 64")));
    }
    let mut reader = ByteReader::new(data);
    let mut out = Vec::with_capacity(count.min(data.len() * 8));

    while out.len() < count {
        let header = reader.read_uvarint()?;
        let wanted = count - out.len();
        let run = usize::try_from(header >> 1).unwrap_or(usize::MAX);
        if header & 1 == 1 {
            if run > wanted.div_ceil(8) {
                return Err(EncodingError::InvalidData(format!(
                    "bit-packed run of {run} groups past the {wanted} remaining values"
                )));
            }
            let unpacked = reader.read_packed(bit_width, run * 8)?;
            out.extend(unpacked.into_iter().take(wanted));
        } else {
            if run > wanted {
                return Err(EncodingError::InvalidData(format!(
                    "RLE run of {run} past the {wanted} remaining values"
                )));
            }
            let width = (bit_width as usize).div_ceil(8);
            let mut bytes = [0u8; 8];
            bytes[..width].copy_from_slice(reader.read_bytes(width)?);
            let value = u64::from_le_bytes(bytes);
            out.extend(std::iter::repeat(value).take(run));
        }
    }
    Ok((out, reader.position()))
}

pub fn decode_levels(data: &[u8], max_level: u16, count: usize) -> Result<(Vec<u16>, usize), EncodingError> {
    let (values, consumed) = decode(data, bit_width(max_level as u64), count)?;
    let mut levels = Vec::with_capacity(values.len());
    for v in values {
        if v > max_level as u64 {
            return Err(EncodingError::InvalidData(format!("level {v} exceeds maximum {max_level}")));
        }
        levels.push(v as u16);
    }
    Ok((levels, consumed))
}

/// RLE value encoding of booleans: the hybrid stream with bit width 1,
/// prefixed by its 4-byte little-endian length.
pub fn encode_booleans(values: &[bool]) -> Vec<u8> {
    let bits: Vec<u64> = values.iter().map(|&b| b as u64).collect();
    let body = encode(&bits, 1);
    let mut out = Vec::with_capacity(body.len() + 4);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

pub fn decode_booleans(data: &[u8], count: usize) -> Result<Vec<bool>, EncodingError> {
    let mut reader = ByteReader::new(data);
    let len = reader.read_u32_le()? as usize;
    let body = reader.read_bytes(len)?;
    let (bits, _) = decode(body, 1, count)?;
    Ok(bits.into_iter().map(|b| b == 1).collect())
}
