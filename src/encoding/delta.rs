//! DELTA_BINARY_PACKED integers.
//!
//! Header: block size, miniblocks per block, total value count, first value
//! (zig-zag). Each block then stores its minimum delta (zig-zag), one bit
//! width byte per miniblock and the miniblocks of `delta - min_delta`
//! bit-packed. Miniblocks past the last value are not written.

use super::bit_util::{pack_bits, write_uvarint, write_zigzag, ByteReader};
use crate::common::bit_width;
use crate::error::EncodingError;

pub const BLOCK_SIZE: usize = 128;
pub const MINIBLOCKS_PER_BLOCK: usize = 4;
const MINIBLOCK_SIZE: usize = BLOCK_SIZE / MINIBLOCKS_PER_BLOCK;

/// Integer widths the encoding is defined for. Deltas wrap at the width of
/// the type.
trait DeltaInt: Copy + Ord + Default {
    const BITS: u8;
    fn wrapping_sub(self, other: Self) -> Self;
    fn wrapping_add(self, other: Self) -> Self;
    fn to_i64(self) -> i64;
    fn from_i64(v: i64) -> Self;
    /// Reinterprets a non-negative offset as an unsigned value of the same width.
    fn to_offset(self) -> u64;
    fn from_offset(v: u64) -> Self;
}

impl DeltaInt for i32 {
    const BITS: u8 = 32;
    fn wrapping_sub(self, other: Self) -> Self {
        i32::wrapping_sub(self, other)
    }
    fn wrapping_add(self, other: Self) -> Self {
        i32::wrapping_add(self, other)
    }
    fn to_i64(self) -> i64 {
        self as i64
    }
    fn from_i64(v: i64) -> Self {
        v as i32
    }
    fn to_offset(self) -> u64 {
        self as u32 as u64
    }
    fn from_offset(v: u64) -> Self {
        v as u32 as i32
    }
}

impl DeltaInt for i64 {
    const BITS: u8 = 64;
    fn wrapping_sub(self, other: Self) -> Self {
        i64::wrapping_sub(self, other)
    }
    fn wrapping_add(self, other: Self) -> Self {
        i64::wrapping_add(self, other)
    }
    fn to_i64(self) -> i64 {
        self
    }
    fn from_i64(v: i64) -> Self {
        v
    }
    fn to_offset(self) -> u64 {
        self as u64
    }
    fn from_offset(v: u64) -> Self {
        v as i64
    }
}

pub fn encode_i32(values: &[i32]) -> Vec<u8> {
    encode(values)
}

pub fn encode_i64(values: &[i64]) -> Vec<u8> {
    encode(values)
}

/// Decodes a complete stream, returning the values and the bytes consumed.
pub fn decode_i32(data: &[u8]) -> Result<(Vec<i32>, usize), EncodingError> {
    let mut reader = ByteReader::new(data);
    let values = decode_from(&mut reader)?;
    Ok((values, reader.position()))
}

pub fn decode_i64(data: &[u8]) -> Result<(Vec<i64>, usize), EncodingError> {
    let mut reader = ByteReader::new(data);
    let values = decode_from(&mut reader)?;
    Ok((values, reader.position()))
}

pub(crate) fn decode_i32_from(reader: &mut ByteReader<'_>) -> Result<Vec<i32>, EncodingError> {
    decode_from(reader)
}

fn encode<T: DeltaInt>(values: &[T]) -> Vec<u8> {
    let mut out = vec![];
    write_uvarint(BLOCK_SIZE as u64, &mut out);
    write_uvarint(MINIBLOCKS_PER_BLOCK as u64, &mut out);
    write_uvarint(values.len() as u64, &mut out);
    write_zigzag(values.first().copied().unwrap_or_default().to_i64(), &mut out);

    let deltas: Vec<T> = values.windows(2).map(|w| w[1].wrapping_sub(w[0])).collect();
    for block in deltas.chunks(BLOCK_SIZE) {
        let min_delta = block.iter().copied().min().unwrap_or_default();
        write_zigzag(min_delta.to_i64(), &mut out);

        let offsets: Vec<u64> = block.iter().map(|d| d.wrapping_sub(min_delta).to_offset()).collect();
        let widths: Vec<u8> = (0..MINIBLOCKS_PER_BLOCK)
            .map(|m| {
                offsets
                    .chunks(MINIBLOCK_SIZE)
                    .nth(m)
                    .map_or(0, |mb| bit_width(mb.iter().copied().max().unwrap_or(0)))
            })
            .collect();
        out.extend_from_slice(&widths);

        for (miniblock, &width) in offsets.chunks(MINIBLOCK_SIZE).zip(&widths) {
            let mut padded = miniblock.to_vec();
            padded.resize(MINIBLOCK_SIZE, 0);
            pack_bits(&padded, width, &mut out);
        }
    }
    out
}

fn decode_from<T: DeltaInt>(reader: &mut ByteReader<'_>) -> Result<Vec<T>, EncodingError> {
    let block_size = reader.read_uvarint()? as usize;
    let miniblocks = reader.read_uvarint()? as usize;
    if block_size == 0 || block_size % 128 != 0 || miniblocks == 0 || block_size % miniblocks != 0 {
        return Err(EncodingError::InvalidData(format!(
            "invalid delta header: block size {block_size}, {miniblocks} miniblocks"
        )));
    }
    let miniblock_size = block_size / miniblocks;
    if miniblock_size % 32 != 0 {
        return Err(EncodingError::InvalidData(format!(
            "miniblock size {miniblock_size} is not a multiple of 32"
        )));
    }

    let total = reader.read_uvarint()? as usize;
    let first = T::from_i64(reader.read_zigzag()?);
    if total == 0 {
        return Ok(vec![]);
    }

    let mut values = Vec::with_capacity(total.min(reader.remaining() * 8 + 1));
    values.push(first);
    let mut prev = first;

    while values.len() < total {
        let min_delta = T::from_i64(reader.read_zigzag()?);
        let widths = reader.read_bytes(miniblocks)?;
        for &width in widths {
            if values.len() >= total {
                break;
            }
            if width > T::BITS {
                return Err(EncodingError::InvalidData(format!(
                    "miniblock bit width {width} exceeds {}",
                    T::BITS
                )));
            }
            for offset in reader.read_packed(width, miniblock_size)? {
                if values.len() >= total {
                    break;
                }
                prev = prev.wrapping_add(min_delta.wrapping_add(T::from_offset(offset)));
                values.push(prev);
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_first_value() {
        let encoded = encode_i64(&[7]);

        assert_eq!(encoded, vec![128, 1, 4, 1, 14], "No blocks follow a single value");
        assert_eq!(decode_i64(&encoded).unwrap(), (vec![7], 5));
    }

    #[test]
    fn test_empty() {
        let encoded = encode_i32(&[]);
        assert_eq!(decode_i32(&encoded).unwrap(), (vec![], encoded.len()));
    }

    #[test]
    fn test_monotonic_sequence_packs_to_zero_width() {
        let values: Vec<i64> = (100..229).collect();
        let encoded = encode_i64(&values);

        // header 7 bytes, min delta 1 byte, 4 width bytes, no packed data
        assert_eq!(encoded.len(), 12);
        assert_eq!(&encoded[8..12], &[0, 0, 0, 0]);
        assert_eq!(decode_i64(&encoded).unwrap().0, values);
    }

    #[test]
    fn test_partial_last_block() {
        let values: Vec<i32> = (0..300).map(|i| (i * 7919) % 1000 - 500).collect();
        let encoded = encode_i32(&values);
        let (decoded, consumed) = decode_i32(&encoded).unwrap();

        assert_eq!(decoded, values);
        assert_eq!(consumed, encoded.len(), "Trailing miniblocks are not written");
    }

    #[test]
    fn test_extremes_wrap() {
        let values = vec![i32::MIN, i32::MAX, 0, i32::MIN, -1];
        assert_eq!(decode_i32(&encode_i32(&values)).unwrap().0, values);

        let values = vec![i64::MAX, i64::MIN, 0];
        assert_eq!(decode_i64(&encode_i64(&values)).unwrap().0, values);
    }

    #[test]
    fn test_truncated() {
        let values: Vec<i64> = (0..50).map(|i| i * i).collect();
        let encoded = encode_i64(&values);

        assert!(decode_i64(&encoded[..encoded.len() - 3]).is_err());
    }

    #[test]
    fn test_invalid_header() {
        let result = decode_i64(&[100, 4, 1, 0]);
        assert!(matches!(result, Err(EncodingError::InvalidData(_))));
    }
}
