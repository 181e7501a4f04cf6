//! Byte cursor, varints and LSB-first bit packing.

use crate::error::EncodingError;

/// Maximum number of bytes in a 64 bit varint.
const MAX_VARINT_LEN: usize = 10;

/// Read cursor over an encoded buffer. Every read checks the remaining
/// length and reports the offset where the buffer ran out.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Unread part of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], EncodingError> {
        if len > self.remaining() {
            return Err(EncodingError::TruncatedBuffer {
                offset: self.pos,
                needed: len - self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, EncodingError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], EncodingError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, EncodingError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Reads an unsigned LEB128 varint.
    pub fn read_uvarint(&mut self) -> Result<u64, EncodingError> {
        let start = self.pos;
        let mut result = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let byte = match self.data.get(self.pos) {
                Some(&b) => b,
                None => return Err(EncodingError::CorruptVarint { offset: start }),
            };
            self.pos += 1;
            result |= ((byte & 0x7f) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(EncodingError::CorruptVarint { offset: start })
    }

    /// Reads a zig-zag encoded signed varint.
    pub fn read_zigzag(&mut self) -> Result<i64, EncodingError> {
        self.read_uvarint().map(zigzag_decode)
    }

    /// Reads `count` values of `bit_width` bits packed LSB first.
    pub fn read_packed(&mut self, bit_width: u8, count: usize) -> Result<Vec<u64>, EncodingError> {
        let len = packed_len(count, bit_width).ok_or_else(|| {
            EncodingError::InvalidData(format!("{count} values of {bit_width} bits overflow"))
        })?;
        let bytes = self.read_bytes(len)?;
        Ok(unpack_bits(bytes, bit_width, count))
    }
}

pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Appends `n` as an unsigned LEB128 varint.
pub fn write_uvarint(mut n: u64, out: &mut Vec<u8>) {
    while n >= 0x80 {
        out.push((n as u8) | 0x80);
        n >>= 7;
    }
    out.push(n as u8);
}

pub fn write_zigzag(n: i64, out: &mut Vec<u8>) {
    write_uvarint(zigzag_encode(n), out)
}

/// Bytes needed to hold `count` values of `bit_width` bits.
pub fn packed_len(count: usize, bit_width: u8) -> Option<usize> {
    count
        .checked_mul(bit_width as usize)
        .map(|bits| bits.div_ceil(8))
}

fn mask(bit_width: u8) -> u64 {
    if bit_width >= 64 {
        u64::MAX
    } else {
        (1u64 << bit_width) - 1
    }
}

/// Packs the low `bit_width` bits of each value LSB first, zero padding the
/// final byte.
pub fn pack_bits(values: &[u64], bit_width: u8, out: &mut Vec<u8>) {
    if bit_width == 0 {
        return;
    }
    let mask = mask(bit_width);
    let mut acc: u128 = 0;
    let mut bits = 0u32;
    for &v in values {
        acc |= ((v & mask) as u128) << bits;
        bits += bit_width as u32;
        while bits >= 8 {
            out.push(acc as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 {
        out.push(acc as u8);
    }
}

/// Inverse of [`pack_bits`]. `data` must hold at least
/// `packed_len(count, bit_width)` bytes.
pub fn unpack_bits(data: &[u8], bit_width: u8, count: usize) -> Vec<u64> {
    if bit_width == 0 {
        return vec![0; count];
    }
    let mask = mask(bit_width);
    let mut out = Vec::with_capacity(count);
    let mut bytes = data.iter();
    let mut acc: u128 = 0;
    let mut bits = 0u32;
    while out.len() < count {
        while bits < bit_width as u32 {
            let byte = bytes.next().copied().unwrap_or(0);
            acc |= (byte as u128) << bits;
            bits += 8;
        }
        out.push((acc as u64) & mask);
        acc >>= bit_width;
        bits -= bit_width as u32;
    }
    out
}
