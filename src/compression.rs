//! Page compression.
//!
//! - GZIP through `flate2`.
//! - SNAPPY raw blocks through `snap`.
//! - ZSTD through `zstd`.
//! - LZ4_RAW blocks through `lz4_flex`, and LZ4 as the Hadoop framing of
//!   those blocks.
//!
//! BROTLI and LZO are recognised identifiers without an implementation.

use crate::basic::CompressionCodec;
use crate::error::CodecError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

/// Level used for ZSTD pages.
const ZSTD_LEVEL: i32 = 1;

fn failed(codec: CompressionCodec, reason: impl ToString) -> CodecError {
    CodecError::Failed {
        codec: codec.to_string(),
        reason: reason.to_string(),
    }
}

/// Checks if `codec` has an implementation.
pub fn is_supported(codec: CompressionCodec) -> bool {
    !matches!(codec, CompressionCodec::Brotli | CompressionCodec::Lzo)
}

/// Compresses `input`. Always returns a new buffer.
pub fn compress(codec: CompressionCodec, input: &[u8]) -> Result<Vec<u8>, CodecError> {
    match codec {
        CompressionCodec::Uncompressed => Ok(input.to_vec()),
        CompressionCodec::Snappy => snap::raw::Encoder::new()
            .compress_vec(input)
            .map_err(|e| failed(codec, e)),
        CompressionCodec::Gzip => {
            let mut encoder = GzEncoder::new(Vec::with_capacity(input.len() / 2), flate2::Compression::default());
            encoder.write_all(input).map_err(|e| failed(codec, e))?;
            encoder.finish().map_err(|e| failed(codec, e))
        }
        CompressionCodec::Zstd => zstd::stream::encode_all(input, ZSTD_LEVEL).map_err(|e| failed(codec, e)),
        CompressionCodec::Lz4Raw => Ok(lz4_flex::block::compress(input)),
        CompressionCodec::Lz4 => {
            let block = lz4_flex::block::compress(input);
            let mut out = Vec::with_capacity(block.len() + 8);
            out.extend_from_slice(&(input.len() as u32).to_be_bytes());
            out.extend_from_slice(&(block.len() as u32).to_be_bytes());
            out.extend_from_slice(&block);
            Ok(out)
        }
        CompressionCodec::Brotli | CompressionCodec::Lzo => Err(CodecError::UnsupportedCodec(codec.to_string())),
    }
}

/// Decompresses `input`, which expands to `uncompressed_size` bytes.
pub fn decompress(codec: CompressionCodec, input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, CodecError> {
    let out = match codec {
        CompressionCodec::Uncompressed => input.to_vec(),
        CompressionCodec::Snappy => snap::raw::Decoder::new()
            .decompress_vec(input)
            .map_err(|e| failed(codec, e))?,
        CompressionCodec::Gzip => {
            let mut out = Vec::with_capacity(uncompressed_size);
            GzDecoder::new(input)
                .read_to_end(&mut out)
                .map_err(|e| failed(codec, e))?;
            out
        }
        CompressionCodec::Zstd => zstd::stream::decode_all(input).map_err(|e| failed(codec, e))?,
        CompressionCodec::Lz4Raw => {
            lz4_flex::block::decompress(input, uncompressed_size).map_err(|e| failed(codec, e))?
        }
        CompressionCodec::Lz4 => decompress_hadoop_lz4(input, uncompressed_size)?,
        CompressionCodec::Brotli | CompressionCodec::Lzo => {
            return Err(CodecError::UnsupportedCodec(codec.to_string()))
        }
    };

    if out.len() != uncompressed_size {
        return Err(failed(
            codec,
            format!("expanded to {} bytes, expected {uncompressed_size}", out.len()),
        ));
    }
    Ok(out)
}

/// Hadoop framing: a sequence of `[uncompressed len][compressed len][block]`
/// with big-endian 4 byte lengths.
fn decompress_hadoop_lz4(mut input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, CodecError> {
    let codec = CompressionCodec::Lz4;
    let mut out = Vec::with_capacity(uncompressed_size);
    while !input.is_empty() {
        if input.len() < 8 {
            return Err(failed(codec, "truncated frame header"));
        }
        let expanded = u32::from_be_bytes([input[0], input[1], input[2], input[3]]) as usize;
        let compressed = u32::from_be_bytes([input[4], input[5], input[6], input[7]]) as usize;
        input = &input[8..];
        if compressed > input.len() {
            return Err(failed(codec, "truncated frame"));
        }
        let block = lz4_flex::block::decompress(&input[..compressed], expanded).map_err(|e| failed(codec, e))?;
        out.extend_from_slice(&block);
        input = &input[compressed..];
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        b"the quick brown fox jumps over the lazy dog "
            .iter()
            .cycle()
            .take(4000)
            .copied()
            .collect()
    }

    #[test]
    fn test_codecs_restore_input() {
        let input = sample();
        for codec in [
            CompressionCodec::Uncompressed,
            CompressionCodec::Snappy,
            CompressionCodec::Gzip,
            CompressionCodec::Zstd,
            CompressionCodec::Lz4,
            CompressionCodec::Lz4Raw,
        ] {
            let compressed = compress(codec, &input).unwrap();
            if codec != CompressionCodec::Uncompressed {
                assert!(
                    compressed.len() < input.len(),
                    "{} did not shrink repetitive input",
                    codec
                );
            }
            assert_eq!(
                decompress(codec, &compressed, input.len()).unwrap(),
                input,
                "{} round trip",
                codec
            );
        }
    }

    #[test]
    fn test_empty_input() {
        for codec in [CompressionCodec::Snappy, CompressionCodec::Gzip, CompressionCodec::Zstd] {
            let compressed = compress(codec, &[]).unwrap();
            assert!(decompress(codec, &compressed, 0).unwrap().is_empty());
        }
    }

    #[test]
    fn test_unsupported() {
        assert!(matches!(
            compress(CompressionCodec::Brotli, b"x"),
            Err(CodecError::UnsupportedCodec(_))
        ));
        assert!(!is_supported(CompressionCodec::Lzo));
    }

    #[test]
    fn test_corrupt_input() {
        let result = decompress(CompressionCodec::Snappy, &[0xff, 0xff, 0xff], 10);
        assert!(matches!(result, Err(CodecError::Failed { .. })));
    }
}
