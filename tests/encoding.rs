use colstripe::basic::{Encoding, PhysicalType};
use colstripe::encoding::dictionary::{decode_indices, encode_indices, lookup, DictionaryBuilder};
use colstripe::encoding::{decode_values, encode_values, plain, rle};
use colstripe::error::EncodingError;
use colstripe::physical::{Int96, PhysicalValue};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LENGTHS: [usize; 4] = [0, 1, 127, 1000];

fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5eed)
}

fn random_values(rng: &mut StdRng, physical_type: PhysicalType, n: usize) -> Vec<PhysicalValue> {
    (0..n)
        .map(|_| match physical_type {
            PhysicalType::Boolean => PhysicalValue::Boolean(rng.gen_bool(0.3)),
            PhysicalType::Int32 => PhysicalValue::Int32(rng.gen()),
            PhysicalType::Int64 => PhysicalValue::Int64(rng.gen()),
            PhysicalType::Int96 => PhysicalValue::Int96(Int96::new(rng.gen_range(0..86_400_000_000_000), rng.gen())),
            PhysicalType::Float => PhysicalValue::Float(rng.gen_range(-1e6..1e6)),
            PhysicalType::Double => PhysicalValue::Double(rng.gen_range(-1e12..1e12)),
            PhysicalType::ByteArray => {
                let len = rng.gen_range(0..24);
                PhysicalValue::ByteArray((0..len).map(|_| rng.gen_range(b'a'..=b'f')).collect())
            }
            PhysicalType::FixedLenByteArray => PhysicalValue::FixedLenByteArray((0..6).map(|_| rng.gen()).collect()),
        })
        .collect()
}

fn assert_round_trip(encoding: Encoding, physical_type: PhysicalType) {
    let mut rng = rng();
    let type_length = (physical_type == PhysicalType::FixedLenByteArray).then_some(6);
    for n in LENGTHS {
        let values = random_values(&mut rng, physical_type, n);
        let encoded = encode_values(&values, encoding, physical_type).unwrap();
        let decoded = decode_values(&encoded, encoding, physical_type, type_length, n).unwrap();
        assert_eq!(
            decoded, values,
            "{} of {} values of type {} should decode unchanged",
            encoding, n, physical_type
        );
    }
}

mod value_encodings {
    use super::*;

    #[test]
    fn test_plain() {
        for physical_type in [
            PhysicalType::Boolean,
            PhysicalType::Int32,
            PhysicalType::Int64,
            PhysicalType::Int96,
            PhysicalType::Float,
            PhysicalType::Double,
            PhysicalType::ByteArray,
            PhysicalType::FixedLenByteArray,
        ] {
            assert_round_trip(Encoding::Plain, physical_type);
        }
    }

    #[test]
    fn test_rle_booleans() {
        assert_round_trip(Encoding::Rle, PhysicalType::Boolean);
    }

    #[test]
    fn test_delta_binary_packed() {
        assert_round_trip(Encoding::DeltaBinaryPacked, PhysicalType::Int32);
        assert_round_trip(Encoding::DeltaBinaryPacked, PhysicalType::Int64);
    }

    #[test]
    fn test_delta_binary_packed_wraps_at_extremes() {
        let values: Vec<_> = [i64::MAX, i64::MIN, 0, i64::MIN, i64::MAX]
            .into_iter()
            .map(PhysicalValue::Int64)
            .collect();
        let encoded = encode_values(&values, Encoding::DeltaBinaryPacked, PhysicalType::Int64).unwrap();
        let decoded = decode_values(&encoded, Encoding::DeltaBinaryPacked, PhysicalType::Int64, None, 5).unwrap();
        assert_eq!(decoded, values, "Deltas overflow and wrap back");
    }

    #[test]
    fn test_delta_byte_arrays() {
        assert_round_trip(Encoding::DeltaLengthByteArray, PhysicalType::ByteArray);
        assert_round_trip(Encoding::DeltaByteArray, PhysicalType::ByteArray);
        assert_round_trip(Encoding::DeltaByteArray, PhysicalType::FixedLenByteArray);
    }

    #[test]
    fn test_delta_byte_array_shares_prefixes() {
        let urls: Vec<_> = (0..200)
            .map(|i| PhysicalValue::ByteArray(format!("http://example.com/page/{i:05}").into_bytes()))
            .collect();
        let plain = encode_values(&urls, Encoding::Plain, PhysicalType::ByteArray).unwrap();
        let delta = encode_values(&urls, Encoding::DeltaByteArray, PhysicalType::ByteArray).unwrap();
        assert!(
            delta.len() < plain.len() / 2,
            "Sorted values with a common prefix should shrink, plain: {} delta: {}",
            plain.len(),
            delta.len()
        );
    }

    #[test]
    fn test_rejects_mismatched_encodings() {
        let values = vec![PhysicalValue::Double(1.5)];
        let err = encode_values(&values, Encoding::DeltaBinaryPacked, PhysicalType::Double).unwrap_err();
        assert!(
            matches!(err, EncodingError::UnsupportedEncoding { .. }),
            "Expected an unsupported encoding, found: {:?}",
            err
        );
        assert!(encode_values(&values, Encoding::Rle, PhysicalType::Double).is_err());
        assert!(decode_values(&[], Encoding::PlainDictionary, PhysicalType::Double, None, 0).is_err());
    }

    #[test]
    fn test_decode_count_mismatch() {
        let values: Vec<_> = (0..10).map(PhysicalValue::Int32).collect();
        let encoded = encode_values(&values, Encoding::DeltaBinaryPacked, PhysicalType::Int32).unwrap();
        assert!(
            decode_values(&encoded, Encoding::DeltaBinaryPacked, PhysicalType::Int32, None, 11).is_err(),
            "A self-describing stream must hold the declared count"
        );
    }

    #[test]
    fn test_truncated_plain() {
        let values: Vec<_> = (0..4).map(PhysicalValue::Int64).collect();
        let encoded = plain::encode(&values, PhysicalType::Int64).unwrap();
        let err = plain::decode(&encoded[..30], PhysicalType::Int64, None, 4).unwrap_err();
        assert!(
            matches!(err, EncodingError::TruncatedBuffer { .. }),
            "Expected a truncated buffer, found: {:?}",
            err
        );
    }
}

mod levels {
    use super::*;

    #[test]
    fn test_level_round_trip() {
        let mut rng = rng();
        for max_level in [1u16, 2, 5] {
            for n in LENGTHS {
                let levels: Vec<u16> = (0..n)
                    .map(|_| if rng.gen_bool(0.7) { max_level } else { rng.gen_range(0..=max_level) })
                    .collect();
                let encoded = rle::encode_levels(&levels, max_level);
                let (decoded, consumed) = rle::decode_levels(&encoded, max_level, n).unwrap();
                assert_eq!(decoded, levels, "Levels up to {} for {} values", max_level, n);
                assert_eq!(consumed, encoded.len());
            }
        }
    }

    #[test]
    fn test_runs_compress() {
        let levels = vec![3u16; 10_000];
        let encoded = rle::encode_levels(&levels, 3);
        assert!(encoded.len() < 8, "A single run takes a few bytes, found {}", encoded.len());
    }

    #[test]
    fn test_rejects_levels_above_max() {
        let encoded = rle::encode_levels(&[0, 3, 1], 3);
        assert!(rle::decode_levels(&encoded, 2, 3).is_err());
    }
}

mod dictionary {
    use super::*;

    #[test]
    fn test_dictionary_round_trip() {
        let mut rng = rng();
        let words: Vec<_> = ["red", "green", "blue", "cyan", "magenta"]
            .into_iter()
            .map(|w| PhysicalValue::ByteArray(w.as_bytes().to_vec()))
            .collect();

        for n in LENGTHS {
            let values: Vec<_> = (0..n).map(|_| words[rng.gen_range(0..words.len())].clone()).collect();
            let mut builder = DictionaryBuilder::new(PhysicalType::ByteArray);
            let indices: Vec<u32> = values.iter().map(|v| builder.insert(v)).collect();
            assert!(builder.len() <= words.len(), "Entries are distinct");

            let encoded = encode_indices(&indices, builder.bit_width());
            let page = builder.to_plain().unwrap();
            let dictionary = plain::decode(&page, PhysicalType::ByteArray, None, builder.len()).unwrap();
            let decoded = lookup(&dictionary, &decode_indices(&encoded, n).unwrap()).unwrap();
            assert_eq!(decoded, values, "{} values through the dictionary", n);
        }
    }

    #[test]
    fn test_first_seen_order() {
        let mut builder = DictionaryBuilder::new(PhysicalType::Int32);
        let indices: Vec<u32> = [7, 3, 7, 9, 3]
            .into_iter()
            .map(|v| builder.insert(&PhysicalValue::Int32(v)))
            .collect();

        assert_eq!(indices, vec![0, 1, 0, 2, 1]);
        assert_eq!(
            builder.values(),
            &[PhysicalValue::Int32(7), PhysicalValue::Int32(3), PhysicalValue::Int32(9)]
        );
        assert_eq!(builder.bit_width(), 2);
    }

    #[test]
    fn test_index_out_of_range() {
        let dictionary = vec![PhysicalValue::Int32(1)];
        assert!(lookup(&dictionary, &[0, 1]).is_err());
    }
}
