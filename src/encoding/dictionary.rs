//! Dictionary encoding: distinct values in first-seen order, referenced by
//! index from the data pages.

use super::bit_util::ByteReader;
use super::{plain, rle};
use crate::basic::PhysicalType;
use crate::common::bit_width;
use crate::error::EncodingError;
use crate::physical::PhysicalValue;
use rustc_hash::FxHashMap;

/// Collects the distinct values of a column chunk. Shared by every data page
/// of the chunk so indices stay stable across pages.
#[derive(Debug, Clone)]
pub struct DictionaryBuilder {
    physical_type: PhysicalType,
    index: FxHashMap<Vec<u8>, u32>,
    values: Vec<PhysicalValue>,
}

impl DictionaryBuilder {
    pub fn new(physical_type: PhysicalType) -> Self {
        Self {
            physical_type,
            index: FxHashMap::default(),
            values: vec![],
        }
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    /// Returns the index of `value`, adding it if it is new.
    pub fn insert(&mut self, value: &PhysicalValue) -> u32 {
        let mut key = Vec::with_capacity(value.plain_size());
        plain::encode_one(value, &mut key);
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.values.len() as u32;
        self.index.insert(key, i);
        self.values.push(value.clone());
        i
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[PhysicalValue] {
        &self.values
    }

    /// Bits needed for the largest index.
    pub fn bit_width(&self) -> u8 {
        bit_width(self.values.len().saturating_sub(1) as u64)
    }

    /// Body of the dictionary page: the distinct values PLAIN encoded.
    pub fn to_plain(&self) -> Result<Vec<u8>, EncodingError> {
        plain::encode(&self.values, self.physical_type)
    }
}

/// Encodes indices as one bit width byte followed by the hybrid stream.
pub fn encode_indices(indices: &[u32], bit_width: u8) -> Vec<u8> {
    let values: Vec<u64> = indices.iter().map(|&i| i as u64).collect();
    let mut out = vec![bit_width];
    out.extend(rle::encode(&values, bit_width));
    out
}

pub fn decode_indices(data: &[u8], count: usize) -> Result<Vec<u32>, EncodingError> {
    let mut reader = ByteReader::new(data);
    let bit_width = reader.read_u8()?;
    if bit_width > 32 {
        return Err(EncodingError::InvalidData(format!(
            "dictionary index bit width {bit_width} exceeds 32"
        )));
    }
    let (values, _) = rle::decode(reader.rest(), bit_width, count)?;
    Ok(values.into_iter().map(|v| v as u32).collect())
}

/// Resolves indices against a decoded dictionary.
pub fn lookup(dictionary: &[PhysicalValue], indices: &[u32]) -> Result<Vec<PhysicalValue>, EncodingError> {
    indices
        .iter()
        .map(|&i| {
            dictionary.get(i as usize).cloned().ok_or_else(|| {
                EncodingError::InvalidData(format!(
                    "dictionary index {i} out of range for {} entries",
                    dictionary.len()
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> PhysicalValue {
        PhysicalValue::ByteArray(v.as_bytes().to_vec())
    }

    #[test]
    fn test_first_seen_order() {
        let mut dict = DictionaryBuilder::new(PhysicalType::ByteArray);
        let indices: Vec<u32> = ["b", "a", "b", "c", "a"].iter().map(|v| dict.insert(&s(v))).collect();

        assert_eq!(indices, vec![0, 1, 0, 2, 1]);
        assert_eq!(dict.values(), &[s("b"), s("a"), s("c")]);
        assert_eq!(dict.bit_width(), 2);
    }

    #[test]
    fn test_indices_round_trip() {
        let mut dict = DictionaryBuilder::new(PhysicalType::Int32);
        let values: Vec<PhysicalValue> = [3, 3, 3, 9, 3, 9, 9, 9, 9, 9, 9, 9, 9, 1]
            .into_iter()
            .map(PhysicalValue::Int32)
            .collect();
        let indices: Vec<u32> = values.iter().map(|v| dict.insert(v)).collect();

        let encoded = encode_indices(&indices, dict.bit_width());
        assert_eq!(encoded[0], 2, "The bit width byte leads the page");

        let decoded = decode_indices(&encoded, indices.len()).unwrap();
        let dictionary = plain::decode(&dict.to_plain().unwrap(), PhysicalType::Int32, None, dict.len()).unwrap();
        assert_eq!(lookup(&dictionary, &decoded).unwrap(), values);
    }

    #[test]
    fn test_single_entry_has_zero_width() {
        let mut dict = DictionaryBuilder::new(PhysicalType::Double);
        dict.insert(&PhysicalValue::Double(1.5));
        dict.insert(&PhysicalValue::Double(1.5));

        assert_eq!(dict.len(), 1);
        assert_eq!(dict.bit_width(), 0);
        assert_eq!(decode_indices(&encode_indices(&[0, 0, 0], 0), 3).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn test_lookup_out_of_range() {
        let result = lookup(&[s("a")], &[0, 1]);
        assert!(matches!(result, Err(EncodingError::InvalidData(_))));
    }
}
