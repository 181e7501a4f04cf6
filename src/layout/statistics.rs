//! Running min/max and null counts for pages and chunks.

use crate::basic::PhysicalType;
use crate::descriptor::ColumnDescriptor;
use crate::encoding::plain;
use crate::error::EncodingError;
use crate::metadata::Statistics;
use crate::physical::PhysicalValue;
use std::cmp::Ordering;

/// Statistics over typed values.
///
/// Ordering follows [`PhysicalValue::compare`]; NaN is left out of min and
/// max.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueStatistics {
    min: Option<PhysicalValue>,
    max: Option<PhysicalValue>,
    null_count: u64,
    distinct_count: Option<u64>,
    unsigned: bool,
}

impl ValueStatistics {
    pub fn new(unsigned: bool) -> Self {
        Self {
            min: None,
            max: None,
            null_count: 0,
            distinct_count: None,
            unsigned,
        }
    }

    pub fn for_column(column: &ColumnDescriptor) -> Self {
        Self::new(column.is_unsigned())
    }

    pub fn min(&self) -> Option<&PhysicalValue> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&PhysicalValue> {
        self.max.as_ref()
    }

    pub fn null_count(&self) -> u64 {
        self.null_count
    }

    pub fn distinct_count(&self) -> Option<u64> {
        self.distinct_count
    }

    pub fn set_distinct_count(&mut self, count: u64) {
        self.distinct_count = Some(count);
    }

    /// Folds in one slot of a column stream.
    pub fn update(&mut self, value: Option<&PhysicalValue>) {
        match value {
            None => self.null_count += 1,
            Some(v) => self.update_value(v),
        }
    }

    fn update_value(&mut self, value: &PhysicalValue) {
        if value.is_nan() {
            return;
        }
        if self.is(&self.min, value, Ordering::Less) {
            self.min = Some(value.clone());
        }
        if self.is(&self.max, value, Ordering::Greater) {
            self.max = Some(value.clone());
        }
    }

    /// Checks if `candidate` should replace `current`.
    fn is(&self, current: &Option<PhysicalValue>, candidate: &PhysicalValue, wanted: Ordering) -> bool {
        match current {
            None => true,
            Some(current) => candidate.compare(current, self.unsigned) == Some(wanted),
        }
    }

    /// Folds another set of statistics into this one.
    pub fn merge(&mut self, other: &ValueStatistics) {
        self.null_count += other.null_count;
        if let Some(ref min) = other.min {
            self.update_value(min);
        }
        if let Some(ref max) = other.max {
            self.update_value(max);
        }
    }

    /// Serializes min and max as PLAIN bytes without the length prefix of
    /// byte arrays, filling both the legacy and the current fields.
    pub fn to_thrift(&self) -> Statistics {
        let min = self.min.as_ref().map(stat_bytes);
        let max = self.max.as_ref().map(stat_bytes);
        Statistics {
            max: max.clone(),
            min: min.clone(),
            null_count: Some(self.null_count as i64),
            distinct_count: self.distinct_count.map(|d| d as i64),
            max_value: max,
            min_value: min,
        }
    }

    /// Decodes footer statistics for `column`.
    pub fn from_thrift(stats: &Statistics, column: &ColumnDescriptor) -> Result<Self, EncodingError> {
        let decode = |bytes: Option<&[u8]>| -> Result<Option<PhysicalValue>, EncodingError> {
            bytes.map(|b| from_stat_bytes(b, column)).transpose()
        };
        Ok(Self {
            min: decode(stats.min_bytes())?,
            max: decode(stats.max_bytes())?,
            null_count: stats.null_count.unwrap_or(0).max(0) as u64,
            distinct_count: stats.distinct_count.map(|d| d.max(0) as u64),
            unsigned: column.is_unsigned(),
        })
    }
}

fn stat_bytes(value: &PhysicalValue) -> Vec<u8> {
    match value {
        PhysicalValue::ByteArray(b) => b.clone(),
        other => {
            let mut out = Vec::with_capacity(other.plain_size());
            plain::encode_one(other, &mut out);
            out
        }
    }
}

fn from_stat_bytes(bytes: &[u8], column: &ColumnDescriptor) -> Result<PhysicalValue, EncodingError> {
    match column.physical_type() {
        PhysicalType::ByteArray => Ok(PhysicalValue::ByteArray(bytes.to_vec())),
        PhysicalType::Boolean => match bytes {
            [b] => Ok(PhysicalValue::Boolean(*b != 0)),
            _ => Err(EncodingError::InvalidData(format!(
                "boolean statistic of {} bytes",
                bytes.len()
            ))),
        },
        physical => {
            let mut values = plain::decode(bytes, physical, column.type_length(), 1)?;
            values
                .pop()
                .ok_or_else(|| EncodingError::InvalidData("empty statistic".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{optional_long, Schema};

    #[test]
    fn test_running_min_max() {
        let mut stats = ValueStatistics::new(false);
        for v in [Some(5), None, Some(1), Some(9), None, Some(3)] {
            stats.update(v.map(PhysicalValue::Int64).as_ref());
        }

        assert_eq!(stats.min(), Some(&PhysicalValue::Int64(1)));
        assert_eq!(stats.max(), Some(&PhysicalValue::Int64(9)));
        assert_eq!(stats.null_count(), 2);
    }

    #[test]
    fn test_nan_is_skipped() {
        let mut stats = ValueStatistics::new(false);
        stats.update(Some(&PhysicalValue::Double(f64::NAN)));
        stats.update(Some(&PhysicalValue::Double(2.0)));
        stats.update(Some(&PhysicalValue::Double(f64::NAN)));

        assert_eq!(stats.min(), Some(&PhysicalValue::Double(2.0)));
        assert_eq!(stats.max(), Some(&PhysicalValue::Double(2.0)));
    }

    #[test]
    fn test_unsigned_order() {
        let mut stats = ValueStatistics::new(true);
        stats.update(Some(&PhysicalValue::Int32(-1)));
        stats.update(Some(&PhysicalValue::Int32(7)));

        assert_eq!(stats.min(), Some(&PhysicalValue::Int32(7)));
        assert_eq!(stats.max(), Some(&PhysicalValue::Int32(-1)), "-1 is u32::MAX");
    }

    #[test]
    fn test_merge() {
        let mut a = ValueStatistics::new(false);
        a.update(Some(&PhysicalValue::ByteArray(b"m".to_vec())));
        a.update(None);
        let mut b = ValueStatistics::new(false);
        b.update(Some(&PhysicalValue::ByteArray(b"a".to_vec())));
        b.update(Some(&PhysicalValue::ByteArray(b"z".to_vec())));
        a.merge(&b);

        assert_eq!(a.min(), Some(&PhysicalValue::ByteArray(b"a".to_vec())));
        assert_eq!(a.max(), Some(&PhysicalValue::ByteArray(b"z".to_vec())));
        assert_eq!(a.null_count(), 1);
    }

    #[test]
    fn test_thrift_bytes() {
        let schema = Schema::new("doc", vec![optional_long("n")]).into_descriptor().unwrap();
        let mut stats = ValueStatistics::for_column(schema.column(0));
        stats.update(Some(&PhysicalValue::Int64(9)));
        stats.update(Some(&PhysicalValue::Int64(1)));

        let thrift = stats.to_thrift();
        assert_eq!(thrift.max, Some(9i64.to_le_bytes().to_vec()));
        assert_eq!(thrift.min_value, Some(1i64.to_le_bytes().to_vec()));
        assert_eq!(ValueStatistics::from_thrift(&thrift, schema.column(0)).unwrap(), stats);

        let text = ValueStatistics {
            min: Some(PhysicalValue::ByteArray(b"abc".to_vec())),
            ..ValueStatistics::new(false)
        };
        assert_eq!(
            text.to_thrift().min,
            Some(b"abc".to_vec()),
            "Byte arrays are stored without their length prefix"
        );
    }
}
