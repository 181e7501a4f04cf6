//! Closed sum type over the physical storage types.
//!
//! Every encode, decode and compare site matches exhaustively on
//! [`PhysicalValue`], so adding a physical type is a compile error everywhere
//! it needs handling.

use crate::basic::PhysicalType;
use std::cmp::Ordering;
use std::fmt;

/// Julian day number of 1970-01-01.
pub const JULIAN_DAY_OF_EPOCH: i64 = 2_440_588;
const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Legacy 12 byte timestamp: nanoseconds within the day followed by the
/// julian day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Int96 {
    nanos: u64,
    julian_day: u32,
}

impl Int96 {
    pub fn new(nanos: u64, julian_day: u32) -> Self {
        Self { nanos, julian_day }
    }

    pub fn nanos(&self) -> u64 {
        self.nanos
    }

    pub fn julian_day(&self) -> u32 {
        self.julian_day
    }

    pub fn from_le_bytes(bytes: [u8; 12]) -> Self {
        let mut nanos = [0u8; 8];
        let mut day = [0u8; 4];
        nanos.copy_from_slice(&bytes[..8]);
        day.copy_from_slice(&bytes[8..]);
        Self {
            nanos: u64::from_le_bytes(nanos),
            julian_day: u32::from_le_bytes(day),
        }
    }

    pub fn to_le_bytes(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[..8].copy_from_slice(&self.nanos.to_le_bytes());
        out[8..].copy_from_slice(&self.julian_day.to_le_bytes());
        out
    }

    /// Converts microseconds since the unix epoch. Returns `None` when the
    /// day falls outside the julian days an INT96 can hold.
    pub fn from_micros(micros: i64) -> Option<Self> {
        let days = micros.div_euclid(MICROS_PER_DAY);
        let micros_of_day = micros.rem_euclid(MICROS_PER_DAY);
        let julian_day = u32::try_from(days.checked_add(JULIAN_DAY_OF_EPOCH)?).ok()?;
        Some(Self {
            nanos: micros_of_day as u64 * 1000,
            julian_day,
        })
    }

    /// Microseconds since the unix epoch, truncating sub-microsecond digits.
    /// Returns `None` when the instant does not fit in an i64.
    pub fn to_micros(&self) -> Option<i64> {
        (self.julian_day as i64 - JULIAN_DAY_OF_EPOCH)
            .checked_mul(MICROS_PER_DAY)?
            .checked_add((self.nanos / 1000) as i64)
    }
}

impl PartialOrd for Int96 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Int96 {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.julian_day, self.nanos).cmp(&(other.julian_day, other.nanos))
    }
}

/// A single non-null value in its physical representation.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Int96(Int96),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    FixedLenByteArray(Vec<u8>),
}

impl PhysicalValue {
    pub fn physical_type(&self) -> PhysicalType {
        match self {
            PhysicalValue::Boolean(_) => PhysicalType::Boolean,
            PhysicalValue::Int32(_) => PhysicalType::Int32,
            PhysicalValue::Int64(_) => PhysicalType::Int64,
            PhysicalValue::Int96(_) => PhysicalType::Int96,
            PhysicalValue::Float(_) => PhysicalType::Float,
            PhysicalValue::Double(_) => PhysicalType::Double,
            PhysicalValue::ByteArray(_) => PhysicalType::ByteArray,
            PhysicalValue::FixedLenByteArray(_) => PhysicalType::FixedLenByteArray,
        }
    }

    /// Size of the value once PLAIN encoded, including the length prefix of
    /// byte arrays. Booleans count as one byte.
    pub fn plain_size(&self) -> usize {
        match self {
            PhysicalValue::Boolean(_) => 1,
            PhysicalValue::Int32(_) | PhysicalValue::Float(_) => 4,
            PhysicalValue::Int64(_) | PhysicalValue::Double(_) => 8,
            PhysicalValue::Int96(_) => 12,
            PhysicalValue::ByteArray(b) => 4 + b.len(),
            PhysicalValue::FixedLenByteArray(b) => b.len(),
        }
    }

    /// Checks if the value is a floating point NaN, which is left out of
    /// statistics.
    pub fn is_nan(&self) -> bool {
        match self {
            PhysicalValue::Float(v) => v.is_nan(),
            PhysicalValue::Double(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Natural order of two values of the same physical type.
    ///
    /// Integers compare as unsigned when `unsigned` is set. Byte arrays
    /// compare lexicographically as unsigned bytes. Values of different
    /// physical types are unordered.
    pub fn compare(&self, other: &PhysicalValue, unsigned: bool) -> Option<Ordering> {
        use PhysicalValue::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Int32(a), Int32(b)) if unsigned => Some((*a as u32).cmp(&(*b as u32))),
            (Int32(a), Int32(b)) => Some(a.cmp(b)),
            (Int64(a), Int64(b)) if unsigned => Some((*a as u64).cmp(&(*b as u64))),
            (Int64(a), Int64(b)) => Some(a.cmp(b)),
            (Int96(a), Int96(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Double(a), Double(b)) => a.partial_cmp(b),
            (ByteArray(a), ByteArray(b)) => Some(a.as_slice().cmp(b.as_slice())),
            (FixedLenByteArray(a), FixedLenByteArray(b)) => Some(a.as_slice().cmp(b.as_slice())),
            _ => None,
        }
    }
}

impl fmt::Display for PhysicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalValue::Boolean(v) => write!(f, "{v}"),
            PhysicalValue::Int32(v) => write!(f, "{v}"),
            PhysicalValue::Int64(v) => write!(f, "{v}"),
            PhysicalValue::Int96(v) => write!(f, "int96({}, {})", v.julian_day, v.nanos),
            PhysicalValue::Float(v) => write!(f, "{v}"),
            PhysicalValue::Double(v) => write!(f, "{v}"),
            PhysicalValue::ByteArray(v) | PhysicalValue::FixedLenByteArray(v) => {
                write!(f, "{}", String::from_utf8_lossy(v))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int96_micros() {
        let epoch = Int96::from_micros(0).unwrap();
        assert_eq!(epoch.julian_day(), JULIAN_DAY_OF_EPOCH as u32);
        assert_eq!(epoch.nanos(), 0);

        let before = Int96::from_micros(-1).unwrap();
        assert_eq!(before.julian_day(), JULIAN_DAY_OF_EPOCH as u32 - 1);
        assert_eq!(before.to_micros(), Some(-1));
        assert!(before < epoch);

        let bytes = Int96::from_micros(1_700_000_000_123_456).unwrap().to_le_bytes();
        assert_eq!(Int96::from_le_bytes(bytes).to_micros(), Some(1_700_000_000_123_456));
    }

    #[test]
    fn test_int96_micros_out_of_range() {
        assert_eq!(
            Int96::new(0, u32::MAX).to_micros(),
            None,
            "The last julian day is past i64 microseconds"
        );
        assert_eq!(Int96::from_micros(i64::MIN), None, "Days before julian day 0");

        let last = Int96::from_micros(i64::MAX).unwrap();
        assert_eq!(last.to_micros(), Some(i64::MAX));
    }

    #[test]
    fn test_unsigned_ordering() {
        let a = PhysicalValue::Int32(-1);
        let b = PhysicalValue::Int32(1);

        assert_eq!(a.compare(&b, false), Some(Ordering::Less));
        assert_eq!(
            a.compare(&b, true),
            Some(Ordering::Greater),
            "-1 reinterpreted as u32 is the largest value"
        );
    }

    #[test]
    fn test_byte_ordering() {
        let a = PhysicalValue::ByteArray(b"ab".to_vec());
        let b = PhysicalValue::ByteArray(b"b".to_vec());
        let c = PhysicalValue::ByteArray(vec![0xff]);

        assert_eq!(a.compare(&b, false), Some(Ordering::Less));
        assert_eq!(b.compare(&c, false), Some(Ordering::Less));
        assert_eq!(a.compare(&PhysicalValue::Int32(1), false), None);
    }

    #[test]
    fn test_boolean_ordering() {
        let f = PhysicalValue::Boolean(false);
        let t = PhysicalValue::Boolean(true);

        assert_eq!(f.compare(&t, false), Some(Ordering::Less));
    }
}
