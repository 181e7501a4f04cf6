//! Defines the representation of nested record values.

use std::fmt;
use std::fmt::Formatter;

/// Fixed point decimal: `unscaled * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: i128,
    scale: u32,
}

impl Decimal {
    pub fn new(unscaled: i128, scale: u32) -> Self {
        Self { unscaled, scale }
    }

    pub fn unscaled(&self) -> i128 {
        self.unscaled
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Converts to a different scale. Growing the scale fails on overflow,
    /// shrinking it truncates toward zero.
    pub fn rescale(&self, scale: u32) -> Option<Decimal> {
        let unscaled = if scale >= self.scale {
            let factor = 10i128.checked_pow(scale - self.scale)?;
            self.unscaled.checked_mul(factor)?
        } else {
            let factor = 10i128.checked_pow(self.scale - scale)?;
            self.unscaled / factor
        };
        Some(Decimal { unscaled, scale })
    }

    /// Parses `-123.45` style text. Exponents are not accepted.
    pub fn parse(text: &str) -> Option<Decimal> {
        let text = text.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        let mut unscaled: i128 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let d = c.to_digit(10)? as i128;
            unscaled = unscaled.checked_mul(10)?.checked_add(d)?;
        }
        if negative {
            unscaled = -unscaled;
        }
        Some(Decimal::new(unscaled, frac_part.len() as u32))
    }

    /// Nearest decimal with the given scale.
    pub fn from_f64(value: f64, scale: u32) -> Option<Decimal> {
        let scaled = (value * 10f64.powi(scale as i32)).round();
        if !scaled.is_finite() || scaled.abs() >= i128::MAX as f64 {
            return None;
        }
        Some(Decimal::new(scaled as i128, scale))
    }

    pub fn to_f64(&self) -> f64 {
        self.unscaled as f64 / 10f64.powi(self.scale as i32)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.unsigned_abs().to_string();
        let sign = if self.unscaled < 0 { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

/// Represents the concrete instance of a nested record.
///
/// Struct properties are matched to schema fields by their application
/// facing name, in any order. A property which is missing is treated the
/// same as [`Value::Null`].
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    /// Absent value for an optional field, or a null list element.
    Null,
    Boolean(bool),
    /// Signed integer for any signed integer column.
    Int(i64),
    /// Unsigned integer for UINT annotated columns.
    UInt(u64),
    Float(f32),
    Double(f64),
    /// UTF-8 text.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    Decimal(Decimal),
    /// Days since the unix epoch.
    Date(i32),
    /// Microseconds since the unix epoch.
    Timestamp(i64),
    /// Elements of a list or repeated field. Zero elements means the list is
    /// empty, which differs from a null list.
    List(Vec<Value>),
    /// Entries of a map in insertion order.
    Map(Vec<(Value, Value)>),
    /// A nested structure (group/record) containing name, value pairs.
    Struct(Vec<(String, Value)>),
}

impl Value {
    fn fmt_with_indent(&self, f: &mut Formatter<'_>, indent: usize) -> fmt::Result {
        match self {
            Value::List(values) if values.is_empty() => write!(f, "[]"),
            Value::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?
                    }
                    value.fmt_with_indent(f, indent)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?
                    }
                    write!(f, "{k} => ")?;
                    v.fmt_with_indent(f, indent)?;
                }
                write!(f, "}}")
            }
            Value::Struct(fields) if fields.is_empty() => write!(f, "{{}}"),
            Value::Struct(fields) => {
                writeln!(f, "{{")?;
                for (k, v) in fields {
                    write!(f, "{:indent$}", "", indent = indent + 2)?;
                    write!(f, "{}: ", k)?;
                    v.fmt_with_indent(f, indent + 2)?;
                    writeln!(f, ",")?;
                }
                write!(f, "{:indent$}}}", "", indent = indent)
            }
            Value::Null => write!(f, "null"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}u"),
            Value::Float(v) => write!(f, "{v}f"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Bytes(v) => write!(f, "0x{}", v.iter().map(|b| format!("{b:02x}")).collect::<String>()),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "date({v})"),
            Value::Timestamp(v) => write!(f, "ts({v})"),
        }
    }

    /// Checks if a value is null.
    ///
    /// An empty list or struct is not null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in error messages.
    pub fn type_label(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Int(_) => "Int",
            Value::UInt(_) => "UInt",
            Value::Float(_) => "Float",
            Value::Double(_) => "Double",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Decimal(_) => "Decimal",
            Value::Date(_) => "Date",
            Value::Timestamp(_) => "Timestamp",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Struct(_) => "Struct",
        }
    }

    /// Looks up a struct property by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.fmt_with_indent(f, 0)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<(String, Value)>> for Value {
    fn from(fields: Vec<(String, Value)>) -> Self {
        Self::Struct(fields)
    }
}

/// Ergonomic builder pattern API for creating a concrete nested value.
#[derive(Debug, Default, Clone)]
pub struct ValueBuilder {
    fields: Vec<(String, Value)>,
}

impl ValueBuilder {
    /// Add a name, value pair to the value being built.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Add a name, repeated value to the value being built.
    pub fn repeated(
        mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        self.fields.push((
            key.into(),
            Value::List(values.into_iter().map(Into::into).collect()),
        ));
        self
    }

    /// Add a map from key, value pairs.
    pub fn map(
        mut self,
        key: impl Into<String>,
        entries: impl IntoIterator<Item = (impl Into<Value>, impl Into<Value>)>,
    ) -> Self {
        self.fields.push((
            key.into(),
            Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        ));
        self
    }

    /// Add a boolean type value or null value
    pub fn boolean(self, key: impl Into<String>, value: Option<bool>) -> Self {
        self.field(key, value)
    }

    /// Add a integer type value or null value
    pub fn integer(self, key: impl Into<String>, value: Option<i64>) -> Self {
        self.field(key, value)
    }

    /// Add a string type value or null value
    pub fn string(self, key: impl Into<String>, value: Option<&str>) -> Self {
        self.field(key, value)
    }

    /// Consumes the builder and returns the constructed [`Value`]
    pub fn build(self) -> Value {
        Value::Struct(self.fields)
    }
}
