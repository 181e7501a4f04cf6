//! Defines the building blocks for describing schemas: [`Field`], [`DataType`]
//! and [`PrimitiveType`].

use crate::basic::{ConvertedType, Encoding, PhysicalType, Repetition};
use std::fmt::{self, Formatter, Write};

/// Physical type of a leaf together with its logical annotation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PrimitiveType {
    physical: PhysicalType,
    converted: Option<ConvertedType>,
    type_length: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
}

impl PrimitiveType {
    /// Creates an un-annotated primitive of the given physical type.
    pub fn new(physical: PhysicalType) -> Self {
        Self {
            physical,
            converted: None,
            type_length: None,
            precision: None,
            scale: None,
        }
    }

    pub fn boolean() -> Self {
        Self::new(PhysicalType::Boolean)
    }

    pub fn int32() -> Self {
        Self::new(PhysicalType::Int32)
    }

    pub fn int64() -> Self {
        Self::new(PhysicalType::Int64)
    }

    pub fn int96() -> Self {
        Self::new(PhysicalType::Int96)
    }

    pub fn float() -> Self {
        Self::new(PhysicalType::Float)
    }

    pub fn double() -> Self {
        Self::new(PhysicalType::Double)
    }

    pub fn bytes() -> Self {
        Self::new(PhysicalType::ByteArray)
    }

    /// UTF-8 text stored as a byte array.
    pub fn utf8() -> Self {
        Self::bytes().with_converted(ConvertedType::Utf8)
    }

    pub fn fixed(type_length: i32) -> Self {
        let mut t = Self::new(PhysicalType::FixedLenByteArray);
        t.type_length = Some(type_length);
        t
    }

    /// Days since the unix epoch stored as INT32.
    pub fn date() -> Self {
        Self::int32().with_converted(ConvertedType::Date)
    }

    pub fn timestamp_millis() -> Self {
        Self::int64().with_converted(ConvertedType::TimestampMillis)
    }

    pub fn timestamp_micros() -> Self {
        Self::int64().with_converted(ConvertedType::TimestampMicros)
    }

    /// Decimal stored in `physical`. For fixed length byte arrays set the
    /// length with [`PrimitiveType::with_type_length`].
    pub fn decimal(physical: PhysicalType, precision: i32, scale: i32) -> Self {
        let mut t = Self::new(physical).with_converted(ConvertedType::Decimal);
        t.precision = Some(precision);
        t.scale = Some(scale);
        t
    }

    pub fn with_converted(mut self, converted: ConvertedType) -> Self {
        self.converted = Some(converted);
        self
    }

    pub fn with_type_length(mut self, type_length: i32) -> Self {
        self.type_length = Some(type_length);
        self
    }

    pub fn physical(&self) -> PhysicalType {
        self.physical
    }

    pub fn converted(&self) -> Option<ConvertedType> {
        self.converted
    }

    pub fn type_length(&self) -> Option<i32> {
        self.type_length
    }

    pub fn precision(&self) -> Option<i32> {
        self.precision
    }

    pub fn scale(&self) -> Option<i32> {
        self.scale
    }
}

/// Represents the primitive, nested and repeated types a field can hold.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum DataType {
    /// A leaf value.
    Primitive(PrimitiveType),
    /// A list of elements. The element field carries the element's own
    /// repetition (required or optional); its name is ignored and replaced by
    /// `element` when the schema is built.
    List(Box<Field>),
    /// Key-value pairs. The key must be required.
    Map(Box<Field>, Box<Field>),
    /// A nested structure (group/record) containing named fields.
    Struct(Vec<Field>),
}

impl DataType {
    /// Checks if data type is a [`DataType::List`]
    pub fn is_list(&self) -> bool {
        matches!(self, DataType::List(_))
    }

    /// Checks if the data type is a leaf.
    pub fn is_primitive(&self) -> bool {
        matches!(self, DataType::Primitive(_))
    }

    /// Returns a string label representing the variant of this [`DataType`].
    pub fn type_label(&self) -> String {
        match self {
            DataType::Primitive(p) => match p.converted() {
                Some(c) => format!("{}({})", p.physical(), c),
                None => p.physical().to_string(),
            },
            DataType::List(_) => "List".into(), // does not include element type
            DataType::Map(_, _) => "Map".into(),
            DataType::Struct(_) => "Struct".into(), // does not include fields
        }
    }
}

/// Represents a named schema element, its data type and repetition.
///
/// A field may carry an on-disk (internal) name different from its
/// application facing name, and a preferred value encoding for leaves.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Field {
    name: String,
    internal_name: Option<String>,
    data_type: DataType,
    repetition: Repetition,
    encoding: Option<Encoding>,
    field_id: Option<i32>,
}

impl Field {
    /// Creates a field definition.
    ///
    /// # Parameters
    /// * `name` - Application facing name of the field.
    /// * `data_type` - The [`DataType`] of the field.
    /// * `repetition` - Whether the field is required, optional or repeated.
    pub fn new(name: impl Into<String>, data_type: DataType, repetition: Repetition) -> Self {
        Field {
            name: name.into(),
            internal_name: None,
            data_type,
            repetition,
            encoding: None,
            field_id: None,
        }
    }

    /// Sets the name written to the file, leaving [`Field::name`] as the
    /// application facing name.
    pub fn with_internal_name(mut self, name: impl Into<String>) -> Self {
        self.internal_name = Some(name.into());
        self
    }

    /// Selects the value encoding used when this leaf is written.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn with_field_id(mut self, id: i32) -> Self {
        self.field_id = Some(id);
        self
    }

    /// Returns the name of the field.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn internal_name(&self) -> Option<&str> {
        self.internal_name.as_deref()
    }

    /// Returns a reference to the [`DataType`] of the field.
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn repetition(&self) -> Repetition {
        self.repetition
    }

    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    pub fn field_id(&self) -> Option<i32> {
        self.field_id
    }

    /// Checks if a field is either optional or repeated.
    pub fn is_optional(&self) -> bool {
        self.repetition != Repetition::Required
    }

    /// Checks if a field is repeated.
    pub fn is_repeated(&self) -> bool {
        self.repetition == Repetition::Repeated
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.name,
            self.repetition.label().to_lowercase(),
            self.data_type,
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Primitive(_) => write!(f, "{}", self.type_label()),
            DataType::List(ref element) => write!(f, "List [ {element} ]"),
            DataType::Map(ref key, ref value) => write!(f, "Map [ {key} => {value} ]"),
            DataType::Struct(fields) => {
                writeln!(f, "Struct {{")?;
                let mut buf = String::new();
                for field in fields.iter() {
                    writeln!(buf, "  {field},")?;
                }
                writeln!(
                    f,
                    "{}",
                    buf.lines()
                        .map(|line| format!(" {line}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                )?;
                write!(f, "}}")
            }
        }
    }
}
