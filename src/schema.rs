//! Host-side schema description and its lowering into the flat node list.
//!
//! Lists and maps are expanded here, once, into their fixed wrapper pattern:
//!
//! ```text
//! <rep> group tags (LIST)            <rep> group attrs (MAP)
//!   repeated group list                repeated group key_value (MAP_KEY_VALUE)
//!     <req|opt> element                  required key
//!                                        <req|opt> value
//! ```
//!
//! Nothing downstream of [`Schema::into_descriptor`] special-cases lists or
//! maps.

use crate::basic::{ConvertedType, Repetition};
use crate::common::to_internal_name;
use crate::descriptor::SchemaDescriptor;
use crate::error::SchemaError;
use crate::field::{DataType, Field, PrimitiveType};
use crate::node::SchemaNode;
use std::fmt;
use std::fmt::Formatter;
use std::fmt::Write;

pub const LIST_GROUP_NAME: &str = "list";
pub const LIST_ELEMENT_NAME: &str = "element";
pub const MAP_GROUP_NAME: &str = "key_value";
pub const MAP_KEY_NAME: &str = "key";
pub const MAP_VALUE_NAME: &str = "value";

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Lowers the schema to its pre-ordered node list.
    pub fn to_nodes(&self) -> Result<Vec<SchemaNode>, SchemaError> {
        let mut nodes = vec![SchemaNode::group(
            self.name.as_str(),
            Repetition::Required,
            self.fields.len(),
        )];
        let mut stack: Vec<Pending> = self.fields.iter().rev().map(Pending::Field).collect();

        while let Some(pending) = stack.pop() {
            match pending {
                Pending::Wrapper(node) => nodes.push(node),
                Pending::Field(field) => {
                    nodes.push(lower_field(field, field.name(), field.repetition(), &mut stack)?)
                }
                Pending::Renamed(field, name) => {
                    nodes.push(lower_field(field, name, field.repetition(), &mut stack)?)
                }
            }
        }

        Ok(nodes)
    }

    /// Builds the leaf column catalog for this schema.
    pub fn into_descriptor(self) -> Result<SchemaDescriptor, SchemaError> {
        SchemaDescriptor::from_nodes(self.to_nodes()?)
    }
}

/// Work item of the lowering walk.
enum Pending<'a> {
    Field(&'a Field),
    /// A list element, map key or map value, named by its fixed position.
    Renamed(&'a Field, &'static str),
    /// A synthesized repeated wrapper group.
    Wrapper(SchemaNode),
}

/// Emits the node for `field` and schedules its children. Children are
/// pushed in reverse so they pop in declaration order.
fn lower_field<'a>(
    field: &'a Field,
    name: &str,
    repetition: Repetition,
    stack: &mut Vec<Pending<'a>>,
) -> Result<SchemaNode, SchemaError> {
    let internal = field
        .internal_name()
        .map(String::from)
        .unwrap_or_else(|| to_internal_name(name));

    let node = match field.data_type() {
        DataType::Primitive(p) => SchemaNode::leaf(internal, repetition, *p)
            .with_encoding(field.encoding())
            .with_field_id(field.field_id()),
        DataType::Struct(children) => {
            if children.is_empty() {
                return Err(SchemaError::InvalidNode {
                    name: name.to_string(),
                    reason: "struct has no fields".to_string(),
                });
            }
            stack.extend(children.iter().rev().map(Pending::Field));
            SchemaNode::group(internal, repetition, children.len()).with_field_id(field.field_id())
        }
        DataType::List(element) => {
            if element.is_repeated() {
                return Err(SchemaError::UnsupportedTypeCombination {
                    name: name.to_string(),
                    reason: "list element must be required or optional".to_string(),
                });
            }
            stack.push(Pending::Renamed(element, LIST_ELEMENT_NAME));
            stack.push(Pending::Wrapper(SchemaNode::group(
                LIST_GROUP_NAME,
                Repetition::Repeated,
                1,
            )));
            SchemaNode::group(internal, repetition, 1)
                .with_converted(ConvertedType::List)
                .with_field_id(field.field_id())
        }
        DataType::Map(key, value) => {
            if key.repetition() != Repetition::Required {
                return Err(SchemaError::UnsupportedTypeCombination {
                    name: name.to_string(),
                    reason: "map key must be required".to_string(),
                });
            }
            if value.is_repeated() {
                return Err(SchemaError::UnsupportedTypeCombination {
                    name: name.to_string(),
                    reason: "map value must be required or optional".to_string(),
                });
            }
            stack.push(Pending::Renamed(value, MAP_VALUE_NAME));
            stack.push(Pending::Renamed(key, MAP_KEY_NAME));
            stack.push(Pending::Wrapper(
                SchemaNode::group(MAP_GROUP_NAME, Repetition::Repeated, 2)
                    .with_converted(ConvertedType::MapKeyValue),
            ));
            SchemaNode::group(internal, repetition, 1)
                .with_converted(ConvertedType::Map)
                .with_field_id(field.field_id())
        }
    };

    Ok(node.with_external_name(name))
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut buf = String::new();

        writeln!(&mut buf, "{} {{", self.name)?;
        for field in &self.fields {
            writeln!(&mut buf, "{}", field)?;
        }
        writeln!(&mut buf, "}}")?;

        write!(f, "{}", buf)
    }
}

pub struct SchemaBuilder {
    name: String,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Schema {
        Schema::new(self.name, self.fields)
    }
}

fn primitive(name: &str, t: PrimitiveType, repetition: Repetition) -> Field {
    Field::new(name, DataType::Primitive(t), repetition)
}

fn list_of(name: &str, element: PrimitiveType) -> Field {
    list(name, primitive(LIST_ELEMENT_NAME, element, Repetition::Required))
}

pub fn bool(name: &str) -> Field {
    primitive(name, PrimitiveType::boolean(), Repetition::Required)
}

pub fn integer(name: &str) -> Field {
    primitive(name, PrimitiveType::int32(), Repetition::Required)
}

pub fn long(name: &str) -> Field {
    primitive(name, PrimitiveType::int64(), Repetition::Required)
}

pub fn double(name: &str) -> Field {
    primitive(name, PrimitiveType::double(), Repetition::Required)
}

pub fn string(name: &str) -> Field {
    primitive(name, PrimitiveType::utf8(), Repetition::Required)
}

pub fn bytes(name: &str) -> Field {
    primitive(name, PrimitiveType::bytes(), Repetition::Required)
}

pub fn optional_bool(name: &str) -> Field {
    primitive(name, PrimitiveType::boolean(), Repetition::Optional)
}

pub fn optional_integer(name: &str) -> Field {
    primitive(name, PrimitiveType::int32(), Repetition::Optional)
}

pub fn optional_long(name: &str) -> Field {
    primitive(name, PrimitiveType::int64(), Repetition::Optional)
}

pub fn optional_double(name: &str) -> Field {
    primitive(name, PrimitiveType::double(), Repetition::Optional)
}

pub fn optional_string(name: &str) -> Field {
    primitive(name, PrimitiveType::utf8(), Repetition::Optional)
}

/// An optional list of required booleans.
pub fn repeated_bool(name: &str) -> Field {
    list_of(name, PrimitiveType::boolean())
}

/// An optional list of required 32-bit integers.
pub fn repeated_integer(name: &str) -> Field {
    list_of(name, PrimitiveType::int32())
}

/// An optional list of required 64-bit integers.
pub fn repeated_long(name: &str) -> Field {
    list_of(name, PrimitiveType::int64())
}

/// An optional list of required strings.
pub fn repeated_string(name: &str) -> Field {
    list_of(name, PrimitiveType::utf8())
}

/// An optional list. The element keeps its own repetition.
pub fn list(name: &str, element: Field) -> Field {
    Field::new(name, DataType::List(Box::new(element)), Repetition::Optional)
}

/// An optional map.
pub fn map(name: &str, key: Field, value: Field) -> Field {
    Field::new(
        name,
        DataType::Map(Box::new(key), Box::new(value)),
        Repetition::Optional,
    )
}

pub fn required_group(name: &str, fields: Vec<Field>) -> Field {
    Field::new(name, DataType::Struct(fields), Repetition::Required)
}

pub fn optional_group(name: &str, fields: Vec<Field>) -> Field {
    Field::new(name, DataType::Struct(fields), Repetition::Optional)
}

/// An optional list of required structs.
pub fn repeated_group(name: &str, fields: Vec<Field>) -> Field {
    list(name, required_group(LIST_ELEMENT_NAME, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::{Encoding, PhysicalType};

    #[test]
    fn test_empty_schema() {
        let empty = Schema::new("empty", vec![]);

        assert_eq!(empty.name(), "empty");
        assert_eq!(empty.fields().len(), 0);

        let descriptor = empty.into_descriptor().unwrap();
        assert_eq!(descriptor.num_columns(), 0);
    }

    #[test]
    fn test_flat_schema() {
        let schema = SchemaBuilder::new("account", vec![])
            .field(long("userid"))
            .field(bool("active"))
            .field(optional_string("email"))
            .build();

        assert_eq!(schema.name(), "account");
        assert_eq!(schema.fields().len(), 3);

        let descriptor = schema.into_descriptor().unwrap();
        assert_eq!(descriptor.leaf_paths(), vec!["userid", "active", "email"]);
        assert_eq!(descriptor.max_definition_level("email").unwrap(), 1);
    }

    #[test]
    fn test_required_and_optional_fields() {
        let required = [bool("b"), integer("i"), string("s")];
        let optional = [optional_bool("b"), optional_integer("i"), optional_string("s")];

        for field in required.iter() {
            assert!(
                !field.is_optional(),
                "Expected field to be required, found: {:?}",
                field
            );
        }
        for field in optional.iter() {
            assert!(
                field.is_optional(),
                "Expected field to be optional, found: {:?}",
                field
            );
        }
    }

    #[test]
    fn test_list_lowering() {
        let schema = Schema::new("doc", vec![repeated_string("tags")]);
        let nodes = schema.to_nodes().unwrap();

        let rendered: Vec<String> = nodes.iter().map(|n| n.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "required doc group[1]",
                "optional tags group[1] (LIST)",
                "repeated list group[1]",
                "required element BYTE_ARRAY (UTF8)",
            ]
        );
    }

    #[test]
    fn test_map_lowering() {
        let schema = Schema::new(
            "doc",
            vec![map("attrs", string("k"), optional_long("v"))],
        );
        let descriptor = schema.into_descriptor().unwrap();

        assert_eq!(
            descriptor.leaf_paths(),
            vec!["attrs.key_value.key", "attrs.key_value.value"]
        );
        assert_eq!(descriptor.max_definition_level("attrs.key_value.key").unwrap(), 2);
        assert_eq!(descriptor.max_definition_level("attrs.key_value.value").unwrap(), 3);
        assert_eq!(descriptor.max_repetition_level("attrs.key_value.value").unwrap(), 1);
    }

    #[test]
    fn test_optional_map_key_rejected() {
        let schema = Schema::new(
            "doc",
            vec![map("attrs", optional_string("k"), long("v"))],
        );

        assert!(matches!(
            schema.into_descriptor(),
            Err(SchemaError::UnsupportedTypeCombination { .. })
        ));
    }

    #[test]
    fn test_repeated_group() {
        let schema = Schema::new(
            "doc",
            vec![repeated_group(
                "links",
                vec![long("backward"), optional_long("forward")],
            )],
        );
        let descriptor = schema.into_descriptor().unwrap();

        assert_eq!(
            descriptor.leaf_paths(),
            vec!["links.list.element.backward", "links.list.element.forward"]
        );
        assert_eq!(
            descriptor.max_definition_level("links.list.element.forward").unwrap(),
            3
        );
    }

    #[test]
    fn test_internal_names() {
        let schema = Schema::new(
            "doc",
            vec![
                optional_string("e-mail"),
                long("id").with_internal_name("ID"),
            ],
        );
        let descriptor = schema.into_descriptor().unwrap();

        assert_eq!(descriptor.leaf_paths(), vec!["e_mail", "ID"]);
        assert_eq!(descriptor.to_internal_path("e-mail").unwrap(), "e_mail");
        assert_eq!(descriptor.to_external_path("ID").unwrap(), "id");
    }

    #[test]
    fn test_field_encoding_reaches_column() {
        let schema = Schema::new(
            "doc",
            vec![long("ts").with_encoding(Encoding::DeltaBinaryPacked)],
        );
        let descriptor = schema.into_descriptor().unwrap();

        assert_eq!(descriptor.column(0).encoding(), Encoding::DeltaBinaryPacked);
        assert_eq!(descriptor.column(0).physical_type(), PhysicalType::Int64);
    }
}
