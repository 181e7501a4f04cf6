//! A single entry of the flat, pre-ordered schema node list.

use crate::basic::{ConvertedType, Encoding, PhysicalType, Repetition};
use crate::field::PrimitiveType;
use std::fmt;

/// A node in the nested type tree, stored in pre-order in a flat list.
///
/// Leaves carry a physical type, groups carry a child count. The children of
/// a group are the nodes which immediately follow it in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    name: String,
    external_name: String,
    repetition: Repetition,
    physical_type: Option<PhysicalType>,
    converted_type: Option<ConvertedType>,
    type_length: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
    num_children: Option<usize>,
    field_id: Option<i32>,
    encoding: Option<Encoding>,
}

impl SchemaNode {
    /// Creates a group node holding the next `num_children` subtrees.
    pub fn group(name: impl Into<String>, repetition: Repetition, num_children: usize) -> Self {
        let name = name.into();
        Self {
            external_name: name.clone(),
            name,
            repetition,
            physical_type: None,
            converted_type: None,
            type_length: None,
            precision: None,
            scale: None,
            num_children: Some(num_children),
            field_id: None,
            encoding: None,
        }
    }

    /// Creates a leaf node.
    pub fn leaf(name: impl Into<String>, repetition: Repetition, primitive: PrimitiveType) -> Self {
        let name = name.into();
        Self {
            external_name: name.clone(),
            name,
            repetition,
            physical_type: Some(primitive.physical()),
            converted_type: primitive.converted(),
            type_length: primitive.type_length(),
            precision: primitive.precision(),
            scale: primitive.scale(),
            num_children: None,
            field_id: None,
            encoding: None,
        }
    }

    /// Creates a node from raw attributes as found in a file footer. No
    /// consistency checks are made here; see
    /// [`SchemaDescriptor::from_nodes`](crate::descriptor::SchemaDescriptor::from_nodes).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_raw(
        name: String,
        repetition: Repetition,
        physical_type: Option<PhysicalType>,
        converted_type: Option<ConvertedType>,
        type_length: Option<i32>,
        precision: Option<i32>,
        scale: Option<i32>,
        num_children: Option<usize>,
        field_id: Option<i32>,
    ) -> Self {
        Self {
            external_name: name.clone(),
            name,
            repetition,
            physical_type,
            converted_type,
            type_length,
            precision,
            scale,
            num_children,
            field_id,
            encoding: None,
        }
    }

    pub fn with_converted(mut self, converted: ConvertedType) -> Self {
        self.converted_type = Some(converted);
        self
    }

    /// Sets the application facing name. The on-disk name is unchanged.
    pub fn with_external_name(mut self, name: impl Into<String>) -> Self {
        self.external_name = name.into();
        self
    }

    pub fn with_encoding(mut self, encoding: Option<Encoding>) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_field_id(mut self, field_id: Option<i32>) -> Self {
        self.field_id = field_id;
        self
    }

    /// On-disk name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn external_name(&self) -> &str {
        &self.external_name
    }

    pub fn repetition(&self) -> Repetition {
        self.repetition
    }

    pub fn physical_type(&self) -> Option<PhysicalType> {
        self.physical_type
    }

    pub fn converted_type(&self) -> Option<ConvertedType> {
        self.converted_type
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

    pub fn num_children(&self) -> Option<usize> {
        self.num_children
    }

    pub fn field_id(&self) -> Option<i32> {
        self.field_id
    }

    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    pub fn is_leaf(&self) -> bool {
        self.num_children.is_none()
    }

    /// Leaf type information, `None` for groups.
    pub fn primitive(&self) -> Option<PrimitiveType> {
        let physical = self.physical_type?;
        let mut t = PrimitiveType::new(physical);
        if let Some(converted) = self.converted_type {
            t = t.with_converted(converted);
        }
        if let Some(len) = self.type_length {
            t = t.with_type_length(len);
        }
        if let (Some(p), Some(s)) = (self.precision, self.scale) {
            let base = PrimitiveType::decimal(physical, p, s);
            t = match self.type_length {
                Some(len) => base.with_type_length(len),
                None => base,
            };
        }
        Some(t)
    }
}

impl fmt::Display for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.repetition.label().to_lowercase(), self.name)?;
        match (self.physical_type, self.num_children) {
            (Some(t), _) => write!(f, " {t}")?,
            (None, Some(n)) => write!(f, " group[{n}]")?,
            (None, None) => write!(f, " <untyped>")?,
        }
        if let Some(c) = self.converted_type {
            write!(f, " ({c})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_and_group() {
        let leaf = SchemaNode::leaf("id", Repetition::Required, PrimitiveType::int64());
        let group = SchemaNode::group("tags", Repetition::Optional, 1).with_converted(ConvertedType::List);

        assert!(leaf.is_leaf());
        assert!(!group.is_leaf());
        assert_eq!(leaf.to_string(), "required id INT64");
        assert_eq!(group.to_string(), "optional tags group[1] (LIST)");
        assert_eq!(group.primitive(), None);
    }

    #[test]
    fn test_primitive_recovers_decimal() {
        let t = PrimitiveType::decimal(PhysicalType::FixedLenByteArray, 9, 3).with_type_length(4);
        let node = SchemaNode::leaf("price", Repetition::Optional, t);

        assert_eq!(
            node.primitive(),
            Some(t),
            "Expected decimal attributes to survive, found {:?}",
            node
        );
    }
}
