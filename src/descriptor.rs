//! Flat leaf column catalog derived from a pre-ordered list of schema nodes.
//!
//! The catalog is the single source of truth downstream: column order,
//! maximum levels and the shape of the tree (parents, children and the
//! contiguous range of leaves below each node) are all computed here once.

use crate::basic::{ConvertedType, Encoding, PhysicalType, Repetition};
use crate::common::{DefinitionLevel, RepetitionLevel};
use crate::error::SchemaError;
use crate::field::PrimitiveType;
use crate::node::SchemaNode;
use crate::path_vector::ColumnPath;
use rustc_hash::FxHashMap;
use std::fmt;
use std::ops::Range;

/// Position of a node within the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeShape {
    parent: Option<usize>,
    children: Vec<usize>,
    path: ColumnPath,
    external_path: ColumnPath,
    def_level: DefinitionLevel,
    rep_level: RepetitionLevel,
    leaves: Range<usize>,
}

impl NodeShape {
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// On-disk path from the root (excluded) to this node.
    pub fn path(&self) -> &ColumnPath {
        &self.path
    }

    pub fn external_path(&self) -> &ColumnPath {
        &self.external_path
    }

    /// Count of optional or repeated nodes from the root (excluded) down to
    /// and including this node.
    pub fn def_level(&self) -> DefinitionLevel {
        self.def_level
    }

    /// Count of repeated nodes from the root (excluded) down to and
    /// including this node.
    pub fn rep_level(&self) -> RepetitionLevel {
        self.rep_level
    }

    /// Indices of the leaf columns below this node. Leaves of a subtree are
    /// always contiguous in catalog order.
    pub fn leaves(&self) -> Range<usize> {
        self.leaves.clone()
    }
}

/// Everything needed to encode, decode and reassemble one leaf column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    index: usize,
    node_index: usize,
    path: ColumnPath,
    external_path: ColumnPath,
    primitive: PrimitiveType,
    repetition: Repetition,
    max_def_level: DefinitionLevel,
    max_rep_level: RepetitionLevel,
    encoding: Encoding,
}

impl ColumnDescriptor {
    /// Position of the column in catalog order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Position of the leaf node in the flat node list.
    pub fn node_index(&self) -> usize {
        self.node_index
    }

    pub fn path(&self) -> &ColumnPath {
        &self.path
    }

    pub fn external_path(&self) -> &ColumnPath {
        &self.external_path
    }

    pub fn primitive(&self) -> PrimitiveType {
        self.primitive
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.primitive.physical()
    }

    pub fn converted_type(&self) -> Option<ConvertedType> {
        self.primitive.converted()
    }

    pub fn type_length(&self) -> Option<i32> {
        self.primitive.type_length()
    }

    pub fn repetition(&self) -> Repetition {
        self.repetition
    }

    pub fn max_definition_level(&self) -> DefinitionLevel {
        self.max_def_level
    }

    pub fn max_repetition_level(&self) -> RepetitionLevel {
        self.max_rep_level
    }

    /// Value encoding selected for the column, PLAIN unless overridden.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Checks if statistics compare this column's integers as unsigned.
    pub fn is_unsigned(&self) -> bool {
        self.converted_type().is_some_and(ConvertedType::is_unsigned)
    }
}

/// The flat leaf column catalog of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    nodes: Vec<SchemaNode>,
    shapes: Vec<NodeShape>,
    columns: Vec<ColumnDescriptor>,
    node_by_path: FxHashMap<String, usize>,
    node_by_external_path: FxHashMap<String, usize>,
    column_by_node: FxHashMap<usize, usize>,
}

impl SchemaDescriptor {
    /// Builds the catalog from a pre-ordered node list whose first entry is
    /// the root group.
    ///
    /// Every structural or typing problem is reported here, so a descriptor
    /// which exists is always consistent.
    pub fn from_nodes(nodes: Vec<SchemaNode>) -> Result<Self, SchemaError> {
        let root = nodes.first().ok_or_else(|| SchemaError::InvalidNode {
            name: "<root>".to_string(),
            reason: "schema has no root node".to_string(),
        })?;
        let root_children = root.num_children().ok_or_else(|| SchemaError::InvalidNode {
            name: root.name().to_string(),
            reason: "root must be a group".to_string(),
        })?;
        if root.repetition() != Repetition::Required {
            return Err(SchemaError::InvalidNode {
                name: root.name().to_string(),
                reason: format!("root must be REQUIRED, found {}", root.repetition()),
            });
        }

        let mut shapes: Vec<NodeShape> = Vec::with_capacity(nodes.len());
        let mut columns = Vec::new();
        shapes.push(NodeShape {
            parent: None,
            children: Vec::with_capacity(root_children),
            path: ColumnPath::default(),
            external_path: ColumnPath::default(),
            def_level: 0,
            rep_level: 0,
            leaves: 0..0,
        });

        // (group index, children still to attach)
        let mut stack: Vec<(usize, usize)> = vec![(0, root_children)];
        let mut next = 1;

        while let Some((group, remaining)) = stack.last_mut() {
            let group = *group;
            if *remaining == 0 {
                shapes[group].leaves.end = columns.len();
                validate_group(&nodes, &shapes, group)?;
                stack.pop();
                continue;
            }
            *remaining -= 1;

            let node = nodes.get(next).ok_or_else(|| SchemaError::InvalidNode {
                name: nodes[group].name().to_string(),
                reason: "declared child count runs past the end of the schema".to_string(),
            })?;
            validate_node(node)?;

            let parent = &shapes[group];
            let def_level = parent.def_level + (node.repetition() != Repetition::Required) as u16;
            let rep_level = parent.rep_level + (node.repetition() == Repetition::Repeated) as u16;
            let path = parent.path.append_name(node.name());
            let external_path = parent.external_path.append_name(node.external_name());
            let first_leaf = columns.len();

            if let Some(primitive) = node.primitive() {
                columns.push(ColumnDescriptor {
                    index: columns.len(),
                    node_index: next,
                    path: path.clone(),
                    external_path: external_path.clone(),
                    primitive,
                    repetition: node.repetition(),
                    max_def_level: def_level,
                    max_rep_level: rep_level,
                    encoding: node.encoding().unwrap_or(Encoding::Plain),
                });
            }

            shapes[group].children.push(next);
            shapes.push(NodeShape {
                parent: Some(group),
                children: vec![],
                path,
                external_path,
                def_level,
                rep_level,
                leaves: first_leaf..columns.len(),
            });

            if let Some(n) = node.num_children() {
                stack.push((next, n));
            }
            next += 1;
        }

        if next != nodes.len() {
            return Err(SchemaError::InvalidNode {
                name: nodes[next].name().to_string(),
                reason: "node is not reachable from the root".to_string(),
            });
        }

        let mut node_by_path = FxHashMap::default();
        let mut node_by_external_path = FxHashMap::default();
        for (idx, shape) in shapes.iter().enumerate().skip(1) {
            node_by_path.insert(shape.path.to_dotted(), idx);
            if node_by_external_path
                .insert(shape.external_path.to_dotted(), idx)
                .is_some()
            {
                return Err(SchemaError::InvalidNode {
                    name: shape.external_path.to_dotted(),
                    reason: "external path is not unique".to_string(),
                });
            }
        }
        let column_by_node = columns.iter().map(|c| (c.node_index, c.index)).collect();

        Ok(Self {
            nodes,
            shapes,
            columns,
            node_by_path,
            node_by_external_path,
            column_by_node,
        })
    }

    /// Name of the root node.
    pub fn name(&self) -> &str {
        self.nodes[0].name()
    }

    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &SchemaNode {
        &self.nodes[index]
    }

    pub fn shape(&self, index: usize) -> &NodeShape {
        &self.shapes[index]
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> &ColumnDescriptor {
        &self.columns[index]
    }

    /// Finds a node by its on-disk dotted path.
    pub fn node_index(&self, path: &str) -> Result<usize, SchemaError> {
        self.node_by_path
            .get(path)
            .copied()
            .ok_or_else(|| SchemaError::PathNotFound {
                path: path.to_string(),
            })
    }

    /// Finds the catalog position of a leaf column by its on-disk path.
    pub fn column_index(&self, path: &str) -> Result<usize, SchemaError> {
        let node = self.node_index(path)?;
        self.column_by_node
            .get(&node)
            .copied()
            .ok_or_else(|| SchemaError::PathNotFound {
                path: path.to_string(),
            })
    }

    pub fn column_by_path(&self, path: &str) -> Result<&ColumnDescriptor, SchemaError> {
        Ok(&self.columns[self.column_index(path)?])
    }

    /// Maps a leaf node index to its catalog position.
    pub fn column_of_node(&self, node_index: usize) -> Option<usize> {
        self.column_by_node.get(&node_index).copied()
    }

    /// Maximum definition level reachable at `path`, which may name a group.
    pub fn max_definition_level(&self, path: &str) -> Result<DefinitionLevel, SchemaError> {
        Ok(self.shapes[self.node_index(path)?].def_level)
    }

    /// Maximum repetition level reachable at `path`, which may name a group.
    pub fn max_repetition_level(&self, path: &str) -> Result<RepetitionLevel, SchemaError> {
        Ok(self.shapes[self.node_index(path)?].rep_level)
    }

    /// On-disk dotted paths of every leaf column in catalog order.
    pub fn leaf_paths(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.path.to_dotted()).collect()
    }

    /// Converts an application facing path to its on-disk form.
    pub fn to_internal_path(&self, external: &str) -> Result<String, SchemaError> {
        self.node_by_external_path
            .get(external)
            .map(|&idx| self.shapes[idx].path.to_dotted())
            .ok_or_else(|| SchemaError::PathNotFound {
                path: external.to_string(),
            })
    }

    /// Converts an on-disk path to its application facing form.
    pub fn to_external_path(&self, internal: &str) -> Result<String, SchemaError> {
        self.node_by_path
            .get(internal)
            .map(|&idx| self.shapes[idx].external_path.to_dotted())
            .ok_or_else(|| SchemaError::PathNotFound {
                path: internal.to_string(),
            })
    }
}

impl fmt::Display for SchemaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (node, shape) in self.nodes.iter().zip(&self.shapes) {
            let indent = "  ".repeat(shape.path.depth());
            writeln!(
                f,
                "{indent}{node} [d:{} r:{}]",
                shape.def_level, shape.rep_level
            )?;
        }
        Ok(())
    }
}

fn invalid(node: &SchemaNode, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidNode {
        name: node.name().to_string(),
        reason: reason.into(),
    }
}

fn unsupported(node: &SchemaNode, reason: impl Into<String>) -> SchemaError {
    SchemaError::UnsupportedTypeCombination {
        name: node.name().to_string(),
        reason: reason.into(),
    }
}

/// Largest number of decimal digits which always fits in a signed
/// two's-complement integer of `bytes` bytes.
fn max_decimal_digits(bytes: i32) -> i32 {
    if bytes <= 0 {
        return 0;
    }
    (((8 * bytes - 1) as f64) * 2f64.log10()).floor() as i32
}

/// Checks a node in isolation.
fn validate_node(node: &SchemaNode) -> Result<(), SchemaError> {
    if node.name().is_empty() {
        return Err(invalid(node, "name is empty"));
    }
    if node.name().contains(crate::common::PATH_DELIMITER) {
        return Err(invalid(node, "name contains the path delimiter"));
    }

    let physical = match (node.physical_type(), node.num_children()) {
        (Some(_), Some(_)) => return Err(invalid(node, "node has both a type and children")),
        (None, None) => return Err(invalid(node, "leaf has no physical type")),
        (None, Some(0)) => return Err(invalid(node, "group has no children")),
        (None, Some(_)) => {
            if node.encoding().is_some() {
                return Err(unsupported(node, "groups cannot carry an encoding"));
            }
            return match node.converted_type() {
                None | Some(ConvertedType::List | ConvertedType::Map | ConvertedType::MapKeyValue) => Ok(()),
                Some(c) => Err(unsupported(node, format!("{c} annotation on a group"))),
            };
        }
        (Some(t), None) => t,
    };

    if physical == PhysicalType::FixedLenByteArray && node.type_length().unwrap_or(0) <= 0 {
        return Err(invalid(node, "FIXED_LEN_BYTE_ARRAY requires a positive type length"));
    }

    if let Some(converted) = node.converted_type() {
        use ConvertedType::*;
        use PhysicalType as P;
        let fits = match converted {
            Utf8 | Enum | Json | Bson => physical == P::ByteArray,
            Date | TimeMillis | Int8 | Int16 | Int32 | Uint8 | Uint16 | Uint32 => physical == P::Int32,
            TimeMicros | TimestampMillis | TimestampMicros | Int64 | Uint64 => physical == P::Int64,
            Interval => physical == P::FixedLenByteArray && node.type_length() == Some(12),
            Decimal => true,
            List | Map | MapKeyValue => false,
        };
        if !fits {
            return Err(unsupported(node, format!("{converted} on {physical}")));
        }
        if converted == Decimal {
            validate_decimal(node, physical)?;
        }
    } else if node.precision().is_some() || node.scale().is_some() {
        return Err(unsupported(node, "precision and scale require the DECIMAL annotation"));
    }

    if let Some(encoding) = node.encoding() {
        let fits = crate::encoding::supports(encoding, physical);
        if !fits {
            return Err(unsupported(node, format!("{encoding} encoding for {physical}")));
        }
    }
    Ok(())
}

fn validate_decimal(node: &SchemaNode, physical: PhysicalType) -> Result<(), SchemaError> {
    let (precision, scale) = match (node.precision(), node.scale()) {
        (Some(p), Some(s)) => (p, s),
        _ => return Err(unsupported(node, "DECIMAL requires precision and scale")),
    };
    if precision < 1 {
        return Err(unsupported(node, format!("precision {precision} must be at least 1")));
    }
    if scale < 0 || scale > precision {
        return Err(unsupported(
            node,
            format!("scale {scale} must be within [0, {precision}]"),
        ));
    }
    let max_digits = match physical {
        PhysicalType::Int32 => 9,
        PhysicalType::Int64 => 18,
        PhysicalType::FixedLenByteArray => max_decimal_digits(node.type_length().unwrap_or(0)),
        PhysicalType::ByteArray => i32::MAX,
        other => return Err(unsupported(node, format!("DECIMAL on {other}"))),
    };
    if precision > max_digits {
        return Err(unsupported(
            node,
            format!("precision {precision} exceeds {max_digits} digits available in {physical}"),
        ));
    }
    Ok(())
}

/// Checks a group once all of its children are known.
fn validate_group(nodes: &[SchemaNode], shapes: &[NodeShape], group: usize) -> Result<(), SchemaError> {
    let node = &nodes[group];
    let children = &shapes[group].children;

    for (i, &a) in children.iter().enumerate() {
        if children[..i].iter().any(|&b| nodes[b].name() == nodes[a].name()) {
            return Err(invalid(&nodes[a], "duplicate name within group"));
        }
    }

    match node.converted_type() {
        Some(ConvertedType::List) => {
            let repeated = children.len() == 1 && nodes[children[0]].repetition() == Repetition::Repeated;
            if !repeated {
                return Err(invalid(node, "LIST must hold exactly one REPEATED child"));
            }
        }
        Some(ConvertedType::Map) => {
            let entry = match children.as_slice() {
                [only] if nodes[*only].repetition() == Repetition::Repeated => *only,
                _ => return Err(invalid(node, "MAP must hold exactly one REPEATED child")),
            };
            let kv = &shapes[entry].children;
            if kv.is_empty() || kv.len() > 2 || nodes[kv[0]].repetition() != Repetition::Required {
                return Err(invalid(
                    &nodes[entry],
                    "MAP entries must hold a REQUIRED key and an optional value",
                ));
            }
        }
        _ => {}
    }
    Ok(())
}
