//! Shredding: decomposes nested records into per-column triple-streams.
//!
//! The walk is iterative. Each work item carries the repetition and
//! definition level of the position it was reached from; entering an
//! optional or repeated node raises the definition level, and every element
//! after the first in a repeated node takes the node's repetition level.
//!
//! An absent optional value, or an absent or empty repeated value, emits one
//! null marker into every leaf column below that node so the column stays
//! aligned with its siblings.

use crate::basic::{ConvertedType, Repetition};
use crate::common::{DefinitionLevel, RepetitionLevel};
use crate::convert::to_physical;
use crate::descriptor::SchemaDescriptor;
use crate::error::ShredError;
use crate::table::TableSet;
use crate::value::Value;
use rayon::prelude::*;
use rayon::ThreadPool;
use rustc_hash::FxHashSet;
use tracing::trace;

/// What a work item holds for its node.
#[derive(Debug, Clone, Copy)]
enum Slot<'v> {
    Absent,
    One(&'v Value),
    /// Entries of a map, handed to the repeated `key_value` group.
    Entries(&'v [(Value, Value)]),
    /// A single map entry.
    Entry(&'v Value, &'v Value),
}

impl Slot<'_> {
    fn is_null(&self) -> bool {
        matches!(self, Slot::Absent | Slot::One(Value::Null))
    }
}

#[derive(Debug)]
enum Work<'v> {
    /// Apply the node's repetition to the slot.
    Visit {
        node: usize,
        slot: Slot<'v>,
        rep: RepetitionLevel,
        def: DefinitionLevel,
    },
    /// The node is present; descend into its content.
    Enter {
        node: usize,
        slot: Slot<'v>,
        rep: RepetitionLevel,
        def: DefinitionLevel,
    },
}

/// Shreds records against a fixed schema.
#[derive(Debug, Clone, Copy)]
pub struct Shredder<'a> {
    schema: &'a SchemaDescriptor,
}

impl<'a> Shredder<'a> {
    pub fn new(schema: &'a SchemaDescriptor) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        self.schema
    }

    /// Shreds a batch of records into fresh tables.
    pub fn shred(&self, records: &[Value]) -> Result<TableSet, ShredError> {
        let mut tables = TableSet::new(self.schema);
        for record in records {
            self.shred_record(record, &mut tables)?;
        }
        Ok(tables)
    }

    /// Appends the triples of one record to `tables`.
    ///
    /// On error nothing of the record is kept, so `tables` stays aligned.
    pub fn shred_record(&self, record: &Value, tables: &mut TableSet) -> Result<(), ShredError> {
        if !matches!(record, Value::Struct(_)) {
            return Err(ShredError::InputValueMustBeAStruct);
        }
        let lengths = tables.lengths();
        let result = self.walk(record, tables);
        if result.is_err() {
            tables.truncate(&lengths);
        }
        result
    }

    fn walk<'v>(&self, record: &'v Value, tables: &mut TableSet) -> Result<(), ShredError> {
        let mut stack = vec![Work::Enter {
            node: 0,
            slot: Slot::One(record),
            rep: 0,
            def: 0,
        }];

        while let Some(work) = stack.pop() {
            match work {
                Work::Visit { node, slot, rep, def } => self.visit(node, slot, rep, def, tables, &mut stack)?,
                Work::Enter { node, slot, rep, def } => self.enter(node, slot, rep, def, tables, &mut stack)?,
            }
        }
        Ok(())
    }

    fn path(&self, node: usize) -> String {
        self.schema.shape(node).external_path().to_string()
    }

    fn emit_nulls(&self, node: usize, rep: RepetitionLevel, def: DefinitionLevel, tables: &mut TableSet) {
        for column in self.schema.shape(node).leaves() {
            tables.column_mut(column).push(None, rep, def);
        }
    }

    fn visit<'v>(
        &self,
        node: usize,
        slot: Slot<'v>,
        rep: RepetitionLevel,
        def: DefinitionLevel,
        tables: &mut TableSet,
        stack: &mut Vec<Work<'v>>,
    ) -> Result<(), ShredError> {
        let shape = self.schema.shape(node);

        match self.schema.node(node).repetition() {
            Repetition::Required if slot.is_null() => Err(ShredError::RequiredFieldIsNull { path: self.path(node) }),
            Repetition::Required => {
                stack.push(Work::Enter { node, slot, rep, def });
                Ok(())
            }
            Repetition::Optional if slot.is_null() => {
                self.emit_nulls(node, rep, def, tables);
                Ok(())
            }
            Repetition::Optional => {
                stack.push(Work::Enter {
                    node,
                    slot,
                    rep,
                    def: shape.def_level(),
                });
                Ok(())
            }
            Repetition::Repeated => {
                let items = self.items(node, slot)?;
                if items.is_empty() {
                    self.emit_nulls(node, rep, def, tables);
                    return Ok(());
                }
                for (j, item) in items.into_iter().enumerate().rev() {
                    stack.push(Work::Enter {
                        node,
                        slot: item,
                        rep: if j == 0 { rep } else { shape.rep_level() },
                        def: shape.def_level(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Elements of the collection held by a repeated node.
    fn items<'v>(&self, node: usize, slot: Slot<'v>) -> Result<Vec<Slot<'v>>, ShredError> {
        match slot {
            Slot::Absent | Slot::One(Value::Null) => Ok(vec![]),
            Slot::One(Value::List(items)) => Ok(items.iter().map(Slot::One).collect()),
            Slot::Entries(entries) => Ok(entries.iter().map(|(k, v)| Slot::Entry(k, v)).collect()),
            Slot::One(other) => Err(ShredError::ValueTypeMismatch {
                path: self.path(node),
                expected: "List".to_string(),
                found: other.type_label().to_string(),
            }),
            Slot::Entry(_, _) => Err(ShredError::ValueTypeMismatch {
                path: self.path(node),
                expected: "List".to_string(),
                found: "Map entry".to_string(),
            }),
        }
    }

    fn enter<'v>(
        &self,
        node: usize,
        slot: Slot<'v>,
        rep: RepetitionLevel,
        def: DefinitionLevel,
        tables: &mut TableSet,
        stack: &mut Vec<Work<'v>>,
    ) -> Result<(), ShredError> {
        let schema_node = self.schema.node(node);
        let shape = self.schema.shape(node);
        let children = shape.children();

        if schema_node.is_leaf() {
            let column = self.schema.column_of_node(node).ok_or_else(|| ShredError::UnknownField {
                path: self.path(node),
                name: schema_node.name().to_string(),
            })?;
            let value = match slot {
                Slot::One(v) => v,
                _ => {
                    return Err(ShredError::ValueTypeMismatch {
                        path: self.path(node),
                        expected: schema_node.physical_type().map(|t| t.to_string()).unwrap_or_default(),
                        found: "Map".to_string(),
                    })
                }
            };
            let physical = to_physical(value, self.schema.column(column))?;
            tables.column_mut(column).push(Some(physical), rep, def);
            return Ok(());
        }

        let push = |stack: &mut Vec<Work<'v>>, child: usize, slot: Slot<'v>| {
            stack.push(Work::Visit {
                node: child,
                slot,
                rep,
                def,
            })
        };

        let parent_converted = shape
            .parent()
            .and_then(|p| self.schema.node(p).converted_type());
        let is_instance = schema_node.repetition() == Repetition::Repeated;

        match (schema_node.converted_type(), slot) {
            (Some(ConvertedType::List), Slot::One(Value::List(_))) if children.len() == 1 => {
                push(stack, children[0], slot);
            }
            (Some(ConvertedType::Map), Slot::One(Value::Map(entries))) if children.len() == 1 => {
                push(stack, children[0], Slot::Entries(entries));
            }
            (Some(c @ (ConvertedType::List | ConvertedType::Map)), Slot::One(other)) => {
                return Err(ShredError::ValueTypeMismatch {
                    path: self.path(node),
                    expected: c.label().to_string(),
                    found: other.type_label().to_string(),
                });
            }
            (_, Slot::Entry(key, value)) => {
                // key is always the first child, value the optional second
                for (&child, slot) in children.iter().zip([key, value]).rev() {
                    push(stack, child, Slot::One(slot));
                }
            }
            (_, Slot::One(item))
                if is_instance && parent_converted == Some(ConvertedType::List) && children.len() == 1 =>
            {
                push(stack, children[0], Slot::One(item));
            }
            (_, Slot::One(Value::Struct(props))) => {
                self.check_props(node, props)?;
                for &child in children.iter().rev() {
                    let name = self.schema.node(child).external_name();
                    let slot = props
                        .iter()
                        .find(|(k, _)| k == name)
                        .map_or(Slot::Absent, |(_, v)| Slot::One(v));
                    push(stack, child, slot);
                }
            }
            (_, Slot::One(other)) => {
                return Err(ShredError::ValueTypeMismatch {
                    path: self.path(node),
                    expected: "Struct".to_string(),
                    found: other.type_label().to_string(),
                });
            }
            (_, Slot::Absent | Slot::Entries(_)) => {
                return Err(ShredError::ValueTypeMismatch {
                    path: self.path(node),
                    expected: "Struct".to_string(),
                    found: "Map".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Rejects struct properties which are duplicated or unknown to the
    /// group.
    fn check_props(&self, node: usize, props: &[(String, Value)]) -> Result<(), ShredError> {
        let children = self.schema.shape(node).children();
        let mut seen = FxHashSet::default();
        for (name, _) in props {
            if !seen.insert(name.as_str()) {
                return Err(ShredError::DuplicateField {
                    path: self.path(node),
                    name: name.clone(),
                });
            }
            if !children.iter().any(|&c| self.schema.node(c).external_name() == name) {
                return Err(ShredError::UnknownField {
                    path: self.path(node),
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Shreds `records` into one table per leaf column of `schema`.
pub fn shred(records: &[Value], schema: &SchemaDescriptor) -> Result<TableSet, ShredError> {
    Shredder::new(schema).shred(records)
}

/// Shreds contiguous sub-ranges of `records` on `pool` and concatenates the
/// results in range order.
pub fn shred_parallel(
    records: &[Value],
    schema: &SchemaDescriptor,
    pool: &ThreadPool,
) -> Result<TableSet, ShredError> {
    let workers = pool.current_num_threads().max(1);
    if records.len() < 2 || workers == 1 {
        return shred(records, schema);
    }
    let chunk = records.len().div_ceil(workers);
    trace!(records = records.len(), chunk, "shredding in parallel");

    let shredder = Shredder::new(schema);
    let parts = pool.install(|| {
        records
            .par_chunks(chunk)
            .map(|part| shredder.shred(part))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let mut tables = TableSet::new(schema);
    for part in parts {
        tables.merge(part);
    }
    Ok(tables)
}
