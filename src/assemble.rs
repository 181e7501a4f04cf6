//! Assembly: reconstructs nested records from per-column triple-streams.
//!
//! Record boundaries are the repetition level 0 positions of each column,
//! found in one pre-scan. Each triple is then placed by walking its column's
//! node chain from the root, creating containers on first sight and reusing
//! them for later columns of the same record. Per column, a counter for each
//! repeated ancestor tracks which element a triple belongs to: a triple with
//! repetition level `r` starts a new element at depth `r` and the first
//! element at every deeper depth.

use crate::basic::{ConvertedType, Repetition};
use crate::common::{DefinitionLevel, RepetitionLevel};
use crate::convert::to_value;
use crate::descriptor::SchemaDescriptor;
use crate::error::{AssemblyError, Result};
use crate::table::TableSet;
use crate::value::Value;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::ops::Range;
use tracing::trace;

/// How a node's value is stored in its parent's host value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// A named property of a struct. Repeated fields hold a list.
    Field,
    /// The repeated group of a list; each instance is one list item.
    ListBody { passthrough: bool },
    /// The single child of a list body; the list item itself.
    ListElement,
    /// The repeated group of a map; each instance is one entry.
    MapBody,
    MapKey,
    MapValue,
}

enum Cursor<'r> {
    Value(&'r mut Value),
    Entry(&'r mut (Value, Value)),
}

fn struct_field<'r>(value: &'r mut Value, name: &str) -> Option<&'r mut Value> {
    let Value::Struct(fields) = value else {
        return None;
    };
    let pos = match fields.iter().position(|(k, _)| k == name) {
        Some(pos) => pos,
        None => {
            fields.push((name.to_string(), Value::Null));
            fields.len() - 1
        }
    };
    Some(&mut fields[pos].1)
}

fn into_value(cursor: Cursor<'_>) -> Option<&mut Value> {
    match cursor {
        Cursor::Value(v) => Some(v),
        Cursor::Entry(_) => None,
    }
}

fn list_item(value: &mut Value, idx: usize) -> Option<&mut Value> {
    let Value::List(items) = value else {
        return None;
    };
    if idx == items.len() {
        items.push(Value::Null);
    }
    items.get_mut(idx)
}

fn map_entry(value: &mut Value, idx: usize) -> Option<&mut (Value, Value)> {
    let Value::Map(entries) = value else {
        return None;
    };
    if idx == entries.len() {
        entries.push((Value::Null, Value::Null));
    }
    entries.get_mut(idx)
}

/// Reassembles records from a fully materialized set of column tables.
#[derive(Debug)]
pub struct Assembler<'a> {
    schema: &'a SchemaDescriptor,
    tables: &'a TableSet,
    roles: Vec<Role>,
    /// Node indices from the root (excluded) down to each leaf.
    chains: Vec<Vec<usize>>,
    /// Repeated nodes of each chain; entry `d - 1` has repetition level `d`.
    repeated: Vec<Vec<usize>>,
    /// Index of the first triple of every record, per column.
    row_starts: Vec<Vec<usize>>,
}

impl<'a> Assembler<'a> {
    /// Pre-scans record boundaries and checks that every column agrees on
    /// the number of records.
    pub fn new(schema: &'a SchemaDescriptor, tables: &'a TableSet) -> Result<Self, AssemblyError> {
        if tables.num_columns() != schema.num_columns() {
            return Err(AssemblyError::CorruptLevels {
                path: schema.name().to_string(),
                reason: format!(
                    "{} column tables for {} columns",
                    tables.num_columns(),
                    schema.num_columns()
                ),
            });
        }

        let roles = Self::roles(schema);
        let mut chains = Vec::with_capacity(schema.num_columns());
        let mut repeated = Vec::with_capacity(schema.num_columns());
        for column in schema.columns() {
            let mut chain = vec![];
            let mut n = column.node_index();
            while let Some(parent) = schema.shape(n).parent() {
                chain.push(n);
                n = parent;
            }
            chain.reverse();
            repeated.push(
                chain
                    .iter()
                    .copied()
                    .filter(|&n| schema.node(n).repetition() == Repetition::Repeated)
                    .collect(),
            );
            chains.push(chain);
        }

        let row_starts: Vec<Vec<usize>> = tables.iter().map(|t| t.row_starts()).collect();
        if let Some(first) = row_starts.first() {
            for (column, starts) in row_starts.iter().enumerate() {
                let table = tables.column(column);
                if starts.len() != first.len() || (!table.is_empty() && starts.first() != Some(&0)) {
                    return Err(AssemblyError::CorruptLevels {
                        path: table.path().to_string(),
                        reason: format!(
                            "column holds {} records where {} were expected",
                            starts.len(),
                            first.len()
                        ),
                    });
                }
            }
        }

        Ok(Self {
            schema,
            tables,
            roles,
            chains,
            repeated,
            row_starts,
        })
    }

    fn roles(schema: &SchemaDescriptor) -> Vec<Role> {
        let mut roles = vec![Role::Field; schema.nodes().len()];
        for n in 1..schema.nodes().len() {
            let node = schema.node(n);
            let Some(parent) = schema.shape(n).parent() else {
                continue;
            };
            let parent_node = schema.node(parent);
            let repeated = node.repetition() == Repetition::Repeated;

            roles[n] = match (parent_node.converted_type(), roles[parent]) {
                (Some(ConvertedType::List), _) if repeated => Role::ListBody {
                    passthrough: node.num_children() == Some(1),
                },
                (Some(ConvertedType::Map), _) if repeated => Role::MapBody,
                (_, Role::ListBody { passthrough: true }) => Role::ListElement,
                (_, Role::MapBody) if schema.shape(parent).children().first() == Some(&n) => Role::MapKey,
                (_, Role::MapBody) => Role::MapValue,
                _ => Role::Field,
            };
        }
        roles
    }

    /// Number of records in the tables.
    pub fn num_rows(&self) -> usize {
        self.row_starts.first().map_or(0, Vec::len)
    }

    /// Reassembles the records in `range`.
    pub fn assemble(&self, range: Range<usize>) -> Result<Vec<Value>> {
        let range = range.start.min(self.num_rows())..range.end.min(self.num_rows());
        let mut records = Vec::with_capacity(range.len());

        for row in range {
            let mut record = Value::Struct(vec![]);
            for column in 0..self.schema.num_columns() {
                let starts = &self.row_starts[column];
                let table = self.tables.column(column);
                let end = starts.get(row + 1).copied().unwrap_or(table.len());
                let mut counters = vec![0usize; self.repeated[column].len()];

                for i in starts[row]..end {
                    let rep = table.repetition_levels()[i];
                    let def = table.definition_levels()[i];
                    self.check_levels(column, i, rep, def)?;
                    if rep > 0 {
                        counters[rep as usize - 1] += 1;
                        for c in counters.iter_mut().skip(rep as usize) {
                            *c = 0;
                        }
                    }
                    let value = match &table.values()[i] {
                        Some(v) => Some(to_value(v, self.schema.column(column))?),
                        None => None,
                    };
                    self.place(&mut record, column, &counters, def, value)?;
                }
            }
            records.push(record);
        }
        Ok(records)
    }

    /// Reassembles `range` as contiguous sub-ranges on `pool`, concatenated
    /// in range order.
    pub fn assemble_parallel(&self, range: Range<usize>, pool: &ThreadPool) -> Result<Vec<Value>> {
        let workers = pool.current_num_threads().max(1);
        if range.len() < 2 || workers == 1 {
            return self.assemble(range);
        }
        let chunk = range.len().div_ceil(workers);
        let parts: Vec<Range<usize>> = range
            .clone()
            .step_by(chunk)
            .map(|lo| lo..(lo + chunk).min(range.end))
            .collect();
        trace!(rows = range.len(), parts = parts.len(), "assembling in parallel");

        let assembled = pool.install(|| {
            parts
                .into_par_iter()
                .map(|part| self.assemble(part))
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(assembled.into_iter().flatten().collect())
    }

    fn corrupt(&self, column: usize, reason: String) -> AssemblyError {
        AssemblyError::CorruptLevels {
            path: self.schema.column(column).path().to_string(),
            reason,
        }
    }

    fn check_levels(&self, column: usize, i: usize, rep: RepetitionLevel, def: DefinitionLevel) -> Result<(), AssemblyError> {
        let descriptor = self.schema.column(column);
        if rep > descriptor.max_repetition_level() {
            return Err(self.corrupt(
                column,
                format!("repetition level {rep} at {i} exceeds {}", descriptor.max_repetition_level()),
            ));
        }
        if def > descriptor.max_definition_level() {
            return Err(self.corrupt(
                column,
                format!("definition level {def} at {i} exceeds {}", descriptor.max_definition_level()),
            ));
        }
        if rep > 0 {
            let node = self.repeated[column][rep as usize - 1];
            if def < self.schema.shape(node).def_level() {
                return Err(self.corrupt(
                    column,
                    format!("repetition level {rep} at {i} continues an absent list (definition level {def})"),
                ));
            }
        }
        Ok(())
    }

    /// Places one triple into `record`.
    fn place(
        &self,
        record: &mut Value,
        column: usize,
        counters: &[usize],
        def: DefinitionLevel,
        mut value: Option<Value>,
    ) -> Result<(), AssemblyError> {
        let chain = &self.chains[column];
        let mismatch = |n: usize| {
            self.corrupt(
                column,
                format!(
                    "levels do not match the structure built so far at {}",
                    self.schema.shape(n).path()
                ),
            )
        };

        let mut cursor = Cursor::Value(record);
        for (depth, &n) in chain.iter().enumerate() {
            let node = self.schema.node(n);
            let shape = self.schema.shape(n);
            let present = def >= shape.def_level();
            let repeated = node.repetition() == Repetition::Repeated;
            let idx = if repeated {
                counters[shape.rep_level() as usize - 1]
            } else {
                0
            };
            let role = self.roles[n];

            cursor = match role {
                Role::Field => {
                    let slot = struct_field(into_value(cursor).ok_or_else(|| mismatch(n))?, node.external_name()).ok_or_else(|| mismatch(n))?;
                    if repeated && slot.is_null() {
                        *slot = Value::List(vec![]);
                    }
                    if !present {
                        return Ok(());
                    }
                    if repeated {
                        Cursor::Value(list_item(slot, idx).ok_or_else(|| mismatch(n))?)
                    } else {
                        Cursor::Value(slot)
                    }
                }
                _ if !present => return Ok(()),
                Role::ListBody { .. } => Cursor::Value(list_item(into_value(cursor).ok_or_else(|| mismatch(n))?, idx).ok_or_else(|| mismatch(n))?),
                Role::ListElement => cursor,
                Role::MapBody => Cursor::Entry(map_entry(into_value(cursor).ok_or_else(|| mismatch(n))?, idx).ok_or_else(|| mismatch(n))?),
                Role::MapKey => match cursor {
                    Cursor::Entry(entry) => Cursor::Value(&mut entry.0),
                    Cursor::Value(_) => return Err(mismatch(n)),
                },
                Role::MapValue => match cursor {
                    Cursor::Entry(entry) => Cursor::Value(&mut entry.1),
                    Cursor::Value(_) => return Err(mismatch(n)),
                },
            };

            if matches!(role, Role::MapBody | Role::ListBody { passthrough: true }) {
                continue;
            }
            let Cursor::Value(slot) = &mut cursor else {
                return Err(mismatch(n));
            };
            if depth + 1 == chain.len() {
                **slot = value.take().ok_or_else(|| mismatch(n))?;
            } else if slot.is_null() {
                **slot = match node.converted_type() {
                    Some(ConvertedType::List) => Value::List(vec![]),
                    Some(ConvertedType::Map) => Value::Map(vec![]),
                    _ => Value::Struct(vec![]),
                };
            }
        }
        Ok(())
    }
}

/// Reassembles the records in `range` from `tables`.
pub fn assemble(schema: &SchemaDescriptor, tables: &TableSet, range: Range<usize>) -> Result<Vec<Value>> {
    Assembler::new(schema, tables)?.assemble(range)
}

/// Reassembles every record in `tables`, splitting the work across `pool`.
pub fn assemble_parallel(schema: &SchemaDescriptor, tables: &TableSet, pool: &ThreadPool) -> Result<Vec<Value>> {
    let assembler = Assembler::new(schema, tables)?;
    assembler.assemble_parallel(0..assembler.num_rows(), pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ColstripeError;
    use crate::physical::PhysicalValue;
    use crate::schema::*;
    use crate::shred::shred;
    use crate::value::ValueBuilder;

    fn round_trip(schema: &SchemaDescriptor, records: &[Value]) -> Vec<Value> {
        let tables = shred(records, schema).unwrap();
        assemble(schema, &tables, 0..records.len()).unwrap()
    }

    #[test]
    fn test_scalar_list_and_nested_struct() {
        let schema = Schema::new(
            "doc",
            vec![
                long("id"),
                optional_string("name"),
                repeated_string("tags"),
                repeated_group("links", vec![long("backward"), optional_long("forward")]),
            ],
        )
        .into_descriptor()
        .unwrap();
        let link = |b: i64, f: Option<i64>| ValueBuilder::default().field("backward", b).field("forward", f).build();
        let records = vec![
            ValueBuilder::default()
                .field("id", 1i64)
                .field("name", "a")
                .repeated("tags", vec!["x", "y"])
                .repeated("links", vec![link(1, None), link(2, Some(3))])
                .build(),
            ValueBuilder::default()
                .field("id", 2i64)
                .field("name", Value::Null)
                .repeated("tags", Vec::<&str>::new())
                .field("links", Value::Null)
                .build(),
        ];

        assert_eq!(round_trip(&schema, &records), records);
    }

    #[test]
    fn test_list_of_lists() {
        let schema = Schema::new("doc", vec![list("matrix", list("element", long("element")))])
            .into_descriptor()
            .unwrap();
        let row = |v: Value| ValueBuilder::default().field("matrix", v).build();
        let records = vec![
            row(Value::List(vec![
                Value::List(vec![1i64.into(), 2i64.into()]),
                Value::List(vec![]),
                Value::List(vec![3i64.into()]),
            ])),
            row(Value::Null),
            row(Value::List(vec![])),
            row(Value::List(vec![Value::Null, Value::List(vec![4i64.into()])])),
        ];

        assert_eq!(round_trip(&schema, &records), records);
    }

    #[test]
    fn test_map() {
        let schema = Schema::new("doc", vec![long("id"), map("attrs", string("k"), optional_long("v"))])
            .into_descriptor()
            .unwrap();
        let records = vec![
            ValueBuilder::default()
                .field("id", 1i64)
                .map("attrs", vec![("a", Value::Int(1)), ("b", Value::Null)])
                .build(),
            ValueBuilder::default().field("id", 2i64).field("attrs", Value::Null).build(),
        ];

        assert_eq!(round_trip(&schema, &records), records);
    }

    #[test]
    fn test_missing_fields_come_back_as_null() {
        let schema = Schema::new("doc", vec![long("id"), optional_group("meta", vec![optional_string("note")])])
            .into_descriptor()
            .unwrap();
        let input = ValueBuilder::default().field("id", 1i64).build();

        let output = round_trip(&schema, &[input]);
        assert_eq!(
            output,
            vec![ValueBuilder::default().field("id", 1i64).field("meta", Value::Null).build()]
        );
    }

    #[test]
    fn test_sub_range() {
        let schema = Schema::new("doc", vec![long("id"), repeated_long("xs")]).into_descriptor().unwrap();
        let records: Vec<Value> = (0..10)
            .map(|i| ValueBuilder::default().field("id", i as i64).repeated("xs", 0..i as i64).build())
            .collect();
        let tables = shred(&records, &schema).unwrap();

        assert_eq!(assemble(&schema, &tables, 3..6).unwrap(), records[3..6].to_vec());

        let pool = rayon::ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        assert_eq!(assemble_parallel(&schema, &tables, &pool).unwrap(), records);
    }

    #[test]
    fn test_corrupt_levels() {
        let schema = Schema::new("doc", vec![repeated_long("xs")]).into_descriptor().unwrap();
        let mut tables = TableSet::new(&schema);
        tables.column_mut(0).push(Some(PhysicalValue::Int64(1)), 0, 2);
        tables.column_mut(0).push(Some(PhysicalValue::Int64(2)), 0, 5);

        let err = assemble(&schema, &tables, 0..2).unwrap_err();
        assert!(
            matches!(err, ColstripeError::Assembly(AssemblyError::CorruptLevels { .. })),
            "Expected corrupt levels, found {:?}",
            err
        );
    }

    #[test]
    fn test_columns_disagree_on_rows() {
        let schema = Schema::new("doc", vec![long("a"), long("b")]).into_descriptor().unwrap();
        let mut tables = TableSet::new(&schema);
        tables.column_mut(0).push(Some(PhysicalValue::Int64(1)), 0, 0);
        tables.column_mut(0).push(Some(PhysicalValue::Int64(2)), 0, 0);
        tables.column_mut(1).push(Some(PhysicalValue::Int64(1)), 0, 0);

        assert!(Assembler::new(&schema, &tables).is_err());
    }
}
