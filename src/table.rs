//! Column triple-streams: parallel sequences of values, repetition levels and
//! definition levels for one leaf column.

use crate::basic::PhysicalType;
use crate::common::{DefinitionLevel, RepetitionLevel};
use crate::descriptor::{ColumnDescriptor, SchemaDescriptor};
use crate::error::AssemblyError;
use crate::path_vector::ColumnPath;
use crate::physical::PhysicalValue;

/// Triple-stream of a single leaf column.
///
/// A value is present exactly when its definition level equals the column's
/// maximum definition level. `None` is the null marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    path: ColumnPath,
    physical_type: PhysicalType,
    max_def_level: DefinitionLevel,
    max_rep_level: RepetitionLevel,
    values: Vec<Option<PhysicalValue>>,
    rep_levels: Vec<RepetitionLevel>,
    def_levels: Vec<DefinitionLevel>,
}

impl Table {
    /// Creates an empty table for `column`.
    pub fn new(column: &ColumnDescriptor) -> Self {
        Self {
            path: column.path().clone(),
            physical_type: column.physical_type(),
            max_def_level: column.max_definition_level(),
            max_rep_level: column.max_repetition_level(),
            values: vec![],
            rep_levels: vec![],
            def_levels: vec![],
        }
    }

    /// Creates an empty table with the same column identity.
    pub fn empty_like(&self) -> Self {
        Self {
            path: self.path.clone(),
            physical_type: self.physical_type,
            max_def_level: self.max_def_level,
            max_rep_level: self.max_rep_level,
            values: vec![],
            rep_levels: vec![],
            def_levels: vec![],
        }
    }

    pub fn path(&self) -> &ColumnPath {
        &self.path
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    pub fn max_definition_level(&self) -> DefinitionLevel {
        self.max_def_level
    }

    pub fn max_repetition_level(&self) -> RepetitionLevel {
        self.max_rep_level
    }

    pub fn values(&self) -> &[Option<PhysicalValue>] {
        &self.values
    }

    pub fn repetition_levels(&self) -> &[RepetitionLevel] {
        &self.rep_levels
    }

    pub fn definition_levels(&self) -> &[DefinitionLevel] {
        &self.def_levels
    }

    /// Appends one triple.
    pub fn push(&mut self, value: Option<PhysicalValue>, rep_level: RepetitionLevel, def_level: DefinitionLevel) {
        self.values.push(value);
        self.rep_levels.push(rep_level);
        self.def_levels.push(def_level);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
        self.rep_levels.truncate(len);
        self.def_levels.truncate(len);
    }

    /// Number of triples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of records, i.e. positions with repetition level 0.
    pub fn num_rows(&self) -> usize {
        self.rep_levels.iter().filter(|&&r| r == 0).count()
    }

    /// Number of null markers.
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Appends `other` to the end of this table, preserving order.
    pub fn merge(&mut self, other: Table) {
        debug_assert_eq!(self.path, other.path);
        self.values.extend(other.values);
        self.rep_levels.extend(other.rep_levels);
        self.def_levels.extend(other.def_levels);
    }

    /// Splits off the first `num_rows` records and returns them, keeping the
    /// remainder in `self`. Record boundaries are repetition level 0.
    pub fn pop(&mut self, num_rows: usize) -> Table {
        let cut = self.row_offset(num_rows);
        let mut head = self.empty_like();
        head.values = self.values.drain(..cut).collect();
        head.rep_levels = self.rep_levels.drain(..cut).collect();
        head.def_levels = self.def_levels.drain(..cut).collect();
        head
    }

    /// Index of the first triple of record `row`, or `len()` past the end.
    pub fn row_offset(&self, row: usize) -> usize {
        let mut seen = 0;
        for (i, &r) in self.rep_levels.iter().enumerate() {
            if r == 0 {
                if seen == row {
                    return i;
                }
                seen += 1;
            }
        }
        self.len()
    }

    /// Starting index of every record.
    pub fn row_starts(&self) -> Vec<usize> {
        self.rep_levels
            .iter()
            .enumerate()
            .filter(|&(_, &r)| r == 0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Copies the triples in `range`.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Table {
        let mut out = self.empty_like();
        out.values = self.values[range.clone()].to_vec();
        out.rep_levels = self.rep_levels[range.clone()].to_vec();
        out.def_levels = self.def_levels[range].to_vec();
        out
    }

    /// Checks the table invariants: equal stream lengths, levels within
    /// bounds, values present exactly at the maximum definition level and a
    /// first triple which starts a record.
    pub fn validate(&self) -> Result<(), AssemblyError> {
        let corrupt = |reason: String| AssemblyError::CorruptLevels {
            path: self.path.to_string(),
            reason,
        };

        if self.values.len() != self.rep_levels.len() || self.values.len() != self.def_levels.len() {
            return Err(corrupt(format!(
                "stream lengths differ: {} values, {} repetition levels, {} definition levels",
                self.values.len(),
                self.rep_levels.len(),
                self.def_levels.len()
            )));
        }
        if let Some(&first) = self.rep_levels.first() {
            if first != 0 {
                return Err(corrupt(format!("first repetition level is {first}, expected 0")));
            }
        }
        for (i, ((value, &r), &d)) in self.values.iter().zip(&self.rep_levels).zip(&self.def_levels).enumerate() {
            if r > self.max_rep_level {
                return Err(corrupt(format!(
                    "repetition level {r} at {i} exceeds {}",
                    self.max_rep_level
                )));
            }
            if d > self.max_def_level {
                return Err(corrupt(format!(
                    "definition level {d} at {i} exceeds {}",
                    self.max_def_level
                )));
            }
            if value.is_some() != (d == self.max_def_level) {
                return Err(corrupt(format!(
                    "value presence at {i} disagrees with definition level {d}"
                )));
            }
        }
        Ok(())
    }
}

/// One table per leaf column, in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSet {
    tables: Vec<Table>,
}

impl TableSet {
    /// Creates empty tables for every column of `schema`.
    pub fn new(schema: &SchemaDescriptor) -> Self {
        Self {
            tables: schema.columns().iter().map(Table::new).collect(),
        }
    }

    pub fn from_tables(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Looks up a table by its on-disk dotted path.
    pub fn get(&self, path: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.path.to_dotted() == path)
    }

    pub fn column(&self, index: usize) -> &Table {
        &self.tables[index]
    }

    pub(crate) fn column_mut(&mut self, index: usize) -> &mut Table {
        &mut self.tables[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn num_columns(&self) -> usize {
        self.tables.len()
    }

    pub(crate) fn lengths(&self) -> Vec<usize> {
        self.tables.iter().map(Table::len).collect()
    }

    pub(crate) fn truncate(&mut self, lengths: &[usize]) {
        for (table, &len) in self.tables.iter_mut().zip(lengths) {
            table.truncate(len);
        }
    }

    /// Number of records, taken from the first column.
    pub fn num_rows(&self) -> usize {
        self.tables.first().map_or(0, Table::num_rows)
    }

    /// Concatenates `other` column by column.
    pub fn merge(&mut self, other: TableSet) {
        for (mine, theirs) in self.tables.iter_mut().zip(other.tables) {
            mine.merge(theirs);
        }
    }

    /// Splits off the first `num_rows` records of every column.
    pub fn pop(&mut self, num_rows: usize) -> TableSet {
        TableSet {
            tables: self.tables.iter_mut().map(|t| t.pop(num_rows)).collect(),
        }
    }

    /// Rough encoded size, used to decide when to flush a row group.
    pub fn estimated_size(&self) -> usize {
        self.tables
            .iter()
            .map(|t| {
                let values: usize = t.values.iter().flatten().map(PhysicalValue::plain_size).sum();
                values + t.len() * 2
            })
            .sum()
    }

    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }
}
