//! Row groups: one chunk per leaf column, in catalog order.

use super::chunk::{pages_to_chunk, Chunk};
use super::page::table_to_pages;
use crate::descriptor::{ColumnDescriptor, SchemaDescriptor};
use crate::error::{ColstripeError, Result};
use crate::metadata::{ColumnChunkMeta, ColumnMetaData, RowGroupMeta};
use crate::properties::WriterProperties;
use crate::source::Source;
use crate::table::{Table, TableSet};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::debug;

/// Encoded chunks of a horizontal slice of records.
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    chunks: Vec<Chunk>,
    num_rows: usize,
}

impl RowGroup {
    /// Encodes every column of `tables`. Columns are spread across the
    /// workers of `pool`.
    pub fn new(
        tables: TableSet,
        schema: &SchemaDescriptor,
        props: &WriterProperties,
        pool: &ThreadPool,
    ) -> Result<Self> {
        if tables.num_columns() != schema.num_columns() {
            return Err(ColstripeError::InvalidFile(format!(
                "{} tables for {} columns",
                tables.num_columns(),
                schema.num_columns()
            )));
        }
        let num_rows = tables.num_rows();
        let codec = props.compression();
        let chunks = pool.install(|| {
            tables
                .into_tables()
                .into_par_iter()
                .zip(schema.columns().par_iter())
                .map(|(table, column)| {
                    let pages = table_to_pages(&table, column, props)?;
                    Ok(pages_to_chunk(pages, column, codec))
                })
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(Self { chunks, num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Writes the chunks to `sink`, which is at file offset `offset`, and
    /// returns the footer entry of the row group.
    pub fn write<W: Write>(mut self, sink: &mut W, offset: u64) -> Result<RowGroupMeta> {
        let mut position = offset as i64;
        let mut total_byte_size = 0;
        let mut columns = Vec::with_capacity(self.chunks.len());
        for mut chunk in self.chunks.drain(..) {
            chunk.set_offset(position);
            debug!(
                path = %chunk.meta().path_in_schema.join("."),
                offset = position,
                bytes = chunk.meta().total_compressed_size,
                "writing column chunk"
            );
            let written = chunk.write(sink)?;
            total_byte_size += chunk.meta().total_uncompressed_size;
            columns.push(ColumnChunkMeta {
                file_offset: position,
                meta_data: chunk.into_meta(),
            });
            position += written as i64;
        }
        Ok(RowGroupMeta {
            columns,
            total_byte_size,
            num_rows: self.num_rows as i64,
        })
    }
}

/// Fetches the bytes of one chunk on a fresh cursor and decodes them.
pub(crate) fn read_chunk<S: Source>(source: &S, meta: &ColumnMetaData, column: &ColumnDescriptor) -> Result<Table> {
    let start = u64::try_from(meta.start_offset())
        .map_err(|_| ColstripeError::InvalidFile(format!("negative offset {}", meta.start_offset())))?;
    let len = usize::try_from(meta.total_compressed_size)
        .map_err(|_| ColstripeError::InvalidFile(format!("negative chunk size {}", meta.total_compressed_size)))?;

    let file_len = source.len()?;
    if start.checked_add(len as u64).map_or(true, |end| end > file_len) {
        return Err(ColstripeError::InvalidFile(format!(
            "column chunk {} at offset {start} with {len} bytes runs past the end of a {file_len} byte file",
            meta.path_in_schema.join(".")
        )));
    }

    let mut cursor = source.try_clone()?;
    cursor.seek(SeekFrom::Start(start))?;
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes)?;
    Chunk::decode(&bytes, meta, column)
}

/// Reads and decodes every chunk of a row group. Each column is fetched on
/// its own cursor from [`Source::try_clone`].
pub fn read_row_group<S: Source>(
    source: &S,
    meta: &RowGroupMeta,
    schema: &SchemaDescriptor,
    pool: &ThreadPool,
) -> Result<TableSet> {
    if meta.columns.len() != schema.num_columns() {
        return Err(ColstripeError::InvalidFile(format!(
            "row group has {} column chunks for {} columns",
            meta.columns.len(),
            schema.num_columns()
        )));
    }
    let tables = pool.install(|| {
        meta.columns
            .par_iter()
            .zip(schema.columns().par_iter())
            .map(|(chunk, column)| {
                let chunk = &chunk.meta_data;
                if chunk.path_in_schema.as_slice() != column.path().as_slice() {
                    return Err(ColstripeError::InvalidFile(format!(
                        "column chunk {} found where {} was expected",
                        chunk.path_in_schema.join("."),
                        column.path()
                    )));
                }
                read_chunk(source, chunk, column)
            })
            .collect::<Result<Vec<_>>>()
    })?;
    Ok(TableSet::from_tables(tables))
}
