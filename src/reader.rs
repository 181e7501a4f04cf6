//! Record reader.

use crate::assemble::assemble_parallel;
use crate::common::MAGIC;
use crate::descriptor::SchemaDescriptor;
use crate::error::{ColstripeError, Result};
use crate::layout::row_group::read_chunk;
use crate::layout::read_row_group;
use crate::metadata::{FileMetaData, KeyValue, RowGroupMeta};
use crate::properties::{build_pool, ReaderProperties};
use crate::source::Source;
use crate::table::Table;
use crate::value::Value;
use rayon::ThreadPool;
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// Magic, footer length and magic.
const MIN_FILE_LEN: u64 = 12;

/// Reads records back from a parquet file.
#[derive(Debug)]
pub struct FileReader<S: Source> {
    source: S,
    metadata: FileMetaData,
    schema: SchemaDescriptor,
    pool: ThreadPool,
}

impl<S: Source> FileReader<S> {
    /// Checks both magics and parses the footer.
    pub fn open(mut source: S, props: ReaderProperties) -> Result<Self> {
        let len = source.len()?;
        if len < MIN_FILE_LEN {
            return Err(ColstripeError::InvalidFile(format!(
                "{len} bytes is too short for a parquet file"
            )));
        }

        let mut head = [0u8; 4];
        source.seek(SeekFrom::Start(0))?;
        source.read_exact(&mut head)?;
        let mut tail = [0u8; 8];
        source.seek(SeekFrom::Start(len - 8))?;
        source.read_exact(&mut tail)?;
        if &head != MAGIC || &tail[4..] != MAGIC {
            return Err(ColstripeError::InvalidFile("missing PAR1 magic".to_string()));
        }

        let footer_len = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]) as u64;
        if footer_len + MIN_FILE_LEN > len {
            return Err(ColstripeError::InvalidFile(format!(
                "footer of {footer_len} bytes does not fit a file of {len} bytes"
            )));
        }
        let footer_offset = len - 8 - footer_len;
        debug!(footer_offset, footer_len, "reading footer");
        let mut footer = vec![0u8; footer_len as usize];
        source.seek(SeekFrom::Start(footer_offset))?;
        source.read_exact(&mut footer)?;

        let metadata = FileMetaData::from_bytes(&footer)?;
        let schema = SchemaDescriptor::from_schema_elements(&metadata.schema)?;
        let pool = build_pool(props.parallelism())?;
        Ok(Self {
            source,
            metadata,
            schema,
            pool,
        })
    }

    pub fn metadata(&self) -> &FileMetaData {
        &self.metadata
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn num_rows(&self) -> i64 {
        self.metadata.num_rows
    }

    pub fn num_row_groups(&self) -> usize {
        self.metadata.row_groups.len()
    }

    pub fn created_by(&self) -> Option<&str> {
        self.metadata.created_by.as_deref()
    }

    pub fn key_value_metadata(&self) -> &[KeyValue] {
        self.metadata.key_value_metadata.as_deref().unwrap_or(&[])
    }

    fn row_group_meta(&self, index: usize) -> Result<&RowGroupMeta> {
        self.metadata.row_groups.get(index).ok_or_else(|| {
            ColstripeError::InvalidFile(format!(
                "row group {index} out of range, the file has {}",
                self.metadata.row_groups.len()
            ))
        })
    }

    /// Reads and assembles the records of one row group.
    pub fn read_row_group(&self, index: usize) -> Result<Vec<Value>> {
        let meta = self.row_group_meta(index)?;
        let tables = read_row_group(&self.source, meta, &self.schema, &self.pool)?;
        if tables.num_rows() as i64 != meta.num_rows {
            return Err(ColstripeError::InvalidFile(format!(
                "row group {index} declares {} rows, found {}",
                meta.num_rows,
                tables.num_rows()
            )));
        }
        debug!(row_group = index, rows = meta.num_rows, "assembling row group");
        assemble_parallel(&self.schema, &tables, &self.pool)
    }

    /// Reads every record of the file, in row group order.
    pub fn read(&self) -> Result<Vec<Value>> {
        let mut records = Vec::with_capacity(self.metadata.num_rows.max(0) as usize);
        for index in 0..self.num_row_groups() {
            records.extend(self.read_row_group(index)?);
        }
        Ok(records)
    }

    /// Decodes the triples of a single column across all row groups.
    ///
    /// `path` is either the on-disk dotted path or the application facing
    /// one.
    pub fn read_column(&self, path: &str) -> Result<Table> {
        let index = match self.schema.column_index(path) {
            Ok(index) => index,
            Err(_) => {
                let internal = self.schema.to_internal_path(path)?;
                self.schema.column_index(&internal)?
            }
        };
        let column = self.schema.column(index);
        let mut table = Table::new(column);
        for group in &self.metadata.row_groups {
            let meta = group
                .columns
                .get(index)
                .map(|c| &c.meta_data)
                .ok_or_else(|| ColstripeError::InvalidFile(format!("row group is missing column {path}")))?;
            table.merge(read_chunk(&self.source, meta, column)?);
        }
        Ok(table)
    }
}
