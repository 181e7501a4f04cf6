//! Record writer.
//!
//! Records are shredded into a buffer of column tables. Once the buffer's
//! estimated encoded size reaches the row group size, whole records are cut
//! from its front and written as a row group. The footer follows on
//! [`FileWriter::close`].

use crate::common::MAGIC;
use crate::descriptor::SchemaDescriptor;
use crate::error::Result;
use crate::layout::RowGroup;
use crate::metadata::{to_schema_elements, FileMetaData, RowGroupMeta};
use crate::properties::{build_pool, WriterProperties};
use crate::shred::shred_parallel;
use crate::table::TableSet;
use crate::value::Value;
use rayon::ThreadPool;
use std::io::Write;
use tracing::{debug, trace};

/// Footer format version.
pub const FORMAT_VERSION: i32 = 1;

/// Records handed to the shredder at once by [`FileWriter::write_all`].
const WRITE_BATCH_SIZE: usize = 1024;

/// Writes records to a parquet file.
#[derive(Debug)]
pub struct FileWriter<W: Write> {
    sink: W,
    schema: SchemaDescriptor,
    props: WriterProperties,
    pool: ThreadPool,
    buffer: TableSet,
    buffered_rows: usize,
    buffered_size: usize,
    offset: u64,
    row_groups: Vec<RowGroupMeta>,
    num_rows: i64,
}

impl<W: Write> FileWriter<W> {
    /// Starts a file on `sink` by writing the leading magic.
    pub fn new(mut sink: W, schema: SchemaDescriptor, props: WriterProperties) -> Result<Self> {
        let pool = build_pool(props.parallelism())?;
        sink.write_all(MAGIC)?;
        Ok(Self {
            sink,
            buffer: TableSet::new(&schema),
            buffered_rows: 0,
            buffered_size: 0,
            schema,
            props,
            pool,
            offset: MAGIC.len() as u64,
            row_groups: vec![],
            num_rows: 0,
        })
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn properties(&self) -> &WriterProperties {
        &self.props
    }

    /// Records in written row groups, excluding buffered ones.
    pub fn rows_written(&self) -> i64 {
        self.num_rows
    }

    /// Records waiting for the next row group.
    pub fn buffered_rows(&self) -> usize {
        self.buffered_rows
    }

    pub fn row_groups(&self) -> &[RowGroupMeta] {
        &self.row_groups
    }

    /// Shreds `records` into the buffer, writing row groups while the buffer
    /// is at or above the row group size.
    ///
    /// A record which does not fit the schema fails the whole call, and
    /// none of `records` is buffered.
    pub fn write(&mut self, records: &[Value]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let tables = shred_parallel(records, &self.schema, &self.pool)?;
        self.buffered_rows += records.len();
        self.buffered_size += tables.estimated_size();
        self.buffer.merge(tables);

        let target = self.props.row_group_size();
        while self.buffered_size >= target && self.buffered_rows > 0 {
            let (size, rows) = (self.buffered_size, self.buffered_rows);
            // Take the share of rows which fits the target, assuming rows of
            // similar size.
            let take = ((rows as u128 * target as u128 / size as u128) as usize).clamp(1, rows);
            trace!(size, rows, take, "row group size reached");
            let group = self.take_buffered(take);
            self.write_row_group(group)?;
        }
        Ok(())
    }

    /// Writes every record of `records`, in batches.
    pub fn write_all<I: IntoIterator<Item = Value>>(&mut self, records: I) -> Result<()> {
        let mut batch = Vec::with_capacity(WRITE_BATCH_SIZE);
        for record in records {
            batch.push(record);
            if batch.len() == WRITE_BATCH_SIZE {
                self.write(&batch)?;
                batch.clear();
            }
        }
        self.write(&batch)
    }

    /// Writes buffered records as a row group, even below the row group size.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffered_rows > 0 {
            let group = self.take_buffered(self.buffered_rows);
            self.write_row_group(group)?;
        }
        self.sink.flush()?;
        Ok(())
    }

    /// Cuts the first `rows` records from the buffer, keeping the running
    /// counters in step.
    fn take_buffered(&mut self, rows: usize) -> TableSet {
        let group = self.buffer.pop(rows);
        self.buffered_rows -= rows;
        self.buffered_size = self.buffered_size.saturating_sub(group.estimated_size());
        group
    }

    fn write_row_group(&mut self, tables: TableSet) -> Result<()> {
        let group = RowGroup::new(tables, &self.schema, &self.props, &self.pool)?;
        let rows = group.num_rows();
        let meta = group.write(&mut self.sink, self.offset)?;
        let bytes: i64 = meta.columns.iter().map(|c| c.meta_data.total_compressed_size).sum();
        debug!(
            row_group = self.row_groups.len(),
            rows,
            offset = self.offset,
            bytes,
            "flushed row group"
        );
        self.offset += bytes as u64;
        self.num_rows += rows as i64;
        self.row_groups.push(meta);
        Ok(())
    }

    /// Flushes buffered records, then writes the footer, its length and the
    /// trailing magic. Returns the footer.
    pub fn close(mut self) -> Result<FileMetaData> {
        self.flush()?;
        let key_value_metadata = match self.props.key_value_metadata() {
            [] => None,
            kv => Some(kv.to_vec()),
        };
        let metadata = FileMetaData {
            version: FORMAT_VERSION,
            schema: to_schema_elements(&self.schema),
            num_rows: self.num_rows,
            row_groups: self.row_groups,
            key_value_metadata,
            created_by: Some(self.props.created_by().to_string()),
        };

        let footer = metadata.to_bytes();
        debug!(offset = self.offset, len = footer.len(), rows = self.num_rows, "writing footer");
        self.sink.write_all(&footer)?;
        self.sink.write_all(&(footer.len() as u32).to_le_bytes())?;
        self.sink.write_all(MAGIC)?;
        self.sink.flush()?;
        Ok(metadata)
    }
}
