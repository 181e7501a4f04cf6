//! Writer and reader configuration.

use crate::basic::CompressionCodec;
use crate::error::{ColstripeError, Result};
use crate::metadata::KeyValue;
use rayon::{ThreadPool, ThreadPoolBuilder};

pub const DEFAULT_PAGE_SIZE: usize = 8 * 1024;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 128 * 1024 * 1024;
pub const DEFAULT_PARALLELISM: usize = 4;
pub const DEFAULT_CREATED_BY: &str = concat!("colstripe version ", env!("CARGO_PKG_VERSION"));

/// Layout of data pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataPageVersion {
    /// Levels are length prefixed and compressed together with the values.
    #[default]
    V1,
    /// Levels are written uncompressed ahead of the compressed values.
    V2,
}

/// Immutable writer configuration. Per-column encodings are part of the
/// schema, see [`Field::with_encoding`](crate::field::Field::with_encoding).
#[derive(Debug, Clone)]
pub struct WriterProperties {
    page_size: usize,
    row_group_size: usize,
    compression: CompressionCodec,
    parallelism: usize,
    data_page_version: DataPageVersion,
    created_by: String,
    key_value_metadata: Vec<KeyValue>,
}

impl Default for WriterProperties {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl WriterProperties {
    pub fn builder() -> WriterPropertiesBuilder {
        WriterPropertiesBuilder::default()
    }

    /// Target encoded size of a data page. Pages close at the first record
    /// boundary at or past it.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Estimated encoded size at which buffered records become a row group.
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    pub fn compression(&self) -> CompressionCodec {
        self.compression
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn data_page_version(&self) -> DataPageVersion {
        self.data_page_version
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn key_value_metadata(&self) -> &[KeyValue] {
        &self.key_value_metadata
    }
}

#[derive(Debug, Clone)]
pub struct WriterPropertiesBuilder {
    page_size: usize,
    row_group_size: usize,
    compression: CompressionCodec,
    parallelism: usize,
    data_page_version: DataPageVersion,
    created_by: String,
    key_value_metadata: Vec<KeyValue>,
}

impl Default for WriterPropertiesBuilder {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            compression: CompressionCodec::Uncompressed,
            parallelism: DEFAULT_PARALLELISM,
            data_page_version: DataPageVersion::V1,
            created_by: DEFAULT_CREATED_BY.to_string(),
            key_value_metadata: vec![],
        }
    }
}

impl WriterPropertiesBuilder {
    pub fn page_size(mut self, bytes: usize) -> Self {
        self.page_size = bytes.max(1);
        self
    }

    pub fn row_group_size(mut self, bytes: usize) -> Self {
        self.row_group_size = bytes.max(1);
        self
    }

    pub fn compression(mut self, codec: CompressionCodec) -> Self {
        self.compression = codec;
        self
    }

    /// Number of worker threads. At least one is used.
    pub fn parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers.max(1);
        self
    }

    pub fn data_page_version(mut self, version: DataPageVersion) -> Self {
        self.data_page_version = version;
        self
    }

    pub fn created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = created_by.into();
        self
    }

    pub fn key_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.key_value_metadata.push(KeyValue::new(key, value));
        self
    }

    pub fn build(self) -> WriterProperties {
        WriterProperties {
            page_size: self.page_size,
            row_group_size: self.row_group_size,
            compression: self.compression,
            parallelism: self.parallelism,
            data_page_version: self.data_page_version,
            created_by: self.created_by,
            key_value_metadata: self.key_value_metadata,
        }
    }
}

/// Reader configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderProperties {
    parallelism: usize,
}

impl Default for ReaderProperties {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl ReaderProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers.max(1);
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }
}

/// Creates the worker pool shared by one writer or reader.
pub fn build_pool(workers: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("colstripe-{i}"))
        .build()
        .map_err(|e| ColstripeError::Pool(e.to_string()))
}
