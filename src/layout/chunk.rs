//! Column chunks: all pages of one column within a row group.

use super::page::{read_page, Page};
use super::statistics::ValueStatistics;
use crate::basic::{CompressionCodec, Encoding, PageType};
use crate::descriptor::ColumnDescriptor;
use crate::error::{ColstripeError, EncodingError, Result};
use crate::metadata::ColumnMetaData;
use crate::physical::PhysicalValue;
use crate::table::Table;
use std::io::Write;
use tracing::{trace, warn};

/// Pages of one column plus the metadata which describes them in the footer.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pages: Vec<Page>,
    meta: ColumnMetaData,
}

impl Chunk {
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn meta(&self) -> &ColumnMetaData {
        &self.meta
    }

    pub fn into_meta(self) -> ColumnMetaData {
        self.meta
    }

    /// Serialized size of all pages.
    pub fn raw_len(&self) -> usize {
        self.pages.iter().map(Page::raw_len).sum()
    }

    /// Records the file offset of the chunk's first page. Only known once
    /// every earlier chunk is written.
    pub fn set_offset(&mut self, offset: i64) {
        let mut data_offset = offset;
        self.meta.dictionary_page_offset = None;
        for page in &self.pages {
            if page.page_type() != PageType::DictionaryPage {
                break;
            }
            self.meta.dictionary_page_offset = Some(data_offset);
            data_offset += page.raw_len() as i64;
        }
        self.meta.data_page_offset = data_offset;
    }

    /// Writes every page in order and returns the number of bytes written.
    pub fn write<W: Write>(&self, sink: &mut W) -> Result<usize> {
        let mut written = 0;
        for page in &self.pages {
            let bytes = page.to_bytes();
            sink.write_all(&bytes)?;
            written += bytes.len();
        }
        Ok(written)
    }

    /// Decodes the pages in `bytes` until the `num_values` recorded in
    /// `meta` are read.
    pub fn decode(bytes: &[u8], meta: &ColumnMetaData, column: &ColumnDescriptor) -> Result<Table> {
        let expected = usize::try_from(meta.num_values)
            .map_err(|_| ColstripeError::InvalidFile(format!("negative value count {}", meta.num_values)))?;
        let mut table = Table::new(column);
        let mut dictionary: Option<Vec<PhysicalValue>> = None;
        let mut pos = 0;

        while table.len() < expected {
            if pos >= bytes.len() {
                return Err(EncodingError::TruncatedBuffer { offset: pos, needed: 1 }.into());
            }
            let (page, len) = read_page(&bytes[pos..])?;
            trace!(path = %column.path(), page_type = %page.page_type(), offset = pos, "read page");
            pos += len;
            match page.page_type() {
                PageType::DictionaryPage => {
                    dictionary = Some(page.decode_dictionary(column, meta.codec)?);
                }
                PageType::DataPage | PageType::DataPageV2 => {
                    let remaining = expected - table.len();
                    if page.num_values() > remaining {
                        return Err(ColstripeError::InvalidFile(format!(
                            "page of {} values in column {} where {remaining} remain",
                            page.num_values(),
                            column.path()
                        )));
                    }
                    table.merge(page.decode(column, meta.codec, dictionary.as_deref())?);
                }
                PageType::IndexPage => {
                    warn!(path = %column.path(), "Skipping index page");
                }
            }
        }
        if table.len() > expected {
            return Err(ColstripeError::InvalidFile(format!(
                "column {} holds {} values, expected {expected}",
                column.path(),
                table.len()
            )));
        }
        Ok(table)
    }
}

/// Encodings of the chunk, level encoding included, in first-use order.
fn chunk_encodings(pages: &[Page]) -> Vec<Encoding> {
    let mut encodings = vec![];
    for encoding in pages.iter().filter_map(Page::encoding).chain(std::iter::once(Encoding::Rle)) {
        if !encodings.contains(&encoding) {
            encodings.push(encoding);
        }
    }
    encodings
}

/// Combines the pages of one column into a chunk.
///
/// The uncompressed size counts page headers, which are never compressed.
/// Offsets are left at zero until [`Chunk::set_offset`].
pub fn pages_to_chunk(pages: Vec<Page>, column: &ColumnDescriptor, codec: CompressionCodec) -> Chunk {
    let mut num_values = 0i64;
    let mut uncompressed = 0i64;
    let mut compressed = 0i64;
    let mut statistics = ValueStatistics::for_column(column);
    let mut distinct = None;

    for page in &pages {
        let raw_len = page.raw_len() as i64;
        let header = page.header();
        uncompressed += header.uncompressed_page_size as i64 + raw_len - header.compressed_page_size as i64;
        compressed += raw_len;
        if page.is_data_page() {
            num_values += page.num_values() as i64;
        } else if page.page_type() == PageType::DictionaryPage {
            distinct = Some(page.num_values() as u64);
        }
        if let Some(stats) = page.statistics() {
            statistics.merge(stats);
        }
    }
    if let Some(distinct) = distinct {
        statistics.set_distinct_count(distinct);
    }

    let meta = ColumnMetaData {
        physical_type: column.physical_type(),
        encodings: chunk_encodings(&pages),
        path_in_schema: column.path().to_vec(),
        codec,
        num_values,
        total_uncompressed_size: uncompressed,
        total_compressed_size: compressed,
        data_page_offset: 0,
        dictionary_page_offset: None,
        statistics: if pages.is_empty() {
            None
        } else {
            Some(statistics.to_thrift())
        },
    };
    Chunk { pages, meta }
}
