//! Data and dictionary pages.
//!
//! A data page holds a contiguous run of whole records of one column: its
//! repetition levels, definition levels and non-null values. Pages are cut
//! only where a record starts, so every page decodes on its own.

use super::statistics::ValueStatistics;
use crate::basic::{CompressionCodec, Encoding, PageType};
use crate::compression::{compress, decompress};
use crate::descriptor::ColumnDescriptor;
use crate::encoding::bit_util::ByteReader;
use crate::encoding::dictionary::{self, DictionaryBuilder};
use crate::encoding::{decode_values, encode_values, plain, rle};
use crate::error::{ColstripeError, EncodingError, Result};
use crate::metadata::{DataPageHeader, DataPageHeaderV2, DictionaryPageHeader, PageHeader};
use crate::physical::PhysicalValue;
use crate::properties::{DataPageVersion, WriterProperties};
use crate::table::Table;
use std::ops::Range;
use tracing::trace;

/// A serialized page: header plus the body bytes exactly as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    header: PageHeader,
    body: Vec<u8>,
    statistics: Option<ValueStatistics>,
}

impl Page {
    pub fn header(&self) -> &PageHeader {
        &self.header
    }

    pub fn page_type(&self) -> PageType {
        self.header.page_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Statistics of a data page built by this crate. Pages read back from
    /// bytes carry them in the header only.
    pub fn statistics(&self) -> Option<&ValueStatistics> {
        self.statistics.as_ref()
    }

    /// Number of triples in a data page, or of entries in a dictionary page.
    pub fn num_values(&self) -> usize {
        let n = if let Some(ref h) = self.header.data_page_header {
            h.num_values
        } else if let Some(ref h) = self.header.data_page_header_v2 {
            h.num_values
        } else if let Some(ref h) = self.header.dictionary_page_header {
            h.num_values
        } else {
            0
        };
        n.max(0) as usize
    }

    /// Value encoding declared by the header.
    pub fn encoding(&self) -> Option<Encoding> {
        if let Some(ref h) = self.header.data_page_header {
            Some(h.encoding)
        } else if let Some(ref h) = self.header.data_page_header_v2 {
            Some(h.encoding)
        } else {
            self.header.dictionary_page_header.as_ref().map(|h| h.encoding)
        }
    }

    pub fn is_data_page(&self) -> bool {
        matches!(self.header.page_type, PageType::DataPage | PageType::DataPageV2)
    }

    /// Size of header and body once serialized.
    pub fn raw_len(&self) -> usize {
        self.header.to_bytes().len() + self.body.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.header.to_bytes();
        out.extend_from_slice(&self.body);
        out
    }

    /// Decodes a data page into a table.
    ///
    /// `dictionary` holds the values of the chunk's dictionary page, and is
    /// required when the page is dictionary encoded.
    pub fn decode(
        &self,
        column: &ColumnDescriptor,
        codec: CompressionCodec,
        dictionary: Option<&[PhysicalValue]>,
    ) -> Result<Table> {
        let (encoding, num_values, rep_levels, def_levels, values) =
            match (&self.header.data_page_header, &self.header.data_page_header_v2) {
                (Some(h), _) => {
                    let body = decompress(codec, &self.body, header_size(self.header.uncompressed_page_size)?)?;
                    let num_values = header_size(h.num_values)?;
                    let mut reader = ByteReader::new(&body);
                    let rep_levels = read_prefixed_levels(&mut reader, column.max_repetition_level(), num_values)?;
                    let def_levels = read_prefixed_levels(&mut reader, column.max_definition_level(), num_values)?;
                    (h.encoding, num_values, rep_levels, def_levels, reader.rest().to_vec())
                }
                (None, Some(h)) => {
                    let num_values = header_size(h.num_values)?;
                    let rep_len = header_size(h.repetition_levels_byte_length)?;
                    let def_len = header_size(h.definition_levels_byte_length)?;
                    let mut reader = ByteReader::new(&self.body);
                    let rep_bytes = reader.read_bytes(rep_len)?;
                    let def_bytes = reader.read_bytes(def_len)?;
                    let rep_levels = read_levels(rep_bytes, column.max_repetition_level(), num_values)?;
                    let def_levels = read_levels(def_bytes, column.max_definition_level(), num_values)?;
                    let values = if h.is_compressed {
                        let expanded = header_size(self.header.uncompressed_page_size)?
                            .checked_sub(rep_len + def_len)
                            .ok_or_else(|| invalid("v2 level lengths exceed the page size"))?;
                        decompress(codec, reader.rest(), expanded)?
                    } else {
                        reader.rest().to_vec()
                    };
                    (h.encoding, num_values, rep_levels, def_levels, values)
                }
                (None, None) => {
                    return Err(invalid(format!("{} is not a data page", self.header.page_type)));
                }
            };

        let max_def = column.max_definition_level();
        let present = match def_levels {
            Some(ref levels) => levels.iter().filter(|&&d| d == max_def).count(),
            None => num_values,
        };
        let decoded = if encoding.is_dictionary() {
            let dictionary = dictionary.ok_or_else(|| invalid("dictionary encoded page without a dictionary page"))?;
            let indices = dictionary::decode_indices(&values, present)?;
            dictionary::lookup(dictionary, &indices)?
        } else {
            decode_values(
                &values,
                encoding,
                column.physical_type(),
                column.type_length(),
                present,
            )?
        };

        let mut table = Table::new(column);
        let mut decoded = decoded.into_iter();
        let level = |levels: &Option<Vec<u16>>, i: usize| levels.as_ref().map_or(0, |l| l[i]);
        for i in 0..num_values {
            let def_level = level(&def_levels, i);
            let value = if def_level == max_def { decoded.next() } else { None };
            table.push(value, level(&rep_levels, i), def_level);
        }
        table.validate()?;
        Ok(table)
    }

    /// Decodes the distinct values of a dictionary page.
    pub fn decode_dictionary(&self, column: &ColumnDescriptor, codec: CompressionCodec) -> Result<Vec<PhysicalValue>> {
        let header = self
            .header
            .dictionary_page_header
            .as_ref()
            .ok_or_else(|| invalid(format!("{} is not a dictionary page", self.header.page_type)))?;
        let body = decompress(codec, &self.body, header_size(self.header.uncompressed_page_size)?)?;
        let values = plain::decode(
            &body,
            column.physical_type(),
            column.type_length(),
            header_size(header.num_values)?,
        )?;
        Ok(values)
    }
}

fn invalid(reason: impl Into<String>) -> ColstripeError {
    ColstripeError::InvalidFile(reason.into())
}

fn header_size(n: i32) -> Result<usize> {
    usize::try_from(n).map_err(|_| invalid(format!("negative size {n} in page header")))
}

/// Levels of a column whose maximum is 0 are not stored and read as `None`.
fn read_levels(data: &[u8], max_level: u16, count: usize) -> Result<Option<Vec<u16>>> {
    if max_level == 0 {
        return Ok(None);
    }
    Ok(Some(rle::decode_levels(data, max_level, count)?.0))
}

fn read_prefixed_levels(reader: &mut ByteReader<'_>, max_level: u16, count: usize) -> Result<Option<Vec<u16>>> {
    if max_level == 0 {
        return Ok(None);
    }
    let len = reader.read_u32_le()? as usize;
    read_levels(reader.read_bytes(len)?, max_level, count)
}

fn write_prefixed_levels(levels: &[u16], max_level: u16, out: &mut Vec<u8>) {
    if max_level == 0 {
        return;
    }
    let encoded = rle::encode_levels(levels, max_level);
    out.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
    out.extend_from_slice(&encoded);
}

fn levels(levels: &[u16], max_level: u16) -> Vec<u8> {
    if max_level == 0 {
        return vec![];
    }
    rle::encode_levels(levels, max_level)
}

fn to_i32(n: usize, what: &str) -> Result<i32> {
    i32::try_from(n).map_err(|_| ColstripeError::Encoding(EncodingError::InvalidData(format!("{what} {n} overflows i32"))))
}

/// Splits the triples of `table` into page ranges. A page closes after the
/// first record which takes its value bytes to `page_size` or past it, so a
/// page overshoots `page_size` by less than one record.
fn page_ranges(table: &Table, page_size: usize) -> Vec<Range<usize>> {
    let starts = table.row_starts();
    let mut ranges = vec![];
    let mut page_start = 0;
    let mut size = 0;
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(table.len());
        size += table.values()[start..end]
            .iter()
            .flatten()
            .map(PhysicalValue::plain_size)
            .sum::<usize>();
        if size >= page_size {
            ranges.push(page_start..end);
            page_start = end;
            size = 0;
        }
    }
    if page_start < table.len() {
        ranges.push(page_start..table.len());
    }
    ranges
}

/// Values of the data page section, and the encoding written in its header.
struct EncodedValues {
    encoding: Encoding,
    bytes: Vec<u8>,
}

fn build_data_page(
    slice: &Table,
    column: &ColumnDescriptor,
    props: &WriterProperties,
    values: EncodedValues,
) -> Result<Page> {
    let mut stats = ValueStatistics::for_column(column);
    for value in slice.values() {
        stats.update(value.as_ref());
    }
    let codec = props.compression();
    let num_values = to_i32(slice.len(), "page value count")?;
    let max_rep = column.max_repetition_level();
    let max_def = column.max_definition_level();

    let (header, body) = match props.data_page_version() {
        DataPageVersion::V1 => {
            let mut raw = vec![];
            write_prefixed_levels(slice.repetition_levels(), max_rep, &mut raw);
            write_prefixed_levels(slice.definition_levels(), max_def, &mut raw);
            raw.extend_from_slice(&values.bytes);
            let body = compress(codec, &raw)?;
            let header = PageHeader {
                page_type: PageType::DataPage,
                uncompressed_page_size: to_i32(raw.len(), "page size")?,
                compressed_page_size: to_i32(body.len(), "page size")?,
                data_page_header: Some(DataPageHeader {
                    num_values,
                    encoding: values.encoding,
                    definition_level_encoding: Encoding::Rle,
                    repetition_level_encoding: Encoding::Rle,
                    statistics: Some(stats.to_thrift()),
                }),
                dictionary_page_header: None,
                data_page_header_v2: None,
            };
            (header, body)
        }
        DataPageVersion::V2 => {
            let rep = levels(slice.repetition_levels(), max_rep);
            let def = levels(slice.definition_levels(), max_def);
            let is_compressed = codec != CompressionCodec::Uncompressed;
            let compressed = if is_compressed {
                compress(codec, &values.bytes)?
            } else {
                values.bytes.clone()
            };
            let uncompressed = rep.len() + def.len() + values.bytes.len();
            let mut body = Vec::with_capacity(rep.len() + def.len() + compressed.len());
            body.extend_from_slice(&rep);
            body.extend_from_slice(&def);
            body.extend_from_slice(&compressed);
            let header = PageHeader {
                page_type: PageType::DataPageV2,
                uncompressed_page_size: to_i32(uncompressed, "page size")?,
                compressed_page_size: to_i32(body.len(), "page size")?,
                data_page_header: None,
                dictionary_page_header: None,
                data_page_header_v2: Some(DataPageHeaderV2 {
                    num_values,
                    num_nulls: to_i32(slice.null_count(), "page null count")?,
                    num_rows: to_i32(slice.num_rows(), "page row count")?,
                    encoding: values.encoding,
                    definition_levels_byte_length: to_i32(def.len(), "level length")?,
                    repetition_levels_byte_length: to_i32(rep.len(), "level length")?,
                    is_compressed,
                    statistics: Some(stats.to_thrift()),
                }),
            };
            (header, body)
        }
    };
    trace!(
        path = %column.path(),
        num_values,
        uncompressed = header.uncompressed_page_size,
        compressed = header.compressed_page_size,
        "built data page"
    );
    Ok(Page {
        header,
        body,
        statistics: Some(stats),
    })
}

fn present_values(slice: &Table) -> Vec<PhysicalValue> {
    slice.values().iter().flatten().cloned().collect()
}

/// Cuts `table` into data pages.
///
/// Dictionary encoded columns get their dictionary page first, see
/// [`table_to_dict_pages`]. An empty table yields no pages at all, while a
/// table of nulls yields a page of levels with an empty value section.
pub fn table_to_pages(table: &Table, column: &ColumnDescriptor, props: &WriterProperties) -> Result<Vec<Page>> {
    table.validate()?;
    if table.is_empty() {
        return Ok(vec![]);
    }
    if column.encoding().is_dictionary() {
        let (dictionary, mut pages) = table_to_dict_pages(table, column, props)?;
        pages.insert(0, dictionary);
        return Ok(pages);
    }

    let encoding = column.encoding();
    page_ranges(table, props.page_size())
        .into_iter()
        .map(|range| {
            let slice = table.slice(range);
            let bytes = encode_values(&present_values(&slice), encoding, column.physical_type())?;
            build_data_page(&slice, column, props, EncodedValues { encoding, bytes })
        })
        .collect()
}

/// Cuts `table` into dictionary encoded data pages which share one
/// dictionary, returned first.
pub fn table_to_dict_pages(
    table: &Table,
    column: &ColumnDescriptor,
    props: &WriterProperties,
) -> Result<(Page, Vec<Page>)> {
    table.validate()?;
    let mut builder = DictionaryBuilder::new(column.physical_type());
    let encoding = match column.encoding() {
        Encoding::PlainDictionary => Encoding::PlainDictionary,
        _ => Encoding::RleDictionary,
    };

    let ranges = page_ranges(table, props.page_size());
    let mut indices = Vec::with_capacity(ranges.len());
    for range in &ranges {
        let slice = table.slice(range.clone());
        let page_indices: Vec<u32> = slice.values().iter().flatten().map(|v| builder.insert(v)).collect();
        indices.push((slice, page_indices));
    }

    // Index width depends on the final dictionary size.
    let bit_width = builder.bit_width();
    let pages = indices
        .into_iter()
        .map(|(slice, page_indices)| {
            let bytes = dictionary::encode_indices(&page_indices, bit_width);
            build_data_page(&slice, column, props, EncodedValues { encoding, bytes })
        })
        .collect::<Result<Vec<_>>>()?;

    let raw = builder.to_plain()?;
    let body = compress(props.compression(), &raw)?;
    let dictionary_encoding = match encoding {
        Encoding::PlainDictionary => Encoding::PlainDictionary,
        _ => Encoding::Plain,
    };
    let header = PageHeader {
        page_type: PageType::DictionaryPage,
        uncompressed_page_size: to_i32(raw.len(), "page size")?,
        compressed_page_size: to_i32(body.len(), "page size")?,
        data_page_header: None,
        dictionary_page_header: Some(DictionaryPageHeader {
            num_values: to_i32(builder.len(), "dictionary size")?,
            encoding: dictionary_encoding,
            is_sorted: Some(false),
        }),
        data_page_header_v2: None,
    };
    trace!(path = %column.path(), entries = builder.len(), bit_width, "built dictionary page");
    Ok((
        Page {
            header,
            body,
            statistics: None,
        },
        pages,
    ))
}

/// Reads one page from the front of `data`, returning it with the number of
/// bytes it spans.
pub fn read_page(data: &[u8]) -> Result<(Page, usize)> {
    let (header, header_len) = PageHeader::from_bytes(data)?;
    let body_len = header_size(header.compressed_page_size)?;
    let end = header_len + body_len;
    if end > data.len() {
        return Err(EncodingError::TruncatedBuffer {
            offset: data.len(),
            needed: end - data.len(),
        }
        .into());
    }
    let body = data[header_len..end].to_vec();
    Ok((
        Page {
            header,
            body,
            statistics: None,
        },
        end,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SchemaDescriptor;
    use crate::schema::*;

    fn numbers_schema() -> SchemaDescriptor {
        Schema::new("doc", vec![optional_long("n")]).into_descriptor().unwrap()
    }

    fn numbers(schema: &SchemaDescriptor, values: &[Option<i64>]) -> Table {
        let mut table = Table::new(schema.column(0));
        for v in values {
            match v {
                Some(v) => table.push(Some(PhysicalValue::Int64(*v)), 0, 1),
                None => table.push(None, 0, 0),
            }
        }
        table
    }

    #[test]
    fn test_page_statistics() {
        let schema = numbers_schema();
        let table = numbers(&schema, &[Some(5), None, Some(1), Some(9), None, Some(3)]);
        let pages = table_to_pages(&table, schema.column(0), &WriterProperties::default()).unwrap();

        assert_eq!(pages.len(), 1);
        let page = &pages[0];
        assert_eq!(page.num_values(), 6, "Nulls count as values of the page");
        let stats = page.statistics().unwrap();
        assert_eq!(stats.max(), Some(&PhysicalValue::Int64(9)));
        assert_eq!(stats.min(), Some(&PhysicalValue::Int64(1)));
        assert_eq!(stats.null_count(), 2);

        let thrift = page.header().data_page_header.as_ref().unwrap().statistics.clone().unwrap();
        assert_eq!(thrift.null_count, Some(2));
        assert_eq!(thrift.max, Some(9i64.to_le_bytes().to_vec()));
    }

    #[test]
    fn test_empty_and_all_null() {
        let schema = numbers_schema();
        let props = WriterProperties::default();

        let empty = Table::new(schema.column(0));
        assert!(table_to_pages(&empty, schema.column(0), &props).unwrap().is_empty());

        let nulls = numbers(&schema, &[None, None, None]);
        let pages = table_to_pages(&nulls, schema.column(0), &props).unwrap();
        assert_eq!(pages.len(), 1, "A column of nulls still needs a page");
        assert_eq!(pages[0].num_values(), 3);

        let decoded = pages[0]
            .decode(schema.column(0), CompressionCodec::Uncompressed, None)
            .unwrap();
        assert_eq!(decoded, nulls);
    }

    #[test]
    fn test_pages_close_at_records() {
        let schema = Schema::new("doc", vec![repeated_long("n")]).into_descriptor().unwrap();
        let column = schema.column(0);
        let mut table = Table::new(column);
        for record in 0..10i64 {
            for i in 0..3 {
                table.push(Some(PhysicalValue::Int64(record * 3 + i)), (i > 0) as u16, 2);
            }
        }
        let props = WriterProperties::builder().page_size(40).build();
        let pages = table_to_pages(&table, column, &props).unwrap();

        assert_eq!(pages.len(), 5, "Each page holds two records of 24 bytes");
        let mut decoded = Table::new(column);
        for page in &pages {
            let part = page.decode(column, CompressionCodec::Uncompressed, None).unwrap();
            assert_eq!(part.repetition_levels()[0], 0, "A page starts a record");
            decoded.merge(part);
        }
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_value_count_past_the_page() {
        let schema = Schema::new("doc", vec![long("id")]).into_descriptor().unwrap();
        let column = schema.column(0);
        let mut table = Table::new(column);
        for i in 0..10 {
            table.push(Some(PhysicalValue::Int64(i)), 0, 0);
        }

        for version in [DataPageVersion::V1, DataPageVersion::V2] {
            let props = WriterProperties::builder().data_page_version(version).build();
            let mut page = table_to_pages(&table, column, &props).unwrap().remove(0);
            match version {
                DataPageVersion::V1 => page.header.data_page_header.as_mut().unwrap().num_values = i32::MAX,
                DataPageVersion::V2 => page.header.data_page_header_v2.as_mut().unwrap().num_values = i32::MAX,
            }

            let err = page.decode(column, CompressionCodec::Uncompressed, None).unwrap_err();
            assert!(
                matches!(err, ColstripeError::Encoding(EncodingError::TruncatedBuffer { .. })),
                "{:?} page claiming more values than its bytes hold, found: {:?}",
                version,
                err
            );
        }
    }

    #[test]
    fn test_v2_compressed_page() {
        let schema = numbers_schema();
        let column = schema.column(0);
        let table = numbers(&schema, &[Some(1), None, Some(1), Some(1), Some(2)]);
        let props = WriterProperties::builder()
            .data_page_version(DataPageVersion::V2)
            .compression(CompressionCodec::Snappy)
            .build();
        let pages = table_to_pages(&table, column, &props).unwrap();

        let header = pages[0].header().data_page_header_v2.clone().unwrap();
        assert_eq!(header.num_nulls, 1);
        assert_eq!(header.num_rows, 5);
        assert_eq!(header.repetition_levels_byte_length, 0);
        assert!(header.is_compressed);

        let bytes = pages[0].to_bytes();
        let (read, len) = read_page(&bytes).unwrap();
        assert_eq!(len, bytes.len());
        assert_eq!(read.decode(column, CompressionCodec::Snappy, None).unwrap(), table);
    }

    #[test]
    fn test_dictionary_pages() {
        let schema = Schema::new(
            "doc",
            vec![optional_string("city").with_encoding(Encoding::RleDictionary)],
        )
        .into_descriptor()
        .unwrap();
        let column = schema.column(0);
        let mut table = Table::new(column);
        for city in ["oslo", "rome", "oslo", "", "rome", "oslo"] {
            if city.is_empty() {
                table.push(None, 0, 0);
            } else {
                table.push(Some(PhysicalValue::ByteArray(city.as_bytes().to_vec())), 0, 1);
            }
        }
        let props = WriterProperties::default();
        let pages = table_to_pages(&table, column, &props).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_type(), PageType::DictionaryPage);
        assert_eq!(pages[0].num_values(), 2, "Two distinct cities");
        assert_eq!(pages[0].encoding(), Some(Encoding::Plain));
        assert_eq!(pages[1].encoding(), Some(Encoding::RleDictionary));

        let dictionary = pages[0].decode_dictionary(column, CompressionCodec::Uncompressed).unwrap();
        assert_eq!(dictionary[0], PhysicalValue::ByteArray(b"oslo".to_vec()));
        let decoded = pages[1]
            .decode(column, CompressionCodec::Uncompressed, Some(&dictionary))
            .unwrap();
        assert_eq!(decoded, table);

        assert!(
            pages[1].decode(column, CompressionCodec::Uncompressed, None).is_err(),
            "Dictionary pages cannot be decoded without their dictionary"
        );
    }

    #[test]
    fn test_read_page_truncated() {
        let schema = numbers_schema();
        let table = numbers(&schema, &[Some(1), Some(2)]);
        let pages = table_to_pages(&table, schema.column(0), &WriterProperties::default()).unwrap();
        let bytes = pages[0].to_bytes();

        let err = read_page(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(
            matches!(err, ColstripeError::Encoding(EncodingError::TruncatedBuffer { needed: 3, .. })),
            "Expected a truncated buffer, found: {:?}",
            err
        );
    }
}
