//! Page headers and the file footer.
//!
//! Plain structs mirroring the parquet thrift definitions, each with a
//! `write` into a [`CompactWriter`] and a `read` from a [`CompactReader`].
//! Fields this crate does not use are skipped on read.

use crate::basic::{CompressionCodec, ConvertedType, Encoding, PageType, PhysicalType, Repetition};
use crate::descriptor::SchemaDescriptor;
use crate::error::{ColstripeError, Result, SchemaError};
use crate::node::SchemaNode;
use crate::thrift::{CompactReader, CompactWriter, FieldType};
use tracing::warn;

fn missing(structure: &str, field: &str) -> ColstripeError {
    ColstripeError::InvalidFile(format!("{structure} is missing required field {field}"))
}

fn parse_enum<T>(value: i32, parse: fn(i32) -> Option<T>, what: &str) -> Result<T> {
    parse(value).ok_or_else(|| ColstripeError::InvalidFile(format!("unknown {what} identifier {value}")))
}

fn is_bool(t: FieldType) -> bool {
    matches!(t, FieldType::BoolTrue | FieldType::BoolFalse)
}

/// Column or page statistics. Values are the PLAIN encoding of a single
/// value, without the length prefix for byte arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub max: Option<Vec<u8>>,
    pub min: Option<Vec<u8>>,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
    pub max_value: Option<Vec<u8>>,
    pub min_value: Option<Vec<u8>>,
}

impl Statistics {
    pub fn write(&self, w: &mut CompactWriter) {
        w.struct_begin();
        if let Some(ref max) = self.max {
            w.field_binary(1, max);
        }
        if let Some(ref min) = self.min {
            w.field_binary(2, min);
        }
        if let Some(n) = self.null_count {
            w.field_i64(3, n);
        }
        if let Some(n) = self.distinct_count {
            w.field_i64(4, n);
        }
        if let Some(ref max) = self.max_value {
            w.field_binary(5, max);
        }
        if let Some(ref min) = self.min_value {
            w.field_binary(6, min);
        }
        w.struct_end();
    }

    pub fn read(r: &mut CompactReader<'_>) -> Result<Self> {
        let mut stats = Statistics::default();
        r.struct_begin();
        while let Some(h) = r.field_header()? {
            match (h.id, h.field_type) {
                (1, FieldType::Binary) => stats.max = Some(r.binary()?),
                (2, FieldType::Binary) => stats.min = Some(r.binary()?),
                (3, FieldType::I64) => stats.null_count = Some(r.i64()?),
                (4, FieldType::I64) => stats.distinct_count = Some(r.i64()?),
                (5, FieldType::Binary) => stats.max_value = Some(r.binary()?),
                (6, FieldType::Binary) => stats.min_value = Some(r.binary()?),
                _ => r.skip(h.field_type)?,
            }
        }
        r.struct_end();
        Ok(stats)
    }

    /// Minimum, preferring the newer field.
    pub fn min_bytes(&self) -> Option<&[u8]> {
        self.min_value.as_deref().or(self.min.as_deref())
    }

    /// Maximum, preferring the newer field.
    pub fn max_bytes(&self) -> Option<&[u8]> {
        self.max_value.as_deref().or(self.max.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPageHeader {
    /// Number of values including nulls.
    pub num_values: i32,
    pub encoding: Encoding,
    pub definition_level_encoding: Encoding,
    pub repetition_level_encoding: Encoding,
    pub statistics: Option<Statistics>,
}

impl DataPageHeader {
    pub fn write(&self, w: &mut CompactWriter) {
        w.struct_begin();
        w.field_i32(1, self.num_values);
        w.field_i32(2, self.encoding.as_i32());
        w.field_i32(3, self.definition_level_encoding.as_i32());
        w.field_i32(4, self.repetition_level_encoding.as_i32());
        if let Some(ref stats) = self.statistics {
            w.field_struct(5);
            stats.write(w);
        }
        w.struct_end();
    }

    pub fn read(r: &mut CompactReader<'_>) -> Result<Self> {
        let (mut num_values, mut encoding, mut def_encoding, mut rep_encoding, mut statistics) =
            (None, None, None, None, None);
        r.struct_begin();
        while let Some(h) = r.field_header()? {
            match (h.id, h.field_type) {
                (1, FieldType::I32) => num_values = Some(r.i32()?),
                (2, FieldType::I32) => encoding = Some(parse_enum(r.i32()?, Encoding::from_i32, "encoding")?),
                (3, FieldType::I32) => def_encoding = Some(parse_enum(r.i32()?, Encoding::from_i32, "encoding")?),
                (4, FieldType::I32) => rep_encoding = Some(parse_enum(r.i32()?, Encoding::from_i32, "encoding")?),
                (5, FieldType::Struct) => statistics = Some(Statistics::read(r)?),
                _ => r.skip(h.field_type)?,
            }
        }
        r.struct_end();
        Ok(Self {
            num_values: num_values.ok_or_else(|| missing("DataPageHeader", "num_values"))?,
            encoding: encoding.ok_or_else(|| missing("DataPageHeader", "encoding"))?,
            definition_level_encoding: def_encoding.ok_or_else(|| missing("DataPageHeader", "definition_level_encoding"))?,
            repetition_level_encoding: rep_encoding.ok_or_else(|| missing("DataPageHeader", "repetition_level_encoding"))?,
            statistics,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPageHeaderV2 {
    pub num_values: i32,
    pub num_nulls: i32,
    pub num_rows: i32,
    pub encoding: Encoding,
    pub definition_levels_byte_length: i32,
    pub repetition_levels_byte_length: i32,
    /// Whether the value section is compressed. Levels never are.
    pub is_compressed: bool,
    pub statistics: Option<Statistics>,
}

impl DataPageHeaderV2 {
    pub fn write(&self, w: &mut CompactWriter) {
        w.struct_begin();
        w.field_i32(1, self.num_values);
        w.field_i32(2, self.num_nulls);
        w.field_i32(3, self.num_rows);
        w.field_i32(4, self.encoding.as_i32());
        w.field_i32(5, self.definition_levels_byte_length);
        w.field_i32(6, self.repetition_levels_byte_length);
        w.field_bool(7, self.is_compressed);
        if let Some(ref stats) = self.statistics {
            w.field_struct(8);
            stats.write(w);
        }
        w.struct_end();
    }

    pub fn read(r: &mut CompactReader<'_>) -> Result<Self> {
        let mut num_values = None;
        let mut num_nulls = None;
        let mut num_rows = None;
        let mut encoding = None;
        let mut def_len = None;
        let mut rep_len = None;
        let mut is_compressed = true;
        let mut statistics = None;
        r.struct_begin();
        while let Some(h) = r.field_header()? {
            match (h.id, h.field_type) {
                (1, FieldType::I32) => num_values = Some(r.i32()?),
                (2, FieldType::I32) => num_nulls = Some(r.i32()?),
                (3, FieldType::I32) => num_rows = Some(r.i32()?),
                (4, FieldType::I32) => encoding = Some(parse_enum(r.i32()?, Encoding::from_i32, "encoding")?),
                (5, FieldType::I32) => def_len = Some(r.i32()?),
                (6, FieldType::I32) => rep_len = Some(r.i32()?),
                (7, t) if is_bool(t) => is_compressed = CompactReader::bool_of(h)?,
                (8, FieldType::Struct) => statistics = Some(Statistics::read(r)?),
                _ => r.skip(h.field_type)?,
            }
        }
        r.struct_end();
        let name = "DataPageHeaderV2";
        Ok(Self {
            num_values: num_values.ok_or_else(|| missing(name, "num_values"))?,
            num_nulls: num_nulls.ok_or_else(|| missing(name, "num_nulls"))?,
            num_rows: num_rows.ok_or_else(|| missing(name, "num_rows"))?,
            encoding: encoding.ok_or_else(|| missing(name, "encoding"))?,
            definition_levels_byte_length: def_len.ok_or_else(|| missing(name, "definition_levels_byte_length"))?,
            repetition_levels_byte_length: rep_len.ok_or_else(|| missing(name, "repetition_levels_byte_length"))?,
            is_compressed,
            statistics,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub is_sorted: Option<bool>,
}

impl DictionaryPageHeader {
    pub fn write(&self, w: &mut CompactWriter) {
        w.struct_begin();
        w.field_i32(1, self.num_values);
        w.field_i32(2, self.encoding.as_i32());
        if let Some(sorted) = self.is_sorted {
            w.field_bool(3, sorted);
        }
        w.struct_end();
    }

    pub fn read(r: &mut CompactReader<'_>) -> Result<Self> {
        let (mut num_values, mut encoding, mut is_sorted) = (None, None, None);
        r.struct_begin();
        while let Some(h) = r.field_header()? {
            match (h.id, h.field_type) {
                (1, FieldType::I32) => num_values = Some(r.i32()?),
                (2, FieldType::I32) => encoding = Some(parse_enum(r.i32()?, Encoding::from_i32, "encoding")?),
                (3, t) if is_bool(t) => is_sorted = Some(CompactReader::bool_of(h)?),
                _ => r.skip(h.field_type)?,
            }
        }
        r.struct_end();
        Ok(Self {
            num_values: num_values.ok_or_else(|| missing("DictionaryPageHeader", "num_values"))?,
            encoding: encoding.ok_or_else(|| missing("DictionaryPageHeader", "encoding"))?,
            is_sorted,
        })
    }
}

/// Header written in front of every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    pub data_page_header: Option<DataPageHeader>,
    pub dictionary_page_header: Option<DictionaryPageHeader>,
    pub data_page_header_v2: Option<DataPageHeaderV2>,
}

impl PageHeader {
    pub fn write(&self, w: &mut CompactWriter) {
        w.struct_begin();
        w.field_i32(1, self.page_type.as_i32());
        w.field_i32(2, self.uncompressed_page_size);
        w.field_i32(3, self.compressed_page_size);
        if let Some(ref h) = self.data_page_header {
            w.field_struct(5);
            h.write(w);
        }
        if let Some(ref h) = self.dictionary_page_header {
            w.field_struct(7);
            h.write(w);
        }
        if let Some(ref h) = self.data_page_header_v2 {
            w.field_struct(8);
            h.write(w);
        }
        w.struct_end();
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = CompactWriter::new();
        self.write(&mut w);
        w.into_inner()
    }

    /// Parses a header from the front of `data`, returning it with the
    /// number of bytes it occupied.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize)> {
        let mut r = CompactReader::new(data);
        let header = Self::read(&mut r)?;
        Ok((header, r.position()))
    }

    pub fn read(r: &mut CompactReader<'_>) -> Result<Self> {
        let mut page_type = None;
        let mut uncompressed = None;
        let mut compressed = None;
        let mut data_page_header = None;
        let mut dictionary_page_header = None;
        let mut data_page_header_v2 = None;
        r.struct_begin();
        while let Some(h) = r.field_header()? {
            match (h.id, h.field_type) {
                (1, FieldType::I32) => page_type = Some(parse_enum(r.i32()?, PageType::from_i32, "page type")?),
                (2, FieldType::I32) => uncompressed = Some(r.i32()?),
                (3, FieldType::I32) => compressed = Some(r.i32()?),
                (5, FieldType::Struct) => data_page_header = Some(DataPageHeader::read(r)?),
                (7, FieldType::Struct) => dictionary_page_header = Some(DictionaryPageHeader::read(r)?),
                (8, FieldType::Struct) => data_page_header_v2 = Some(DataPageHeaderV2::read(r)?),
                _ => r.skip(h.field_type)?,
            }
        }
        r.struct_end();

        let header = Self {
            page_type: page_type.ok_or_else(|| missing("PageHeader", "type"))?,
            uncompressed_page_size: uncompressed.ok_or_else(|| missing("PageHeader", "uncompressed_page_size"))?,
            compressed_page_size: compressed.ok_or_else(|| missing("PageHeader", "compressed_page_size"))?,
            data_page_header,
            dictionary_page_header,
            data_page_header_v2,
        };
        if header.uncompressed_page_size < 0 || header.compressed_page_size < 0 {
            return Err(ColstripeError::InvalidFile(format!(
                "negative page size in {header:?}"
            )));
        }
        Ok(header)
    }
}

/// One node of the flattened schema as written in the footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaElement {
    pub physical_type: Option<PhysicalType>,
    pub type_length: Option<i32>,
    pub repetition: Option<Repetition>,
    pub name: String,
    pub num_children: Option<i32>,
    pub converted_type: Option<ConvertedType>,
    pub scale: Option<i32>,
    pub precision: Option<i32>,
    pub field_id: Option<i32>,
}

impl SchemaElement {
    /// Flattens a node. The root carries no repetition.
    pub fn from_node(node: &SchemaNode, is_root: bool) -> Self {
        Self {
            physical_type: node.physical_type(),
            type_length: node.type_length(),
            repetition: if is_root { None } else { Some(node.repetition()) },
            name: node.name().to_string(),
            num_children: node.num_children().map(|n| n as i32),
            converted_type: node.converted_type(),
            scale: node.scale(),
            precision: node.precision(),
            field_id: node.field_id(),
        }
    }

    pub fn to_node(&self) -> Result<SchemaNode, SchemaError> {
        let num_children = match self.num_children {
            Some(n) if n < 0 => {
                return Err(SchemaError::InvalidNode {
                    name: self.name.clone(),
                    reason: format!("negative child count {n}"),
                })
            }
            Some(n) => Some(n as usize),
            None => None,
        };
        Ok(SchemaNode::from_raw(
            self.name.clone(),
            self.repetition.unwrap_or(Repetition::Required),
            self.physical_type,
            self.converted_type,
            self.type_length,
            self.precision,
            self.scale,
            num_children,
            self.field_id,
        ))
    }

    pub fn write(&self, w: &mut CompactWriter) {
        w.struct_begin();
        if let Some(t) = self.physical_type {
            w.field_i32(1, t.as_i32());
        }
        if let Some(len) = self.type_length {
            w.field_i32(2, len);
        }
        if let Some(rep) = self.repetition {
            w.field_i32(3, rep.as_i32());
        }
        w.field_binary(4, self.name.as_bytes());
        if let Some(n) = self.num_children {
            w.field_i32(5, n);
        }
        if let Some(c) = self.converted_type {
            w.field_i32(6, c.as_i32());
        }
        if let Some(s) = self.scale {
            w.field_i32(7, s);
        }
        if let Some(p) = self.precision {
            w.field_i32(8, p);
        }
        if let Some(id) = self.field_id {
            w.field_i32(9, id);
        }
        w.struct_end();
    }

    pub fn read(r: &mut CompactReader<'_>) -> Result<Self> {
        let mut element = SchemaElement {
            physical_type: None,
            type_length: None,
            repetition: None,
            name: String::new(),
            num_children: None,
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
        };
        let mut has_name = false;
        r.struct_begin();
        while let Some(h) = r.field_header()? {
            match (h.id, h.field_type) {
                (1, FieldType::I32) => {
                    element.physical_type = Some(parse_enum(r.i32()?, PhysicalType::from_i32, "physical type")?)
                }
                (2, FieldType::I32) => element.type_length = Some(r.i32()?),
                (3, FieldType::I32) => {
                    element.repetition = Some(parse_enum(r.i32()?, Repetition::from_i32, "repetition")?)
                }
                (4, FieldType::Binary) => {
                    element.name = r.string()?;
                    has_name = true;
                }
                (5, FieldType::I32) => element.num_children = Some(r.i32()?),
                (6, FieldType::I32) => {
                    let id = r.i32()?;
                    element.converted_type = ConvertedType::from_i32(id);
                    if element.converted_type.is_none() {
                        warn!(converted_type = id, "Ignoring unknown converted type");
                    }
                }
                (7, FieldType::I32) => element.scale = Some(r.i32()?),
                (8, FieldType::I32) => element.precision = Some(r.i32()?),
                (9, FieldType::I32) => element.field_id = Some(r.i32()?),
                _ => r.skip(h.field_type)?,
            }
        }
        r.struct_end();
        if !has_name {
            return Err(missing("SchemaElement", "name"));
        }
        Ok(element)
    }
}

/// Flattens a catalog into footer schema elements.
pub fn to_schema_elements(schema: &SchemaDescriptor) -> Vec<SchemaElement> {
    schema
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, node)| SchemaElement::from_node(node, i == 0))
        .collect()
}

impl SchemaDescriptor {
    /// Rebuilds a catalog from the schema elements of a footer.
    pub fn from_schema_elements(elements: &[SchemaElement]) -> Result<Self, SchemaError> {
        let nodes = elements
            .iter()
            .map(SchemaElement::to_node)
            .collect::<Result<Vec<_>, _>>()?;
        SchemaDescriptor::from_nodes(nodes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn write(&self, w: &mut CompactWriter) {
        w.struct_begin();
        w.field_binary(1, self.key.as_bytes());
        if let Some(ref v) = self.value {
            w.field_binary(2, v.as_bytes());
        }
        w.struct_end();
    }

    pub fn read(r: &mut CompactReader<'_>) -> Result<Self> {
        let (mut key, mut value) = (None, None);
        r.struct_begin();
        while let Some(h) = r.field_header()? {
            match (h.id, h.field_type) {
                (1, FieldType::Binary) => key = Some(r.string()?),
                (2, FieldType::Binary) => value = Some(r.string()?),
                _ => r.skip(h.field_type)?,
            }
        }
        r.struct_end();
        Ok(Self {
            key: key.ok_or_else(|| missing("KeyValue", "key"))?,
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetaData {
    pub physical_type: PhysicalType,
    pub encodings: Vec<Encoding>,
    pub path_in_schema: Vec<String>,
    pub codec: CompressionCodec,
    pub num_values: i64,
    pub total_uncompressed_size: i64,
    pub total_compressed_size: i64,
    pub data_page_offset: i64,
    pub dictionary_page_offset: Option<i64>,
    pub statistics: Option<Statistics>,
}

impl ColumnMetaData {
    /// Offset of the first page of the chunk.
    pub fn start_offset(&self) -> i64 {
        match self.dictionary_page_offset {
            Some(offset) if offset < self.data_page_offset => offset,
            _ => self.data_page_offset,
        }
    }

    pub fn write(&self, w: &mut CompactWriter) {
        w.struct_begin();
        w.field_i32(1, self.physical_type.as_i32());
        w.field_list_begin(2, FieldType::I32, self.encodings.len());
        for e in &self.encodings {
            w.i32(e.as_i32());
        }
        w.field_list_begin(3, FieldType::Binary, self.path_in_schema.len());
        for part in &self.path_in_schema {
            w.binary(part.as_bytes());
        }
        w.field_i32(4, self.codec.as_i32());
        w.field_i64(5, self.num_values);
        w.field_i64(6, self.total_uncompressed_size);
        w.field_i64(7, self.total_compressed_size);
        w.field_i64(9, self.data_page_offset);
        if let Some(offset) = self.dictionary_page_offset {
            w.field_i64(11, offset);
        }
        if let Some(ref stats) = self.statistics {
            w.field_struct(12);
            stats.write(w);
        }
        w.struct_end();
    }

    pub fn read(r: &mut CompactReader<'_>) -> Result<Self> {
        let mut physical_type = None;
        let mut encodings = vec![];
        let mut path_in_schema = vec![];
        let mut codec = None;
        let mut num_values = None;
        let mut total_uncompressed_size = None;
        let mut total_compressed_size = None;
        let mut data_page_offset = None;
        let mut dictionary_page_offset = None;
        let mut statistics = None;
        r.struct_begin();
        while let Some(h) = r.field_header()? {
            match (h.id, h.field_type) {
                (1, FieldType::I32) => {
                    physical_type = Some(parse_enum(r.i32()?, PhysicalType::from_i32, "physical type")?)
                }
                (2, FieldType::List) => {
                    let (_, len) = r.list_begin()?;
                    for _ in 0..len {
                        let id = r.i32()?;
                        match Encoding::from_i32(id) {
                            Some(e) => encodings.push(e),
                            None => warn!(encoding = id, "Ignoring unknown encoding in column metadata"),
                        }
                    }
                }
                (3, FieldType::List) => {
                    let (_, len) = r.list_begin()?;
                    for _ in 0..len {
                        path_in_schema.push(r.string()?);
                    }
                }
                (4, FieldType::I32) => codec = Some(parse_enum(r.i32()?, CompressionCodec::from_i32, "codec")?),
                (5, FieldType::I64) => num_values = Some(r.i64()?),
                (6, FieldType::I64) => total_uncompressed_size = Some(r.i64()?),
                (7, FieldType::I64) => total_compressed_size = Some(r.i64()?),
                (9, FieldType::I64) => data_page_offset = Some(r.i64()?),
                (11, FieldType::I64) => dictionary_page_offset = Some(r.i64()?),
                (12, FieldType::Struct) => statistics = Some(Statistics::read(r)?),
                _ => r.skip(h.field_type)?,
            }
        }
        r.struct_end();
        let name = "ColumnMetaData";
        Ok(Self {
            physical_type: physical_type.ok_or_else(|| missing(name, "type"))?,
            encodings,
            path_in_schema,
            codec: codec.ok_or_else(|| missing(name, "codec"))?,
            num_values: num_values.ok_or_else(|| missing(name, "num_values"))?,
            total_uncompressed_size: total_uncompressed_size.ok_or_else(|| missing(name, "total_uncompressed_size"))?,
            total_compressed_size: total_compressed_size.ok_or_else(|| missing(name, "total_compressed_size"))?,
            data_page_offset: data_page_offset.ok_or_else(|| missing(name, "data_page_offset"))?,
            dictionary_page_offset,
            statistics,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChunkMeta {
    pub file_offset: i64,
    pub meta_data: ColumnMetaData,
}

impl ColumnChunkMeta {
    pub fn write(&self, w: &mut CompactWriter) {
        w.struct_begin();
        w.field_i64(2, self.file_offset);
        w.field_struct(3);
        self.meta_data.write(w);
        w.struct_end();
    }

    pub fn read(r: &mut CompactReader<'_>) -> Result<Self> {
        let (mut file_offset, mut meta_data) = (None, None);
        r.struct_begin();
        while let Some(h) = r.field_header()? {
            match (h.id, h.field_type) {
                (1, FieldType::Binary) => {
                    let path = r.string()?;
                    warn!(path = %path, "Column chunk refers to an external file, reading it from this file");
                }
                (2, FieldType::I64) => file_offset = Some(r.i64()?),
                (3, FieldType::Struct) => meta_data = Some(ColumnMetaData::read(r)?),
                _ => r.skip(h.field_type)?,
            }
        }
        r.struct_end();
        Ok(Self {
            file_offset: file_offset.ok_or_else(|| missing("ColumnChunk", "file_offset"))?,
            meta_data: meta_data.ok_or_else(|| missing("ColumnChunk", "meta_data"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroupMeta {
    pub columns: Vec<ColumnChunkMeta>,
    pub total_byte_size: i64,
    pub num_rows: i64,
}

impl RowGroupMeta {
    pub fn write(&self, w: &mut CompactWriter) {
        w.struct_begin();
        w.field_list_begin(1, FieldType::Struct, self.columns.len());
        for column in &self.columns {
            column.write(w);
        }
        w.field_i64(2, self.total_byte_size);
        w.field_i64(3, self.num_rows);
        w.struct_end();
    }

    pub fn read(r: &mut CompactReader<'_>) -> Result<Self> {
        let (mut columns, mut total_byte_size, mut num_rows) = (None, None, None);
        r.struct_begin();
        while let Some(h) = r.field_header()? {
            match (h.id, h.field_type) {
                (1, FieldType::List) => {
                    let (_, len) = r.list_begin()?;
                    let mut chunks = Vec::with_capacity(len);
                    for _ in 0..len {
                        chunks.push(ColumnChunkMeta::read(r)?);
                    }
                    columns = Some(chunks);
                }
                (2, FieldType::I64) => total_byte_size = Some(r.i64()?),
                (3, FieldType::I64) => num_rows = Some(r.i64()?),
                _ => r.skip(h.field_type)?,
            }
        }
        r.struct_end();
        Ok(Self {
            columns: columns.ok_or_else(|| missing("RowGroup", "columns"))?,
            total_byte_size: total_byte_size.ok_or_else(|| missing("RowGroup", "total_byte_size"))?,
            num_rows: num_rows.ok_or_else(|| missing("RowGroup", "num_rows"))?,
        })
    }
}

/// The file footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetaData {
    pub version: i32,
    pub schema: Vec<SchemaElement>,
    pub num_rows: i64,
    pub row_groups: Vec<RowGroupMeta>,
    pub key_value_metadata: Option<Vec<KeyValue>>,
    pub created_by: Option<String>,
}

impl FileMetaData {
    pub fn write(&self, w: &mut CompactWriter) {
        w.struct_begin();
        w.field_i32(1, self.version);
        w.field_list_begin(2, FieldType::Struct, self.schema.len());
        for element in &self.schema {
            element.write(w);
        }
        w.field_i64(3, self.num_rows);
        w.field_list_begin(4, FieldType::Struct, self.row_groups.len());
        for row_group in &self.row_groups {
            row_group.write(w);
        }
        if let Some(ref kv) = self.key_value_metadata {
            w.field_list_begin(5, FieldType::Struct, kv.len());
            for entry in kv {
                entry.write(w);
            }
        }
        if let Some(ref created_by) = self.created_by {
            w.field_binary(6, created_by.as_bytes());
        }
        w.struct_end();
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = CompactWriter::new();
        self.write(&mut w);
        w.into_inner()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read(&mut CompactReader::new(data))
    }

    pub fn read(r: &mut CompactReader<'_>) -> Result<Self> {
        let mut version = None;
        let mut schema = None;
        let mut num_rows = None;
        let mut row_groups = None;
        let mut key_value_metadata = None;
        let mut created_by = None;
        r.struct_begin();
        while let Some(h) = r.field_header()? {
            match (h.id, h.field_type) {
                (1, FieldType::I32) => version = Some(r.i32()?),
                (2, FieldType::List) => {
                    let (_, len) = r.list_begin()?;
                    let mut elements = Vec::with_capacity(len);
                    for _ in 0..len {
                        elements.push(SchemaElement::read(r)?);
                    }
                    schema = Some(elements);
                }
                (3, FieldType::I64) => num_rows = Some(r.i64()?),
                (4, FieldType::List) => {
                    let (_, len) = r.list_begin()?;
                    let mut groups = Vec::with_capacity(len);
                    for _ in 0..len {
                        groups.push(RowGroupMeta::read(r)?);
                    }
                    row_groups = Some(groups);
                }
                (5, FieldType::List) => {
                    let (_, len) = r.list_begin()?;
                    let mut entries = Vec::with_capacity(len);
                    for _ in 0..len {
                        entries.push(KeyValue::read(r)?);
                    }
                    key_value_metadata = Some(entries);
                }
                (6, FieldType::Binary) => created_by = Some(r.string()?),
                _ => r.skip(h.field_type)?,
            }
        }
        r.struct_end();
        Ok(Self {
            version: version.ok_or_else(|| missing("FileMetaData", "version"))?,
            schema: schema.ok_or_else(|| missing("FileMetaData", "schema"))?,
            num_rows: num_rows.ok_or_else(|| missing("FileMetaData", "num_rows"))?,
            row_groups: row_groups.ok_or_else(|| missing("FileMetaData", "row_groups"))?,
            key_value_metadata,
            created_by,
        })
    }
}
