//! Enumerations shared by the schema, encoding and layout modules.
//!
//! The integer discriminants are the identifiers used in page headers and the
//! file footer.

use std::fmt;

macro_rules! footer_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident = $value:expr => $label:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Identifier used in serialized metadata.
            pub fn as_i32(self) -> i32 {
                match self {
                    $($name::$variant => $value),+
                }
            }

            /// Parses a serialized identifier.
            pub fn from_i32(value: i32) -> Option<Self> {
                match value {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Upper-case name as it appears in parquet tooling.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.label())
            }
        }
    };
}

footer_enum!(
    /// Physical storage type of a leaf column.
    PhysicalType {
        Boolean = 0 => "BOOLEAN",
        Int32 = 1 => "INT32",
        Int64 = 2 => "INT64",
        Int96 = 3 => "INT96",
        Float = 4 => "FLOAT",
        Double = 5 => "DOUBLE",
        ByteArray = 6 => "BYTE_ARRAY",
        FixedLenByteArray = 7 => "FIXED_LEN_BYTE_ARRAY",
    }
);

footer_enum!(
    /// Repetition kind of a schema node.
    Repetition {
        Required = 0 => "REQUIRED",
        Optional = 1 => "OPTIONAL",
        Repeated = 2 => "REPEATED",
    }
);

footer_enum!(
    /// Logical annotation attached to a node.
    ConvertedType {
        Utf8 = 0 => "UTF8",
        Map = 1 => "MAP",
        MapKeyValue = 2 => "MAP_KEY_VALUE",
        List = 3 => "LIST",
        Enum = 4 => "ENUM",
        Decimal = 5 => "DECIMAL",
        Date = 6 => "DATE",
        TimeMillis = 7 => "TIME_MILLIS",
        TimeMicros = 8 => "TIME_MICROS",
        TimestampMillis = 9 => "TIMESTAMP_MILLIS",
        TimestampMicros = 10 => "TIMESTAMP_MICROS",
        Uint8 = 11 => "UINT_8",
        Uint16 = 12 => "UINT_16",
        Uint32 = 13 => "UINT_32",
        Uint64 = 14 => "UINT_64",
        Int8 = 15 => "INT_8",
        Int16 = 16 => "INT_16",
        Int32 = 17 => "INT_32",
        Int64 = 18 => "INT_64",
        Json = 19 => "JSON",
        Bson = 20 => "BSON",
        Interval = 21 => "INTERVAL",
    }
);

footer_enum!(
    /// Value and level encodings.
    Encoding {
        Plain = 0 => "PLAIN",
        PlainDictionary = 2 => "PLAIN_DICTIONARY",
        Rle = 3 => "RLE",
        BitPacked = 4 => "BIT_PACKED",
        DeltaBinaryPacked = 5 => "DELTA_BINARY_PACKED",
        DeltaLengthByteArray = 6 => "DELTA_LENGTH_BYTE_ARRAY",
        DeltaByteArray = 7 => "DELTA_BYTE_ARRAY",
        RleDictionary = 8 => "RLE_DICTIONARY",
        ByteStreamSplit = 9 => "BYTE_STREAM_SPLIT",
    }
);

footer_enum!(
    /// Compression codec identifiers.
    CompressionCodec {
        Uncompressed = 0 => "UNCOMPRESSED",
        Snappy = 1 => "SNAPPY",
        Gzip = 2 => "GZIP",
        Lzo = 3 => "LZO",
        Brotli = 4 => "BROTLI",
        Lz4 = 5 => "LZ4",
        Zstd = 6 => "ZSTD",
        Lz4Raw = 7 => "LZ4_RAW",
    }
);

footer_enum!(
    /// Kinds of pages found in a column chunk.
    PageType {
        DataPage = 0 => "DATA_PAGE",
        IndexPage = 1 => "INDEX_PAGE",
        DictionaryPage = 2 => "DICTIONARY_PAGE",
        DataPageV2 = 3 => "DATA_PAGE_V2",
    }
);

impl Encoding {
    /// Checks if values are dictionary indices.
    pub fn is_dictionary(self) -> bool {
        matches!(self, Encoding::PlainDictionary | Encoding::RleDictionary)
    }
}

impl ConvertedType {
    /// Checks if the annotation reinterprets the physical integer as unsigned.
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            ConvertedType::Uint8 | ConvertedType::Uint16 | ConvertedType::Uint32 | ConvertedType::Uint64
        )
    }

    /// Checks if a byte array holds text.
    pub fn is_string(self) -> bool {
        matches!(
            self,
            ConvertedType::Utf8 | ConvertedType::Enum | ConvertedType::Json
        )
    }
}

impl Default for CompressionCodec {
    fn default() -> Self {
        CompressionCodec::Uncompressed
    }
}
