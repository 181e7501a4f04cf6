//! A library which stores nested records in the parquet columnar format.
//!
//! Records are shredded into one column per leaf field by encoding
//! definition and repetition levels for each value. The definition and
//! repetition levels preserve the structural hierarchy of the encoded nested
//! data structure, so the records can be reassembled in their original form
//! from the columns alone.
//!
//! Columns are then cut into pages, compressed and laid out as column chunks
//! and row groups, followed by a footer describing the schema and every
//! chunk.
//!
//! # Design
//! The technique for column shredding is described in the paper:
//! [Dremel: Interactive Analysis of Web-Scale Datasets](https://static.googleusercontent.com/media/research.google.com/en//pubs/archive/36632.pdf).
//!
//! # Example
//! ```no_run
//! use colstripe::schema::{long, optional_string, repeated_string};
//! use colstripe::source::LocalFile;
//! use colstripe::{FileReader, FileWriter, ReaderProperties, Schema, ValueBuilder, WriterProperties};
//!
//! # fn main() -> colstripe::error::Result<()> {
//! let schema = Schema::new("contact", vec![long("id"), optional_string("name"), repeated_string("tags")])
//!     .into_descriptor()?;
//! let record = ValueBuilder::default()
//!     .field("id", 1i64)
//!     .field("name", "a")
//!     .repeated("tags", vec!["x", "y"])
//!     .build();
//!
//! let mut writer = FileWriter::new(LocalFile::create("contacts.parquet")?, schema, WriterProperties::default())?;
//! writer.write(&[record])?;
//! writer.close()?;
//!
//! let reader = FileReader::open(LocalFile::open("contacts.parquet")?, ReaderProperties::new())?;
//! let records = reader.read()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_debug_implementations)]

pub mod assemble;
pub mod basic;
pub mod common;
pub mod compression;
pub mod convert;
pub mod descriptor;
pub mod encoding;
pub mod error;
pub mod field;
pub mod layout;
pub mod metadata;
pub mod node;
mod path_vector;
pub mod physical;
pub mod properties;
pub mod reader;
pub mod schema;
pub mod shred;
pub mod source;
pub mod table;
#[cfg(feature = "test-utils")]
pub mod test_utils;
pub mod thrift;
pub mod value;
pub mod writer;

pub use self::descriptor::{ColumnDescriptor, SchemaDescriptor};
pub use self::path_vector::ColumnPath;
pub use self::properties::{DataPageVersion, ReaderProperties, WriterProperties};
pub use self::reader::FileReader;
pub use self::schema::{Schema, SchemaBuilder};
pub use self::table::{Table, TableSet};
pub use self::value::{Value, ValueBuilder};
pub use self::writer::FileWriter;
