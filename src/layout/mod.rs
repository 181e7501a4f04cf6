//! Physical layout of column data: pages, column chunks and row groups.
//!
//! ```text
//! row group = chunk(column 0) chunk(column 1) ...
//! chunk     = [dictionary page] data page ...
//! page      = page header, levels and values
//! ```

pub mod chunk;
pub mod page;
pub mod row_group;
pub mod statistics;

pub use chunk::{pages_to_chunk, Chunk};
pub use page::{read_page, table_to_dict_pages, table_to_pages, Page};
pub use row_group::{read_row_group, RowGroup};
pub use statistics::ValueStatistics;
