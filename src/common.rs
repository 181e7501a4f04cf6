//! Level aliases and small helpers shared by every module.

/// Definition level of a value in a column stream.
pub type DefinitionLevel = u16;

/// Repetition level of a value in a column stream.
pub type RepetitionLevel = u16;

/// Separator between path components in a dotted column path.
pub const PATH_DELIMITER: char = '.';

/// File magic written at both ends of a parquet file.
pub const MAGIC: &[u8; 4] = b"PAR1";

/// Number of bits needed to represent `max_value`. Zero needs zero bits.
pub fn bit_width(max_value: u64) -> u8 {
    (64 - max_value.leading_zeros()) as u8
}

/// Joins path components with [`PATH_DELIMITER`].
pub fn path_to_str<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(&PATH_DELIMITER.to_string())
}

/// Splits a dotted path into its components.
pub fn str_to_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return vec![];
    }
    path.split(PATH_DELIMITER).map(String::from).collect()
}

/// Derives the on-disk (internal) name for an application facing field name.
///
/// Every character which is not alphanumeric or `_` is replaced with `_`, so
/// the result never contains the path delimiter.
pub fn to_internal_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
