use crate::error::{AppError, AppErrorKind};
use crate::prefix::Prefix;
use std::fs;

pub mod prefix_list;

/// Reads a prefix-list file, if a path is given.
///
/// # Errors
/// Returns a `FileError` naming the path when the file cannot be read.
pub fn read_prefix_file<S: AsRef<str>>(path: Option<S>) -> Result<Option<String>, AppError> {
    let data = path.map_or_else(
        || Ok::<Option<String>, AppError>(None),
        |p| {
            let data = fs::read_to_string(p.as_ref()).map_err(|e| {
                AppError::new(
                    AppErrorKind::FileError,
                    format!("{e}: {}", p.as_ref()).as_str(),
                )
            })?;
            Ok(Some(data))
        },
    )?;
    Ok(data)
}

/// Reads and parses a prefix-list file. A missing path yields an empty list.
pub fn load_prefixes<S: AsRef<str>>(
    path: Option<S>,
    delimiter: Option<&str>,
) -> Result<Vec<Prefix>, AppError> {
    read_prefix_file(path)?.map_or_else(
        || Ok(Vec::new()),
        |data| prefix_list::parse_prefix_list(&data, delimiter),
    )
}
