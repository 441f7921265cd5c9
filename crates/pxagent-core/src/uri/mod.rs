//! Remote file naming: filename and fileroot derivation from file URIs.
//!
//! A raw file such as `ftp://host/pride/2020/01/PXD000001/run_01.raw` is
//! tracked under its fileroot `run_01`, which also keys the derived
//! `run_01.mzML` and `run_01.mzML.gz` files.

mod path;

pub use path::{filename_from_url_path, join_url};

/// Filename split into the stem used to correlate derived files and the
/// (possibly empty) extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteName {
    pub filename: String,
    pub fileroot: String,
    pub extension: String,
}

/// Splits `filename` at its last dot. Returns `None` when there is no dot or
/// the stem would be empty (e.g. `.raw`).
pub fn split_fileroot(filename: &str) -> Option<(String, String)> {
    let (root, ext) = filename.rsplit_once('.')?;
    if root.is_empty() {
        return None;
    }
    Some((root.to_string(), ext.to_string()))
}

/// True if `name` can be used as a plain file name inside a dataset
/// directory (no separators, not `.` or `..`, no control chars).
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.chars().any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control())
}

/// Error from [`remote_name`]: which step of the derivation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// No usable filename in the URI path.
    NoFilename,
    /// Filename has no stem/extension split.
    NoFileroot,
}

/// Derives filename, fileroot and extension from a file URI.
pub fn remote_name(uri: &str) -> Result<RemoteName, NameError> {
    let filename = filename_from_url_path(uri)
        .filter(|f| is_safe_filename(f))
        .ok_or(NameError::NoFilename)?;
    let (fileroot, extension) = split_fileroot(&filename).ok_or(NameError::NoFileroot)?;
    Ok(RemoteName {
        filename,
        fileroot,
        extension,
    })
}

/// Case-insensitive extension check (`ext` without the dot).
pub fn has_extension(filename: &str, ext: &str) -> bool {
    split_fileroot(filename)
        .map(|(_, e)| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}
