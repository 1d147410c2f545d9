//! Utility functions used in all other nii2nhdr modules.

use std::io::Read;
use std::path::Path;

use crate::error::Result;

/// Check whether the file extension ends with ".gz".
pub fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| a.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false)
}

/// Consume and discard the given number of bytes from the input. Used to step over
/// header fields that are not relevant here. Reading instead of seeking keeps this
/// usable on GZip streams, which cannot seek.
pub fn skip_bytes<S>(input: &mut S, n: usize) -> Result<()>
where
    S: Read,
{
    let mut buf = vec![0u8; n];
    input.read_exact(&mut buf)?;
    Ok(())
}
