//! Archive extraction: locate the single raw-text table inside a DVF zip.

use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::error::{PipelineError, Result};

/// DVF archives carry their table as a `.txt` entry.
const TABLE_EXTENSION: &str = ".txt";

/// Find the table entry inside the archive, scanning in archive order.
///
/// Incidental extra files are tolerated: the first matching entry wins.
/// Returns [`PipelineError::MalformedArchive`] when nothing matches.
pub fn find_table_entry<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<usize> {
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.is_file() && entry.name().to_lowercase().ends_with(TABLE_EXTENSION) {
            return Ok(i);
        }
    }
    Err(PipelineError::MalformedArchive)
}
