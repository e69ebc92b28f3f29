//! In-memory ZIP of an export directory.

use std::fs::File;
use std::io::{self, Cursor, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ExportError;

/// Zip every file under `dir`, recursively.
///
/// Entry names are relative to `dir` and always use `/`. Files are added in sorted
/// order so the same tree yields the same archive layout. The returned cursor is
/// rewound to the start.
pub fn create_zip_archive(dir: &Path) -> Result<Cursor<Vec<u8>>, ExportError> {
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entries = 0usize;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ExportError::Io(io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| ExportError::Io(io::Error::other(e)))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        debug!(entry = %name, "Adding file to archive");
        zip.start_file(name, options)?;
        io::copy(&mut File::open(entry.path())?, &mut zip)?;
        entries += 1;
    }

    let mut cursor = zip.finish()?;
    cursor.seek(SeekFrom::Start(0))?;
    info!(
        dir = %dir.display(),
        entries,
        bytes = cursor.get_ref().len(),
        "Created ZIP archive"
    );
    Ok(cursor)
}
