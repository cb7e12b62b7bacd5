//! Copying with timestamp preservation.

use std::fs::{self, File, FileTimes};
use std::io;
use std::path::Path;

/// Copy `src` to `dest`, creating parent directories, carrying over the
/// source's permissions and access/modification times.
pub fn copy_preserving_times(src: &Path, dest: &Path) -> std::io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut reader = File::open(src)?;
    let metadata = reader.metadata()?;
    let mut writer = File::create(dest)?;
    let bytes = io::copy(&mut reader, &mut writer)?;

    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    writer.set_times(times)?;
    // Last, so a read-only source does not block the steps above.
    writer.set_permissions(metadata.permissions())?;

    Ok(bytes)
}
