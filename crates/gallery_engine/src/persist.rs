use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Ensure `dir` exists and is a directory; create it if missing.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        if !fs::metadata(dir)?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is not a directory", dir.display()),
            ));
        }
        return Ok(());
    }
    fs::create_dir_all(dir)
}

/// Write `content` to `{dir}/{relative}` through a temp file in the same
/// directory followed by a rename, so readers see either the old or the new
/// file and never a partial one.
pub fn write_atomic(dir: &Path, relative: &str, content: &[u8]) -> io::Result<PathBuf> {
    let target = dir.join(relative);
    let parent = target.parent().unwrap_or(dir).to_path_buf();
    ensure_dir(&parent)?;

    let mut tmp = NamedTempFile::new_in(&parent)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;

    // `persist` renames over an existing target.
    tmp.persist(&target).map_err(|err| err.error)?;
    Ok(target)
}
