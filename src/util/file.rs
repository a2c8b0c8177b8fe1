use std::fs;
use std::io;
use std::path::Path;

/// Recursive copy, `to` is created when missing.
pub fn copy_dir(from: &Path, to: &Path) -> io::Result<u64> {
    fs::create_dir_all(to)?;
    let mut copied = 0;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_dir(&entry.path(), &target)?;
        } else {
            copied += fs::copy(entry.path(), &target)?;
        }
    }
    Ok(copied)
}
