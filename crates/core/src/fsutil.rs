//! Filesystem primitives shared by the engines.
//!
//! Everything here works on whole entries (a file or a directory tree) and
//! reports failures as [`StoreError::Io`] carrying the offending path.

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::errors::StoreError;

/// List the names of the entries directly inside `dir`, sorted.
pub fn list_entries(dir: &Path) -> Result<Vec<OsString>, StoreError> {
    let entries = fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        names.push(entry.file_name());
    }
    names.sort();
    Ok(names)
}

/// Copy a single entry from `src` to `dst`.
///
/// Files keep their permissions and modification time; directories are
/// copied recursively. Symlinks are recreated as links (never followed), so a
/// dangling link or a link to an ancestor directory copies like any other
/// entry. Sockets, FIFOs and device nodes are skipped.
pub fn copy_entry(src: &Path, dst: &Path) -> Result<(), StoreError> {
    let file_type = fs::symlink_metadata(src)
        .map_err(|e| StoreError::io(src, e))?
        .file_type();

    if file_type.is_symlink() {
        copy_symlink(src, dst)
    } else if file_type.is_dir() {
        copy_tree(src, dst)
    } else if file_type.is_file() {
        copy_file(src, dst)
    } else {
        warn!(path = %src.display(), "skipping entry that is neither file, directory nor symlink");
        Ok(())
    }
}

/// Recursively copy the directory `src` to `dst`, creating `dst`.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dst).map_err(|e| StoreError::io(dst, e))?;

    let entries = fs::read_dir(src).map_err(|e| StoreError::io(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(src, e))?;
        copy_entry(&entry.path(), &dst.join(entry.file_name()))?;
    }

    Ok(())
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), StoreError> {
    fs::copy(src, dst).map_err(|e| StoreError::io(src, e))?;

    // fs::copy carries permissions, so `dst` may already be read-only. Setting
    // times only needs ownership, which a read handle is enough for.
    let modified = fs::metadata(src)
        .and_then(|m| m.modified())
        .map_err(|e| StoreError::io(src, e))?;
    fs::File::open(dst)
        .and_then(|f| f.set_modified(modified))
        .map_err(|e| StoreError::io(dst, e))?;

    debug!(src = %src.display(), dst = %dst.display(), "copied file");
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<(), StoreError> {
    let target = fs::read_link(src).map_err(|e| StoreError::io(src, e))?;
    std::os::unix::fs::symlink(&target, dst).map_err(|e| StoreError::io(dst, e))?;
    debug!(src = %src.display(), target = %target.display(), "copied symlink");
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, _dst: &Path) -> Result<(), StoreError> {
    warn!(path = %src.display(), "skipping symlink, not supported on this platform");
    Ok(())
}

/// Remove a file or directory tree. A missing path is not an error.
pub fn remove_entry(path: &Path) -> Result<(), StoreError> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if meta.is_dir() {
        fs::remove_dir_all(path).map_err(|e| StoreError::io(path, e))?;
    } else {
        fs::remove_file(path).map_err(|e| StoreError::io(path, e))?;
    }
    debug!(path = %path.display(), "removed entry");
    Ok(())
}

/// Move an entry into place with a rename. `src` and `dst` must be on the
/// same filesystem; the staging area inside the control directory is.
pub fn move_entry(src: &Path, dst: &Path) -> Result<(), StoreError> {
    fs::rename(src, dst).map_err(|e| StoreError::io(dst, e))
}
