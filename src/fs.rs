//! File-system helpers shared by the sync and template engines.
use anyhow::{Context as _, Result};
use std::fs::{self, File, FileTimes};
use std::path::Path;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// Remove whatever lives at `path`: a file, a symlink (even a broken one)
/// or a whole directory tree. Does nothing if `path` does not exist.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_existing(path: &Path) -> Result<()> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(());
    };
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
    .with_context(|| format!("remove existing: {}", path.display()))
}

/// Copy the modification and access times of `source` onto `file`.
fn copy_times(source: &Path, file: &File) -> Result<()> {
    let meta = fs::metadata(source).with_context(|| format!("stat {}", source.display()))?;
    let mut times = FileTimes::new().set_modified(meta.modified()?);
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    file.set_times(times)
        .with_context(|| format!("set times from {}", source.display()))
}

/// Copy a single file, preserving permissions and timestamps.
fn copy_file_with_metadata(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target)
        .with_context(|| format!("copying {} to {}", source.display(), target.display()))?;
    let file = File::options()
        .write(true)
        .open(target)
        .with_context(|| format!("open {}", target.display()))?;
    copy_times(source, &file)
}

/// Copy `source` over `target` atomically.
///
/// The content is staged in a sibling temp file (same filesystem) with the
/// source's permissions and timestamps applied, then renamed into place, so
/// `target` is never observed half-written.
///
/// # Errors
///
/// Returns an error if staging, metadata copy or the final rename fails.
pub fn copy_file_atomic(source: &Path, target: &Path) -> Result<()> {
    ensure_parent_dir(target)?;
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let staged = tempfile::Builder::new()
        .prefix(".dotfiles-sync-")
        .tempfile_in(parent)
        .with_context(|| format!("create temp file in {}", parent.display()))?;

    fs::copy(source, staged.path())
        .with_context(|| format!("copy {} to {}", source.display(), staged.path().display()))?;
    copy_times(source, staged.as_file())?;

    staged
        .persist(target)
        .map_err(|e| e.error)
        .with_context(|| format!("rename into {}", target.display()))?;
    Ok(())
}

/// Recursively copy a directory tree, preserving file metadata.
///
/// Symlinks within the source tree are *followed*: the function uses
/// [`Path::is_dir`] (which follows symlinks) so directory symlinks are
/// recursed into and their contents materialised rather than copying the
/// link itself.
///
/// # Errors
///
/// Returns an error if the destination directory cannot be created, a source
/// entry cannot be read, or a file cannot be copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("creating directory {}", dst.display()))?;
    for entry in fs::read_dir(src).with_context(|| format!("reading directory {}", src.display()))? {
        let entry = entry.with_context(|| format!("reading entry in {}", src.display()))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            copy_file_with_metadata(&src_path, &dst_path)?;
        }
    }
    let perms = fs::metadata(src)
        .with_context(|| format!("stat {}", src.display()))?
        .permissions();
    fs::set_permissions(dst, perms).with_context(|| format!("chmod {}", dst.display()))?;
    Ok(())
}

/// Replace the directory at `target` with a copy of `source`.
///
/// The new tree is staged in a sibling temp directory first and renamed into
/// place once complete, so a failed copy leaves the old tree untouched.
///
/// # Errors
///
/// Returns an error if staging, removal of the old tree or the rename fails.
pub fn replace_dir(source: &Path, target: &Path) -> Result<()> {
    ensure_parent_dir(target)?;
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let staging = tempfile::Builder::new()
        .prefix(".dotfiles-sync-")
        .tempdir_in(parent)
        .with_context(|| format!("create temp dir in {}", parent.display()))?;
    let staged = staging.path().join("tree");

    copy_dir_recursive(source, &staged)
        .with_context(|| format!("recursive copy {} to {}", source.display(), staged.display()))?;
    remove_existing(target)?;
    fs::rename(&staged, target)
        .with_context(|| format!("rename {} to {}", staged.display(), target.display()))?;
    Ok(())
}

/// Copy `source` (file or directory) over `target`.
///
/// # Errors
///
/// Returns an error if the copy fails.
pub fn copy_into_place(source: &Path, target: &Path) -> Result<()> {
    if source.is_dir() {
        replace_dir(source, target)
    } else {
        if target.symlink_metadata().is_ok_and(|m| m.is_dir()) {
            remove_existing(target)?;
        }
        copy_file_atomic(source, target)
    }
}
