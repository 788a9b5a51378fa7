//! File enumeration under the language directory, and atomic writes.

use std::io::Write;
use std::path::{
    Path,
    PathBuf,
};

use ignore::WalkBuilder;
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum LangDirError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

/// What a walk collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    File,
}

/// Entries of `kind` below `path`, sorted. The root itself is left out.
fn walk(path: &Path, max_depth: Option<usize>, kind: EntryKind) -> Result<Vec<PathBuf>, LangDirError> {
    let mut found = Vec::new();

    // Translation trees are walked as they are on disk, ignore files included
    for result in WalkBuilder::new(path)
        .standard_filters(false)
        .hidden(true)
        .follow_links(false)
        .max_depth(max_depth)
        .build()
    {
        let entry =
            result.map_err(|source| LangDirError::Walk { path: path.to_path_buf(), source })?;
        if entry.depth() == 0 {
            continue;
        }

        let matches = entry.file_type().is_some_and(|ft| match kind {
            EntryKind::Directory => ft.is_dir(),
            EntryKind::File => ft.is_file(),
        });
        if matches {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

/// Immediate sub-directories of `path`, sorted.
pub fn directories(path: &Path) -> Result<Vec<PathBuf>, LangDirError> {
    walk(path, Some(1), EntryKind::Directory)
}

/// Immediate files of `path`, sorted.
pub fn files(path: &Path) -> Result<Vec<PathBuf>, LangDirError> {
    walk(path, Some(1), EntryKind::File)
}

/// Every file below `path`, recursively, sorted.
pub fn all_files(path: &Path) -> Result<Vec<PathBuf>, LangDirError> {
    walk(path, None, EntryKind::File)
}

/// Writes `contents` to `path` through a temporary file in the same
/// directory, creating missing parent directories.
///
/// A replaced file keeps its permissions. A new file gets the mode a plain
/// `create` would give it under the current umask.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), LangDirError> {
    let io_error = |source| LangDirError::Io { path: path.to_path_buf(), source };

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(io_error)?;

    let mut file = temp_file(parent, path).map_err(io_error)?;
    file.write_all(contents.as_bytes()).map_err(io_error)?;
    file.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}

/// Temporary sibling of `target` carrying the permissions `target` should end
/// up with.
fn temp_file(parent: &Path, target: &Path) -> std::io::Result<NamedTempFile> {
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    let builder = {
        use std::os::unix::fs::PermissionsExt;
        // Masked by the umask on open
        builder.permissions(std::fs::Permissions::from_mode(0o666))
    };
    let file = builder.tempfile_in(parent)?;

    if let Ok(metadata) = std::fs::metadata(target) {
        file.as_file().set_permissions(metadata.permissions())?;
    }
    Ok(file)
}
