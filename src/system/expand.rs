//! Input path expansion: resolves user-selected files and directories into
//! a flat, deduplicated list of regular files with archive-relative names.

use crate::models::{FileEntry, InputEntry};
use crate::utils::error::{EngineError, Result};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Classifies each path as file or directory. Read-only and idempotent.
pub fn inspect_paths(paths: &[PathBuf]) -> Vec<InputEntry> {
    paths
        .iter()
        .map(|path| InputEntry {
            path: path.clone(),
            is_dir: path.is_dir(),
        })
        .collect()
}

/// Expands the input list into regular files.
///
/// Plain files keep their base name; directory subtrees are rooted at the
/// directory's parent, so selecting `b` yields entries like `b/c.txt`.
/// Symbolic links are skipped with a warning. Fails with `NotFound` when a
/// top-level input vanished between selection and run start.
pub fn expand(entries: &[InputEntry]) -> Result<Vec<FileEntry>> {
    let mut files = Vec::new();

    for entry in entries {
        let meta = fs::symlink_metadata(&entry.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                EngineError::NotFound {
                    path: entry.path.clone(),
                }
            } else {
                EngineError::Io(e)
            }
        })?;

        if meta.file_type().is_symlink() {
            log::warn!("skipping symbolic link: {}", entry.path.display());
            continue;
        }

        if meta.is_dir() {
            expand_directory(&entry.path, &mut files)?;
        } else {
            let Some(name) = entry.path.file_name() else {
                return Err(EngineError::InvalidInput(format!(
                    "input has no file name: {}",
                    entry.path.display()
                )));
            };
            files.push(FileEntry {
                path: entry.path.clone(),
                archive_name: name.to_string_lossy().into_owned(),
                size: meta.len(),
            });
        }
    }

    Ok(dedup_last_seen(files))
}

fn expand_directory(dir: &Path, out: &mut Vec<FileEntry>) -> Result<()> {
    let parent = dir.parent().unwrap_or_else(|| Path::new(""));

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(walk_error)?;
        if entry.path_is_symlink() {
            log::warn!("skipping symbolic link: {}", entry.path().display());
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(parent).unwrap_or(entry.path());
        let size = entry.metadata().map_err(walk_error)?.len();
        out.push(FileEntry {
            path: entry.path().to_path_buf(),
            archive_name: archive_name(relative),
            size,
        });
    }
    Ok(())
}

/// Joins the normal components of a relative path with forward slashes,
/// regardless of platform.
fn archive_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(v) => Some(v.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Deduplicates by absolute path, keeping the last occurrence's position.
fn dedup_last_seen(files: Vec<FileEntry>) -> Vec<FileEntry> {
    let mut seen = HashSet::new();
    let mut out: Vec<FileEntry> = files
        .into_iter()
        .rev()
        .filter(|f| seen.insert(f.path.clone()))
        .collect();
    out.reverse();
    out
}

fn walk_error(error: walkdir::Error) -> EngineError {
    EngineError::Io(error.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn input(path: PathBuf) -> InputEntry {
        let is_dir = path.is_dir();
        InputEntry { path, is_dir }
    }

    #[test]
    fn test_expand_file_uses_base_name() {
        let temp = tempdir().expect("create tempdir");
        let file = temp.path().join("alpha.txt");
        fs::write(&file, b"alpha").expect("write file");

        let files = expand(&[input(file.clone())]).expect("expand");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].archive_name, "alpha.txt");
        assert_eq!(files[0].size, 5);
    }

    #[test]
    fn test_expand_directory_roots_names_at_parent() {
        let temp = tempdir().expect("create tempdir");
        let dir = temp.path().join("b");
        fs::create_dir_all(dir.join("sub")).expect("create dirs");
        fs::write(dir.join("c.txt"), b"world").expect("write c");
        fs::write(dir.join("sub").join("d.txt"), b"deep").expect("write d");

        let mut names: Vec<String> = expand(&[input(dir)])
            .expect("expand")
            .into_iter()
            .map(|f| f.archive_name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["b/c.txt", "b/sub/d.txt"]);
    }

    #[test]
    fn test_expand_deduplicates_keeping_last_seen_order() {
        let temp = tempdir().expect("create tempdir");
        let first = temp.path().join("first.txt");
        let second = temp.path().join("second.txt");
        fs::write(&first, b"1").expect("write first");
        fs::write(&second, b"2").expect("write second");

        let files = expand(&[
            input(first.clone()),
            input(second.clone()),
            input(first.clone()),
        ])
        .expect("expand");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, second);
        assert_eq!(files[1].path, first);
    }

    #[test]
    fn test_expand_missing_top_level_input_is_not_found() {
        let temp = tempdir().expect("create tempdir");
        let gone = temp.path().join("vanished.txt");
        let result = expand(&[input(gone.clone())]);
        assert!(matches!(result, Err(EngineError::NotFound { path }) if path == gone));
    }

    #[cfg(unix)]
    #[test]
    fn test_expand_skips_symlinks() {
        let temp = tempdir().expect("create tempdir");
        let target = temp.path().join("real.txt");
        fs::write(&target, b"real").expect("write target");
        let link = temp.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).expect("create symlink");

        let files = expand(&[input(link)]).expect("expand");
        assert!(files.is_empty());
    }

    #[test]
    fn test_inspect_paths_classifies_and_is_idempotent() {
        let temp = tempdir().expect("create tempdir");
        let file = temp.path().join("plain.txt");
        fs::write(&file, b"x").expect("write file");
        let paths = vec![file, temp.path().to_path_buf()];

        let first = inspect_paths(&paths);
        assert!(!first[0].is_dir);
        assert!(first[1].is_dir);
        assert_eq!(inspect_paths(&paths), first);
    }
}
