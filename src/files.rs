//! In-place find/replace and rename helpers for directory trees

use crate::classify;
use crate::error::{Error, Result};
use crate::logger::{log_info, Logger};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Text files under `dir` whose file name matches `pattern`
fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = glob::Pattern::new(pattern)?;
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && pattern.matches(&entry.file_name().to_string_lossy()) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Apply `edit` to every matching text file, writing back those that changed
fn edit_files<F>(dir: &Path, pattern: &str, logger: Option<&dyn Logger>, mut edit: F) -> Result<usize>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut changed = 0;
    for path in matching_files(dir, pattern)? {
        let data = std::fs::read(&path).map_err(|e| Error::io(&path, e))?;
        if classify::is_binary(&data) {
            continue;
        }
        let Ok(text) = std::str::from_utf8(&data) else {
            continue;
        };
        if let Some(updated) = edit(text) {
            log_info(logger, || format!("Updating {}", path.display()));
            std::fs::write(&path, updated).map_err(|e| Error::io(&path, e))?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// Replace `find` with `replace` in matching files.
///
/// `max` limits replacements per file. Returns the number of files changed.
pub fn find_replace(
    find: &str,
    replace: &str,
    dir: &Path,
    pattern: &str,
    logger: Option<&dyn Logger>,
    max: Option<usize>,
) -> Result<usize> {
    if find.is_empty() {
        return Ok(0);
    }
    edit_files(dir, pattern, logger, |text| {
        if !text.contains(find) {
            return None;
        }
        Some(match max {
            Some(count) => text.replacen(find, replace, count),
            None => text.replace(find, replace),
        })
    })
}

/// Replace matches of the regular expression `find` in matching files
pub fn find_replace_regex(
    find: &str,
    replace: &str,
    dir: &Path,
    pattern: &str,
    logger: Option<&dyn Logger>,
) -> Result<usize> {
    let regex = Regex::new(find)?;
    edit_files(dir, pattern, logger, |text| match regex.replace_all(text, replace) {
        std::borrow::Cow::Owned(updated) if updated != text => Some(updated),
        _ => None,
    })
}

/// Rename files under `dir` whose name contains `find`
pub fn find_rename(find: &str, replace: &str, dir: &Path, logger: Option<&dyn Logger>) -> Result<usize> {
    if find.is_empty() {
        return Ok(0);
    }
    let mut renamed = 0;
    for path in matching_files(dir, "*")? {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.contains(find) {
            continue;
        }
        let target = path.with_file_name(file_name.replace(find, replace));
        log_info(logger, || format!("Renaming {} to {}", path.display(), target.display()));
        std::fs::rename(&path, &target).map_err(|e| Error::io(&path, e))?;
        renamed += 1;
    }
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::testing::RecordingLogger;

    #[test]
    fn test_find_replace() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("test");
        std::fs::write(&path, "foo").unwrap();

        let logger = RecordingLogger::new();
        find_replace("foo", "bar", temp.path(), "*", Some(&logger), None).unwrap();

        assert_eq!(logger.count(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "bar");
    }

    #[test]
    fn test_find_replace_max() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("test");
        std::fs::write(&path, "aa").unwrap();

        let logger = RecordingLogger::new();
        find_replace("a", "b", temp.path(), "*", Some(&logger), Some(1)).unwrap();

        assert_eq!(logger.count(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ba");
    }

    #[test]
    fn test_find_replace_respects_pattern_and_binary() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("a.cls"), "foo").unwrap();
        std::fs::write(temp.path().join("b.txt"), "foo").unwrap();
        std::fs::write(temp.path().join("c.cls"), b"\x9cfoo").unwrap();

        let changed = find_replace("foo", "bar", temp.path(), "*.cls", None, None).unwrap();
        assert_eq!(changed, 1);
        assert_eq!(std::fs::read_to_string(temp.path().join("b.txt")).unwrap(), "foo");
        assert_eq!(std::fs::read(temp.path().join("c.cls")).unwrap(), b"\x9cfoo");
    }

    #[test]
    fn test_find_replace_regex() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("test");
        std::fs::write(&path, "aa").unwrap();

        let logger = RecordingLogger::new();
        find_replace_regex(r"\w", "x", temp.path(), "*", Some(&logger)).unwrap();

        assert_eq!(logger.count(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "xx");
    }

    #[test]
    fn test_find_replace_regex_invalid() {
        let temp = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_replace_regex("(", "x", temp.path(), "*", None),
            Err(Error::Regex(_))
        ));
    }

    #[test]
    fn test_find_rename() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("foo"), "aa").unwrap();

        let logger = RecordingLogger::new();
        find_rename("foo", "bar", temp.path(), Some(&logger)).unwrap();

        assert_eq!(logger.count(), 1);
        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["bar"]);
    }
}
