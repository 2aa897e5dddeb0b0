//! Container rewriting
//!
//! Every entry of a source container is copied into a destination container.
//! Text entries go through a transform `(name, content) -> (name, content)`;
//! binary entries are copied byte for byte and never reach the transform.

use crate::classify::DetectionConfig;
use crate::container::{Container, DirContainer, ZipContainer};
use crate::error::{Error, Result};
use std::path::Path;

/// Counts gathered during a rewrite pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Entries written to the destination
    pub entries: usize,
    /// Entries handed to the transform
    pub text: usize,
    /// Entries copied through as binary
    pub binary: usize,
    /// Entries written under a different name
    pub renamed: usize,
}

/// Drives a transform over every entry of a container
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    config: DetectionConfig,
}

impl Rewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom binary detection config
    pub fn with_config(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Rewrite `source` into `dest`.
    ///
    /// `dest` is closed on every exit path. When the transform fails the pass
    /// stops; entries written before the failure stay in `dest`.
    pub fn rewrite<S, D, F>(&self, source: &mut S, dest: &mut D, transform: F) -> Result<RewriteSummary>
    where
        S: Container + ?Sized,
        D: Container + ?Sized,
        F: FnMut(&str, &str) -> Result<(String, String)>,
    {
        let result = self.rewrite_entries(source, dest, transform);
        let closed = dest.close();
        let summary = result?;
        closed?;
        Ok(summary)
    }

    fn rewrite_entries<S, D, F>(&self, source: &mut S, dest: &mut D, mut transform: F) -> Result<RewriteSummary>
    where
        S: Container + ?Sized,
        D: Container + ?Sized,
        F: FnMut(&str, &str) -> Result<(String, String)>,
    {
        let mut summary = RewriteSummary::default();

        for name in source.entry_names()? {
            let entry = source.read_entry(&name)?;

            match entry.text(&self.config) {
                None => {
                    tracing::debug!(entry = %name, "copying binary entry");
                    dest.write_entry(&name, &entry.data)?;
                    summary.binary += 1;
                }
                Some(content) => {
                    let (new_name, new_content) = transform(&name, content)?;
                    if new_name.is_empty() {
                        return Err(Error::EmptyEntryName { original: name });
                    }
                    if new_name != name {
                        tracing::debug!(from = %name, to = %new_name, "renaming entry");
                        summary.renamed += 1;
                    }
                    dest.write_entry(&new_name, new_content.as_bytes())?;
                    summary.text += 1;
                }
            }
            summary.entries += 1;
        }

        Ok(summary)
    }
}

/// Rewrite a zip archive into a fresh archive, leaving the input untouched
pub fn rewrite_zip<F>(zip: &mut ZipContainer, transform: F) -> Result<ZipContainer>
where
    F: FnMut(&str, &str) -> Result<(String, String)>,
{
    let mut dest = ZipContainer::create();
    Rewriter::new().rewrite(zip, &mut dest, transform)?;
    Ok(dest)
}

/// Rewrite the directory tree at `src` into `dst`.
///
/// Fails with [`Error::SameDirectory`] when both paths resolve to the same
/// directory; trees are never rewritten in place.
pub fn rewrite_dir<F>(src: &Path, dst: &Path, transform: F) -> Result<RewriteSummary>
where
    F: FnMut(&str, &str) -> Result<(String, String)>,
{
    if same_directory(src, dst) {
        return Err(Error::SameDirectory(dst.to_path_buf()));
    }
    let mut source = DirContainer::open(src)?;
    let mut dest = DirContainer::create(dst)?;
    Rewriter::new().rewrite(&mut source, &mut dest, transform)
}

/// True when both paths exist and canonicalize to the same location
pub fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::tests::zip_with;

    fn identity(name: &str, content: &str) -> Result<(String, String)> {
        Ok((name.to_string(), content.to_string()))
    }

    #[test]
    fn test_zip_skips_binary() {
        let contents = b"\x9c%%%NAMESPACE%%%";
        let mut zip = zip_with(&[("test", contents)]);

        let mut out = rewrite_zip(&mut zip, |name, _| Ok((name.to_string(), String::new()))).unwrap();
        assert_eq!(out.read_entry("test").unwrap().data, contents);
    }

    #[test]
    fn test_zip_preserves_entry_count_and_order() {
        let mut zip = zip_with(&[("b", b"1"), ("a/c", b"2"), ("bin", b"\x9c\x00"), ("empty", b"")]);
        let mut out = rewrite_zip(&mut zip, identity).unwrap();
        assert_eq!(out.entry_names().unwrap(), vec!["b", "a/c", "bin", "empty"]);
        // input is still readable and unchanged
        assert_eq!(zip.read_entry("b").unwrap().data, b"1");
    }

    #[test]
    fn test_empty_content_is_written() {
        let mut zip = zip_with(&[("test", b"something")]);
        let mut out = rewrite_zip(&mut zip, |name, _| Ok((name.to_string(), String::new()))).unwrap();
        assert_eq!(out.read_entry("test").unwrap().data, b"");
    }

    #[test]
    fn test_summary_counts() {
        let mut zip = zip_with(&[("a", b"a"), ("b", b"\x9c"), ("c", b"c")]);
        let mut dest = ZipContainer::create();
        let summary = Rewriter::new()
            .rewrite(&mut zip, &mut dest, |name, content| {
                let name = if name == "a" { "renamed".to_string() } else { name.to_string() };
                Ok((name, content.to_uppercase()))
            })
            .unwrap();
        assert_eq!(
            summary,
            RewriteSummary { entries: 3, text: 2, binary: 1, renamed: 1 }
        );
        assert_eq!(dest.read_entry("renamed").unwrap().data, b"A");
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut zip = zip_with(&[("a", b"a")]);
        let err = rewrite_zip(&mut zip, |_, content| Ok((String::new(), content.to_string()))).unwrap_err();
        assert!(matches!(err, Error::EmptyEntryName { .. }));
    }

    #[test]
    fn test_failure_keeps_streamed_entries_and_closes_dest() {
        let mut zip = zip_with(&[("first", b"1"), ("second", b"2"), ("third", b"3")]);
        let mut dest = ZipContainer::create();
        let err = Rewriter::new()
            .rewrite(&mut zip, &mut dest, |name, content| {
                if name == "second" {
                    return Err(Error::Parse {
                        message: "bad".to_string(),
                        entry: name.to_string(),
                        line: 1,
                    });
                }
                Ok((name.to_string(), content.to_string()))
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "bad (second, line 1)");
        // closed, so readable, with the entry written before the failure
        assert_eq!(dest.entry_names().unwrap(), vec!["first"]);
    }

    #[test]
    fn test_dir_renamed_file() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("test1"), "test").unwrap();

        let summary = rewrite_dir(&src, &dst, |_, content| Ok(("test2".to_string(), content.to_string()))).unwrap();
        assert_eq!(summary.renamed, 1);
        assert_eq!(std::fs::read_to_string(dst.join("test2")).unwrap(), "test");
        assert!(src.join("test1").exists());
    }

    #[test]
    fn test_dir_skips_binary() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        let contents = b"\x9c%%%NAMESPACE%%%";
        std::fs::write(src.join("test"), contents).unwrap();

        rewrite_dir(&src, &dst, |name, _| Ok((name.to_string(), String::new()))).unwrap();
        assert_eq!(std::fs::read(dst.join("test")).unwrap(), contents);
    }

    #[test]
    fn test_dir_rejects_same_directory() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("test"), "foo").unwrap();

        let alias = temp.path().join("src/../src/");
        let err = rewrite_dir(&src, &alias, |name, _| Ok((name.to_string(), "bar".to_string()))).unwrap_err();
        assert!(matches!(err, Error::SameDirectory(_)));
        assert_eq!(std::fs::read_to_string(src.join("test")).unwrap(), "foo");
    }
}
