//! Error types

use std::path::PathBuf;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while rewriting containers
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed XML where a well-formed document was expected
    #[error("{message} ({entry}, line {line})")]
    Parse {
        message: String,
        /// Name of the entry (or file) that failed to parse
        entry: String,
        /// 1-based line of the failure
        line: usize,
    },

    /// A transform returned an empty entry name
    #[error("transform produced an empty name for entry '{original}'")]
    EmptyEntryName { original: String },

    /// Operation not valid for the container's current state
    #[error("{0}")]
    ContainerState(&'static str),

    /// Entry name that is absolute or escapes the container root
    #[error("unsafe entry name: '{0}'")]
    UnsafeEntryName(String),

    /// Source and destination resolve to the same directory
    #[error("destination is the source directory: {}", .0.display())]
    SameDirectory(PathBuf),

    /// Entry requested from a container that does not have it
    #[error("entry not found: {0}")]
    MissingEntry(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a parse error, computing the line number from a byte offset
    pub(crate) fn parse_at(message: impl Into<String>, entry: &str, text: &str, offset: usize) -> Self {
        let end = offset.min(text.len());
        let line = text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1;
        Error::Parse {
            message: message.into(),
            entry: entry.to_string(),
            line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = Error::Parse {
            message: "it broke".to_string(),
            entry: "test.xml".to_string(),
            line: 1,
        };
        assert_eq!(err.to_string(), "it broke (test.xml, line 1)");
    }

    #[test]
    fn test_parse_at_counts_lines() {
        let text = "<a>\n<b>\n</a>";
        let err = Error::parse_at("mismatched tag", "x-meta.xml", text, 9);
        match err {
            Error::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_at_clamps_offset() {
        let err = Error::parse_at("eof", "a.xml", "<a>", 100);
        assert_eq!(err.to_string(), "eof (a.xml, line 1)");
    }
}
