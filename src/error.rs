//! Error types for tree operations.

/// Failure of a path resolution or a tree mutation.
///
/// Every variant carries the path (or name) that caused it, so assertions
/// and diagnostics can point at exactly what was looked for.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    /// Resolution walked off the tree; holds the absolute path that was sought.
    #[error("{0} does not exist")]
    NodeNotFound(String),
    #[error("{0} already exists")]
    NodeExists(String),
    /// The name contains a path separator.
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    /// The path cannot be split into a parent and a name.
    #[error("invalid path: {0:?}")]
    InvalidPath(String),
    #[error("{0} is not a directory")]
    NotADirectory(String),
    #[error("{0} is a directory")]
    NotAFile(String),
    #[error("the root cannot be removed")]
    RootNotRemovable,
}

pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            FsError::NodeNotFound("/notadir".into()).to_string(),
            "/notadir does not exist"
        );
        assert_eq!(
            FsError::NotADirectory("/home/README.md".into()).to_string(),
            "/home/README.md is not a directory"
        );
        assert_eq!(
            FsError::InvalidName("a/b".into()).to_string(),
            "invalid name: \"a/b\""
        );
        assert_eq!(
            FsError::RootNotRemovable.to_string(),
            "the root cannot be removed"
        );
    }
}
