use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FsResult;
use crate::vfs::EntryType;

/// The capability set shared by every filesystem provider.
///
/// Paths are `/`-separated strings, absolute when they start with `/` and
/// relative to the provider's current directory otherwise.
pub trait FileManager {
    /// Returns true, if `path` exists.
    fn file_exists<P: AsRef<str>>(&self, path: P) -> bool {
        self.entry_type(path).is_some()
    }

    /// Returns the type of the entry at `path`, or `None` if nothing is there.
    fn entry_type<P: AsRef<str>>(&self, path: P) -> Option<EntryType>;

    /// Copies `src` to `dst`, where `dst` is the full destination path (parent + new name).
    fn copy_item<P: AsRef<str>, Q: AsRef<str>>(&mut self, src: P, dst: Q) -> FsResult<()>;

    /// Moves `src` to `dst`. Not atomic: a copy followed by a removal.
    fn move_item<P: AsRef<str>, Q: AsRef<str>>(&mut self, src: P, dst: Q) -> FsResult<()>;

    fn remove_item<P: AsRef<str>>(&mut self, path: P) -> FsResult<()>;

    fn create_directory<P: AsRef<str>>(
        &mut self,
        path: P,
        with_intermediates: bool,
        attributes: &FileAttributes,
    ) -> FsResult<()>;

    /// Best-effort file creation: any failure is reported as `false`.
    fn create_file<P: AsRef<str>>(
        &mut self,
        path: P,
        content: Option<&[u8]>,
        attributes: &FileAttributes,
    ) -> bool;

    /// Names of the immediate children of the directory at `path`, in no particular order.
    fn contents_of_directory<P: AsRef<str>>(&self, path: P) -> FsResult<Vec<String>>;

    /// File content at `path`; `None` both for a missing path and for a directory.
    fn contents<P: AsRef<str>>(&self, path: P) -> Option<Vec<u8>>;
}

/// Opaque creation attributes.
///
/// Accepted by `create_directory`/`create_file` so call sites written against a real
/// provider keep compiling; the in-memory tree never interprets them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileAttributes(BTreeMap<String, serde_json::Value>);

impl FileAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<K: Into<String>, V: Into<serde_json::Value>>(mut self, key: K, value: V) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub type Result<T> = std::result::Result<T, anyhow::Error>;

pub mod utils {
    pub const SEPARATOR: char = '/';

    /// Non-empty segments of `path`; repeated and trailing separators are dropped.
    pub fn segments(path: &str) -> impl Iterator<Item = &str> {
        path.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    pub fn is_absolute(path: &str) -> bool {
        path.starts_with(SEPARATOR)
    }

    /// Splits `path` into a parent path and the final name.
    /// Returns `None` when `path` has fewer than two segments.
    pub fn split_parent(path: &str) -> Option<(String, &str)> {
        let segs: Vec<&str> = segments(path).collect();
        let (name, parent) = segs.split_last()?;
        if parent.is_empty() {
            return None;
        }
        let mut parent_path = parent.join("/");
        if is_absolute(path) {
            parent_path.insert(0, SEPARATOR);
        }
        Some((parent_path, name))
    }

    /// Appends `name` to `parent` with exactly one separator between them.
    pub fn join(parent: &str, name: &str) -> String {
        if parent.is_empty() {
            return name.to_string();
        }
        if parent.ends_with(SEPARATOR) {
            format!("{parent}{name}")
        } else {
            format!("{parent}{SEPARATOR}{name}")
        }
    }

    /// A name must be non-empty, must not contain a separator and must not be one of the
    /// navigation segments `.` and `..`, which no path could reach.
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty() && name != "." && name != ".." && !name.contains(SEPARATOR)
    }

    /// Last segment of `path`; `/` for the root and an empty string for an empty path.
    pub fn basename(path: &str) -> &str {
        match segments(path).last() {
            Some(last) => last,
            None if is_absolute(path) => "/",
            None => "",
        }
    }

    /// Everything before the last segment, POSIX style.
    pub fn dirname(path: &str) -> String {
        match split_parent(path) {
            Some((parent, _)) => parent,
            None if is_absolute(path) => "/".to_string(),
            None => ".".to_string(),
        }
    }

    /// Basename without its extension.
    pub fn filename(path: &str) -> &str {
        let base = basename(path);
        match extension(path) {
            Some(ext) => &base[..base.len() - ext.len() - 1],
            None => base,
        }
    }

    /// Extension of the basename. Dotfiles such as `.bashrc` have none.
    pub fn extension(path: &str) -> Option<&str> {
        let base = basename(path);
        let pos = base.rfind('.')?;
        if pos == 0 || pos + 1 == base.len() {
            return None;
        }
        Some(&base[pos + 1..])
    }

    /// Replaces a leading `~` (alone or followed by `/`) with `home`.
    pub fn expand_tilde(path: &str, home: &str) -> String {
        let home = home.trim_end_matches(SEPARATOR);
        if path == "~" {
            return if home.is_empty() { "/".to_string() } else { home.to_string() };
        }
        match path.strip_prefix("~/") {
            Some(rest) => format!("{home}/{rest}"),
            None => path.to_string(),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use rstest::rstest;

        #[rstest]
        #[case("/", vec![])]
        #[case("", vec![])]
        #[case("//a///b/", vec!["a", "b"])]
        #[case("a/../b", vec!["a", "..", "b"])]
        fn test_segments(#[case] path: &str, #[case] expected: Vec<&str>) {
            assert_eq!(segments(path).collect::<Vec<_>>(), expected);
        }

        #[rstest]
        #[case("/home/user", Some(("/home", "user")))]
        #[case("/a/b/c/", Some(("/a/b", "c")))]
        #[case("home/user", Some(("home", "user")))]
        #[case("/home", None)]
        #[case("home", None)]
        #[case("/", None)]
        fn test_split_parent(#[case] path: &str, #[case] expected: Option<(&str, &str)>) {
            let split = split_parent(path);
            assert_eq!(
                split.as_ref().map(|(p, n)| (p.as_str(), *n)),
                expected
            );
        }

        #[test]
        fn test_join() {
            assert_eq!(join("/", "bin"), "/bin");
            assert_eq!(join("/bin", "hello.sh"), "/bin/hello.sh");
            assert_eq!(join("", "bin"), "bin");
        }

        #[test]
        fn test_is_valid_name() {
            assert!(is_valid_name("README.md"));
            assert!(is_valid_name(".bashrc"));
            assert!(is_valid_name("..."));
            assert!(!is_valid_name("a/b"));
            assert!(!is_valid_name("/"));
            assert!(!is_valid_name(""));
            assert!(!is_valid_name("."));
            assert!(!is_valid_name(".."));
        }

        #[rstest]
        #[case("/home/dev/index.js", "index.js", "/home/dev", "index", Some("js"))]
        #[case("/archive.tar.gz", "archive.tar.gz", "/", "archive.tar", Some("gz"))]
        #[case("notes", "notes", ".", "notes", None)]
        #[case("/home/.bashrc", ".bashrc", "/home", ".bashrc", None)]
        #[case("/", "/", "/", "/", None)]
        fn test_name_helpers(
            #[case] path: &str,
            #[case] base: &str,
            #[case] dir: &str,
            #[case] stem: &str,
            #[case] ext: Option<&str>,
        ) {
            assert_eq!(basename(path), base);
            assert_eq!(dirname(path), dir);
            assert_eq!(filename(path), stem);
            assert_eq!(extension(path), ext);
        }

        #[test]
        fn test_expand_tilde() {
            assert_eq!(expand_tilde("~", "/home/user"), "/home/user");
            assert_eq!(expand_tilde("~/docs", "/home/user/"), "/home/user/docs");
            assert_eq!(expand_tilde("~other/docs", "/home/user"), "~other/docs");
            assert_eq!(expand_tilde("/etc/~", "/home/user"), "/etc/~");
        }
    }
}
