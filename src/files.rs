//! High-level file helpers forwarding to any [`FileManager`].
//!
//! Code under test talks to [`Files`]; the test decides whether it runs against the
//! in-memory [`TreeFS`] or another provider.

use anyhow::{Context, anyhow, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::{FileAttributes, FileManager, Result, utils};
use crate::error::{FsError, FsResult};
use crate::vfs::{EntryType, TreeFS};

pub struct Files<M: FileManager> {
    manager: M,
    home: Option<String>,
}

impl<M: FileManager> Files<M> {
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            home: None,
        }
    }

    /// Expands a leading `~` in every path to `home`.
    pub fn with_home<S: Into<String>>(mut self, home: S) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut M {
        &mut self.manager
    }

    pub fn into_inner(self) -> M {
        self.manager
    }

    fn expand(&self, path: &str) -> String {
        match &self.home {
            Some(home) => utils::expand_tilde(path, home),
            None => path.to_string(),
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.manager.file_exists(self.expand(path))
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.manager.entry_type(self.expand(path)) == Some(EntryType::Directory)
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.manager.entry_type(self.expand(path)) == Some(EntryType::File)
    }

    /// Creates a directory and all missing parents.
    pub fn mkdir(&mut self, path: &str) -> FsResult<()> {
        let path = self.expand(path);
        self.manager
            .create_directory(path, true, &FileAttributes::default())
    }

    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        self.manager.contents(self.expand(path))
    }

    pub fn read_string(&self, path: &str) -> Result<String> {
        let bytes = self
            .read_file(path)
            .ok_or_else(|| anyhow!("{path} is not a readable file"))?;
        String::from_utf8(bytes).with_context(|| format!("{path} is not valid UTF-8"))
    }

    /// Writes `content` to `path`, replacing an existing file.
    ///
    /// `path` needs a parent segment and the parent directory must exist. Replacement is a
    /// removal followed by a creation, so every check runs before the old file goes away.
    pub fn write_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let path = self.expand(path);
        let (parent, name) = match utils::split_parent(&path) {
            Some(split) => split,
            None => return Err(FsError::InvalidPath(path).into()),
        };
        if !utils::is_valid_name(name) {
            return Err(FsError::InvalidName(name.to_string()).into());
        }
        if self.manager.entry_type(&parent) != Some(EntryType::Directory) {
            bail!("cannot write {path}: parent {parent} is not a directory");
        }
        match self.manager.entry_type(&path) {
            Some(EntryType::Directory) => return Err(FsError::NotAFile(path).into()),
            Some(EntryType::File) => self.manager.remove_item(&path)?,
            None => {}
        }
        if !self
            .manager
            .create_file(&path, Some(content), &FileAttributes::default())
        {
            bail!("failed to create {path}");
        }
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> FsResult<()> {
        let path = self.expand(path);
        self.manager.remove_item(path)
    }

    pub fn copy(&mut self, src: &str, dst: &str) -> FsResult<()> {
        let (src, dst) = (self.expand(src), self.expand(dst));
        self.manager.copy_item(src, dst)
    }

    pub fn rename(&mut self, src: &str, dst: &str) -> FsResult<()> {
        let (src, dst) = (self.expand(src), self.expand(dst));
        self.manager.move_item(src, dst)
    }

    /// Child names of a directory, sorted.
    pub fn list(&self, path: &str) -> FsResult<Vec<String>> {
        let mut names = self.manager.contents_of_directory(self.expand(path))?;
        names.sort();
        Ok(names)
    }

    /// Reads and decodes a JSON document.
    pub fn read_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let bytes = self
            .read_file(path)
            .ok_or_else(|| anyhow!("{path} is not a readable file"))?;
        serde_json::from_slice(&bytes).with_context(|| format!("cannot decode {path}"))
    }

    /// Encodes `value` as pretty-printed JSON and writes it to `path`.
    pub fn write_json<T: Serialize>(&mut self, path: &str, value: &T) -> Result<()> {
        let bytes =
            serde_json::to_vec_pretty(value).with_context(|| format!("cannot encode {path}"))?;
        self.write_file(path, &bytes)
    }
}

impl Files<TreeFS> {
    /// Helpers over an empty in-memory tree.
    pub fn in_memory() -> Self {
        Self::new(TreeFS::new())
    }

    /// Helpers over an in-memory tree bootstrapped from a nested JSON object.
    pub fn from_json(value: &Value) -> Self {
        Self::new(TreeFS::from_json(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Settings {
        name: String,
        retries: u32,
    }

    fn setup_files() -> Files<TreeFS> {
        Files::from_json(&json!({
            "home": {
                "user": { "notes.txt": "remember the milk" },
                "README.md": "# Home"
            },
            "bin": { "hello.sh": "echo hello" }
        }))
        .with_home("/home/user")
    }

    #[test]
    fn test_queries() {
        let files = setup_files();
        assert!(files.exists("/home/README.md"));
        assert!(files.is_dir("/home"));
        assert!(!files.is_dir("/home/README.md"));
        assert!(files.is_file("~/notes.txt"));
        assert!(!files.is_file("/missing"));
    }

    #[test]
    fn test_mkdir_and_list() -> FsResult<()> {
        let mut files = setup_files();
        files.mkdir("~/projects/demo")?;
        files.mkdir("~/projects/demo")?;

        assert_eq!(files.list("~")?, vec!["notes.txt", "projects"]);
        assert_eq!(files.list("/home")?, vec!["README.md", "user"]);
        Ok(())
    }

    #[test]
    fn test_read_and_write() -> Result<()> {
        let mut files = setup_files();
        assert_eq!(files.read_string("~/notes.txt")?, "remember the milk");

        files.write_file("~/notes.txt", b"buy bread")?;
        assert_eq!(files.read_string("/home/user/notes.txt")?, "buy bread");

        files.write_file("/bin/new.sh", b"true")?;
        assert_eq!(files.read_file("/bin/new.sh"), Some(b"true".to_vec()));
        Ok(())
    }

    #[test]
    fn test_write_errors() {
        let mut files = setup_files();
        assert!(files.write_file("/opt/app/config", b"x").is_err());
        assert!(files.write_file("/home/user", b"x").is_err());
        assert!(files.is_dir("/home/user"));
    }

    #[test]
    fn test_write_without_parent_keeps_existing_file() {
        let mut files = Files::from_json(&json!({ "config.txt": "old", "home": {} }));

        let err = files.write_file("/config.txt", b"new").unwrap_err();
        assert_eq!(
            err.downcast_ref::<FsError>(),
            Some(&FsError::InvalidPath("/config.txt".into()))
        );
        assert_eq!(files.read_file("/config.txt"), Some(b"old".to_vec()));

        files.manager_mut().cd("/home").unwrap();
        files.manager_mut().add_file("", "notes.txt", Some(b"keep")).unwrap();
        assert!(files.write_file("notes.txt", b"lost").is_err());
        assert_eq!(files.read_file("/home/notes.txt"), Some(b"keep".to_vec()));

        assert!(files.write_file("/home/..", b"x").is_err());
        assert_eq!(files.list("/").unwrap(), vec!["config.txt", "home"]);
    }

    #[test]
    fn test_read_string_errors() {
        let mut files = setup_files();
        assert!(files.read_string("/home").is_err());
        files.write_file("/bin/blob", &[0xff, 0xfe]).unwrap();
        let err = files.read_string("/bin/blob").unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_json_round_trip_through_tree() -> Result<()> {
        let mut files = setup_files();
        let settings = Settings {
            name: "demo".into(),
            retries: 3,
        };
        files.write_json("~/settings.json", &settings)?;

        let loaded: Settings = files.read_json("/home/user/settings.json")?;
        assert_eq!(loaded, settings);

        let err = files.read_json::<Settings>("/bin/hello.sh").unwrap_err();
        assert!(err.to_string().contains("cannot decode /bin/hello.sh"));
        Ok(())
    }

    #[test]
    fn test_copy_rename_remove() -> FsResult<()> {
        let mut files = setup_files();
        files.copy("/bin/hello.sh", "~/hello.sh")?;
        files.rename("~/hello.sh", "/home/hi.sh")?;
        files.remove("/bin/hello.sh")?;

        assert!(!files.exists("/bin/hello.sh"));
        assert!(!files.exists("~/hello.sh"));
        assert_eq!(files.read_file("/home/hi.sh"), Some(b"echo hello".to_vec()));

        let fs = files.into_inner();
        assert_eq!(fs.pwd(), "/");
        Ok(())
    }
}
