//! This module provides the in-memory filesystem session: a [`NodeTree`] plus a current
//! working directory, driven through `/`-separated path strings.

use anyhow::Context;
use serde_json::Value;
use tracing::{debug, trace};

use crate::core::{FileAttributes, FileManager, Result, utils};
use crate::error::{FsError, FsResult};
use crate::vfs::node::{EntryType, NodeId, NodeTree};

/// An in-memory filesystem that reproduces the error semantics of a real one.
///
/// `TreeFS` owns the whole tree and a current working directory. Every operation first
/// resolves its path(s) to nodes, then performs one structural change on the result.
///
/// ### Path resolution
///
/// * A path starting with `/` is resolved from the root, any other path from `cwd`.
/// * Empty segments are ignored, so `//a///b/` is the same as `/a/b` and `""` is `cwd`.
/// * `..` moves to the parent; at the root it stays at the root. `.` stays in place.
/// * A missing segment fails with [`FsError::NodeNotFound`] carrying
///   `<absolute path reached so far>/<missing segment>`.
///
/// ### Invariants
///
/// 1. **Root existence**: the root is always present, is a directory and cannot be removed.
/// 2. **Valid cwd**: `cwd` always designates an attached directory. Removing a subtree that
///    contains it moves `cwd` to the removed node's parent.
/// 3. **No aliasing**: copies (and therefore moves) produce fresh nodes for every
///    descendant; writing through one location never changes the other.
///
/// ### Thread Safety
///
/// Single-threaded by design; drive each instance from one test or call site. `move_item`
/// is a copy followed by a removal and is not atomic.
///
/// ### Example
///
/// ```
/// use vfs_tree::{FileAttributes, FileManager, TreeFS};
///
/// let mut fs = TreeFS::new();
/// fs.create_directory("/docs/drafts", true, &FileAttributes::new()).unwrap();
/// assert!(fs.create_file("/docs/note.txt", Some(b"Hello"), &FileAttributes::new()));
///
/// fs.copy_item("/docs/note.txt", "/docs/drafts/note.txt").unwrap();
/// assert_eq!(fs.contents("/docs/drafts/note.txt"), Some(b"Hello".to_vec()));
/// ```
#[derive(Debug, Clone)]
pub struct TreeFS {
    tree: NodeTree,
    cwd: NodeId,
}

impl TreeFS {
    /// Creates an empty filesystem with `cwd` at the root.
    pub fn new() -> Self {
        let tree = NodeTree::new();
        let cwd = tree.root();
        Self { tree, cwd }
    }

    /// Builds a filesystem whose root children come from a nested JSON object.
    ///
    /// # Panics
    ///
    /// If `value` is not an object, or contains values other than strings and objects.
    pub fn from_json(value: &Value) -> Self {
        let mut fs = Self::new();
        let root = fs.tree.root();
        match value {
            Value::Object(mapping) => fs.tree.populate(root, mapping),
            other => panic!("bootstrap data must be an object, got {other}"),
        }
        fs
    }

    /// Parses `json` and builds the filesystem from it, see [`TreeFS::from_json`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).context("malformed bootstrap JSON")?;
        Ok(Self::from_json(&value))
    }

    /// Read-only access to the underlying node arena.
    pub fn nodes(&self) -> &NodeTree {
        &self.tree
    }

    pub fn cwd_id(&self) -> NodeId {
        self.cwd
    }

    /// Resolves `path` to a node.
    pub fn resolve<P: AsRef<str>>(&self, path: P) -> FsResult<NodeId> {
        let path = path.as_ref();
        let mut current = if utils::is_absolute(path) {
            self.tree.root()
        } else {
            self.cwd
        };
        for segment in utils::segments(path) {
            current = match segment {
                "." => current,
                ".." => self.tree.parent(current),
                name => match self.tree.lookup(current, name) {
                    Some(child) => child,
                    None => {
                        let sought = utils::join(&self.tree.absolute_path(current), name);
                        trace!(path, %sought, "path resolution failed");
                        return Err(FsError::NodeNotFound(sought));
                    }
                },
            };
        }
        Ok(current)
    }

    /// Changes the current working directory.
    /// `path` may be relative or absolute but must designate an existing directory.
    pub fn cd<P: AsRef<str>>(&mut self, path: P) -> FsResult<()> {
        let target = self.resolve(path)?;
        if !self.tree.node(target).is_dir() {
            return Err(FsError::NotADirectory(self.tree.absolute_path(target)));
        }
        self.cwd = target;
        Ok(())
    }

    /// Absolute path of the current working directory.
    pub fn pwd(&self) -> String {
        self.tree.absolute_path(self.cwd)
    }

    /// Creates an empty directory `name` inside the directory at `path`.
    pub fn add_directory<P: AsRef<str>>(&mut self, path: P, name: &str) -> FsResult<()> {
        if !utils::is_valid_name(name) {
            return Err(FsError::InvalidName(name.to_string()));
        }
        let parent = self.resolve(path)?;
        let id = self.tree.add_directory(parent, name)?;
        debug!(path = %self.tree.absolute_path(id), "directory created");
        Ok(())
    }

    /// Creates a file `name` inside the directory at `path`. Missing content means an
    /// empty file.
    pub fn add_file<P: AsRef<str>>(
        &mut self,
        path: P,
        name: &str,
        content: Option<&[u8]>,
    ) -> FsResult<()> {
        if !utils::is_valid_name(name) {
            return Err(FsError::InvalidName(name.to_string()));
        }
        let parent = self.resolve(path)?;
        let content = content.map(<[u8]>::to_vec).unwrap_or_default();
        let id = self.tree.add_file(parent, name, content)?;
        debug!(path = %self.tree.absolute_path(id), "file created");
        Ok(())
    }

    /// Replaces the entire content of an existing file.
    pub fn write<P: AsRef<str>>(&mut self, path: P, content: &[u8]) -> FsResult<()> {
        let id = self.resolve(path)?;
        self.tree.set_content(id, content.to_vec())?;
        debug!(path = %self.tree.absolute_path(id), len = content.len(), "file written");
        Ok(())
    }

    /// Appends bytes to the end of an existing file.
    pub fn append<P: AsRef<str>>(&mut self, path: P, content: &[u8]) -> FsResult<()> {
        let id = self.resolve(path)?;
        self.tree.append_content(id, content)
    }

    /// Absolute paths of everything below the directory at `path`, sorted.
    pub fn tree<P: AsRef<str>>(&self, path: P) -> FsResult<Vec<String>> {
        let id = self.resolve(path)?;
        if !self.tree.node(id).is_dir() {
            return Err(FsError::NotADirectory(self.tree.absolute_path(id)));
        }
        let mut paths: Vec<String> = self
            .tree
            .descendants(id)
            .into_iter()
            .map(|d| self.tree.absolute_path(d))
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Removes everything but the root and moves `cwd` back to it.
    pub fn cleanup(&mut self) {
        let root = self.tree.root();
        let names = self.tree.node(root).child_names().unwrap_or_default();
        for name in names {
            if let Some(child) = self.tree.lookup(root, &name) {
                self.tree.detach(child);
                self.tree.release(child);
            }
        }
        self.cwd = root;
        debug!("tree cleaned up");
    }

    /// Resolves the parent of a destination path, returning it together with the new name.
    fn resolve_destination<'a>(&self, path: &'a str) -> FsResult<(NodeId, &'a str)> {
        let (parent_path, name) =
            utils::split_parent(path).ok_or_else(|| FsError::InvalidPath(path.to_string()))?;
        if !utils::is_valid_name(name) {
            return Err(FsError::InvalidName(name.to_string()));
        }
        let parent = self.resolve(parent_path)?;
        Ok((parent, name))
    }

    fn try_create_file(&mut self, path: &str, content: Option<&[u8]>) -> FsResult<()> {
        let (parent_path, name) =
            utils::split_parent(path).ok_or_else(|| FsError::InvalidPath(path.to_string()))?;
        self.add_file(parent_path, name, content)
    }
}

impl Default for TreeFS {
    fn default() -> Self {
        Self::new()
    }
}

impl FileManager for TreeFS {
    fn entry_type<P: AsRef<str>>(&self, path: P) -> Option<EntryType> {
        self.resolve(path)
            .ok()
            .map(|id| self.tree.node(id).entry_type())
    }

    /// Deep-copies the node at `src` to `dst`.
    ///
    /// `dst` needs at least two segments: the parent path and the new name. Nothing is
    /// copied unless the destination parent is a directory without a child of that name.
    fn copy_item<P: AsRef<str>, Q: AsRef<str>>(&mut self, src: P, dst: Q) -> FsResult<()> {
        let dst = dst.as_ref();
        let source = self.resolve(src)?;
        let (parent, name) = self.resolve_destination(dst)?;
        self.tree.check_insertable(parent, name)?;

        let copy = self.tree.deep_copy(source, Some(name), Some(parent));
        if let Err(e) = self.tree.insert(parent, copy) {
            self.tree.release(copy);
            return Err(e);
        }
        debug!(
            from = %self.tree.absolute_path(source),
            to = %self.tree.absolute_path(copy),
            "item copied"
        );
        Ok(())
    }

    /// Copies `src` to `dst`, then removes `src`.
    ///
    /// A destination inside the source subtree is rejected with [`FsError::InvalidPath`],
    /// since the removal step would delete the copy as well.
    fn move_item<P: AsRef<str>, Q: AsRef<str>>(&mut self, src: P, dst: Q) -> FsResult<()> {
        let (src, dst) = (src.as_ref(), dst.as_ref());
        let source = self.resolve(src)?;
        if let Ok((parent, _)) = self.resolve_destination(dst) {
            if self.tree.is_ancestor(source, parent) {
                return Err(FsError::InvalidPath(dst.to_string()));
            }
        }
        self.copy_item(src, dst)?;
        self.remove_item(src)
    }

    fn remove_item<P: AsRef<str>>(&mut self, path: P) -> FsResult<()> {
        let id = self.resolve(path)?;
        if self.tree.is_root(id) {
            return Err(FsError::RootNotRemovable);
        }
        let removed = self.tree.absolute_path(id);
        let parent = self.tree.parent(id);
        if self.tree.is_ancestor(id, self.cwd) {
            debug!(cwd = %self.pwd(), "current directory removed, moving to parent");
            self.cwd = parent;
        }
        self.tree.detach(id);
        self.tree.release(id);
        debug!(path = %removed, "item removed");
        Ok(())
    }

    /// Creates a directory.
    ///
    /// Without intermediates, the parent must already exist and `path` must not.
    /// With intermediates, every missing segment is created and existing directories are
    /// reused, so repeating the call is a no-op.
    fn create_directory<P: AsRef<str>>(
        &mut self,
        path: P,
        with_intermediates: bool,
        _attributes: &FileAttributes,
    ) -> FsResult<()> {
        let path = path.as_ref();
        if !with_intermediates {
            let (parent, name) = self.resolve_destination(path)?;
            let id = self.tree.add_directory(parent, name)?;
            debug!(path = %self.tree.absolute_path(id), "directory created");
            return Ok(());
        }

        let mut current = if utils::is_absolute(path) {
            self.tree.root()
        } else {
            self.cwd
        };
        for segment in utils::segments(path) {
            current = match segment {
                "." => current,
                ".." => self.tree.parent(current),
                name => match self.tree.lookup(current, name) {
                    Some(existing) if self.tree.node(existing).is_dir() => existing,
                    Some(existing) => {
                        return Err(FsError::NotADirectory(self.tree.absolute_path(existing)));
                    }
                    None => {
                        let id = self.tree.add_directory(current, name)?;
                        debug!(path = %self.tree.absolute_path(id), "directory created");
                        id
                    }
                },
            };
        }
        Ok(())
    }

    fn create_file<P: AsRef<str>>(
        &mut self,
        path: P,
        content: Option<&[u8]>,
        _attributes: &FileAttributes,
    ) -> bool {
        let path = path.as_ref();
        match self.try_create_file(path, content) {
            Ok(()) => true,
            Err(e) => {
                debug!(path, error = %e, "file not created");
                false
            }
        }
    }

    fn contents_of_directory<P: AsRef<str>>(&self, path: P) -> FsResult<Vec<String>> {
        let id = self.resolve(path)?;
        self.tree
            .node(id)
            .child_names()
            .ok_or_else(|| FsError::NotADirectory(self.tree.absolute_path(id)))
    }

    fn contents<P: AsRef<str>>(&self, path: P) -> Option<Vec<u8>> {
        let id = self.resolve(path).ok()?;
        self.tree.node(id).content().map(<[u8]>::to_vec)
    }
}
