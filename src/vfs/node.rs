//! Arena-backed node tree.
//!
//! Nodes live in a single map addressed by [`NodeId`]. A directory owns its children
//! through their ids; the `parent` field is a plain id as well, so upward links never
//! form ownership cycles. The root is the only node whose parent is itself.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::core::utils;
use crate::error::{FsError, FsResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// Stable identifier of a node inside a [`NodeTree`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    File { content: Vec<u8> },
    Directory { children: HashMap<String, NodeId> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    parent: NodeId,
    kind: NodeKind,
}

impl Node {
    /// Own segment name; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn entry_type(&self) -> EntryType {
        match self.kind {
            NodeKind::File { .. } => EntryType::File,
            NodeKind::Directory { .. } => EntryType::Directory,
        }
    }

    pub fn is_file(&self) -> bool {
        self.entry_type() == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type() == EntryType::Directory
    }

    /// File content; `None` for directories.
    pub fn content(&self) -> Option<&[u8]> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Directory { .. } => None,
        }
    }

    /// Child with the given name; always `None` for files.
    pub fn child(&self, name: &str) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Directory { children } => children.get(name).copied(),
            NodeKind::File { .. } => None,
        }
    }

    /// Names of the children; `None` for files.
    pub fn child_names(&self) -> Option<Vec<String>> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children.keys().cloned().collect()),
            NodeKind::File { .. } => None,
        }
    }

    fn child_ids(&self) -> Vec<NodeId> {
        match &self.kind {
            NodeKind::Directory { children } => children.values().copied().collect(),
            NodeKind::File { .. } => Vec::new(),
        }
    }
}

/// Owner of every node of one filesystem tree.
///
/// ### Invariants
///
/// 1. The root always exists, is a directory and is its own parent.
/// 2. Every attached non-root node is listed in its parent's children under its own name.
/// 3. Names are unique within a directory.
/// 4. Files never have children and directories never have content.
///
/// Detached nodes (constructed but not inserted, or removed with [`NodeTree::detach`])
/// stay in the arena until they are inserted or [`NodeTree::release`]d.
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
}

impl NodeTree {
    /// Creates a tree holding only the root directory.
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                name: String::new(),
                parent: root,
                kind: NodeKind::Directory {
                    children: HashMap::new(),
                },
            },
        );
        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Number of nodes held by the arena, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids handed out by this tree always point to a live node until released.
    ///
    /// # Panics
    ///
    /// If `id` was released or belongs to another tree; use [`NodeTree::get`] otherwise.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[&id]
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Constructs a detached file node.
    pub fn new_file(&mut self, name: &str, parent: NodeId, content: Vec<u8>) -> NodeId {
        self.allocate(Node {
            name: name.to_string(),
            parent,
            kind: NodeKind::File { content },
        })
    }

    /// Constructs a detached, empty directory node.
    pub fn new_directory(&mut self, name: &str, parent: NodeId) -> NodeId {
        self.allocate(Node {
            name: name.to_string(),
            parent,
            kind: NodeKind::Directory {
                children: HashMap::new(),
            },
        })
    }

    pub fn parent(&self, id: NodeId) -> NodeId {
        self.node(id).parent
    }

    /// Looks `name` up among the children of `id`.
    pub fn lookup(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id).child(name)
    }

    /// Renders the absolute path of `id` by walking up to the root.
    pub fn absolute_path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = id;
        while !self.is_root(current) {
            let node = self.node(current);
            names.push(node.name.as_str());
            if node.parent == current {
                break;
            }
            current = node.parent;
        }
        if names.is_empty() {
            return "/".to_string();
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Returns true, if `ancestor` is `id` itself or lies on its upward path.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == ancestor {
                return true;
            }
            let parent = self.node(current).parent;
            if parent == current {
                return false;
            }
            current = parent;
        }
    }

    /// Checks that a child named `name` could be inserted under `parent`.
    pub fn check_insertable(&self, parent: NodeId, name: &str) -> FsResult<()> {
        if !utils::is_valid_name(name) {
            return Err(FsError::InvalidName(name.to_string()));
        }
        let node = self.node(parent);
        match &node.kind {
            NodeKind::File { .. } => Err(FsError::NotADirectory(self.absolute_path(parent))),
            NodeKind::Directory { children } if children.contains_key(name) => Err(
                FsError::NodeExists(utils::join(&self.absolute_path(parent), name)),
            ),
            NodeKind::Directory { .. } => Ok(()),
        }
    }

    /// Attaches the detached node `child` under `parent`, updating its back-reference.
    /// On failure the tree is unchanged and `child` stays detached.
    pub fn insert(&mut self, parent: NodeId, child: NodeId) -> FsResult<()> {
        let name = self.node(child).name.clone();
        self.check_insertable(parent, &name)?;
        if let Some(Node {
            kind: NodeKind::Directory { children },
            ..
        }) = self.nodes.get_mut(&parent)
        {
            children.insert(name, child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = parent;
        }
        Ok(())
    }

    /// Creates and attaches a new file.
    pub fn add_file(&mut self, parent: NodeId, name: &str, content: Vec<u8>) -> FsResult<NodeId> {
        self.check_insertable(parent, name)?;
        let id = self.new_file(name, parent, content);
        self.insert(parent, id)?;
        Ok(id)
    }

    /// Creates and attaches a new, empty directory.
    pub fn add_directory(&mut self, parent: NodeId, name: &str) -> FsResult<NodeId> {
        self.check_insertable(parent, name)?;
        let id = self.new_directory(name, parent);
        self.insert(parent, id)?;
        Ok(id)
    }

    /// Removes `id` from its parent's children. The node keeps its (now stale) parent
    /// reference so the subtree can be reattached or released afterwards.
    pub fn detach(&mut self, id: NodeId) {
        let Node { name, parent, .. } = self.node(id).clone();
        if parent == id {
            return;
        }
        if let Some(Node {
            kind: NodeKind::Directory { children },
            ..
        }) = self.nodes.get_mut(&parent)
        {
            if children.get(&name) == Some(&id) {
                children.remove(&name);
            }
        }
    }

    /// Drops `id` and all its descendants from the arena. The root is never released.
    pub fn release(&mut self, id: NodeId) {
        if self.is_root(id) {
            return;
        }
        for descendant in self.descendants(id) {
            self.nodes.remove(&descendant);
        }
        self.nodes.remove(&id);
    }

    /// All nodes below `id` in pre-order, `id` itself excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = self.node(id).child_ids();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.node(next).child_ids());
        }
        result
    }

    /// Clones `id` and its whole subtree into fresh nodes.
    ///
    /// The clone gets `target_name` (or the original name) and `new_parent` (or the
    /// original parent) but is not inserted anywhere; descendants point into the clone.
    pub fn deep_copy(
        &mut self,
        id: NodeId,
        target_name: Option<&str>,
        new_parent: Option<NodeId>,
    ) -> NodeId {
        let source = self.node(id).clone();
        let name = target_name.map_or(source.name.clone(), str::to_string);
        let parent = new_parent.unwrap_or(source.parent);
        match source.kind {
            NodeKind::File { content } => self.new_file(&name, parent, content),
            NodeKind::Directory { children } => {
                let copy = self.new_directory(&name, parent);
                let mut copied = HashMap::with_capacity(children.len());
                for (child_name, child) in children {
                    let child_copy = self.deep_copy(child, None, Some(copy));
                    copied.insert(child_name, child_copy);
                }
                if let Some(Node {
                    kind: NodeKind::Directory { children },
                    ..
                }) = self.nodes.get_mut(&copy)
                {
                    *children = copied;
                }
                copy
            }
        }
    }

    /// Replaces the content of a file.
    pub fn set_content(&mut self, id: NodeId, content: Vec<u8>) -> FsResult<()> {
        let path = self.absolute_path(id);
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::File { content: current }) => {
                *current = content;
                Ok(())
            }
            Some(NodeKind::Directory { .. }) => Err(FsError::NotAFile(path)),
            None => Err(FsError::NodeNotFound(path)),
        }
    }

    /// Appends to the content of a file.
    pub fn append_content(&mut self, id: NodeId, content: &[u8]) -> FsResult<()> {
        let path = self.absolute_path(id);
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::File { content: current }) => {
                current.extend_from_slice(content);
                Ok(())
            }
            Some(NodeKind::Directory { .. }) => Err(FsError::NotAFile(path)),
            None => Err(FsError::NodeNotFound(path)),
        }
    }

    /// Populates the directory `dir` from a nested mapping: strings become files holding
    /// their UTF-8 bytes, objects become subdirectories.
    ///
    /// # Panics
    ///
    /// Only meant for trusted literals. Panics if `dir` is a file, if a value is neither a
    /// string nor an object, or if a key is not a valid, unused name.
    pub fn populate(&mut self, dir: NodeId, mapping: &Map<String, Value>) {
        if !self.node(dir).is_dir() {
            panic!(
                "cannot populate {}: not a directory",
                self.absolute_path(dir)
            );
        }
        for (name, value) in mapping {
            if !utils::is_valid_name(name) {
                panic!("invalid node name in bootstrap data: {name:?}");
            }
            let created = match value {
                Value::String(text) => self.add_file(dir, name, text.as_bytes().to_vec()),
                Value::Object(nested) => self.add_directory(dir, name).map(|child| {
                    self.populate(child, nested);
                    child
                }),
                other => panic!("unsupported bootstrap value for {name:?}: {other}"),
            };
            if let Err(e) = created {
                panic!("bootstrap failed: {e}");
            }
        }
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}
