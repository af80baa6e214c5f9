//! A deterministic, in-memory filesystem tree for testing code that depends on filesystem
//! operations, without touching real storage.
//!
//! ### Overview
//!
//! `vfs-tree` keeps files and directories as nodes of an in-process tree and drives them
//! through `/`-separated path strings, reproducing the errors a real filesystem API reports.
//! It defines the [`FileManager`] capability trait and implements it with [`TreeFS`], so code
//! written against the trait can run on the emulation in tests.
//!
//! **Key ideas**:
//! - **Node tree**: an arena of file and directory nodes with parent back-references ([`NodeTree`]).
//! - **Session**: [`TreeFS`] owns the tree and a current directory, resolving `..`, `.`,
//!   absolute and relative paths.
//! - **Independent copies**: copy and move clone whole subtrees, never sharing nodes.
//! - **Precise errors**: every failure is an [`FsError`] carrying the offending path.
//! - **Helpers**: [`Files`] layers `mkdir`/`read_file`/`write_json`-style calls on any provider.

mod core;
mod error;
mod files;
mod vfs;

pub use crate::core::{FileAttributes, FileManager, Result, utils};
pub use error::{FsError, FsResult};
pub use files::Files;
pub use vfs::{EntryType, Node, NodeId, NodeTree, TreeFS};
