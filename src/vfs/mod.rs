mod node;
mod tree_fs;

pub use node::{EntryType, Node, NodeId, NodeTree};
pub use tree_fs::TreeFS;
