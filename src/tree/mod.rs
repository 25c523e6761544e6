//! File tree construction and search
//!
//! Turns the flat records of one or more manifests into a directory tree with
//! aggregated sizes, and searches it.

pub mod builder;
pub mod node;
pub mod search;

pub use builder::{FileTree, FileTreeBuilder, MAX_PATH_DEPTH};
pub use node::{DirectoryNode, FileNode, TreeNode};
pub use search::{search, SearchMatch, SearchResults};
