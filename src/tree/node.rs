//! File tree node types

use crate::manifest::FileRecord;

/// Leaf node carrying the manifest record it was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub name: String,
    pub record: FileRecord,
}

impl FileNode {
    pub fn size(&self) -> u64 {
        self.record.size
    }
}

/// Directory node; `aggregate_size` is the sum of every descendant file size
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryNode {
    pub name: String,
    pub aggregate_size: u64,
    pub children: Vec<TreeNode>, // directories first, then files, each by name
}

/// File tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Directory(DirectoryNode),
    File(FileNode),
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            TreeNode::Directory(dir) => &dir.name,
            TreeNode::File(file) => &file.name,
        }
    }

    pub fn aggregate_size(&self) -> u64 {
        match self {
            TreeNode::Directory(dir) => dir.aggregate_size,
            TreeNode::File(file) => file.size(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, TreeNode::Directory(_))
    }

    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            TreeNode::Directory(dir) => Some(dir),
            TreeNode::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            TreeNode::File(file) => Some(file),
            TreeNode::Directory(_) => None,
        }
    }
}

impl DirectoryNode {
    /// Synthetic root: empty name, no children
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child_directory(&self, name: &str) -> Option<&DirectoryNode> {
        self.children
            .iter()
            .filter_map(TreeNode::as_directory)
            .find(|dir| dir.name == name)
    }

    /// Resolve a `/`-separated directory path below this node.
    ///
    /// An empty path resolves to `self`; this is how a front end expands one
    /// level at a time instead of materializing the whole tree.
    pub fn lookup(&self, path: &str) -> Option<&DirectoryNode> {
        path.split(['/', '\\'])
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |dir, segment| dir.child_directory(segment))
    }

    /// Number of files anywhere below this directory
    pub fn file_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                TreeNode::Directory(dir) => dir.file_count(),
                TreeNode::File(_) => 1,
            })
            .sum()
    }

    /// Sum of file sizes found by walking the subtree; equals `aggregate_size`
    pub fn reachable_size(&self) -> u64 {
        self.children
            .iter()
            .map(|child| match child {
                TreeNode::Directory(dir) => dir.reachable_size(),
                TreeNode::File(file) => file.size(),
            })
            .sum()
    }
}
