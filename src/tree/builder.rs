//! Flat manifest records -> directory tree
//!
//! Insertion is a single pass: every record walks its path segments through a
//! memo of already-created directories and adds its size to each directory on
//! the way. Directories live in an index arena while building and are turned
//! into owned, sorted nodes at the end.

use super::node::{DirectoryNode, FileNode, TreeNode};
use crate::manifest::FileRecord;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

/// Deepest path, in segments, a record may have; deeper records are dropped
pub const MAX_PATH_DEPTH: usize = 256;

/// Result of a tree build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTree {
    pub root: DirectoryNode,
    pub file_count: usize,
    pub total_size: u64,
    /// Records skipped because their path was unusable or nested too deep
    pub dropped: usize,
}

impl FileTree {
    pub fn empty() -> Self {
        Self {
            root: DirectoryNode::root(),
            file_count: 0,
            total_size: 0,
            dropped: 0,
        }
    }
}

impl Default for FileTree {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Default)]
struct DirSlot {
    name: String,
    aggregate_size: u64,
    dirs: Vec<usize>,
    files: Vec<FileNode>,
}

/// Incremental tree builder
pub struct FileTreeBuilder {
    slots: Vec<DirSlot>,
    /// cumulative path ("UI/fonts") -> arena index; "" is the root
    memo: HashMap<String, usize>,
    file_count: usize,
    dropped: usize,
}

impl Default for FileTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTreeBuilder {
    pub fn new() -> Self {
        let mut memo = HashMap::new();
        memo.insert(String::new(), 0);
        Self {
            slots: vec![DirSlot::default()],
            memo,
            file_count: 0,
            dropped: 0,
        }
    }

    /// Build a tree from a complete batch of records.
    pub fn build<I>(records: I) -> FileTree
    where
        I: IntoIterator<Item = FileRecord>,
    {
        let start = Instant::now();
        let mut builder = Self::new();
        for record in records {
            builder.insert(record);
        }
        let tree = builder.finish();
        debug!(
            files = tree.file_count,
            dropped = tree.dropped,
            total_size = tree.total_size,
            duration_ms = start.elapsed().as_millis(),
            "Built file tree"
        );
        tree
    }

    /// Insert one record. Returns `false` if its path was unusable and it was dropped.
    pub fn insert(&mut self, record: FileRecord) -> bool {
        let normalized = record.remote_path.replace('\\', "/");
        let segments: Vec<&str> = normalized
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        let Some((file_name, dir_segments)) = segments.split_last() else {
            self.dropped += 1;
            return false;
        };
        let traverses = segments.iter().any(|segment| *segment == "." || *segment == "..");
        if traverses || segments.len() > MAX_PATH_DEPTH {
            self.dropped += 1;
            return false;
        }

        let size = record.size;
        let mut parent = 0;
        self.slots[0].aggregate_size = self.slots[0].aggregate_size.saturating_add(size);

        let mut path = String::with_capacity(normalized.len());
        for segment in dir_segments {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(segment);

            let index = match self.memo.get(&path) {
                Some(&index) => index,
                None => {
                    let index = self.slots.len();
                    self.slots.push(DirSlot {
                        name: (*segment).to_string(),
                        ..DirSlot::default()
                    });
                    self.slots[parent].dirs.push(index);
                    self.memo.insert(path.clone(), index);
                    index
                }
            };

            let slot = &mut self.slots[index];
            slot.aggregate_size = slot.aggregate_size.saturating_add(size);
            parent = index;
        }

        let name = (*file_name).to_string();
        self.slots[parent].files.push(FileNode { name, record });
        self.file_count += 1;
        true
    }

    /// Convert the arena into an owned tree with sorted children.
    pub fn finish(mut self) -> FileTree {
        let root = assemble(&mut self.slots, 0);
        FileTree {
            total_size: root.aggregate_size,
            root,
            file_count: self.file_count,
            dropped: self.dropped,
        }
    }
}

fn assemble(slots: &mut [DirSlot], index: usize) -> DirectoryNode {
    let slot = std::mem::take(&mut slots[index]);

    let mut dirs: Vec<DirectoryNode> = slot
        .dirs
        .iter()
        .map(|&child| assemble(slots, child))
        .collect();
    dirs.sort_by(|a, b| a.name.cmp(&b.name));

    let mut files = slot.files;
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let mut children = Vec::with_capacity(dirs.len() + files.len());
    children.extend(dirs.into_iter().map(TreeNode::Directory));
    children.extend(files.into_iter().map(TreeNode::File));

    DirectoryNode {
        name: slot.name,
        aggregate_size: slot.aggregate_size,
        children,
    }
}
