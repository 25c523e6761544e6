//! Keyword search over a built tree

use super::node::{DirectoryNode, FileNode, TreeNode};

/// One matching file with its reconstructed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch<'a> {
    pub path: String,
    pub file: &'a FileNode,
}

/// Capped match list plus the uncapped match count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults<'a> {
    pub matches: Vec<SearchMatch<'a>>,
    pub total: usize,
}

impl SearchResults<'_> {
    /// Matches found but not returned because of the cap
    pub fn truncated(&self) -> usize {
        self.total - self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Case-insensitive substring search over file paths, depth-first pre-order.
///
/// At most `result_cap` matches are collected; the walk still counts every
/// match so `total` is exact without a second traversal. An empty keyword
/// matches nothing.
pub fn search<'a>(root: &'a DirectoryNode, keyword: &str, result_cap: usize) -> SearchResults<'a> {
    let mut results = SearchResults {
        matches: Vec::new(),
        total: 0,
    };
    let needle: String = keyword.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return results;
    }

    let mut path = String::new();
    let mut lowered = String::new();
    walk(root, &needle, result_cap, &mut path, &mut lowered, &mut results);
    results
}

fn walk<'a>(
    dir: &'a DirectoryNode,
    needle: &str,
    cap: usize,
    path: &mut String,
    lowered: &mut String,
    results: &mut SearchResults<'a>,
) {
    for child in &dir.children {
        let base_len = path.len();
        let lowered_len = lowered.len();
        if !path.is_empty() {
            path.push('/');
            lowered.push('/');
        }
        path.push_str(child.name());
        lowered.extend(child.name().chars().flat_map(char::to_lowercase));

        match child {
            TreeNode::Directory(sub) => walk(sub, needle, cap, path, lowered, results),
            TreeNode::File(file) => {
                // The leaf name is a suffix of the path, so one check covers both
                if lowered.contains(needle) {
                    results.total += 1;
                    if results.matches.len() < cap {
                        results.matches.push(SearchMatch {
                            path: path.clone(),
                            file,
                        });
                    }
                }
            }
        }

        path.truncate(base_len);
        lowered.truncate(lowered_len);
    }
}
