//! Dual-indexed node arena.
//!
//! Nodes live in one flat map keyed by inode; parent/child and the mandatory
//! `"."`/`".."` links are stored as inode references, so the cyclic
//! parent/child graph never turns into an ownership cycle. Path resolution
//! walks the per-directory name maps from the root; inode resolution is a
//! single map lookup. All mutation funnels through [`TreeIndex::add`], which
//! keeps the two addressing schemes from diverging.

use std::collections::HashMap;
use std::fs::File;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::archive::EntryMeta;
use crate::tree::ino::{ROOT_INO, derive_ino};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("no such entry")]
    NotFound,
    #[error("intermediate path segment is not a directory")]
    InvalidPath,
    #[error("node has no children")]
    NoChildren,
    #[error("unknown node {0}")]
    MissingNode(u64),
    #[error("parent and child resolve to the same node")]
    SameNode,
    #[error("parent {0} is not a directory")]
    NotDirectory(u64),
    #[error("inode {ino} already names {existing:?}")]
    InoCollision { ino: u64, existing: String },
}

/// File-or-directory discriminant for directory listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    RegularFile,
}

/// One listing entry, `"."`/`".."` already excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirChild {
    pub name: String,
    pub ino: u64,
    pub kind: FileKind,
}

#[derive(Debug)]
enum NodeKind {
    Directory { children: HashMap<String, u64> },
    FileExisting { entry: EntryMeta },
    FileNew { backing: Arc<File> },
}

impl NodeKind {
    fn file_kind(&self) -> FileKind {
        match self {
            NodeKind::Directory { .. } => FileKind::Directory,
            NodeKind::FileExisting { .. } | NodeKind::FileNew { .. } => FileKind::RegularFile,
        }
    }
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: u64,
    kind: NodeKind,
}

/// Payload for [`TreeIndex::add`].
pub enum NodeInit {
    Directory,
    FileExisting(EntryMeta),
    FileNew(Arc<File>),
}

/// Cheap snapshot of a node, for callers outside the lock.
#[derive(Debug, Clone)]
pub enum NodeView {
    Directory { ino: u64, name: String },
    FileExisting { ino: u64, name: String, entry: EntryMeta },
    FileNew { ino: u64, name: String, backing: Arc<File> },
}

impl NodeView {
    pub fn ino(&self) -> u64 {
        match self {
            NodeView::Directory { ino, .. }
            | NodeView::FileExisting { ino, .. }
            | NodeView::FileNew { ino, .. } => *ino,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NodeView::Directory { name, .. }
            | NodeView::FileExisting { name, .. }
            | NodeView::FileNew { name, .. } => name,
        }
    }
}

#[derive(Debug)]
pub struct TreeIndex {
    nodes: RwLock<HashMap<u64, Node>>,
}

impl TreeIndex {
    /// Creates the index with the root directory already registered under
    /// [`ROOT_INO`]. The root's `".."` links back to itself.
    pub fn new() -> Self {
        let mut children = HashMap::new();
        children.insert(".".to_owned(), ROOT_INO);
        children.insert("..".to_owned(), ROOT_INO);
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_INO,
            Node {
                name: "/".to_owned(),
                parent: ROOT_INO,
                kind: NodeKind::Directory { children },
            },
        );
        TreeIndex {
            nodes: RwLock::new(nodes),
        }
    }

    /// Walks the name maps from the root. `InvalidPath` when an intermediate
    /// segment is a file, `NotFound` when a segment is absent. Empty and `.`
    /// segments are ignored, so `""`, `"."` and `"/"` all resolve to the root.
    pub fn resolve(&self, path: &str) -> Result<u64, TreeError> {
        let nodes = self.nodes.read().unwrap();
        let mut cur = ROOT_INO;
        for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            let node = nodes.get(&cur).ok_or(TreeError::MissingNode(cur))?;
            let NodeKind::Directory { children } = &node.kind else {
                return Err(TreeError::InvalidPath);
            };
            cur = *children.get(segment).ok_or(TreeError::NotFound)?;
        }
        Ok(cur)
    }

    /// Flat inode-map lookup, O(1).
    pub fn node(&self, ino: u64) -> Result<NodeView, TreeError> {
        let nodes = self.nodes.read().unwrap();
        let node = nodes.get(&ino).ok_or(TreeError::NotFound)?;
        Ok(match &node.kind {
            NodeKind::Directory { .. } => NodeView::Directory {
                ino,
                name: node.name.clone(),
            },
            NodeKind::FileExisting { entry } => NodeView::FileExisting {
                ino,
                name: node.name.clone(),
                entry: entry.clone(),
            },
            NodeKind::FileNew { backing } => NodeView::FileNew {
                ino,
                name: node.name.clone(),
                backing: backing.clone(),
            },
        })
    }

    pub fn parent_of(&self, ino: u64) -> Result<u64, TreeError> {
        let nodes = self.nodes.read().unwrap();
        nodes
            .get(&ino)
            .map(|n| n.parent)
            .ok_or(TreeError::NotFound)
    }

    /// All children excluding `"."`/`".."`, order unspecified. `NoChildren`
    /// for file nodes; an empty directory yields an empty vec.
    pub fn children(&self, ino: u64) -> Result<Vec<DirChild>, TreeError> {
        let nodes = self.nodes.read().unwrap();
        let node = nodes.get(&ino).ok_or(TreeError::NotFound)?;
        let NodeKind::Directory { children } = &node.kind else {
            return Err(TreeError::NoChildren);
        };
        let mut out = Vec::with_capacity(children.len().saturating_sub(2));
        for (name, &child_ino) in children {
            if name == "." || name == ".." {
                continue;
            }
            let child = nodes.get(&child_ino).ok_or(TreeError::MissingNode(child_ino))?;
            out.push(DirChild {
                name: name.clone(),
                ino: child_ino,
                kind: child.kind.file_kind(),
            });
        }
        Ok(out)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().unwrap().len()
    }

    /// Registers `name` under `parent_ino` in both indices and returns the
    /// derived inode. For directories the child's `"."`/`".."` links are
    /// seeded in the same commit. A duplicate `(parent, name)` pair
    /// overwrites the prior mapping: a directory record landing on an
    /// existing directory keeps its children (metadata refresh), while an
    /// overwrite that turns a directory into a file evicts the old subtree
    /// from the flat map so the two indices cannot disagree. The same inode
    /// surfacing for a distinct path is an [`TreeError::InoCollision`].
    ///
    /// The call is atomic: validation happens before any mutation, under the
    /// single write lock, so a failed add leaves both indices untouched.
    pub fn add(&self, parent_ino: u64, name: &str, init: NodeInit) -> Result<u64, TreeError> {
        self.add_node(parent_ino, derive_ino(parent_ino, name), name, init)
    }

    fn add_node(
        &self,
        parent_ino: u64,
        ino: u64,
        name: &str,
        init: NodeInit,
    ) -> Result<u64, TreeError> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(TreeError::InvalidPath);
        }
        if ino == parent_ino {
            return Err(TreeError::SameNode);
        }

        let mut nodes = self.nodes.write().unwrap();
        {
            let parent = nodes
                .get(&parent_ino)
                .ok_or(TreeError::MissingNode(parent_ino))?;
            let NodeKind::Directory { children } = &parent.kind else {
                return Err(TreeError::NotDirectory(parent_ino));
            };
            if let Some(existing) = nodes.get(&ino) {
                let same_slot = existing.parent == parent_ino
                    && existing.name == name
                    && children.get(name) == Some(&ino);
                if !same_slot {
                    return Err(TreeError::InoCollision {
                        ino,
                        existing: existing.name.clone(),
                    });
                }
            }
        }

        let kind = match init {
            NodeInit::Directory => match nodes.remove(&ino) {
                // duplicate directory record for the same slot: keep the
                // subtree already hanging off the node instead of reseeding
                Some(Node {
                    kind: NodeKind::Directory { children },
                    ..
                }) => NodeKind::Directory { children },
                _ => {
                    let mut children = HashMap::new();
                    children.insert(".".to_owned(), ino);
                    children.insert("..".to_owned(), parent_ino);
                    NodeKind::Directory { children }
                }
            },
            NodeInit::FileExisting(entry) => NodeKind::FileExisting { entry },
            NodeInit::FileNew(backing) => NodeKind::FileNew { backing },
        };
        if !matches!(kind, NodeKind::Directory { .. }) {
            // a directory overwritten by a file would leave its subtree
            // reachable through the flat map only; drop it from both schemes
            if let Some(Node {
                kind: NodeKind::Directory { children },
                ..
            }) = nodes.remove(&ino)
            {
                evict_subtree(&mut nodes, &children);
            }
        }
        nodes.insert(
            ino,
            Node {
                name: name.to_owned(),
                parent: parent_ino,
                kind,
            },
        );
        if let Some(Node {
            kind: NodeKind::Directory { children },
            ..
        }) = nodes.get_mut(&parent_ino)
        {
            children.insert(name.to_owned(), ino);
        }
        Ok(ino)
    }
}

impl Default for TreeIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn evict_subtree(nodes: &mut HashMap<u64, Node>, children: &HashMap<String, u64>) {
    for (name, child_ino) in children {
        if name == "." || name == ".." {
            continue;
        }
        if let Some(child) = nodes.remove(child_ino) {
            if let NodeKind::Directory { children } = &child.kind {
                evict_subtree(nodes, children);
            }
        }
    }
}
