//! One-pass archive loader.
//!
//! The entry list arrives in container order, which is not necessarily
//! hierarchical and may omit directory records entirely. Explicit directory
//! records must find their parent already present; file records synthesize
//! any missing ancestors before the leaf goes in. Structural failures here
//! are fatal and abort the mount before any request is served.

use log::debug;
use thiserror::Error;

use crate::archive::{ArchiveSource, EntryMeta};
use crate::tree::index::{FileKind, NodeInit, TreeError, TreeIndex};
use crate::tree::ino::ROOT_INO;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("archive scan failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("directory record {path:?} has no parent in the tree")]
    MissingParent {
        path: String,
        #[source]
        source: TreeError,
    },
    #[error("failed to insert {path:?}")]
    Insert {
        path: String,
        #[source]
        source: TreeError,
    },
}

/// Builds the tree index from the source's entry list in a single pass.
/// Every inode comes out of `derive_ino(parent_ino, base_name)` via
/// [`TreeIndex::add`]; a duplicate path overwrites the earlier record.
pub fn build_tree<S: ArchiveSource>(source: &S) -> Result<TreeIndex, LoadError> {
    let tree = TreeIndex::new();
    for entry in source.entries()? {
        let clean = normalize(&entry.name);
        if clean.is_empty() {
            // a bare "/" or "./" record is the root itself
            continue;
        }
        let (dir, base) = split_base(clean);
        if entry.is_dir() {
            let parent = tree.resolve(dir).map_err(|source| LoadError::MissingParent {
                path: entry.name.clone(),
                source,
            })?;
            tree.add(parent, base, NodeInit::Directory)
                .map_err(|source| LoadError::Insert {
                    path: entry.name.clone(),
                    source,
                })?;
        } else {
            let parent = ensure_dir(&tree, dir).map_err(|source| LoadError::Insert {
                path: entry.name.clone(),
                source,
            })?;
            tree.add(parent, base, NodeInit::FileExisting(EntryMeta::from(&entry)))
                .map_err(|source| LoadError::Insert {
                    path: entry.name.clone(),
                    source,
                })?;
        }
    }
    debug!("loaded archive into {} nodes", tree.node_count());
    Ok(tree)
}

/// Resolves `dir`, synthesizing every missing ancestor directory segment by
/// segment. An ancestor that exists as a file is a structural error.
fn ensure_dir(tree: &TreeIndex, dir: &str) -> Result<u64, TreeError> {
    let mut cur = ROOT_INO;
    for segment in dir.split('/').filter(|s| !s.is_empty()) {
        let children = tree.children(cur)?;
        cur = match children.iter().find(|c| c.name == segment) {
            Some(child) if child.kind == FileKind::Directory => child.ino,
            Some(_) => return Err(TreeError::InvalidPath),
            None => {
                debug!("synthesizing directory {segment:?}");
                tree.add(cur, segment, NodeInit::Directory)?
            }
        };
    }
    Ok(cur)
}

fn normalize(name: &str) -> &str {
    let mut n = name;
    loop {
        if let Some(rest) = n.strip_prefix("./") {
            n = rest;
        } else if let Some(rest) = n.strip_prefix('/') {
            n = rest;
        } else {
            break;
        }
    }
    n.trim_end_matches('/')
}

fn split_base(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::StubSource;
    use crate::tree::index::NodeView;

    #[test]
    fn synthesizes_missing_ancestors() {
        let source = StubSource::new(vec![
            ("a/", b""),
            ("a/b.txt", b"bee"),
            ("c/d/e.txt", b"eee"),
        ]);
        let tree = build_tree(&source).unwrap();

        // root + a + b.txt + c + d + e.txt
        assert_eq!(tree.node_count(), 6);
        for (path, want_dir) in [
            ("a", true),
            ("a/b.txt", false),
            ("c", true),
            ("c/d", true),
            ("c/d/e.txt", false),
        ] {
            let ino = tree.resolve(path).unwrap();
            let view = tree.node(ino).unwrap();
            assert_eq!(view.ino(), ino, "path and inode lookup disagree for {path}");
            assert_eq!(
                matches!(view, NodeView::Directory { .. }),
                want_dir,
                "wrong kind for {path}"
            );
        }
    }

    #[test]
    fn path_and_inode_indices_agree_for_every_node() {
        let source = StubSource::new(vec![
            ("x/", b""),
            ("x/y/", b""),
            ("x/y/z.bin", b"zzz"),
            ("top.txt", b"t"),
        ]);
        let tree = build_tree(&source).unwrap();
        for path in ["x", "x/y", "x/y/z.bin", "top.txt"] {
            let by_path = tree.resolve(path).unwrap();
            assert_eq!(tree.node(by_path).unwrap().ino(), by_path);
        }
    }

    #[test]
    fn empty_archive_yields_bare_root() {
        let source = StubSource::new(vec![]);
        let tree = build_tree(&source).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert!(tree.children(ROOT_INO).unwrap().is_empty());
    }

    #[test]
    fn directory_record_without_parent_is_fatal() {
        let source = StubSource::new(vec![("missing/child/", b"")]);
        let err = build_tree(&source).unwrap_err();
        assert!(matches!(err, LoadError::MissingParent { .. }), "{err}");
    }

    #[test]
    fn duplicate_path_last_record_wins() {
        let source = StubSource::new(vec![("a/", b""), ("a/f.txt", b"one"), ("a/f.txt", b"three")]);
        let tree = build_tree(&source).unwrap();
        let ino = tree.resolve("a/f.txt").unwrap();
        match tree.node(ino).unwrap() {
            NodeView::FileExisting { entry, .. } => {
                assert_eq!(entry.size, 5);
                assert_eq!(entry.index, 2);
            }
            _ => panic!("expected a file node"),
        }
        let dir = tree.resolve("a").unwrap();
        assert_eq!(tree.children(dir).unwrap().len(), 1);
    }

    #[test]
    fn late_directory_record_keeps_indices_agreeing() {
        // the explicit c/ record lands after c was synthesized for the file
        let source = StubSource::new(vec![("c/d/e.txt", b"eee"), ("c/", b"")]);
        let tree = build_tree(&source).unwrap();

        // root + c + d + e.txt, and every path still reaches its node
        assert_eq!(tree.node_count(), 4);
        for path in ["c", "c/d", "c/d/e.txt"] {
            let ino = tree.resolve(path).unwrap();
            assert_eq!(tree.node(ino).unwrap().ino(), ino, "divergence at {path}");
        }
        let dir = tree.resolve("c").unwrap();
        assert_eq!(tree.children(dir).unwrap().len(), 1);
    }

    #[test]
    fn ancestor_that_is_a_file_aborts_the_load() {
        let source = StubSource::new(vec![("blocker", b"not a dir"), ("blocker/inner.txt", b"x")]);
        let err = build_tree(&source).unwrap_err();
        assert!(matches!(err, LoadError::Insert { .. }), "{err}");
    }

    #[test]
    fn leading_slashes_and_dot_segments_are_normalized() {
        let source = StubSource::new(vec![("./a/", b""), ("/a/b.txt", b"b")]);
        let tree = build_tree(&source).unwrap();
        assert!(tree.resolve("a/b.txt").is_ok());
    }
}
