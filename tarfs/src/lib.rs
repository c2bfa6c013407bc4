//! tarfs: expose a tar archive as a mounted, browsable directory tree.
//!
//! The crate is split the way the mount pipeline flows: `archive` provides
//! the flat entry list and per-entry content streams, `tree` turns that list
//! into a dual-indexed node arena with synthesized intermediate directories,
//! and `fuse` serves the kernel filesystem callbacks against the arena.

pub mod archive;
pub mod fuse;
pub mod tree;
