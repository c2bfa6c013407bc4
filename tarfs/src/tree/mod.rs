//! Archive-to-tree translation.
//!
//! `ino` derives stable 64-bit identifiers, `index` owns the dual-indexed
//! node arena (path walk + flat inode map), and `loader` materializes the
//! arena from the archive's flat entry list in a single pass.

pub mod index;
pub mod ino;
pub mod loader;
