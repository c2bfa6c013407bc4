//! Inode derivation.
//!
//! Inodes are derived, not handed out from a counter: the same
//! `(parent, name)` pair always maps to the same 64-bit value, so an inode
//! returned to the kernel during lookup stays valid for the life of the
//! mount without any allocation table.

/// Reserved root inode, fixed by the FUSE protocol.
pub const ROOT_INO: u64 = 1;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over the parent inode and the base name. Never returns 0 (invalid
/// on the wire) or [`ROOT_INO`].
pub fn derive_ino(parent: u64, name: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in parent.to_be_bytes() {
        hash = (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME);
    }
    hash = (hash ^ u64::from(b'/')).wrapping_mul(FNV_PRIME);
    for &b in name.as_bytes() {
        hash = (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME);
    }
    if hash <= ROOT_INO {
        hash.wrapping_add(2)
    } else {
        hash
    }
}
