//! FUSE session setup for a loaded archive.
//!
//! Mounting goes through `fusermount3`, so no root privileges are needed,
//! but that path only exists on Linux; other targets get an explicit
//! `Unsupported` error instead of a half-working mount.

use std::path::Path;

use rfuse3::MountOptions;

use crate::archive::ArchiveSource;
use crate::fuse::ArchiveFs;

fn session_options() -> MountOptions {
    let uid = unsafe { libc::getuid() };
    let gid = unsafe { libc::getgid() };
    let mut options = MountOptions::default();
    // owned by the mounting user; allow_other stays off
    options.fs_name("tarfs").uid(uid).gid(gid);
    options
}

/// Mounts a loaded [`ArchiveFs`] on the given empty directory and returns
/// the handle used to unmount it.
#[cfg(target_os = "linux")]
pub async fn mount_archive_unprivileged<S: ArchiveSource>(
    fs: ArchiveFs<S>,
    mount_point: impl AsRef<Path>,
) -> std::io::Result<rfuse3::raw::MountHandle> {
    rfuse3::raw::Session::new(session_options())
        .mount_with_unprivileged(fs, mount_point)
        .await
}

#[cfg(not(target_os = "linux"))]
pub async fn mount_archive_unprivileged<S: ArchiveSource>(
    _fs: ArchiveFs<S>,
    _mount_point: impl AsRef<Path>,
) -> std::io::Result<rfuse3::raw::MountHandle> {
    let _ = session_options();
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "tarfs can only mount archives on Linux hosts with fusermount3",
    ))
}
