use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use tarfs::archive::tar::TarSource;
use tarfs::fuse::ArchiveFs;
use tarfs::fuse::mount::mount_archive_unprivileged;

/// Mount a tar archive as a browsable filesystem.
#[derive(Parser, Debug)]
#[command(name = "tarfs", version, about)]
struct Cli {
    /// Path to the archive (.tar, .tar.gz or .tgz)
    archive: PathBuf,
    /// Empty directory to mount the archive on
    mount_point: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let source = TarSource::open(&cli.archive)
        .with_context(|| format!("failed to open archive {}", cli.archive.display()))?;
    let fs = ArchiveFs::load(source).context("failed to build the archive tree")?;
    info!(
        "loaded {} into {} nodes",
        cli.archive.display(),
        fs.tree().node_count()
    );

    let handle = mount_archive_unprivileged(fs, &cli.mount_point)
        .await
        .with_context(|| format!("failed to mount on {}", cli.mount_point.display()))?;
    info!(
        "mounted {} on {}; press Ctrl-C to unmount",
        cli.archive.display(),
        cli.mount_point.display()
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for Ctrl-C")?;
    info!("unmounting");
    handle.unmount().await.context("unmount failed")?;
    Ok(())
}
