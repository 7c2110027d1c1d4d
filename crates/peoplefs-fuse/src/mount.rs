//! Mounting and unmounting.

use fuser::{BackgroundSession, MountOption};
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

use crate::filesystem::PeopleFs;

/// Mount settings.
#[derive(Debug, Clone, Default)]
pub struct MountConfig {
    /// Let users other than the mounting one access the tree
    pub allow_other: bool,
}

impl MountConfig {
    /// FUSE options for this configuration. The mount is always read-only.
    pub fn options(&self) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::RO,
            MountOption::FSName("peoplefs".to_string()),
            MountOption::Subtype("peoplefs".to_string()),
            MountOption::DefaultPermissions,
            MountOption::NoExec,
        ];
        if self.allow_other {
            options.push(MountOption::AllowOther);
        }
        options
    }
}

/// Mount `fs` at `mountpoint` and serve it on a background thread.
///
/// Dropping the returned session unmounts.
pub fn spawn(
    fs: PeopleFs,
    mountpoint: &Path,
    config: &MountConfig,
) -> io::Result<BackgroundSession> {
    info!("Mounting at {:?}", mountpoint);
    fuser::spawn_mount2(fs, mountpoint, &config.options())
}

/// Unmount `mountpoint` with `fusermount3`, falling back to `fusermount`.
///
/// A mount point that is no longer mounted counts as success.
pub fn unmount(mountpoint: &Path) -> io::Result<()> {
    let output = Command::new("fusermount3")
        .arg("-u")
        .arg(mountpoint)
        .output()
        .or_else(|_| Command::new("fusermount").arg("-u").arg(mountpoint).output())?;

    if output.status.success() {
        debug!("Unmounted {:?}", mountpoint);
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if is_not_mounted(&stderr) {
        debug!("{:?} already unmounted", mountpoint);
        return Ok(());
    }

    warn!("fusermount failed for {:?}: {}", mountpoint, stderr.trim());
    Err(io::Error::other(format!(
        "fusermount -u {} failed: {}",
        mountpoint.display(),
        stderr.trim()
    )))
}

fn is_not_mounted(stderr: &str) -> bool {
    stderr.contains("not found") || stderr.contains("not mounted")
}
