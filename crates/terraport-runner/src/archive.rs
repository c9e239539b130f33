//! Template archive unpacking.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::{RunnerError, RunnerResult};

/// Unpack a zip archive into a fresh directory.
///
/// Any existing content at `dest` is removed first. Entries whose paths
/// would land outside `dest` are rejected.
pub async fn unpack(archive: &Path, dest: &Path) -> RunnerResult<()> {
    let archive = archive.to_owned();
    let dest = dest.to_owned();

    tokio::task::spawn_blocking(move || unpack_blocking(&archive, &dest))
        .await
        .map_err(|e| RunnerError::Config(format!("unpack task failed: {e}")))?
}

fn unpack_blocking(archive: &Path, dest: &Path) -> RunnerResult<()> {
    let file = File::open(archive).map_err(|e| RunnerError::unpack(archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| RunnerError::unpack(archive, e))?;

    match std::fs::remove_dir_all(dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(RunnerError::unpack(archive, e)),
    }
    std::fs::create_dir_all(dest).map_err(|e| RunnerError::unpack(archive, e))?;

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| RunnerError::unpack(archive, e))?;

        let relative: PathBuf = entry.enclosed_name().ok_or_else(|| {
            RunnerError::unpack(archive, format!("entry escapes archive root: {}", entry.name()))
        })?;
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| RunnerError::unpack(archive, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RunnerError::unpack(archive, e))?;
        }
        let mut out = File::create(&target).map_err(|e| RunnerError::unpack(archive, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| RunnerError::unpack(archive, e))?;
    }

    debug!(entries = zip.len(), dest = %dest.display(), "template unpacked");
    Ok(())
}
