// wpbackup/src/backup/archive.rs
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::path::{Path, PathBuf};
use tar::Builder;
use tempfile::Builder as TempFileBuilder;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::{AppError, Result};

/// Name of the SQL dump at the top level of every archive.
pub const DB_DUMP_ARCNAME: &str = "database.sql";
/// Top-level directory under which the whole site tree is stored.
pub const WP_DIR_ARCNAME: &str = "wp-root";

/// Creates the two-root `.tar.gz` backup archive.
///
/// The archive holds `dump_path` as [`DB_DUMP_ARCNAME`] and every entry of
/// `site_dir` re-rooted under [`WP_DIR_ARCNAME`]. It is assembled in a
/// temporary file next to `archive_path` and only renamed into place once the
/// gzip stream is complete, so a failure never leaves a truncated archive (or
/// clobbers an existing one).
pub fn create_site_archive(site_dir: &Path, dump_path: &Path, archive_path: &Path) -> Result<()> {
    if !site_dir.is_dir() {
        return Err(AppError::Precondition(format!(
            "Source for archival is not a directory: {}",
            site_dir.display()
        )));
    }

    let parent = match archive_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.exists() {
        fs::create_dir_all(&parent).map_err(|e| AppError::io(&parent, e))?;
    }

    info!("Creating archive: {}", archive_path.display());

    // The archive carries the site's database credentials; it keeps the
    // owner-only mode of the temporary file.
    let mut partial = TempFileBuilder::new()
        .prefix(".wpbackup-")
        .suffix(".tar.gz.part")
        .tempfile_in(&parent)
        .map_err(|e| AppError::io(&parent, e))?;
    let partial_path = partial.path().to_path_buf();
    let partial_canonical = fs::canonicalize(&partial_path).ok();

    let enc = GzEncoder::new(partial.as_file_mut(), Compression::default());
    let mut tar_builder = Builder::new(enc);
    tar_builder.follow_symlinks(false);

    info!(
        "Adding database dump \"{}\" to archive \"{}\"...",
        dump_path.display(),
        archive_path.display()
    );
    tar_builder
        .append_path_with_name(dump_path, DB_DUMP_ARCNAME)
        .map_err(|e| AppError::io(dump_path, e))?;

    info!(
        "Adding wordpress directory \"{}\" to archive \"{}\"...",
        site_dir.display(),
        archive_path.display()
    );
    let mut entries = 0usize;
    for entry in WalkDir::new(site_dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(site_dir).to_path_buf();
            AppError::io(path, e.into())
        })?;
        let path = entry.path();

        if entry.file_name() == partial_path.file_name().unwrap_or_default()
            && fs::canonicalize(path).ok() == partial_canonical
        {
            debug!("Skipping in-progress archive {}", path.display());
            continue;
        }

        let name = archive_name(site_dir, path)?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            tar_builder
                .append_dir(&name, path)
                .map_err(|e| AppError::io(path, e))?;
        } else if file_type.is_file() || file_type.is_symlink() {
            tar_builder
                .append_path_with_name(path, &name)
                .map_err(|e| AppError::io(path, e))?;
        } else {
            warn!("Skipping special file {}", path.display());
            continue;
        }
        debug!("Archived {} as {}", path.display(), name.display());
        entries += 1;
    }

    let encoder = tar_builder
        .into_inner()
        .map_err(|e| AppError::io(&partial_path, e))?;
    encoder.finish().map_err(|e| AppError::io(&partial_path, e))?;
    partial
        .as_file()
        .sync_all()
        .map_err(|e| AppError::io(&partial_path, e))?;

    partial
        .persist(archive_path)
        .map_err(|e| AppError::io(archive_path, e.error))?;

    info!(
        "✓ Archive created at {} ({} site entries)",
        archive_path.display(),
        entries
    );
    Ok(())
}

/// `site_dir/a/b` becomes `wp-root/a/b`; `site_dir` itself becomes `wp-root`.
fn archive_name(site_dir: &Path, path: &Path) -> Result<PathBuf> {
    let relative = path.strip_prefix(site_dir).map_err(|_| {
        AppError::Precondition(format!(
            "Walked path {} is outside {}",
            path.display(),
            site_dir.display()
        ))
    })?;
    Ok(Path::new(WP_DIR_ARCNAME).join(relative))
}
