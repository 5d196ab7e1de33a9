// wpbackup/src/restore/extract.rs
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, info, warn};

use crate::backup::archive::{DB_DUMP_ARCNAME, WP_DIR_ARCNAME};
use crate::errors::{AppError, Result};

/// Unpacks a backup archive: the site tree into `target_site_dir`, the dump
/// into `working_area`.
///
/// `target_site_dir` must not exist; an existing installation is never
/// overwritten. Entries under `wp-root/` are written with that first
/// component removed, `database.sql` is the dump, anything else is ignored.
/// An archive lacking either root is rejected, and whatever was extracted
/// into the (new) target directory is removed again on any failure.
///
/// Returns the path of the extracted dump.
pub fn extract_site_archive(
    archive_path: &Path,
    target_site_dir: &Path,
    working_area: &Path,
) -> Result<PathBuf> {
    if target_site_dir.symlink_metadata().is_ok() {
        return Err(AppError::Precondition(format!(
            "Wordpress is already installed at {}; refusing to overwrite it",
            target_site_dir.display()
        )));
    }

    info!("Opening archive: {}", archive_path.display());
    let archive_file = File::open(archive_path).map_err(|e| AppError::io(archive_path, e))?;

    fs::create_dir_all(target_site_dir).map_err(|e| AppError::io(target_site_dir, e))?;

    let result = unpack_entries(archive_file, archive_path, target_site_dir, working_area);
    if result.is_err() {
        if let Err(e) = fs::remove_dir_all(target_site_dir) {
            warn!(
                "Could not remove partially restored {}: {}",
                target_site_dir.display(),
                e
            );
        }
    }
    result
}

fn unpack_entries(
    archive_file: File,
    archive_path: &Path,
    target_site_dir: &Path,
    working_area: &Path,
) -> Result<PathBuf> {
    let target_root = fs::canonicalize(target_site_dir).map_err(|e| AppError::io(target_site_dir, e))?;

    let mut archive = Archive::new(GzDecoder::new(archive_file));
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);

    info!(
        "Extracting wordpress directory \"{}\" to \"{}\"...",
        WP_DIR_ARCNAME,
        target_site_dir.display()
    );

    let mut site_entries = 0usize;
    let mut dump_path = None;
    let mut directories = Vec::new();

    for entry in archive.entries().map_err(|e| AppError::io(archive_path, e))? {
        let mut entry = entry.map_err(|e| AppError::io(archive_path, e))?;
        let entry_path = entry
            .path()
            .map_err(|e| AppError::io(archive_path, e))?
            .into_owned();
        let entry_type = entry.header().entry_type();

        if let Some(relative) = site_relative_path(&entry_path)? {
            let dest = target_site_dir.join(&relative);
            if entry_type.is_dir() {
                create_dir_within(&target_root, &dest)?;
                directories.push((dest.clone(), entry.header().mode().ok()));
            } else {
                create_dir_within(&target_root, dest.parent().unwrap_or(target_site_dir))?;
                if entry_type == EntryType::Link {
                    link_within_site(&entry, target_site_dir, &dest)?;
                } else {
                    entry.unpack(&dest).map_err(|e| AppError::io(&dest, e))?;
                }
            }
            debug!("Extracted {} to {}", entry_path.display(), dest.display());
            site_entries += 1;
        } else if entry_path == Path::new(DB_DUMP_ARCNAME) {
            if !entry_type.is_file() {
                return Err(AppError::Structure(format!(
                    "{} in {} is not a regular file",
                    DB_DUMP_ARCNAME,
                    archive_path.display()
                )));
            }
            let dest = working_area.join(DB_DUMP_ARCNAME);
            info!(
                "Extracting database dump \"{}\" to \"{}\"...",
                DB_DUMP_ARCNAME,
                working_area.display()
            );
            entry.unpack(&dest).map_err(|e| AppError::io(&dest, e))?;
            dump_path = Some(dest);
        } else {
            debug!("Ignoring archive entry {}", entry_path.display());
        }
    }

    if site_entries == 0 {
        return Err(AppError::Structure(format!(
            "{} contains no entries under {}/",
            archive_path.display(),
            WP_DIR_ARCNAME
        )));
    }
    let dump_path = dump_path.ok_or_else(|| {
        AppError::Structure(format!(
            "{} does not contain {}",
            archive_path.display(),
            DB_DUMP_ARCNAME
        ))
    })?;

    // Deepest first, so a read-only parent is locked only after its children.
    for (dir, mode) in directories.iter().rev() {
        if let Some(mode) = mode {
            set_dir_mode(dir, *mode)?;
        }
    }

    info!(
        "✓ Extracted {} site entries to {}",
        site_entries,
        target_site_dir.display()
    );
    Ok(dump_path)
}

/// `wp-root/a/b` maps to `a/b`. Paths outside `wp-root/`, and `wp-root`
/// itself, map to `None`. A remainder that could escape the target is a
/// structural error.
fn site_relative_path(entry_path: &Path) -> Result<Option<PathBuf>> {
    let mut components = entry_path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == WP_DIR_ARCNAME => {}
        _ => return Ok(None),
    }

    let relative = components.as_path();
    if relative.as_os_str().is_empty() {
        return Ok(None);
    }
    if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(AppError::Structure(format!(
            "Archive entry {} escapes {}/",
            entry_path.display(),
            WP_DIR_ARCNAME
        )));
    }
    Ok(Some(relative.to_path_buf()))
}

/// Creates `dir`, refusing to follow an already extracted symlink out of the target.
fn create_dir_within(target_root: &Path, dir: &Path) -> Result<()> {
    let mut existing = dir;
    while existing.symlink_metadata().is_err() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => break,
        }
    }
    ensure_within(target_root, existing)?;
    fs::create_dir_all(dir).map_err(|e| AppError::io(dir, e))?;
    ensure_within(target_root, dir)
}

fn ensure_within(target_root: &Path, path: &Path) -> Result<()> {
    let resolved = fs::canonicalize(path).map_err(|e| AppError::io(path, e))?;
    if !resolved.starts_with(target_root) {
        return Err(AppError::Structure(format!(
            "{} resolves outside the restore target",
            path.display()
        )));
    }
    Ok(())
}

/// Hard links name their source by archive path (`wp-root/...`), which has to
/// be remapped the same way as the entry itself.
fn link_within_site<R: std::io::Read>(
    entry: &tar::Entry<'_, R>,
    target_site_dir: &Path,
    dest: &Path,
) -> Result<()> {
    let link_name = entry
        .link_name()
        .map_err(|e| AppError::io(dest, e))?
        .ok_or_else(|| AppError::Structure(format!("Hard link {} has no source", dest.display())))?;
    let source = site_relative_path(&link_name)?.ok_or_else(|| {
        AppError::Structure(format!(
            "Hard link {} points outside {}/",
            dest.display(),
            WP_DIR_ARCNAME
        ))
    })?;
    let source = target_site_dir.join(source);
    fs::hard_link(&source, dest).map_err(|e| AppError::io(dest, e))
}

#[cfg(unix)]
fn set_dir_mode(dir: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, fs::Permissions::from_mode(mode & 0o7777)).map_err(|e| AppError::io(dir, e))
}

#[cfg(not(unix))]
fn set_dir_mode(_dir: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tar::{Builder, Header};

    enum Item<'a> {
        Dir(&'a str, u32),
        File(&'a str, &'a str, u32),
        HardLink(&'a str, &'a str),
    }

    /// Writes entry names verbatim (bypassing the builder's path checks) so
    /// malformed archives can be produced too.
    fn write_archive(path: &Path, items: &[Item<'_>]) -> anyhow::Result<()> {
        let mut builder = Builder::new(GzEncoder::new(File::create(path)?, Compression::default()));
        for item in items {
            let mut header = Header::new_gnu();
            let (name, data): (&str, &[u8]) = match *item {
                Item::Dir(name, mode) => {
                    header.set_entry_type(EntryType::Directory);
                    header.set_mode(mode);
                    header.set_size(0);
                    (name, &[] as &[u8])
                }
                Item::File(name, contents, mode) => {
                    header.set_entry_type(EntryType::Regular);
                    header.set_mode(mode);
                    header.set_size(contents.len() as u64);
                    (name, contents.as_bytes())
                }
                Item::HardLink(name, source) => {
                    header.set_entry_type(EntryType::Link);
                    header.set_mode(0o644);
                    header.set_size(0);
                    header.set_link_name(source)?;
                    (name, &[] as &[u8])
                }
            };
            let raw_name = &mut header.as_old_mut().name;
            raw_name[..name.len()].copy_from_slice(name.as_bytes());
            header.set_cksum();
            builder.append(&header, data)?;
        }
        builder.into_inner()?.finish()?;
        Ok(())
    }

    fn well_formed(path: &Path) -> anyhow::Result<()> {
        write_archive(
            path,
            &[
                Item::File("database.sql", "CREATE TABLE wp_users (ID int);\n", 0o644),
                Item::Dir("wp-root", 0o755),
                Item::File("wp-root/wp-config.php", "<?php\n", 0o640),
                Item::Dir("wp-root/wp-content", 0o755),
                Item::File("wp-root/wp-content/uploads/a.txt", "upload", 0o644),
            ],
        )
    }

    #[test]
    fn test_site_relative_path_strips_exactly_the_prefix() -> anyhow::Result<()> {
        assert_eq!(
            site_relative_path(Path::new("wp-root/wp-content/themes/x.css"))?,
            Some(PathBuf::from("wp-content/themes/x.css"))
        );
        assert_eq!(site_relative_path(Path::new("wp-root/wp-root/a"))?, Some(PathBuf::from("wp-root/a")));
        assert_eq!(site_relative_path(Path::new("wp-root"))?, None);
        assert_eq!(site_relative_path(Path::new("wp-root/"))?, None);
        assert_eq!(site_relative_path(Path::new("wp-rootx/a"))?, None);
        assert_eq!(site_relative_path(Path::new("database.sql"))?, None);
        assert!(matches!(
            site_relative_path(Path::new("wp-root/../etc/passwd")),
            Err(AppError::Structure(_))
        ));
        Ok(())
    }

    #[test]
    fn test_extracts_site_tree_and_dump() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let archive_path = scratch.path().join("site.tar.gz");
        well_formed(&archive_path)?;
        let target = scratch.path().join("html");
        let work = tempfile::tempdir()?;

        let dump = extract_site_archive(&archive_path, &target, work.path())?;

        assert_eq!(dump, work.path().join("database.sql"));
        assert_eq!(fs::read_to_string(&dump)?, "CREATE TABLE wp_users (ID int);\n");
        assert_eq!(fs::read_to_string(target.join("wp-config.php"))?, "<?php\n");
        assert_eq!(fs::read_to_string(target.join("wp-content/uploads/a.txt"))?, "upload");
        assert!(!target.join("wp-root").exists());
        assert!(!target.join("database.sql").exists());
        Ok(())
    }

    #[test]
    fn test_existing_target_is_left_untouched() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let archive_path = scratch.path().join("site.tar.gz");
        well_formed(&archive_path)?;
        let target = scratch.path().join("html");
        fs::create_dir(&target)?;
        fs::write(target.join("index.html"), "live site")?;
        let work = tempfile::tempdir()?;

        let result = extract_site_archive(&archive_path, &target, work.path());

        assert!(matches!(result, Err(AppError::Precondition(_))));
        assert_eq!(fs::read_dir(&target)?.count(), 1);
        assert_eq!(fs::read_to_string(target.join("index.html"))?, "live site");
        assert_eq!(fs::read_dir(work.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_missing_dump_is_structural_error() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let archive_path = scratch.path().join("site.tar.gz");
        write_archive(&archive_path, &[Item::File("wp-root/index.php", "<?php\n", 0o644)])?;
        let target = scratch.path().join("html");
        let work = tempfile::tempdir()?;

        let result = extract_site_archive(&archive_path, &target, work.path());

        assert!(matches!(result, Err(AppError::Structure(_))));
        assert!(!target.exists());
        Ok(())
    }

    #[test]
    fn test_missing_site_root_is_structural_error() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let archive_path = scratch.path().join("site.tar.gz");
        write_archive(
            &archive_path,
            &[
                Item::File("database.sql", "SELECT 1;\n", 0o644),
                Item::Dir("wp-root", 0o755),
                Item::File("html/index.php", "<?php\n", 0o644),
            ],
        )?;
        let target = scratch.path().join("html");
        let work = tempfile::tempdir()?;

        let result = extract_site_archive(&archive_path, &target, work.path());

        assert!(matches!(result, Err(AppError::Structure(_))));
        assert!(!target.exists());
        Ok(())
    }

    #[test]
    fn test_unrelated_entries_are_ignored() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let archive_path = scratch.path().join("site.tar.gz");
        write_archive(
            &archive_path,
            &[
                Item::File("README", "notes", 0o644),
                Item::File("wp-rootx/stray.php", "<?php\n", 0o644),
                Item::File("database.sql", "SELECT 1;\n", 0o644),
                Item::File("wp-root/index.php", "<?php\n", 0o644),
            ],
        )?;
        let target = scratch.path().join("html");
        let work = tempfile::tempdir()?;

        extract_site_archive(&archive_path, &target, work.path())?;

        let names: Vec<_> = fs::read_dir(&target)?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::result::Result<_, _>>()?;
        assert_eq!(names, vec!["index.php".to_string()]);
        assert!(!scratch.path().join("README").exists());
        Ok(())
    }

    #[test]
    fn test_traversal_entry_is_rejected() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let archive_path = scratch.path().join("site.tar.gz");
        write_archive(
            &archive_path,
            &[
                Item::File("database.sql", "SELECT 1;\n", 0o644),
                Item::File("wp-root/../escaped.txt", "gotcha", 0o644),
            ],
        )?;
        let target = scratch.path().join("html");
        let work = tempfile::tempdir()?;

        let result = extract_site_archive(&archive_path, &target, work.path());

        assert!(matches!(result, Err(AppError::Structure(_))));
        assert!(!scratch.path().join("escaped.txt").exists());
        assert!(!target.exists());
        Ok(())
    }

    #[test]
    fn test_hard_links_are_remapped() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let archive_path = scratch.path().join("site.tar.gz");
        write_archive(
            &archive_path,
            &[
                Item::File("database.sql", "SELECT 1;\n", 0o644),
                Item::File("wp-root/original.txt", "shared", 0o644),
                Item::HardLink("wp-root/copy.txt", "wp-root/original.txt"),
            ],
        )?;
        let target = scratch.path().join("html");
        let work = tempfile::tempdir()?;

        extract_site_archive(&archive_path, &target, work.path())?;

        assert_eq!(fs::read_to_string(target.join("copy.txt"))?, "shared");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_restored_after_children() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let scratch = tempfile::tempdir()?;
        let archive_path = scratch.path().join("site.tar.gz");
        write_archive(
            &archive_path,
            &[
                Item::File("database.sql", "SELECT 1;\n", 0o644),
                Item::Dir("wp-root/locked", 0o555),
                Item::File("wp-root/locked/secret.php", "<?php\n", 0o600),
            ],
        )?;
        let target = scratch.path().join("html");
        let work = tempfile::tempdir()?;

        extract_site_archive(&archive_path, &target, work.path())?;

        let dir_mode = fs::metadata(target.join("locked"))?.permissions().mode() & 0o777;
        let file_mode = fs::metadata(target.join("locked/secret.php"))?.permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o555);
        assert_eq!(file_mode, 0o600);

        // Let the tempdir clean up.
        fs::set_permissions(target.join("locked"), fs::Permissions::from_mode(0o755))?;
        Ok(())
    }
}
