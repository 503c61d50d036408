use std::fs::{self, File};
use std::io::{BufRead, BufReader, ErrorKind};
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::attrs::{Attributes, apply_recursive};
use super::plan::{ValidatedPlan, target_in};
use super::{ClassifiedEntry, InstallError};
use crate::Reporter;

/// One source and where it lands.
struct Step<'a> {
    entry: &'a ClassifiedEntry,
    target: PathBuf,
    attrs: Attributes,
    differs: bool,
}

/// How a path reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Moved {
    Renamed,
    Copied,
}

impl ValidatedPlan {
    /// Perform every move in the plan.
    ///
    /// Sources bound for an existing directory are moved into it by base name
    /// and always count as a change. A source bound for a file path is moved
    /// onto it, replacing any existing file; it counts as a change only if
    /// the path is new or its bytes differ.
    ///
    /// Ownership and mode from each rule are stamped onto the sources while
    /// they are still in the scratch tree, before the first move, so a
    /// failure there leaves every destination untouched. A rename carries
    /// the attributes along; a cross-device copy has them applied again.
    ///
    /// # Errors
    ///
    /// Returns an error if an attribute update or a move fails.
    pub fn execute(self, reporter: &dyn Reporter) -> Result<bool, InstallError> {
        let steps = self.steps()?;

        for step in &steps {
            apply_recursive(&step.entry.source, step.attrs)?;
        }

        let mut changed = false;
        for step in &steps {
            if !step.differs {
                tracing::debug!("{} is unchanged", step.target.display());
            }
            if move_path(&step.entry.source, &step.target)? == Moved::Copied {
                apply_recursive(&step.target, step.attrs)?;
            }
            tracing::info!("Installed {} -> {}", step.entry.relative, step.target.display());
            reporter.installed(&step.target);
            changed |= step.differs;
        }

        Ok(changed)
    }

    /// Resolve final paths and compare content while nothing has moved yet.
    fn steps(&self) -> Result<Vec<Step<'_>>, InstallError> {
        let mut steps = Vec::new();

        for (dst, entries) in &self.moves {
            let into_dir = dst.is_dir();
            for entry in entries {
                let (target, differs) = if into_dir {
                    (target_in(dst, &entry.source), true)
                } else if fs::symlink_metadata(dst).is_ok() {
                    (dst.clone(), !same_content(&entry.source, dst)?)
                } else {
                    (dst.clone(), true)
                };
                steps.push(Step {
                    entry,
                    target,
                    attrs: Attributes::for_rule(&entry.rule),
                    differs,
                });
            }
        }

        Ok(steps)
    }
}

/// Rename `src` to `dst`, copying across filesystems when a rename cannot.
fn move_path(src: &Path, dst: &Path) -> Result<Moved, InstallError> {
    let move_err = |message: String| InstallError::Move {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        message,
    };

    match fs::rename(src, dst) {
        Ok(()) => Ok(Moved::Renamed),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            tracing::debug!("Cross-device move of {}", src.display());
            let file_type = fs::symlink_metadata(src)
                .map_err(|e| InstallError::io(src, e))?
                .file_type();

            // A rename would have replaced the old file; a copy must not write through it.
            if fs::symlink_metadata(dst).is_ok_and(|m| !m.is_dir()) {
                fs::remove_file(dst).map_err(|e| InstallError::io(dst, e))?;
            }

            if file_type.is_dir() {
                copy_tree(src, dst)?;
                fs::remove_dir_all(src).map_err(|e| InstallError::io(src, e))?;
            } else if file_type.is_symlink() {
                copy_link(src, dst)?;
                fs::remove_file(src).map_err(|e| InstallError::io(src, e))?;
            } else {
                let options = fs_extra::file::CopyOptions::new().overwrite(true);
                fs_extra::file::move_file(src, dst, &options).map_err(|e| move_err(e.to_string()))?;
            }
            Ok(Moved::Copied)
        }
        Err(e) => Err(move_err(e.to_string())),
    }
}

/// Recreate the symlink `src` at `dst` with the same target.
fn copy_link(src: &Path, dst: &Path) -> Result<(), InstallError> {
    let link = fs::read_link(src).map_err(|e| InstallError::io(src, e))?;
    symlink(&link, dst).map_err(|e| InstallError::io(dst, e))
}

/// Copy the directory `src` to the new path `dst`, keeping symlinks as links.
///
/// Directory permissions are copied last, deepest first, so a read-only
/// directory can still be filled.
fn copy_tree(src: &Path, dst: &Path) -> Result<(), InstallError> {
    let mut dirs = Vec::new();

    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).unwrap_or(Path::new(""));
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir(&target).map_err(|e| InstallError::io(&target, e))?;
            dirs.push((entry.path().to_path_buf(), target));
        } else if file_type.is_symlink() {
            copy_link(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| InstallError::io(&target, e))?;
        }
    }

    for (from, to) in dirs.iter().rev() {
        let perms = fs::metadata(from).map_err(|e| InstallError::io(from, e))?.permissions();
        fs::set_permissions(to, perms).map_err(|e| InstallError::io(to, e))?;
    }

    Ok(())
}

/// Byte-for-byte comparison. Anything that is not a pair of regular files differs.
fn same_content(a: &Path, b: &Path) -> Result<bool, InstallError> {
    let (Ok(meta_a), Ok(meta_b)) = (fs::metadata(a), fs::metadata(b)) else {
        return Ok(false);
    };
    if !meta_a.is_file() || !meta_b.is_file() || meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(a).map_err(|e| InstallError::io(a, e))?);
    let mut reader_b = BufReader::new(File::open(b).map_err(|e| InstallError::io(b, e))?);

    loop {
        let buf_a = reader_a.fill_buf().map_err(|e| InstallError::io(a, e))?;
        let buf_b = reader_b.fill_buf().map_err(|e| InstallError::io(b, e))?;
        if buf_a.is_empty() && buf_b.is_empty() {
            return Ok(true);
        }

        let n = buf_a.len().min(buf_b.len());
        if n == 0 || buf_a[..n] != buf_b[..n] {
            return Ok(false);
        }
        reader_a.consume(n);
        reader_b.consume(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::{MetadataExt, PermissionsExt};
    use tempfile::tempdir;

    fn mode_of(path: &Path) -> u32 {
        fs::symlink_metadata(path).unwrap().mode() & 0o7777
    }

    #[test]
    fn test_same_content() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        let c = tmp.path().join("c");
        let big: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&a, &big).unwrap();
        fs::write(&b, &big).unwrap();
        let mut other = big.clone();
        other[99_999] ^= 1;
        fs::write(&c, &other).unwrap();

        assert!(same_content(&a, &b).unwrap());
        assert!(!same_content(&a, &c).unwrap());
        assert!(!same_content(&a, tmp.path()).unwrap());
        assert!(!same_content(&a, &tmp.path().join("missing")).unwrap());
    }

    #[test]
    fn test_move_path_renames_directory() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("inner")).unwrap();
        fs::write(src.join("inner/f"), "f").unwrap();
        let dst = tmp.path().join("dst");

        assert_eq!(move_path(&src, &dst).unwrap(), Moved::Renamed);
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dst.join("inner/f")).unwrap(), "f");
    }

    #[test]
    fn test_move_path_failure_is_reported() {
        let tmp = tempdir().unwrap();
        let err = move_path(&tmp.path().join("missing"), &tmp.path().join("dst")).unwrap_err();
        assert!(matches!(err, InstallError::Move { .. }));
    }

    #[test]
    fn test_copy_tree_keeps_links_and_modes() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("bin")).unwrap();
        fs::write(src.join("bin/real-tool"), "elf").unwrap();
        fs::set_permissions(src.join("bin/real-tool"), fs::Permissions::from_mode(0o751)).unwrap();
        symlink("real-tool", src.join("bin/tool")).unwrap();
        symlink("nowhere", src.join("dangling")).unwrap();
        fs::set_permissions(src.join("bin"), fs::Permissions::from_mode(0o555)).unwrap();

        let dst = tmp.path().join("dst");
        copy_tree(&src, &dst).unwrap();

        assert_eq!(fs::read_link(dst.join("bin/tool")).unwrap(), Path::new("real-tool"));
        assert_eq!(fs::read_link(dst.join("dangling")).unwrap(), Path::new("nowhere"));
        assert_eq!(fs::read(dst.join("bin/real-tool")).unwrap(), b"elf");
        assert_eq!(mode_of(&dst.join("bin/real-tool")), 0o751);
        assert_eq!(mode_of(&dst.join("bin")), 0o555);

        for dir in [&src, &dst] {
            fs::set_permissions(dir.join("bin"), fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    /// A tmpfs directory on another device than the default temp dir, if any.
    fn other_device(than: &Path) -> Option<tempfile::TempDir> {
        let shm = Path::new("/dev/shm");
        let dev = |p: &Path| fs::metadata(p).ok().map(|m| m.dev());
        if dev(shm)? == dev(than)? {
            return None;
        }
        tempfile::tempdir_in(shm).ok()
    }

    #[test]
    fn test_cross_device_move_keeps_symlinks() {
        let disk = tempdir().unwrap();
        let Some(shm) = other_device(disk.path()) else {
            eprintln!("no second filesystem at /dev/shm; skipping");
            return;
        };

        fs::write(shm.path().join("real-tool"), "elf").unwrap();
        symlink("real-tool", shm.path().join("tool")).unwrap();
        let tree = shm.path().join("pkg");
        fs::create_dir_all(tree.join("bin")).unwrap();
        fs::write(tree.join("bin/real"), "x").unwrap();
        symlink("real", tree.join("bin/link")).unwrap();

        let link_dst = disk.path().join("tool");
        fs::write(&link_dst, "old").unwrap();
        assert_eq!(move_path(&shm.path().join("tool"), &link_dst).unwrap(), Moved::Copied);
        assert!(fs::symlink_metadata(&link_dst).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link_dst).unwrap(), Path::new("real-tool"));
        assert!(fs::symlink_metadata(shm.path().join("tool")).is_err());

        let tree_dst = disk.path().join("pkg");
        assert_eq!(move_path(&tree, &tree_dst).unwrap(), Moved::Copied);
        assert_eq!(fs::read_link(tree_dst.join("bin/link")).unwrap(), Path::new("real"));
        assert_eq!(fs::read(tree_dst.join("bin/real")).unwrap(), b"x");
        assert!(!tree.exists());
    }
}
