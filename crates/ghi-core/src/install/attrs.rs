use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt, lchown};
use std::path::Path;

use nix::unistd::{Gid, Uid, getegid, geteuid};

use super::InstallError;
use crate::rules::MoveRule;

/// Ownership and permissions to stamp onto an installed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    /// Owner; defaults to the effective user.
    pub owner: Uid,
    /// Group; defaults to the effective group.
    pub group: Gid,
    /// Permission bits; existing bits are kept when unset.
    pub mode: Option<u32>,
}

impl Attributes {
    /// Attributes configured on `rule`, with process defaults filled in.
    pub fn for_rule(rule: &MoveRule) -> Self {
        Self {
            owner: rule.owner().unwrap_or_else(geteuid),
            group: rule.group().unwrap_or_else(getegid),
            mode: rule.mode(),
        }
    }
}

/// Apply `attrs` to `root` and, if it is a directory, to every descendant.
///
/// The tree is listed first with an explicit worklist, then updated
/// children-before-parents, so a mode without the search bit never locks the
/// walk out of a directory. Symlinks are re-owned without following them and
/// never have their mode changed.
///
/// Ownership and mode are only written when they differ from what is on disk.
///
/// # Errors
///
/// Returns [`InstallError::Io`] for the first path that cannot be read or
/// updated.
pub fn apply_recursive(root: &Path, attrs: Attributes) -> Result<(), InstallError> {
    let mut pending = vec![root.to_path_buf()];
    let mut listed = Vec::new();

    while let Some(path) = pending.pop() {
        let meta = fs::symlink_metadata(&path).map_err(|e| InstallError::io(&path, e))?;

        if meta.is_dir() {
            for child in fs::read_dir(&path).map_err(|e| InstallError::io(&path, e))? {
                pending.push(child.map_err(|e| InstallError::io(&path, e))?.path());
            }
        }

        listed.push((path, meta));
    }

    for (path, meta) in listed.iter().rev() {
        apply_one(path, meta, attrs)?;
    }

    Ok(())
}

fn apply_one(path: &Path, meta: &fs::Metadata, attrs: Attributes) -> Result<(), InstallError> {
    let (uid, gid) = (attrs.owner.as_raw(), attrs.group.as_raw());
    if meta.uid() != uid || meta.gid() != gid {
        tracing::debug!("chown {uid}:{gid} {}", path.display());
        lchown(path, Some(uid), Some(gid)).map_err(|e| InstallError::io(path, e))?;
    }

    if let Some(mode) = attrs.mode {
        if !meta.file_type().is_symlink() && meta.mode() & 0o7777 != mode {
            tracing::debug!("chmod {mode:o} {}", path.display());
            fs::set_permissions(path, fs::Permissions::from_mode(mode))
                .map_err(|e| InstallError::io(path, e))?;
        }
    }

    Ok(())
}
