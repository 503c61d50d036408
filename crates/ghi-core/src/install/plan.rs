use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{ClassifiedEntry, Conflict};

/// Pending moves grouped by destination. Not yet checked against the filesystem.
#[derive(Debug, Clone)]
pub struct MovePlan {
    pub(super) moves: BTreeMap<PathBuf, Vec<ClassifiedEntry>>,
}

/// A plan whose destinations passed [`MovePlan::check`]. Only this type can be executed.
#[derive(Debug)]
pub struct ValidatedPlan {
    pub(super) moves: BTreeMap<PathBuf, Vec<ClassifiedEntry>>,
}

impl MovePlan {
    /// Group classified entries by their rule's destination.
    pub fn new(entries: Vec<ClassifiedEntry>) -> Self {
        let mut moves: BTreeMap<PathBuf, Vec<ClassifiedEntry>> = BTreeMap::new();
        for entry in entries {
            moves
                .entry(entry.rule.dst().to_path_buf())
                .or_default()
                .push(entry);
        }
        Self { moves }
    }

    /// Destinations in the plan, in sorted order.
    pub fn destinations(&self) -> impl Iterator<Item = &Path> {
        self.moves.keys().map(PathBuf::as_path)
    }

    /// Sources assigned to `dst`.
    pub fn sources(&self, dst: &Path) -> Vec<&Path> {
        self.moves
            .get(dst)
            .map(|entries| entries.iter().map(|e| e.source.as_path()).collect())
            .unwrap_or_default()
    }

    /// Look for destination conflicts without modifying anything.
    ///
    /// A destination that is an existing directory receives its sources by
    /// base name; a source directory may not land on an existing path there,
    /// and a source file may not land on an existing directory. Any other
    /// destination is a target path and takes exactly one source; its parent
    /// must exist and a directory may not replace an existing file.
    ///
    /// # Errors
    ///
    /// Returns the first [`Conflict`] found, in destination order.
    pub fn check(&self) -> Result<(), Conflict> {
        for (dst, entries) in &self.moves {
            if dst.is_dir() {
                for entry in entries {
                    let target = target_in(dst, &entry.source);
                    let existing = std::fs::symlink_metadata(&target).ok();
                    match existing {
                        Some(_) if entry.is_dir => return Err(Conflict::DirectoryExists(target)),
                        Some(meta) if meta.is_dir() => {
                            return Err(Conflict::FileOntoDirectory(target));
                        }
                        _ => {}
                    }
                }
                continue;
            }

            let [entry] = entries.as_slice() else {
                return Err(Conflict::MultipleSources(dst.clone()));
            };

            if std::fs::symlink_metadata(dst).is_ok() {
                if entry.is_dir {
                    return Err(Conflict::FileExists(dst.clone()));
                }
            } else {
                let parent = dst.parent().unwrap_or(Path::new("/"));
                if !parent.is_dir() {
                    return Err(Conflict::MissingParent(parent.to_path_buf()));
                }
            }
        }
        Ok(())
    }

    /// Check the plan and, if clear, promote it to an executable plan.
    ///
    /// # Errors
    ///
    /// Returns the [`Conflict`] reported by [`check`](Self::check).
    pub fn validate(self) -> Result<ValidatedPlan, Conflict> {
        if let Err(conflict) = self.check() {
            tracing::warn!("Install aborted before any move: {conflict}");
            return Err(conflict);
        }
        Ok(ValidatedPlan { moves: self.moves })
    }
}

/// Where `source` lands when moved into directory `dst`.
pub(super) fn target_in(dst: &Path, source: &Path) -> PathBuf {
    source
        .file_name()
        .map_or_else(|| dst.to_path_buf(), |name| dst.join(name))
}
