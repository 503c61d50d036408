use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::InstallError;
use crate::paths::relative_slash_path;
use crate::rules::{MoveRule, MoveRules};

/// An extracted path paired with the rule that claimed it.
#[derive(Debug, Clone)]
pub struct ClassifiedEntry {
    /// Absolute path inside the scratch tree.
    pub source: PathBuf,
    /// Path relative to the tree root, `/`-separated.
    pub relative: String,
    /// Whether the entry is a real directory (symlinks are never directories here).
    pub is_dir: bool,
    /// The first rule that matched.
    pub rule: MoveRule,
}

/// Walk `root` depth-first and assign entries to move rules.
///
/// Entries are visited in name order. Symlinks are not followed and are
/// treated as leaves. Once a directory matches, its subtree is skipped, so
/// nothing below a claimed directory is classified separately. Unmatched
/// entries are left alone.
///
/// # Errors
///
/// Returns [`InstallError::Walk`] if the tree cannot be read.
pub fn classify(root: &Path, rules: &MoveRules) -> Result<Vec<ClassifiedEntry>, InstallError> {
    let mut entries = Vec::new();
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        let Some(relative) = relative_slash_path(root, entry.path()) else {
            continue;
        };
        let Some(rule) = rules.first_match(&relative) else {
            tracing::trace!("Unmatched: {relative}");
            continue;
        };

        let is_dir = entry.file_type().is_dir();
        tracing::debug!(
            "Classified {relative} -> {} (rule #{})",
            rule.dst().display(),
            rule.index()
        );
        if is_dir {
            walker.skip_current_dir();
        }

        entries.push(ClassifiedEntry {
            source: entry.into_path(),
            relative,
            is_dir,
            rule: rule.clone(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::MoveRuleSpec;
    use std::fs;
    use tempfile::tempdir;

    fn rules(pairs: &[(&str, &str)]) -> MoveRules {
        let specs: Vec<MoveRuleSpec> = pairs
            .iter()
            .map(|(src, dst)| MoveRuleSpec {
                src_regex: Some((*src).to_string()),
                dst: Some((*dst).to_string()),
                ..Default::default()
            })
            .collect();
        MoveRules::from_specs(&specs).unwrap()
    }

    #[test]
    fn test_directory_claims_subtree() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::write(root.join("bin/tool"), "x").unwrap();

        let rules = rules(&[("bin", "/opt"), ("bin/tool", "/usr/local/bin")]);
        let entries = classify(root, &rules).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].relative, "bin");
        assert!(entries[0].is_dir);
        assert_eq!(entries[0].rule.index(), 0);
    }

    #[test]
    fn test_unmatched_directory_is_descended() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("lego_v4/docs")).unwrap();
        fs::write(root.join("lego_v4/lego"), "bin").unwrap();
        fs::write(root.join("lego_v4/docs/README.md"), "doc").unwrap();
        fs::write(root.join("LICENSE"), "mit").unwrap();

        let rules = rules(&[(".*/lego", "/usr/local/bin")]);
        let entries = classify(root, &rules).unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.relative.as_str()).collect();
        assert_eq!(names, vec!["lego_v4/lego"]);
        assert!(!entries[0].is_dir);
    }

    #[test]
    fn test_first_rule_wins_in_order() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("tool"), "x").unwrap();
        fs::write(root.join("tool.1"), "man").unwrap();

        let rules = rules(&[("tool\\.1", "/usr/share/man/man1"), ("tool.*", "/usr/local/bin")]);
        let entries = classify(root, &rules).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].relative, "tool");
        assert_eq!(entries[0].rule.index(), 1);
        assert_eq!(entries[1].relative, "tool.1");
        assert_eq!(entries[1].rule.index(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_is_leaf() {
        let tmp = tempdir().unwrap();
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("secret"), "s").unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("link")).unwrap();

        let rules = rules(&[("link", "/opt"), ("link/secret", "/opt/secret")]);
        let entries = classify(tmp.path(), &rules).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].relative, "link");
        assert!(!entries[0].is_dir);
    }
}
