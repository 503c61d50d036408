use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Default GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// API root for release metadata, overridable with `GHI_API_URL`.
pub fn api_url() -> String {
    std::env::var("GHI_API_URL")
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

/// Parent directory for per-run scratch trees: `GHI_TMPDIR` or the system temp dir.
pub fn scratch_root() -> PathBuf {
    std::env::var_os("GHI_TMPDIR").map_or_else(std::env::temp_dir, PathBuf::from)
}

/// Expand a leading `~` or `~/` to the current user's home directory.
///
/// Paths without a leading tilde, and `~user` forms, are returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}

/// Path of `path` relative to `root`, always using `/` separators.
///
/// This is the form move-rule patterns are matched against.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
