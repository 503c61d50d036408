use thiserror::Error;

/// A repository identifier that is not `owner/repo`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid GitHub repo format: expected 'owner/repo', got '{0}'")]
pub struct RepoError(pub String);

/// A validated GitHub repository reference in `owner/repo` format.
///
/// # Example
///
/// ```
/// use ghi_core::repo::GitHubRepo;
///
/// let repo = GitHubRepo::new("go-acme/lego").unwrap();
/// assert_eq!(repo.owner(), "go-acme");
/// assert_eq!(repo.name(), "lego");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GitHubRepo(String);

impl GitHubRepo {
    /// Create a new `GitHubRepo`, validating the `owner/repo` format.
    ///
    /// Both components may contain word characters, dots and dashes, but may
    /// not consist of dots alone, so `.` and `..` never reach a URL path.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError`] if `s` is not exactly two non-empty components.
    pub fn new(s: &str) -> Result<Self, RepoError> {
        let valid_part = |p: &str| {
            !p.is_empty()
                && !p.chars().all(|c| c == '.')
                && p
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        };

        match s.split_once('/') {
            Some((owner, name)) if valid_part(owner) && valid_part(name) => Ok(Self(s.to_string())),
            _ => Err(RepoError(s.to_string())),
        }
    }

    /// Get the owner part.
    pub fn owner(&self) -> &str {
        self.0.split('/').next().unwrap_or("")
    }

    /// Get the repo name part.
    pub fn name(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or("")
    }

    /// Return the raw `owner/repo` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
