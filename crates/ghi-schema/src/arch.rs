//! Host platform facts used to narrow release assets.
//!
//! Publishers name the same processor differently (`x86_64` vs `amd64`,
//! `aarch64` vs `arm64`), so a host architecture expands into a small ordered
//! family of acceptable tokens.
//!
//! # Example
//!
//! ```
//! use ghi_schema::HostPlatform;
//!
//! let host = HostPlatform::new("Linux", "AMD64");
//! assert_eq!(host.system(), "linux");
//! assert_eq!(host.architectures(), vec!["amd64", "x86_64"]);
//! ```

/// Known spellings of the same processor architecture.
///
/// Each row is one family; order within a row is the order siblings are
/// tried after the literal host string.
const ARCH_FAMILIES: &[&[&str]] = &[&["x86_64", "amd64"], &["aarch64", "arm64"]];

/// Expand a raw processor string into the ordered set of tokens that name it.
///
/// The literal (lower-cased) host string always comes first, followed by its
/// siblings from the built-in table. Unknown architectures map to themselves.
pub fn architecture_family(machine: &str) -> Vec<String> {
    let machine = machine.to_lowercase();
    let mut tokens = vec![machine.clone()];

    if let Some(family) = ARCH_FAMILIES.iter().find(|f| f.contains(&machine.as_str())) {
        tokens.extend(
            family
                .iter()
                .filter(|t| **t != machine)
                .map(|t| (*t).to_string()),
        );
    }

    tokens
}

/// Operating system and processor of the machine being installed onto.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    system: String,
    machine: String,
}

impl HostPlatform {
    /// Build from the strings an OS query reports. Both are lower-cased.
    pub fn new(system: impl Into<String>, machine: impl Into<String>) -> Self {
        Self {
            system: system.into().to_lowercase(),
            machine: machine.into().to_lowercase(),
        }
    }

    /// Facts for the running process.
    ///
    /// The OS name follows kernel naming (`darwin` rather than `macos`),
    /// which is what release assets use.
    pub fn current() -> Self {
        let system = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        Self::new(system, std::env::consts::ARCH)
    }

    /// Lower-cased OS name (`linux`, `darwin`, `windows`, ...).
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Lower-cased processor string as reported by the host.
    pub fn machine(&self) -> &str {
        &self.machine
    }

    /// Acceptable architecture tokens, literal host string first.
    pub fn architectures(&self) -> Vec<String> {
        architecture_family(&self.machine)
    }
}

impl std::fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.system, self.machine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_families() {
        assert_eq!(architecture_family("x86_64"), vec!["x86_64", "amd64"]);
        assert_eq!(architecture_family("amd64"), vec!["amd64", "x86_64"]);
        assert_eq!(architecture_family("aarch64"), vec!["aarch64", "arm64"]);
        assert_eq!(architecture_family("ARM64"), vec!["arm64", "aarch64"]);
    }

    #[test]
    fn test_unknown_architecture_is_singleton() {
        assert_eq!(architecture_family("ARMv7l"), vec!["armv7l"]);
        assert_eq!(architecture_family("riscv64"), vec!["riscv64"]);
    }

    #[test]
    fn test_host_is_lowercased() {
        let host = HostPlatform::new("Darwin", "ARM64");
        assert_eq!(host.system(), "darwin");
        assert_eq!(host.machine(), "arm64");
        assert_eq!(host.to_string(), "darwin-arm64");
    }

    #[test]
    fn test_current_uses_kernel_names() {
        let host = HostPlatform::current();
        assert_ne!(host.system(), "macos");
        assert!(!host.architectures().is_empty());
    }
}
