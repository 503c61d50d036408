//! Shared types and pure selection logic for ghi.
//!
//! Nothing in this crate touches the network or the filesystem: it models the
//! release metadata returned by the hosting platform, the facts about the host
//! that drive asset selection, and the narrowing pipeline that reduces a list
//! of assets to exactly one download target.

pub mod arch;
pub mod release;
pub mod selector;

// Re-exports
pub use arch::*;
pub use release::{Asset, Release};
pub use selector::{ArchAlias, PatternError, SelectError, SelectionConfig, Stage};
