//! Command implementations

pub mod host;
pub mod install;
pub mod select;
