//! Run orchestration shared by the commands

pub mod context;
pub mod error;
pub mod run;

pub use context::Context;
pub use error::{ErrorKind, RunError};
pub use run::{Outcome, resolve, run};
