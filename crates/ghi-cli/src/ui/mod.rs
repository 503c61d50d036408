//! Terminal output

pub mod output;
pub mod report;

pub use output::Output;
pub use report::Report;
