//! Human-readable progress output.
//!
//! Status lines go to stdout; warnings and errors go to stderr. A quiet
//! output drops everything except errors.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::style::Stylize;
use ghi_core::Reporter;

/// Format a byte count for display.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[derive(Debug, Default)]
pub struct Output {
    quiet: bool,
    download_started: AtomicBool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            download_started: AtomicBool::new(false),
        }
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        if !self.quiet {
            println!();
            println!("{}", title.bold());
        }
    }

    fn downloading(&self, asset: &str, current: u64, total: Option<u64>) {
        if self.quiet {
            return;
        }
        // Only the first and last progress callbacks are printed.
        if !self.download_started.swap(true, Ordering::Relaxed) {
            let size = total.map(format_size).unwrap_or_default();
            println!("  {} {asset} {}", "↓".cyan(), size.dark_grey());
        } else if total == Some(current) {
            println!("  {} {}", "✓".green(), format_size(current).dark_grey());
        }
    }

    fn installed(&self, path: &Path) {
        if !self.quiet {
            println!("  {} {}", "+".green(), path.display());
        }
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "•".blue());
        }
    }

    fn success(&self, msg: &str) {
        if !self.quiet {
            println!();
            println!("{} {msg}", "✓".green().bold());
        }
    }

    fn warning(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{} {msg}", "warning:".yellow().bold());
        }
    }

    fn error(&self, msg: &str) {
        eprintln!("{} {msg}", "error:".red().bold());
    }
}
