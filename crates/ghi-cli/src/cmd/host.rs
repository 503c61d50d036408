//! Host command

use crossterm::style::Stylize;
use ghi_schema::HostPlatform;

/// Show what asset selection knows about this machine.
pub fn host() {
    let host = HostPlatform::current();
    let lw = 15;

    let label = |name: &str| format!("{name:<lw$}").dark_grey();

    println!("  {}{}", label("system"), host.system());
    println!("  {}{}", label("machine"), host.machine());
    println!("  {}{}", label("architectures"), host.architectures().join(", "));
}
