//! Records, configured values and diagnostics exchanged with the host.

pub mod diagnostics;
pub mod file;
pub mod value;
