//! Logging utilities.
//!
//! Library code only talks to the `log` facade. Hosts that want output call
//! [`init_logging`] once at startup.

mod init;

pub use init::{init_logging, LoggingConfig};
