//! Process-wide state shared across the codebase.

mod shutdown;

pub use shutdown::setup_shutdown_handler;
