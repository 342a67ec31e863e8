//! Utility modules shared by the dev loop.

pub mod bin;
pub mod exec;
pub mod mime;
pub mod path;
pub mod process;
