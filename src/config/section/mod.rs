//! Configuration section definitions.
//!
//! Each module corresponds to a section in `devloop.toml`:
//!
//! | Module  | TOML Section | Purpose                               |
//! |---------|--------------|---------------------------------------|
//! | `build` | `[build]`    | Bundler command, entries, output dir  |
//! | `host`  | `[host]`     | Host runtime command and environment  |
//! | `serve` | `[serve]`    | Content server                        |

mod build;
mod host;
mod serve;

pub use build::{BuildConfig, BundleFormat, EntryConfig};
pub use host::HostConfig;
pub use serve::ServeConfig;
