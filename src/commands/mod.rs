//! CLI command handlers.
//!
//! - `build` - Build every requested tarball
//! - `show` - Display the resolved configuration

pub mod build;
pub mod show;

pub use build::{cmd_build, BuildOptions};
pub use show::cmd_show_config;
