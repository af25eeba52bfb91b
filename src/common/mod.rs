//! Shared utilities across client-tarball modules.

pub mod ini;
pub mod template;
pub mod temp;

pub use ini::{Ini, IniError, Section};
pub use template::{expand, TemplateError, Vars};
pub use temp::{cleanup_work_dir, StagingDir};
