//! The two build stages.
//!
//! - `stage1` - resolve and download, register in the rpm database only
//! - `stage2` - install for real, overlay patch dirs, run post-install
//!   scripts, archive

pub mod overlay;
pub mod post_install;
pub mod stage1;
pub mod stage2;

pub use stage1::make_stage1;
pub use stage2::{make_stage2, Stage2Request};
