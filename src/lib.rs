//! client-tarball library exports.
//!
//! The binary is a thin CLI over these modules; integration tests drive the
//! build sequencing through `commands::build` with a fake builder.

pub mod bundles;
pub mod commands;
pub mod common;
pub mod config;
pub mod preflight;
pub mod process;
pub mod report;
pub mod stage;
pub mod tarball;
pub mod target;
pub mod timing;
pub mod yum;
