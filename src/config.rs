//! Configuration management for client-tarball.
//!
//! Locates the data directory (bundle definitions, repo files, package
//! lists, patch directories, post-install scripts) and the yum template.
//! `.env` is loaded by `main` via dotenvy; environment variables take
//! precedence over `.env`, and the command line takes precedence over both.

use std::path::{Path, PathBuf};

use crate::bundles::BUNDLES_FILE;
use crate::yum::DEFAULT_YUM_CONF;

pub const ENV_DATA_DIR: &str = "CLIENT_TARBALL_DATA_DIR";
pub const ENV_BUNDLES: &str = "CLIENT_TARBALL_BUNDLES";
pub const ENV_YUM_CONF: &str = "CLIENT_TARBALL_YUM_CONF";
pub const ENV_POST_INSTALL: &str = "CLIENT_TARBALL_POST_INSTALL";

/// Default post-install script directory, relative to the data directory.
pub const POST_INSTALL_DIR: &str = "post-install";

/// Tool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root for every relative path in the bundle definitions.
    pub data_dir: PathBuf,
    /// Bundle definition file.
    pub bundles_file: PathBuf,
    /// Package manager configuration used as the template.
    pub yum_conf: PathBuf,
    /// Post-install scripts run against every staged tree.
    pub post_install_dir: PathBuf,
}

impl Config {
    /// Load from the process environment.
    ///
    /// `data_dir` (from `--data-dir`) overrides `CLIENT_TARBALL_DATA_DIR`;
    /// without either, the current directory is used.
    pub fn load(data_dir: Option<&Path>) -> Self {
        Self::from_lookup(data_dir, |key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the environment.
    pub fn from_lookup<F>(data_dir: Option<&Path>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = data_dir
            .map(Path::to_path_buf)
            .or_else(|| lookup(ENV_DATA_DIR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        let resolve = |key: &str, default: &str| {
            let path = PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()));
            if path.is_absolute() {
                path
            } else {
                data_dir.join(path)
            }
        };

        let bundles_file = resolve(ENV_BUNDLES, BUNDLES_FILE);
        let yum_conf = resolve(ENV_YUM_CONF, DEFAULT_YUM_CONF);
        let post_install_dir = resolve(ENV_POST_INSTALL, POST_INSTALL_DIR);

        Self {
            data_dir,
            bundles_file,
            yum_conf,
            post_install_dir,
        }
    }

    /// A path from the bundle definitions, relative to the data directory.
    pub fn data_path(&self, relative: &str) -> PathBuf {
        self.data_dir.join(relative)
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  DATA_DIR:     {}", self.data_dir.display());
        println!("  BUNDLES:      {}", self.bundles_file.display());
        println!("  YUM_CONF:     {}", self.yum_conf.display());
        println!("  POST_INSTALL: {}", self.post_install_dir.display());
        if !self.bundles_file.exists() {
            println!("  Bundle definitions: NOT FOUND");
        }
    }
}
