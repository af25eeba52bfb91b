//! Bundle definitions loaded from `bundles.ini`.
//!
//! The file has a `GLOBAL` section mapping release series to default bundle
//! lists (`default_bundles_3.4 = osg-wn-client osg-afs-client`) and one
//! section per bundle:
//!
//! ```ini
//! [osg-wn-client]
//! dirname = osg-wn-client
//! packages = osg-wn-client osg-ca-scripts
//! repofile = repos/osg-3.4-%(dver)s-%(basearch)s.repo
//! stage1file = stage1/osg-wn-client-%(dver)s.lst
//! tarballname = osg-wn-client-%(version)s-%(relnum)s.%(dver)s.%(basearch)s.tar.gz
//! patchdirs = patches/wn-client/common patches/wn-client/%(dver)s
//! versionrpm = osg-version
//! paramsets = el5,i386 el5,x86_64 el6,i386 el6,x86_64
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::common::template::{self, TemplateError, Vars};
use crate::common::Ini;
use crate::target::{parse_paramsets, ParamSet, TargetError};

/// Default name of the bundle definition file inside the data directory.
pub const BUNDLES_FILE: &str = "bundles.ini";

/// Section holding the per-release default bundle lists.
pub const GLOBAL_SECTION: &str = "GLOBAL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No section: {0}")]
    MissingSection(String),

    #[error("Option not found: section {section}, key {key}")]
    MissingKey { section: String, key: String },

    #[error("bundle '{bundle}', key {key}: {source}")]
    Template {
        bundle: String,
        key: String,
        #[source]
        source: TemplateError,
    },

    #[error("bundle '{bundle}': {source}")]
    ParamSet {
        bundle: String,
        #[source]
        source: TargetError,
    },
}

/// The parsed bundle definition file. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct BundleConfig {
    ini: Ini,
    path: PathBuf,
}

impl BundleConfig {
    /// Read and parse a bundle definition file.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self {
            ini: Ini::read(path)?,
            path: path.to_path_buf(),
        })
    }

    /// Wrap an already-parsed file.
    pub fn from_ini(ini: Ini) -> Self {
        Self {
            ini,
            path: PathBuf::from(BUNDLES_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A required value.
    pub fn get(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        self.get_opt(section, key)?
            .ok_or_else(|| ConfigError::MissingKey {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    /// An optional value in a section that must exist.
    pub fn get_opt(&self, section: &str, key: &str) -> Result<Option<&str>, ConfigError> {
        let section_ref = self
            .ini
            .section(section)
            .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;
        Ok(section_ref.get(key))
    }

    /// Every bundle section, in file order.
    pub fn bundle_names(&self) -> impl Iterator<Item = &str> {
        self.ini
            .sections()
            .map(|s| s.name())
            .filter(|name| *name != GLOBAL_SECTION)
    }

    /// Default bundle names for a release series, or None if not configured.
    pub fn default_bundles(&self, release: &str) -> Option<Vec<String>> {
        let key = format!("default_bundles_{}", release);
        self.ini
            .get(GLOBAL_SECTION, &key)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
    }

    /// Materialize a bundle definition.
    pub fn bundle(&self, name: &str) -> Result<Bundle, ConfigError> {
        Ok(Bundle {
            name: name.to_string(),
            dirname: self.get(name, "dirname")?.to_string(),
            packages: self
                .get(name, "packages")?
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            repofile: self.get(name, "repofile")?.to_string(),
            stage1file: self.get(name, "stage1file")?.to_string(),
            tarballname: self.get(name, "tarballname")?.to_string(),
            patchdirs: self.get_opt(name, "patchdirs")?.map(str::to_string),
            versionrpm: self.get_opt(name, "versionrpm")?.map(str::to_string),
            paramsets: self.get_opt(name, "paramsets")?.map(str::to_string),
        })
    }
}

/// One bundle's definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    /// Top-level directory name inside the tarball.
    pub dirname: String,
    /// Packages installed for real in stage 2.
    pub packages: Vec<String>,
    pub repofile: String,
    pub stage1file: String,
    pub tarballname: String,
    pub patchdirs: Option<String>,
    /// Package whose version names the tarball when no override is given.
    pub versionrpm: Option<String>,
    /// Raw `paramsets` value; parsed only when asked for.
    pub paramsets: Option<String>,
}

impl Bundle {
    /// Declared (dver, basearch) combinations, required for `--all`.
    pub fn paramsets(&self) -> Result<Vec<ParamSet>, ConfigError> {
        let value = self
            .paramsets
            .as_deref()
            .ok_or_else(|| ConfigError::MissingKey {
                section: self.name.clone(),
                key: "paramsets".to_string(),
            })?;
        parse_paramsets(value).map_err(|source| ConfigError::ParamSet {
            bundle: self.name.clone(),
            source,
        })
    }

    fn target_vars(ps: ParamSet) -> Vars {
        template::vars([("dver", ps.dver.as_str()), ("basearch", ps.basearch.as_str())])
    }

    fn expand(&self, key: &str, value: &str, vars: &Vars) -> Result<String, ConfigError> {
        template::expand(value, vars).map_err(|source| ConfigError::Template {
            bundle: self.name.clone(),
            key: key.to_string(),
            source,
        })
    }

    /// Repo definition file for a target, relative to the data directory.
    pub fn repofile_for(&self, ps: ParamSet) -> Result<String, ConfigError> {
        self.expand("repofile", &self.repofile, &Self::target_vars(ps))
    }

    /// Stage 1 package list file for a target, relative to the data directory.
    pub fn stage1file_for(&self, ps: ParamSet) -> Result<String, ConfigError> {
        self.expand("stage1file", &self.stage1file, &Self::target_vars(ps))
    }

    /// Patch directories for a target, in application order.
    pub fn patchdirs_for(&self, ps: ParamSet) -> Result<Vec<String>, ConfigError> {
        match &self.patchdirs {
            Some(value) => Ok(self
                .expand("patchdirs", value, &Self::target_vars(ps))?
                .split_whitespace()
                .map(str::to_string)
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Final tarball file name.
    pub fn tarball_name(
        &self,
        ps: ParamSet,
        version: &str,
        relnum: &str,
    ) -> Result<String, ConfigError> {
        let vars = template::vars([
            ("bundle", self.name.as_str()),
            ("dirname", self.dirname.as_str()),
            ("dver", ps.dver.as_str()),
            ("basearch", ps.basearch.as_str()),
            ("version", version),
            ("relnum", relnum),
        ]);
        self.expand("tarballname", &self.tarballname, &vars)
    }
}
