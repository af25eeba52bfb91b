//! Shared test utilities for client-tarball tests.
#![allow(dead_code)]

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use client_tarball::bundles::BundleConfig;
use client_tarball::commands::build::{Triple, TripleBuilder};
use client_tarball::config::Config;
use client_tarball::target::ParamSet;

/// A bundle file with two bundles; `wn` declares two targets, `afs` one.
pub const BUNDLES_INI: &str = "\
[GLOBAL]
default_bundles_3.4 = wn afs

[wn]
dirname = osg-wn-client
packages = osg-wn-client osg-ca-scripts
repofile = repos/wn-%(dver)s-%(basearch)s.repo
stage1file = stage1/wn-%(dver)s.lst
tarballname = wn-%(version)s-%(relnum)s.%(dver)s.%(basearch)s.tar.gz
patchdirs = patches/common patches/%(dver)s
paramsets = el6,x86_64 el6,i386

[afs]
dirname = osg-afs-client
packages = osg-afs-client
repofile = repos/afs-%(dver)s.repo
stage1file = stage1/afs.lst
tarballname = afs-%(dver)s-%(basearch)s.tar.gz
paramsets = el5,x86_64
";

/// Test environment with a data directory, staging area and output area.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Holds bundles.ini, repo files and patch dirs
    pub data_dir: PathBuf,
    /// Parent of every staging tree
    pub staging: PathBuf,
    /// Where fake tarballs are written
    pub output: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let data_dir = base.join("data");
        let staging = base.join("staging");
        let output = base.join("output");
        for dir in [&data_dir, &staging, &output] {
            fs::create_dir_all(dir).expect("Failed to create test dir");
        }

        Self {
            _temp_dir: temp_dir,
            data_dir,
            staging,
            output,
        }
    }

    /// Config rooted at the test data directory, ignoring the environment.
    pub fn config(&self) -> Config {
        Config::from_lookup(Some(self.data_dir.as_path()), |_| None)
    }

    /// Write `bundles.ini` into the data directory and load it.
    pub fn bundles(&self, contents: &str) -> BundleConfig {
        let path = self.data_dir.join("bundles.ini");
        fs::write(&path, contents).expect("Failed to write bundles.ini");
        BundleConfig::load(&path).expect("Failed to load bundles.ini")
    }

    /// Write a file under the data directory, creating parents.
    pub fn data_file(&self, rel: &str, contents: &str) -> PathBuf {
        create_file(&self.data_dir, rel, contents)
    }

    /// Staging trees still present.
    pub fn staging_entries(&self) -> Vec<PathBuf> {
        let mut entries: Vec<_> = fs::read_dir(&self.staging)
            .expect("Failed to read staging dir")
            .map(|e| e.expect("Failed to read entry").path())
            .collect();
        entries.sort();
        entries
    }
}

/// Create a file (and its parent directories) under `root`.
pub fn create_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(&path, contents).expect("Failed to write file");
    path
}

/// What the fake builder should do wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Open,
    Stage1,
    Stage2,
}

/// A builder that records calls and writes placeholder tarballs.
pub struct FakeBuilder {
    output: PathBuf,
    failures: Vec<(String, ParamSet, Failure)>,
    /// `<step> <bundle> <dver>,<basearch>` per call, in order
    pub calls: Vec<String>,
    /// Staging root handed to stage 1, per triple
    pub roots: Vec<PathBuf>,
}

impl FakeBuilder {
    pub fn new(output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
            failures: Vec::new(),
            calls: Vec::new(),
            roots: Vec::new(),
        }
    }

    pub fn fail(mut self, bundle: &str, ps: ParamSet, failure: Failure) -> Self {
        self.failures.push((bundle.to_string(), ps, failure));
        self
    }

    fn fails(&self, triple: &Triple, failure: Failure) -> bool {
        self.failures
            .iter()
            .any(|(b, ps, f)| *b == triple.bundle.name && *ps == triple.param_set && *f == failure)
    }

    fn record(&mut self, step: &str, triple: &Triple) {
        self.calls
            .push(format!("{} {} {}", step, triple.bundle.name, triple.param_set));
    }
}

impl TripleBuilder for FakeBuilder {
    type Session = String;

    fn open(&mut self, triple: &Triple) -> Result<String> {
        self.record("open", triple);
        if self.fails(triple, Failure::Open) {
            bail!("repo file not found");
        }
        Ok(triple.bundle.name.clone())
    }

    fn stage1(&mut self, _session: &String, triple: &Triple, root: &Path) -> Result<bool> {
        self.record("stage1", triple);
        self.roots.push(root.to_path_buf());
        fs::write(root.join("stage1-marker"), "seeded")?;
        Ok(!self.fails(triple, Failure::Stage1))
    }

    fn stage2(
        &mut self,
        _session: &String,
        triple: &Triple,
        _root: &Path,
    ) -> Result<Option<PathBuf>> {
        self.record("stage2", triple);
        if self.fails(triple, Failure::Stage2) {
            return Ok(None);
        }
        let tarball = self.output.join(format!(
            "{}-{}-{}.tar.gz",
            triple.bundle.name, triple.param_set.dver, triple.param_set.basearch
        ));
        fs::write(&tarball, b"not really gzip")?;
        Ok(Some(tarball))
    }
}
