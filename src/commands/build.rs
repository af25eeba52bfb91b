//! Build command - plans and runs every (bundle, dver, basearch) build.
//!
//! Builds run one at a time. A failing build is recorded and the next one
//! starts; the exit code reflects whether anything failed.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::bundles::{Bundle, BundleConfig, ConfigError};
use crate::common::StagingDir;
use crate::config::Config;
use crate::preflight;
use crate::report::{BuildReport, FailedBuild, WrittenTarball};
use crate::stage::{self, Stage2Request};
use crate::tarball::TarballInfo;
use crate::target::ParamSet;
use crate::timing::Timer;
use crate::yum::YumInstaller;

/// Exit code when no bundle set applies to the requested release.
pub const EXIT_NO_BUNDLES: u8 = 2;

/// Options from the command line.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub bundles: Vec<String>,
    pub osgver: Option<String>,
    /// Build every declared combination instead of `target`.
    pub all: bool,
    /// The single combination built without `all`.
    pub target: Option<ParamSet>,
    pub version: Option<String>,
    pub relnum: String,
    pub extra_repos: Vec<String>,
    pub keep: bool,
    /// Directory tarballs are written to.
    pub output_dir: PathBuf,
    pub summary_json: Option<PathBuf>,
}

/// Why no bundle list could be determined.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("No default set of bundles for osgver {0}")]
    NoDefault(String),

    #[error("No bundles. Exiting")]
    Empty,
}

impl SelectError {
    pub fn exit_code(&self) -> u8 {
        match self {
            SelectError::NoDefault(_) => EXIT_NO_BUNDLES,
            SelectError::Empty => 1,
        }
    }
}

/// Bundle names to build: the explicit list, else the release's defaults.
pub fn select_bundles(
    cfg: &BundleConfig,
    requested: &[String],
    osgver: Option<&str>,
) -> Result<Vec<String>, SelectError> {
    let names = if !requested.is_empty() {
        requested.to_vec()
    } else {
        let release = osgver.unwrap_or_default();
        cfg.default_bundles(release)
            .ok_or_else(|| SelectError::NoDefault(release.to_string()))?
    };

    if names.is_empty() {
        return Err(SelectError::Empty);
    }
    Ok(names)
}

/// One build attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub bundle: Bundle,
    pub param_set: ParamSet,
}

impl Triple {
    fn staging_prefix(&self) -> String {
        format!(
            "stagedir-{}-{}-",
            self.param_set.dver, self.param_set.basearch
        )
    }
}

/// Expand bundles into build attempts.
///
/// With `all`, each bundle contributes its declared combinations in
/// declaration order; otherwise each contributes exactly `single`.
pub fn plan(
    bundles: &[Bundle],
    all: bool,
    single: Option<ParamSet>,
) -> Result<Vec<Triple>, ConfigError> {
    let mut triples = Vec::new();
    for bundle in bundles {
        let sets: Vec<ParamSet> = if all {
            bundle.paramsets()?
        } else {
            single.into_iter().collect()
        };
        for param_set in sets {
            triples.push(Triple {
                bundle: bundle.clone(),
                param_set,
            });
        }
    }
    Ok(triples)
}

/// The work done for one triple.
///
/// A session is opened per triple and dropped when the triple is finished,
/// whatever the outcome.
pub trait TripleBuilder {
    type Session;

    fn open(&mut self, triple: &Triple) -> Result<Self::Session>;

    /// Seed the staging root. Ok(false) means the stage failed.
    fn stage1(&mut self, session: &Self::Session, triple: &Triple, root: &Path) -> Result<bool>;

    /// Install, overlay, run scripts and archive. Returns the tarball path,
    /// or None if the stage failed.
    fn stage2(
        &mut self,
        session: &Self::Session,
        triple: &Triple,
        root: &Path,
    ) -> Result<Option<PathBuf>>;
}

enum Outcome {
    Archived(TarballInfo),
    Failed(String),
}

fn run_triple<B: TripleBuilder>(builder: &mut B, triple: &Triple, stage: &StagingDir) -> Outcome {
    let root = stage.root();

    let session = match builder.open(triple) {
        Ok(session) => session,
        Err(e) => return Outcome::Failed(format!("{:#}", e)),
    };

    match builder.stage1(&session, triple, root) {
        Ok(true) => {}
        Ok(false) => return Outcome::Failed("stage 1 failed".to_string()),
        Err(e) => return Outcome::Failed(format!("stage 1: {:#}", e)),
    }

    let tarball = match builder.stage2(&session, triple, root) {
        Ok(Some(path)) => path,
        Ok(None) => return Outcome::Failed("stage 2 failed".to_string()),
        Err(e) => return Outcome::Failed(format!("stage 2: {:#}", e)),
    };

    match TarballInfo::inspect(&tarball) {
        Ok(info) => Outcome::Archived(info),
        Err(e) => Outcome::Failed(format!("{:#}", e)),
    }
}

/// Run every triple in order under `staging_base`.
///
/// A staging tree is removed only when its build was archived and `keep` is
/// off; failed builds always leave theirs behind.
pub fn run_triples<B: TripleBuilder>(
    builder: &mut B,
    triples: &[Triple],
    keep: bool,
    staging_base: &Path,
) -> BuildReport {
    let mut report = BuildReport::new();

    for triple in triples {
        let bundle = &triple.bundle.name;
        let ps = triple.param_set;
        let timer = Timer::start(format!("{} {}", bundle, ps));
        info!("Building {} for {}", bundle, ps);

        let failed = |stage_dir: Option<PathBuf>, reason: String| FailedBuild {
            bundle: bundle.clone(),
            dver: ps.dver,
            basearch: ps.basearch,
            stage_dir,
            reason,
        };

        let stage = match StagingDir::create_in(
            staging_base,
            &triple.staging_prefix(),
            &triple.bundle.dirname,
        ) {
            Ok(stage) => stage,
            Err(e) => {
                error!("{:#}", e);
                report.record_failed(failed(None, format!("{:#}", e)));
                continue;
            }
        };

        match run_triple(builder, triple, &stage) {
            Outcome::Archived(tarball) => {
                println!(
                    "Tarball created as {}, size {} bytes, {} files",
                    tarball.path.display(),
                    tarball.size,
                    tarball
                        .file_count
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "?".to_string())
                );
                report.record_written(WrittenTarball {
                    bundle: bundle.clone(),
                    dver: ps.dver,
                    basearch: ps.basearch,
                    tarball,
                });
                if keep {
                    info!("Keeping {}", stage.parent().display());
                } else {
                    info!("Removing temp dirs");
                    stage.remove();
                }
            }
            Outcome::Failed(reason) => {
                error!("{}", reason);
                error!(
                    "Building {} for {} unsuccessful. Files have been left in {}",
                    bundle,
                    ps,
                    stage.root().display()
                );
                report.record_failed(failed(Some(stage.parent().to_path_buf()), reason));
            }
        }
        timer.finish();
    }

    report
}

/// The real builder: yum, rpm, patch and tar.
pub struct YumTripleBuilder<'a> {
    config: &'a Config,
    opts: &'a BuildOptions,
}

impl<'a> YumTripleBuilder<'a> {
    pub fn new(config: &'a Config, opts: &'a BuildOptions) -> Self {
        Self { config, opts }
    }

    fn version(&self, installer: &YumInstaller, bundle: &Bundle) -> Result<String> {
        if let Some(version) = &self.opts.version {
            return Ok(version.clone());
        }
        match &bundle.versionrpm {
            Some(rpm) => installer
                .repoquery(rpm, "%{VERSION}")
                .with_context(|| format!("Determining version from {}", rpm)),
            None => Ok("unknown".to_string()),
        }
    }
}

impl TripleBuilder for YumTripleBuilder<'_> {
    type Session = YumInstaller;

    fn open(&mut self, triple: &Triple) -> Result<YumInstaller> {
        let repofile = self
            .config
            .data_path(&triple.bundle.repofile_for(triple.param_set)?);
        let installer = YumInstaller::for_target(
            &self.config.yum_conf,
            &repofile,
            triple.param_set,
            &self.opts.extra_repos,
        )?;
        installer.clean();
        Ok(installer)
    }

    fn stage1(&mut self, installer: &YumInstaller, triple: &Triple, root: &Path) -> Result<bool> {
        let pkglist = self
            .config
            .data_path(&triple.bundle.stage1file_for(triple.param_set)?);
        stage::make_stage1(root, installer, triple.param_set, &pkglist)
    }

    fn stage2(
        &mut self,
        installer: &YumInstaller,
        triple: &Triple,
        root: &Path,
    ) -> Result<Option<PathBuf>> {
        let bundle = &triple.bundle;
        let ps = triple.param_set;

        let version = self.version(installer, bundle)?;
        let tarball = self
            .opts
            .output_dir
            .join(bundle.tarball_name(ps, &version, &self.opts.relnum)?);
        let patch_dirs: Vec<PathBuf> = bundle
            .patchdirs_for(ps)?
            .iter()
            .map(|d| self.config.data_path(d))
            .collect();

        info!("Making stage 2 tarball for {}", bundle.packages.join(" "));
        let ok = stage::make_stage2(&Stage2Request {
            stage_dir: root,
            packages: &bundle.packages,
            tarball: &tarball,
            patch_dirs: &patch_dirs,
            post_scripts_dir: &self.config.post_install_dir,
            installer,
            param_set: ps,
            relnum: &self.opts.relnum,
        })?;

        Ok(ok.then_some(tarball))
    }
}

/// Execute the build command. Returns the process exit code.
pub fn cmd_build(config: &Config, opts: &BuildOptions) -> Result<u8> {
    preflight::run_preflight_or_fail()?;

    let bundle_cfg = BundleConfig::load(&config.bundles_file)?;
    let names = match select_bundles(&bundle_cfg, &opts.bundles, opts.osgver.as_deref()) {
        Ok(names) => names,
        Err(e) => {
            error!("{}", e);
            return Ok(e.exit_code());
        }
    };

    let bundles = names
        .iter()
        .map(|name| bundle_cfg.bundle(name))
        .collect::<Result<Vec<_>, _>>()?;
    let triples = plan(&bundles, opts.all, opts.target)?;
    if triples.is_empty() {
        warn!("Nothing to build");
    }

    let mut builder = YumTripleBuilder::new(config, opts);
    let report = run_triples(&mut builder, &triples, opts.keep, &std::env::temp_dir());

    report.print();
    if let Some(path) = &opts.summary_json {
        report.write_json(path)?;
    }
    Ok(report.exit_code())
}
