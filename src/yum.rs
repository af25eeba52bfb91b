//! Repository configuration and package manager invocations.
//!
//! A [`YumConfig`] is synthesized per (dver, basearch) build from the system
//! `yum.conf` plus the bundle's repo definition file. A [`YumInstaller`]
//! writes it to a temp file for the lifetime of the installer and runs
//! `yum`, `yumdownloader`, `rpm` and `repoquery` against it.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info, warn};

use crate::common::template::{self, Vars};
use crate::common::{Ini, Section};
use crate::process::Cmd;
use crate::target::ParamSet;

/// System package manager configuration used as the template.
pub const DEFAULT_YUM_CONF: &str = "/etc/yum.conf";

/// Extra repository enabled by `--prerelease`.
pub const PRERELEASE_REPO: &str = "osg-prerelease-for-tarball";

/// Priority for repositories that don't set one. Lower numbers win.
pub const DEFAULT_PRIORITY: u32 = 98;

const MAIN_SECTION: &str = "main";

/// One repository section added to the generated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDefinition {
    pub id: String,
    pub name: String,
    /// `baseurl` (or `mirrorlist` when no base URL is given).
    pub baseurl: Option<String>,
    pub priority: u32,
    pub enabled: bool,
    /// `includepkgs` filter, if any.
    pub includepkgs: Option<String>,
    /// Any other options, carried through verbatim.
    pub extra: Vec<(String, String)>,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

impl RepoDefinition {
    /// Build a definition from a repo file section, interpolating every value.
    pub fn from_section(section: &Section, vars: &Vars) -> Result<Self> {
        let id = section.name().to_string();
        let mut def = RepoDefinition {
            id: id.clone(),
            name: id.clone(),
            baseurl: None,
            priority: DEFAULT_PRIORITY,
            enabled: true,
            includepkgs: None,
            extra: Vec::new(),
        };

        for (key, raw) in section.entries() {
            let value = template::expand(raw, vars)
                .with_context(|| format!("repo '{}', option {}", id, key))?;
            match key {
                "name" => def.name = value,
                "baseurl" => def.baseurl = Some(value),
                "priority" => {
                    def.priority = value.trim().parse().with_context(|| {
                        format!("repo '{}': invalid priority '{}'", id, value)
                    })?;
                }
                "enabled" => {
                    def.enabled = parse_bool(&value).with_context(|| {
                        format!("repo '{}': invalid enabled flag '{}'", id, value)
                    })?;
                }
                "includepkgs" => def.includepkgs = Some(value),
                // Signature checking is always off for tarball builds
                "gpgcheck" => {}
                _ => def.extra.push((key.to_string(), value)),
            }
        }

        let has_mirrorlist = def.extra.iter().any(|(k, _)| k == "mirrorlist");
        if def.baseurl.is_none() && !has_mirrorlist {
            bail!("repo '{}' has neither baseurl nor mirrorlist", id);
        }

        Ok(def)
    }

    /// Write this repository into a section of the generated config.
    fn apply_to(&self, section: &mut Section) {
        section.set("name", self.name.as_str());
        if let Some(url) = &self.baseurl {
            section.set("baseurl", url.as_str());
        }
        if !self.extra.iter().any(|(k, _)| k == "failovermethod") {
            section.set("failovermethod", "priority");
        }
        for (key, value) in &self.extra {
            section.set(key, value.as_str());
        }
        section.set("priority", self.priority.to_string());
        section.set("enabled", if self.enabled { "1" } else { "0" });
        section.set("gpgcheck", "0");
        if let Some(pkgs) = &self.includepkgs {
            section.set("includepkgs", pkgs.as_str());
        }
    }
}

/// A complete yum configuration for one (dver, basearch) build.
#[derive(Debug, Clone)]
pub struct YumConfig {
    ini: Ini,
    repos: Vec<RepoDefinition>,
    enabled: Vec<String>,
}

impl YumConfig {
    /// Build from the template and repo definition files on disk.
    ///
    /// A missing template is treated as an empty `[main]`; a missing repo
    /// file is an error.
    pub fn build(
        template_path: &Path,
        repofile: &Path,
        ps: ParamSet,
        extra_repos: &[String],
    ) -> Result<Self> {
        let base = if template_path.exists() {
            Ini::read(template_path)?
        } else {
            warn!(
                "{} not found, starting from an empty configuration",
                template_path.display()
            );
            Ini::new()
        };
        let repos = Ini::read(repofile)
            .with_context(|| format!("Failed to load repo file {}", repofile.display()))?;
        Self::from_parts(base, &repos, ps, extra_repos)
    }

    /// Build from already-parsed template and repo definitions.
    pub fn from_parts(
        mut base: Ini,
        repo_defs: &Ini,
        ps: ParamSet,
        extra_repos: &[String],
    ) -> Result<Self> {
        base.remove_option(MAIN_SECTION, "distroverpkg");
        base.set(MAIN_SECTION, "plugins", "1");

        let vars = template::vars([("dver", ps.dver.as_str()), ("basearch", ps.basearch.as_str())]);
        let mut repos = Vec::new();
        for section in repo_defs.sections() {
            let def = RepoDefinition::from_section(section, &vars)?;
            def.apply_to(base.section_mut(&def.id));
            repos.push(def);
        }
        if repos.is_empty() {
            bail!("no repositories defined");
        }

        let mut enabled: Vec<String> = repos
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.id.clone())
            .collect();
        for extra in extra_repos {
            if !enabled.contains(extra) {
                enabled.push(extra.clone());
            }
        }

        Ok(Self {
            ini: base,
            repos,
            enabled,
        })
    }

    pub fn ini(&self) -> &Ini {
        &self.ini
    }

    pub fn repos(&self) -> &[RepoDefinition] {
        &self.repos
    }

    /// Repositories every command enables, in order.
    pub fn enabled_repos(&self) -> &[String] {
        &self.enabled
    }

    /// `--disablerepo=*` followed by one `--enablerepo=` per enabled repo.
    pub fn repo_flags(&self) -> Vec<String> {
        std::iter::once("--disablerepo=*".to_string())
            .chain(self.enabled.iter().map(|r| format!("--enablerepo={}", r)))
            .collect()
    }

    /// Serialize to an already-open writer.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        self.ini.write_to(out)
    }

    /// Open `path` and delegate to [`YumConfig::write_to`].
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        self.ini.write_to_path(path)
    }
}

/// Runs the package manager against a generated configuration.
///
/// The configuration file is deleted when the installer is dropped.
pub struct YumInstaller {
    config: YumConfig,
    conf_file: NamedTempFile,
}

fn check_args(installroot: &Path, packages: &[String]) -> Result<()> {
    if installroot.as_os_str().is_empty() {
        bail!("'installroot' empty");
    }
    if packages.is_empty() {
        bail!("'packages' empty");
    }
    Ok(())
}

impl YumInstaller {
    /// Write `config` to a uniquely named temp file.
    pub fn new(config: YumConfig) -> Result<Self> {
        let mut conf_file = tempfile::Builder::new()
            .prefix("yum-")
            .suffix(".conf")
            .tempfile()
            .context("Failed to create temporary yum config")?;
        config
            .write_to(conf_file.as_file_mut())
            .context("Failed to write temporary yum config")?;
        debug!("yum config written to {}", conf_file.path().display());
        Ok(Self { config, conf_file })
    }

    /// Build the configuration and write it in one step.
    pub fn for_target(
        template_path: &Path,
        repofile: &Path,
        ps: ParamSet,
        extra_repos: &[String],
    ) -> Result<Self> {
        Self::new(YumConfig::build(template_path, repofile, ps, extra_repos)?)
    }

    /// Path of the generated configuration file.
    pub fn conf_path(&self) -> &Path {
        self.conf_file.path()
    }

    fn with_repo_args(&self, cmd: Cmd) -> Cmd {
        cmd.arg("-c")
            .arg_path(self.conf_path())
            .arg("-d1")
            .args(self.config.repo_flags())
            .arg("--nogpgcheck")
    }

    /// Drop cached metadata for the generated repositories. Best effort.
    pub fn clean(&self) {
        for what in ["all", "expire-cache"] {
            let cmd = Cmd::new("yum")
                .args(["clean", what])
                .arg("-c")
                .arg_path(self.conf_path())
                .arg("--enablerepo=*");
            if let Err(e) = cmd.run_status() {
                warn!("yum clean {} failed: {:#}", what, e);
            }
        }
    }

    /// Install packages into `installroot` for real.
    ///
    /// Returns yum's exit code.
    pub fn install(&self, installroot: &Path, packages: &[String]) -> Result<i32> {
        check_args(installroot, packages)?;

        let cmd = Cmd::new("yum")
            .args(["install", "-y", "--installroot"])
            .arg_path(installroot);
        self.with_repo_args(cmd).args(packages).run_status()
    }

    /// Download packages plus their dependencies and register them in
    /// `installroot`'s rpm database without extracting any files.
    ///
    /// Returns the first non-zero exit code, or 0. The download directory is
    /// removed on every path out of this function.
    pub fn resolve_only(&self, installroot: &Path, packages: &[String]) -> Result<i32> {
        check_args(installroot, packages)?;

        let rpm_dir = tempfile::Builder::new()
            .suffix(".fake-install")
            .tempdir()
            .context("Failed to create download directory")?;

        let cmd = Cmd::new("yumdownloader")
            .arg("--destdir")
            .arg_path(rpm_dir.path())
            .arg("--resolve")
            .arg("--installroot")
            .arg_path(installroot);
        let code = self.with_repo_args(cmd).args(packages).run_status()?;
        if code != 0 {
            return Ok(code);
        }

        let rpms = downloaded_rpms(&rpm_dir)?;
        if rpms.is_empty() {
            warn!("yumdownloader fetched nothing for {}", packages.join(" "));
            return Ok(1);
        }
        info!("Registering {} packages in the rpm database", rpms.len());

        Cmd::new("rpm")
            .args(["--install", "--verbose", "--justdb", "--root"])
            .arg_path(installroot)
            .arg_paths(&rpms)
            .run_status()
    }

    /// Query a package attribute from the enabled repositories.
    ///
    /// `query_format` is a repoquery format such as `%{VERSION}`.
    pub fn repoquery(&self, package: &str, query_format: &str) -> Result<String> {
        let result = Cmd::new("repoquery")
            .arg("-c")
            .arg_path(self.conf_path())
            .args(self.config.repo_flags())
            .arg(format!("--queryformat={}", query_format))
            .arg(package)
            .error_msg(format!("repoquery for '{}' failed", package))
            .run()?;

        result
            .stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .with_context(|| format!("repoquery found no package '{}'", package))
    }
}

fn downloaded_rpms(dir: &TempDir) -> Result<Vec<PathBuf>> {
    let mut rpms = Vec::new();
    for entry in fs::read_dir(dir.path())
        .with_context(|| format!("Failed to read {}", dir.path().display()))?
    {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "rpm") {
            rpms.push(path);
        }
    }
    rpms.sort();
    Ok(rpms)
}
