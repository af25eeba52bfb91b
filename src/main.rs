//! make-client-tarball - builds relocatable client tarballs.
//!
//! Each requested bundle is installed into a throwaway root for one or more
//! (dver, basearch) targets, patched, and archived:
//! - stage 1 seeds the root's RPM database without installing files
//! - stage 2 installs the bundle's packages and applies overlays
//! - the root is packed into a `.tar.gz` named from the bundle definition

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use client_tarball::commands::{self, BuildOptions};
use client_tarball::config::Config;
use client_tarball::target::{BaseArch, Dver, ParamSet, DEFAULT_BASEARCH};
use client_tarball::yum::PRERELEASE_REPO;

#[derive(Parser)]
#[command(name = "make-client-tarball")]
#[command(about = "Build client tarballs from RPM bundles")]
#[command(disable_version_flag = true)]
#[command(
    after_help = "EXAMPLES:\n  make-client-tarball --osgver 3.4 --all\n  make-client-tarball --bundle osg-wn-client --dver el6 --basearch i386 --keep"
)]
struct Cli {
    /// Release series; selects the default bundle list for it
    #[arg(short, long)]
    osgver: Option<String>,

    /// Version to put in the tarball name (default: from the version RPM)
    #[arg(long = "version", value_name = "VERSION")]
    tarball_version: Option<String>,

    /// Release number to put in the tarball name
    #[arg(short, long, default_value = "1")]
    relnum: String,

    /// Use the prerelease repository (default)
    #[arg(long, overrides_with = "no_prerelease")]
    prerelease: bool,

    /// Do not use the prerelease repository
    #[arg(long, visible_alias = "noprerelease", overrides_with = "prerelease")]
    no_prerelease: bool,

    /// Distro version to build for
    #[arg(short, long, value_enum)]
    dver: Option<Dver>,

    /// Base architecture to build for
    #[arg(short, long, value_enum, default_value_t = DEFAULT_BASEARCH)]
    basearch: BaseArch,

    /// Build every (dver, basearch) combination each bundle declares
    #[arg(short, long)]
    all: bool,

    /// Keep staging directories after a successful build
    #[arg(long)]
    keep: bool,

    /// Bundle to build (repeatable; default: the release's bundle list)
    #[arg(long = "bundle", value_name = "NAME")]
    bundles: Vec<String>,

    /// Extra repository to enable (repeatable)
    #[arg(long = "extra-repos", value_name = "REPO")]
    extra_repos: Vec<String>,

    /// Directory holding bundles.ini, repo files, package lists and patches
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory tarballs are written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write the build report as JSON
    #[arg(long, value_name = "FILE")]
    summary_json: Option<PathBuf>,

    /// Print the resolved configuration and exit
    #[arg(long)]
    show_config: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn validate(&self) -> Result<(), clap::Error> {
        let mut cmd = Cli::command();
        if !self.all && self.dver.is_none() {
            return Err(cmd.error(
                ErrorKind::MissingRequiredArgument,
                "Either --all or --dver must be specified",
            ));
        }
        if self.osgver.is_none() && self.bundles.is_empty() {
            return Err(cmd.error(
                ErrorKind::MissingRequiredArgument,
                "Either --osgver or --bundle must be specified",
            ));
        }
        Ok(())
    }

    fn into_options(self) -> BuildOptions {
        let mut extra_repos = self.extra_repos;
        if !self.no_prerelease {
            extra_repos.push(PRERELEASE_REPO.to_string());
        }

        BuildOptions {
            bundles: self.bundles,
            osgver: self.osgver,
            all: self.all,
            target: self.dver.map(|dver| ParamSet::new(dver, self.basearch)),
            version: self.tarball_version,
            relnum: self.relnum,
            extra_repos,
            keep: self.keep,
            output_dir: self.output_dir,
            summary_json: self.summary_json,
        }
    }
}

/// Exit code for a rejected command line. Usage errors exit 1; 2 is
/// reserved for "no default bundle set".
fn usage_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_exit_code(e.kind()));
        }
    };

    // Load .env if present
    dotenvy::dotenv().ok();
    init_logging(cli.verbose);
    let config = Config::load(cli.data_dir.as_deref());

    if cli.show_config {
        return match commands::cmd_show_config(&config, cli.osgver.as_deref()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{:#}", e);
                ExitCode::from(1)
            }
        };
    }

    if let Err(e) = cli.validate() {
        let _ = e.print();
        return ExitCode::from(usage_exit_code(e.kind()));
    }

    let opts = cli.into_options();
    match commands::cmd_build(&config, &opts) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("make-client-tarball").chain(args.iter().copied()))
    }

    fn options(args: &[&str]) -> BuildOptions {
        let cli = parse(args).unwrap();
        cli.validate().unwrap();
        cli.into_options()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_prerelease_repo_enabled_by_default() {
        let opts = options(&["--osgver", "3.4", "--all", "--extra-repos", "osg-upcoming"]);
        assert_eq!(opts.extra_repos, ["osg-upcoming", PRERELEASE_REPO]);

        let opts = options(&["--osgver", "3.4", "--all", "--prerelease"]);
        assert_eq!(opts.extra_repos, [PRERELEASE_REPO]);
    }

    #[test]
    fn test_no_prerelease_and_alias() {
        for flag in ["--no-prerelease", "--noprerelease"] {
            let opts = options(&["--osgver", "3.4", "--all", flag]);
            assert!(opts.extra_repos.is_empty(), "{}", flag);
        }

        // The last of the pair wins
        let opts = options(&["--bundle", "wn", "--all", "--no-prerelease", "--prerelease"]);
        assert_eq!(opts.extra_repos, [PRERELEASE_REPO]);
    }

    #[test]
    fn test_single_target_options() {
        let opts = options(&[
            "--bundle", "wn", "--bundle", "afs", "--dver", "el6", "--version", "3.4.1", "-r", "2",
        ]);
        assert_eq!(opts.bundles, ["wn", "afs"]);
        assert_eq!(opts.target, Some(ParamSet::new(Dver::El6, BaseArch::X86_64)));
        assert_eq!(opts.version.as_deref(), Some("3.4.1"));
        assert_eq!(opts.relnum, "2");
        assert!(!opts.all);
        assert!(!opts.keep);

        let opts = options(&["-o", "3.4", "-d", "el5", "-b", "i386", "--keep"]);
        assert_eq!(opts.target, Some(ParamSet::new(Dver::El5, BaseArch::I386)));
        assert!(opts.keep);
    }

    #[test]
    fn test_invalid_target_values_exit_1() {
        for args in [
            ["--osgver", "3.4", "--dver", "el7"],
            ["--osgver", "3.4", "--basearch", "sparc"],
        ] {
            let err = parse(&args).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::InvalidValue);
            assert_eq!(usage_exit_code(err.kind()), 1);
        }
    }

    #[test]
    fn test_missing_required_choices_exit_1() {
        let err = parse(&["--osgver", "3.4"]).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("--all or --dver"));
        assert_eq!(usage_exit_code(err.kind()), 1);

        let err = parse(&["--all"]).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("--osgver or --bundle"));
        assert_eq!(usage_exit_code(err.kind()), 1);
    }

    #[test]
    fn test_help_exits_0() {
        let err = parse(&["--help"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert_eq!(usage_exit_code(err.kind()), 0);
    }
}
