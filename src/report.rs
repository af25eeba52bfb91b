//! Build results and the end-of-run summary.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::tarball::TarballInfo;
use crate::target::{BaseArch, Dver};

/// A tarball written by a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenTarball {
    pub bundle: String,
    pub dver: Dver,
    pub basearch: BaseArch,
    #[serde(flatten)]
    pub tarball: TarballInfo,
}

/// A (bundle, dver, basearch) combination that failed.
#[derive(Debug, Clone, Serialize)]
pub struct FailedBuild {
    pub bundle: String,
    pub dver: Dver,
    pub basearch: BaseArch,
    /// Staging directory left behind for inspection, if one was created.
    pub stage_dir: Option<PathBuf>,
    pub reason: String,
}

/// Results accumulated over one run.
#[derive(Debug, Default, Serialize)]
pub struct BuildReport {
    pub written: Vec<WrittenTarball>,
    pub failed: Vec<FailedBuild>,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_written(&mut self, written: WrittenTarball) {
        self.written.push(written);
    }

    pub fn record_failed(&mut self, failed: FailedBuild) {
        self.failed.push(failed);
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// 0 if nothing failed, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.all_succeeded() {
            0
        } else {
            1
        }
    }

    /// Summary lines for written tarballs.
    pub fn written_lines(&self) -> Vec<String> {
        self.written
            .iter()
            .map(|w| {
                let files = w
                    .tarball
                    .file_count
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string());
                format!(
                    "    path: {:<50} size: {:>9} bytes {:>5} files",
                    w.tarball.path.display(),
                    w.tarball.size,
                    files
                )
            })
            .collect()
    }

    /// Summary lines for failed parameter sets.
    pub fn failed_lines(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|f| {
                format!(
                    "    bundle: {:<20} dver: {:>3} buildarch: {:<6}",
                    f.bundle,
                    f.dver.as_str(),
                    f.basearch.as_str()
                )
            })
            .collect()
    }

    /// Print the summary to stdout.
    pub fn print(&self) {
        if !self.written.is_empty() {
            println!("The following tarballs were written:");
            for line in self.written_lines() {
                println!("{}", line);
            }
        }
        if !self.failed.is_empty() {
            println!("The following sets of parameters failed:");
            for line in self.failed_lines() {
                println!("{}", line);
            }
        }
    }

    /// Write the report as JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written() -> WrittenTarball {
        WrittenTarball {
            bundle: "osg-wn-client".to_string(),
            dver: Dver::El6,
            basearch: BaseArch::X86_64,
            tarball: TarballInfo {
                path: PathBuf::from("osg-wn-client-3.4.1-2.el6.x86_64.tar.gz"),
                size: 1234,
                file_count: None,
                sha256: "00".repeat(32),
            },
        }
    }

    fn failed() -> FailedBuild {
        FailedBuild {
            bundle: "osg-afs-client".to_string(),
            dver: Dver::El5,
            basearch: BaseArch::I386,
            stage_dir: Some(PathBuf::from("/tmp/stagedir-el5-i386-x")),
            reason: "stage 1 failed".to_string(),
        }
    }

    #[test]
    fn test_exit_code_tracks_failures() {
        let mut report = BuildReport::new();
        assert_eq!(report.exit_code(), 0);

        report.record_written(written());
        assert_eq!(report.exit_code(), 0);

        report.record_failed(failed());
        assert_eq!(report.exit_code(), 1);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_summary_lines() {
        let mut report = BuildReport::new();
        report.record_written(written());
        report.record_failed(failed());

        let line = &report.written_lines()[0];
        assert!(line.starts_with("    path: osg-wn-client-3.4.1-2.el6.x86_64.tar.gz"));
        assert!(line.ends_with("size:      1234 bytes     ? files"));

        assert_eq!(
            report.failed_lines(),
            ["    bundle: osg-afs-client       dver: el5 buildarch: i386  "]
        );
    }

    #[test]
    fn test_json_report() {
        let mut report = BuildReport::new();
        report.record_written(written());
        report.record_failed(failed());

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("report.json");
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["written"][0]["dver"], "el6");
        assert_eq!(value["written"][0]["basearch"], "x86_64");
        assert_eq!(value["written"][0]["size"], 1234);
        assert_eq!(value["failed"][0]["reason"], "stage 1 failed");
    }
}
