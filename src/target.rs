//! Build targets: distro version and base architecture.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported distro versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dver {
    El5,
    El6,
}

/// Supported base architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize)]
pub enum BaseArch {
    #[value(name = "i386")]
    #[serde(rename = "i386")]
    I386,
    #[value(name = "x86_64")]
    #[serde(rename = "x86_64")]
    X86_64,
}

pub const DEFAULT_BASEARCH: BaseArch = BaseArch::X86_64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("invalid dver '{0}', must be one of: el5, el6")]
    Dver(String),

    #[error("invalid basearch '{0}', must be one of: i386, x86_64")]
    BaseArch(String),

    #[error("invalid paramset '{0}', expected 'dver,basearch'")]
    ParamSet(String),
}

impl Dver {
    pub const ALL: [Dver; 2] = [Dver::El5, Dver::El6];

    pub fn as_str(self) -> &'static str {
        match self {
            Dver::El5 => "el5",
            Dver::El6 => "el6",
        }
    }
}

impl BaseArch {
    pub const ALL: [BaseArch; 2] = [BaseArch::I386, BaseArch::X86_64];

    pub fn as_str(self) -> &'static str {
        match self {
            BaseArch::I386 => "i386",
            BaseArch::X86_64 => "x86_64",
        }
    }
}

impl fmt::Display for Dver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BaseArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dver {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dver::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| TargetError::Dver(s.to_string()))
    }
}

impl FromStr for BaseArch {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BaseArch::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| TargetError::BaseArch(s.to_string()))
    }
}

/// One (dver, basearch) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ParamSet {
    pub dver: Dver,
    pub basearch: BaseArch,
}

impl ParamSet {
    pub fn new(dver: Dver, basearch: BaseArch) -> Self {
        Self { dver, basearch }
    }

    /// Every combination of the supported domains.
    pub fn all() -> impl Iterator<Item = ParamSet> {
        Dver::ALL
            .into_iter()
            .flat_map(|d| BaseArch::ALL.into_iter().map(move |a| ParamSet::new(d, a)))
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.dver, self.basearch)
    }
}

impl FromStr for ParamSet {
    type Err = TargetError;

    /// Parse `el6,x86_64`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (dver, basearch) = s
            .split_once(',')
            .ok_or_else(|| TargetError::ParamSet(s.to_string()))?;
        Ok(ParamSet::new(dver.trim().parse()?, basearch.trim().parse()?))
    }
}

/// Parse a whitespace-separated `paramsets` value, keeping declaration order.
pub fn parse_paramsets(value: &str) -> Result<Vec<ParamSet>, TargetError> {
    value.split_whitespace().map(str::parse).collect()
}
