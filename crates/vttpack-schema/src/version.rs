//! Release version strings: `[v]MAJOR[.MINOR[.PATCH[-ADDON]]]`.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Components are capped at 19 digits, which always fit in a `u64`.
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^v?([0-9]{1,19})(?:\.([0-9]{1,19})(?:\.([0-9]{1,19})(?:-(.+))?)?)?$")
        .expect("invalid regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error(
        "invalid version format: '{0}', expected \"v0\", \"v0.0\", \"v0.0.0\" or \"v0.0.0-addon\""
    )]
    InvalidFormat(String),
    #[error("cannot increment the {component} component of {version}: it is already at its maximum")]
    Overflow {
        component: &'static str,
        version: String,
    },
}

/// A parsed release version. Ordering compares major, minor and patch
/// numerically, then the addon lexicographically (no addon sorts first).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub addon: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            addon: None,
        }
    }

    #[must_use]
    pub fn with_addon(mut self, addon: impl Into<String>) -> Self {
        self.addon = Some(addon.into());
        self
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::InvalidFormat(input.to_owned());
        let caps = VERSION_PATTERN.captures(input).ok_or_else(invalid)?;
        let number = |idx: usize| -> Result<u64, VersionError> {
            caps.get(idx)
                .map_or(Ok(0), |m| m.as_str().parse::<u64>().map_err(|_| invalid()))
        };
        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            addon: caps.get(4).map(|m| m.as_str().to_owned()),
        })
    }

    /// Compare major, minor and patch only, ignoring the addon.
    pub fn cmp_release(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(addon) = &self.addon {
            write!(f, "-{addon}")?;
        }
        Ok(())
    }
}

pub fn is_version_string(input: &str) -> bool {
    VERSION_PATTERN.is_match(input)
}

/// Sort comparator over raw strings. Falls back to plain string comparison
/// when either side does not parse.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb),
        _ => a.cmp(b),
    }
}
