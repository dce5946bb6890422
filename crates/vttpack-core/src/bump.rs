use crate::CoreError;
use std::cmp::Ordering;
use vttpack_schema::{Version, VersionError};

/// How the next release version is chosen from the latest one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionBump {
    Major,
    Minor,
    Patch,
    Exact(Version),
}

impl VersionBump {
    /// Parse the `-u` argument: `major`, `minor`, `patch` (any case) or an
    /// explicit version string.
    pub fn parse(input: Option<&str>) -> Result<Self, CoreError> {
        let input = input.map(str::trim).filter(|s| !s.is_empty());
        let Some(input) = input else {
            return Err(CoreError::MissingVersion);
        };
        Ok(match input.to_ascii_lowercase().as_str() {
            "major" => Self::Major,
            "minor" => Self::Minor,
            "patch" => Self::Patch,
            _ => Self::Exact(Version::parse(input)?),
        })
    }

    /// Compute the next version. Bumping a component resets the ones below it
    /// and drops any addon.
    pub fn apply(&self, current: &Version) -> Result<Version, CoreError> {
        let bumped = |component: &'static str, value: u64| {
            value.checked_add(1).ok_or_else(|| VersionError::Overflow {
                component,
                version: current.to_string(),
            })
        };
        Ok(match self {
            Self::Major => Version::new(bumped("major", current.major)?, 0, 0),
            Self::Minor => Version::new(current.major, bumped("minor", current.minor)?, 0),
            Self::Patch => Version::new(
                current.major,
                current.minor,
                bumped("patch", current.patch)?,
            ),
            Self::Exact(version) => version.clone(),
        })
    }
}

/// Reject `next` unless it is strictly above `latest` on major/minor/patch.
pub fn ensure_newer(latest: &Version, next: &Version) -> Result<(), CoreError> {
    if next.cmp_release(latest) == Ordering::Greater {
        Ok(())
    } else {
        Err(CoreError::NotNewer {
            old: latest.to_string(),
            new: next.to_string(),
        })
    }
}
