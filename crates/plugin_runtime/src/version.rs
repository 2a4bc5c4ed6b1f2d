//! Plugin versions and version-matching policies

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Semantic version of a plugin. Ordering is major, then minor, then patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Finds a version embedded in a plugin file name.
    ///
    /// Accepts three consecutive integer fields separated by `.` or `-`, as in
    /// `plugin_foo.1.2.6.so` or `plugin_foo-1-2-6.so`.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let fields: Vec<&str> = file_name.split(['.', '-']).collect();
        fields.windows(3).find_map(|w| {
            Some(Self::new(
                parse_field(w[0])?,
                parse_field(w[1])?,
                parse_field(w[2])?,
            ))
        })
    }
}

fn parse_field(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Error returned when a version string is not `major.minor.patch`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid version string: {0:?} (expected major.minor.patch)")]
pub struct ParseVersionError(String);

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());
        let mut parts = s.trim().split('.');
        let mut next = || parts.next().and_then(parse_field).ok_or_else(err);
        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Rule used to match a requested version against a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// Candidate must be at least the requested version
    #[default]
    Minimum,
    /// Candidate must equal the requested version
    Exact,
}

impl VersionPolicy {
    pub fn accepts(self, requested: Version, candidate: Version) -> bool {
        match self {
            Self::Minimum => candidate >= requested,
            Self::Exact => candidate == requested,
        }
    }
}

impl FromStr for VersionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimum" => Ok(Self::Minimum),
            "exact" => Ok(Self::Exact),
            other => Err(format!("Unknown version policy: {other:?}")),
        }
    }
}

impl fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimum => f.write_str("minimum"),
            Self::Exact => f.write_str("exact"),
        }
    }
}
