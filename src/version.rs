//! Protocol-version gating of fields
//!
//! Fields may carry a [`VersionRange`]; when a decode or encode call is given
//! a current [`Version`], fields whose range excludes it behave as if their
//! condition were false.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Semantic version, ordered by `(major, minor, patch)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Malformed version string
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionParseError(pub String);

impl Display for VersionParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed version `{}`", self.0)
    }
}

impl std::error::Error for VersionParseError {}

impl FromStr for Version {
    type Err = VersionParseError;

    /// Parses `major[.minor[.patch]]`; omitted components are zero and any
    /// pre-release or build suffix (`-rc1`, `+meta`) is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let core = s
            .trim()
            .split(|c| c == '-' || c == '+')
            .next()
            .unwrap_or_default();
        let mut parts = [0u64; 3];
        let mut count = 0;
        for (i, piece) in core.split('.').enumerate() {
            if i >= 3 {
                return Err(VersionParseError(s.to_owned()));
            }
            parts[i] = piece
                .parse()
                .map_err(|_| VersionParseError(s.to_owned()))?;
            count += 1;
        }
        if count == 0 {
            return Err(VersionParseError(s.to_owned()));
        }
        Ok(Version::new(parts[0], parts[1], parts[2]))
    }
}

/// Inclusive version bounds; either side may be open
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct VersionRange {
    pub min: Option<Version>,
    pub max: Option<Version>,
}

impl VersionRange {
    #[must_use]
    pub const fn new(min: Option<Version>, max: Option<Version>) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn since(min: Version) -> Self {
        Self::new(Some(min), None)
    }

    #[must_use]
    pub const fn until(max: Version) -> Self {
        Self::new(None, Some(max))
    }

    #[must_use]
    pub fn contains(&self, v: &Version) -> bool {
        self.min.map_or(true, |min| min <= *v) && self.max.map_or(true, |max| *v <= max)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_order() {
        let v: Version = "1.10".parse().unwrap();
        assert_eq!(v, Version::new(1, 10, 0));
        assert!(Version::new(1, 2, 0) < v);
        assert_eq!("2.0.1-rc1".parse::<Version>().unwrap(), Version::new(2, 0, 1));
        assert!("1.x".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
    }

    #[test]
    fn open_bounds() {
        let r = VersionRange::since(Version::new(1, 0, 0));
        assert!(r.contains(&Version::new(7, 0, 0)));
        assert!(!r.contains(&Version::new(0, 9, 9)));
        let r = VersionRange::new(Some(Version::new(1, 0, 0)), Some(Version::new(1, 5, 0)));
        assert!(r.contains(&Version::new(1, 5, 0)));
        assert!(!r.contains(&Version::new(1, 5, 1)));
        assert!(VersionRange::default().contains(&Version::default()));
    }
}
