use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A linkding release version, `MAJOR.MINOR.PATCH[-suffix]`.
///
/// Ordering ignores the suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub suffix: Option<String>,
}

/// First release whose bookmark API honours the `bundle` filter.
pub const BUNDLE_FILTER_MIN_VERSION: Version = Version {
    major: 1,
    minor: 42,
    patch: 0,
    suffix: None,
};

impl Version {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            suffix: None,
        }
    }

    /// Compare on the numeric components only.
    #[must_use]
    pub fn cmp_release(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }

    #[must_use]
    pub fn at_least(&self, other: &Self) -> bool {
        self.cmp_release(other) != Ordering::Less
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to parse {0:?} as a version string")]
pub struct ParseVersionError(String);

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());

        let mut parts = s.trim().splitn(3, '.');
        let (Some(major), Some(minor), Some(rest)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(err());
        };

        let (patch, suffix) = match rest.split_once('-') {
            Some((patch, suffix)) => (patch, Some(suffix.to_string())),
            None => (rest, None),
        };

        Ok(Self {
            major: major.parse().map_err(|_| err())?,
            minor: minor.parse().map_err(|_| err())?,
            patch: patch.parse().map_err(|_| err())?,
            suffix: suffix.filter(|s| !s.is_empty()),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(suffix) = &self.suffix {
            write!(f, "-{suffix}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_suffix() {
        let version: Version = "1.44.2-rc.4".parse().unwrap();
        assert_eq!(version.major, 1);
        assert_eq!(version.minor, 44);
        assert_eq!(version.patch, 2);
        assert_eq!(version.suffix.as_deref(), Some("rc.4"));
        assert_eq!(version.to_string(), "1.44.2-rc.4");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("1.44".parse::<Version>().is_err());
        assert!("one.two.three".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
        assert!("1.2.x-beta".parse::<Version>().is_err());
    }

    #[test]
    fn test_compare_ignores_suffix() {
        let cases = [
            (Version::new(1, 43, 5), Version::new(1, 44, 0), Ordering::Less),
            (
                Version::new(1, 43, 5),
                Version {
                    suffix: Some("ignored".to_string()),
                    ..Version::new(1, 43, 5)
                },
                Ordering::Equal,
            ),
            (Version::new(1, 44, 0), Version::new(1, 44, 0), Ordering::Equal),
            (Version::new(1, 43, 12), Version::new(1, 43, 9), Ordering::Greater),
        ];

        for (x, y, expected) in cases {
            assert_eq!(x.cmp_release(&y), expected, "{x} vs {y}");
        }
    }

    #[test]
    fn test_bundle_filter_threshold() {
        assert!(Version::new(1, 44, 1).at_least(&BUNDLE_FILTER_MIN_VERSION));
        assert!(!Version::new(1, 41, 0).at_least(&BUNDLE_FILTER_MIN_VERSION));
    }
}
