//! Python version constraints.
//!
//! A [`VersionConstraint`] is the range of interpreter versions the packaged
//! application accepts. It is compared against `(major, minor)` of the
//! running interpreter by the generated bootstrap module.

use crate::error::{BuildError, Result};
use std::fmt;
use std::str::FromStr;

/// A Python `major.minor` version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PythonVersion {
    major: u32,
    minor: u32,
}

impl PythonVersion {
    /// The lowest possible version, used when no minimum is configured.
    pub const ANY: Self = Self::new(0, 0);

    /// Create a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The major component.
    #[must_use]
    pub const fn major(self) -> u32 {
        self.major
    }

    /// The minor component.
    #[must_use]
    pub const fn minor(self) -> u32 {
        self.minor
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PythonVersion {
    type Err = BuildError;

    /// Parse `X` or `X.Y`. A bare major version means `X.0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pyzapp::version::PythonVersion;
    ///
    /// let version: PythonVersion = "3.12".parse().expect("valid version");
    /// assert_eq!(version, PythonVersion::new(3, 12));
    /// ```
    fn from_str(text: &str) -> Result<Self> {
        let invalid = || BuildError::InvalidVersionConstraint {
            reason: format!("`{text}` is not a version of the form X.Y"),
        };
        let trimmed = text.trim();
        let (major, minor) = match trimmed.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (trimmed, "0"),
        };
        let major = major.parse().map_err(|_| invalid())?;
        let minor = minor.parse().map_err(|_| invalid())?;
        Ok(Self::new(major, minor))
    }
}

/// The upper end of a version range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpperBound {
    /// Any version at or above the minimum is accepted.
    Unbounded,
    /// Versions up to and including this one are accepted.
    Inclusive(PythonVersion),
    /// Versions strictly below this one are accepted.
    Exclusive(PythonVersion),
}

/// An accepted range of Python versions.
///
/// # Examples
///
/// ```
/// use pyzapp::version::{PythonVersion, VersionConstraint};
///
/// let constraint = VersionConstraint::between(PythonVersion::new(3, 8), PythonVersion::new(3, 12))
///     .expect("minimum is below maximum");
/// assert!(constraint.contains(PythonVersion::new(3, 12)));
/// assert!(!constraint.contains(PythonVersion::new(3, 13)));
/// assert_eq!(constraint.to_string(), "3.8 <= version <= 3.12");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionConstraint {
    minimum: PythonVersion,
    maximum: UpperBound,
}

impl VersionConstraint {
    /// Create a constraint, checking that the range is not empty.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidVersionConstraint`] when the minimum is
    /// above an inclusive maximum, or not below an exclusive one.
    pub fn new(minimum: PythonVersion, maximum: UpperBound) -> Result<Self> {
        let empty = match maximum {
            UpperBound::Unbounded => false,
            UpperBound::Inclusive(max) => minimum > max,
            UpperBound::Exclusive(max) => minimum >= max,
        };
        let constraint = Self { minimum, maximum };
        if empty {
            return Err(BuildError::InvalidVersionConstraint {
                reason: format!("minimum {minimum} is above the maximum in `{constraint}`"),
            });
        }
        Ok(constraint)
    }

    /// Build a constraint from optional textual bounds.
    ///
    /// No bounds at all means no constraint. A maximum without a minimum
    /// accepts every version up to the maximum.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidVersionConstraint`] when a bound does not
    /// parse or the range is empty.
    pub fn from_bounds(
        minimum: Option<&str>,
        maximum: Option<&str>,
        exclusive_maximum: bool,
    ) -> Result<Option<Self>> {
        if minimum.is_none() && maximum.is_none() {
            return Ok(None);
        }
        let minimum = minimum
            .map(str::parse)
            .transpose()?
            .unwrap_or(PythonVersion::ANY);
        let maximum = match maximum.map(str::parse).transpose()? {
            None => UpperBound::Unbounded,
            Some(max) if exclusive_maximum => UpperBound::Exclusive(max),
            Some(max) => UpperBound::Inclusive(max),
        };
        Self::new(minimum, maximum).map(Some)
    }

    /// Accept `minimum` and everything newer.
    #[must_use]
    pub const fn at_least(minimum: PythonVersion) -> Self {
        Self {
            minimum,
            maximum: UpperBound::Unbounded,
        }
    }

    /// Accept the inclusive range `[minimum, maximum]`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidVersionConstraint`] when `minimum` is
    /// greater than `maximum`.
    pub fn between(minimum: PythonVersion, maximum: PythonVersion) -> Result<Self> {
        Self::new(minimum, UpperBound::Inclusive(maximum))
    }

    /// The lowest accepted version.
    #[must_use]
    pub const fn minimum(&self) -> PythonVersion {
        self.minimum
    }

    /// The upper bound.
    #[must_use]
    pub const fn maximum(&self) -> UpperBound {
        self.maximum
    }

    /// Whether `version` lies inside the range.
    #[must_use]
    pub fn contains(&self, version: PythonVersion) -> bool {
        version >= self.minimum
            && match self.maximum {
                UpperBound::Unbounded => true,
                UpperBound::Inclusive(max) => version <= max,
                UpperBound::Exclusive(max) => version < max,
            }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.minimum == PythonVersion::ANY {
            return match self.maximum {
                UpperBound::Unbounded => f.write_str("any version"),
                UpperBound::Inclusive(max) => write!(f, "version <= {max}"),
                UpperBound::Exclusive(max) => write!(f, "version < {max}"),
            };
        }
        match self.maximum {
            UpperBound::Unbounded => write!(f, "version >= {}", self.minimum),
            UpperBound::Inclusive(max) => write!(f, "{} <= version <= {max}", self.minimum),
            UpperBound::Exclusive(max) => write!(f, "{} <= version < {max}", self.minimum),
        }
    }
}
