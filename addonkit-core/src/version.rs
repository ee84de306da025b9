//! Version parsing and npm-style range matching.
//!
//! Versions have up to four numeric components
//! (`major.minor.build.revision`); missing trailing components count as 0,
//! so `1.2` and `1.2.0.0` are the same version.
//!
//! Supported range forms:
//!
//! - empty or `*`: anything
//! - `1.2.3` or `=1.2.3`: exact match
//! - `^1.2.3`: same left-most non-zero component, at least `1.2.3`
//! - `~1.2.3`: same major and minor, at least `1.2.3`
//! - `1.2.x`, `1.*`: wildcard components are unconstrained
//! - `>=1.0 <2.0`: space-separated comparisons, all must hold
//!
//! # Examples
//!
//! ```
//! use addonkit_core::version::satisfies;
//!
//! assert!(satisfies("1.4.0", Some("^1.2")));
//! assert!(!satisfies("2.0.0", Some(">=1.0 <2.0")));
//! assert!(satisfies("whatever", None));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

const MAX_COMPONENTS: usize = 4;

/// Failure to parse a version string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version '{0}'")]
pub struct VersionParseError(pub String);

/// A numeric version of one to four components
#[derive(Debug, Clone, Copy)]
pub struct Version {
    components: [u64; MAX_COMPONENTS],
    /// Number of components written, kept for display only
    written: usize,
}

impl Version {
    pub fn new(major: u64, minor: u64, build: u64, revision: u64) -> Self {
        Self {
            components: [major, minor, build, revision],
            written: MAX_COMPONENTS,
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        input.parse()
    }

    pub fn major(&self) -> u64 {
        self.components[0]
    }

    pub fn minor(&self) -> u64 {
        self.components[1]
    }

    pub fn build(&self) -> u64 {
        self.components[2]
    }

    pub fn revision(&self) -> u64 {
        self.components[3]
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionParseError(input.to_string());
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let mut components = [0u64; MAX_COMPONENTS];
        let mut written = 0;
        for part in trimmed.split('.') {
            if written == MAX_COMPONENTS || !is_numeric(part) {
                return Err(invalid());
            }
            components[written] = part.parse().map_err(|_| invalid())?;
            written += 1;
        }

        Ok(Self {
            components,
            written,
        })
    }
}

fn is_numeric(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.written.max(1);
        for (i, component) in self.components[..shown].iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

/// Does `version` satisfy `range`?
///
/// Never fails: an unparseable version or range simply does not satisfy.
pub fn satisfies(version: &str, range: Option<&str>) -> bool {
    let range = match range.map(str::trim) {
        None | Some("") | Some("*") => return true,
        Some(range) => range,
    };

    let Ok(candidate) = Version::parse(version) else {
        return false;
    };

    if !range.contains(['>', '<', '~', '^', 'x', 'X', '*']) {
        let exact = range.strip_prefix('=').unwrap_or(range);
        return Version::parse(exact).is_ok_and(|v| candidate == v);
    }

    if let Some(base) = range.strip_prefix('^') {
        return Version::parse(base).is_ok_and(|min| caret(&candidate, &min));
    }

    if let Some(base) = range.strip_prefix('~') {
        return Version::parse(base).is_ok_and(|min| {
            candidate >= min && candidate.major() == min.major() && candidate.minor() == min.minor()
        });
    }

    if range.contains(['x', 'X', '*']) {
        return wildcard(&candidate, range);
    }

    range
        .split_whitespace()
        .all(|clause| comparison(&candidate, clause))
}

fn caret(candidate: &Version, min: &Version) -> bool {
    if candidate < min {
        return false;
    }
    match (min.major(), min.minor()) {
        (0, 0) => {
            candidate.major() == 0
                && candidate.minor() == 0
                && candidate.build() == min.build()
        }
        (0, minor) => candidate.major() == 0 && candidate.minor() == minor,
        (major, _) => candidate.major() == major,
    }
}

fn wildcard(candidate: &Version, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('.').collect();
    if parts.len() > MAX_COMPONENTS {
        return false;
    }
    parts.iter().enumerate().all(|(i, part)| match *part {
        "x" | "X" | "*" => true,
        explicit => is_numeric(explicit)
            && explicit
                .parse::<u64>()
                .is_ok_and(|n| candidate.component(i) == n),
    })
}

fn comparison(candidate: &Version, clause: &str) -> bool {
    let (op, rest) = if let Some(rest) = clause.strip_prefix(">=") {
        (Ordering::is_ge as fn(Ordering) -> bool, rest)
    } else if let Some(rest) = clause.strip_prefix("<=") {
        (Ordering::is_le as fn(Ordering) -> bool, rest)
    } else if let Some(rest) = clause.strip_prefix('>') {
        (Ordering::is_gt as fn(Ordering) -> bool, rest)
    } else if let Some(rest) = clause.strip_prefix('<') {
        (Ordering::is_lt as fn(Ordering) -> bool, rest)
    } else if let Some(rest) = clause.strip_prefix('=') {
        (Ordering::is_eq as fn(Ordering) -> bool, rest)
    } else {
        (Ordering::is_eq as fn(Ordering) -> bool, clause)
    };

    Version::parse(rest).is_ok_and(|bound| op(candidate.cmp(&bound)))
}
