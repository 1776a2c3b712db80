//! Semantic versions and the ranges used to select codemods and registry
//! versions.
//!
//! Ranges built from a current version always exclude the current version
//! itself: codemods shipped for the version a project already runs are never
//! re-applied.

use crate::error::{DomainError, DomainResult};
use semver::{Prerelease, Version};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Parse a semantic version. A leading `v` is tolerated.
pub fn parse(input: &str) -> DomainResult<Version> {
    let trimmed = input.trim();
    let raw = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(raw).map_err(|_| DomainError::InvalidVersion {
        input: input.to_string(),
    })
}

/// True if `input` is an exact version literal (no range operators, no `v`).
pub fn is_literal(input: &str) -> bool {
    Version::parse(input).is_ok()
}

/// Precedence comparison; build metadata is ignored.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.cmp_precedence(b)
}

/// Lowest possible version of a release line: `<major>.<minor>.<patch>-0`.
fn floor(v: &Version) -> Version {
    let mut out = Version::new(v.major, v.minor, v.patch);
    out.pre = Prerelease::new("0").unwrap_or(Prerelease::EMPTY);
    out
}

/// The next major release. A prerelease of an `X.0.0` line resolves to `X.0.0`.
pub fn next_major(current: &Version) -> Version {
    if !current.pre.is_empty() && current.minor == 0 && current.patch == 0 {
        Version::new(current.major, 0, 0)
    } else {
        Version::new(current.major + 1, 0, 0)
    }
}

/// The next minor release. A prerelease of an `X.Y.0` line resolves to `X.Y.0`.
pub fn next_minor(current: &Version) -> Version {
    if !current.pre.is_empty() && current.patch == 0 {
        Version::new(current.major, current.minor, 0)
    } else {
        Version::new(current.major, current.minor + 1, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(version: Version) -> Self {
        Self {
            version,
            inclusive: true,
        }
    }

    pub fn exclusive(version: Version) -> Self {
        Self {
            version,
            inclusive: false,
        }
    }
}

/// A semantic-version interval. Missing bounds are unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Range {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl Range {
    /// Matches every version.
    pub fn any() -> Self {
        Self::default()
    }

    /// `>from <=to`
    pub fn between(from: Version, to: Version) -> Self {
        Self {
            lower: Some(Bound::exclusive(from)),
            upper: Some(Bound::inclusive(to)),
        }
    }

    /// `=version`
    pub fn exact(version: Version) -> Self {
        Self {
            lower: Some(Bound::inclusive(version.clone())),
            upper: Some(Bound::inclusive(version)),
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        if let Some(lower) = &self.lower {
            match compare(version, &lower.version) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper {
            match compare(version, &upper.version) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }
        true
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.lower, &self.upper) {
            (None, None) => f.write_str("*"),
            (Some(l), Some(u)) if l.inclusive && u.inclusive && l.version == u.version => {
                write!(f, "={}", l.version)
            }
            (lower, upper) => {
                let mut parts = Vec::new();
                if let Some(l) = lower {
                    parts.push(format!("{}{}", if l.inclusive { ">=" } else { ">" }, l.version));
                }
                if let Some(u) = upper {
                    parts.push(format!("{}{}", if u.inclusive { "<=" } else { "<" }, u.version));
                }
                f.write_str(&parts.join(" "))
            }
        }
    }
}

impl FromStr for Range {
    type Err = DomainError;

    /// Accepts space-separated comparators (`>`, `>=`, `<`, `<=`, `=`), a bare
    /// version (exact match), or `*` / empty for any version.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| DomainError::InvalidRange {
            input: input.to_string(),
            message: message.to_string(),
        };

        let mut range = Range::any();
        for token in input.split_whitespace() {
            if token == "*" || token == "x" {
                continue;
            }

            let (op, raw) = [">=", "<=", ">", "<", "="]
                .iter()
                .find_map(|op| token.strip_prefix(op).map(|rest| (*op, rest)))
                .unwrap_or(("=", token));
            let version = parse(raw).map_err(|_| invalid(&format!("bad version '{raw}'")))?;

            let (slot, bound) = match op {
                ">" => (&mut range.lower, Bound::exclusive(version)),
                ">=" => (&mut range.lower, Bound::inclusive(version)),
                "<" => (&mut range.upper, Bound::exclusive(version)),
                "<=" => (&mut range.upper, Bound::inclusive(version)),
                _ => {
                    if range.lower.is_some() || range.upper.is_some() {
                        return Err(invalid("exact version cannot be combined"));
                    }
                    range = Range::exact(version);
                    continue;
                }
            };
            if slot.is_some() {
                return Err(invalid("duplicate bound"));
            }
            *slot = Some(bound);
        }
        Ok(range)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseType {
    Major,
    Minor,
    Patch,
    Latest,
}

impl ReleaseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseType::Major => "major",
            ReleaseType::Minor => "minor",
            ReleaseType::Patch => "patch",
            ReleaseType::Latest => "latest",
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "major" => Ok(ReleaseType::Major),
            "minor" => Ok(ReleaseType::Minor),
            "patch" => Ok(ReleaseType::Patch),
            "latest" => Ok(ReleaseType::Latest),
            other => Err(format!("unknown release type: {other}")),
        }
    }
}

/// Where an upgrade should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Exact(Version),
    Release(ReleaseType),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Exact(v) => write!(f, "{v}"),
            Target::Release(r) => write!(f, "{r}"),
        }
    }
}

impl FromStr for Target {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<ReleaseType>() {
            Ok(r) => Ok(Target::Release(r)),
            Err(_) => parse(s).map(Target::Exact),
        }
    }
}

/// Range of versions between `current` (exclusive) and `target`.
///
/// Exact targets must be strictly greater than `current`.
pub fn range_from_target(current: &Version, target: &Target) -> DomainResult<Range> {
    match target {
        Target::Exact(version) => {
            if compare(version, current) != Ordering::Greater {
                return Err(DomainError::InvalidTarget {
                    current: current.to_string(),
                    target: version.to_string(),
                });
            }
            Ok(Range::between(current.clone(), version.clone()))
        }
        Target::Release(kind) => Ok(range_from_release_type(current, *kind)),
    }
}

/// Narrowest range capturing the next release of the given granularity.
///
/// - major: the next major's first release (and its prereleases)
/// - minor: any later release before the next major
/// - patch: any later release before the next minor
/// - latest: anything newer than `current`
pub fn range_from_release_type(current: &Version, kind: ReleaseType) -> Range {
    let above_current = Bound::exclusive(current.clone());
    match kind {
        ReleaseType::Major => {
            let target = next_major(current);
            let line_floor = floor(&target);
            let lower = if compare(&line_floor, current) == Ordering::Greater {
                Bound::inclusive(line_floor)
            } else {
                above_current
            };
            Range {
                lower: Some(lower),
                upper: Some(Bound::inclusive(target)),
            }
        }
        ReleaseType::Minor => Range {
            lower: Some(above_current),
            upper: Some(Bound::exclusive(floor(&next_major(current)))),
        },
        ReleaseType::Patch => Range {
            lower: Some(above_current),
            upper: Some(Bound::exclusive(floor(&next_minor(current)))),
        },
        ReleaseType::Latest => Range {
            lower: Some(above_current),
            upper: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn parse_tolerates_leading_v() {
        assert_eq!(parse("v4.15.4").unwrap(), v("4.15.4"));
        assert_eq!(parse(" 1.2.3 ").unwrap(), v("1.2.3"));
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "4", "4.15", "^4.15.4", "latest", "4.x.1"] {
            let err = parse(bad).unwrap_err();
            assert!(matches!(err, DomainError::InvalidVersion { .. }), "{bad}");
        }
    }

    #[test]
    fn literal_requires_exact_version() {
        assert!(is_literal("4.15.4"));
        assert!(is_literal("5.0.0-rc.1"));
        assert!(!is_literal("^4.15.4"));
        assert!(!is_literal("~4.15.4"));
        assert!(!is_literal("v4.15.4"));
    }

    #[test]
    fn compare_ignores_build_metadata() {
        assert_eq!(compare(&v("1.0.0+a"), &v("1.0.0+b")), Ordering::Equal);
        assert_eq!(compare(&v("1.0.0-rc.1"), &v("1.0.0")), Ordering::Less);
        assert_eq!(compare(&v("2.0.0"), &v("1.9.9")), Ordering::Greater);
    }

    #[test]
    fn major_range_captures_only_next_major() {
        let range = range_from_release_type(&v("4.15.4"), ReleaseType::Major);
        assert!(!range.contains(&v("4.15.4")));
        assert!(!range.contains(&v("4.16.0")));
        assert!(range.contains(&v("5.0.0")));
        assert!(range.contains(&v("5.0.0-beta.2")));
        assert!(!range.contains(&v("5.0.1")));
        assert_eq!(range.to_string(), ">=5.0.0-0 <=5.0.0");
    }

    #[test]
    fn major_range_from_prerelease_targets_same_line() {
        let range = range_from_release_type(&v("5.0.0-beta.1"), ReleaseType::Major);
        assert!(!range.contains(&v("5.0.0-beta.1")));
        assert!(range.contains(&v("5.0.0-rc.0")));
        assert!(range.contains(&v("5.0.0")));
        assert_eq!(range.to_string(), ">5.0.0-beta.1 <=5.0.0");
    }

    #[test]
    fn minor_and_patch_ranges_stay_in_line() {
        let minor = range_from_release_type(&v("4.15.4"), ReleaseType::Minor);
        assert!(minor.contains(&v("4.15.5")));
        assert!(minor.contains(&v("4.25.0")));
        assert!(!minor.contains(&v("5.0.0-alpha.0")));
        assert!(!minor.contains(&v("5.0.0")));

        let patch = range_from_release_type(&v("4.15.4"), ReleaseType::Patch);
        assert!(patch.contains(&v("4.15.9")));
        assert!(!patch.contains(&v("4.16.0-rc.1")));
        assert!(!patch.contains(&v("4.15.4")));
    }

    #[test]
    fn latest_range_is_unbounded_above() {
        let range = range_from_release_type(&v("4.15.4"), ReleaseType::Latest);
        assert!(range.contains(&v("99.0.0")));
        assert!(!range.contains(&v("4.15.4")));
        assert_eq!(range.to_string(), ">4.15.4");
    }

    #[test]
    fn exact_target_range_is_exclusive_inclusive() {
        let range = range_from_target(&v("1.1.0"), &Target::Exact(v("1.1.2"))).unwrap();
        assert!(!range.contains(&v("1.1.0")));
        assert!(range.contains(&v("1.1.1")));
        assert!(range.contains(&v("1.1.2")));
        assert!(!range.contains(&v("1.1.3")));
        assert_eq!(range.to_string(), ">1.1.0 <=1.1.2");
    }

    #[test]
    fn exact_target_must_move_forward() {
        for target in ["1.1.0", "1.0.9"] {
            let err = range_from_target(&v("1.1.0"), &Target::Exact(v(target))).unwrap_err();
            assert!(matches!(err, DomainError::InvalidTarget { .. }));
        }
    }

    #[test]
    fn target_parses_release_types_and_versions() {
        assert_eq!("major".parse::<Target>().unwrap(), Target::Release(ReleaseType::Major));
        assert_eq!("Patch".parse::<Target>().unwrap(), Target::Release(ReleaseType::Patch));
        assert_eq!("5.0.0".parse::<Target>().unwrap(), Target::Exact(v("5.0.0")));
        assert!("five".parse::<Target>().is_err());
    }

    #[test]
    fn range_parses_comparators() {
        let r: Range = ">1.0.0 <=2.0.0".parse().unwrap();
        assert_eq!(r, Range::between(v("1.0.0"), v("2.0.0")));

        let exact: Range = "1.2.3".parse().unwrap();
        assert_eq!(exact, Range::exact(v("1.2.3")));
        assert_eq!(exact.to_string(), "=1.2.3");

        let any: Range = "*".parse().unwrap();
        assert_eq!(any, Range::any());
        assert!(any.contains(&v("0.0.1")));

        let open: Range = ">=3.0.0".parse().unwrap();
        assert!(open.contains(&v("3.0.0")));
        assert!(!open.contains(&v("2.9.9")));
    }

    #[test]
    fn range_rejects_garbage() {
        for bad in [">1.0", ">1.0.0 >2.0.0", "=1.0.0 <2.0.0", ">1.0.0 =2.0.0"] {
            let err = bad.parse::<Range>().unwrap_err();
            assert!(matches!(err, DomainError::InvalidRange { .. }), "{bad}");
        }
    }
}
