//! Slash-delimited paths into the tree
//!
//! Parsing normalises away leading, trailing and repeated slashes. A path
//! with no segments is rejected: the root is not addressable.

use crate::error::TreeError;
use std::fmt;

/// Reserved root for client-side virtual data (`.info/connected`, ...).
pub const INFO_ROOT: &str = ".info";

const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']'];

/// A validated, non-empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Parse and validate a raw path string.
    pub fn parse(raw: &str) -> Result<Self, TreeError> {
        let segments: Vec<String> = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if segments.is_empty() {
            return Err(TreeError::InvalidPath(format!("'{}' has no segments", raw)));
        }

        for (i, seg) in segments.iter().enumerate() {
            if i == 0 && seg == INFO_ROOT {
                continue;
            }
            validate_key(seg).map_err(|_| {
                TreeError::InvalidPath(format!("'{}' contains an illegal segment '{}'", raw, seg))
            })?;
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, used as the snapshot key.
    pub fn key(&self) -> &str {
        // parse() guarantees at least one segment
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Append a relative path (which may itself contain slashes).
    pub fn join(&self, relative: &str) -> Result<Path, TreeError> {
        let child = Path::parse(relative)?;
        let mut segments = self.segments.clone();
        segments.extend(child.segments);
        Ok(Path { segments })
    }

    /// True when `self` equals `other` or lies above it.
    pub fn contains(&self, other: &Path) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// True when either path contains the other.
    pub fn overlaps(&self, other: &Path) -> bool {
        self.contains(other) || other.contains(self)
    }

    pub fn is_info(&self) -> bool {
        self.segments[0] == INFO_ROOT
    }
}

/// Check a single key (no slashes) against the store's key rules.
pub fn validate_key(key: &str) -> Result<(), TreeError> {
    if key.is_empty() || key.contains('/') || key.contains(FORBIDDEN) {
        return Err(TreeError::InvalidPath(format!("illegal key '{}'", key)));
    }
    Ok(())
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl std::str::FromStr for Path {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalises_slashes() {
        let p = Path::parse("/friends//f1/").unwrap();
        assert_eq!(p.segments(), &["friends".to_string(), "f1".to_string()]);
        assert_eq!(p.to_string(), "friends/f1");
        assert_eq!(p.key(), "f1");
    }

    #[test]
    fn test_empty_paths_rejected() {
        assert!(matches!(Path::parse(""), Err(TreeError::InvalidPath(_))));
        assert!(matches!(Path::parse("///"), Err(TreeError::InvalidPath(_))));
    }

    #[test]
    fn test_forbidden_characters() {
        assert!(Path::parse("users/a.b").is_err());
        assert!(Path::parse("users/$id").is_err());
        assert!(Path::parse("a/.info").is_err());
        assert!(Path::parse(".info/connected").unwrap().is_info());
    }

    #[test]
    fn test_containment() {
        let parent = Path::parse("users/u1").unwrap();
        let child = Path::parse("users/u1/online").unwrap();
        let other = Path::parse("users/u2").unwrap();
        assert!(parent.contains(&child));
        assert!(!child.contains(&parent));
        assert!(child.overlaps(&parent));
        assert!(!parent.overlaps(&other));
        assert_eq!(parent.join("online/x").unwrap().to_string(), "users/u1/online/x");
    }
}
