//! Version identity types shared across Trainflow

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Result, TrainflowError};

/// Positive, monotonically increasing version of one logical entity.
///
/// Version 1 is the initial version and has no predecessor.
///
/// # Examples
///
/// ```
/// use trainflow_common::VersionNumber;
///
/// let v1 = VersionNumber::INITIAL;
/// assert_eq!(v1.next().get(), 2);
/// assert!(v1.previous().is_none());
/// assert_eq!("v3".parse::<VersionNumber>().unwrap().get(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct VersionNumber(u32);

impl VersionNumber {
    pub const INITIAL: VersionNumber = VersionNumber(1);

    pub fn new(value: u32) -> Result<Self> {
        if value == 0 {
            return Err(TrainflowError::InvalidVersion(
                "version numbers start at 1".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Version that follows `current`, or the initial version when there is none.
    pub fn following(current: Option<VersionNumber>) -> Self {
        current.map_or(Self::INITIAL, VersionNumber::next)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn previous(self) -> Option<Self> {
        if self.0 > 1 {
            Some(Self(self.0 - 1))
        } else {
            None
        }
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for VersionNumber {
    type Err = TrainflowError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let value: u32 = digits
            .parse()
            .map_err(|_| TrainflowError::InvalidVersion(s.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<u32> for VersionNumber {
    type Error = TrainflowError;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i32> for VersionNumber {
    type Error = TrainflowError;

    fn try_from(value: i32) -> std::result::Result<Self, Self::Error> {
        u32::try_from(value)
            .map_err(|_| TrainflowError::InvalidVersion(value.to_string()))
            .and_then(Self::new)
    }
}

impl From<VersionNumber> for u32 {
    fn from(version: VersionNumber) -> Self {
        version.0
    }
}

/// One version of one logical entity of type `T`.
///
/// `original_id` is stable across every version and is the identity exposed
/// to callers. Two ids are equal only when both fields match; the type
/// parameter keeps flow ids from being mixed up with ids of other entities.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct VersionedEntityId<T> {
    pub original_id: Uuid,
    pub version: VersionNumber,
    #[serde(skip)]
    marker: PhantomData<fn() -> T>,
}

impl<T> VersionedEntityId<T> {
    pub fn new(original_id: Uuid, version: VersionNumber) -> Self {
        Self {
            original_id,
            version,
            marker: PhantomData,
        }
    }
}

impl<T> Clone for VersionedEntityId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for VersionedEntityId<T> {}

impl<T> PartialEq for VersionedEntityId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.original_id == other.original_id && self.version == other.version
    }
}

impl<T> Eq for VersionedEntityId<T> {}

impl<T> Hash for VersionedEntityId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.original_id.hash(state);
        self.version.hash(state);
    }
}

impl<T> fmt::Debug for VersionedEntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedEntityId")
            .field("original_id", &self.original_id)
            .field("version", &self.version)
            .finish()
    }
}

impl<T> fmt::Display for VersionedEntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.original_id, self.version)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct Flow;
    struct Step;

    #[test]
    fn test_version_number_rejects_zero() {
        assert!(VersionNumber::new(0).is_err());
        assert!(VersionNumber::try_from(-4i32).is_err());
        assert_eq!(VersionNumber::try_from(7i32).unwrap().get(), 7);
    }

    #[test]
    fn test_version_number_navigation() {
        let v2 = VersionNumber::new(2).unwrap();
        assert_eq!(v2.next().get(), 3);
        assert_eq!(v2.previous(), Some(VersionNumber::INITIAL));
        assert_eq!(VersionNumber::INITIAL.previous(), None);
        assert_eq!(VersionNumber::following(None), VersionNumber::INITIAL);
        assert_eq!(VersionNumber::following(Some(v2)).get(), 3);
    }

    #[test]
    fn test_version_number_parse() {
        assert_eq!("4".parse::<VersionNumber>().unwrap().get(), 4);
        assert_eq!("v12".parse::<VersionNumber>().unwrap().get(), 12);
        assert_eq!(" V2 ".parse::<VersionNumber>().unwrap().get(), 2);
        assert!("v0".parse::<VersionNumber>().is_err());
        assert!("two".parse::<VersionNumber>().is_err());
        assert_eq!(VersionNumber::new(5).unwrap().to_string(), "v5");
    }

    #[test]
    fn test_version_number_serde() {
        let v: VersionNumber = serde_json::from_str("3").unwrap();
        assert_eq!(v.get(), 3);
        assert!(serde_json::from_str::<VersionNumber>("0").is_err());
    }

    #[test]
    fn test_versioned_id_equality_needs_both_fields() {
        let original = Uuid::new_v4();
        let v1 = VersionedEntityId::<Flow>::new(original, VersionNumber::INITIAL);
        let v1_again = VersionedEntityId::<Flow>::new(original, VersionNumber::INITIAL);
        let v2 = VersionedEntityId::<Flow>::new(original, VersionNumber::INITIAL.next());
        let other = VersionedEntityId::<Flow>::new(Uuid::new_v4(), VersionNumber::INITIAL);

        assert_eq!(v1, v1_again);
        assert_ne!(v1, v2);
        assert_ne!(v1, other);
    }

    #[test]
    fn test_versioned_id_serde_round_trip() {
        let id = VersionedEntityId::<Step>::new(Uuid::new_v4(), VersionNumber::new(9).unwrap());
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json["version"], 9);
        let back: VersionedEntityId<Step> = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }
}
