//! Fractional rank keys for sibling ordering
//!
//! A [`RankKey`] is a non-empty string over `a`–`z` compared lexicographically.
//! New keys are generated strictly between two existing keys, so inserting or
//! moving a sibling only ever writes the key of the item being placed.
//!
//! Keys are treated as base-26 fractions (`a` = 0 … `z` = 25). Arithmetic is
//! done on digit vectors, never on floats, so keys keep ordering no matter how
//! many times a gap is bisected.
//!
//! A valid key never ends with `a`. Trailing `a`s do not change the value of a
//! fraction, and forbidding them guarantees that every key has a predecessor
//! (`before`) and every pair of distinct keys has a key between them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TrainflowError};

/// Smallest character of the rank alphabet.
pub const MIN_CHAR: u8 = b'a';

/// Largest character of the rank alphabet.
pub const MAX_CHAR: u8 = b'z';

/// Character used for the first key of an empty list and when a key must grow.
pub const MIDPOINT_CHAR: u8 = b'm';

const BASE: u16 = 26;

/// Lexicographically ordered sort key for siblings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RankKey(String);

impl RankKey {
    /// Validate and wrap an externally supplied key.
    pub fn parse(key: &str) -> Result<Self> {
        let Some(&last) = key.as_bytes().last() else {
            return Err(TrainflowError::malformed(key, "rank key cannot be empty"));
        };
        if !key.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(TrainflowError::malformed(
                key,
                "only lowercase letters a-z are allowed",
            ));
        }
        if last == MIN_CHAR {
            return Err(TrainflowError::malformed(key, "rank key cannot end with 'a'"));
        }
        Ok(Self(key.to_string()))
    }

    /// Key used when a sibling list is empty.
    pub fn midpoint() -> Self {
        Self((MIDPOINT_CHAR as char).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Smallest-effort key that sorts after `self`.
    ///
    /// Increments the last character that is not `z` and drops everything
    /// after it. A key made only of `z`s grows by the midpoint character.
    pub fn after(&self) -> Self {
        let bytes = self.0.as_bytes();
        match bytes.iter().rposition(|&b| b != MAX_CHAR) {
            Some(idx) => {
                let mut out = String::with_capacity(idx + 1);
                out.push_str(&self.0[..idx]);
                out.push((bytes[idx] + 1) as char);
                Self(out)
            },
            None => {
                let mut out = self.0.clone();
                out.push(MIDPOINT_CHAR as char);
                Self(out)
            },
        }
    }

    /// Key that sorts before `self`.
    ///
    /// Decrements the last character. When that would leave a trailing `a`,
    /// a `z` is appended so the result stays a valid key.
    pub fn before(&self) -> Self {
        let Some((&last, head)) = self.0.as_bytes().split_last() else {
            return Self::midpoint();
        };
        let decremented = last - 1;
        let mut out = String::with_capacity(self.0.len() + 1);
        out.extend(head.iter().map(|&b| b as char));
        out.push(decremented as char);
        if decremented == MIN_CHAR {
            out.push(MAX_CHAR as char);
        }
        Self(out)
    }

    /// Key strictly between two optional bounds.
    ///
    /// - no bounds: [`RankKey::midpoint`]
    /// - only `lower`: [`RankKey::after`]
    /// - only `upper`: [`RankKey::before`]
    /// - both: the numeric midpoint at the shortest length that has room,
    ///   or `lower` extended by the midpoint character when the bounds are
    ///   adjacent at every length.
    ///
    /// Fails with [`TrainflowError::InvalidOrder`] unless `lower < upper`.
    pub fn between(lower: Option<&RankKey>, upper: Option<&RankKey>) -> Result<Self> {
        match (lower, upper) {
            (None, None) => Ok(Self::midpoint()),
            (Some(lower), None) => Ok(lower.after()),
            (None, Some(upper)) => Ok(upper.before()),
            (Some(lower), Some(upper)) => Self::midpoint_of(lower, upper),
        }
    }

    fn midpoint_of(lower: &RankKey, upper: &RankKey) -> Result<Self> {
        if lower >= upper {
            return Err(TrainflowError::InvalidOrder {
                lower: lower.0.clone(),
                upper: upper.0.clone(),
            });
        }

        let width = lower.0.len().max(upper.0.len());
        let lo = to_digits(&lower.0, width);
        let hi = to_digits(&upper.0, width);

        // Try the shortest length first. At `len` digits the candidates are the
        // values strictly between floor(lower) and ceil(upper); a leading guard
        // digit absorbs the carry when ceil(upper) overflows `len` digits.
        for len in 1..=width {
            let lower_window = guarded_prefix(&lo, len);
            let mut upper_window = guarded_prefix(&hi, len);
            if hi[len..].iter().any(|&d| d != 0) {
                increment(&mut upper_window);
            }

            let gap = subtract(&upper_window, &lower_window);
            if exceeds_one(&gap) {
                let mid = add(&lower_window, &halve(&gap));
                return Ok(Self(encode(&mid[1..])));
            }
        }

        // Adjacent at full width: no integer strictly between, so grow by one digit.
        let mut extended = lo;
        extended.push(MIDPOINT_CHAR - MIN_CHAR);
        Ok(Self(encode(&extended)))
    }

    /// `count` keys splitting the keyspace into `count + 1` equal segments.
    ///
    /// Used to seed brand-new sibling lists.
    pub fn evenly_spaced(count: usize) -> Vec<Self> {
        if count == 0 {
            return Vec::new();
        }

        let segments = count as u128 + 1;
        let mut width = 1usize;
        let mut space = u128::from(BASE);
        while space < segments {
            width += 1;
            space *= u128::from(BASE);
        }

        (1..segments)
            .map(|i| Self(encode(&value_to_digits(i * space / segments, width))))
            .collect()
    }
}

impl fmt::Display for RankKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RankKey {
    type Err = TrainflowError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RankKey {
    type Error = TrainflowError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RankKey> for String {
    fn from(key: RankKey) -> Self {
        key.0
    }
}

impl AsRef<str> for RankKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Base-26 digit arithmetic (big-endian, one digit per element)
// ============================================================================

fn to_digits(key: &str, width: usize) -> Vec<u8> {
    let mut digits: Vec<u8> = key.bytes().map(|b| b - MIN_CHAR).collect();
    digits.resize(width, 0);
    digits
}

fn value_to_digits(mut value: u128, width: usize) -> Vec<u8> {
    let mut digits = vec![0u8; width];
    for slot in digits.iter_mut().rev() {
        *slot = (value % u128::from(BASE)) as u8;
        value /= u128::from(BASE);
    }
    digits
}

/// Render digits as a key, dropping trailing zeros.
fn encode(digits: &[u8]) -> String {
    let end = digits.iter().rposition(|&d| d != 0).map_or(0, |i| i + 1);
    digits[..end].iter().map(|&d| (d + MIN_CHAR) as char).collect()
}

fn guarded_prefix(digits: &[u8], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + 1);
    out.push(0);
    out.extend_from_slice(&digits[..len]);
    out
}

fn increment(digits: &mut [u8]) {
    for digit in digits.iter_mut().rev() {
        if u16::from(*digit) + 1 < BASE {
            *digit += 1;
            return;
        }
        *digit = 0;
    }
}

/// `upper - lower` for equal-width operands with `upper >= lower`.
fn subtract(upper: &[u8], lower: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; upper.len()];
    let mut borrow = 0u16;
    for i in (0..upper.len()).rev() {
        let minuend = u16::from(upper[i]);
        let subtrahend = u16::from(lower[i]) + borrow;
        if minuend >= subtrahend {
            out[i] = (minuend - subtrahend) as u8;
            borrow = 0;
        } else {
            out[i] = (minuend + BASE - subtrahend) as u8;
            borrow = 1;
        }
    }
    out
}

fn add(left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; left.len()];
    let mut carry = 0u16;
    for i in (0..left.len()).rev() {
        let sum = u16::from(left[i]) + u16::from(right[i]) + carry;
        out[i] = (sum % BASE) as u8;
        carry = sum / BASE;
    }
    out
}

fn halve(digits: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(digits.len());
    let mut remainder = 0u16;
    for &digit in digits {
        let current = remainder * BASE + u16::from(digit);
        out.push((current / 2) as u8);
        remainder = current % 2;
    }
    out
}

fn exceeds_one(digits: &[u8]) -> bool {
    match digits.split_last() {
        Some((&last, head)) => last > 1 || head.iter().any(|&d| d != 0),
        None => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn key(s: &str) -> RankKey {
        RankKey::parse(s).unwrap()
    }

    fn mid(lower: &str, upper: &str) -> String {
        RankKey::between(Some(&key(lower)), Some(&key(upper)))
            .unwrap()
            .to_string()
    }

    /// Every valid key with at most two characters, sorted.
    fn short_keys() -> Vec<RankKey> {
        let mut keys = Vec::new();
        for first in b'a'..=b'z' {
            if first != MIN_CHAR {
                keys.push(key(&(first as char).to_string()));
            }
            for second in b'b'..=b'z' {
                keys.push(key(&format!("{}{}", first as char, second as char)));
            }
        }
        keys.sort();
        keys
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        assert!(matches!(
            RankKey::parse(""),
            Err(TrainflowError::MalformedRank { .. })
        ));
        assert!(RankKey::parse("Ab").is_err());
        assert!(RankKey::parse("m1").is_err());
        assert!(RankKey::parse("ma").is_err());
        assert!(RankKey::parse("a").is_err());
        assert_eq!(RankKey::parse("mab").unwrap().as_str(), "mab");
    }

    #[test]
    fn test_between_without_bounds_is_midpoint() {
        assert_eq!(RankKey::between(None, None).unwrap(), key("m"));
    }

    #[test]
    fn test_between_open_bounds_delegate_to_after_and_before() {
        let m = key("m");
        assert_eq!(RankKey::between(Some(&m), None).unwrap(), key("n"));
        assert_eq!(RankKey::between(None, Some(&m)).unwrap(), key("l"));
    }

    #[test]
    fn test_after_carries_past_trailing_max() {
        assert_eq!(key("m").after(), key("n"));
        assert_eq!(key("az").after(), key("b"));
        assert_eq!(key("mzz").after(), key("n"));
        assert_eq!(key("z").after(), key("zm"));
        assert_eq!(key("zz").after(), key("zzm"));
    }

    #[test]
    fn test_before_never_leaves_trailing_min() {
        assert_eq!(key("m").before(), key("l"));
        assert_eq!(key("b").before(), key("az"));
        assert_eq!(key("ab").before(), key("aaz"));
        assert_eq!(key("mzz").before(), key("mzy"));
    }

    #[test]
    fn test_between_known_values() {
        assert_eq!(mid("b", "z"), "n");
        assert_eq!(mid("ab", "z"), "m");
        assert_eq!(mid("y", "zz"), "z");
        assert_eq!(mid("m", "n"), "mm");
        assert_eq!(mid("az", "b"), "azm");
        assert_eq!(mid("b", "bb"), "bam");
        assert_eq!(mid("am", "b"), "at");
    }

    #[test]
    fn test_between_rejects_unordered_bounds() {
        let m = key("m");
        let n = key("n");
        assert!(matches!(
            RankKey::between(Some(&n), Some(&m)),
            Err(TrainflowError::InvalidOrder { .. })
        ));
        assert!(matches!(
            RankKey::between(Some(&m), Some(&m)),
            Err(TrainflowError::InvalidOrder { .. })
        ));
    }

    #[test]
    fn test_between_all_adjacent_short_keys() {
        let keys = short_keys();
        for pair in keys.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            let k = RankKey::between(Some(lower), Some(upper)).unwrap();
            assert!(lower < &k && &k < upper, "{lower} < {k} < {upper}");
            assert!(RankKey::parse(k.as_str()).is_ok(), "{k} must stay valid");
        }
    }

    #[test]
    fn test_between_all_short_pairs_has_minimum_length() {
        let keys = short_keys();
        for (i, lower) in keys.iter().enumerate() {
            for upper in keys.iter().skip(i + 1).step_by(7) {
                let k = RankKey::between(Some(lower), Some(upper)).unwrap();
                assert!(lower < &k && &k < upper);
                let shorter_exists = keys
                    .iter()
                    .any(|c| c.as_str().len() < k.as_str().len() && lower < c && c < upper);
                assert!(!shorter_exists, "{k} between {lower} and {upper} is not minimal");
            }
        }
    }

    #[test]
    fn test_repeated_bisection_stays_ordered() {
        let mut lower = key("b");
        let mut upper = key("c");
        for round in 0..200 {
            let k = RankKey::between(Some(&lower), Some(&upper)).unwrap();
            assert!(lower < k && k < upper);
            if round % 2 == 0 {
                upper = k;
            } else {
                lower = k;
            }
        }
        assert!(lower.as_str().len() >= 20);
        assert!(upper.as_str().len() >= 20);
    }

    #[test]
    fn test_repeated_insertion_at_head() {
        let mut head = key("m");
        for _ in 0..500 {
            let next = RankKey::between(None, Some(&head)).unwrap();
            assert!(next < head);
            head = next;
        }
    }

    #[test]
    fn test_after_is_strictly_increasing() {
        let mut keys = vec![RankKey::midpoint()];
        for _ in 0..1000 {
            let next = keys[keys.len() - 1].after();
            keys.push(next);
        }
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_evenly_spaced() {
        assert!(RankKey::evenly_spaced(0).is_empty());

        let five: Vec<String> = RankKey::evenly_spaced(5)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(five, vec!["e", "i", "n", "r", "v"]);

        let many = RankKey::evenly_spaced(1000);
        assert_eq!(many.len(), 1000);
        assert!(many.windows(2).all(|w| w[0] < w[1]));
        assert!(many.iter().all(|k| RankKey::parse(k.as_str()).is_ok()));
    }

    #[test]
    fn test_serde_rejects_malformed_key() {
        let parsed: RankKey = serde_json::from_str("\"mn\"").unwrap();
        assert_eq!(parsed, key("mn"));
        assert!(serde_json::from_str::<RankKey>("\"ma\"").is_err());
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"mn\"");
    }
}
