// Mains harmonic exclusion policy
//
// Receivers with poor filtering report the same transmission again at offsets
// close to multiples of the local power-line frequency. Offsets inside a small
// band around +/-k*50 Hz or +/-k*60 Hz are explained artifacts, not images.

use serde::Serialize;

use crate::constants::{DEFAULT_HARMONIC_MULTIPLES, DEFAULT_HARMONIC_TOLERANCE, MAINS_FREQUENCIES};

/// Which mains frequency an artifact offset lines up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MainsFamily {
    Hz50,
    Hz60,
}

impl MainsFamily {
    pub fn frequency(&self) -> i64 {
        match self {
            MainsFamily::Hz50 => 50,
            MainsFamily::Hz60 => 60,
        }
    }

    fn from_frequency(freq: i64) -> Option<Self> {
        match freq {
            50 => Some(MainsFamily::Hz50),
            60 => Some(MainsFamily::Hz60),
            _ => None,
        }
    }
}

/// Tolerance band and multiple count for harmonic matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarmonicPolicy {
    /// Half-width of each band (inclusive), in offset units
    pub tolerance: i64,
    /// Multiples 1..=multiples of each mains frequency are checked
    pub multiples: u32,
}

impl HarmonicPolicy {
    pub fn new(tolerance: i64, multiples: u32) -> Self {
        HarmonicPolicy { tolerance, multiples }
    }

    /// True when `offset` sits within the tolerance band of a mains multiple.
    /// Zero is never an artifact: it denotes the reference itself.
    pub fn is_harmonic_artifact(&self, offset: i64) -> bool {
        self.classify(offset).is_some()
    }

    /// Mains family matched by `offset`, 50 Hz taking precedence.
    pub fn classify(&self, offset: i64) -> Option<MainsFamily> {
        if offset == 0 {
            return None;
        }
        let tolerance = u64::try_from(self.tolerance).ok()?;
        let magnitude = offset.unsigned_abs();

        for &mains in &MAINS_FREQUENCIES {
            for k in 1..=u64::from(self.multiples) {
                let multiple = k * mains.unsigned_abs();
                if magnitude.abs_diff(multiple) <= tolerance {
                    return MainsFamily::from_frequency(mains);
                }
            }
        }
        None
    }
}

impl Default for HarmonicPolicy {
    fn default() -> Self {
        HarmonicPolicy::new(DEFAULT_HARMONIC_TOLERANCE, DEFAULT_HARMONIC_MULTIPLES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_never_artifact() {
        let policy = HarmonicPolicy::default();
        assert!(!policy.is_harmonic_artifact(0));
        assert!(!HarmonicPolicy::new(60, 4).is_harmonic_artifact(0));
    }

    #[test]
    fn test_default_bands() {
        let policy = HarmonicPolicy::default();
        for offset in [48, 50, 52, 58, 62, 98, 102, 118, 122, 148, 152, 178, 182, 198, 202, 238, 242] {
            assert!(policy.is_harmonic_artifact(offset), "offset {}", offset);
        }
        for offset in [1, 47, 53, 57, 63, 97, 103, 117, 123, 187, 203, 237, 243, 250, 300] {
            assert!(!policy.is_harmonic_artifact(offset), "offset {}", offset);
        }
    }

    #[test]
    fn test_symmetric() {
        let policy = HarmonicPolicy::default();
        for offset in -400..=400 {
            assert_eq!(
                policy.is_harmonic_artifact(offset),
                policy.is_harmonic_artifact(-offset),
                "offset {}",
                offset
            );
        }
    }

    #[test]
    fn test_family() {
        let policy = HarmonicPolicy::default();
        assert_eq!(policy.classify(-60), Some(MainsFamily::Hz60));
        assert_eq!(policy.classify(101), Some(MainsFamily::Hz50));
        assert_eq!(policy.classify(-121), Some(MainsFamily::Hz60));
        assert_eq!(policy.classify(-187), None);
    }

    #[test]
    fn test_extreme_offsets() {
        let policy = HarmonicPolicy::default();
        assert_eq!(policy.classify(i64::MIN), None);
        assert_eq!(policy.classify(i64::MAX), None);
        assert_eq!(policy.classify(i64::MIN + 1), None);
    }

    #[test]
    fn test_negative_tolerance_matches_nothing() {
        let policy = HarmonicPolicy::new(-1, 4);
        assert!(!policy.is_harmonic_artifact(50));
        assert!(!policy.is_harmonic_artifact(-60));
    }

    #[test]
    fn test_configured_multiples_and_tolerance() {
        let two = HarmonicPolicy::new(2, 2);
        assert!(two.is_harmonic_artifact(120));
        assert!(!two.is_harmonic_artifact(150));
        assert!(!two.is_harmonic_artifact(180));

        let exact = HarmonicPolicy::new(0, 4);
        assert!(exact.is_harmonic_artifact(-50));
        assert!(!exact.is_harmonic_artifact(51));

        let wide = HarmonicPolicy::new(5, 1);
        assert!(wide.is_harmonic_artifact(55));
        assert!(wide.is_harmonic_artifact(-65));
        assert!(!wide.is_harmonic_artifact(66));
    }
}
