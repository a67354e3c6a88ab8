use std::fmt;

use crate::encoding::euclidean_distance;
use crate::{Encoding, FaceIdError, IdentityRegistry};

/// Default maximum accepted distance. Smaller is stricter.
pub const DEFAULT_TOLERANCE: f32 = 0.5;

/// Outcome of matching one query encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// The closest registered identity, within tolerance.
    Matched { name: String, distance: f32 },
    /// Registry empty, or even the closest identity is beyond tolerance.
    Unknown,
}

impl MatchResult {
    /// Returns the matched identity name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Matched { name, .. } => Some(name),
            Self::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched { name, distance } => write!(f, "{name} ({distance:.3})"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Returns the distance from `query` to every known encoding, index-aligned.
pub fn face_distances(known: &[Encoding], query: &Encoding) -> Result<Vec<f32>, FaceIdError> {
    known
        .iter()
        .map(|k| euclidean_distance(k, query))
        .collect()
}

/// Flags which known encodings lie within `tolerance` of `query`.
pub fn compare_faces(
    known: &[Encoding],
    query: &Encoding,
    tolerance: f32,
) -> Result<Vec<bool>, FaceIdError> {
    Ok(face_distances(known, query)?
        .into_iter()
        .map(|d| d <= tolerance)
        .collect())
}

/// Returns the index of the smallest distance. Ties keep the lowest index;
/// NaN never wins.
fn argmin(distances: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &d) in distances.iter().enumerate() {
        if d.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, b)| d < b) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Nearest-neighbor identity matcher over an [`IdentityRegistry`].
///
/// Scans every registered encoding (O(N·D)), picks the single closest one,
/// then accepts it only if its distance is within tolerance. A closer
/// candidate beyond tolerance is never traded for a farther one within it.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    tolerance: f32,
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Matcher {
    /// Creates a matcher. The tolerance must be finite and non-negative.
    pub fn new(tolerance: f32) -> Result<Self, FaceIdError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(FaceIdError::Configuration(format!(
                "tolerance must be a non-negative number, got {tolerance}"
            )));
        }
        Ok(Self { tolerance })
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Matches `query` against `registry`.
    pub fn best_match(
        &self,
        registry: &IdentityRegistry,
        query: &Encoding,
    ) -> Result<MatchResult, FaceIdError> {
        if registry.is_empty() {
            return Ok(MatchResult::Unknown);
        }
        if query.dim() != registry.dim() {
            return Err(FaceIdError::DimensionMismatch {
                expected: registry.dim(),
                got: query.dim(),
            });
        }

        let distances = face_distances(registry.encodings(), query)?;
        let within: Vec<bool> = distances.iter().map(|&d| d <= self.tolerance).collect();

        let Some(best) = argmin(&distances) else {
            return Ok(MatchResult::Unknown);
        };
        if !within[best] {
            return Ok(MatchResult::Unknown);
        }
        Ok(MatchResult::Matched {
            name: registry.names()[best].clone(),
            distance: distances[best],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(entries: &[(&str, &[f32])]) -> IdentityRegistry {
        let dim = entries.first().map(|e| e.1.len()).unwrap_or(2);
        let mut reg = IdentityRegistry::new(dim);
        for (name, v) in entries {
            reg.insert(name.to_string(), Encoding::new(v.to_vec())).unwrap();
        }
        reg
    }

    fn q(v: &[f32]) -> Encoding {
        Encoding::new(v.to_vec())
    }

    #[test]
    fn empty_registry_is_unknown() {
        let reg = IdentityRegistry::new(2);
        let m = Matcher::default();
        assert_eq!(m.best_match(&reg, &q(&[0.0, 0.0])).unwrap(), MatchResult::Unknown);
        // No distance is computed, so even a malformed query is just unknown.
        assert_eq!(m.best_match(&reg, &q(&[0.0])).unwrap(), MatchResult::Unknown);
    }

    #[test]
    fn exact_query_matches_owner() {
        let reg = registry(&[("a", &[0.0, 0.0]), ("b", &[3.0, 0.0]), ("c", &[0.0, 3.0])]);
        for tol in [0.0, 0.5, 10.0] {
            let m = Matcher::new(tol).unwrap();
            for (name, enc) in reg.names().iter().zip(reg.encodings()) {
                let res = m.best_match(&reg, enc).unwrap();
                assert_eq!(res.name(), Some(name.as_str()), "tolerance {tol}");
            }
        }
    }

    #[test]
    fn closest_beyond_tolerance_is_unknown() {
        let reg = registry(&[("near", &[0.0, 0.0]), ("far", &[1.0, 0.0])]);
        let m = Matcher::new(0.3).unwrap();
        // Closest is "near" at 0.4 (> 0.3); "far" at 0.6 is also out.
        assert!(m.best_match(&reg, &q(&[0.4, 0.0])).unwrap().is_unknown());
    }

    #[test]
    fn only_closest_candidate_is_considered() {
        let reg = registry(&[("a", &[0.0, 0.0]), ("b", &[0.6, 0.0])]);
        let m = Matcher::new(0.5).unwrap();
        // Both within tolerance; the closer one wins.
        let res = m.best_match(&reg, &q(&[0.35, 0.0])).unwrap();
        assert_eq!(res.name(), Some("b"));
        match res {
            MatchResult::Matched { distance, .. } => assert!((distance - 0.25).abs() < 1e-6),
            MatchResult::Unknown => unreachable!(),
        }
    }

    #[test]
    fn loosening_tolerance_never_changes_winner() {
        let reg = registry(&[("a", &[0.0, 0.0]), ("b", &[1.0, 1.0]), ("c", &[-1.0, 2.0])]);
        let queries = [[0.1, 0.2], [0.8, 0.9], [-0.7, 1.6], [0.5, 0.5], [3.0, -3.0]];
        let tolerances = [0.0, 0.1, 0.3, 0.5, 0.8, 1.5, 5.0];
        for query in &queries {
            let query = q(query);
            for (i, &t1) in tolerances.iter().enumerate() {
                let strict = Matcher::new(t1).unwrap().best_match(&reg, &query).unwrap();
                if strict.is_unknown() {
                    continue;
                }
                for &t2 in &tolerances[i + 1..] {
                    let loose = Matcher::new(t2).unwrap().best_match(&reg, &query).unwrap();
                    assert_eq!(strict.name(), loose.name(), "t1={t1} t2={t2}");
                }
            }
        }
    }

    #[test]
    fn ties_keep_first_registered() {
        let reg = registry(&[("first", &[1.0, 0.0]), ("second", &[-1.0, 0.0])]);
        let res = Matcher::new(1.0).unwrap().best_match(&reg, &q(&[0.0, 0.0])).unwrap();
        assert_eq!(res.name(), Some("first"));
    }

    #[test]
    fn query_dimension_mismatch_fails() {
        let reg = registry(&[("a", &[0.0, 0.0])]);
        let err = Matcher::default().best_match(&reg, &q(&[0.0, 0.0, 0.0])).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn invalid_tolerance_rejected() {
        assert!(Matcher::new(-0.1).is_err());
        assert!(Matcher::new(f32::NAN).is_err());
        assert!(Matcher::new(f32::INFINITY).is_err());
        assert_eq!(Matcher::new(0.0).unwrap().tolerance(), 0.0);
    }

    #[test]
    fn compare_and_distances_align() {
        let known = [q(&[0.0, 0.0]), q(&[0.0, 2.0])];
        let dists = face_distances(&known, &q(&[0.0, 0.5])).unwrap();
        assert_eq!(dists, vec![0.5, 1.5]);
        assert_eq!(compare_faces(&known, &q(&[0.0, 0.5]), 0.5).unwrap(), vec![true, false]);
    }

    #[test]
    fn argmin_skips_nan() {
        assert_eq!(argmin(&[f32::NAN, 2.0, 1.0, 1.0]), Some(2));
        assert_eq!(argmin(&[f32::NAN]), None);
        assert_eq!(argmin(&[]), None);
    }

    #[test]
    fn display() {
        let m = MatchResult::Matched { name: "bob".into(), distance: 0.25 };
        assert_eq!(m.to_string(), "bob (0.250)");
        assert_eq!(MatchResult::Unknown.to_string(), "unknown");
    }
}
