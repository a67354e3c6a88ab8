use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::FaceIdError;

/// A face embedding: a fixed-length vector in the encoder's metric space.
///
/// Immutable once produced. Cloning is cheap (shared buffer).
#[derive(Clone, PartialEq)]
pub struct Encoding(Arc<[f32]>);

impl Encoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values.into())
    }

    /// Returns the dimensionality.
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean distance to `other`.
    ///
    /// Fails with [`FaceIdError::DimensionMismatch`] when the lengths differ.
    pub fn distance(&self, other: &Encoding) -> Result<f32, FaceIdError> {
        euclidean_distance(&self.0, &other.0)
    }
}

impl From<Vec<f32>> for Encoding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl Deref for Encoding {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoding").field("dim", &self.dim()).finish()
    }
}

impl Serialize for Encoding {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(s)
    }
}

impl<'de> Deserialize<'de> for Encoding {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Vec::<f32>::deserialize(d).map(Self::new)
    }
}

/// Computes the L2 norm of `a - b`.
///
/// Accumulates in f64 to keep 128-d distances stable near the tolerance.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32, FaceIdError> {
    if a.len() != b.len() {
        return Err(FaceIdError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    Ok(sum.sqrt() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_identical_is_zero() {
        let a = Encoding::new(vec![0.25, -1.0, 3.5]);
        assert_eq!(a.distance(&a.clone()).unwrap(), 0.0);
    }

    #[test]
    fn distance_pythagorean() {
        let d = euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]).unwrap();
        assert!((d - 5.0).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = [0.1, 0.2, 0.3, 0.4];
        let b = [0.4, 0.3, 0.2, 0.1];
        assert_eq!(
            euclidean_distance(&a, &b).unwrap(),
            euclidean_distance(&b, &a).unwrap()
        );
    }

    #[test]
    fn distance_dimension_mismatch() {
        let err = euclidean_distance(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            FaceIdError::DimensionMismatch { expected: 2, got: 3 }
        ));
    }

    #[test]
    fn serde_as_plain_array() {
        let e = Encoding::new(vec![1.0, 2.5]);
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, "[1.0,2.5]");
        let back: Encoding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn debug_hides_values() {
        let e = Encoding::new(vec![0.0; 128]);
        assert_eq!(format!("{e:?}"), "Encoding { dim: 128 }");
    }
}
