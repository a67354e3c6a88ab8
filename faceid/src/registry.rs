use std::fmt;

use crate::{Encoding, FaceIdError};

/// Known identities as two index-aligned sequences.
///
/// `names[i]` owns `encodings[i]`; both sequences always have the same
/// length and every encoding has the registry's dimensionality. Names are
/// unique: inserting an existing name replaces its encoding in place.
#[derive(Clone)]
pub struct IdentityRegistry {
    dim: usize,
    encodings: Vec<Encoding>,
    names: Vec<String>,
}

impl fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("dim", &self.dim)
            .field("len", &self.names.len())
            .finish()
    }
}

impl IdentityRegistry {
    /// Creates an empty registry for encodings of length `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            encodings: Vec::new(),
            names: Vec::new(),
        }
    }

    /// Builds a registry from parallel sequences.
    ///
    /// Duplicate names collapse to the last occurrence, keeping the
    /// position of the first.
    pub fn from_parts(
        dim: usize,
        encodings: Vec<Encoding>,
        names: Vec<String>,
    ) -> Result<Self, FaceIdError> {
        if encodings.len() != names.len() {
            return Err(FaceIdError::Configuration(format!(
                "{} encodings for {} names",
                encodings.len(),
                names.len()
            )));
        }
        let mut reg = Self::new(dim);
        for (name, enc) in names.into_iter().zip(encodings) {
            reg.insert(name, enc)?;
        }
        Ok(reg)
    }

    /// Adds an identity, or replaces the encoding of an existing one.
    ///
    /// Returns true if an existing entry was replaced.
    pub fn insert(&mut self, name: String, encoding: Encoding) -> Result<bool, FaceIdError> {
        if encoding.dim() != self.dim {
            return Err(FaceIdError::DimensionMismatch {
                expected: self.dim,
                got: encoding.dim(),
            });
        }
        match self.position(&name) {
            Some(i) => {
                self.encodings[i] = encoding;
                Ok(true)
            }
            None => {
                self.encodings.push(encoding);
                self.names.push(name);
                Ok(false)
            }
        }
    }

    /// Returns the index of `name`, if registered.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Returns the encoding registered for `name`.
    pub fn get(&self, name: &str) -> Option<&Encoding> {
        self.position(name).map(|i| &self.encodings[i])
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }

    /// Returns the `(name, encoding)` pair at `index`.
    pub fn entry(&self, index: usize) -> Option<(&str, &Encoding)> {
        Some((self.names.get(index)?.as_str(), self.encodings.get(index)?))
    }

    /// Splits the registry into its parallel sequences.
    pub fn into_parts(self) -> (Vec<Encoding>, Vec<String>) {
        (self.encodings, self.names)
    }
}
