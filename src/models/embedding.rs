//! Fixed-dimension embedding vectors and their string encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DatastoreError;

/// Number of components in every stored or queried embedding.
pub const EMBEDDING_DIMENSIONS: usize = 768;

/// A 768-component embedding vector.
///
/// The dimension is checked on construction, so every `Embedding` in the
/// crate satisfies the storage schema (`vector(768)`).
///
/// The string form is a bracketed, comma-separated decimal list such as
/// `[0.25, -1.0, 3.5e-5]`. Stores that round-trip vectors through text
/// (`string_to_vector` / `vector_to_string`) use exactly this encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Creates an embedding, rejecting vectors of the wrong length or with
    /// NaN/infinite components.
    pub fn new(values: Vec<f32>) -> Result<Self, DatastoreError> {
        if values.len() != EMBEDDING_DIMENSIONS {
            return Err(DatastoreError::InvalidEmbedding {
                expected: EMBEDDING_DIMENSIONS,
                actual: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(DatastoreError::NonFiniteEmbedding { index });
        }
        Ok(Self(values))
    }

    /// Decodes an embedding from its bracketed string form.
    pub fn parse(text: &str) -> Result<Self, DatastoreError> {
        let inner = text
            .trim()
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| DatastoreError::Decode(format!("embedding not bracketed: {:.32}", text)))?;

        if inner.trim().is_empty() {
            return Self::new(Vec::new());
        }

        let values = inner
            .split(',')
            .map(|part| {
                part.trim().parse::<f32>().map_err(|e| {
                    DatastoreError::Decode(format!("invalid embedding component '{}': {}", part.trim(), e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(values)
    }

    /// Encodes the embedding as `[c0, c1, ...]`.
    pub fn to_vector_string(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 12 + 2);
        out.push('[');
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            // Debug formatting is the shortest decimal that parses back to the same f32
            out.push_str(&format!("{:?}", value));
        }
        out.push(']');
        out
    }

    /// Returns the components.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Components widened to `f64`, as graph drivers store floats.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.0.iter().map(|&v| v as f64).collect()
    }

    /// Cosine distance (`1 - cosine similarity`) between two embeddings.
    ///
    /// Zero vectors are treated as maximally distant.
    pub fn cosine_distance(&self, other: &Embedding) -> f32 {
        let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }
        if norm_a == 0.0 || norm_b == 0.0 {
            return 1.0;
        }
        1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

impl TryFrom<Vec<f32>> for Embedding {
    type Error = DatastoreError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl TryFrom<Vec<f64>> for Embedding {
    type Error = DatastoreError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values.into_iter().map(|v| v as f32).collect())
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Self {
        embedding.0
    }
}

impl FromStr for Embedding {
    type Err = DatastoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_vector_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Embedding {
        let values = (0..EMBEDDING_DIMENSIONS)
            .map(|i| (i as f32) * 0.25 - 7.0)
            .collect();
        Embedding::new(values).unwrap()
    }

    #[test]
    fn test_rejects_wrong_dimensions() {
        let err = Embedding::new(vec![0.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            DatastoreError::InvalidEmbedding {
                expected: 768,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_rejects_non_finite_components() {
        let mut values = vec![0.0f32; EMBEDDING_DIMENSIONS];
        values[5] = f32::NAN;
        assert!(matches!(
            Embedding::new(values),
            Err(DatastoreError::NonFiniteEmbedding { index: 5 })
        ));

        let mut values = vec![0.0f32; EMBEDDING_DIMENSIONS];
        values[0] = f32::INFINITY;
        values[1] = f32::NEG_INFINITY;
        assert!(matches!(
            Embedding::new(values),
            Err(DatastoreError::NonFiniteEmbedding { index: 0 })
        ));

        // Widening from f64 overflows to infinity.
        let mut wide = vec![0.0f64; EMBEDDING_DIMENSIONS];
        wide[767] = f64::MAX;
        assert!(Embedding::try_from(wide).is_err());

        let text = format!("[NaN{}]", ", 0.0".repeat(EMBEDDING_DIMENSIONS - 1));
        assert!(matches!(
            Embedding::parse(&text),
            Err(DatastoreError::NonFiniteEmbedding { index: 0 })
        ));
    }

    #[test]
    fn test_vector_string_format() {
        let mut values = vec![0.0f32; EMBEDDING_DIMENSIONS];
        values[0] = 1.0;
        values[1] = -0.5;
        let text = Embedding::new(values).unwrap().to_vector_string();

        assert!(text.starts_with("[1.0, -0.5, 0.0, "));
        assert!(text.ends_with(", 0.0]"));
        assert_eq!(text.matches(", ").count(), EMBEDDING_DIMENSIONS - 1);
    }

    #[test]
    fn test_parse_encoded_string() {
        let embedding = sample();
        let parsed: Embedding = embedding.to_vector_string().parse().unwrap();
        assert_eq!(parsed, embedding);
    }

    #[test]
    fn test_parse_tolerates_compact_form() {
        let text = format!("[{}]", vec!["0.5"; EMBEDDING_DIMENSIONS].join(","));
        let parsed = Embedding::parse(&text).unwrap();
        assert!(parsed.as_slice().iter().all(|&v| v == 0.5));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Embedding::parse("0.1, 0.2").is_err());
        assert!(Embedding::parse("[0.1, abc]").is_err());
        assert!(matches!(
            Embedding::parse("[0.1, 0.2]"),
            Err(DatastoreError::InvalidEmbedding { actual: 2, .. })
        ));
        assert!(matches!(
            Embedding::parse("[]"),
            Err(DatastoreError::InvalidEmbedding { actual: 0, .. })
        ));
    }

    #[test]
    fn test_serde_checks_dimensions() {
        let json = serde_json::to_string(&vec![0.1f32; 4]).unwrap();
        assert!(serde_json::from_str::<Embedding>(&json).is_err());

        let embedding = sample();
        let json = serde_json::to_string(&embedding).unwrap();
        assert_eq!(serde_json::from_str::<Embedding>(&json).unwrap(), embedding);
    }

    #[test]
    fn test_cosine_distance() {
        let a = sample();
        assert!(a.cosine_distance(&a).abs() < 1e-5);

        let negated = Embedding::new(a.as_slice().iter().map(|v| -v).collect()).unwrap();
        assert!((a.cosine_distance(&negated) - 2.0).abs() < 1e-5);

        let zero = Embedding::new(vec![0.0; EMBEDDING_DIMENSIONS]).unwrap();
        assert_eq!(a.cosine_distance(&zero), 1.0);
    }
}
