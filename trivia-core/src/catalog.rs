use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use trivia_types::ImageSet;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("image set catalog is empty")]
    Empty,
    #[error("failed to read image sets from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse image sets from {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Deals image sets for successive rounds: each set is used once before any
/// repeats, and the pool reshuffles when exhausted.
pub struct RoundCatalog {
    sets: Vec<ImageSet>,
    remaining: Vec<usize>,
    rng: StdRng,
}

impl RoundCatalog {
    pub fn new(sets: Vec<ImageSet>) -> Result<Self, CatalogError> {
        Self::with_rng(sets, StdRng::from_entropy())
    }

    /// Deterministic variant for tests.
    pub fn with_seed(sets: Vec<ImageSet>, seed: u64) -> Result<Self, CatalogError> {
        Self::with_rng(sets, StdRng::seed_from_u64(seed))
    }

    fn with_rng(sets: Vec<ImageSet>, rng: StdRng) -> Result<Self, CatalogError> {
        if sets.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self {
            sets,
            remaining: Vec::new(),
            rng,
        })
    }

    /// Clone the underlying sets into a new catalog with fresh entropy, so
    /// each room draws its own independent sequence.
    pub fn fork(&self) -> Self {
        Self {
            sets: self.sets.clone(),
            remaining: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Load image sets from a JSON file (an array of sets).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let sets: Vec<ImageSet> =
            serde_json::from_str(&data).map_err(|source| CatalogError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        Self::new(sets)
    }

    /// Built-in sets used when no catalog file is configured.
    pub fn default_sets() -> Vec<ImageSet> {
        fn picsum(n: u32) -> String {
            format!("https://picsum.photos/300/300?random={}", n)
        }
        vec![
            ImageSet {
                id: 1,
                images: vec![picsum(1), picsum(2), picsum(3)],
                correct_answer: "nature".to_string(),
                hint: Some("Think about the outdoors".to_string()),
                category: None,
            },
            ImageSet {
                id: 2,
                images: vec![picsum(4), picsum(5), picsum(6)],
                correct_answer: "technology".to_string(),
                hint: Some("Digital world".to_string()),
                category: None,
            },
            ImageSet {
                id: 3,
                images: vec![picsum(7), picsum(8), picsum(9)],
                correct_answer: "food".to_string(),
                hint: Some("Something delicious".to_string()),
                category: None,
            },
        ]
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Deal the next image set, reshuffling the pool once every set has been
    /// dealt.
    pub fn next(&mut self) -> ImageSet {
        if self.remaining.is_empty() {
            self.remaining = (0..self.sets.len()).collect();
            self.remaining.shuffle(&mut self.rng);
        }
        let index = self.remaining.pop().unwrap_or_else(|| {
            // sets is non-empty by construction, so the refill above always
            // leaves at least one index
            self.rng.gen_range(0..self.sets.len())
        });
        self.sets[index].clone()
    }
}
