//! Concept identifiers and standing for the conjoint engine.
//!
//! A [`ConceptId`] names a node in the external ontology's subsumption
//! graph. [`Standing`] records whether a concept is interpreted as a
//! collection (type/class) or an individual (instance), and
//! [`WeightedStanding`] carries the caller-supplied prior over the two.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Unique, niche-optimized identifier for an ontology concept.
///
/// Uses `NonZeroU64` so that `Option<ConceptId>` is the same size as
/// `ConceptId` (the niche optimization lets the compiler use 0 as the
/// `None` discriminant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConceptId(NonZeroU64);

impl ConceptId {
    /// Create a `ConceptId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(ConceptId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "concept:{}", self.0)
    }
}

/// How a concept is interpreted by one disjoint case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Standing {
    /// A type/class: other concepts can be instances or subtypes of it.
    Collection,
    /// An instance: it can belong to collections but has no members.
    Individual,
}

impl std::fmt::Display for Standing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Standing::Collection => write!(f, "Collection"),
            Standing::Individual => write!(f, "Individual"),
        }
    }
}

/// Prior belief over a concept's standing, supplied by a
/// standing-estimation collaborator or by the caller directly.
///
/// Raw weights are non-negative and need not sum to one; accessors
/// normalize on the fly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedStanding {
    /// Raw evidence weight for the collection interpretation.
    pub collection: f32,
    /// Raw evidence weight for the individual interpretation.
    pub individual: f32,
}

impl WeightedStanding {
    /// Create a prior from raw weights.
    pub fn new(collection: f32, individual: f32) -> Self {
        Self {
            collection,
            individual,
        }
    }

    /// An uninformative prior: both standings equally likely.
    pub fn uniform() -> Self {
        Self::new(1.0, 1.0)
    }

    /// Normalized weight of one standing in [0, 1].
    ///
    /// Returns 0 when both raw weights are zero or negative.
    pub fn normalized(&self, standing: Standing) -> f32 {
        let sum = self.collection.max(0.0) + self.individual.max(0.0);
        if sum <= 0.0 {
            return 0.0;
        }
        let raw = match standing {
            Standing::Collection => self.collection.max(0.0),
            Standing::Individual => self.individual.max(0.0),
        };
        raw / sum
    }

    /// The larger of the two normalized weights.
    pub fn best(&self) -> f32 {
        self.normalized(Standing::Collection)
            .max(self.normalized(Standing::Individual))
    }
}

impl Default for WeightedStanding {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Standing-estimation collaborator: produces a prior for a concept.
///
/// Implementations typically consult an external classifier or corpus
/// statistics. The engine only reads the returned prior.
pub trait StandingEstimator: Send + Sync {
    /// Estimate the standing prior for a concept.
    fn standing_prior(&self, concept: ConceptId) -> WeightedStanding;
}
