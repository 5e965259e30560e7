//! Memoizing disjointness oracle over the ontology boundary.
//!
//! Disjointness facts do not change mid-search and the same concept pairs
//! recur constantly across branching cases, so every pairwise answer is
//! cached under the unordered pair of identifiers. Pair answers are
//! concept-pair-global, so one oracle can safely be shared across
//! concurrent searches for different focus concepts; the cache is
//! `DashMap`-backed for exactly that reason.

use std::collections::BTreeSet;

use dashmap::DashMap;

use crate::concept::ConceptId;
use crate::error::OntologyError;
use crate::ontology::Ontology;

/// Caching wrapper for the ontology's pairwise disjointness query.
#[derive(Debug, Default)]
pub struct DisjointnessOracle {
    cache: DashMap<(ConceptId, ConceptId), bool>,
}

impl DisjointnessOracle {
    /// Create an oracle with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Is `concept` disjoint with any member of `truths`?
    ///
    /// Returns `false` immediately when `truths` already contains
    /// `concept` (trivially consistent). Failed queries are not cached,
    /// so a transient boundary error does not poison later searches.
    pub fn is_disjoint(
        &self,
        ontology: &dyn Ontology,
        concept: ConceptId,
        truths: &BTreeSet<ConceptId>,
    ) -> Result<bool, OntologyError> {
        if truths.contains(&concept) {
            return Ok(false);
        }
        for &truth in truths {
            if self.pair_disjoint(ontology, concept, truth)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Memoized pairwise disjointness.
    pub fn pair_disjoint(
        &self,
        ontology: &dyn Ontology,
        a: ConceptId,
        b: ConceptId,
    ) -> Result<bool, OntologyError> {
        let key = if a <= b { (a, b) } else { (b, a) };
        if let Some(hit) = self.cache.get(&key) {
            tracing::trace!(a = key.0.get(), b = key.1.get(), result = *hit, "oracle cache hit");
            return Ok(*hit);
        }
        let result = ontology.evaluate_disjoint(key.0, key.1)?;
        self.cache.insert(key, result);
        Ok(result)
    }

    /// Number of memoized concept pairs.
    pub fn cached_pairs(&self) -> usize {
        self.cache.len()
    }

    /// Drop all memoized answers, e.g. after the ontology has changed.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ontology::{ArgConstraints, MemoryOntology, Vocabulary};

    /// Delegating ontology that counts disjointness queries.
    struct CountingOntology {
        inner: MemoryOntology,
        queries: AtomicUsize,
    }

    impl Ontology for CountingOntology {
        fn vocabulary(&self) -> &Vocabulary {
            self.inner.vocabulary()
        }

        fn evaluate_disjoint(&self, a: ConceptId, b: ConceptId) -> Result<bool, OntologyError> {
            self.queries.fetch_add(1, Ordering::Relaxed);
            self.inner.evaluate_disjoint(a, b)
        }

        fn evaluate_subsumption(
            &self,
            sub: ConceptId,
            parent: ConceptId,
        ) -> Result<bool, OntologyError> {
            self.inner.evaluate_subsumption(sub, parent)
        }

        fn evaluate_membership(
            &self,
            instance: ConceptId,
            collection: ConceptId,
        ) -> Result<bool, OntologyError> {
            self.inner.evaluate_membership(instance, collection)
        }

        fn generalizes_predicate(
            &self,
            relation: ConceptId,
            target: ConceptId,
        ) -> Result<bool, OntologyError> {
            self.inner.generalizes_predicate(relation, target)
        }

        fn argument_constraints(
            &self,
            relation: ConceptId,
            arg_pos: usize,
        ) -> Result<ArgConstraints, OntologyError> {
            self.inner.argument_constraints(relation, arg_pos)
        }

        fn is_informationless(&self, relation: ConceptId) -> Result<bool, OntologyError> {
            self.inner.is_informationless(relation)
        }
    }

    #[test]
    fn member_of_truths_is_trivially_consistent() {
        let mut inner = MemoryOntology::new();
        let actor = inner.concept("Actor");
        let place = inner.concept("Place");
        inner.declare_disjoint(actor, place);

        let oracle = DisjointnessOracle::new();
        let truths: BTreeSet<_> = [actor].into_iter().collect();
        // Actor conflicts with Place, but Actor itself is already a truth.
        assert!(!oracle.is_disjoint(&inner, actor, &truths).unwrap());
        assert!(oracle.is_disjoint(&inner, place, &truths).unwrap());
    }

    #[test]
    fn pairwise_answers_are_cached() {
        let mut inner = MemoryOntology::new();
        let actor = inner.concept("Actor");
        let place = inner.concept("Place");
        inner.declare_disjoint(actor, place);
        let onto = CountingOntology {
            inner,
            queries: AtomicUsize::new(0),
        };

        let oracle = DisjointnessOracle::new();
        assert!(oracle.pair_disjoint(&onto, actor, place).unwrap());
        assert!(oracle.pair_disjoint(&onto, place, actor).unwrap());
        assert!(oracle.pair_disjoint(&onto, actor, place).unwrap());
        // Unordered pair key: one boundary query for all three calls.
        assert_eq!(onto.queries.load(Ordering::Relaxed), 1);
        assert_eq!(oracle.cached_pairs(), 1);
    }

    #[test]
    fn clear_empties_the_cache() {
        let mut inner = MemoryOntology::new();
        let a = inner.concept("A");
        let b = inner.concept("B");
        let oracle = DisjointnessOracle::new();
        oracle.pair_disjoint(&inner, a, b).unwrap();
        assert_eq!(oracle.cached_pairs(), 1);
        oracle.clear();
        assert_eq!(oracle.cached_pairs(), 0);
    }

    #[test]
    fn empty_truths_never_conflict() {
        let mut inner = MemoryOntology::new();
        let a = inner.concept("A");
        let oracle = DisjointnessOracle::new();
        assert!(!oracle.is_disjoint(&inner, a, &BTreeSet::new()).unwrap());
    }
}
