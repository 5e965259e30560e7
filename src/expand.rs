//! Candidate expansion: partial assertions to alternative queues.
//!
//! Each input assertion becomes a ranked queue of fully concrete
//! alternatives. Ambiguous terms are resolved through the [`Mapper`]
//! collaborator; a mapping candidate that is itself still ambiguous
//! opens a nested sub-queue, so queues form a tree. Cyclic mappings are
//! guarded twice: an excluded-term set (a term is never re-expanded
//! beneath itself) and a hard depth bound that drops the branch.

use std::collections::HashSet;

use crate::assertion::{ConcreteAssertion, MappableTerm, PartialAssertion, Term};
use crate::concept::ConceptId;
use crate::error::{ConjointResult, ExpandError};
use crate::ontology::Ontology;

/// Mapping-subsystem collaborator: resolves an ambiguous term to weighted
/// candidates.
///
/// Candidates may themselves be unresolved terms (e.g. a text term mapping
/// to an encyclopedia article that still needs ontology grounding); the
/// expander recurses through them.
pub trait Mapper: Send + Sync {
    /// Map a term to candidate replacements with relative confidences.
    ///
    /// An empty vector means the term has no valid mapping; the branch is
    /// pruned. Confidences are expected in (0, 1].
    fn map_term(
        &self,
        term: &MappableTerm,
        ontology: &dyn Ontology,
    ) -> Result<Vec<(Term, f32)>, ExpandError>;
}

/// A ranked queue of concrete alternatives for one input assertion.
///
/// Entry weights already include the full product of ancestor mapping
/// confidences and the input assertion's own weight. Sub-queues hold
/// alternatives that opened further disambiguation points.
#[derive(Debug, Clone, Default)]
pub struct AlternativeQueue {
    entries: Vec<(ConcreteAssertion, f32)>,
    subqueues: Vec<AlternativeQueue>,
}

impl AlternativeQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a concrete alternative with its weight.
    pub fn push(&mut self, assertion: ConcreteAssertion, weight: f32) {
        self.entries.push((assertion, weight));
    }

    /// Attach a nested sub-queue.
    pub fn add_subqueue(&mut self, queue: AlternativeQueue) {
        self.subqueues.push(queue);
    }

    /// Alternatives at this level.
    pub fn entries(&self) -> &[(ConcreteAssertion, f32)] {
        &self.entries
    }

    /// Nested sub-queues.
    pub fn subqueues(&self) -> &[AlternativeQueue] {
        &self.subqueues
    }

    /// Number of alternatives at this level.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this level holds no alternatives.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decompose into owned entries and sub-queues.
    pub fn into_parts(self) -> (Vec<(ConcreteAssertion, f32)>, Vec<AlternativeQueue>) {
        (self.entries, self.subqueues)
    }

    /// Total alternatives across the whole tree.
    pub fn total_alternatives(&self) -> usize {
        self.entries.len()
            + self
                .subqueues
                .iter()
                .map(AlternativeQueue::total_alternatives)
                .sum::<usize>()
    }

    /// Prune empty branches and splice out levels that hold no
    /// alternatives of their own, promoting their sub-queues.
    ///
    /// Returns `None` when nothing survives anywhere in the tree.
    pub fn clean_empty_parents(mut self) -> Option<AlternativeQueue> {
        let mut cleaned = Vec::new();
        for sq in self.subqueues {
            if let Some(c) = sq.clean_empty_parents() {
                cleaned.push(c);
            }
        }
        self.subqueues = cleaned;

        if self.entries.is_empty() {
            let mut entries = Vec::new();
            let mut subqueues = Vec::new();
            for sq in self.subqueues {
                entries.extend(sq.entries);
                subqueues.extend(sq.subqueues);
            }
            self.entries = entries;
            self.subqueues = subqueues;
        }

        if self.entries.is_empty() && self.subqueues.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Expands partial assertions into alternative queues.
pub struct Expander<'a> {
    ontology: &'a dyn Ontology,
    mapper: &'a dyn Mapper,
    focus: ConceptId,
    max_depth: usize,
}

impl<'a> Expander<'a> {
    /// Create an expander for one focus concept.
    pub fn new(
        ontology: &'a dyn Ontology,
        mapper: &'a dyn Mapper,
        focus: ConceptId,
        max_depth: usize,
    ) -> Self {
        Self {
            ontology,
            mapper,
            focus,
            max_depth,
        }
    }

    /// Expand one input assertion into its alternative queue.
    ///
    /// `excluded` lists terms that must not be (re-)expanded, notably the
    /// focus concept's own surface term. Returns `Ok(None)` when every
    /// branch is pruned; such assertions contribute no grid column.
    pub fn expand(
        &self,
        assertion: &PartialAssertion,
        excluded: &HashSet<MappableTerm>,
    ) -> ConjointResult<Option<AlternativeQueue>> {
        if !(assertion.weight > 0.0 && assertion.weight <= 1.0) {
            return Err(ExpandError::InvalidWeight {
                weight: assertion.weight,
            }
            .into());
        }
        let queue = self.expand_inner(assertion, excluded, 0)?;
        Ok(queue.and_then(AlternativeQueue::clean_empty_parents))
    }

    fn expand_inner(
        &self,
        assertion: &PartialAssertion,
        excluded: &HashSet<MappableTerm>,
        depth: usize,
    ) -> ConjointResult<Option<AlternativeQueue>> {
        if depth > self.max_depth {
            tracing::debug!(
                max_depth = self.max_depth,
                assertion = ?assertion,
                "expansion depth bound reached, dropping branch"
            );
            return Ok(None);
        }

        let Some(term) = assertion.first_unresolved().cloned() else {
            // Fully concrete: a single-element queue at the assertion's
            // own weight.
            let Some(concrete) = assertion.to_concrete(self.focus) else {
                return Ok(None);
            };
            let mut queue = AlternativeQueue::new();
            queue.push(concrete, assertion.weight);
            return Ok(Some(queue));
        };

        if excluded.contains(&term) {
            tracing::debug!(term = %term, "term excluded from expansion, dropping branch");
            return Ok(None);
        }

        let candidates = self.mapper.map_term(&term, self.ontology)?;
        let mut child_excluded = excluded.clone();
        child_excluded.insert(term.clone());

        let mut queue = AlternativeQueue::new();
        for (replacement, confidence) in candidates {
            if confidence <= 0.0 {
                continue;
            }
            let mut candidate = assertion.substitute(&term, &replacement);
            candidate.weight *= confidence;
            if candidate.is_concrete() {
                let Some(concrete) = candidate.to_concrete(self.focus) else {
                    continue;
                };
                queue.push(concrete, candidate.weight);
            } else if let Some(sub) = self.expand_inner(&candidate, &child_excluded, depth + 1)? {
                queue.add_subqueue(sub);
            }
        }

        if queue.is_empty() && queue.subqueues().is_empty() {
            Ok(None)
        } else {
            Ok(Some(queue))
        }
    }
}

/// Table-driven mapper for tests, benches, and embedders with a
/// precomputed candidate index.
#[derive(Debug, Default)]
pub struct StaticMapper {
    candidates: std::collections::HashMap<String, Vec<(Term, f32)>>,
}

impl StaticMapper {
    /// Create an empty mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register candidates for a term label.
    pub fn insert(&mut self, label: impl Into<String>, candidates: Vec<(Term, f32)>) {
        self.candidates.insert(label.into(), candidates);
    }
}

impl Mapper for StaticMapper {
    fn map_term(
        &self,
        term: &MappableTerm,
        _ontology: &dyn Ontology,
    ) -> Result<Vec<(Term, f32)>, ExpandError> {
        Ok(self.candidates.get(&term.label).cloned().unwrap_or_default())
    }
}
