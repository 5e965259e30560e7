//! Batch driver: disambiguate many concepts in parallel.
//!
//! Each request runs an independent grid build and search on a rayon
//! worker; the disambiguator's oracle cache is shared across them, so
//! disjointness answers learned for one concept speed up the rest.

use rayon::prelude::*;
use std::collections::HashSet;
use tracing::debug;

use crate::assertion::{ConcreteAssertion, MappableTerm, PartialAssertion};
use crate::concept::{ConceptId, WeightedStanding};
use crate::engine::Disambiguator;
use crate::error::ConjointResult;
use crate::search::CaseResult;

/// One concept to disambiguate.
#[derive(Debug, Clone)]
pub struct DisambiguationRequest {
    /// The concept being interpreted.
    pub focus: ConceptId,
    /// Candidate assertions mined for the concept.
    pub candidates: Vec<PartialAssertion>,
    /// Standing prior for the concept.
    pub standing: WeightedStanding,
    /// Already-accepted assertions, folded in as prior truths.
    pub existing: Vec<ConcreteAssertion>,
    /// Terms excluded from expansion.
    pub excluded: HashSet<MappableTerm>,
    /// How many cases to return.
    pub top_n: usize,
}

impl DisambiguationRequest {
    /// A request with no priors, returning only the best case.
    pub fn new(focus: ConceptId, candidates: Vec<PartialAssertion>) -> Self {
        Self {
            focus,
            candidates,
            standing: WeightedStanding::uniform(),
            existing: Vec::new(),
            excluded: HashSet::new(),
            top_n: 1,
        }
    }
}

/// Ranked cases for one request.
#[derive(Debug, Clone)]
pub struct DisambiguationOutcome {
    pub focus: ConceptId,
    /// Best-first consistent cases; empty when nothing was viable.
    pub cases: Vec<CaseResult>,
}

/// Run every request on the rayon pool, preserving input order.
///
/// A failed request yields its error in place without affecting the
/// others.
pub fn disambiguate_all(
    engine: &Disambiguator,
    requests: &[DisambiguationRequest],
) -> Vec<ConjointResult<DisambiguationOutcome>> {
    debug!(requests = requests.len(), "starting batch disambiguation");
    requests
        .par_iter()
        .map(|request| {
            let grid = engine.build_grid_with(
                request.focus,
                &request.candidates,
                request.standing,
                &request.existing,
                &request.excluded,
            )?;
            let cases = engine.find_top_n(&grid, request.top_n);
            Ok(DisambiguationOutcome {
                focus: request.focus,
                cases,
            })
        })
        .collect()
}
