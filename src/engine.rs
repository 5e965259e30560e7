//! Engine facade: top-level API for disjointness disambiguation.
//!
//! The `Disambiguator` owns the ontology and mapper collaborators plus
//! the shared disjointness oracle, and wires expansion, grid building,
//! and the case search together behind one interface.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::assertion::{ConcreteAssertion, MappableTerm, PartialAssertion};
use crate::concept::{ConceptId, StandingEstimator, WeightedStanding};
use crate::error::{ConjointError, ConjointResult, EngineError, ExpandError};
use crate::expand::{Expander, Mapper};
use crate::grid::AssertionGrid;
use crate::ontology::Ontology;
use crate::oracle::DisjointnessOracle;
use crate::search::{CaseResult, CaseSearch};

/// Configuration for the disambiguation engine.
#[derive(Debug, Clone)]
pub struct DisambigConfig {
    /// Recursion bound for partial-assertion expansion.
    pub max_expansion_depth: usize,
    /// Subtracted from the collection standing weight so exact ties
    /// resolve to the individual reading.
    pub collection_bias: f32,
    /// Upper bound on simultaneously queued cases per search.
    pub max_queue_cases: usize,
}

impl Default for DisambigConfig {
    fn default() -> Self {
        Self {
            max_expansion_depth: 8,
            collection_bias: 1e-4,
            max_queue_cases: 10_000,
        }
    }
}

impl DisambigConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.max_expansion_depth == 0 {
            return Err(EngineError::InvalidConfig {
                message: "max_expansion_depth must be > 0".into(),
            });
        }
        if !(0.0..1.0).contains(&self.collection_bias) {
            return Err(EngineError::InvalidConfig {
                message: "collection_bias must be in [0, 1)".into(),
            });
        }
        if self.max_queue_cases == 0 {
            return Err(EngineError::InvalidConfig {
                message: "max_queue_cases must be > 0".into(),
            });
        }
        Ok(())
    }
}

/// The disjointness disambiguation engine.
///
/// Cheap to share: collaborators sit behind `Arc`, and the oracle's
/// cache is concurrent, so one `Disambiguator` can serve parallel
/// searches over different focus concepts.
#[derive(Clone)]
pub struct Disambiguator {
    config: DisambigConfig,
    ontology: Arc<dyn Ontology>,
    mapper: Arc<dyn Mapper>,
    oracle: Arc<DisjointnessOracle>,
}

impl Disambiguator {
    /// Create an engine over the given collaborators.
    pub fn new(
        ontology: Arc<dyn Ontology>,
        mapper: Arc<dyn Mapper>,
        config: DisambigConfig,
    ) -> ConjointResult<Self> {
        config.validate()?;
        info!(
            max_expansion_depth = config.max_expansion_depth,
            collection_bias = config.collection_bias,
            max_queue_cases = config.max_queue_cases,
            "initializing disambiguator"
        );
        Ok(Self {
            config,
            ontology,
            mapper,
            oracle: Arc::new(DisjointnessOracle::new()),
        })
    }

    /// Expand candidates and build a grid with no prior assertions.
    pub fn build_grid(
        &self,
        focus: ConceptId,
        candidates: &[PartialAssertion],
        standing: WeightedStanding,
    ) -> ConjointResult<AssertionGrid> {
        self.build_grid_with(focus, candidates, standing, &[], &HashSet::new())
    }

    /// Expand candidates and build a grid seeded with the concept's
    /// existing assertions and a set of terms excluded from expansion
    /// (typically the focus concept's own surface term).
    ///
    /// A mapper failure drops only the affected candidate's branch;
    /// malformed candidate weights fail the whole build.
    pub fn build_grid_with(
        &self,
        focus: ConceptId,
        candidates: &[PartialAssertion],
        standing: WeightedStanding,
        existing: &[ConcreteAssertion],
        excluded: &HashSet<MappableTerm>,
    ) -> ConjointResult<AssertionGrid> {
        let expander = Expander::new(
            self.ontology.as_ref(),
            self.mapper.as_ref(),
            focus,
            self.config.max_expansion_depth,
        );
        let mut queues = Vec::new();
        for candidate in candidates {
            match expander.expand(candidate, excluded) {
                Ok(Some(queue)) => queues.push(queue),
                Ok(None) => {}
                Err(ConjointError::Expand(ExpandError::Mapper { term, message })) => {
                    debug!(term = %term, message = %message, "dropping candidate after mapper failure");
                }
                Err(err) => return Err(err),
            }
        }
        let grid = AssertionGrid::build(
            queues,
            focus,
            standing,
            existing,
            self.ontology.vocabulary(),
        );
        debug!(
            focus = %focus,
            columns = grid.column_count(),
            weight_sum = grid.weight_sum(),
            "built assertion grid"
        );
        Ok(grid)
    }

    /// Like [`build_grid_with`](Self::build_grid_with), with the standing
    /// prior drawn from an estimator.
    pub fn build_grid_estimated(
        &self,
        focus: ConceptId,
        candidates: &[PartialAssertion],
        estimator: &dyn StandingEstimator,
        existing: &[ConcreteAssertion],
        excluded: &HashSet<MappableTerm>,
    ) -> ConjointResult<AssertionGrid> {
        let standing = estimator.standing_prior(focus);
        self.build_grid_with(focus, candidates, standing, existing, excluded)
    }

    /// Find up to `n` distinct maximal consistent cases, best first.
    pub fn find_top_n(&self, grid: &AssertionGrid, n: usize) -> Vec<CaseResult> {
        let results = CaseSearch::new(
            grid,
            self.ontology.as_ref(),
            self.oracle.as_ref(),
            &self.config,
        )
        .find_top_n(n);
        info!(
            focus = %grid.focus(),
            requested = n,
            found = results.len(),
            "disambiguation search finished"
        );
        results
    }

    /// The single best consistent interpretation, if any.
    pub fn find_maximal_conjoint(&self, grid: &AssertionGrid) -> Option<CaseResult> {
        self.find_top_n(grid, 1).into_iter().next()
    }

    /// Every concrete assertion in a grid, with the fused
    /// membership+subsumption relation expanded.
    pub fn all_assertions(&self, grid: &AssertionGrid) -> HashSet<ConcreteAssertion> {
        grid.all_assertions(self.ontology.vocabulary())
    }

    /// Assertions in a grid whose relation carries no discriminating
    /// content, usable as a fallback when no case is viable.
    pub fn informationless_assertions(
        &self,
        grid: &AssertionGrid,
    ) -> ConjointResult<HashSet<ConcreteAssertion>> {
        grid.informationless_assertions(self.ontology.as_ref())
    }

    /// The shared disjointness oracle.
    pub fn oracle(&self) -> &DisjointnessOracle {
        &self.oracle
    }

    /// The ontology collaborator.
    pub fn ontology(&self) -> &dyn Ontology {
        self.ontology.as_ref()
    }

    /// The engine configuration.
    pub fn config(&self) -> &DisambigConfig {
        &self.config
    }
}

impl std::fmt::Debug for Disambiguator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disambiguator")
            .field("config", &self.config)
            .field("cached_pairs", &self.oracle.cached_pairs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::{Provenance, Term};
    use crate::concept::Standing;
    use crate::expand::StaticMapper;
    use crate::ontology::MemoryOntology;

    fn engine_over(onto: MemoryOntology, mapper: StaticMapper) -> Disambiguator {
        Disambiguator::new(
            Arc::new(onto),
            Arc::new(mapper),
            DisambigConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn zero_depth_rejected() {
        let result = Disambiguator::new(
            Arc::new(MemoryOntology::new()),
            Arc::new(StaticMapper::new()),
            DisambigConfig {
                max_expansion_depth: 0,
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn negative_bias_rejected() {
        let result = Disambiguator::new(
            Arc::new(MemoryOntology::new()),
            Arc::new(StaticMapper::new()),
            DisambigConfig {
                collection_bias: -0.5,
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn end_to_end_disambiguation() {
        let mut onto = MemoryOntology::new();
        let focus = onto.concept("Focus");
        let actor = onto.concept("Actor");
        let place = onto.concept("Place");
        onto.declare_disjoint(actor, place);
        let isa = onto.vocabulary().isa;

        let mut mapper = StaticMapper::new();
        mapper.insert(
            "parent",
            vec![(Term::Concept(actor), 0.9), (Term::Concept(place), 0.3)],
        );

        let candidates = vec![PartialAssertion::new(
            Term::Concept(isa),
            vec![Term::Focus, Term::Unresolved(MappableTerm::new("parent"))],
            1.0,
            Provenance::new("test"),
        )];

        let engine = engine_over(onto, mapper);
        let grid = engine
            .build_grid(focus, &candidates, WeightedStanding::new(0.0, 1.0))
            .unwrap();
        assert!(!grid.is_empty());

        let results = engine.find_top_n(&grid, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].assertions[0].target(), Some(actor));
        assert_eq!(results[0].standing, Standing::Individual);
        assert_eq!(results[1].assertions[0].target(), Some(place));
    }

    #[test]
    fn maximal_conjoint_returns_best_case() {
        let mut onto = MemoryOntology::new();
        let focus = onto.concept("Focus");
        let actor = onto.concept("Actor");
        let isa = onto.vocabulary().isa;

        let mut mapper = StaticMapper::new();
        mapper.insert("parent", vec![(Term::Concept(actor), 1.0)]);

        let candidates = vec![PartialAssertion::new(
            Term::Concept(isa),
            vec![Term::Focus, Term::Unresolved(MappableTerm::new("parent"))],
            1.0,
            Provenance::new("test"),
        )];

        let engine = engine_over(onto, mapper);
        let grid = engine
            .build_grid(focus, &candidates, WeightedStanding::new(0.0, 1.0))
            .unwrap();
        let best = engine.find_maximal_conjoint(&grid).unwrap();
        assert_eq!(best.assertions[0].target(), Some(actor));
        assert!((best.weight - 1.0).abs() < 1e-3);
    }

    #[test]
    fn empty_candidates_give_empty_grid() {
        let mut onto = MemoryOntology::new();
        let focus = onto.concept("Focus");
        let engine = engine_over(onto, StaticMapper::new());
        let grid = engine
            .build_grid(focus, &[], WeightedStanding::uniform())
            .unwrap();
        assert!(grid.is_empty());
        assert!(engine.find_maximal_conjoint(&grid).is_none());
    }
}
