// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # conjoint
//!
//! Best-first disambiguation of mined concept knowledge: given weighted,
//! possibly ambiguous candidate assertions about one concept, find the
//! highest-weighted mutually consistent subsets under an ontology's
//! disjointness constraints.
//!
//! ## Architecture
//!
//! - **Expansion** (`expand`): partial assertions with unresolved terms
//!   branch into alternative queues via a pluggable `Mapper`
//! - **Grid** (`grid`): queues flatten into an immutable weighted grid,
//!   one column per queue level with explicit parent/child links
//! - **Search** (`search`): disjoint cases advance through a priority
//!   queue ordered on optimistic potential weight, accepting cells that
//!   stay consistent with their accumulated truths
//! - **Oracle** (`oracle`): memoized pairwise disjointness queries,
//!   shareable across concurrent searches
//! - **Batch** (`batch`): rayon-parallel disambiguation of many concepts
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use conjoint::assertion::{MappableTerm, PartialAssertion, Provenance, Term};
//! use conjoint::concept::WeightedStanding;
//! use conjoint::engine::{DisambigConfig, Disambiguator};
//! use conjoint::expand::StaticMapper;
//! use conjoint::ontology::{MemoryOntology, Ontology};
//!
//! let mut onto = MemoryOntology::new();
//! let focus = onto.concept("Kiwi");
//! let bird = onto.concept("Bird");
//! let isa = onto.vocabulary().isa;
//!
//! let mut mapper = StaticMapper::new();
//! mapper.insert("kiwi-parent", vec![(Term::Concept(bird), 0.9)]);
//!
//! let candidates = vec![PartialAssertion::new(
//!     Term::Concept(isa),
//!     vec![Term::Focus, Term::Unresolved(MappableTerm::new("kiwi-parent"))],
//!     1.0,
//!     Provenance::new("taxobox"),
//! )];
//!
//! let engine =
//!     Disambiguator::new(Arc::new(onto), Arc::new(mapper), DisambigConfig::default()).unwrap();
//! let grid = engine
//!     .build_grid(focus, &candidates, WeightedStanding::uniform())
//!     .unwrap();
//! let best = engine.find_maximal_conjoint(&grid);
//! ```

pub mod assertion;
pub mod batch;
pub mod concept;
pub mod engine;
pub mod error;
pub mod expand;
pub mod export;
pub mod grid;
pub mod ontology;
pub mod oracle;
pub mod search;
