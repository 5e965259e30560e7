//! The ontology boundary: read-only consistency queries.
//!
//! The engine never reasons about the taxonomy itself; it asks an
//! [`Ontology`] implementation. Every call is a potential network
//! round-trip against a remote knowledge base, so the search treats
//! failures as fatal to the current case only, and the
//! [oracle](crate::oracle) memoizes disjointness answers.
//!
//! [`MemoryOntology`] is a complete in-process implementation with
//! transitive subsumption, inherited disjointness, and per-argument
//! relation constraints. It backs the tests and benches and serves
//! embedders that do not have a remote ontology.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::concept::ConceptId;
use crate::error::OntologyError;

/// Well-known concepts every ontology implementation must expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Membership relation (instance-of).
    pub isa: ConceptId,
    /// Subsumption relation (subclass-of).
    pub genls: ConceptId,
    /// Fused membership+subsumption relation produced by heuristics that
    /// cannot tell the two apart; resolved per-case by standing.
    pub isa_genls: ConceptId,
    /// The collection of all collections.
    pub collection: ConceptId,
    /// The collection of first-order collections (collections of
    /// individuals).
    pub first_order_collection: ConceptId,
    /// The universal concept; constraint folding skips it as content-free.
    pub thing: ConceptId,
}

/// Minimal is-a / subsumption constraints declared for one argument
/// position of a relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgConstraints {
    /// Collections the argument must be an instance of.
    pub isa: Vec<ConceptId>,
    /// Collections the argument must be subsumed by.
    pub genls: Vec<ConceptId>,
}

impl ArgConstraints {
    /// Whether no constraints are declared.
    pub fn is_empty(&self) -> bool {
        self.isa.is_empty() && self.genls.is_empty()
    }
}

/// Read-only ontology collaborator contract.
///
/// Implementations must be shareable across the worker threads of a
/// batch run; serialization of an underlying connection pool is the
/// implementation's concern.
pub trait Ontology: Send + Sync {
    /// Well-known concept handles.
    fn vocabulary(&self) -> &Vocabulary;

    /// Are two concepts disjoint (no common instance possible)?
    fn evaluate_disjoint(&self, a: ConceptId, b: ConceptId) -> Result<bool, OntologyError>;

    /// Is `sub` subsumed by `parent` (reflexive)?
    fn evaluate_subsumption(&self, sub: ConceptId, parent: ConceptId)
    -> Result<bool, OntologyError>;

    /// Is `instance` a member of `collection`?
    fn evaluate_membership(
        &self,
        instance: ConceptId,
        collection: ConceptId,
    ) -> Result<bool, OntologyError>;

    /// Does `relation` generalize to `target` in the predicate hierarchy
    /// (reflexive)? Used to recognize hierarchical assertions whose
    /// relation is a specialization of membership or subsumption.
    fn generalizes_predicate(
        &self,
        relation: ConceptId,
        target: ConceptId,
    ) -> Result<bool, OntologyError>;

    /// Minimal constraints declared for one argument position (0-based)
    /// of a relation.
    fn argument_constraints(
        &self,
        relation: ConceptId,
        arg_pos: usize,
    ) -> Result<ArgConstraints, OntologyError>;

    /// Whether a relation carries no discriminating content.
    fn is_informationless(&self, relation: ConceptId) -> Result<bool, OntologyError>;

    /// Human-readable label, if the implementation tracks one.
    fn label(&self, _concept: ConceptId) -> Option<String> {
        None
    }
}

/// In-process ontology backed by hash maps.
///
/// Disjointness is declared on concept pairs and inherited downward:
/// two concepts are disjoint when any of their subsumption ancestors
/// (including themselves) form a declared pair. Mirrors the storage
/// shape of a constraint index rather than a full reasoner.
#[derive(Debug)]
pub struct MemoryOntology {
    next_id: u64,
    by_label: HashMap<String, ConceptId>,
    labels: HashMap<ConceptId, String>,
    /// Declared disjoint pairs, stored both ways for O(1) lookup.
    disjoint: HashSet<(ConceptId, ConceptId)>,
    /// Direct subsumption edges: concept -> supertypes.
    genls_edges: HashMap<ConceptId, BTreeSet<ConceptId>>,
    /// Direct membership edges: instance -> collections.
    isa_edges: HashMap<ConceptId, BTreeSet<ConceptId>>,
    /// Predicate hierarchy: relation -> more general relations.
    genl_preds: HashMap<ConceptId, BTreeSet<ConceptId>>,
    constraints: HashMap<(ConceptId, usize), ArgConstraints>,
    infoless: HashSet<ConceptId>,
    vocab: Vocabulary,
}

impl MemoryOntology {
    /// Create an ontology pre-seeded with the vocabulary concepts and
    /// the reflexive predicate-hierarchy entries for the fused relation.
    pub fn new() -> Self {
        let mut onto = Self {
            next_id: 1,
            by_label: HashMap::new(),
            labels: HashMap::new(),
            disjoint: HashSet::new(),
            genls_edges: HashMap::new(),
            isa_edges: HashMap::new(),
            genl_preds: HashMap::new(),
            constraints: HashMap::new(),
            infoless: HashSet::new(),
            vocab: Vocabulary {
                // Placeholder, replaced below once allocation works.
                isa: ConceptId::new(1).unwrap(),
                genls: ConceptId::new(1).unwrap(),
                isa_genls: ConceptId::new(1).unwrap(),
                collection: ConceptId::new(1).unwrap(),
                first_order_collection: ConceptId::new(1).unwrap(),
                thing: ConceptId::new(1).unwrap(),
            },
        };
        let isa = onto.concept("isa");
        let genls = onto.concept("genls");
        let isa_genls = onto.concept("isa-genls");
        let collection = onto.concept("Collection");
        let first_order_collection = onto.concept("FirstOrderCollection");
        let thing = onto.concept("Thing");
        onto.vocab = Vocabulary {
            isa,
            genls,
            isa_genls,
            collection,
            first_order_collection,
            thing,
        };
        // The fused relation can stand in for either parentage relation.
        onto.declare_generalizes(isa_genls, isa);
        onto.declare_generalizes(isa_genls, genls);
        onto.declare_subclass(first_order_collection, collection);
        onto
    }

    /// Get or create a concept by label.
    pub fn concept(&mut self, label: impl Into<String>) -> ConceptId {
        let label = label.into();
        if let Some(&id) = self.by_label.get(&label) {
            return id;
        }
        let id = ConceptId::new(self.next_id).expect("concept allocator starts at 1");
        self.next_id += 1;
        self.by_label.insert(label.clone(), id);
        self.labels.insert(id, label);
        id
    }

    /// Declare two concepts disjoint (symmetric).
    pub fn declare_disjoint(&mut self, a: ConceptId, b: ConceptId) {
        self.disjoint.insert((a, b));
        self.disjoint.insert((b, a));
    }

    /// Declare a direct subsumption edge: `sub` genls `parent`.
    pub fn declare_subclass(&mut self, sub: ConceptId, parent: ConceptId) {
        self.genls_edges.entry(sub).or_default().insert(parent);
    }

    /// Declare a direct membership edge: `instance` isa `collection`.
    pub fn declare_instance(&mut self, instance: ConceptId, collection: ConceptId) {
        self.isa_edges.entry(instance).or_default().insert(collection);
    }

    /// Declare that `relation` generalizes to `target` in the predicate
    /// hierarchy.
    pub fn declare_generalizes(&mut self, relation: ConceptId, target: ConceptId) {
        self.genl_preds.entry(relation).or_default().insert(target);
    }

    /// Declare argument constraints for a relation position (0-based).
    pub fn declare_constraints(
        &mut self,
        relation: ConceptId,
        arg_pos: usize,
        constraints: ArgConstraints,
    ) {
        self.constraints.insert((relation, arg_pos), constraints);
    }

    /// Mark a relation as carrying no discriminating content.
    pub fn declare_informationless(&mut self, relation: ConceptId) {
        self.infoless.insert(relation);
    }

    /// Subsumption ancestors of a concept, including itself.
    fn ancestors(&self, concept: ConceptId) -> HashSet<ConceptId> {
        let mut seen = HashSet::new();
        let mut stack = vec![concept];
        while let Some(c) = stack.pop() {
            if !seen.insert(c) {
                continue;
            }
            if let Some(parents) = self.genls_edges.get(&c) {
                stack.extend(parents.iter().copied());
            }
        }
        seen
    }
}

impl Default for MemoryOntology {
    fn default() -> Self {
        Self::new()
    }
}

impl Ontology for MemoryOntology {
    fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    fn evaluate_disjoint(&self, a: ConceptId, b: ConceptId) -> Result<bool, OntologyError> {
        if a == b {
            return Ok(false);
        }
        let up_a = self.ancestors(a);
        let up_b = self.ancestors(b);
        for &sa in &up_a {
            for &sb in &up_b {
                if self.disjoint.contains(&(sa, sb)) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn evaluate_subsumption(
        &self,
        sub: ConceptId,
        parent: ConceptId,
    ) -> Result<bool, OntologyError> {
        Ok(self.ancestors(sub).contains(&parent))
    }

    fn evaluate_membership(
        &self,
        instance: ConceptId,
        collection: ConceptId,
    ) -> Result<bool, OntologyError> {
        let Some(direct) = self.isa_edges.get(&instance) else {
            return Ok(false);
        };
        for &c in direct {
            if self.evaluate_subsumption(c, collection)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn generalizes_predicate(
        &self,
        relation: ConceptId,
        target: ConceptId,
    ) -> Result<bool, OntologyError> {
        if relation == target {
            return Ok(true);
        }
        Ok(self
            .genl_preds
            .get(&relation)
            .is_some_and(|targets| targets.contains(&target)))
    }

    fn argument_constraints(
        &self,
        relation: ConceptId,
        arg_pos: usize,
    ) -> Result<ArgConstraints, OntologyError> {
        Ok(self
            .constraints
            .get(&(relation, arg_pos))
            .cloned()
            .unwrap_or_default())
    }

    fn is_informationless(&self, relation: ConceptId) -> Result<bool, OntologyError> {
        Ok(self.infoless.contains(&relation))
    }

    fn label(&self, concept: ConceptId) -> Option<String> {
        self.labels.get(&concept).cloned()
    }
}
