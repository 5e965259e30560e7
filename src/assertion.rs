//! Candidate assertions: the weighted facts competing to describe a concept.
//!
//! Extraction heuristics produce [`PartialAssertion`]s, whose arguments may
//! still be ambiguous [`MappableTerm`]s. The expander resolves them into
//! [`ConcreteAssertion`]s, which are what the grid and search operate on.
//! Equality on concrete assertions ignores provenance and weight: two
//! heuristics asserting the same fact assert the same fact.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::concept::{ConceptId, Standing};
use crate::ontology::Vocabulary;

/// Origin of a candidate assertion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    /// Name of the heuristic that produced the assertion.
    pub heuristic: String,
    /// Optional source label (article title, sentence, dataset row).
    pub source: Option<String>,
}

impl Provenance {
    /// Provenance for a named extraction heuristic.
    pub fn new(heuristic: impl Into<String>) -> Self {
        Self {
            heuristic: heuristic.into(),
            source: None,
        }
    }

    /// Attach a source label.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Provenance for assertions synthesized from argument constraints
    /// during the search itself.
    pub fn argument_constraint() -> Self {
        Self::new("argument-constraint")
    }
}

/// An ambiguous sub-term still requiring mapping to an ontology concept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappableTerm {
    /// Surface label to be mapped (e.g. "model", "Boston, Massachusetts").
    pub label: String,
}

impl MappableTerm {
    /// Create a mappable term from a surface label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl std::fmt::Display for MappableTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "?{}", self.label)
    }
}

/// One position in a partial assertion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// A resolved ontology concept.
    Concept(ConceptId),
    /// An ambiguous term awaiting mapping.
    Unresolved(MappableTerm),
    /// The focus concept under disambiguation.
    Focus,
}

impl Term {
    /// Whether this term is already resolved (concept or focus placeholder).
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Term::Unresolved(_))
    }
}

/// A candidate assertion that may still contain unresolved terms.
///
/// The relation itself can be unresolved: some heuristics mine the
/// predicate from text as well as the arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialAssertion {
    /// The relation, possibly still a mappable term.
    pub relation: Term,
    /// Arguments; at most one should be [`Term::Focus`].
    pub args: Vec<Term>,
    /// Extraction weight in (0, 1].
    pub weight: f32,
    /// Where the assertion came from.
    pub provenance: Provenance,
}

impl PartialAssertion {
    /// Create a partial assertion.
    pub fn new(relation: Term, args: Vec<Term>, weight: f32, provenance: Provenance) -> Self {
        Self {
            relation,
            args,
            weight,
            provenance,
        }
    }

    /// Convenience constructor for an already-concrete input assertion.
    pub fn concrete(
        relation: ConceptId,
        args: Vec<Term>,
        weight: f32,
        provenance: Provenance,
    ) -> Self {
        Self::new(Term::Concept(relation), args, weight, provenance)
    }

    /// The first unresolved term, scanning the relation before arguments.
    pub fn first_unresolved(&self) -> Option<&MappableTerm> {
        if let Term::Unresolved(ref t) = self.relation {
            return Some(t);
        }
        self.args.iter().find_map(|a| match a {
            Term::Unresolved(t) => Some(t),
            _ => None,
        })
    }

    /// Whether every position is resolved.
    pub fn is_concrete(&self) -> bool {
        self.first_unresolved().is_none()
    }

    /// Replace every occurrence of an unresolved term with a replacement.
    pub fn substitute(&self, term: &MappableTerm, replacement: &Term) -> Self {
        let swap = |t: &Term| -> Term {
            match t {
                Term::Unresolved(u) if u == term => replacement.clone(),
                other => other.clone(),
            }
        };
        Self {
            relation: swap(&self.relation),
            args: self.args.iter().map(swap).collect(),
            weight: self.weight,
            provenance: self.provenance.clone(),
        }
    }

    /// Resolve into a concrete assertion, substituting the focus concept.
    ///
    /// Returns `None` while any term is unresolved.
    pub fn to_concrete(&self, focus: ConceptId) -> Option<ConcreteAssertion> {
        let relation = match self.relation {
            Term::Concept(id) => id,
            Term::Focus => focus,
            Term::Unresolved(_) => return None,
        };
        let mut args = Vec::with_capacity(self.args.len());
        let mut focus_arg = None;
        for (i, arg) in self.args.iter().enumerate() {
            match arg {
                Term::Concept(id) => args.push(*id),
                Term::Focus => {
                    if focus_arg.is_none() {
                        focus_arg = Some(i);
                    }
                    args.push(focus);
                }
                Term::Unresolved(_) => return None,
            }
        }
        Some(ConcreteAssertion {
            relation,
            args,
            focus_arg,
            provenance: self.provenance.clone(),
        })
    }
}

/// A fully resolved candidate assertion over ontology concepts.
///
/// Weights are not stored here: the grid owns the weight of each cell,
/// since the same assertion can appear at different weights through
/// different expansion paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcreteAssertion {
    /// The relation concept.
    pub relation: ConceptId,
    /// Resolved arguments.
    pub args: Vec<ConceptId>,
    /// Index of the focus concept among the arguments, if present.
    pub focus_arg: Option<usize>,
    /// Where the assertion came from.
    pub provenance: Provenance,
}

impl ConcreteAssertion {
    /// Create a concrete assertion.
    pub fn new(
        relation: ConceptId,
        args: Vec<ConceptId>,
        focus_arg: Option<usize>,
        provenance: Provenance,
    ) -> Self {
        Self {
            relation,
            args,
            focus_arg,
            provenance,
        }
    }

    /// The target of a hierarchical assertion: its second argument.
    pub fn target(&self) -> Option<ConceptId> {
        self.args.get(1).copied()
    }

    /// Rewrite as an explicit parentage assertion for the given standing:
    /// subsumption (genls) for collections, membership (isa) for
    /// individuals. Used when accepting a hierarchical candidate whose
    /// relation was fused or more general.
    pub fn as_parentage(&self, standing: Standing, vocab: &Vocabulary) -> Self {
        let relation = match standing {
            Standing::Collection => vocab.genls,
            Standing::Individual => vocab.isa,
        };
        Self {
            relation,
            args: self.args.clone(),
            focus_arg: self.focus_arg,
            provenance: self.provenance.clone(),
        }
    }
}

// Identity of a concrete assertion is its relation and arguments;
// provenance records where it came from, not what it claims.
impl PartialEq for ConcreteAssertion {
    fn eq(&self, other: &Self) -> bool {
        self.relation == other.relation
            && self.args == other.args
            && self.focus_arg == other.focus_arg
    }
}

impl Eq for ConcreteAssertion {}

impl Hash for ConcreteAssertion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.relation.hash(state);
        self.args.hash(state);
        self.focus_arg.hash(state);
    }
}

impl std::fmt::Display for ConcreteAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}", self.relation)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(raw: u64) -> ConceptId {
        ConceptId::new(raw).unwrap()
    }

    #[test]
    fn first_unresolved_scans_relation_first() {
        let pa = PartialAssertion::new(
            Term::Unresolved(MappableTerm::new("born-in")),
            vec![Term::Focus, Term::Unresolved(MappableTerm::new("Boston"))],
            0.8,
            Provenance::new("test"),
        );
        assert_eq!(pa.first_unresolved().unwrap().label, "born-in");
        assert!(!pa.is_concrete());
    }

    #[test]
    fn substitute_replaces_all_occurrences() {
        let term = MappableTerm::new("actor");
        let pa = PartialAssertion::new(
            Term::Concept(cid(1)),
            vec![
                Term::Focus,
                Term::Unresolved(term.clone()),
                Term::Unresolved(term.clone()),
            ],
            1.0,
            Provenance::new("test"),
        );
        let out = pa.substitute(&term, &Term::Concept(cid(9)));
        assert!(out.is_concrete());
        assert_eq!(out.args[1], Term::Concept(cid(9)));
        assert_eq!(out.args[2], Term::Concept(cid(9)));
    }

    #[test]
    fn to_concrete_substitutes_focus() {
        let pa = PartialAssertion::concrete(
            cid(1),
            vec![Term::Focus, Term::Concept(cid(2))],
            1.0,
            Provenance::new("test"),
        );
        let ca = pa.to_concrete(cid(7)).unwrap();
        assert_eq!(ca.args, vec![cid(7), cid(2)]);
        assert_eq!(ca.focus_arg, Some(0));
        assert_eq!(ca.target(), Some(cid(2)));
    }

    #[test]
    fn to_concrete_fails_on_unresolved() {
        let pa = PartialAssertion::new(
            Term::Concept(cid(1)),
            vec![Term::Focus, Term::Unresolved(MappableTerm::new("place"))],
            1.0,
            Provenance::new("test"),
        );
        assert!(pa.to_concrete(cid(7)).is_none());
    }

    #[test]
    fn equality_ignores_provenance() {
        let a = ConcreteAssertion::new(cid(1), vec![cid(2), cid(3)], Some(0), Provenance::new("x"));
        let b = ConcreteAssertion::new(cid(1), vec![cid(2), cid(3)], Some(0), Provenance::new("y"));
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn equality_respects_args() {
        let a = ConcreteAssertion::new(cid(1), vec![cid(2), cid(3)], Some(0), Provenance::new("x"));
        let b = ConcreteAssertion::new(cid(1), vec![cid(2), cid(4)], Some(0), Provenance::new("x"));
        assert_ne!(a, b);
    }
}
