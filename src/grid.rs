//! The assertion grid: a two-dimensional view of expanded candidates.
//!
//! Each column is the depth-first flattening of one alternative queue;
//! each cell one concrete candidate with its weight. Columns carry
//! explicit parent/child links from the expansion tree — completion
//! propagation in the search follows these links rather than inferring
//! structure from cell layout. The grid is immutable once built; all
//! search state (used seeds, case progress) lives outside it.
//!
//! Indexing a column out of bounds is a builder defect and panics;
//! rows past a column's content are a normal condition and read as
//! absent cells.

use std::collections::{BTreeSet, HashSet};

use crate::assertion::ConcreteAssertion;
use crate::concept::{ConceptId, WeightedStanding};
use crate::error::ConjointResult;
use crate::expand::AlternativeQueue;
use crate::ontology::{Ontology, Vocabulary};

/// One flattened queue: a contiguous run of cells starting at `start_row`.
#[derive(Debug, Clone)]
struct Column {
    start_row: usize,
    cells: Vec<ConcreteAssertion>,
    weights: Vec<f32>,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl Column {
    fn local(&self, row: usize) -> Option<usize> {
        row.checked_sub(self.start_row)
            .filter(|&i| i < self.cells.len())
    }
}

/// Immutable candidate grid for one disambiguation request.
#[derive(Debug, Clone)]
pub struct AssertionGrid {
    focus: ConceptId,
    standing: WeightedStanding,
    columns: Vec<Column>,
    /// Cell coordinates sorted by weight desc, row asc, column asc.
    seed_stack: Vec<(usize, usize)>,
    /// Sum of root-column top-cell weights; normalizes case weights.
    weight_sum: f32,
    /// Membership truths seeded from the concept's existing assertions.
    prior_isa: BTreeSet<ConceptId>,
    /// Subsumption truths seeded from the concept's existing assertions.
    prior_genls: BTreeSet<ConceptId>,
}

impl AssertionGrid {
    /// Flatten expanded queues into a grid.
    ///
    /// `existing` carries the concept's already-accepted assertions;
    /// their membership/subsumption targets become prior truths every
    /// case starts from.
    pub(crate) fn build(
        queues: Vec<AlternativeQueue>,
        focus: ConceptId,
        standing: WeightedStanding,
        existing: &[ConcreteAssertion],
        vocab: &Vocabulary,
    ) -> Self {
        let mut columns: Vec<Column> = Vec::new();
        let mut seed_stack = Vec::new();
        let mut weight_sum = 0.0f32;

        // Iterative depth-first flatten; each work item is one queue
        // level with its inherited position and weight fraction.
        struct Work {
            queue: AlternativeQueue,
            parent: Option<usize>,
            start_row: usize,
            fraction: f32,
        }
        let mut stack: Vec<Work> = queues
            .into_iter()
            .rev()
            .map(|queue| Work {
                queue,
                parent: None,
                start_row: 0,
                fraction: 1.0,
            })
            .collect();

        while let Some(work) = stack.pop() {
            let entry_count = work.queue.len();
            let sub_count = work.queue.subqueues().len();
            let (mut entries, subqueues) = work.queue.into_parts();
            // Columns rank their alternatives best first; mapper emission
            // order carries no meaning. Stable, so exact ties keep it.
            entries.sort_by(|a, b| b.1.total_cmp(&a.1));

            let (parent_for_subs, sub_start) = if entries.is_empty() {
                // Cleanup should have removed these; tolerate by passing
                // the position straight through to the subqueues.
                (work.parent, work.start_row)
            } else {
                let index = columns.len();
                let mut cells = Vec::with_capacity(entry_count);
                let mut weights = Vec::with_capacity(entry_count);
                for (i, (assertion, weight)) in entries.into_iter().enumerate() {
                    cells.push(assertion);
                    weights.push(weight * work.fraction);
                    seed_stack.push((index, work.start_row + i));
                }
                if work.parent.is_none() {
                    weight_sum += weights[0];
                }
                if let Some(p) = work.parent {
                    columns[p].children.push(index);
                }
                columns.push(Column {
                    start_row: work.start_row,
                    cells,
                    weights,
                    parent: work.parent,
                    children: Vec::new(),
                });
                (Some(index), work.start_row + entry_count)
            };

            if sub_count > 0 {
                let sub_fraction = work.fraction / sub_count as f32;
                for sub in subqueues.into_iter().rev() {
                    stack.push(Work {
                        queue: sub,
                        parent: parent_for_subs,
                        start_row: sub_start,
                        fraction: sub_fraction,
                    });
                }
            }
        }

        // Sort once; the search never reorders seeds, it only masks them.
        let weight_of =
            |&(c, r): &(usize, usize)| columns[c].weights[r - columns[c].start_row];
        seed_stack.sort_by(|a, b| {
            weight_of(b)
                .total_cmp(&weight_of(a))
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut prior_isa = BTreeSet::new();
        let mut prior_genls = BTreeSet::new();
        for assertion in existing {
            let Some(target) = assertion.target() else {
                continue;
            };
            if assertion.relation == vocab.isa {
                prior_isa.insert(target);
            } else if assertion.relation == vocab.genls {
                prior_genls.insert(target);
            }
        }

        Self {
            focus,
            standing,
            columns,
            seed_stack,
            weight_sum,
            prior_isa,
            prior_genls,
        }
    }

    /// The concept this grid disambiguates.
    pub fn focus(&self) -> ConceptId {
        self.focus
    }

    /// The standing prior the grid was built with.
    pub fn standing(&self) -> &WeightedStanding {
        &self.standing
    }

    /// Whether the grid has no columns (nothing survived expansion).
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// The cell at a coordinate, or `None` past the column's content.
    ///
    /// Panics when `column` is out of bounds: the search only produces
    /// column indices the builder created, so anything else is a defect.
    pub fn cell(&self, column: usize, row: usize) -> Option<&ConcreteAssertion> {
        assert!(
            column < self.columns.len(),
            "column {column} out of bounds ({} columns)",
            self.columns.len()
        );
        let col = &self.columns[column];
        col.local(row).map(|i| &col.cells[i])
    }

    /// The weight at a coordinate; 0 past the column's content.
    pub fn weight(&self, column: usize, row: usize) -> f32 {
        assert!(
            column < self.columns.len(),
            "column {column} out of bounds ({} columns)",
            self.columns.len()
        );
        let col = &self.columns[column];
        col.local(row).map_or(0.0, |i| col.weights[i])
    }

    /// Normalization constant: sum of root-column top-cell weights.
    pub fn weight_sum(&self) -> f32 {
        self.weight_sum
    }

    /// Seed coordinates, best first.
    pub(crate) fn seed_stack(&self) -> &[(usize, usize)] {
        &self.seed_stack
    }

    pub(crate) fn column_start(&self, column: usize) -> usize {
        self.columns[column].start_row
    }

    pub(crate) fn column_cell_count(&self, column: usize) -> usize {
        self.columns[column].cells.len()
    }

    pub(crate) fn parent_of(&self, column: usize) -> Option<usize> {
        self.columns[column].parent
    }

    /// Transitive children of a column, via the declared expansion links.
    pub(crate) fn descendants_of(&self, column: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.columns[column].children.clone();
        while let Some(c) = stack.pop() {
            out.push(c);
            stack.extend(self.columns[c].children.iter().copied());
        }
        out
    }

    pub(crate) fn prior_isa(&self) -> &BTreeSet<ConceptId> {
        &self.prior_isa
    }

    pub(crate) fn prior_genls(&self) -> &BTreeSet<ConceptId> {
        &self.prior_genls
    }

    /// Every concrete assertion in the grid, for diagnostics.
    ///
    /// Assertions under the fused membership+subsumption relation are
    /// expanded into their two constituent facts.
    pub fn all_assertions(&self, vocab: &Vocabulary) -> HashSet<ConcreteAssertion> {
        let mut out = HashSet::new();
        for col in &self.columns {
            for cell in &col.cells {
                if cell.relation == vocab.isa_genls {
                    for rel in [vocab.isa, vocab.genls] {
                        out.insert(ConcreteAssertion::new(
                            rel,
                            cell.args.clone(),
                            cell.focus_arg,
                            cell.provenance.clone(),
                        ));
                    }
                } else {
                    out.insert(cell.clone());
                }
            }
        }
        out
    }

    /// Assertions whose relation holds no discriminating content.
    ///
    /// Walks each root column from the top, keeping informationless
    /// cells while their weight has not dropped below the best one
    /// found, so callers see the strongest representative per queue.
    pub fn informationless_assertions(
        &self,
        ontology: &dyn Ontology,
    ) -> ConjointResult<HashSet<ConcreteAssertion>> {
        let vocab = ontology.vocabulary();
        let isa_genls = vocab.isa_genls;
        let mut out = HashSet::new();
        for col in &self.columns {
            if col.parent.is_some() {
                continue;
            }
            let mut best = -1.0f32;
            for (cell, &weight) in col.cells.iter().zip(&col.weights) {
                if weight < best {
                    break;
                }
                if cell.relation != isa_genls && ontology.is_informationless(cell.relation)? {
                    out.insert(cell.clone());
                    best = weight;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::Provenance;
    use crate::ontology::MemoryOntology;

    fn assertion(relation: ConceptId, focus: ConceptId, target: ConceptId) -> ConcreteAssertion {
        ConcreteAssertion::new(
            relation,
            vec![focus, target],
            Some(0),
            Provenance::new("test"),
        )
    }

    fn queue_of(entries: Vec<(ConcreteAssertion, f32)>) -> AlternativeQueue {
        let mut q = AlternativeQueue::new();
        for (a, w) in entries {
            q.push(a, w);
        }
        q
    }

    #[test]
    fn empty_input_builds_empty_grid() {
        let mut onto = MemoryOntology::new();
        let focus = onto.concept("Focus");
        let vocab = *onto.vocabulary();
        let grid = AssertionGrid::build(
            Vec::new(),
            focus,
            WeightedStanding::uniform(),
            &[],
            &vocab,
        );
        assert!(grid.is_empty());
        assert_eq!(grid.column_count(), 0);
        assert_eq!(grid.weight_sum(), 0.0);
    }

    #[test]
    fn nested_queue_flattens_below_parent_with_links() {
        let mut onto = MemoryOntology::new();
        let focus = onto.concept("Focus");
        let a = onto.concept("A");
        let b = onto.concept("B");
        let c = onto.concept("C");
        let vocab = *onto.vocabulary();
        let isa = vocab.isa;

        let mut root = queue_of(vec![
            (assertion(isa, focus, a), 0.9),
            (assertion(isa, focus, b), 0.5),
        ]);
        root.add_subqueue(queue_of(vec![(assertion(isa, focus, c), 0.8)]));

        let grid =
            AssertionGrid::build(vec![root], focus, WeightedStanding::uniform(), &[], &vocab);
        assert_eq!(grid.column_count(), 2);
        // Parent occupies rows 0..2, the child starts beneath it.
        assert_eq!(grid.column_start(0), 0);
        assert_eq!(grid.column_cell_count(0), 2);
        assert_eq!(grid.column_start(1), 2);
        assert_eq!(grid.parent_of(1), Some(0));
        assert_eq!(grid.descendants_of(0), vec![1]);
        assert!(grid.cell(0, 0).is_some());
        assert!(grid.cell(0, 2).is_none());
        assert!(grid.cell(1, 0).is_none());
        assert_eq!(grid.cell(1, 2).unwrap().target(), Some(c));
        // A single sub-queue inherits the whole fraction.
        assert!((grid.weight(1, 2) - 0.8).abs() < 1e-6);
        // Only the root column's top cell feeds the weight sum.
        assert!((grid.weight_sum() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn sibling_subqueues_split_the_fraction() {
        let mut onto = MemoryOntology::new();
        let focus = onto.concept("Focus");
        let a = onto.concept("A");
        let b = onto.concept("B");
        let c = onto.concept("C");
        let vocab = *onto.vocabulary();
        let isa = vocab.isa;

        let mut root = queue_of(vec![(assertion(isa, focus, a), 1.0)]);
        root.add_subqueue(queue_of(vec![(assertion(isa, focus, b), 0.6)]));
        root.add_subqueue(queue_of(vec![(assertion(isa, focus, c), 0.4)]));

        let grid =
            AssertionGrid::build(vec![root], focus, WeightedStanding::uniform(), &[], &vocab);
        assert_eq!(grid.column_count(), 3);
        assert!((grid.weight(1, 1) - 0.3).abs() < 1e-6);
        assert!((grid.weight(2, 1) - 0.2).abs() < 1e-6);
        assert_eq!(grid.descendants_of(0), vec![2, 1]);
    }

    #[test]
    fn seed_stack_orders_by_weight_then_row_then_column() {
        let mut onto = MemoryOntology::new();
        let focus = onto.concept("Focus");
        let a = onto.concept("A");
        let b = onto.concept("B");
        let c = onto.concept("C");
        let vocab = *onto.vocabulary();
        let isa = vocab.isa;

        let d = onto.concept("D");

        let q1 = queue_of(vec![
            (assertion(isa, focus, a), 0.5),
            (assertion(isa, focus, b), 0.9),
        ]);
        let q2 = queue_of(vec![(assertion(isa, focus, c), 0.5)]);
        let q3 = queue_of(vec![(assertion(isa, focus, d), 0.5)]);

        let grid = AssertionGrid::build(
            vec![q1, q2, q3],
            focus,
            WeightedStanding::uniform(),
            &[],
            &vocab,
        );
        // 0.9 first; among the 0.5 ties, lower row wins, then lower column.
        assert_eq!(grid.seed_stack(), &[(0, 0), (1, 0), (2, 0), (0, 1)]);
        assert!((grid.weight_sum() - 1.9).abs() < 1e-6);
    }

    #[test]
    fn entries_are_ranked_best_first_regardless_of_input_order() {
        let mut onto = MemoryOntology::new();
        let focus = onto.concept("Focus");
        let weak = onto.concept("Weak");
        let strong = onto.concept("Strong");
        let vocab = *onto.vocabulary();
        let isa = vocab.isa;

        // Weakest alternative emitted first.
        let q = queue_of(vec![
            (assertion(isa, focus, weak), 0.5),
            (assertion(isa, focus, strong), 0.9),
        ]);
        let grid =
            AssertionGrid::build(vec![q], focus, WeightedStanding::uniform(), &[], &vocab);
        assert_eq!(grid.cell(0, 0).unwrap().target(), Some(strong));
        assert_eq!(grid.cell(0, 1).unwrap().target(), Some(weak));
        assert!((grid.weight(0, 0) - 0.9).abs() < 1e-6);
        // The top cell, not the first-emitted one, feeds the weight sum.
        assert!((grid.weight_sum() - 0.9).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn column_index_out_of_bounds_is_fatal() {
        let mut onto = MemoryOntology::new();
        let focus = onto.concept("Focus");
        let vocab = *onto.vocabulary();
        let grid = AssertionGrid::build(
            Vec::new(),
            focus,
            WeightedStanding::uniform(),
            &[],
            &vocab,
        );
        let _ = grid.cell(0, 0);
    }

    #[test]
    fn existing_assertions_become_prior_truths() {
        let mut onto = MemoryOntology::new();
        let focus = onto.concept("Focus");
        let actor = onto.concept("Actor");
        let person = onto.concept("Person");
        let vocab = *onto.vocabulary();

        let existing = vec![
            assertion(vocab.isa, focus, actor),
            assertion(vocab.genls, focus, person),
        ];
        let grid = AssertionGrid::build(
            Vec::new(),
            focus,
            WeightedStanding::uniform(),
            &existing,
            &vocab,
        );
        assert!(grid.prior_isa().contains(&actor));
        assert!(grid.prior_genls().contains(&person));
    }

    #[test]
    fn all_assertions_expands_the_fused_relation() {
        let mut onto = MemoryOntology::new();
        let focus = onto.concept("Focus");
        let actor = onto.concept("Actor");
        let city = onto.concept("City");
        let vocab = *onto.vocabulary();
        let born_in = onto.concept("born-in");

        let q1 = queue_of(vec![(assertion(vocab.isa_genls, focus, actor), 1.0)]);
        let q2 = queue_of(vec![(assertion(born_in, focus, city), 0.5)]);
        let grid =
            AssertionGrid::build(vec![q1, q2], focus, WeightedStanding::uniform(), &[], &vocab);

        let all = grid.all_assertions(&vocab);
        assert_eq!(all.len(), 3);
        assert!(all.contains(&assertion(vocab.isa, focus, actor)));
        assert!(all.contains(&assertion(vocab.genls, focus, actor)));
        assert!(all.contains(&assertion(born_in, focus, city)));
    }

    #[test]
    fn informationless_walk_keeps_strongest_run() {
        let mut onto = MemoryOntology::new();
        let focus = onto.concept("Focus");
        let a = onto.concept("A");
        let b = onto.concept("B");
        let c = onto.concept("C");
        let noise = onto.concept("related-to");
        let isa = onto.vocabulary().isa;
        onto.declare_informationless(noise);
        let vocab = *onto.vocabulary();

        let q = queue_of(vec![
            (assertion(isa, focus, a), 0.9),
            (assertion(noise, focus, b), 0.7),
            // Same weight as the first hit: still collected.
            (assertion(noise, focus, c), 0.7),
            // Below the best informationless weight: walk stops.
            (assertion(noise, focus, a), 0.3),
        ]);
        let grid =
            AssertionGrid::build(vec![q], focus, WeightedStanding::uniform(), &[], &vocab);
        let infoless = grid.informationless_assertions(&onto).unwrap();
        assert_eq!(infoless.len(), 2);
        assert!(infoless.contains(&assertion(noise, focus, b)));
        assert!(infoless.contains(&assertion(noise, focus, c)));
    }
}
