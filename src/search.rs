//! Best-first search for maximal consistent assertion sets.
//!
//! Cases are seeded from the grid's strongest unused cells and advanced
//! row by row through a priority queue ordered on optimistic potential
//! weight. A case accepts a cell only when it stays consistent with the
//! case's accumulated membership and subsumption truths; acceptance of a
//! parent cell completes the whole descendant subtree. Seeding is lazy:
//! a new seed is drawn only while it could outweigh the best queued case.
//!
//! An ontology failure while evaluating a case discards that case alone;
//! the search carries on with the rest of the queue.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assertion::{ConcreteAssertion, Provenance};
use crate::concept::{ConceptId, Standing};
use crate::engine::DisambigConfig;
use crate::error::OntologyError;
use crate::grid::AssertionGrid;
use crate::ontology::{Ontology, Vocabulary};
use crate::oracle::DisjointnessOracle;

/// One maximal consistent interpretation of the grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    /// Accepted assertions, in acceptance order.
    pub assertions: Vec<ConcreteAssertion>,
    /// Grid weight of each accepted assertion (0 for inferred constraints).
    pub assertion_weights: Vec<f32>,
    /// Case confidence in [0, 1].
    pub weight: f32,
    /// The standing this case interpreted the focus concept under.
    pub standing: Standing,
    /// The assertion whose seed cell opened this case.
    pub seed: Option<ConcreteAssertion>,
}

// ---------------------------------------------------------------------------
// Disjoint case
// ---------------------------------------------------------------------------

/// Lifecycle tag for a queued case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseState {
    /// Freshly seeded, no row processed yet.
    Seeded,
    /// Advancing through rows.
    Advancing,
    /// Every reachable column resolved; emitted when next popped.
    Completed,
}

/// A partially-explored consistent interpretation.
#[derive(Debug, Clone)]
struct DisjointCase {
    /// Insertion ticket; breaks exact ties deterministically.
    seq: u64,
    standing: Standing,
    standing_weight: f32,
    state: CaseState,
    /// Next row the case will evaluate.
    row: usize,
    completed: Vec<bool>,
    completed_count: usize,
    completed_weight: f32,
    isa_truths: BTreeSet<ConceptId>,
    genls_truths: BTreeSet<ConceptId>,
    accepted: Vec<ConcreteAssertion>,
    accepted_weights: Vec<f32>,
    seed: Option<ConcreteAssertion>,
    /// Cached optimistic weight; refreshed before every queue insert.
    potential: f32,
}

/// Shared per-search state the cases mutate as they advance.
struct SearchCtx<'a> {
    grid: &'a AssertionGrid,
    ontology: &'a dyn Ontology,
    oracle: &'a DisjointnessOracle,
    vocab: Vocabulary,
    /// Seed mask, indexed `[column][row - column start]`.
    used: Vec<Vec<bool>>,
}

impl SearchCtx<'_> {
    fn is_used(&self, column: usize, row: usize) -> bool {
        self.used[column][row - self.grid.column_start(column)]
    }

    fn mark_used(&mut self, column: usize, row: usize) {
        self.used[column][row - self.grid.column_start(column)] = true;
    }

    fn mark_all_used(&mut self, column: usize) {
        self.used[column].fill(true);
    }
}

impl DisjointCase {
    /// Seed a case from one grid cell under one standing interpretation.
    ///
    /// Returns `Ok(None)` when the case is invalid from the start: a
    /// non-positive standing weight, a collection reading that already
    /// conflicts with the prior truths, or a seed cell nothing could be
    /// accepted from.
    fn seed(
        ctx: &mut SearchCtx<'_>,
        column: usize,
        row: usize,
        standing: Standing,
        standing_weight: f32,
        seq: u64,
    ) -> Result<Option<Self>, OntologyError> {
        if standing_weight <= 0.0 {
            return Ok(None);
        }
        let mut case = Self {
            seq,
            standing,
            standing_weight,
            state: CaseState::Seeded,
            row: 0,
            completed: vec![false; ctx.grid.column_count()],
            completed_count: 0,
            completed_weight: 0.0,
            isa_truths: ctx.grid.prior_isa().clone(),
            genls_truths: ctx.grid.prior_genls().clone(),
            accepted: Vec::new(),
            accepted_weights: Vec::new(),
            seed: None,
            potential: 0.0,
        };
        if standing == Standing::Collection
            && ctx
                .oracle
                .is_disjoint(ctx.ontology, ctx.vocab.collection, &case.isa_truths)?
        {
            return Ok(None);
        }
        let Some(cell) = ctx.grid.cell(column, row).cloned() else {
            return Ok(None);
        };
        case.check_consistency(ctx, &cell, column, row)?;
        if case.completed_weight == 0.0 {
            return Ok(None);
        }
        case.seed = case.accepted.last().cloned();
        case.refresh_potential(ctx.grid);
        Ok(Some(case))
    }

    /// Optimistic weight: resolved columns plus the best every unresolved
    /// column could still contribute at the current row, normalized and
    /// scaled by the standing weight.
    fn refresh_potential(&mut self, grid: &AssertionGrid) {
        let mut weight = self.completed_weight;
        for column in 0..grid.column_count() {
            if !self.completed[column] {
                weight += grid.weight(column, self.row);
            }
        }
        let sum = grid.weight_sum();
        self.potential = if sum > 0.0 {
            weight / sum * self.standing_weight
        } else {
            0.0
        };
    }

    /// A case is complete once every column is either resolved or out of
    /// cells at the last processed row.
    fn is_completed(&self, grid: &AssertionGrid) -> bool {
        if self.row == 0 {
            return false;
        }
        (0..grid.column_count())
            .all(|column| self.completed[column] || grid.cell(column, self.row - 1).is_none())
    }

    /// Evaluate every unresolved column's cell at the current row, then
    /// advance the row cursor.
    fn process_row(&mut self, ctx: &mut SearchCtx<'_>) -> Result<(), OntologyError> {
        for column in 0..ctx.grid.column_count() {
            if self.completed[column] {
                continue;
            }
            let Some(cell) = ctx.grid.cell(column, self.row).cloned() else {
                continue;
            };
            self.check_consistency(ctx, &cell, column, self.row)?;
        }
        self.row += 1;
        self.state = CaseState::Advancing;
        Ok(())
    }

    /// Accept the assertion if it is consistent with the case's truths.
    ///
    /// Hierarchical assertions fold their target into the matching truth
    /// set and are rewritten to the plain membership or subsumption
    /// relation; everything else must satisfy its relation's argument
    /// constraints. Inconsistent assertions are skipped without failing
    /// the case.
    fn check_consistency(
        &mut self,
        ctx: &mut SearchCtx<'_>,
        assertion: &ConcreteAssertion,
        column: usize,
        row: usize,
    ) -> Result<(), OntologyError> {
        let vocab = ctx.vocab;
        if let Some(target) = assertion.target() {
            let relation = assertion.relation;
            let fused = relation == vocab.isa_genls;
            let genls_rel = fused || ctx.ontology.generalizes_predicate(relation, vocab.genls)?;
            let isa_rel = ctx.ontology.generalizes_predicate(relation, vocab.isa)?;
            if genls_rel || isa_rel {
                // Self-parentage carries no information.
                if target == ctx.grid.focus() {
                    return Ok(());
                }
                if self.standing == Standing::Collection
                    && genls_rel
                    && !ctx
                        .oracle
                        .is_disjoint(ctx.ontology, target, &self.genls_truths)?
                {
                    let parentage = assertion.as_parentage(Standing::Collection, &vocab);
                    self.isa_truths.insert(vocab.first_order_collection);
                    self.genls_truths.insert(target);
                    return self.record(ctx, parentage, column, row);
                }
                if ((self.standing == Standing::Individual && fused) || isa_rel)
                    && !ctx
                        .oracle
                        .is_disjoint(ctx.ontology, target, &self.isa_truths)?
                {
                    let parentage = assertion.as_parentage(Standing::Individual, &vocab);
                    self.isa_truths.insert(target);
                    return self.record(ctx, parentage, column, row);
                }
                return Ok(());
            }
        }
        if self.check_arg_constraints(ctx, assertion)? {
            self.record(ctx, assertion.clone(), column, row)?;
        }
        Ok(())
    }

    /// Fold the relation's argument constraints for the focus position
    /// into the truth sets, synthesizing the implied parentage
    /// assertions. Returns false when any constraint conflicts.
    fn check_arg_constraints(
        &mut self,
        ctx: &mut SearchCtx<'_>,
        assertion: &ConcreteAssertion,
    ) -> Result<bool, OntologyError> {
        let Some(position) = assertion.focus_arg else {
            return Ok(false);
        };
        let constraints = ctx
            .ontology
            .argument_constraints(assertion.relation, position)?;
        for &constraint in &constraints.isa {
            if ctx
                .oracle
                .is_disjoint(ctx.ontology, constraint, &self.isa_truths)?
            {
                return Ok(false);
            }
        }
        for &constraint in &constraints.genls {
            if ctx
                .oracle
                .is_disjoint(ctx.ontology, constraint, &self.genls_truths)?
            {
                return Ok(false);
            }
        }

        let focus = ctx.grid.focus();
        for (relation, constraint_set, truths) in [
            (ctx.vocab.isa, &constraints.isa, &mut self.isa_truths),
            (ctx.vocab.genls, &constraints.genls, &mut self.genls_truths),
        ] {
            for &constraint in constraint_set {
                truths.insert(constraint);
                // The universal collection adds nothing worth asserting.
                if constraint == ctx.vocab.thing {
                    continue;
                }
                let implied = ConcreteAssertion::new(
                    relation,
                    vec![focus, constraint],
                    Some(0),
                    Provenance::argument_constraint(),
                );
                if !self.accepted.contains(&implied) {
                    self.accepted.push(implied);
                    self.accepted_weights.push(0.0);
                }
            }
        }
        Ok(true)
    }

    /// Record an accepted assertion, then jointly accept the next cell
    /// in the column when it carries exactly the same weight.
    fn record(
        &mut self,
        ctx: &mut SearchCtx<'_>,
        assertion: ConcreteAssertion,
        column: usize,
        row: usize,
    ) -> Result<(), OntologyError> {
        self.note_completed(ctx, column, row);
        if !self.accepted.contains(&assertion) {
            self.accepted.push(assertion);
            self.accepted_weights.push(ctx.grid.weight(column, row));
        }

        let next = row + 1;
        if ctx.grid.weight(column, next) == ctx.grid.weight(column, row) {
            if let Some(cell) = ctx.grid.cell(column, next).cloned() {
                self.check_consistency(ctx, &cell, column, next)?;
            }
        }
        Ok(())
    }

    /// Resolve a column after accepting one of its cells.
    ///
    /// The cell stops being a seed for everyone. Descendant columns are
    /// resolved wholesale (their alternatives competed with the accepted
    /// cell) and their seeds retired; ancestor columns are resolved
    /// without contributing weight.
    fn note_completed(&mut self, ctx: &mut SearchCtx<'_>, column: usize, row: usize) {
        ctx.mark_used(column, row);
        if self.completed[column] {
            return;
        }
        self.completed[column] = true;
        self.completed_count += 1;
        self.completed_weight += ctx.grid.weight(column, row);

        for descendant in ctx.grid.descendants_of(column) {
            if !self.completed[descendant] {
                self.completed[descendant] = true;
                self.completed_count += 1;
            }
            ctx.mark_all_used(descendant);
        }

        let mut ancestor = ctx.grid.parent_of(column);
        while let Some(a) = ancestor {
            if !self.completed[a] {
                self.completed[a] = true;
                self.completed_count += 1;
            }
            ancestor = ctx.grid.parent_of(a);
        }
    }

    fn into_result(self) -> CaseResult {
        CaseResult {
            assertions: self.accepted,
            assertion_weights: self.accepted_weights,
            weight: self.potential.min(1.0),
            standing: self.standing,
            seed: self.seed,
        }
    }
}

impl PartialEq for DisjointCase {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for DisjointCase {}

impl Ord for DisjointCase {
    /// Max-heap order: higher potential, then more resolved columns,
    /// then the shallower row, then the earlier ticket.
    fn cmp(&self, other: &Self) -> Ordering {
        self.potential
            .total_cmp(&other.potential)
            .then_with(|| self.completed_count.cmp(&other.completed_count))
            .then_with(|| other.row.cmp(&self.row))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for DisjointCase {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Search driver
// ---------------------------------------------------------------------------

/// Canonical identity of an accepted-assertion set, for result dedup.
type CaseKey = Vec<(u64, Vec<u64>, Option<usize>)>;

fn case_key(assertions: &[ConcreteAssertion]) -> CaseKey {
    let mut key: CaseKey = assertions
        .iter()
        .map(|a| {
            (
                a.relation.get(),
                a.args.iter().map(|c| c.get()).collect(),
                a.focus_arg,
            )
        })
        .collect();
    key.sort();
    key
}

/// One best-first search over a grid.
pub struct CaseSearch<'a> {
    ctx: SearchCtx<'a>,
    heap: BinaryHeap<DisjointCase>,
    config: &'a DisambigConfig,
    seed_cursor: usize,
    next_seq: u64,
}

impl<'a> CaseSearch<'a> {
    /// Prepare a search over a grid, with every seed unused and the
    /// queue empty.
    pub fn new(
        grid: &'a AssertionGrid,
        ontology: &'a dyn Ontology,
        oracle: &'a DisjointnessOracle,
        config: &'a DisambigConfig,
    ) -> Self {
        let vocab = *ontology.vocabulary();
        let used = (0..grid.column_count())
            .map(|c| vec![false; grid.column_cell_count(c)])
            .collect();
        Self {
            ctx: SearchCtx {
                grid,
                ontology,
                oracle,
                vocab,
                used,
            },
            heap: BinaryHeap::new(),
            config,
            seed_cursor: 0,
            next_seq: 0,
        }
    }

    /// Find up to `n` distinct maximal consistent cases, best first.
    ///
    /// Returns fewer than `n` when the grid runs out of viable seeds.
    /// Completed cases whose accepted set duplicates an already-emitted
    /// one are dropped without counting toward `n`.
    pub fn find_top_n(mut self, n: usize) -> Vec<CaseResult> {
        let mut results = Vec::new();
        if n == 0 || self.ctx.grid.is_empty() {
            return results;
        }
        let mut emitted: HashSet<CaseKey> = HashSet::new();

        loop {
            self.replenish();
            let Some(mut case) = self.heap.pop() else {
                break;
            };
            if case.state == CaseState::Completed {
                if emitted.insert(case_key(&case.accepted)) {
                    debug!(
                        standing = %case.standing,
                        weight = case.potential.min(1.0),
                        assertions = case.accepted.len(),
                        "case completed"
                    );
                    results.push(case.into_result());
                    if results.len() == n {
                        break;
                    }
                }
                continue;
            }
            match case.process_row(&mut self.ctx) {
                Ok(()) => {
                    if case.is_completed(self.ctx.grid) {
                        case.state = CaseState::Completed;
                    }
                    case.refresh_potential(self.ctx.grid);
                    self.heap.push(case);
                }
                Err(err) => {
                    debug!(error = %err, "discarding case after ontology failure");
                }
            }
        }
        results
    }

    /// Next unused seed, best first, without consuming it.
    fn peek_seed(&mut self) -> Option<(usize, usize, f32)> {
        let seeds = self.ctx.grid.seed_stack();
        while let Some(&(column, row)) = seeds.get(self.seed_cursor) {
            if !self.ctx.is_used(column, row) {
                return Some((column, row, self.ctx.grid.weight(column, row)));
            }
            self.seed_cursor += 1;
        }
        None
    }

    /// Seed new cases while an unused seed could outweigh the best
    /// queued case. With an empty queue, keeps drawing seeds until one
    /// produces at least one viable case or the stack runs dry.
    fn replenish(&mut self) {
        loop {
            if self.heap.len() >= self.config.max_queue_cases {
                return;
            }
            match self.heap.peek().map(|top| top.potential) {
                Some(top_potential) => {
                    let Some((column, row, weight)) = self.peek_seed() else {
                        return;
                    };
                    if weight > top_potential {
                        self.seed_at(column, row);
                    }
                    return;
                }
                None => {
                    let Some((column, row, _)) = self.peek_seed() else {
                        return;
                    };
                    self.seed_at(column, row);
                    if !self.heap.is_empty() {
                        return;
                    }
                }
            }
        }
    }

    /// Open both standing interpretations of one seed cell.
    fn seed_at(&mut self, column: usize, row: usize) {
        let standing = self.ctx.grid.standing();
        let best = standing.best();
        let branches = if best > 0.0 {
            // Tie-break bias against the collection reading.
            let collection = (standing.normalized(Standing::Collection) / best).min(1.0)
                - self.config.collection_bias;
            let individual = (standing.normalized(Standing::Individual) / best).min(1.0);
            [
                (Standing::Collection, collection),
                (Standing::Individual, individual),
            ]
        } else {
            [
                (Standing::Collection, 0.0),
                (Standing::Individual, 0.0),
            ]
        };
        for (kind, weight) in branches {
            let seq = self.next_seq;
            self.next_seq += 1;
            match DisjointCase::seed(&mut self.ctx, column, row, kind, weight, seq) {
                Ok(Some(case)) => self.heap.push(case),
                Ok(None) => {}
                Err(err) => {
                    debug!(error = %err, standing = %kind, "discarding seed after ontology failure");
                }
            }
        }
        // The seed is spent even when both interpretations were invalid.
        self.ctx.mark_used(column, row);
    }
}
