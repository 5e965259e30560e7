//! Benchmarks for grid building and the case search.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use conjoint::assertion::{PartialAssertion, Provenance, Term};
use conjoint::concept::{ConceptId, WeightedStanding};
use conjoint::engine::{DisambigConfig, Disambiguator};
use conjoint::expand::StaticMapper;
use conjoint::ontology::MemoryOntology;

/// Candidate memberships over `groups` mutually disjoint target groups
/// of `per_group` compatible concepts each.
fn grouped_fixture(
    groups: usize,
    per_group: usize,
) -> (Disambiguator, ConceptId, Vec<PartialAssertion>) {
    let mut onto = MemoryOntology::new();
    let focus = onto.concept("focus");
    let isa = onto.vocabulary().isa;

    let mut roots = Vec::new();
    let mut candidates = Vec::new();
    for g in 0..groups {
        let root = onto.concept(format!("group-{g}"));
        for other in &roots {
            onto.declare_disjoint(root, *other);
        }
        roots.push(root);
        for m in 0..per_group {
            let member = onto.concept(format!("group-{g}-member-{m}"));
            onto.declare_subclass(member, root);
            let weight = 0.95 - 0.05 * (g * per_group + m) as f32 / (groups * per_group) as f32;
            candidates.push(PartialAssertion::concrete(
                isa,
                vec![Term::Focus, Term::Concept(member)],
                weight,
                Provenance::new("bench"),
            ));
        }
    }

    let engine = Disambiguator::new(
        Arc::new(onto),
        Arc::new(StaticMapper::new()),
        DisambigConfig::default(),
    )
    .unwrap();
    (engine, focus, candidates)
}

fn bench_build_grid(c: &mut Criterion) {
    let (engine, focus, candidates) = grouped_fixture(4, 16);
    c.bench_function("build_grid_64", |bench| {
        bench.iter(|| {
            black_box(
                engine
                    .build_grid(focus, &candidates, WeightedStanding::uniform())
                    .unwrap(),
            )
        })
    });
}

fn bench_find_top_1(c: &mut Criterion) {
    let (engine, focus, candidates) = grouped_fixture(4, 16);
    let grid = engine
        .build_grid(focus, &candidates, WeightedStanding::uniform())
        .unwrap();
    c.bench_function("find_top_1_64", |bench| {
        bench.iter(|| black_box(engine.find_top_n(&grid, 1)))
    });
}

fn bench_find_top_4(c: &mut Criterion) {
    let (engine, focus, candidates) = grouped_fixture(4, 16);
    let grid = engine
        .build_grid(focus, &candidates, WeightedStanding::uniform())
        .unwrap();
    c.bench_function("find_top_4_64", |bench| {
        bench.iter(|| black_box(engine.find_top_n(&grid, 4)))
    });
}

criterion_group!(benches, bench_build_grid, bench_find_top_1, bench_find_top_4);
criterion_main!(benches);
