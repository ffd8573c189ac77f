use hlsfuzz_backend::HlsCppBackend;
use hlsfuzz_gen::{
    BuilderConfig, DifferentialInjector, OpDistribution, RandomGraphBuilder,
    RandomPragmaPolicy,
};
use hlsfuzz_ir::{ArrayRole, EdgeRole, Node, OpKind, ProgramGraph};
use proptest::prelude::*;

fn build(seed: u64) -> ProgramGraph {
    RandomGraphBuilder::new(BuilderConfig::default(), seed)
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn same_seed_same_graph() {
    for seed in [0, 1, 42, 1234567] {
        let a = build(seed);
        let b = build(seed);
        assert_eq!(a.node_count(), b.node_count());
        assert_eq!(a.edge_count(), b.edge_count());
        assert_eq!(a.op_kind_sequence(), b.op_kind_sequence());
        assert_eq!(a.stats(), b.stats());
    }
}

#[test]
fn seeds_produce_different_graphs() {
    let sequences = (0..8)
        .map(|s| build(s).op_kind_sequence())
        .collect::<Vec<_>>();
    assert!(sequences.windows(2).any(|w| w[0] != w[1]));
}

#[test]
fn graphs_lower_to_cpp() {
    let backend = HlsCppBackend::default();
    let src = backend.render(&build(42)).unwrap();
    assert!(
        src.starts_with("#include \"ap_int.h\"\n#include \"ap_fixed.h\"\n")
    );
    assert!(src.contains("void top("));
    assert!(src.trim_end().ends_with('}'));
}

#[test]
fn op_presets_shape_the_graph() {
    let config = BuilderConfig {
        actions: 400,
        ops: OpDistribution::Arithmetic,
        ..BuilderConfig::default()
    };
    let g = RandomGraphBuilder::new(config, 3).unwrap().build().unwrap();
    let kinds = g.op_kind_sequence();
    let arithmetic = kinds
        .iter()
        .filter(|k| matches!(k, OpKind::Add | OpKind::Sub | OpKind::Mul))
        .count();
    let relational = kinds
        .iter()
        .filter(|k| {
            matches!(
                k,
                OpKind::Eq
                    | OpKind::Neq
                    | OpKind::Lt
                    | OpKind::Gt
                    | OpKind::Le
                    | OpKind::Ge
            )
        })
        .count();
    assert!(arithmetic > relational * 5);
}

#[test]
fn injected_copies_match_the_source() {
    let g = build(9);
    let injector = DifferentialInjector::new(RandomPragmaPolicy::default());
    let (a, b) = injector.inject(&g, 9).unwrap();
    let backend = HlsCppBackend::default();
    for copy in [&a, &b] {
        assert_eq!(copy.graph.node_count(), g.node_count());
        assert_eq!(copy.graph.edge_count(), g.edge_count());
        assert_eq!(copy.graph.op_kind_sequence(), g.op_kind_sequence());
        assert!((1..=10).contains(&copy.clock_period));
        copy.graph.check_invariants().unwrap();
        backend.render(&copy.graph).unwrap();
    }
}

fn check_graph(g: &ProgramGraph) -> Result<(), TestCaseError> {
    prop_assert!(g.check_invariants().is_ok());
    for br in g.branches() {
        let (taken, not_taken) = g.branch_arms(br).unwrap();
        prop_assert_eq!(taken.len() + not_taken.len(), g.successors(br).len());
        prop_assert!(taken.iter().all(|n| !not_taken.contains(n)));
    }
    for arr in g.arrays() {
        for w in g.predecessors(arr) {
            prop_assert_eq!(g.op(w).unwrap().kind, OpKind::Write);
        }
        for v in g.successors(arr) {
            prop_assert_eq!(g.op(v).unwrap().kind, OpKind::Visit);
        }
    }
    for r in g.node_refs() {
        prop_assert!(g.structural_parents(r).len() <= 1);
    }
    for op in g.ops() {
        if g.op(op).unwrap().kind == OpKind::Visit {
            prop_assert!(
                g.single_source(op, EdgeRole::Array(ArrayRole::Address))
                    .is_ok()
            );
        }
    }
    for l in g.loops() {
        prop_assert!(g.loop_node(l).unwrap().check_pragma_status().is_ok());
    }
    for r in g.node_refs() {
        for (src, role) in g.incoming(r) {
            if !role.is_structural() && g.node(src).unwrap().produces_value() {
                prop_assert!(g.in_scope(src, r).unwrap());
            }
        }
    }
    Ok(())
}

/// Every value read by a statement is assigned on an earlier line.
fn check_statement_order(
    g: &ProgramGraph,
    src: &str,
) -> Result<(), TestCaseError> {
    let lines = src.lines().map(str::trim).collect::<Vec<_>>();
    let assigned = |name: &str| {
        let prefix = format!("{name} = ");
        lines.iter().position(|l| l.starts_with(&prefix))
    };
    for dst in g.node_refs() {
        for (src_ref, role) in g.incoming(dst) {
            let reads = matches!(
                role,
                EdgeRole::Operand(_)
                    | EdgeRole::Condition
                    | EdgeRole::LoopBound(_)
                    | EdgeRole::Array(ArrayRole::WriteValue)
            );
            // Inputs are assigned by the caller.
            if !reads || g.predecessors(src_ref).is_empty() {
                continue;
            }
            let producer = g.node(src_ref).unwrap().name().to_string();
            let consumer = match g.node(dst).unwrap() {
                Node::Op(op) if op.kind == OpKind::Write => {
                    let arr = g.single_target(dst).unwrap();
                    let arr = g.node(arr).unwrap().name().to_string();
                    let (prefix, suffix) =
                        (format!("{arr}["), format!(" = {producer};"));
                    lines.iter().position(|l| {
                        l.starts_with(&prefix) && l.ends_with(&suffix)
                    })
                }
                Node::Op(op) => assigned(&op.name.to_string()),
                Node::Loop(l) => {
                    let header = format!("for (int {} ", l.loop_var());
                    lines.iter().position(|line| line.starts_with(&header))
                }
                Node::Branch(_) => {
                    let header = format!("if ({producer}) {{");
                    lines.iter().position(|line| *line == header)
                }
                _ => None,
            };
            let (Some(p), Some(c)) = (assigned(&producer), consumer) else {
                return Err(TestCaseError::fail(format!(
                    "missing statement for `{producer}` or its reader"
                )));
            };
            prop_assert!(
                p < c,
                "`{}` is read on line {} before it is assigned on line {}",
                producer,
                c,
                p
            );
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_graphs_keep_invariants(seed: u64) {
        let g = build(seed);
        check_graph(&g)?;
        let src = HlsCppBackend::default().render(&g);
        prop_assert!(src.is_ok());
        check_statement_order(&g, &src.unwrap())?;
    }

    #[test]
    fn injected_pragmas_are_consistent(seed: u64, actions in 0usize..200) {
        let config = BuilderConfig { actions, ..BuilderConfig::default() };
        let g = RandomGraphBuilder::new(config, seed).unwrap().build().unwrap();
        let injector = DifferentialInjector::new(RandomPragmaPolicy::default());
        let (a, b) = injector.inject(&g, seed).unwrap();
        check_graph(&a.graph)?;
        check_graph(&b.graph)?;
        prop_assert_eq!(a.graph.op_kind_sequence(), b.graph.op_kind_sequence());
    }
}
