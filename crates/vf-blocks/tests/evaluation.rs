//! Integration tests: evaluation protocol, loop detection and rewiring.

use std::cell::Cell;
use std::rc::Rc;

use vf_blocks::{BlockError, EvalState, Model};
use vf_core::Vector3;

#[test]
fn direct_self_reference_is_an_algebraic_loop() {
    let mut model = Model::new();
    let seed = model.constant3(Vector3::zero());
    let e = model.expression(seed);
    model.label(e, "feedback").unwrap();

    // e := e
    let previous = model.set_input(e, 0, e).unwrap();
    assert_eq!(previous, seed);

    model.begin_epoch();
    let err = model.value(e).unwrap_err();
    match err {
        BlockError::AlgebraicLoop { block } => {
            assert!(block.contains("feedback"), "unexpected block: {block}");
        }
        other => panic!("expected algebraic loop, got {other:?}"),
    }
}

#[test]
fn transitive_loop_is_detected_on_first_reentry() {
    let mut model = Model::new();
    let one = model.constant3(Vector3::new(1.0, 1.0, 1.0));
    let a = model.expression(one);
    let b = model.add(a, one);
    let c = model.neg(b);

    // a -> c -> b -> a
    model.set_input(a, 0, c).unwrap();

    let depth = Rc::new(Cell::new(0_u32));
    let counter = depth.clone();
    let probe = model.custom1(c, move |v| {
        counter.set(counter.get() + 1);
        v
    });

    model.begin_epoch();
    assert!(matches!(
        model.value(probe),
        Err(BlockError::AlgebraicLoop { .. })
    ));
    // The loop never reached the combining function.
    assert_eq!(depth.get(), 0);
}

#[test]
fn loop_can_be_broken_and_retried_in_same_epoch() {
    let mut model = Model::new();
    let one = model.constant3(Vector3::new(1.0, 0.0, 0.0));
    let a = model.expression(one);
    let b = model.add(a, one);
    model.set_input(a, 0, b).unwrap();

    model.begin_epoch();
    assert!(model.value(b).is_err());

    model.set_input(a, 0, one).unwrap();
    assert_eq!(model.value(b).unwrap(), Vector3::new(2.0, 0.0, 0.0));
}

#[test]
fn diamond_dependencies_are_not_loops() {
    let mut model = Model::new();
    let a = model.constant3(Vector3::new(1.0, 2.0, 3.0));
    let shared = model.expression(a);
    let left = model.add(shared, shared);
    let right = model.neg(shared);
    let top = model.add(left, right);

    model.begin_epoch();
    assert_eq!(model.value(top).unwrap(), Vector3::new(1.0, 2.0, 3.0));
    // Repeated pulls within the epoch agree.
    assert_eq!(model.value(top).unwrap(), Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(model.evaluation_state(shared).unwrap(), EvalState::Evaluated);

    model.begin_epoch();
    assert_eq!(model.evaluation_state(shared).unwrap(), EvalState::Unevaluated);
}

#[test]
fn feedback_through_integrator_is_legal() {
    let mut model = Model::new();
    let zero = model.constant3(Vector3::zero());
    let x = model.integrator3_with(zero, Vector3::new(1.0, 0.0, 0.0));
    // x' = -x
    let rate = model.neg(x);
    model.set_integrator3_input(x, rate).unwrap();

    model.begin_epoch();
    assert_eq!(model.value(rate).unwrap(), Vector3::new(-1.0, 0.0, 0.0));
    assert_eq!(model.integrator_derivatives().unwrap(), vec![-1.0, 0.0, 0.0]);
}

#[test]
fn variable_writes_reach_later_pulls_only() {
    let mut model = Model::new();
    let v = model.variable3(Vector3::zero());
    let doubled = model.add(v, v);

    model.begin_epoch();
    model.set_variable3(v, Vector3::new(1.0, 2.0, 3.0)).unwrap();
    assert_eq!(model.value(v.into()).unwrap(), Vector3::new(1.0, 2.0, 3.0));
    let already_read = model.value(doubled).unwrap();

    model.set_variable3(v, Vector3::new(0.0, 0.0, 1.0)).unwrap();
    assert_eq!(already_read, Vector3::new(2.0, 4.0, 6.0));
    assert_eq!(model.value(doubled).unwrap(), Vector3::new(0.0, 0.0, 2.0));
}

#[test]
fn components_of_adaptor() {
    let mut model = Model::new();
    let (one, two, three) = (model.constant(1.0), model.constant(2.0), model.constant(3.0));
    let v = model.adaptor(one, two, three);
    let x = model.x_part(v);
    let y = model.y_part(v);
    let z = model.z_part(v);

    assert_eq!(model.scalar_value(x).unwrap(), 1.0);
    assert_eq!(model.scalar_value(y).unwrap(), 2.0);
    assert_eq!(model.scalar_value(z).unwrap(), 3.0);
}

#[test]
fn loop_across_scalar_and_vector_domains() {
    let mut model = Model::new();
    let seed = model.constant3(Vector3::new(3.0, 4.0, 0.0));
    let junction = model.expression(seed);
    let len = model.abs(junction);
    let scaled = model.scale(seed, len);
    model.set_input(junction, 0, scaled).unwrap();

    model.begin_epoch();
    let err = model.scalar_value(len).unwrap_err();
    assert!(matches!(err, BlockError::AlgebraicLoop { .. }));
}

#[test]
fn set_input_rejects_missing_slot_and_leaf_blocks() {
    let mut model = Model::new();
    let a = model.constant3(Vector3::zero());
    let sum = model.add(a, a);

    assert!(matches!(
        model.set_input(sum, 2, a),
        Err(BlockError::InvalidArg { .. })
    ));
    assert!(matches!(
        model.set_input(a, 0, sum),
        Err(BlockError::WrongKind { .. })
    ));
}

mod properties {
    use super::*;
    use proptest::prelude::*;
    use vf_core::Tolerances;

    fn vector() -> impl Strategy<Value = Vector3> {
        let c = || -1.0e3_f64..1.0e3_f64;
        (c(), c(), c()).prop_map(|(x, y, z)| Vector3::new(x, y, z))
    }

    proptest! {
        #[test]
        fn block_arithmetic_matches_values(a in vector(), b in vector(), k in 0.1_f64..10.0) {
            let mut model = Model::new();
            let (va, vb) = (model.constant3(a), model.constant3(b));
            let s = model.constant(k);
            let sum = model.add(va, vb);
            let scaled = model.scale(sum, s);
            let back = model.div(scaled, s);
            let dot = model.scalar_product(va, vb);

            prop_assert_eq!(model.value(scaled).unwrap(), (a + b) * k);
            prop_assert!(model.value(back).unwrap().approx_eq(a + b, Tolerances::new(1e-9, 1e-12)));
            prop_assert_eq!(model.scalar_value(dot).unwrap(), a.dot(b));
        }

        #[test]
        fn closing_any_chain_is_a_loop(len in 1_usize..20) {
            let mut model = Model::new();
            let seed = model.constant3(Vector3::new(1.0, 0.0, 0.0));
            let head = model.expression(seed);
            let mut tail = head;
            for _ in 0..len {
                tail = model.neg(tail);
            }
            model.set_input(head, 0, tail).unwrap();

            model.begin_epoch();
            let looped = matches!(model.value(tail), Err(BlockError::AlgebraicLoop { .. }));
            prop_assert!(looped);
            // Every block is reset after the failed pull.
            prop_assert_eq!(model.evaluation_state(head).unwrap(), EvalState::Unevaluated);
        }
    }
}
