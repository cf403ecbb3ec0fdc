//! Exactly-once release of native memory and plan handles.

mod common;

use common::{counting_library, CountingEngine};
use fftwrap::{ComplexBuffer, Direction, Dispose, Options, Plan, RealBuffer};
use std::sync::Arc;
use std::thread;

#[test]
fn shared_buffers_released_once_each() {
    let (engine, library) = counting_library::<f64>();
    {
        let a = Arc::new(ComplexBuffer::new(&library, 64).unwrap());
        let b = Arc::new(ComplexBuffer::new(&library, 64).unwrap());
        let mut forward =
            Plan::c2c_1d(64, &a, &b, Direction::Forward, Options::ESTIMATE).unwrap();
        let mut backward =
            Plan::c2c_1d(64, &b, &a, Direction::Backward, Options::ESTIMATE).unwrap();
        forward.execute();
        backward.execute();

        forward.dispose();
        backward.dispose();
        assert!(!a.is_disposed());
        assert!(!b.is_disposed());
        a.dispose();
        b.dispose();
        assert_eq!(CountingEngine::<f64>::count(&engine.frees), 2);
    }
    engine.assert_balanced();
    assert_eq!(CountingEngine::<f64>::count(&engine.allocations), 2);
    assert_eq!(CountingEngine::<f64>::count(&engine.executions), 2);
}

#[test]
fn repeated_dispose_is_a_no_op() {
    let (engine, library) = counting_library::<f32>();
    let buffer = RealBuffer::new(&library, 16).unwrap();
    for _ in 0..5 {
        buffer.dispose();
    }
    assert!(buffer.is_disposed());

    let a = Arc::new(ComplexBuffer::new(&library, 16).unwrap());
    let plan = Plan::c2c_1d(16, &a, &a, Direction::Forward, Options::ESTIMATE).unwrap();
    for _ in 0..5 {
        plan.dispose();
    }
    assert!(plan.is_disposed());
    drop(plan);
    drop(a);
    drop(buffer);
    engine.assert_balanced();
}

#[test]
fn owning_plan_cascades_on_dispose() {
    let (engine, library) = counting_library::<f64>();
    let input = Arc::new(RealBuffer::new(&library, 32).unwrap());
    let output = Arc::new(ComplexBuffer::new(&library, 17).unwrap());
    let plan = Plan::r2c_1d(32, &input, &output, Options::ESTIMATE)
        .unwrap()
        .with_buffer_ownership(true);
    assert!(plan.owns_buffers());

    plan.dispose();
    assert!(input.is_disposed());
    assert!(output.is_disposed());
    assert_eq!(engine.live_allocations(), 0);

    // A second dispose finds nothing left to release.
    plan.dispose();
    drop(plan);
    drop(input);
    drop(output);
    engine.assert_balanced();
}

#[test]
fn non_owning_plan_leaves_buffers_usable() {
    let (engine, library) = counting_library::<f64>();
    let input = Arc::new(RealBuffer::from_slice(&library, &[1.0, 2.0, 3.0, 4.0]).unwrap());
    let output = Arc::new(ComplexBuffer::new(&library, 3).unwrap());
    let plan = Plan::r2c_1d(4, &input, &output, Options::ESTIMATE).unwrap();
    plan.dispose();

    assert!(!input.is_disposed());
    input.set(&[4.0, 3.0, 2.0, 1.0]).unwrap();
    assert_eq!(input.to_vec(), vec![4.0, 3.0, 2.0, 1.0]);
    assert_eq!(engine.live_allocations(), 2);
    assert_eq!(engine.live_plans(), 0);
}

#[test]
fn dropping_an_owning_plan_does_not_cascade() {
    let (engine, library) = counting_library::<f64>();
    let buffer = Arc::new(ComplexBuffer::new(&library, 8).unwrap());
    let plan = Plan::c2c_1d(8, &buffer, &buffer, Direction::Forward, Options::ESTIMATE)
        .unwrap()
        .with_buffer_ownership(true);
    drop(plan);

    assert_eq!(engine.live_plans(), 0);
    assert!(!buffer.is_disposed());
    assert_eq!(engine.live_allocations(), 1);
    drop(buffer);
    engine.assert_balanced();
}

#[test]
fn drop_is_the_safety_net() {
    let (engine, library) = counting_library::<f64>();
    {
        let a = Arc::new(ComplexBuffer::new(&library, 8).unwrap());
        let b = Arc::new(ComplexBuffer::new(&library, 8).unwrap());
        let mut plan = Plan::c2c_1d(8, &a, &b, Direction::Forward, Options::ESTIMATE).unwrap();
        plan.execute();
        // The plan keeps both buffers alive after the caller's handles go.
        drop(a);
        drop(b);
        assert_eq!(engine.live_allocations(), 2);
        plan.execute();
    }
    engine.assert_balanced();
}

#[test]
fn concurrent_dispose_releases_once() {
    let (engine, library) = counting_library::<f64>();
    for _ in 0..20 {
        let buffer = Arc::new(RealBuffer::new(&library, 128).unwrap());
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || buffer.dispose())
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert!(buffer.is_disposed());
    }
    engine.assert_balanced();
}

#[test]
#[should_panic(expected = "after dispose")]
fn execute_after_cascade_from_other_plan_panics() {
    let (_engine, library) = counting_library::<f64>();
    let a = Arc::new(ComplexBuffer::new(&library, 8).unwrap());
    let b = Arc::new(ComplexBuffer::new(&library, 8).unwrap());
    let owner = Plan::c2c_1d(8, &a, &b, Direction::Forward, Options::ESTIMATE)
        .unwrap()
        .with_buffer_ownership(true);
    let mut other = Plan::c2c_1d(8, &b, &a, Direction::Backward, Options::ESTIMATE).unwrap();
    owner.dispose();
    other.execute();
}

#[test]
#[should_panic(expected = "after dispose")]
fn reading_a_disposed_buffer_panics() {
    let (_engine, library) = counting_library::<f64>();
    let buffer = ComplexBuffer::new(&library, 4).unwrap();
    buffer.dispose();
    let _ = buffer.to_complex_vec();
}
