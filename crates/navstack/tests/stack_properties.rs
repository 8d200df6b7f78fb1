//! Property tests for navigation stack sequence semantics
//!
//! Random sequences of mutations are checked against a plain `Vec` model:
//! - the stack never holds two records with the same identity
//! - navigating to an attached record changes nothing
//! - `pop_to` removes the target and everything above it
//! - a record is attached exactly while it is in the sequence

use std::sync::Arc;
use std::time::Duration;

use navstack::{Destination, FrameScheduler, NavigationStack, NotificationBus, StackId};
use proptest::prelude::*;

const POOL: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    Navigate(usize),
    PopTo(usize),
    PopAll,
    Detach(usize),
    Frame,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..POOL).prop_map(Op::Navigate),
        2 => (0..POOL).prop_map(Op::PopTo),
        1 => Just(Op::PopAll),
        1 => (0..POOL).prop_map(Op::Detach),
        1 => Just(Op::Frame),
    ]
}

fn pool() -> Vec<Destination<usize>> {
    (0..POOL)
        .map(|i| Destination::with_id(format!("screen-{i}"), move || i))
        .collect()
}

fn apply_to_model(model: &mut Vec<usize>, op: &Op) {
    match *op {
        Op::Navigate(k) => {
            if !model.contains(&k) {
                model.push(k);
            }
        }
        Op::PopTo(k) => {
            if let Some(pos) = model.iter().position(|&m| m == k) {
                model.truncate(pos);
            }
        }
        Op::PopAll => model.clear(),
        Op::Detach(k) => {
            if let Some(pos) = model.iter().position(|&m| m == k) {
                model.truncate(pos);
            }
        }
        Op::Frame => {}
    }
}

#[test]
fn pop_to_removes_target_and_everything_above() {
    let scheduler = FrameScheduler::new();
    let stack: NavigationStack<usize> =
        NavigationStack::new(StackId::main(), NotificationBus::default(), Arc::new(scheduler));
    let records = pool();
    let ops = [Op::Navigate(0), Op::Navigate(1), Op::Navigate(2), Op::PopTo(1)];

    let mut model = Vec::new();
    for op in &ops {
        match *op {
            Op::Navigate(k) => {
                stack.navigate_to(&records[k]);
            }
            Op::PopTo(k) => {
                stack.pop_to(&records[k]);
            }
            _ => unreachable!(),
        }
        apply_to_model(&mut model, op);
    }

    let contents: Vec<usize> = stack.destinations().iter().map(Destination::content).collect();
    assert_eq!(contents, vec![0]);
    assert_eq!(model, vec![0]);
    assert!(!records[1].is_attached());
    assert!(!records[2].is_attached());
}

proptest! {
    /// Property: the stack tracks the model and attachment mirrors membership
    #[test]
    fn prop_stack_matches_model(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let scheduler = FrameScheduler::new();
        let stack: NavigationStack<usize> =
            NavigationStack::new(StackId::main(), NotificationBus::default(), Arc::new(scheduler.clone()));
        let records = pool();
        let mut model = Vec::new();

        for op in &ops {
            match *op {
                Op::Navigate(k) => { stack.navigate_to(&records[k]); }
                Op::PopTo(k) => { stack.pop_to(&records[k]); }
                Op::PopAll => { stack.pop_all(); }
                Op::Detach(k) => records[k].detach(),
                Op::Frame => { scheduler.advance(Duration::from_millis(16)); }
            }
            apply_to_model(&mut model, op);

            let contents: Vec<usize> = stack.destinations().iter().map(Destination::content).collect();
            prop_assert_eq!(&contents, &model);

            for (i, record) in records.iter().enumerate() {
                prop_assert_eq!(record.is_attached(), model.contains(&i));
            }
        }
    }

    /// Property: navigating to an attached record is a no-op
    #[test]
    fn prop_navigate_is_idempotent(picks in prop::collection::vec(0..POOL, 1..20)) {
        let scheduler = FrameScheduler::new();
        let stack: NavigationStack<usize> =
            NavigationStack::new(StackId::main(), NotificationBus::default(), Arc::new(scheduler));
        let records = pool();

        for &k in &picks {
            stack.navigate_to(&records[k]);
        }
        let before = stack.destinations();
        for &k in &picks {
            prop_assert!(!stack.navigate_to(&records[k]));
        }
        prop_assert_eq!(stack.destinations(), before);
    }

    /// Property: successor queries walk the sequence in order
    #[test]
    fn prop_successor_chain(len in 0..POOL) {
        let scheduler = FrameScheduler::new();
        let stack: NavigationStack<usize> =
            NavigationStack::new(StackId::main(), NotificationBus::default(), Arc::new(scheduler));
        let records = pool();
        for record in records.iter().take(len) {
            stack.navigate_to(record);
        }

        let mut cursor = stack.initial_marker().clone();
        let mut walked = Vec::new();
        while let Some(next) = stack.destination_after(&cursor) {
            walked.push(next.content());
            cursor = next.id().clone();
        }
        prop_assert_eq!(walked, (0..len).collect::<Vec<_>>());
        prop_assert!(stack.try_destination_after(&cursor).is_err());
    }

    /// Property: any burst between frames yields at most one broadcast
    #[test]
    fn prop_burst_coalesces(burst in prop::collection::vec(0..POOL, 1..20)) {
        let scheduler = FrameScheduler::new();
        let bus = NotificationBus::default();
        let stack: NavigationStack<usize> =
            NavigationStack::new(StackId::main(), bus.clone(), Arc::new(scheduler.clone()));
        let records = pool();

        for &k in &burst {
            stack.navigate_to(&records[k]);
        }
        scheduler.advance(Duration::from_millis(16));
        prop_assert_eq!(bus.published(), 1);
    }
}
