// tests/execution_state.rs

use std::cell::Cell;
use std::rc::Rc;

use scriptpulse::thread::{ExecutionState, StepBudget, ThreadStatus};

#[test]
fn running_is_always_eligible_with_full_budget() {
    let mut state = ExecutionState::Running;
    assert!(state.poll_eligible(0));
    assert!(state.poll_eligible(u64::MAX));
    assert_eq!(state.budget(500), 500);
    assert_eq!(state.status(), ThreadStatus::Running);
}

#[test]
fn delay_without_condition_waits_for_deadline() {
    let mut state = ExecutionState::Running;
    state.delay(1_000, 250, None);

    assert!(!state.poll_eligible(1_000));
    assert!(!state.poll_eligible(1_249));
    assert!(state.is_delayed());
    assert!(state.poll_eligible(1_250));
    assert!(matches!(state, ExecutionState::Running));
}

#[test]
fn zero_delay_is_eligible_on_next_poll() {
    let mut state = ExecutionState::Running;
    state.delay(10, 0, None);
    assert!(state.poll_eligible(10));
}

#[test]
fn condition_is_only_checked_after_deadline() {
    let calls = Rc::new(Cell::new(0));
    let ready = Rc::new(Cell::new(false));

    let mut state = ExecutionState::Running;
    {
        let calls = Rc::clone(&calls);
        let ready = Rc::clone(&ready);
        state.delay(
            0,
            100,
            Some(Box::new(move || {
                calls.set(calls.get() + 1);
                ready.get()
            })),
        );
    }

    assert!(!state.poll_eligible(50));
    assert_eq!(calls.get(), 0);

    assert!(!state.poll_eligible(100));
    assert_eq!(calls.get(), 1);

    ready.set(true);
    assert!(state.poll_eligible(101));
    assert!(matches!(state, ExecutionState::Running));
}

#[test]
fn pausing_twice_returns_to_running() {
    let mut state = ExecutionState::Running;
    assert!(state.toggle_pause());
    assert_eq!(state.status(), ThreadStatus::Paused);
    assert_eq!(state.budget(500), 0);
    assert!(!state.poll_eligible(0));

    assert!(!state.toggle_pause());
    assert!(matches!(state, ExecutionState::Running));
}

#[test]
fn pause_preserves_pending_delay() {
    let mut state = ExecutionState::Running;
    state.delay(0, 1_000, None);

    assert!(state.pause());
    assert!(!state.pause());
    // Deadline passes while paused.
    assert!(!state.poll_eligible(5_000));

    assert!(state.resume());
    assert!(state.is_delayed());
    assert!(state.poll_eligible(5_000));
}

#[test]
fn resume_of_unpaused_state_is_a_no_op() {
    let mut state = ExecutionState::Running;
    assert!(!state.resume());
    assert!(matches!(state, ExecutionState::Running));
}

#[test]
fn wake_clears_a_delay() {
    let mut state = ExecutionState::Running;
    state.delay(0, 10_000, None);
    state.wake();
    assert!(state.poll_eligible(0));
}

#[test]
fn budget_counts_down_and_can_be_forced_to_zero() {
    let mut budget = StepBudget::new(3);
    assert!(!budget.exhausted());
    budget.charge(2);
    assert_eq!(budget.remaining(), 1);
    budget.charge(5);
    assert!(budget.exhausted());
    assert_eq!(budget.remaining(), 0);

    budget.reset(4);
    assert_eq!(budget.used(), 0);
    budget.force_zero();
    assert!(budget.exhausted());
}
