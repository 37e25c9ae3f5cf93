//! Fixed-window limiter behavior, driven through `check_at` with an
//! explicit clock so every assertion is deterministic.

use crewdeck::rate_limit::FixedWindowLimiter;

const WINDOW: i64 = 900;

#[test]
fn counts_down_to_zero_then_denies() {
    let limiter = FixedWindowLimiter::new();

    for expected_remaining in (0..3).rev() {
        let decision = limiter.check_at(1_000, "members.invite", "actor", "proj", 3, WINDOW);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, expected_remaining);
        assert_eq!(decision.reset_at, 1_000 + WINDOW);
    }

    let decision = limiter.check_at(1_000, "members.invite", "actor", "proj", 3, WINDOW);
    assert!(!decision.allowed);
    assert_eq!(decision.remaining, 0);
    assert_eq!(decision.reset_at, 1_000 + WINDOW);
}

#[test]
fn window_is_anchored_to_the_first_request() {
    let limiter = FixedWindowLimiter::new();

    limiter.check_at(1_000, "r", "a", "p", 2, WINDOW);
    // Still inside the window started at t=1000, even WINDOW-1 later.
    let decision = limiter.check_at(1_000 + WINDOW - 1, "r", "a", "p", 2, WINDOW);
    assert!(decision.allowed);
    let decision = limiter.check_at(1_000 + WINDOW - 1, "r", "a", "p", 2, WINDOW);
    assert!(!decision.allowed);
}

#[test]
fn window_rolls_over_and_resets_the_count() {
    let limiter = FixedWindowLimiter::new();

    for _ in 0..5 {
        limiter.check_at(1_000, "r", "a", "p", 2, WINDOW);
    }
    assert!(!limiter.check_at(1_000, "r", "a", "p", 2, WINDOW).allowed);

    let decision = limiter.check_at(1_000 + WINDOW, "r", "a", "p", 2, WINDOW);
    assert!(decision.allowed);
    assert_eq!(decision.remaining, 1);
    assert_eq!(decision.reset_at, 1_000 + 2 * WINDOW);
}

#[test]
fn keys_are_independent_across_route_actor_and_resource() {
    let limiter = FixedWindowLimiter::new();

    assert!(limiter.check_at(0, "members.invite", "a", "p", 1, WINDOW).allowed);
    assert!(!limiter.check_at(0, "members.invite", "a", "p", 1, WINDOW).allowed);

    // Exhausting one key leaves the others untouched.
    assert!(limiter.check_at(0, "members.mutate", "a", "p", 1, WINDOW).allowed);
    assert!(limiter.check_at(0, "members.invite", "b", "p", 1, WINDOW).allowed);
    assert!(limiter.check_at(0, "members.invite", "a", "q", 1, WINDOW).allowed);
}

#[test]
fn denied_requests_still_count_against_the_window() {
    let limiter = FixedWindowLimiter::new();

    for _ in 0..10 {
        limiter.check_at(0, "r", "a", "p", 1, WINDOW);
    }
    // Hammering past the limit does not slide the reset forward.
    let decision = limiter.check_at(10, "r", "a", "p", 1, WINDOW);
    assert!(!decision.allowed);
    assert_eq!(decision.reset_at, WINDOW);
}
