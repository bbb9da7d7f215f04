//! End-to-end Integration Test Suite
//!
//! Tests that drive complete pipelines through the host collaborators:
//! - Laziness and cold re-execution across every factory
//! - Operator and combinator ordering on a virtual clock
//! - Teardown reaching timers, listeners and probe sources
//! - The click pipeline on both schedulers

use std::rc::Rc;
use std::time::Duration;

use proptest::prelude::*;
use rill_core::{EventTarget, Observable, Scheduler, StreamError, Subscription};
use rill_time::{TokioScheduler, VirtualScheduler};

use crate::{Notification, Probe, Recorder};

// ============================================================================
// FIXTURES
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
struct Click {
    offset_x: i32,
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Schedule a click on `target` after `delay`
fn click_at(scheduler: &dyn Scheduler, target: &Rc<EventTarget<Click>>, delay: Duration, offset_x: i32) {
    let target = Rc::clone(target);
    scheduler
        .schedule_once(
            delay,
            Box::new(move || {
                target.dispatch("click", &Click { offset_x });
            }),
        )
        .unwrap();
}

fn click_offsets(target: &Rc<EventTarget<Click>>, threshold: i32) -> Observable<i32> {
    Observable::from_event(target.clone(), "click")
        .map(|ev: Click| ev.offset_x)
        .filter(move |x| *x > threshold)
}

// ============================================================================
// LAZINESS AND COLDNESS
// ============================================================================

#[test]
fn test_no_factory_acts_before_subscribe() {
    let scheduler = Rc::new(VirtualScheduler::new());
    let target = Rc::new(EventTarget::<Click>::new());
    let probe = Probe::emitting([1, 2]);
    let paced = Probe::emitting([3]).paced(scheduler.clone(), ms(1));

    let pipelines = [
        Observable::timeout(ms(10), scheduler.clone()).map(|_| 0),
        click_offsets(&target, 0),
        probe.observable().map(|x| x * 2).filter(|x| *x > 2),
        Observable::concat([probe.observable(), paced.observable()]),
        probe.observable().retry(3),
    ];

    assert_eq!(scheduler.pending(), 0);
    assert_eq!(target.listener_count("click"), 0);
    assert_eq!(probe.subscriptions(), 0);
    assert_eq!(paced.subscriptions(), 0);

    let recorder = Recorder::new();
    let subs: Vec<Subscription> = pipelines
        .iter()
        .map(|p| p.subscribe(recorder.clone()))
        .collect();

    assert_eq!(target.listener_count("click"), 1);
    assert_eq!(probe.subscriptions(), 3);
    assert_eq!(paced.subscriptions(), 1);

    for sub in &subs {
        sub.unsubscribe();
    }
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(target.listener_count("click"), 0);
}

#[test]
fn test_each_subscribe_reruns_the_pipeline() {
    let probe = Probe::emitting([1, 2, 3]);
    let doubled = probe.observable().map(|x| x * 2);

    let first = Recorder::new();
    let second = Recorder::new();
    doubled.subscribe(first.clone());
    doubled.subscribe(second.clone());

    assert_eq!(probe.subscriptions(), 2);
    assert_eq!(first.values(), vec![2, 4, 6]);
    assert_eq!(first.notifications(), second.notifications());
}

// ============================================================================
// OPERATORS
// ============================================================================

#[test]
fn test_map_then_complete() {
    let recorder = Recorder::new();
    Observable::of([1, 2, 3]).map(|x| x * 2).subscribe(recorder.clone());

    assert_eq!(
        recorder.notifications(),
        vec![
            Notification::Next(2),
            Notification::Next(4),
            Notification::Next(6),
            Notification::Complete,
        ]
    );
}

#[test]
fn test_map_failure_stops_the_source() {
    let probe = Probe::emitting([1, 2, 3]);
    let recorder = Recorder::new();

    probe
        .observable()
        .try_map(|x| if x == 2 { Err("E") } else { Ok(x) })
        .subscribe(recorder.clone());

    assert_eq!(
        recorder.notifications(),
        vec![Notification::Next(1), Notification::Error(StreamError::msg("E"))]
    );
    assert_eq!(probe.unsubscriptions(), 1);
}

#[test]
fn test_map_panic_becomes_error() {
    let recorder = Recorder::new();
    Observable::of([1, 2, 3])
        .map(|x: i32| if x == 2 { panic!("bad value") } else { x })
        .subscribe(recorder.clone());

    assert_eq!(recorder.values(), vec![1]);
    assert_eq!(recorder.terminal_count(), 1);
    assert_eq!(
        recorder.error(),
        Some(StreamError::ProjectionPanicked("bad value".into()))
    );
}

#[test]
fn test_filter_keeps_matching_values() {
    let recorder = Recorder::new();
    Observable::of([1, 2, 3]).filter(|x| *x > 1).subscribe(recorder.clone());

    assert_eq!(
        recorder.notifications(),
        vec![
            Notification::Next(2),
            Notification::Next(3),
            Notification::Complete,
        ]
    );
}

// ============================================================================
// COMBINATORS
// ============================================================================

#[test]
fn test_concat_waits_for_each_source() {
    let scheduler = Rc::new(VirtualScheduler::new());
    let a = Probe::emitting([1, 2]).paced(scheduler.clone(), ms(10));
    let b = Probe::emitting([3]).paced(scheduler.clone(), ms(10));
    let recorder = Recorder::new();

    Observable::concat([a.observable(), b.observable()]).subscribe(recorder.clone());
    assert_eq!((a.subscriptions(), b.subscriptions()), (1, 0));

    scheduler.advance(ms(20));
    assert_eq!(recorder.values(), vec![1, 2]);
    assert_eq!(b.subscriptions(), 0);

    // a completes at t=30, only then is b subscribed
    scheduler.advance(ms(10));
    assert_eq!(b.subscriptions(), 1);

    scheduler.run_until_idle();
    assert_eq!(
        recorder.notifications(),
        vec![
            Notification::Next(1),
            Notification::Next(2),
            Notification::Next(3),
            Notification::Complete,
        ]
    );
    assert_eq!(scheduler.now(), ms(50));
}

#[test]
fn test_concat_error_skips_later_sources() {
    let a = Probe::failing([1], StreamError::msg("E"));
    let b = Probe::emitting([2]);
    let recorder = Recorder::new();

    Observable::concat([a.observable(), b.observable()]).subscribe(recorder.clone());

    assert_eq!(
        recorder.notifications(),
        vec![Notification::Next(1), Notification::Error(StreamError::msg("E"))]
    );
    assert_eq!(b.subscriptions(), 0);
}

#[test]
fn test_retry_exhausts_attempts() {
    let probe = Probe::failing([1], StreamError::msg("E"));
    let recorder = Recorder::new();

    probe.observable().retry(2).subscribe(recorder.clone());

    assert_eq!(probe.subscriptions(), 3);
    assert_eq!(recorder.values(), vec![1, 1, 1]);
    assert_eq!(recorder.terminal_count(), 1);
    assert_eq!(recorder.error(), Some(StreamError::msg("E")));
}

#[test]
fn test_retry_cancelled_between_attempts() {
    let scheduler = Rc::new(VirtualScheduler::new());
    let probe = Probe::failing([1], StreamError::msg("E")).paced(scheduler.clone(), ms(10));
    let recorder = Recorder::new();

    let sub = probe.observable().retry(5).subscribe(recorder.clone());
    scheduler.advance(ms(30));
    assert_eq!(probe.subscriptions(), 2);
    assert_eq!(recorder.values(), vec![1, 1]);

    sub.unsubscribe();
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(scheduler.run_until_idle(), 0);
    assert_eq!(probe.subscriptions(), 2);
    assert_eq!(probe.unsubscriptions(), 2);
    assert_eq!(recorder.terminal_count(), 0);
}

// ============================================================================
// TIMEOUT
// ============================================================================

#[test]
fn test_zero_timeout_fires_once_after_subscribe_returns() {
    let scheduler = Rc::new(VirtualScheduler::new());
    let recorder = Recorder::new();

    Observable::timeout(Duration::ZERO, scheduler.clone()).subscribe(recorder.clone());
    assert!(recorder.is_empty());
    assert_eq!(scheduler.pending(), 1);

    assert_eq!(scheduler.run_until_idle(), 1);
    assert_eq!(scheduler.run_until_idle(), 0);
    assert_eq!(
        recorder.notifications(),
        vec![Notification::Next(()), Notification::Complete]
    );
}

#[test]
fn test_timeout_unsubscribed_before_firing() {
    let scheduler = Rc::new(VirtualScheduler::new());
    let recorder = Recorder::new();

    let sub = Observable::timeout(ms(500), scheduler.clone()).subscribe(recorder.clone());
    scheduler.advance(ms(499));
    sub.unsubscribe();

    assert_eq!(scheduler.pending(), 0);
    scheduler.advance(ms(10));
    assert!(recorder.is_empty());
}

#[test]
fn test_timeout_on_shut_down_scheduler() {
    let scheduler = Rc::new(VirtualScheduler::new());
    scheduler.shutdown();
    let recorder = Recorder::new();

    Observable::timeout(ms(1), scheduler.clone()).subscribe(recorder.clone());

    assert_eq!(
        recorder.notifications(),
        vec![Notification::Error(StreamError::SchedulerClosed)]
    );
}

// ============================================================================
// TEARDOWN
// ============================================================================

#[test]
fn test_unsubscribe_is_idempotent_for_every_factory() {
    let scheduler = Rc::new(VirtualScheduler::new());
    let target = Rc::new(EventTarget::<Click>::new());
    let paced = Probe::emitting([1, 2]).paced(scheduler.clone(), ms(5));

    let factories: Vec<(&str, Observable<i32>)> = vec![
        ("of", Observable::of([1, 2])),
        ("empty", Observable::empty()),
        ("fail", Observable::fail(StreamError::msg("E"))),
        ("never", Observable::never()),
        ("timeout", Observable::timeout(ms(5), scheduler.clone()).map(|_| 0)),
        ("from_event", click_offsets(&target, 0)),
        ("paced", paced.observable()),
        ("map", paced.observable().map(|x| x + 1)),
        ("filter", paced.observable().filter(|x| *x > 1)),
        ("concat", Observable::concat([paced.observable(), paced.observable()])),
        ("retry", paced.observable().retry(2)),
    ];

    for (name, observable) in factories {
        let recorder = Recorder::new();
        let sub = observable.subscribe(recorder.clone());
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(sub.is_closed(), "{}", name);

        let seen = recorder.len();
        target.dispatch("click", &Click { offset_x: 50 });
        scheduler.run_until_idle();
        assert_eq!(recorder.len(), seen, "{} delivered after unsubscribe", name);
        assert_eq!(scheduler.pending(), 0, "{} left a timer behind", name);
        assert_eq!(target.listener_count("click"), 0, "{} left a listener behind", name);
    }
    assert_eq!(paced.subscriptions(), paced.unsubscriptions());
}

// ============================================================================
// CLICK PIPELINE
// ============================================================================

#[test]
fn test_clicks_after_timeout() {
    let scheduler = Rc::new(VirtualScheduler::new());
    let target = Rc::new(EventTarget::new());
    let recorder = Recorder::new();

    let sub = Observable::concat([
        Observable::timeout(ms(500), scheduler.clone()).map(|_| 0),
        click_offsets(&target, 10),
    ])
    .subscribe(recorder.clone());

    click_at(scheduler.as_ref(), &target, ms(100), 50);
    click_at(scheduler.as_ref(), &target, ms(600), 5);
    click_at(scheduler.as_ref(), &target, ms(700), 42);

    scheduler.advance(ms(499));
    assert_eq!(target.listener_count("click"), 0);
    assert!(recorder.is_empty());

    scheduler.run_until_idle();
    assert_eq!(recorder.values(), vec![0, 42]);
    assert!(!recorder.is_completed());
    assert_eq!(target.listener_count("click"), 1);

    sub.unsubscribe();
    assert_eq!(target.listener_count("click"), 0);
}

#[tokio::test]
async fn test_click_pipeline_on_tokio_scheduler() {
    let scheduler = Rc::new(TokioScheduler::new());
    let target = Rc::new(EventTarget::new());
    let recorder = Recorder::new();

    let timeout = Recorder::new();
    Observable::timeout(ms(100), scheduler.clone()).subscribe(timeout.clone());
    let sub = click_offsets(&target, 10).subscribe(recorder.clone());

    click_at(scheduler.as_ref(), &target, ms(10), 12);
    click_at(scheduler.as_ref(), &target, ms(40), 3);
    click_at(scheduler.as_ref(), &target, ms(70), 40);

    scheduler.run_until_idle().await;
    assert_eq!(recorder.values(), vec![12, 40]);
    assert_eq!(
        timeout.notifications(),
        vec![Notification::Next(()), Notification::Complete]
    );

    sub.unsubscribe();
    assert_eq!(target.listener_count("click"), 0);
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_retry_subscribes_at_most_n_plus_one_times(attempts in 0usize..16) {
        let probe = Probe::failing([0u8], StreamError::msg("E"));
        let recorder = Recorder::new();

        probe.observable().retry(attempts).subscribe(recorder.clone());

        prop_assert_eq!(probe.subscriptions(), attempts + 1);
        prop_assert_eq!(recorder.values().len(), attempts + 1);
        prop_assert_eq!(recorder.terminal_count(), 1);
    }

    #[test]
    fn prop_concat_of_paced_sources_preserves_order(
        chunks in prop::collection::vec(prop::collection::vec(any::<i16>(), 0..4), 0..5)
    ) {
        let scheduler = Rc::new(VirtualScheduler::with_config(
            rill_time::VirtualSchedulerConfig::strict(),
        ));
        let sources: Vec<Observable<i16>> = chunks
            .iter()
            .map(|c| Probe::emitting(c.clone()).paced(scheduler.clone(), ms(1)).observable())
            .collect();
        let recorder = Recorder::new();

        Observable::concat(sources).subscribe(recorder.clone());
        scheduler.run_until_idle();

        let expected: Vec<i16> = chunks.concat();
        prop_assert_eq!(recorder.values(), expected);
        prop_assert!(recorder.is_completed());
        prop_assert_eq!(scheduler.pending(), 0);
    }
}
