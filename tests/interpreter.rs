//! End-to-end scenarios: parse a script, run it against a recording driver
//! under the paused test clock, and assert on the delivered key events.

use beanscript::{parse_str, DriverEvent, Kind, RecordingDriver, Runtime, TimedEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{timeout, Instant};

fn runtime_for(script: &str) -> (Runtime, Arc<Mutex<Vec<TimedEvent>>>) {
    let program = parse_str(script).expect("script should parse");
    let driver = RecordingDriver::new();
    let events = driver.events();
    (Runtime::new(program, Box::new(driver)), events)
}

/// Key-down events as `(key name, ms since start)` pairs.
fn downs(events: &Arc<Mutex<Vec<TimedEvent>>>, start: Instant) -> Vec<(String, u64)> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|timed| match timed.event {
            DriverEvent::Down(code) => Some((
                beanscript::keys::name_of(code).unwrap_or("?").to_string(),
                (timed.at - start).as_millis() as u64,
            )),
            _ => None,
        })
        .collect()
}

/// Runs the script until it finishes or `deadline_ms` of virtual time pass.
async fn run_bounded(runtime: &mut Runtime, deadline_ms: u64) {
    let _ = timeout(Duration::from_millis(deadline_ms), runtime.run()).await;
}

#[tokio::test(start_paused = true)]
async fn test_single_press_delivers_one_keystroke() {
    let script = "key k with button a, duration 10, after 0, repeat 0\n\
                  press k\n";
    let (mut runtime, events) = runtime_for(script);
    runtime.run().await.unwrap();

    let captured = events.lock().unwrap();
    assert_eq!(captured.len(), 2);

    let (down, up) = (&captured[0], &captured[1]);
    match (&down.event, &up.event) {
        (DriverEvent::Down(d), DriverEvent::Up(u)) => assert_eq!(d, u),
        other => panic!("expected down then up, got {other:?}"),
    }
    assert_eq!(up.at - down.at, Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn test_routine_alternates_strictly() {
    let script = "key a with button a, after 0\n\
                  key b with button b, after 0\n\
                  routine r with a, b\n\
                  start r\n";
    let (mut runtime, events) = runtime_for(script);
    let start = Instant::now();
    run_bounded(&mut runtime, 600).await;

    let fired = downs(&events, start);
    assert!(fired.len() >= 4, "expected several cycles, got {fired:?}");
    for (idx, (name, _)) in fired.iter().enumerate() {
        let expected = if idx % 2 == 0 { "a" } else { "b" };
        assert_eq!(name, expected, "cycle order broke at index {idx}: {fired:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_waitlist_honors_cooldowns() {
    let script = "key x with button x, duration 1, after 0, cooldown 100\n\
                  key y with button y, duration 1, after 0, cooldown 50\n\
                  waitlist w with x, y\n\
                  start w\n";
    let (mut runtime, events) = runtime_for(script);
    let start = Instant::now();
    run_bounded(&mut runtime, 130).await;

    let fired = downs(&events, start);
    let in_window = |name: &str, lo: u64, hi: u64| {
        fired
            .iter()
            .filter(|(n, at)| n == name && (lo..hi).contains(at))
            .count()
    };

    // Both fire at once, only y at ~50 ms, both again at ~100 ms.
    assert_eq!(in_window("x", 0, 25), 1, "events: {fired:?}");
    assert_eq!(in_window("y", 0, 25), 1, "events: {fired:?}");
    assert_eq!(in_window("x", 25, 95), 0, "events: {fired:?}");
    assert_eq!(in_window("y", 40, 60), 1, "events: {fired:?}");
    assert_eq!(in_window("x", 95, 115), 1, "events: {fired:?}");
    assert_eq!(in_window("y", 95, 115), 1, "events: {fired:?}");
}

#[tokio::test(start_paused = true)]
async fn test_random_blocks_while_cooling_down() {
    let script = "key x with button x, cooldown 1000\n\
                  random r with x\n\
                  start r\n";
    let (mut runtime, events) = runtime_for(script);
    let start = Instant::now();
    run_bounded(&mut runtime, 2000).await;

    let fired = downs(&events, start);
    assert_eq!(fired.len(), 2, "events: {fired:?}");

    let (_, first) = &fired[0];
    let (_, second) = &fired[1];
    assert!(*first < 150, "first firing too late: {fired:?}");
    assert!(
        (1000..1400).contains(second),
        "second firing should wait out the cooldown: {fired:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_inplace_press_registers_and_fires_alias() {
    let script = "key base with button q\n\
                  group g with after 1, repeat -1\n\
                  \tpress base with duration 0, after 0\n\
                  start g\n";
    let (mut runtime, events) = runtime_for(script);

    // The in-place press shadows `base` behind a generated alias.
    let alias = runtime.program().table().get("Alias_00(base)").unwrap();
    assert_eq!(alias.kind(), Kind::Press);
    assert_eq!(alias.children(), ["base"]);
    assert_eq!(
        runtime.program().table().get("g").unwrap().children(),
        ["Alias_00(base)"]
    );

    let start = Instant::now();
    run_bounded(&mut runtime, 10).await;

    // The unbounded group keeps firing the alias, one press of q per
    // iteration.
    let fired = downs(&events, start);
    assert!(fired.len() >= 3, "events: {fired:?}");
    assert!(fired.iter().all(|(name, _)| name == "q"), "events: {fired:?}");
}

#[tokio::test(start_paused = true)]
async fn test_inplace_alias_repeat_fires_twice_per_iteration() {
    let script = "key base with button q, duration 0, after 0\n\
                  group g with after 1, repeat 1\n\
                  \tpress base with repeat 2\n\
                  start g\n";
    let (mut runtime, events) = runtime_for(script);
    let start = Instant::now();
    runtime.drain_execution_list().await.unwrap();
    runtime.tick().await.unwrap();

    // One group iteration, the alias inside fires twice.
    let fired = downs(&events, start);
    assert_eq!(fired.len(), 2, "events: {fired:?}");
}

#[tokio::test(start_paused = true)]
async fn test_stop_in_same_batch_prevents_all_firing() {
    let script = "key a with button a, after 0\n\
                  routine r with a\n\
                  start r\n\
                  stop r\n";
    let (mut runtime, events) = runtime_for(script);

    // Terminates on its own: nothing stays active past the batch.
    runtime.run().await.unwrap();

    assert!(!runtime.is_active("r"));
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_top_level_transactions_run_in_source_order() {
    let script = "key a with button a, duration 0, after 0\n\
                  key b with button b, duration 0, after 0\n\
                  press b\n\
                  press a\n\
                  press b\n";
    let (mut runtime, events) = runtime_for(script);
    let start = Instant::now();
    runtime.run().await.unwrap();

    let fired: Vec<String> = downs(&events, start).into_iter().map(|(n, _)| n).collect();
    assert_eq!(fired, ["b", "a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn test_hold_leaves_key_down_until_release() {
    let script = "key k with button a, after 0\n\
                  hold k\n\
                  release k\n";
    let (mut runtime, events) = runtime_for(script);
    runtime.run().await.unwrap();

    let captured = events.lock().unwrap();
    let kinds: Vec<&DriverEvent> = captured.iter().map(|t| &t.event).collect();
    match kinds.as_slice() {
        [DriverEvent::Down(d), DriverEvent::Up(u)] => assert_eq!(d, u),
        other => panic!("expected a single down/up pair, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_window_focus_precedes_keystrokes() {
    let script = "window My Game\n\
                  key k with button a, duration 0, after 0\n\
                  press k\n";
    let (mut runtime, events) = runtime_for(script);
    runtime.run().await.unwrap();

    let captured = events.lock().unwrap();
    assert_eq!(captured[0].event, DriverEvent::Focus("My Game".into()));
    assert!(matches!(captured[1].event, DriverEvent::Down(_)));
}

#[tokio::test(start_paused = true)]
async fn test_group_nested_under_routine_runs_fully() {
    let script = "key a with button a, duration 0, after 0\n\
                  key b with button b, duration 0, after 0\n\
                  group combo with after 0\n\
                  \tpress a\n\
                  \tpress b\n\
                  routine r with combo, a\n\
                  start r\n";
    let (mut runtime, events) = runtime_for(script);
    let start = Instant::now();
    run_bounded(&mut runtime, 10).await;

    let fired: Vec<String> = downs(&events, start).into_iter().map(|(n, _)| n).collect();
    // Each routine cycle is the full combo (a, b) followed by a.
    assert!(fired.len() >= 6, "events: {fired:?}");
    for chunk in fired.chunks_exact(3) {
        assert_eq!(chunk, ["a", "b", "a"], "events: {fired:?}");
    }
}
