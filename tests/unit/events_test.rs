//! Tests for the event log and sinks

use std::sync::Arc;
use std::thread;

use dining_table::core::{
    ChannelEventSink, Event, EventKind, EventSink, ForkSide, InMemoryEventLog, NullEventSink,
    TracingEventSink,
};

#[test]
fn test_event_json_shape() {
    let event = Event {
        philosopher: 1,
        kind: EventKind::ForkAcquired {
            side: ForkSide::Left,
            fork: 1,
        },
        at_ms: 1_700_000_000_000,
    };
    let json = serde_json::to_string(&event).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["kind"], "fork_acquired");
    assert_eq!(value["side"], "left");
    assert_eq!(value["fork"], 1);

    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn test_event_display_lines() {
    assert_eq!(
        Event::now(0, EventKind::ThinkingStarted).to_string(),
        "philosopher 0 is thinking"
    );
    assert_eq!(
        Event::now(3, EventKind::EatingStarted { meal: 2 }).to_string(),
        "philosopher 3 is eating (meal #2)"
    );
    assert_eq!(
        Event::now(1, EventKind::Cancelled { meals: 4 }).to_string(),
        "philosopher 1 stopped after 4 meals"
    );
}

#[test]
fn test_in_memory_log_from_many_threads() {
    let log = Arc::new(InMemoryEventLog::new(10_000));
    let handles: Vec<_> = (0..4)
        .map(|p| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for meal in 1..=100 {
                    log.record(Event::now(p, EventKind::EatingStarted { meal }));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let events = log.events();
    assert_eq!(events.len(), 400);
    for p in 0..4 {
        let meals: Vec<u64> = events
            .iter()
            .filter(|e| e.philosopher == p)
            .map(|e| match e.kind {
                EventKind::EatingStarted { meal } => meal,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(meals, (1..=100).collect::<Vec<_>>());
    }
}

#[test]
fn test_zero_capacity_log_only_counts() {
    let log = InMemoryEventLog::new(0);
    log.record(Event::now(0, EventKind::Admitted));
    assert!(log.is_empty());
    assert_eq!(log.evicted(), 1);
}

#[test]
fn test_channel_sink_streams_in_order() {
    let (sink, rx) = ChannelEventSink::unbounded();
    sink.record(Event::now(2, EventKind::Admitted));
    sink.record(Event::now(2, EventKind::ForksReleased));
    let kinds: Vec<_> = rx.try_iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Admitted, EventKind::ForksReleased]);
}

#[test]
fn test_sinks_are_object_safe() {
    let sinks: Vec<Arc<dyn EventSink>> = vec![
        Arc::new(NullEventSink),
        Arc::new(TracingEventSink),
        Arc::new(InMemoryEventLog::new(4)),
    ];
    for sink in &sinks {
        sink.record(Event::now(0, EventKind::ThinkingStarted));
    }
}
