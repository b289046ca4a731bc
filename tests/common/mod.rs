//! Replays an event log and checks the table invariants against it.
//!
//! Acquisitions are logged after the resource is obtained and `ForksReleased`
//! is logged before anything is given back, so counts reconstructed from the
//! log never exceed the real ones at any instant.

#![allow(dead_code)]

use std::collections::BTreeSet;

use dining_table::core::{Event, EventKind, ForkSide, TableSnapshot};

/// What the replay observed.
#[derive(Debug, Default)]
pub struct LogSummary {
    /// EatingStarted events per philosopher.
    pub meals: Vec<u64>,
    /// Most philosophers eating at once.
    pub max_concurrent_eaters: usize,
    /// Most permits outstanding at once.
    pub peak_permits: usize,
    /// Philosophers that logged `Cancelled`.
    pub cancelled: BTreeSet<usize>,
}

impl LogSummary {
    /// Meals across the whole table.
    pub fn total_meals(&self) -> u64 {
        self.meals.iter().sum()
    }
}

#[derive(Debug, Default, Clone)]
struct Seat {
    admitted: bool,
    left: bool,
    right: bool,
    meals: u64,
    done: bool,
}

impl Seat {
    fn holds_anything(&self) -> bool {
        self.admitted || self.left || self.right
    }
}

/// Replay `events` for a table of `n` philosophers.
pub fn check_log(events: &[Event], n: usize) -> Result<LogSummary, String> {
    let mut seats = vec![Seat::default(); n];
    let mut holders: Vec<Option<usize>> = vec![None; n];
    let mut permits = 0usize;
    let mut eating = BTreeSet::new();
    let mut summary = LogSummary {
        meals: vec![0; n],
        ..LogSummary::default()
    };

    for (pos, event) in events.iter().enumerate() {
        let p = event.philosopher;
        let fail = |msg: &str| Err(format!("event #{pos} ({event:?}): {msg}"));
        if p >= n {
            return fail("unknown philosopher");
        }
        if seats[p].done {
            return fail("event after Cancelled");
        }

        match event.kind {
            EventKind::ThinkingStarted => {
                if seats[p].holds_anything() {
                    return fail("thinking while holding resources");
                }
            }
            EventKind::Admitted => {
                if seats[p].admitted {
                    return fail("admitted twice");
                }
                seats[p].admitted = true;
                permits += 1;
                if permits > n - 1 {
                    return fail("admission bound exceeded");
                }
                summary.peak_permits = summary.peak_permits.max(permits);
            }
            EventKind::ForkAcquired { side, fork } => {
                let expected = match side {
                    ForkSide::Left => p,
                    ForkSide::Right => (p + 1) % n,
                };
                if fork != expected {
                    return fail("took a fork that is not at this seat");
                }
                if !seats[p].admitted {
                    return fail("took a fork without a permit");
                }
                match side {
                    ForkSide::Left if seats[p].left => return fail("left fork taken twice"),
                    ForkSide::Right if !seats[p].left => return fail("right fork before left"),
                    ForkSide::Right if seats[p].right => return fail("right fork taken twice"),
                    _ => {}
                }
                if let Some(other) = holders[fork] {
                    return Err(format!(
                        "event #{pos} ({event:?}): fork {fork} already held by {other}"
                    ));
                }
                holders[fork] = Some(p);
                match side {
                    ForkSide::Left => seats[p].left = true,
                    ForkSide::Right => seats[p].right = true,
                }
            }
            EventKind::EatingStarted { meal } => {
                if !(seats[p].left && seats[p].right) {
                    return fail("eating without both forks");
                }
                if meal != seats[p].meals + 1 {
                    return fail("meal counter did not advance by one");
                }
                seats[p].meals = meal;
                summary.meals[p] += 1;
                eating.insert(p);
                summary.max_concurrent_eaters = summary.max_concurrent_eaters.max(eating.len());
            }
            EventKind::ForksReleased => {
                if !seats[p].admitted {
                    return fail("released without holding a permit");
                }
                for holder in holders.iter_mut() {
                    if *holder == Some(p) {
                        *holder = None;
                    }
                }
                permits -= 1;
                eating.remove(&p);
                let meals = seats[p].meals;
                seats[p] = Seat {
                    meals,
                    ..Seat::default()
                };
            }
            EventKind::Cancelled { meals } => {
                if seats[p].holds_anything() {
                    return fail("cancelled while holding resources");
                }
                if meals != seats[p].meals {
                    return fail("final meal count does not match the log");
                }
                seats[p].done = true;
                summary.cancelled.insert(p);
            }
        }
    }

    Ok(summary)
}

/// Check one consistent snapshot of a table of `n` seats.
pub fn check_snapshot(snapshot: &TableSnapshot, n: usize) -> Result<(), String> {
    if snapshot.permits_issued > n - 1 {
        return Err(format!("{} permits issued at a table of {n}", snapshot.permits_issued));
    }
    for (fork, holder) in snapshot.fork_holders.iter().enumerate() {
        if let Some(p) = *holder {
            if p != fork && (p + 1) % n != fork {
                return Err(format!("fork {fork} held by non-neighbour {p}"));
            }
        }
    }
    if snapshot.fork_holding_philosophers() > snapshot.permits_issued {
        return Err(format!(
            "{} philosophers hold forks but only {} permits are out",
            snapshot.fork_holding_philosophers(),
            snapshot.permits_issued
        ));
    }
    Ok(())
}
