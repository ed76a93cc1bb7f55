//! Metrics sink boundary.
//!
//! Engine code records `DenormEvent`s only through `record`; this module is
//! the single bridge to the thread-local counter state.
use crate::{
    db::signal::Signal,
    obs::metrics::{self, RuleCounters},
};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// DenormEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DenormEvent {
    ImpactResolved {
        entity: &'static str,
        field: &'static str,
        signal: Signal,
        rows: u64,
    },
    Recompute {
        entity: &'static str,
        field: &'static str,
    },
    Write {
        entity: &'static str,
        field: &'static str,
    },
    SkipInFlight {
        entity: &'static str,
        field: &'static str,
    },
    SkipUnchanged {
        entity: &'static str,
        field: &'static str,
    },
    Rebuild {
        entity: &'static str,
        field: &'static str,
        rows: u64,
    },
}

impl DenormEvent {
    /// Rule the event belongs to.
    #[must_use]
    pub const fn rule(&self) -> (&'static str, &'static str) {
        match *self {
            Self::ImpactResolved { entity, field, .. }
            | Self::Recompute { entity, field }
            | Self::Write { entity, field }
            | Self::SkipInFlight { entity, field }
            | Self::SkipUnchanged { entity, field }
            | Self::Rebuild { entity, field, .. } => (entity, field),
        }
    }
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: DenormEvent);
}

/// GlobalMetricsSink
/// Default sink accumulating into the thread-local counter state.
/// Used whenever no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: DenormEvent) {
        let (entity, field) = event.rule();

        metrics::with_state_mut(|m| {
            bump(&mut m.totals, event);
            bump(m.rule_mut(entity, field), event);
        });
    }
}

// Apply one event to one counter block.
fn bump(counters: &mut RuleCounters, event: DenormEvent) {
    match event {
        DenormEvent::ImpactResolved { rows, .. } => {
            counters.impact_resolutions = counters.impact_resolutions.saturating_add(1);
            counters.impact_rows = counters.impact_rows.saturating_add(rows);
        }
        DenormEvent::Recompute { .. } => {
            counters.recomputes = counters.recomputes.saturating_add(1);
        }
        DenormEvent::Write { .. } => {
            counters.writes = counters.writes.saturating_add(1);
        }
        DenormEvent::SkipInFlight { .. } => {
            counters.skipped_in_flight = counters.skipped_in_flight.saturating_add(1);
        }
        DenormEvent::SkipUnchanged { .. } => {
            counters.skipped_unchanged = counters.skipped_unchanged.saturating_add(1);
        }
        DenormEvent::Rebuild { rows, .. } => {
            counters.rebuilds = counters.rebuilds.saturating_add(1);
            counters.rebuild_rows = counters.rebuild_rows.saturating_add(rows);
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: DenormEvent) {
    let override_sink = SINK_OVERRIDE.with_borrow(Clone::clone);

    match override_sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current thread's counters.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all counters on the current thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
/// The previous sink is restored on every exit, including unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with_borrow_mut(|slot| *slot = prev);
        }
    }

    let prev = SINK_OVERRIDE.with_borrow_mut(|slot| slot.replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
