use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

///
/// EventState
/// Ephemeral, in-memory counters for denormalization activity.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct EventState {
    pub(crate) totals: RuleCounters,
    pub(crate) rules: BTreeMap<String, RuleCounters>,
}

impl EventState {
    // Counters for one `(entity, field)` rule, created on first use.
    pub(crate) fn rule_mut(&mut self, entity: &str, field: &str) -> &mut RuleCounters {
        self.rules.entry(rule_label(entity, field)).or_default()
    }
}

///
/// RuleCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RuleCounters {
    // Impact-set resolution
    pub impact_resolutions: u64,
    pub impact_rows: u64,

    // Recomputation outcomes
    pub recomputes: u64,
    pub writes: u64,
    pub skipped_in_flight: u64,
    pub skipped_unchanged: u64,

    // Full rebuilds
    pub rebuilds: u64,
    pub rebuild_rows: u64,
}

///
/// EventReport
/// Point-in-time snapshot of the counters, keyed by `Entity.field`.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventReport {
    pub totals: RuleCounters,
    pub rules: BTreeMap<String, RuleCounters>,
}

impl EventReport {
    /// Counters for one rule, or zeros when it never recorded anything.
    #[must_use]
    pub fn rule(&self, entity: &str, field: &str) -> RuleCounters {
        self.rules
            .get(&rule_label(entity, field))
            .cloned()
            .unwrap_or_default()
    }
}

pub(crate) fn rule_label(entity: &str, field: &str) -> String {
    format!("{entity}.{field}")
}

pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with_borrow_mut(f)
}

pub(crate) fn report() -> EventReport {
    EVENT_STATE.with_borrow(|state| EventReport {
        totals: state.totals.clone(),
        rules: state.rules.clone(),
    })
}

pub(crate) fn reset_all() {
    EVENT_STATE.with_borrow_mut(|state| *state = EventState::default());
}
