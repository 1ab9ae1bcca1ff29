use crate::{entity, AlertConfig, AlertState, AlertStateEntry, TransitionConfig};
use std::collections::{BTreeMap, HashMap};

/// Nag interval which disables repeated notifications.
pub const DO_NOT_NAG: i64 = 0;

/// Outcome of a single [`AlertStateStore::raise_alert`] evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertStateChange {
    /// Entity state prior to this evaluation (None if never observed).
    pub previous_state: Option<AlertState>,
    /// Entity state as of this evaluation.
    pub current_state: AlertState,
    /// Whether the caller should emit an alert event.
    pub raise_alert: bool,
}

impl AlertStateChange {
    pub fn is_state_change(&self) -> bool {
        self.previous_state != Some(self.current_state)
    }
}

/// AlertStateStore tracks every alerting entity of one alert configuration.
#[derive(Debug, Clone)]
pub struct AlertStateStore {
    namespace: String,
    alert_id: i64,
    store_identity: String,
    transitions: TransitionConfig,
    nag_interval_secs: i64,
    // Epoch seconds at which the current run began.
    run_stamp_sec: i64,
    entries: HashMap<u64, AlertStateEntry>,
    // Entities which raised an alert in the current run.
    raised_this_run: HashMap<u64, RunMark>,
}

#[derive(Debug, Clone, Copy)]
struct RunMark {
    // State held by the entity when the run opened. Entities first observed
    // during the run open with the implicit GOOD baseline.
    opened_with: AlertState,
    // Bitset of AlertState ids raised during the run.
    raised: u8,
}

impl RunMark {
    fn has_raised(&self, state: AlertState) -> bool {
        self.raised & (1 << state.id()) != 0
    }
}

impl AlertStateStore {
    /// Build an empty store for `config`, opening a run at the current time.
    pub fn new(config: &AlertConfig) -> Self {
        Self::new_at(config, crate::now_sec())
    }

    /// Build an empty store for `config`, opening a run at `run_stamp_sec`.
    pub fn new_at(config: &AlertConfig, run_stamp_sec: i64) -> Self {
        Self {
            namespace: config.namespace.clone(),
            alert_id: config.alert_id,
            store_identity: config.store_identity.clone(),
            transitions: config.transitions.clone(),
            nag_interval_secs: config.nag_interval_secs,
            run_stamp_sec,
            entries: HashMap::new(),
            raised_this_run: HashMap::new(),
        }
    }

    /// Evaluate `new_state` for the entity identified by `(namespace, alert_id, tags)`,
    /// record it, and decide whether it's an alert-worthy event.
    pub fn raise_alert(
        &mut self,
        namespace: &str,
        alert_id: i64,
        tags: &BTreeMap<String, String>,
        new_state: AlertState,
    ) -> AlertStateChange {
        let state_id = entity::state_id(namespace, alert_id, tags);
        let now = self.run_stamp_sec;
        let nag_interval = self.nag_interval_secs;

        let entry = self
            .entries
            .entry(state_id)
            .or_insert_with(|| AlertStateEntry {
                state_id,
                tags: Some(tags.clone()),
                current_state: None,
                previous_state: None,
                last_seen_timestamp: now,
                nag_interval_sec: nag_interval,
            });
        let old_state = entry.current_state;

        let raise = match (self.raised_this_run.get(&state_id), old_state) {
            // This entity already raised during this run. Only an edge out of the
            // state it held when the run opened, to a state not yet seen this run,
            // may raise again.
            (Some(mark), _) => {
                old_state != Some(new_state)
                    && mark.opened_with != new_state
                    && !mark.has_raised(new_state)
                    && self.transitions.is_allowed(mark.opened_with, new_state)
            }
            // First observation: GOOD is the implicit baseline, and is never raised.
            (None, None) => {
                new_state != AlertState::Good
                    && self.transitions.is_allowed(AlertState::Good, new_state)
            }
            // Unchanged state: raise only as a nag.
            (None, Some(old)) if old == new_state => {
                is_nag_due(entry, new_state, now, nag_interval)
            }
            (None, Some(old)) => self.transitions.is_allowed(old, new_state),
        };

        if raise || old_state != Some(new_state) {
            entry.last_seen_timestamp = now;
        }
        entry.previous_state = old_state;
        entry.current_state = Some(new_state);
        entry.nag_interval_sec = nag_interval;

        if raise {
            let mark = self.raised_this_run.entry(state_id).or_insert(RunMark {
                opened_with: old_state.unwrap_or(AlertState::Good),
                raised: 0,
            });
            mark.raised |= 1 << new_state.id();
        }

        tracing::trace!(
            alert_id,
            state_id,
            ?old_state,
            %new_state,
            raise,
            "evaluated alert state"
        );

        AlertStateChange {
            previous_state: old_state,
            current_state: new_state,
            raise_alert: raise,
        }
    }

    /// Begin a new evaluation run at the current wall-clock time.
    pub fn new_run(&mut self) {
        self.new_run_at(crate::now_sec())
    }

    /// Begin a new evaluation run at `run_stamp_sec`.
    /// Run stamps never move backwards: an earlier stamp keeps the current one.
    pub fn new_run_at(&mut self, run_stamp_sec: i64) {
        if run_stamp_sec < self.run_stamp_sec {
            tracing::debug!(
                alert_id = self.alert_id,
                run_stamp_sec,
                current = self.run_stamp_sec,
                "run stamp moved backwards; keeping the current stamp"
            );
        } else {
            self.run_stamp_sec = run_stamp_sec;
        }
        self.raised_this_run.clear();
    }

    pub fn current_state(&self, state_id: u64) -> Option<AlertState> {
        self.entries.get(&state_id).and_then(|e| e.current_state)
    }

    pub fn previous_state(&self, state_id: u64) -> Option<AlertState> {
        self.entries.get(&state_id).and_then(|e| e.previous_state)
    }

    pub fn entry(&self, state_id: u64) -> Option<&AlertStateEntry> {
        self.entries.get(&state_id)
    }

    /// Swap the active transition config. Tracked entities are retained.
    pub fn set_transition_config(&mut self, transitions: TransitionConfig) {
        tracing::debug!(alert_id = self.alert_id, %transitions, "updated transition config");
        self.transitions = transitions;
    }

    pub fn transition_config(&self) -> &TransitionConfig {
        &self.transitions
    }

    /// Set the nag interval applied by subsequent evaluations.
    pub fn set_nag_interval_secs(&mut self, secs: i64) {
        self.nag_interval_secs = secs;
    }

    pub fn nag_interval_secs(&self) -> i64 {
        self.nag_interval_secs
    }

    /// Stop tracking an entity. Returns its entry, if it was tracked.
    pub fn purge_state(&mut self, state_id: u64) -> Option<AlertStateEntry> {
        self.raised_this_run.remove(&state_id);
        self.entries.remove(&state_id)
    }

    /// Purge every entity matching `predicate`, returning the number removed.
    pub fn purge_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&AlertStateEntry) -> bool,
    {
        let purge: Vec<u64> = self
            .entries
            .values()
            .filter(|entry| predicate(entry))
            .map(|entry| entry.state_id)
            .collect();

        for state_id in &purge {
            self.purge_state(*state_id);
        }
        purge.len()
    }

    /// Purge every entity which is currently GOOD.
    pub fn purge_recovered(&mut self) -> usize {
        self.purge_where(AlertStateEntry::is_good)
    }

    pub fn entries(&self) -> impl Iterator<Item = &AlertStateEntry> + '_ {
        self.entries.values()
    }

    pub fn state_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.keys().copied()
    }

    /// Point-in-time copy of all entries, ordered on `state_id`.
    pub fn snapshot(&self) -> Vec<AlertStateEntry> {
        let mut entries: Vec<_> = self.entries.values().cloned().collect();
        entries.sort_by_key(|e| e.state_id);
        entries
    }

    /// Insert a previously-persisted entry, replacing any tracked entity with
    /// the same `state_id`.
    pub fn restore(&mut self, entry: AlertStateEntry) {
        self.entries.insert(entry.state_id, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn alert_id(&self) -> i64 {
        self.alert_id
    }

    pub fn store_identity(&self) -> &str {
        &self.store_identity
    }

    pub fn run_stamp_sec(&self) -> i64 {
        self.run_stamp_sec
    }
}

// Nags follow the store interval. `entry.nag_interval_sec` is informational.
fn is_nag_due(entry: &AlertStateEntry, state: AlertState, now: i64, nag_interval: i64) -> bool {
    state != AlertState::Good
        && nag_interval > DO_NOT_NAG
        && now.saturating_sub(entry.last_seen_timestamp) >= nag_interval
}
