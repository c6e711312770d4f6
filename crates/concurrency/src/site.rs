//! Version Store: per-site append-only commit histories and failure/recovery tracking.

use std::collections::BTreeMap;

use repcrec_core::{LogicalTime, SiteId, Slot, Value, VariableId};

/// Up/down status of a [`Site`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    /// Serving reads and accepting writes.
    Up,
    /// Down: reads fail, writes are never routed here.
    Down,
}

/// A single site's commit history and liveness record.
///
/// Holds, per variable it's responsible for, an append-only `(commit_time, Slot)`
/// history (newest last). A site only tracks history for the variables it actually
/// holds per the placement rule (`spec.md` section 3): every even-indexed variable, and
/// at most one odd-indexed variable (its own).
#[derive(Debug, Clone)]
pub struct Site {
    id: SiteId,
    status: SiteStatus,
    history: BTreeMap<VariableId, Vec<(LogicalTime, Slot)>>,
    failures: Vec<LogicalTime>,
    recoveries: Vec<LogicalTime>,
}

impl Site {
    /// Construct a site with no data yet; call [`Site::initialize`] before use.
    pub fn new(id: SiteId) -> Self {
        Self {
            id,
            status: SiteStatus::Up,
            history: BTreeMap::new(),
            failures: Vec::new(),
            recoveries: Vec::new(),
        }
    }

    /// This site's id.
    pub fn id(&self) -> SiteId {
        self.id
    }

    /// Seed the commit history for every variable this site is responsible for with
    /// its initial value (`10 * i`), committed at logical time 0.
    ///
    /// A variable belongs to this site if it's replicated (even index, held
    /// everywhere) or if this site is its unique home (odd index).
    pub fn initialize(&mut self) {
        for index in VariableId::MIN..=VariableId::MAX {
            let var = VariableId::new(index).expect("index is in range by construction");
            let belongs_here = var.is_replicated() || var.home_site() == self.id;
            if belongs_here {
                self.history
                    .insert(var, vec![(LogicalTime::ZERO, Slot::Value(var.initial_value()))]);
            }
        }
    }

    /// True if this site is responsible for `var` (replicated, or its unique home).
    pub fn holds(&self, var: VariableId) -> bool {
        self.history.contains_key(&var)
    }

    /// True while up.
    pub fn is_up(&self) -> bool {
        matches!(self.status, SiteStatus::Up)
    }

    /// Every variable this site holds, in ascending order.
    pub fn variables(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.history.keys().copied()
    }

    /// Mark the site down at logical time `t`.
    ///
    /// Per `spec.md` section 9 ("doomed-but-alive transactions"), this does not itself
    /// touch any in-flight transaction — the coordinator consults
    /// [`Site::failed_during`] at each transaction's `end` to decide whether the
    /// failure dooms it, so output order matches command order.
    pub fn fail(&mut self, t: LogicalTime) {
        self.status = SiteStatus::Down;
        self.failures.push(t);
        tracing::info!(site = self.id.get(), time = t.get(), "site fails");
    }

    /// Mark the site up at logical time `t`, and mask replicated variables until
    /// their next real write.
    ///
    /// Every replicated variable this site holds gets an [`Slot::Unreadable`] entry
    /// appended at `t`: a recovered replica cannot be trusted to have missed updates
    /// made while it was down, so it must see a fresh commit before being served
    /// again. Non-replicated variables are unaffected — this site is their only home,
    /// so there was nobody else to commit an update it could have missed.
    pub fn recover(&mut self, t: LogicalTime) {
        self.status = SiteStatus::Up;
        self.recoveries.push(t);
        let replicated: Vec<VariableId> = self.variables().filter(|v| v.is_replicated()).collect();
        for var in replicated {
            self.history.entry(var).or_default().push((t, Slot::Unreadable));
        }
        tracing::info!(site = self.id.get(), time = t.get(), "site recovers");
    }

    /// Apply a committed write: append `(t, value)` to `var`'s history.
    ///
    /// Only meant to be called by the coordinator during commit, against sites
    /// currently up that hold `var`.
    pub fn write(&mut self, var: VariableId, value: Value, t: LogicalTime) {
        self.history.entry(var).or_default().push((t, Slot::Value(value)));
    }

    /// The last committed, readable value of `var` at or before `at`, or `None` if the
    /// site holds no entry at or before `at`, or the latest such entry is an
    /// [`Slot::Unreadable`] sentinel.
    ///
    /// Deliberately does not fall through an `Unreadable` sentinel to an older `Value`
    /// entry: the sentinel means the site cannot vouch for `var` as of `at`, not that
    /// its last known value is stale-but-usable.
    pub fn last_committed_value(&self, var: VariableId, at: LogicalTime) -> Option<Value> {
        let latest = self.history.get(&var)?.iter().rev().find(|(t, _)| *t <= at)?;
        latest.1.value()
    }

    /// True if [`Site::last_committed_value`] would return a value for `var` at `at`.
    pub fn readable(&self, var: VariableId, at: LogicalTime) -> bool {
        self.last_committed_value(var, at).is_some()
    }

    /// The commit time of the most recent history entry for `var`, ignoring whether
    /// it's readable; `0` if the site holds no history for `var` at all.
    pub fn last_commit_time(&self, var: VariableId) -> LogicalTime {
        self.history
            .get(&var)
            .and_then(|h| h.last())
            .map(|(t, _)| *t)
            .unwrap_or(LogicalTime::ZERO)
    }

    /// True iff no downtime interval `[fail_k, recover_k)` overlaps `[start, end)`.
    pub fn was_up_continuously(&self, start: LogicalTime, end: LogicalTime) -> bool {
        for (lo, hi) in self.downtime_intervals() {
            let overlaps = lo < end && hi.map_or(true, |hi| hi > start);
            if overlaps {
                return false;
            }
        }
        true
    }

    /// True if this site recorded a failure strictly after `t`.
    pub fn has_failed_since(&self, t: LogicalTime) -> bool {
        self.failures.iter().any(|&f| f > t)
    }

    /// True if this site failed at some point during `[start, end)` — used by `end`
    /// to decide whether a site in a transaction's accessed set dooms it.
    pub fn failed_during(&self, start: LogicalTime, end: LogicalTime) -> bool {
        self.failures.iter().any(|&f| f >= start && f < end)
    }

    /// Disjoint downtime intervals `[fail_k, recover_k)`; the final interval's end is
    /// `None` if the site is currently down (open tail).
    fn downtime_intervals(&self) -> Vec<(LogicalTime, Option<LogicalTime>)> {
        let mut intervals: Vec<(LogicalTime, Option<LogicalTime>)> = self
            .failures
            .iter()
            .zip(self.recoveries.iter().map(|r| Some(*r)))
            .map(|(f, r)| (*f, r))
            .collect();
        if self.failures.len() > self.recoveries.len() {
            let open_fail = self.failures[self.recoveries.len()];
            intervals.push((open_fail, None));
        }
        intervals
    }
}

#[cfg(test)]
static_assertions::assert_impl_all!(Site: Send, Sync);
