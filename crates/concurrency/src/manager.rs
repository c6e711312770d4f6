//! Coordinator: owns the logical clock, the transaction table, and the site table, and
//! drives the seven commands in `spec.md` section 6.

use std::collections::BTreeMap;

use repcrec_core::{CoordinatorError, CoordinatorResult, LogicalTime, SiteId, Value, VariableId};

use crate::site::Site;
use crate::transaction::{Transaction, TransactionStatus};
use crate::validation::{validate, ValidatorMode};

/// One outcome of a coordinator command, carrying everything `repcrec-cli`'s formatter
/// needs to produce the matching output line from `spec.md` section 6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `T begins`.
    Began {
        /// The transaction's id.
        txn: String,
    },
    /// `xN: v`.
    Read {
        /// The reading transaction's id.
        txn: String,
        /// The variable read.
        var: VariableId,
        /// The value observed.
        value: Value,
    },
    /// `T writes xN: v at sites [...]`.
    Wrote {
        /// The writing transaction's id.
        txn: String,
        /// The variable written.
        var: VariableId,
        /// The buffered value.
        value: Value,
        /// Sites currently up that hold this variable, in ascending order.
        sites: Vec<SiteId>,
    },
    /// `T commits`.
    Committed {
        /// The committing transaction's id.
        txn: String,
    },
    /// `T aborts`, with an optional cause suffix.
    Aborted {
        /// The aborting transaction's id.
        txn: String,
        /// Why, if known (read unavailability gives no cause; commit-time aborts do).
        cause: Option<String>,
    },
    /// `Site s fails at time t`.
    SiteFailed {
        /// The site that went down.
        site: SiteId,
        /// When.
        time: LogicalTime,
    },
    /// `Site s recovers at time t`.
    SiteRecovered {
        /// The site that came back up.
        site: SiteId,
        /// When.
        time: LogicalTime,
    },
    /// `site s - x1: v1, x2: v2, ...` for every site in ascending order.
    Dump(Vec<(SiteId, Vec<(VariableId, Value)>)>),
}

/// The coordinator: single-threaded owner of every piece of mutable state in the
/// simulator. There is exactly one instance per run; `spec.md` section 5 rules out
/// concurrent access entirely, so no interior mutability or locking is needed here —
/// unlike the teacher's `Manager`, which serializes concurrent callers behind
/// `DashMap`/`parking_lot`, this type just takes `&mut self`.
pub struct Coordinator {
    clock: LogicalTime,
    transactions: BTreeMap<String, Transaction>,
    committed: Vec<Transaction>,
    sites: BTreeMap<SiteId, Site>,
    validator_mode: ValidatorMode,
}

impl Coordinator {
    /// A fresh coordinator at logical time 0, with every site initialized per the
    /// placement rule and no transactions yet.
    pub fn new(validator_mode: ValidatorMode) -> Self {
        let mut sites = BTreeMap::new();
        for id in SiteId::all() {
            let mut site = Site::new(id);
            site.initialize();
            sites.insert(id, site);
        }
        Self {
            clock: LogicalTime::ZERO,
            transactions: BTreeMap::new(),
            committed: Vec::new(),
            sites,
            validator_mode,
        }
    }

    /// The clock's current value.
    pub fn now(&self) -> LogicalTime {
        self.clock
    }

    /// Advance the clock by one tick. The command loop calls this after every command,
    /// success or failure alike — `spec.md` section 5 (and `Driver.py`'s unconditional
    /// `tm.time += 1`) make this independent of command outcome.
    pub fn advance(&mut self) -> LogicalTime {
        self.clock = self.clock.next();
        self.clock
    }

    /// `begin(T)`: register a new active transaction with its snapshot fixed to the
    /// current clock value.
    pub fn begin(&mut self, txn: &str) -> CoordinatorResult<Event> {
        if self.transactions.contains_key(txn) {
            return Err(CoordinatorError::DuplicateTransaction { txn: txn.to_string() });
        }
        self.transactions.insert(txn.to_string(), Transaction::new(txn, self.clock));
        tracing::debug!(txn, time = self.clock.get(), "begin");
        Ok(Event::Began { txn: txn.to_string() })
    }

    /// `R(T, x)`: snapshot read. Replicated variables scan every up site in id order for
    /// the first one with a readable snapshot at `T`'s start time; non-replicated
    /// variables must be read from their unique home site, which must additionally have
    /// stayed up continuously since `T`'s snapshot was taken. Either case aborts `T` (not
    /// an error) if no qualifying site exists.
    pub fn read(&mut self, txn: &str, var: VariableId) -> CoordinatorResult<Event> {
        let mut t = self.take_active(txn)?;
        let start = t.start_time();

        let hit = if var.is_replicated() {
            SiteId::all().find_map(|id| {
                let site = &self.sites[&id];
                (site.is_up() && site.readable(var, start)).then(|| (id, site.last_committed_value(var, start)))
            })
        } else {
            let home = var.home_site();
            let site = &self.sites[&home];
            let last_commit = site.last_commit_time(var);
            if site.is_up() && site.was_up_continuously(last_commit, start) && site.readable(var, start) {
                Some((home, site.last_committed_value(var, start)))
            } else {
                None
            }
        };

        let event = match hit {
            Some((site_id, Some(value))) => {
                t.add_read(var);
                t.add_read_site(site_id);
                tracing::debug!(txn, %var, %value, site = site_id.get(), "read");
                Event::Read { txn: txn.to_string(), var, value }
            }
            _ => {
                t.abort(self.clock);
                tracing::info!(txn, %var, "read unavailable, aborting");
                Event::Aborted { txn: txn.to_string(), cause: Some(format!("{var} unavailable for read")) }
            }
        };
        self.transactions.insert(txn.to_string(), t);
        Ok(event)
    }

    /// `W(T, x, v)`: buffer a write. Not applied to any site until `T` commits; records
    /// every currently-up site holding `x` as accessed (but not read), so a later
    /// failure at one of these sites never dooms the transaction at `end` — only the
    /// sites it actually read from can do that.
    pub fn write(&mut self, txn: &str, var: VariableId, value: Value) -> CoordinatorResult<Event> {
        let mut t = self.take_active(txn)?;
        t.add_write(var, value);

        let sites: Vec<SiteId> = SiteId::all().filter(|id| self.sites[id].holds(var) && self.sites[id].is_up()).collect();
        for site_id in &sites {
            t.add_accessed_site(*site_id);
        }
        tracing::debug!(txn, %var, %value, "write buffered");
        self.transactions.insert(txn.to_string(), t);
        Ok(Event::Wrote { txn: txn.to_string(), var, value, sites })
    }

    /// `end(T)`: commit or abort. A transaction that *read* from a site which failed
    /// any time during its lifetime is doomed regardless of SSI validation; otherwise
    /// the validator decides. A site the transaction only wrote to does not doom it —
    /// a buffered write is only ever applied to sites that are up at commit time, so a
    /// site failing (even permanently) after the write was buffered costs nothing,
    /// while a read already took its value from that site's history and a later gap in
    /// its uptime can invalidate the snapshot it returned. Calling `end` again on an
    /// already-terminal transaction is a no-op that just re-reports its outcome.
    pub fn end(&mut self, txn: &str) -> CoordinatorResult<Event> {
        if let Some(t) = self.transactions.get(txn) {
            if t.is_terminal() {
                return Ok(self.terminal_event(t));
            }
        } else {
            return Err(CoordinatorError::UnknownTransaction { txn: txn.to_string() });
        }

        let mut t = self.transactions.remove(txn).expect("checked present above");
        let doomed = t
            .read_sites()
            .iter()
            .any(|site_id| self.sites[site_id].failed_during(t.start_time(), self.clock.next()));

        let event = if doomed {
            t.abort(self.clock);
            tracing::info!(txn, "doomed by site failure during access, aborting");
            Event::Aborted { txn: txn.to_string(), cause: Some("accessed a site that failed".to_string()) }
        } else {
            match validate(self.validator_mode, &t, &self.committed) {
                Ok(()) => {
                    t.commit(self.clock);
                    for (&var, &value) in t.write_set() {
                        for id in SiteId::all() {
                            let site = self.sites.get_mut(&id).expect("all ten sites always present");
                            if site.holds(var) && site.is_up() {
                                site.write(var, value, self.clock);
                            }
                        }
                    }
                    self.committed.push(t.clone());
                    tracing::info!(txn, time = self.clock.get(), "commit");
                    Event::Committed { txn: txn.to_string() }
                }
                Err(cause) => {
                    t.abort(self.clock);
                    tracing::info!(txn, cause = %cause, "validation rejected, aborting");
                    Event::Aborted { txn: txn.to_string(), cause: Some(cause.to_string()) }
                }
            }
        };
        self.transactions.insert(txn.to_string(), t);
        Ok(event)
    }

    /// `fail(s)`: mark a site down. Transactions that already touched it are not
    /// aborted here — `spec.md` section 9 canonicalizes the "doomed-but-alive" choice:
    /// they keep running and abort at their own `end`, so output order always matches
    /// command order.
    pub fn fail(&mut self, site: SiteId) -> Event {
        self.sites.get_mut(&site).expect("all ten sites always present").fail(self.clock);
        Event::SiteFailed { site, time: self.clock }
    }

    /// `recover(s)`: mark a site up and mask its replicated variables until their next
    /// real write.
    pub fn recover(&mut self, site: SiteId) -> Event {
        self.sites.get_mut(&site).expect("all ten sites always present").recover(self.clock);
        Event::SiteRecovered { site, time: self.clock }
    }

    /// `dump()`: every site's last committed value per variable it holds, falling back
    /// to the variable's initial value if the site has no non-sentinel entry at all
    /// (`spec.md` section 9's open question).
    pub fn dump(&self) -> Event {
        let report = SiteId::all()
            .map(|id| {
                let site = &self.sites[&id];
                let values = site
                    .variables()
                    .map(|var| {
                        let value = site.last_committed_value(var, self.clock).unwrap_or_else(|| var.initial_value());
                        (var, value)
                    })
                    .collect();
                (id, values)
            })
            .collect();
        Event::Dump(report)
    }

    fn take_active(&mut self, txn: &str) -> CoordinatorResult<Transaction> {
        let t = self
            .transactions
            .remove(txn)
            .ok_or_else(|| CoordinatorError::UnknownTransaction { txn: txn.to_string() })?;
        if !t.is_active() {
            // Put it back; a read/write against a terminal transaction is a semantic
            // error, not a state transition.
            let err = CoordinatorError::UnknownTransaction { txn: txn.to_string() };
            self.transactions.insert(txn.to_string(), t);
            return Err(err);
        }
        Ok(t)
    }

    fn terminal_event(&self, t: &Transaction) -> Event {
        match t.status() {
            TransactionStatus::Committed => Event::Committed { txn: t.id().to_string() },
            TransactionStatus::Aborted => Event::Aborted { txn: t.id().to_string(), cause: None },
            TransactionStatus::Active | TransactionStatus::Waiting => {
                unreachable!("terminal_event only called on a terminal transaction")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(i: u32) -> VariableId {
        VariableId::new(i).unwrap()
    }

    fn site(i: u8) -> SiteId {
        SiteId::new(i).unwrap()
    }

    #[test]
    fn begin_rejects_duplicate_id() {
        let mut c = Coordinator::new(ValidatorMode::Cycle);
        c.begin("T1").unwrap();
        assert!(matches!(c.begin("T1"), Err(CoordinatorError::DuplicateTransaction { .. })));
    }

    #[test]
    fn read_replicated_variable_sees_initial_value() {
        let mut c = Coordinator::new(ValidatorMode::Cycle);
        c.begin("T1").unwrap();
        let event = c.read("T1", var(2)).unwrap();
        assert_eq!(event, Event::Read { txn: "T1".into(), var: var(2), value: Value(20) });
    }

    #[test]
    fn write_then_commit_is_visible_on_read_after() {
        let mut c = Coordinator::new(ValidatorMode::Cycle);
        c.begin("T1").unwrap();
        c.write("T1", var(2), Value(99)).unwrap();
        let event = c.end("T1").unwrap();
        assert_eq!(event, Event::Committed { txn: "T1".into() });

        c.advance();
        c.begin("T2").unwrap();
        let event = c.read("T2", var(2)).unwrap();
        assert_eq!(event, Event::Read { txn: "T2".into(), var: var(2), value: Value(99) });
    }

    #[test]
    fn odd_variable_read_aborts_when_unique_site_down() {
        let mut c = Coordinator::new(ValidatorMode::Cycle);
        let x1_home = var(1).home_site();
        c.fail(x1_home);
        c.advance();
        c.begin("T1").unwrap();
        let event = c.read("T1", var(1)).unwrap();
        assert!(matches!(event, Event::Aborted { .. }));
    }

    #[test]
    fn recovered_site_masks_replicated_variable_until_next_commit() {
        let mut c = Coordinator::new(ValidatorMode::Cycle);
        c.fail(site(1));
        c.advance();
        c.recover(site(1));
        c.advance();
        c.begin("T1").unwrap();
        // x2 is replicated; site 1 is masked, but nine other up sites still serve it.
        let event = c.read("T1", var(2)).unwrap();
        assert_eq!(event, Event::Read { txn: "T1".into(), var: var(2), value: Value(20) });
    }

    #[test]
    fn end_is_idempotent_on_terminal_transaction() {
        let mut c = Coordinator::new(ValidatorMode::Cycle);
        c.begin("T1").unwrap();
        c.end("T1").unwrap();
        let second = c.end("T1").unwrap();
        assert_eq!(second, Event::Committed { txn: "T1".into() });
    }

    #[test]
    fn write_only_access_to_a_site_that_fails_and_recovers_before_end_still_commits() {
        // spec.md section 8, scenario 6: begin(T1); W(T1,x4,44); fail(5); recover(5);
        // end(T1). Site 5 is back up by the time T1 ends, and the write is only ever
        // applied to sites up at commit time, so nothing was lost: T1 commits.
        let mut c = Coordinator::new(ValidatorMode::Cycle);
        c.begin("T1").unwrap();
        c.write("T1", var(4), Value(44)).unwrap();
        c.fail(site(5));
        c.recover(site(5));
        let event = c.end("T1").unwrap();
        assert_eq!(event, Event::Committed { txn: "T1".into() });
    }

    #[test]
    fn write_only_access_to_a_site_that_fails_and_never_recovers_still_commits() {
        // Same reasoning as above even without a recovery: a write-only access never
        // dooms a transaction, since a down site is simply excluded from receiving the
        // write at commit time rather than invalidating the whole transaction.
        let mut c = Coordinator::new(ValidatorMode::Cycle);
        c.begin("T1").unwrap();
        c.write("T1", var(2), Value(1)).unwrap();
        c.fail(site(1));
        let event = c.end("T1").unwrap();
        assert_eq!(event, Event::Committed { txn: "T1".into() });
    }

    #[test]
    fn transaction_doomed_by_failed_read_site_aborts_at_end() {
        // spec.md section 8, scenario 3: a transaction that read from a site which
        // later failed (and is still down at end) is doomed regardless of validation.
        let mut c = Coordinator::new(ValidatorMode::Cycle);
        c.begin("T1").unwrap();
        c.read("T1", var(1)).unwrap();
        c.fail(var(1).home_site());
        let event = c.end("T1").unwrap();
        assert!(matches!(event, Event::Aborted { .. }));
    }

    #[test]
    fn dump_reports_every_site_in_order_with_initial_values() {
        let c = Coordinator::new(ValidatorMode::Cycle);
        let Event::Dump(report) = c.dump() else { panic!("expected Dump") };
        assert_eq!(report.len(), 10);
        assert_eq!(report[0].0, site(1));
        let x2 = report[0].1.iter().find(|(v, _)| *v == var(2)).unwrap();
        assert_eq!(x2.1, Value(20));
    }

    #[test]
    fn write_write_conflict_rejects_committer_whose_snapshot_predates_the_winner() {
        let mut c = Coordinator::new(ValidatorMode::Cycle);
        // T2's snapshot is taken before T1 even begins.
        c.begin("T2").unwrap();
        c.advance();
        c.begin("T1").unwrap();
        c.write("T1", var(2), Value(1)).unwrap();
        c.write("T2", var(2), Value(2)).unwrap();
        c.advance();
        assert_eq!(c.end("T1").unwrap(), Event::Committed { txn: "T1".into() });
        c.advance();
        // T1 already committed a conflicting write to x2, and T2's snapshot predates
        // T1's start: first-committer-wins rejects T2.
        let event = c.end("T2").unwrap();
        assert!(matches!(event, Event::Aborted { .. }));
    }

    #[test]
    fn write_write_conflict_rejects_later_committer_even_when_it_started_second() {
        // spec.md section 8, scenario 2, in its literal order: begin(T1); begin(T2);
        // W(T1,x2,22); W(T2,x2,222); end(T1); end(T2). T2's snapshot starts *after*
        // T1's (the opposite ordering from the test above), but T2 is still the later
        // committer on x2 and must lose.
        let mut c = Coordinator::new(ValidatorMode::Cycle);
        c.begin("T1").unwrap();
        c.advance();
        c.begin("T2").unwrap();
        c.write("T1", var(2), Value(22)).unwrap();
        c.write("T2", var(2), Value(222)).unwrap();
        c.advance();
        assert_eq!(c.end("T1").unwrap(), Event::Committed { txn: "T1".into() });
        c.advance();
        let event = c.end("T2").unwrap();
        assert!(matches!(event, Event::Aborted { .. }));
    }
}
