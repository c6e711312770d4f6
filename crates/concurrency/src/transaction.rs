//! Transaction Record: per-transaction snapshot time, buffered reads/writes, status.

use std::collections::{BTreeMap, BTreeSet};

use repcrec_core::{LogicalTime, SiteId, Value, VariableId};

/// Lifecycle state of a [`Transaction`].
///
/// `Waiting` is part of the data model `spec.md` section 3 describes, but the
/// canonical scheduling choice (section 5) is abort-on-unavailable-read, so the
/// coordinator never actually parks a transaction in `Waiting` — it goes straight to
/// `Aborted`. The variant is kept because it is named in the data model, and a future
/// implementer choosing the "block" semantics instead of "abort" would need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepting reads and writes.
    Active,
    /// Reserved for a blocking-read scheduling policy; unused by the canonical
    /// abort-on-unavailable behavior.
    Waiting,
    /// Terminally committed; write set has been applied to sites.
    Committed,
    /// Terminally aborted; read/write/accessed-site sets have been discarded.
    Aborted,
}

/// One transaction's record: identity, snapshot time, buffered state, and status.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: String,
    start_time: LogicalTime,
    end_time: Option<LogicalTime>,
    read_set: BTreeSet<VariableId>,
    write_set: BTreeMap<VariableId, Value>,
    accessed_sites: BTreeSet<SiteId>,
    read_sites: BTreeSet<SiteId>,
    status: TransactionStatus,
}

impl Transaction {
    /// Begin a new transaction with its snapshot time fixed to `start_time`.
    pub fn new(id: impl Into<String>, start_time: LogicalTime) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time: None,
            read_set: BTreeSet::new(),
            write_set: BTreeMap::new(),
            accessed_sites: BTreeSet::new(),
            read_sites: BTreeSet::new(),
            status: TransactionStatus::Active,
        }
    }

    /// The transaction's id, as given to `begin`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot time: the logical clock value when `begin` ran.
    pub fn start_time(&self) -> LogicalTime {
        self.start_time
    }

    /// When the transaction reached a terminal state, if it has.
    pub fn end_time(&self) -> Option<LogicalTime> {
        self.end_time
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// True while the transaction can still accept reads/writes.
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// True once committed or aborted — read/write sets are then frozen (and, for an
    /// aborted transaction, empty).
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TransactionStatus::Committed | TransactionStatus::Aborted)
    }

    /// Variables successfully read by this transaction.
    pub fn read_set(&self) -> &BTreeSet<VariableId> {
        &self.read_set
    }

    /// Pending writes, keyed by variable; a later `add_write` for the same variable
    /// overwrites the earlier pending value.
    pub fn write_set(&self) -> &BTreeMap<VariableId, Value> {
        &self.write_set
    }

    /// Sites this transaction has read from, or whose data it would affect if it
    /// commits.
    pub fn accessed_sites(&self) -> &BTreeSet<SiteId> {
        &self.accessed_sites
    }

    /// Sites this transaction has actually read a value from, as opposed to merely
    /// buffering a write against. A write is only ever applied to a site that is up at
    /// commit time, so a site failing after a write was buffered against it costs
    /// nothing; a read is different, since its value was taken from that site's
    /// history and a later-discovered gap in that site's uptime can invalidate it.
    pub fn read_sites(&self) -> &BTreeSet<SiteId> {
        &self.read_sites
    }

    /// Record a successful read of `var`.
    pub fn add_read(&mut self, var: VariableId) {
        self.read_set.insert(var);
    }

    /// Buffer a write to `var`; replaces any prior pending value for the same
    /// variable.
    pub fn add_write(&mut self, var: VariableId, value: Value) {
        self.write_set.insert(var, value);
    }

    /// Record that this transaction touched `site`.
    pub fn add_accessed_site(&mut self, site: SiteId) {
        self.accessed_sites.insert(site);
    }

    /// Record that this transaction read a value from `site`; also counts as a touch
    /// for [`Transaction::accessed_sites`].
    pub fn add_read_site(&mut self, site: SiteId) {
        self.accessed_sites.insert(site);
        self.read_sites.insert(site);
    }

    /// Transition to `committed` at logical time `t`.
    pub fn commit(&mut self, t: LogicalTime) {
        self.status = TransactionStatus::Committed;
        self.end_time = Some(t);
    }

    /// Transition to `aborted`, discarding all buffered state. Idempotent: a second
    /// call on an already-aborted transaction does nothing.
    pub fn abort(&mut self, now: LogicalTime) {
        if matches!(self.status, TransactionStatus::Aborted) {
            return;
        }
        self.status = TransactionStatus::Aborted;
        self.read_set.clear();
        self.write_set.clear();
        self.accessed_sites.clear();
        self.read_sites.clear();
        if self.end_time.is_none() {
            self.end_time = Some(now);
        }
    }

    /// True if `other` (committed) wrote a variable `self` read — a read-write
    /// antidependency from `other` onto `self`.
    pub fn rw_conflict(&self, other: &Transaction) -> bool {
        self.read_set.iter().any(|v| other.write_set.contains_key(v))
    }

    /// True if `self` writes a variable `other` read — a read-write antidependency
    /// from `self` onto `other`.
    pub fn wr_conflict(&self, other: &Transaction) -> bool {
        self.write_set.keys().any(|v| other.read_set.contains(v))
    }

    /// True if `self` and `other` both have a pending or committed write to the same
    /// variable.
    pub fn ww_conflict(&self, other: &Transaction) -> bool {
        self.write_set.keys().any(|v| other.write_set.contains_key(v))
    }
}
