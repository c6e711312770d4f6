//! Conflict introspection: which variable(s) caused a conflict between two
//! transactions, for diagnostics and abort-cause messages.
//!
//! [`Transaction::rw_conflict`]/`wr_conflict`/`ww_conflict` answer yes/no; the
//! functions here answer *which variable*, for the first-committer-wins abort message
//! and for tests that want to assert on the specific conflicting key rather than just
//! the boolean.

use repcrec_core::VariableId;

use crate::transaction::Transaction;

/// The first variable in `a.read_set` also present in `b.write_set`, if any.
pub fn find_rw_conflict(a: &Transaction, b: &Transaction) -> Option<VariableId> {
    a.read_set().iter().find(|v| b.write_set().contains_key(v)).copied()
}

/// The first variable in `a.write_set` also present in `b.read_set`, if any.
pub fn find_wr_conflict(a: &Transaction, b: &Transaction) -> Option<VariableId> {
    a.write_set().keys().find(|v| b.read_set().contains(v)).copied()
}

/// The first variable both `a` and `b` have pending or committed writes to, if any.
pub fn find_ww_conflict(a: &Transaction, b: &Transaction) -> Option<VariableId> {
    a.write_set().keys().find(|v| b.write_set().contains_key(v)).copied()
}
