//! SSI Validator: conflict-edge construction and cycle detection at commit time.
//!
//! `spec.md` section 4.4 describes building a transient directed graph between a
//! commit candidate and every committed transaction overlapping its snapshot, then
//! running a DFS from the candidate's node. Because every edge the algorithm adds
//! touches the candidate (no edge ever connects two *other* committed transactions to
//! each other), the graph is always a star centered on the candidate: any cycle
//! through the candidate must close in exactly two hops, via a single overlapping
//! transaction. That lets the implementation below skip building an explicit
//! adjacency list and instead check, per overlapping transaction, whether both an
//! inbound and an outbound edge exist — equivalent to the general DFS for this graph
//! shape, and documented as such rather than left as an unexplained shortcut.

use std::fmt;

use repcrec_core::VariableId;

use crate::conflict::find_ww_conflict;
use crate::transaction::Transaction;

/// Which SSI acceptance criterion [`validate`] applies.
///
/// Both are sanctioned by `spec.md` section 4.4 as equally valid; the choice is a
/// config-level decision (`repcrec-cli`'s `--validator` flag), not a hardcoded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidatorMode {
    /// Reject on any cycle through the candidate (simpler, slightly more
    /// conservative).
    #[default]
    Cycle,
    /// Reject only when the cycle's two edges are both read-write antidependencies —
    /// Cahill's "dangerous structure": a ww-only cycle is left alone.
    DangerousStructure,
}

/// Why [`validate`] rejected a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortCause {
    /// A write-write conflict with an already-committed, overlapping transaction —
    /// first-committer-wins, regardless of which of the two started first.
    FirstCommitterWins {
        /// The contended variable.
        variable: VariableId,
        /// The transaction that committed first and wins.
        winner: String,
    },
    /// A cycle through the candidate and `with` in the multiversion serialization
    /// graph (general-cycle mode).
    SerializationCycle {
        /// The other transaction completing the cycle.
        with: String,
    },
    /// Two consecutive rw-antidependency edges through the candidate and `with`
    /// (dangerous-structure mode).
    DangerousStructure {
        /// The other transaction completing the dangerous structure.
        with: String,
    },
}

impl fmt::Display for AbortCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortCause::FirstCommitterWins { variable, winner } => {
                write!(f, "write-write conflict on {variable} lost to {winner} (first committer wins)")
            }
            AbortCause::SerializationCycle { with } => {
                write!(f, "serialization cycle with {with}")
            }
            AbortCause::DangerousStructure { with } => {
                write!(f, "dangerous structure (two rw-antidependencies) with {with}")
            }
        }
    }
}

/// Validate `candidate`'s commit against `committed`, the coordinator's full list of
/// previously committed transactions.
///
/// Only transactions whose `end_time` is after `candidate`'s `start_time` overlap its
/// snapshot and are considered; everything else committed strictly before the
/// candidate's snapshot was taken and cannot conflict with it.
pub fn validate(
    mode: ValidatorMode,
    candidate: &Transaction,
    committed: &[Transaction],
) -> Result<(), AbortCause> {
    let overlapping: Vec<&Transaction> = committed
        .iter()
        .filter(|u| u.end_time().map_or(false, |end| end > candidate.start_time()))
        .collect();

    // Write-write conflicts are checked first and independently of cycle detection:
    // any overlapping transaction that already committed a write to a variable
    // `candidate` also wrote is an unresolvable anomaly regardless of which of the two
    // started first — first-committer-wins (spec.md 4.4, worked scenario 2). The
    // overlap filter above already restricts `other` to transactions that committed
    // after `candidate`'s snapshot was taken, which is the only ordering that matters
    // here; comparing `start_time` on top of that would wrongly let half of these
    // conflicts through.
    for other in &overlapping {
        if candidate.ww_conflict(other) {
            let variable = find_ww_conflict(candidate, other)
                .expect("ww_conflict is true, so a shared write-set variable exists");
            return Err(AbortCause::FirstCommitterWins {
                variable,
                winner: other.id().to_string(),
            });
        }
    }

    for other in &overlapping {
        // Inbound edge: other (already committed) wrote something candidate read.
        let rw_in = candidate.rw_conflict(other);
        // Outbound edge: candidate writes something other read. A shared ww write is
        // not considered here at all: any such conflict already returned above, so by
        // construction no `other` that reaches this loop has one.
        let wr_out = candidate.wr_conflict(other);

        if !rw_in {
            continue;
        }

        match mode {
            ValidatorMode::Cycle => {
                if wr_out {
                    return Err(AbortCause::SerializationCycle { with: other.id().to_string() });
                }
            }
            ValidatorMode::DangerousStructure => {
                // Both edges must be rw-antidependencies: the inbound edge always is
                // (that's what rw_conflict tests); the outbound edge qualifies only
                // via wr, a write-write conflict never being an antidependency. Same
                // condition as the Cycle arm above now that ww is handled separately;
                // kept as its own arm because the two modes diverge once a third edge
                // type is ever added.
                if wr_out {
                    return Err(AbortCause::DangerousStructure { with: other.id().to_string() });
                }
            }
        }
    }

    Ok(())
}
